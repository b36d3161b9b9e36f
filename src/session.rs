//! Editing-session state and its transitions.
//!
//! Everything here is synchronous and free of I/O. The [`Editor`] drives the
//! network side and feeds results back through [`SessionState::apply_update`].
//!
//! [`Editor`]: crate::editor::Editor

use thiserror::Error;

use crate::effects::{Effect, EffectDescriptor, EffectStack};
use crate::history::{HistoryRecord, JobHistory};
use crate::job::runner::JobUpdate;
use crate::job::{JobId, JobStatus, ProcessingJob};

/// Input errors. Nothing is sent over the network when one of these is
/// returned.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("no image loaded, upload or open one first")]
    NoResource,
    #[error("prompt cannot be empty")]
    EmptyPrompt,
    #[error("no effect is waiting for a prompt")]
    NoPendingPrompt,
    #[error("job {0} is still processing, wait for it to finish")]
    JobInFlight(JobId),
}

/// A job ready to be polled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobPlan {
    pub job: JobId,
    pub effect: Effect,
    pub locator: String,
}

/// What a toggle did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Toggle {
    /// No image loaded; nothing happened.
    Ignored,
    /// The effect was removed and the result recomputed.
    Deactivated { effect: Effect, locator: String },
    /// The effect needs a prompt before its job can start.
    AwaitingPrompt { job: JobId, effect: Effect },
    /// A job was started.
    Started(JobPlan),
}

#[derive(Debug, Clone, Default)]
pub struct SessionState {
    resource: Option<String>,
    processed: Option<String>,
    stack: EffectStack,
    current: Option<ProcessingJob>,
    history: JobHistory,
    next_id: u64,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace (or with `None`, remove) the image being edited. Resets the
    /// processed result, the active effects, and the current job.
    pub fn set_resource(&mut self, resource: Option<String>) {
        self.resource = resource
            .map(|r| r.trim().to_string())
            .filter(|r| !r.is_empty());
        self.processed = None;
        self.stack.clear();
        self.current = None;
    }

    pub fn resource(&self) -> Option<&str> {
        self.resource.as_deref()
    }

    /// The latest result to display, if any.
    pub fn processed(&self) -> Option<&str> {
        self.processed.as_deref()
    }

    pub fn effects(&self) -> &EffectStack {
        &self.stack
    }

    /// Combined locator for the active effects.
    pub fn locator(&self) -> Option<String> {
        self.resource.as_deref().map(|base| self.stack.locator(base))
    }

    pub fn current_job(&self) -> Option<&ProcessingJob> {
        self.current.as_ref()
    }

    pub fn history(&self) -> &JobHistory {
        &self.history
    }

    /// The job currently queued or processing.
    pub fn in_flight(&self) -> Option<JobId> {
        self.current
            .as_ref()
            .filter(|j| j.is_in_flight())
            .map(|j| j.id)
    }

    /// The effect waiting for its prompt, if any.
    pub fn pending_prompt(&self) -> Option<Effect> {
        self.current
            .as_ref()
            .filter(|j| j.status == JobStatus::Idle)
            .map(|j| j.effect)
    }

    /// Switch an effect off if active, otherwise start it (or ask for its
    /// prompt first).
    pub fn toggle(&mut self, effect: Effect) -> Result<Toggle, SessionError> {
        let Some(resource) = self.resource.clone() else {
            return Ok(Toggle::Ignored);
        };

        if self.stack.deactivate(effect) {
            let locator = self.stack.locator(&resource);
            self.processed = Some(locator.clone());
            return Ok(Toggle::Deactivated { effect, locator });
        }

        if let Some(job) = self.in_flight() {
            return Err(SessionError::JobInFlight(job));
        }

        if effect.requires_prompt() {
            let job = self.next_job_id();
            self.current = Some(ProcessingJob::idle(job, effect));
            return Ok(Toggle::AwaitingPrompt { job, effect });
        }

        Ok(self
            .apply_effect(effect, None)?
            .map_or(Toggle::Ignored, Toggle::Started))
    }

    /// Start the job of the effect waiting for a prompt.
    pub fn submit_prompt(&mut self, text: &str) -> Result<JobPlan, SessionError> {
        let effect = self.pending_prompt().ok_or(SessionError::NoPendingPrompt)?;
        let text = text.trim();
        if text.is_empty() {
            return Err(SessionError::EmptyPrompt);
        }
        self.apply_effect(effect, Some(text.to_string()))?
            .ok_or(SessionError::NoResource)
    }

    /// Drop the effect waiting for a prompt. Returns it, if there was one.
    pub fn cancel_prompt(&mut self) -> Option<Effect> {
        let effect = self.pending_prompt()?;
        self.current = None;
        Some(effect)
    }

    /// Queue a job for `effect`, stack it, and move it to processing.
    /// Returns `Ok(None)` without creating a job when no image is loaded.
    /// Effects that take a prompt need a non-blank one.
    pub fn apply_effect(
        &mut self,
        effect: Effect,
        prompt: Option<String>,
    ) -> Result<Option<JobPlan>, SessionError> {
        let Some(resource) = self.resource.clone() else {
            return Ok(None);
        };
        let prompt = prompt
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty());
        if effect.requires_prompt() && prompt.is_none() {
            return Err(SessionError::EmptyPrompt);
        }
        if let Some(job) = self.in_flight() {
            return Err(SessionError::JobInFlight(job));
        }

        let id = self.next_job_id();
        let mut job = ProcessingJob::queued(id, effect);
        self.stack.activate(EffectDescriptor::new(effect, prompt));
        let locator = self.stack.locator(&resource);
        job.start_processing();
        self.current = Some(job);

        Ok(Some(JobPlan {
            job: id,
            effect,
            locator,
        }))
    }

    /// Fold a runner update into the current job. Updates for any other job,
    /// or for a job that already finished, are ignored and return `false`.
    pub fn apply_update(&mut self, update: &JobUpdate) -> bool {
        let Some(job) = self
            .current
            .as_mut()
            .filter(|j| j.id == update.job() && !j.is_terminal())
        else {
            return false;
        };

        match update {
            JobUpdate::Processing { progress, .. } => job.advance(*progress),
            JobUpdate::Ready { result, .. } | JobUpdate::TimedOut { result, .. } => {
                job.complete(result.clone());
                self.processed = Some(result.clone());
                self.history.push(HistoryRecord::from(&*job));
            }
            JobUpdate::Failed { message, .. } => job.fail(message.clone()),
        }
        true
    }

    fn next_job_id(&mut self) -> JobId {
        self.next_id += 1;
        JobId(self.next_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const R: &str = "https://ik.imagekit.io/demo/photo.jpg";

    fn loaded() -> SessionState {
        let mut s = SessionState::new();
        s.set_resource(Some(R.to_string()));
        s
    }

    fn finish(s: &mut SessionState, plan: &JobPlan) {
        assert!(s.apply_update(&JobUpdate::Ready {
            job: plan.job,
            result: plan.locator.clone(),
        }));
    }

    fn started(t: Toggle) -> JobPlan {
        match t {
            Toggle::Started(plan) => plan,
            other => panic!("expected Started, got {other:?}"),
        }
    }

    #[test]
    fn toggle_without_resource_is_ignored() {
        let mut s = SessionState::new();
        assert_eq!(s.toggle(Effect::RemoveBackground).unwrap(), Toggle::Ignored);
        assert!(s.current_job().is_none());
    }

    #[test]
    fn apply_effect_without_resource_creates_no_job() {
        let mut s = SessionState::new();
        assert_eq!(s.apply_effect(Effect::Upscale, None).unwrap(), None);
        assert!(s.current_job().is_none());
        assert!(s.effects().is_empty());
    }

    #[test]
    fn blank_resource_counts_as_none() {
        let mut s = SessionState::new();
        s.set_resource(Some("   ".to_string()));
        assert!(s.resource().is_none());
    }

    #[test]
    fn toggle_plain_effect_starts_processing() {
        let mut s = loaded();
        let plan = started(s.toggle(Effect::RemoveBackground).unwrap());
        assert_eq!(plan.locator, format!("{R}?tr=e-bgremove"));
        assert_eq!(plan.effect, Effect::RemoveBackground);

        let job = s.current_job().unwrap();
        assert_eq!(job.status, JobStatus::Processing);
        assert_eq!(job.progress, 10);
        assert_eq!(s.in_flight(), Some(plan.job));
    }

    #[test]
    fn bgremove_on_then_off() {
        let mut s = loaded();
        let plan = started(s.toggle(Effect::RemoveBackground).unwrap());
        finish(&mut s, &plan);
        assert_eq!(s.processed(), Some(format!("{R}?tr=e-bgremove").as_str()));
        assert_eq!(s.current_job().unwrap().status, JobStatus::Completed);

        let t = s.toggle(Effect::RemoveBackground).unwrap();
        assert_eq!(
            t,
            Toggle::Deactivated {
                effect: Effect::RemoveBackground,
                locator: R.to_string()
            }
        );
        assert_eq!(s.processed(), Some(R));
        assert_eq!(s.locator().as_deref(), Some(R));
    }

    #[test]
    fn prompt_effect_waits_for_prompt() {
        let mut s = loaded();
        let t = s.toggle(Effect::ChangeBackground).unwrap();
        assert!(matches!(
            t,
            Toggle::AwaitingPrompt {
                effect: Effect::ChangeBackground,
                ..
            }
        ));
        assert_eq!(s.pending_prompt(), Some(Effect::ChangeBackground));
        assert_eq!(s.current_job().unwrap().status, JobStatus::Idle);
        assert!(s.in_flight().is_none());
        assert!(s.effects().is_empty());
    }

    #[test]
    fn submit_prompt_starts_encoded_job() {
        let mut s = loaded();
        s.toggle(Effect::ChangeBackground).unwrap();
        let plan = s.submit_prompt("beach").unwrap();
        assert!(plan.locator.contains("e-changebg-prompt-beach"));
        assert_eq!(s.pending_prompt(), None);
        assert_eq!(s.current_job().unwrap().status, JobStatus::Processing);
    }

    #[test]
    fn submit_prompt_encodes_spaces() {
        let mut s = loaded();
        s.toggle(Effect::Edit).unwrap();
        let plan = s.submit_prompt("  a red hat ").unwrap();
        assert_eq!(plan.locator, format!("{R}?tr=e-edit:a%20red%20hat"));
    }

    #[test]
    fn empty_prompt_is_rejected_and_prompt_stays_open() {
        let mut s = loaded();
        s.toggle(Effect::Edit).unwrap();
        assert_eq!(s.submit_prompt("   "), Err(SessionError::EmptyPrompt));
        assert_eq!(s.pending_prompt(), Some(Effect::Edit));
        assert!(s.effects().is_empty());
    }

    #[test]
    fn apply_effect_rejects_blank_or_missing_prompt() {
        let mut s = loaded();
        for (effect, prompt) in [
            (Effect::ChangeBackground, Some(String::new())),
            (Effect::Edit, Some("   ".to_string())),
            (Effect::Variations, None),
        ] {
            assert_eq!(
                s.apply_effect(effect, prompt),
                Err(SessionError::EmptyPrompt)
            );
        }
        assert!(s.current_job().is_none());
        assert!(s.effects().is_empty());
    }

    #[test]
    fn apply_effect_trims_prompt() {
        let mut s = loaded();
        let plan = s
            .apply_effect(Effect::ChangeBackground, Some("  beach ".to_string()))
            .unwrap()
            .unwrap();
        assert_eq!(plan.locator, format!("{R}?tr=e-changebg-prompt-beach"));
    }

    #[test]
    fn submit_without_pending_prompt_fails() {
        let mut s = loaded();
        assert_eq!(s.submit_prompt("beach"), Err(SessionError::NoPendingPrompt));
    }

    #[test]
    fn cancel_prompt_drops_idle_job() {
        let mut s = loaded();
        s.toggle(Effect::Variations).unwrap();
        assert_eq!(s.cancel_prompt(), Some(Effect::Variations));
        assert!(s.current_job().is_none());
        assert_eq!(s.cancel_prompt(), None);
    }

    #[test]
    fn second_job_refused_while_in_flight() {
        let mut s = loaded();
        let plan = started(s.toggle(Effect::RemoveBackground).unwrap());
        assert_eq!(
            s.toggle(Effect::Upscale),
            Err(SessionError::JobInFlight(plan.job))
        );
        assert_eq!(
            s.toggle(Effect::Edit),
            Err(SessionError::JobInFlight(plan.job))
        );
        assert!(!s.effects().contains(Effect::Upscale));
    }

    #[test]
    fn toggle_off_allowed_while_in_flight() {
        let mut s = loaded();
        let plan = started(s.toggle(Effect::RemoveBackground).unwrap());
        let t = s.toggle(Effect::RemoveBackground).unwrap();
        assert!(matches!(t, Toggle::Deactivated { .. }));
        // The poll chain is not aborted; the job still resolves.
        assert_eq!(s.in_flight(), Some(plan.job));
        finish(&mut s, &plan);
        assert_eq!(s.history().len(), 1);
    }

    #[test]
    fn stacked_effects_and_removal_keep_remaining_fragments() {
        let mut s = loaded();
        let a = started(s.toggle(Effect::Upscale).unwrap());
        finish(&mut s, &a);
        let b = started(s.toggle(Effect::RemoveBackground).unwrap());
        assert_eq!(b.locator, format!("{R}?tr=e-bgremove,e-upscale"));
        finish(&mut s, &b);
        s.toggle(Effect::ChangeBackground).unwrap();
        let c = s.submit_prompt("beach").unwrap();
        finish(&mut s, &c);

        let t = s.toggle(Effect::RemoveBackground).unwrap();
        let Toggle::Deactivated { locator, .. } = t else {
            panic!("expected Deactivated");
        };
        assert_eq!(locator, format!("{R}?tr=e-changebg-prompt-beach,e-upscale"));
        assert!(!locator.contains("e-bgremove"));
    }

    #[test]
    fn progress_updates_are_monotonic() {
        let mut s = loaded();
        let plan = started(s.toggle(Effect::Retouch).unwrap());
        s.apply_update(&JobUpdate::Processing {
            job: plan.job,
            progress: 40,
        });
        s.apply_update(&JobUpdate::Processing {
            job: plan.job,
            progress: 20,
        });
        assert_eq!(s.current_job().unwrap().progress, 40);
    }

    #[test]
    fn timed_out_job_completes_and_is_recorded() {
        let mut s = loaded();
        let plan = started(s.toggle(Effect::Upscale).unwrap());
        assert!(s.apply_update(&JobUpdate::TimedOut {
            job: plan.job,
            result: plan.locator.clone(),
        }));
        let job = s.current_job().unwrap();
        assert_eq!(job.status, JobStatus::Completed);
        assert_eq!(job.progress, 100);
        assert_eq!(s.history().len(), 1);
        assert_eq!(s.processed(), Some(plan.locator.as_str()));
    }

    #[test]
    fn failed_job_goes_to_error_without_history() {
        let mut s = loaded();
        let plan = started(s.toggle(Effect::Upscale).unwrap());
        s.apply_update(&JobUpdate::Failed {
            job: plan.job,
            message: "bad locator".to_string(),
        });
        let job = s.current_job().unwrap();
        assert_eq!(job.status, JobStatus::Error);
        assert_eq!(job.error.as_deref(), Some("bad locator"));
        assert!(s.history().is_empty());
        assert!(s.in_flight().is_none());
    }

    #[test]
    fn stale_and_duplicate_updates_are_ignored() {
        let mut s = loaded();
        let plan = started(s.toggle(Effect::Upscale).unwrap());
        assert!(!s.apply_update(&JobUpdate::Ready {
            job: JobId(999),
            result: "x".to_string(),
        }));
        finish(&mut s, &plan);
        assert!(!s.apply_update(&JobUpdate::Ready {
            job: plan.job,
            result: plan.locator.clone(),
        }));
        assert_eq!(s.history().len(), 1);
    }

    #[test]
    fn four_jobs_keep_three_newest() {
        let mut s = loaded();
        let mut ids = Vec::new();
        for effect in [
            Effect::RemoveBackground,
            Effect::DropShadow,
            Effect::Retouch,
            Effect::Upscale,
        ] {
            let plan = started(s.toggle(effect).unwrap());
            ids.push(plan.job);
            finish(&mut s, &plan);
        }
        let history: Vec<_> = s.history().iter().map(|r| r.id).collect();
        assert_eq!(history, vec![ids[3], ids[2], ids[1]]);
    }

    #[test]
    fn job_ids_are_unique() {
        let mut s = loaded();
        let a = started(s.toggle(Effect::Upscale).unwrap());
        finish(&mut s, &a);
        let b = started(s.toggle(Effect::Retouch).unwrap());
        assert_ne!(a.job, b.job);
    }

    #[test]
    fn replacing_resource_resets_session() {
        let mut s = loaded();
        let plan = started(s.toggle(Effect::Upscale).unwrap());
        finish(&mut s, &plan);
        s.set_resource(Some("https://ik.imagekit.io/demo/other.jpg".to_string()));
        assert!(s.effects().is_empty());
        assert!(s.processed().is_none());
        assert!(s.current_job().is_none());
        assert_eq!(s.history().len(), 1);

        s.set_resource(None);
        assert!(s.resource().is_none());
        assert_eq!(s.toggle(Effect::Upscale).unwrap(), Toggle::Ignored);
    }
}
