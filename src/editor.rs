//! The editing session: owns the state, starts poll runs, and folds their
//! updates back in.
//!
//! Runs live on the tokio runtime and only talk to the editor through an
//! update channel. Callers drive the editor by awaiting
//! [`Editor::next_update`] and handing the result to
//! [`Editor::apply_update`], or simply call [`Editor::wait_for_job`].

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info};

use crate::effects::Effect;
use crate::events::{Event, EventBus};
use crate::export::{self, ExportError};
use crate::job::ProcessingJob;
use crate::job::runner::{JobRunner, JobUpdate, RunHandle};
use crate::session::{JobPlan, SessionError, SessionState, Toggle};
use crate::upload::{self, UploadError, Uploader};

pub struct Editor {
    state: SessionState,
    runner: JobRunner,
    uploader: Arc<dyn Uploader>,
    events: EventBus,
    updates_tx: mpsc::UnboundedSender<JobUpdate>,
    updates_rx: mpsc::UnboundedReceiver<JobUpdate>,
    running: Option<RunHandle>,
}

impl Editor {
    pub fn new(runner: JobRunner, uploader: Arc<dyn Uploader>) -> Self {
        let (updates_tx, updates_rx) = mpsc::unbounded_channel();
        Self {
            state: SessionState::new(),
            runner,
            uploader,
            events: EventBus::default(),
            updates_tx,
            updates_rx,
            running: None,
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.events.subscribe()
    }

    /// Edit an image that is already hosted.
    pub fn open(&mut self, locator: &str) {
        self.set_resource(Some(locator.to_string()));
    }

    /// Upload a local image and start editing it. Non-images and files over
    /// the size limit are rejected before any request is made.
    pub async fn upload(&mut self, path: &Path) -> Result<String, UploadError> {
        upload::check_image(path).await?;
        let url = self.uploader.upload(path).await?;
        info!(path = %path.display(), %url, "image ready for editing");
        self.set_resource(Some(url.clone()));
        Ok(url)
    }

    /// Stop editing the current image.
    pub fn clear(&mut self) {
        self.set_resource(None);
    }

    fn set_resource(&mut self, resource: Option<String>) {
        // A poll for the old image is meaningless now.
        if let Some(run) = self.running.take() {
            run.cancel();
        }
        self.state.set_resource(resource);
        self.events.emit(Event::ResourceChanged {
            resource: self.state.resource().map(str::to_string),
        });
    }

    pub fn toggle(&mut self, effect: Effect) -> Result<Toggle, SessionError> {
        let toggle = self.state.toggle(effect)?;
        match &toggle {
            Toggle::Started(plan) => self.start(plan),
            Toggle::Deactivated { effect, locator } => {
                info!(%effect, %locator, "effect removed");
                self.events.emit(Event::EffectRemoved {
                    effect: *effect,
                    locator: locator.clone(),
                });
            }
            Toggle::AwaitingPrompt { effect, .. } => debug!(%effect, "waiting for prompt"),
            Toggle::Ignored => debug!(%effect, "toggle ignored, no image loaded"),
        }
        Ok(toggle)
    }

    pub fn submit_prompt(&mut self, text: &str) -> Result<JobPlan, SessionError> {
        let plan = self.state.submit_prompt(text)?;
        self.start(&plan);
        Ok(plan)
    }

    pub fn cancel_prompt(&mut self) -> Option<Effect> {
        self.state.cancel_prompt()
    }

    /// Start `effect` directly, with its prompt if it takes one.
    pub fn apply_effect(
        &mut self,
        effect: Effect,
        prompt: Option<String>,
    ) -> Result<Option<JobPlan>, SessionError> {
        let plan = self.state.apply_effect(effect, prompt)?;
        if let Some(plan) = &plan {
            self.start(plan);
        }
        Ok(plan)
    }

    fn start(&mut self, plan: &JobPlan) {
        info!(job = %plan.job, effect = %plan.effect, locator = %plan.locator, "job started");
        self.events.emit(Event::JobStarted {
            job: plan.job,
            effect: plan.effect,
            locator: plan.locator.clone(),
        });
        let handle = self
            .runner
            .spawn(plan.job, plan.locator.clone(), self.updates_tx.clone());
        self.running = Some(handle);
    }

    /// The next update from a run. Cancel-safe, so it can sit in a
    /// `tokio::select!` next to other input.
    pub async fn next_update(&mut self) -> Option<JobUpdate> {
        self.updates_rx.recv().await
    }

    /// Apply a run update to the session. Returns `false` for stale updates.
    pub fn apply_update(&mut self, update: JobUpdate) -> bool {
        if !self.state.apply_update(&update) {
            debug!(job = %update.job(), "ignoring stale update");
            return false;
        }

        let event = match update {
            JobUpdate::Processing { job, progress } => Event::Progress { job, progress },
            JobUpdate::Ready { job, result } => Event::JobCompleted {
                job,
                result,
                assumed: false,
            },
            JobUpdate::TimedOut { job, result } => Event::JobCompleted {
                job,
                result,
                assumed: true,
            },
            JobUpdate::Failed { job, message } => Event::JobFailed { job, message },
        };
        if let Event::JobCompleted { job, .. } | Event::JobFailed { job, .. } = &event
            && self.running.as_ref().is_some_and(|run| run.job() == *job)
        {
            self.running = None;
        }
        self.events.emit(event);
        true
    }

    /// Drive updates until the current job is no longer in flight, then
    /// return it. Returns `None` straight away if no job is running.
    pub async fn wait_for_job(&mut self) -> Option<ProcessingJob> {
        while self.state.in_flight().is_some() {
            let update = self.next_update().await?;
            self.apply_update(update);
        }
        self.state.current_job().cloned()
    }

    /// Cancel the outstanding run, if any, and wait for its task to end.
    pub async fn shutdown(&mut self) {
        if let Some(run) = self.running.take() {
            run.cancel();
            let outcome = run.join().await;
            debug!(?outcome, "run stopped on shutdown");
        }
    }

    /// Save the latest result into `dir` as `pixora-<millis>.<format>`.
    pub async fn export(&self, format: &str, dir: &Path) -> Result<PathBuf, ExportError> {
        let result = self.state.processed().ok_or(ExportError::NoResult)?;
        export::export(result, format, dir).await
    }
}

impl Drop for Editor {
    fn drop(&mut self) {
        if let Some(run) = self.running.take() {
            run.cancel();
        }
    }
}
