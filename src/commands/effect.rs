use async_trait::async_trait;

use super::{Command, CommandContext, CommandResult};
use crate::effects::Effect;
use crate::session::{JobPlan, Toggle};

pub struct ToggleCommand;

#[async_trait]
impl Command for ToggleCommand {
    fn name(&self) -> &str {
        "/toggle"
    }

    fn aliases(&self) -> &[&str] {
        &["/t"]
    }

    fn usage(&self) -> &str {
        "<effect>"
    }

    fn description(&self) -> &str {
        "switch an effect on or off (see /effects)"
    }

    async fn execute(&self, args: &str, ctx: &mut CommandContext<'_>) -> CommandResult {
        let effect = match args.parse::<Effect>() {
            Ok(effect) => effect,
            Err(e) => {
                eprintln!("  ✗ {e} (see /effects)");
                return CommandResult::Handled;
            }
        };

        match ctx.editor.toggle(effect) {
            Ok(Toggle::Ignored) => eprintln!("  ✗ no image loaded, use /upload or /open first"),
            Ok(Toggle::Deactivated { effect, locator }) => {
                println!("  ✓ {} off", effect.name());
                println!("  → {locator}");
            }
            Ok(Toggle::AwaitingPrompt { effect, .. }) => {
                println!("  {} needs a prompt.", effect.name());
                println!("  describe what you want (or /prompt <text>, /cancel to abort)");
            }
            Ok(Toggle::Started(plan)) => print_started(&plan),
            Err(e) => eprintln!("  ✗ {e}"),
        }
        CommandResult::Handled
    }
}

pub struct PromptCommand;

#[async_trait]
impl Command for PromptCommand {
    fn name(&self) -> &str {
        "/prompt"
    }

    fn usage(&self) -> &str {
        "<text>"
    }

    fn description(&self) -> &str {
        "submit the prompt for the effect waiting on one"
    }

    async fn execute(&self, args: &str, ctx: &mut CommandContext<'_>) -> CommandResult {
        submit_prompt(args, ctx);
        CommandResult::Handled
    }
}

/// Submit a prompt and report what happened. Shared with the REPL, which
/// treats plain text as a prompt while one is pending.
pub fn submit_prompt(text: &str, ctx: &mut CommandContext<'_>) {
    match ctx.editor.submit_prompt(text) {
        Ok(plan) => print_started(&plan),
        Err(e) => eprintln!("  ✗ {e}"),
    }
}

pub struct CancelCommand;

#[async_trait]
impl Command for CancelCommand {
    fn name(&self) -> &str {
        "/cancel"
    }

    fn description(&self) -> &str {
        "drop the effect waiting for a prompt"
    }

    async fn execute(&self, _args: &str, ctx: &mut CommandContext<'_>) -> CommandResult {
        match ctx.editor.cancel_prompt() {
            Some(effect) => println!("  ✓ {} cancelled", effect.name()),
            None => println!("  nothing to cancel"),
        }
        CommandResult::Handled
    }
}

fn print_started(plan: &JobPlan) {
    println!("  ✓ {} {} started", plan.effect.name(), plan.job);
    println!("  → {}", plan.locator);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::tests::{IMAGE, ctx, test_editor};
    use crate::job::JobStatus;
    use std::path::Path;

    #[tokio::test]
    async fn toggle_starts_and_finishes_job() {
        let mut editor = test_editor();
        editor.open(IMAGE);
        let mut ctx = ctx(&mut editor, Path::new("."));
        ToggleCommand.execute("bgremove", &mut ctx).await;

        let job = ctx.editor.wait_for_job().await.unwrap();
        assert_eq!(job.status, JobStatus::Completed);
        assert_eq!(
            ctx.editor.state().processed(),
            Some(format!("{IMAGE}?tr=e-bgremove").as_str())
        );
    }

    #[tokio::test]
    async fn unknown_effect_is_reported() {
        let mut editor = test_editor();
        editor.open(IMAGE);
        let mut ctx = ctx(&mut editor, Path::new("."));
        assert_eq!(
            ToggleCommand.execute("sharpen", &mut ctx).await,
            CommandResult::Handled
        );
        assert!(ctx.editor.state().current_job().is_none());
    }

    #[tokio::test]
    async fn prompt_flow() {
        let mut editor = test_editor();
        editor.open(IMAGE);
        let mut ctx = ctx(&mut editor, Path::new("."));
        ToggleCommand.execute("changebg", &mut ctx).await;
        assert_eq!(
            ctx.editor.state().pending_prompt(),
            Some(Effect::ChangeBackground)
        );

        PromptCommand.execute("beach", &mut ctx).await;
        let job = ctx.editor.wait_for_job().await.unwrap();
        assert!(job.result.unwrap().contains("e-changebg-prompt-beach"));
    }

    #[tokio::test]
    async fn cancel_drops_pending_prompt() {
        let mut editor = test_editor();
        editor.open(IMAGE);
        let mut ctx = ctx(&mut editor, Path::new("."));
        ToggleCommand.execute("e-edit", &mut ctx).await;
        CancelCommand.execute("", &mut ctx).await;
        assert!(ctx.editor.state().pending_prompt().is_none());
    }
}
