use async_trait::async_trait;

use super::{Command, CommandContext, CommandResult};
use crate::banner::format_history;
use crate::consts::progress_bar;
use crate::effects::Effect;

pub struct StatusCommand;

#[async_trait]
impl Command for StatusCommand {
    fn name(&self) -> &str {
        "/status"
    }

    fn description(&self) -> &str {
        "show the image, active effects, and current job"
    }

    async fn execute(&self, _args: &str, ctx: &mut CommandContext<'_>) -> CommandResult {
        let state = ctx.editor.state();
        let Some(resource) = state.resource() else {
            println!("  no image loaded");
            return CommandResult::Handled;
        };

        let effects: Vec<_> = state.effects().effects().map(|e| e.id()).collect();
        println!("  image    {resource}");
        if effects.is_empty() {
            println!("  effects  (none)");
        } else {
            println!("  effects  {}", effects.join(", "));
        }
        if let Some(result) = state.processed() {
            println!("  result   {result}");
        }
        if let Some(job) = state.current_job() {
            println!(
                "  job      {} {} {} {}",
                job.id,
                job.effect.id(),
                job.status,
                progress_bar(job.progress)
            );
            if let Some(error) = &job.error {
                println!("  error    {error}");
            }
        }
        if let Some(effect) = state.pending_prompt() {
            println!("  waiting  prompt for {}", effect.name());
        }
        CommandResult::Handled
    }
}

pub struct HistoryCommand;

#[async_trait]
impl Command for HistoryCommand {
    fn name(&self) -> &str {
        "/history"
    }

    fn description(&self) -> &str {
        "list the most recent completed jobs"
    }

    async fn execute(&self, _args: &str, ctx: &mut CommandContext<'_>) -> CommandResult {
        print!("{}", format_history(ctx.editor.state().history()));
        CommandResult::Handled
    }
}

pub struct EffectsCommand;

#[async_trait]
impl Command for EffectsCommand {
    fn name(&self) -> &str {
        "/effects"
    }

    fn description(&self) -> &str {
        "list available effects"
    }

    async fn execute(&self, _args: &str, ctx: &mut CommandContext<'_>) -> CommandResult {
        print!("{}", effects_table(|e| ctx.editor.state().effects().contains(e)));
        CommandResult::Handled
    }
}

/// The catalogue, one effect per line. `*` marks active effects and
/// `(prompt)` those that take one.
pub fn effects_table(is_active: impl Fn(Effect) -> bool) -> String {
    let mut out = String::new();
    for effect in Effect::ALL {
        let marker = if is_active(effect) { '*' } else { ' ' };
        let prompt = if effect.requires_prompt() {
            " (prompt)"
        } else {
            ""
        };
        out.push_str(&format!(
            "  {marker} {:<13} {}{prompt}\n",
            effect.id(),
            effect.description()
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::tests::{IMAGE, ctx, test_editor};
    use std::path::Path;

    #[test]
    fn table_lists_every_effect() {
        let table = effects_table(|_| false);
        for effect in Effect::ALL {
            assert!(table.contains(effect.id()));
        }
        assert_eq!(table.matches("(prompt)").count(), 4);
        assert!(!table.contains('*'));
    }

    #[test]
    fn table_marks_active() {
        let table = effects_table(|e| e == Effect::Upscale);
        let line = table.lines().find(|l| l.contains("e-upscale")).unwrap();
        assert!(line.contains('*'));
    }

    #[tokio::test]
    async fn status_and_history_are_handled() {
        let mut editor = test_editor();
        editor.open(IMAGE);
        editor.toggle(Effect::Retouch).unwrap();
        editor.wait_for_job().await;
        let mut ctx = ctx(&mut editor, Path::new("."));
        assert_eq!(StatusCommand.execute("", &mut ctx).await, CommandResult::Handled);
        assert_eq!(HistoryCommand.execute("", &mut ctx).await, CommandResult::Handled);
        assert_eq!(EffectsCommand.execute("", &mut ctx).await, CommandResult::Handled);
    }
}
