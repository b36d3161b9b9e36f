use async_trait::async_trait;
use tracing::warn;

use super::{Command, CommandContext, CommandResult};

const DEFAULT_FORMAT: &str = "png";

pub struct ExportCommand;

#[async_trait]
impl Command for ExportCommand {
    fn name(&self) -> &str {
        "/export"
    }

    fn usage(&self) -> &str {
        "[format]"
    }

    fn description(&self) -> &str {
        "save the latest result (default png)"
    }

    async fn execute(&self, args: &str, ctx: &mut CommandContext<'_>) -> CommandResult {
        let format = if args.is_empty() { DEFAULT_FORMAT } else { args };
        match ctx.editor.export(format, ctx.out_dir).await {
            Ok(path) => {
                println!("  ✓ saved {}", path.display());
                if ctx.open_exports
                    && let Err(e) = open::that(&path)
                {
                    warn!("could not open {}: {e}", path.display());
                }
            }
            Err(e) => eprintln!("  ✗ {e}"),
        }
        CommandResult::Handled
    }
}
