use std::path::Path;

use async_trait::async_trait;

use super::{Command, CommandContext, CommandResult};

pub struct UploadCommand;

#[async_trait]
impl Command for UploadCommand {
    fn name(&self) -> &str {
        "/upload"
    }

    fn usage(&self) -> &str {
        "<path>"
    }

    fn description(&self) -> &str {
        "upload a local image (jpg, png, webp, ... up to 10 MB)"
    }

    async fn execute(&self, args: &str, ctx: &mut CommandContext<'_>) -> CommandResult {
        if args.is_empty() {
            eprintln!("  ✗ usage: /upload <path>");
            return CommandResult::Handled;
        }
        println!("  uploading {args}...");
        match ctx.editor.upload(Path::new(args)).await {
            Ok(url) => println!("  ✓ uploaded: {url}"),
            Err(e) => eprintln!("  ✗ {e}"),
        }
        CommandResult::Handled
    }
}

pub struct OpenCommand;

#[async_trait]
impl Command for OpenCommand {
    fn name(&self) -> &str {
        "/open"
    }

    fn usage(&self) -> &str {
        "<url>"
    }

    fn description(&self) -> &str {
        "edit an image that is already hosted"
    }

    async fn execute(&self, args: &str, ctx: &mut CommandContext<'_>) -> CommandResult {
        if args.is_empty() {
            eprintln!("  ✗ usage: /open <url>");
            return CommandResult::Handled;
        }
        ctx.editor.open(args);
        println!("  ✓ editing {args}");
        CommandResult::Handled
    }
}

pub struct ClearCommand;

#[async_trait]
impl Command for ClearCommand {
    fn name(&self) -> &str {
        "/clear"
    }

    fn description(&self) -> &str {
        "remove the current image and its effects"
    }

    async fn execute(&self, _args: &str, ctx: &mut CommandContext<'_>) -> CommandResult {
        ctx.editor.clear();
        println!("  ✓ image removed");
        CommandResult::Handled
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::tests::{IMAGE, ctx, test_editor};

    #[tokio::test]
    async fn open_sets_resource() {
        let mut editor = test_editor();
        let mut ctx = ctx(&mut editor, Path::new("."));
        OpenCommand.execute(IMAGE, &mut ctx).await;
        assert_eq!(ctx.editor.state().resource(), Some(IMAGE));
    }

    #[tokio::test]
    async fn open_without_url_does_nothing() {
        let mut editor = test_editor();
        let mut ctx = ctx(&mut editor, Path::new("."));
        assert_eq!(OpenCommand.execute("", &mut ctx).await, CommandResult::Handled);
        assert!(ctx.editor.state().resource().is_none());
    }

    #[tokio::test]
    async fn upload_uses_uploader_url() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("me.jpg");
        std::fs::write(&path, b"jpeg").unwrap();

        let mut editor = test_editor();
        let mut ctx = ctx(&mut editor, dir.path());
        UploadCommand
            .execute(path.to_str().unwrap(), &mut ctx)
            .await;
        assert_eq!(ctx.editor.state().resource(), Some(IMAGE));
    }

    #[tokio::test]
    async fn upload_of_non_image_leaves_session_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        std::fs::write(&path, b"text").unwrap();

        let mut editor = test_editor();
        let mut ctx = ctx(&mut editor, dir.path());
        UploadCommand
            .execute(path.to_str().unwrap(), &mut ctx)
            .await;
        assert!(ctx.editor.state().resource().is_none());
    }

    #[tokio::test]
    async fn clear_removes_resource() {
        let mut editor = test_editor();
        editor.open(IMAGE);
        let mut ctx = ctx(&mut editor, Path::new("."));
        ClearCommand.execute("", &mut ctx).await;
        assert!(ctx.editor.state().resource().is_none());
    }
}
