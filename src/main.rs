use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::warn;
use tracing_subscriber::EnvFilter;

use pixora::banner::{BannerInfo, print_banner, print_session_summary};
use pixora::commands::{CommandContext, CommandRegistry, CommandResult};
use pixora::config::{self, Config, Overrides, Settings};
use pixora::consts::{default_db_path, progress_bar};
use pixora::editor::Editor;
use pixora::effects::Effect;
use pixora::job::JobStatus;
use pixora::job::runner::{JobRunner, JobUpdate, RunnerConfig};
use pixora::probe::http::HttpProbe;
use pixora::session::SessionError;
use pixora::spinner::Spinner;
use pixora::upload::imagekit::ImageKitUploader;

#[derive(Parser)]
#[command(
    name = "pixora",
    version,
    about = "Stack AI effects on a photo and wait for the CDN to render them."
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// SQLite database for settings (use :memory: for ephemeral)
    #[arg(short, long)]
    db: Option<String>,

    /// Endpoint that issues upload credentials
    #[arg(long)]
    auth_url: Option<String>,

    /// ImageKit upload endpoint
    #[arg(long)]
    upload_url: Option<String>,

    /// Seconds between availability checks
    #[arg(long = "poll-interval")]
    poll_interval: Option<u64>,

    /// Checks before a job is assumed complete
    #[arg(long)]
    max_attempts: Option<u32>,

    /// Directory exports are written to
    #[arg(short, long)]
    out_dir: Option<PathBuf>,

    /// Log debug output to stderr
    #[arg(short, long, default_value_t = false)]
    verbose: bool,

    /// Image to edit in single-shot mode: a hosted URL or a local file to upload
    #[arg(short, long)]
    image: Option<String>,

    /// Effect to apply in single-shot mode (e.g. bgremove)
    #[arg(short, long)]
    effect: Option<Effect>,

    /// Prompt for effects that take one
    #[arg(short, long)]
    prompt: Option<String>,

    /// Export the result in this format after single-shot mode
    #[arg(long)]
    export: Option<String>,

    /// Open exported files with the system viewer
    #[arg(long, default_value_t = false)]
    open: bool,
}

#[derive(Subcommand)]
enum Command {
    /// List available effects
    Effects,
    /// Read or change stored settings
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print a stored value
    Get { key: String },
    /// Store a value
    Set { key: String, value: String },
    /// Remove a stored value
    Unset { key: String },
    /// Print every stored value
    List,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let db = match &cli.db {
        Some(db) => db.clone(),
        None => default_db_path().to_string_lossy().into_owned(),
    };
    let config = open_config(&db)?;

    if let Some(command) = &cli.command {
        return match command {
            Command::Effects => {
                print!("{}", pixora::commands::effects_table(|_| false));
                Ok(())
            }
            Command::Config { action } => handle_config(&config, action),
        };
    }

    let overrides = Overrides {
        auth_url: cli.auth_url.clone(),
        upload_url: cli.upload_url.clone(),
        poll_secs: cli.poll_interval,
        max_attempts: cli.max_attempts,
        out_dir: cli.out_dir.clone(),
    };
    let settings = Settings::resolve(&config, &overrides)?;

    let runner = JobRunner::new(
        Arc::new(HttpProbe::new()?),
        RunnerConfig {
            poll_interval: settings.poll_interval,
            max_attempts: settings.max_attempts,
        },
    );
    let uploader = ImageKitUploader::new(settings.auth_url.clone(), settings.upload_url.clone());
    let mut editor = Editor::new(runner, Arc::new(uploader));

    if cli.effect.is_some() || cli.image.is_some() {
        return single_shot(&cli, &settings, &mut editor).await;
    }

    let poll = format!(
        "every {}s, up to {} checks",
        settings.poll_interval.as_secs(),
        settings.max_attempts
    );
    let config_label = if db == ":memory:" { "ephemeral" } else { &db };
    print_banner(&BannerInfo {
        auth_url: &settings.auth_url,
        upload_url: &settings.upload_url,
        poll: &poll,
        out_dir: &settings.out_dir,
        config: config_label,
    });

    repl(&mut editor, &settings.out_dir, cli.open).await?;
    editor.shutdown().await;
    print_session_summary(editor.state().history());
    Ok(())
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "pixora=debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn open_config(db: &str) -> anyhow::Result<Config> {
    if db != ":memory:"
        && let Some(parent) = Path::new(db).parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    Config::open(db)
}

fn handle_config(config: &Config, action: &ConfigAction) -> anyhow::Result<()> {
    match action {
        ConfigAction::Get { key } => match config.get(key)? {
            Some(value) => println!("{value}"),
            None => bail!("{key} is not set"),
        },
        ConfigAction::Set { key, value } => {
            config.set(key, value)?;
            println!("✓ {key} = {value}");
        }
        ConfigAction::Unset { key } => {
            config.remove(key)?;
            println!("✓ {key} removed");
        }
        ConfigAction::List => {
            let values = config.list()?;
            if values.is_empty() {
                println!("(nothing stored; keys: {})", config::KEYS.join(", "));
            }
            for (key, value) in values {
                println!("{key} = {value}");
            }
        }
    }
    Ok(())
}

/// Load one image, apply one effect, optionally export, and exit.
async fn single_shot(cli: &Cli, settings: &Settings, editor: &mut Editor) -> anyhow::Result<()> {
    let Some(image) = &cli.image else {
        bail!("--effect needs an image, pass --image");
    };
    if image.starts_with("http://") || image.starts_with("https://") {
        editor.open(image);
    } else {
        let url = editor.upload(Path::new(image)).await?;
        println!("uploaded {url}");
    }

    let Some(effect) = cli.effect else {
        return Ok(());
    };
    let plan = match editor.apply_effect(effect, cli.prompt.clone()) {
        Err(SessionError::EmptyPrompt) => bail!("{} needs a non-empty --prompt", effect.id()),
        applied => applied?.context("no image loaded")?,
    };
    let spinner = Spinner::start(&format!("applying {}", effect.id()));

    let job = loop {
        tokio::select! {
            update = editor.next_update() => {
                let Some(update) = update else { break None };
                if let JobUpdate::Processing { progress, .. } = &update {
                    spinner.set_progress(*progress);
                }
                editor.apply_update(update);
                if editor.state().in_flight().is_none() {
                    break editor.state().current_job().cloned();
                }
            }
            _ = tokio::signal::ctrl_c() => {
                spinner.stop().await;
                bail!("interrupted");
            }
        }
    };
    spinner.stop().await;

    let job = job.context("job ended without a result")?;
    match job.status {
        JobStatus::Completed => println!("{}", job.result.as_deref().unwrap_or(&plan.locator)),
        _ => bail!(
            "{} failed: {}",
            effect.id(),
            job.error.as_deref().unwrap_or("unknown error")
        ),
    }

    if let Some(format) = &cli.export {
        let path = editor.export(format, &settings.out_dir).await?;
        println!("saved {}", path.display());
        if cli.open
            && let Err(e) = open::that(&path)
        {
            warn!("could not open {}: {e}", path.display());
        }
    }
    Ok(())
}

async fn repl(editor: &mut Editor, out_dir: &Path, open_exports: bool) -> anyhow::Result<()> {
    let registry = CommandRegistry::new();
    // Async stdin so Ctrl+C and job updates are handled at the prompt too.
    let stdin = BufReader::new(tokio::io::stdin());
    let mut lines = stdin.lines();

    loop {
        print_prompt(editor)?;

        let line = tokio::select! {
            result = lines.next_line() => {
                match result {
                    Ok(Some(line)) => line,
                    Ok(None) => {
                        // Ctrl+D (EOF)
                        println!();
                        break;
                    }
                    Err(e) => {
                        eprintln!("input error: {e}");
                        break;
                    }
                }
            }
            Some(update) = editor.next_update() => {
                report(editor, update);
                continue;
            }
            _ = tokio::signal::ctrl_c() => {
                println!();
                break;
            }
        };

        let input = line.trim();
        if input.is_empty() {
            continue;
        }

        let mut ctx = CommandContext {
            editor: &mut *editor,
            out_dir,
            open_exports,
        };
        match registry.dispatch(input, &mut ctx).await {
            CommandResult::Quit => break,
            CommandResult::Handled => {}
            CommandResult::NotACommand => {
                if ctx.editor.state().pending_prompt().is_some() {
                    pixora::commands::submit_prompt(input, &mut ctx);
                } else {
                    println!("type /help for available commands");
                }
            }
        }
    }
    Ok(())
}

fn print_prompt(editor: &Editor) -> io::Result<()> {
    match editor.state().pending_prompt() {
        Some(effect) => print!("\n{} prompt> ", effect.id()),
        None => print!("\npixora> "),
    }
    io::stdout().flush()
}

fn report(editor: &mut Editor, update: JobUpdate) {
    let line = match &update {
        JobUpdate::Processing { job, progress } => format!("{job} {}", progress_bar(*progress)),
        JobUpdate::Ready { job, result } => format!("✓ {job} ready {result}"),
        JobUpdate::TimedOut { job, result } => {
            format!("✓ {job} assumed ready (no confirmation) {result}")
        }
        JobUpdate::Failed { job, message } => format!("✗ {job} failed: {message}"),
    };
    if editor.apply_update(update) {
        print!("\r\x1b[2K  {line}");
        let _ = io::stdout().flush();
    }
}
