use crate::{
    browser::{Browser, DetachedBrowser, WebDriverBrowser},
    catalog::CatalogClient,
    config::Config,
    context::SessionContext,
    error::StudyError,
    identity::Identity,
    orchestrator::Orchestrator,
    remote::HttpApi,
    util::{Sleeper, ThreadSleeper, secs},
    verifier::CompletionVerifier,
};
use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::{error, info};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, Layer, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "study-pacer")]
#[command(about = "Study-session orchestrator that paces watch-time reports against an e-learning JSON API")]
pub struct Args {
    #[command(subcommand)]
    pub cmd: Command,

    /// Path to config TOML. If omitted, uses ./study-pacer.toml if present.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Override log level (trace/debug/info/warn/error).
    #[arg(long)]
    pub log_level: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Study every eligible course until overall progress is complete.
    Run {},
    /// Print overall study-hour progress.
    Progress {},
    /// Print the subject listing.
    Subjects {},
    /// Print the normalized course listing of one subject.
    Courses {
        #[arg(long)]
        subject: String,
    },
}

pub fn dispatch(args: Args) -> Result<()> {
    let cfg_path = resolve_config_path(args.config.as_deref());
    let cfg = Config::load(&cfg_path)?;
    let _guard = init_logging(&args, &cfg)?;

    match &args.cmd {
        Command::Run {} => run(&cfg),
        Command::Progress {} => progress(&cfg),
        Command::Subjects {} => subjects(&cfg),
        Command::Courses { subject } => courses(&cfg, subject),
    }
}

fn resolve_config_path(user: Option<&Path>) -> PathBuf {
    if let Some(p) = user {
        return p.to_path_buf();
    }
    let default = PathBuf::from("study-pacer.toml");
    if default.exists() {
        default
    } else {
        PathBuf::from("study-pacer.example.toml")
    }
}

fn init_logging(args: &Args, cfg: &Config) -> Result<Option<WorkerGuard>> {
    let level = args
        .log_level
        .as_deref()
        .unwrap_or(cfg.logging.level.as_str());

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let stdout_layer = if cfg.logging.json {
        tracing_subscriber::fmt::layer()
            .json()
            .with_target(true)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .with_target(true)
            .boxed()
    };

    let (file_layer, guard) = if cfg.logging.write_to_file && !cfg.logging.file_path.is_empty() {
        let path = Path::new(&cfg.logging.file_path);
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("create_dir_all {}", parent.display()))?;
        }
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("open log file: {}", path.display()))?;
        let (non_blocking, guard) = tracing_appender::non_blocking(file);
        let layer = tracing_subscriber::fmt::layer()
            .with_writer(non_blocking)
            .with_ansi(false)
            .with_target(true)
            .boxed();
        (Some(layer), Some(guard))
    } else {
        (None, None)
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stdout_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| anyhow!("failed to init logging: {e}"))?;

    Ok(guard)
}

fn connect(cfg: &Config, with_browser: bool) -> Result<(HttpApi, SessionContext)> {
    let api = HttpApi::new(cfg)?;
    let identity = Identity::resolve(cfg, &api, &ThreadSleeper)?;
    let browser: Box<dyn Browser> = if with_browser && !cfg.browser.webdriver_url.is_empty() {
        Box::new(WebDriverBrowser::connect(cfg)?)
    } else {
        Box::new(DetachedBrowser)
    };
    Ok((api, SessionContext::new(identity, browser)))
}

fn run(cfg: &Config) -> Result<()> {
    let (api, ctx) = connect(cfg, true)?;
    let orchestrator = Orchestrator::new(cfg, api, ctx);

    let report = match orchestrator.run() {
        Ok(report) => report,
        Err(err @ StudyError::AuthenticationLost { .. }) => {
            error!(kind = ?err.kind(), "{err}; exiting");
            ThreadSleeper.sleep(secs(cfg.pacing.auth_exit_grace_seconds));
            return Err(err.into());
        }
        Err(err) => return Err(err.into()),
    };

    let rendered = serde_json::to_string_pretty(&report)?;
    if !cfg.output.report_path.is_empty() {
        std::fs::write(&cfg.output.report_path, &rendered)
            .with_context(|| format!("writing report: {}", cfg.output.report_path))?;
        info!("report written to {}", cfg.output.report_path);
    }
    if cfg.output.print_summary {
        println!("{rendered}");
    }
    Ok(())
}

fn progress(cfg: &Config) -> Result<()> {
    let (api, ctx) = connect(cfg, false)?;
    let progress = CompletionVerifier::new(cfg, &api, &ctx).overall_progress();
    println!("{}", serde_json::to_string_pretty(&progress)?);
    Ok(())
}

fn subjects(cfg: &Config) -> Result<()> {
    let (api, ctx) = connect(cfg, false)?;
    let subjects = CatalogClient::new(cfg, &api, &ctx).list_subjects();
    println!("{}", serde_json::to_string_pretty(&subjects)?);
    Ok(())
}

fn courses(cfg: &Config, subject: &str) -> Result<()> {
    let (api, ctx) = connect(cfg, false)?;
    let courses = CatalogClient::new(cfg, &api, &ctx).list_courses(subject);
    println!("{}", serde_json::to_string_pretty(&courses)?);
    Ok(())
}
