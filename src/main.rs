//! Dry-run organizer for VFX production files.
//!
//! Scans a source directory, groups frame sequences and prints where every
//! file or sequence would go under the destination. Nothing is moved.

use std::error::Error as StdError;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{ArgAction, Parser};
use directories::ProjectDirs;
use shotsort_config::{ConfigSource, PatternStore, Settings};
use shotsort_library::{Event, Normalization, Orchestrator, Status, display_details};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[derive(Debug, Parser)]
#[command(name = "shotsort", version, about = "Propose destinations for VFX production files")]
struct Args {
    /// Directory to scan.
    #[arg(required_unless_present = "list_profiles")]
    source: Option<PathBuf>,
    /// Destination root the proposals are relative to.
    #[arg(short, long, required_unless_present = "list_profiles")]
    dest: Option<PathBuf>,
    #[arg(short, long, default_value = "default")]
    profile: String,
    /// Tag pattern document (YAML, TOML or JSON).
    #[arg(long, requires = "profiles")]
    patterns: Option<PathBuf>,
    /// Profile document (YAML, TOML or JSON).
    #[arg(long, requires = "patterns")]
    profiles: Option<PathBuf>,
    /// Settings file; `SHOTSORT_*` environment variables override it.
    #[arg(long)]
    settings: Option<PathBuf>,
    /// Print the available profiles and exit.
    #[arg(long)]
    list_profiles: bool,
    /// Increase log verbosity (repeatable).
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

/// The per-user configuration directory, if the platform has one.
fn config_dir() -> Option<PathBuf> {
    ProjectDirs::from("", "", "shotsort").map(|dirs| dirs.config_dir().to_path_buf())
}

/// Explicit documents win; otherwise both documents must exist in the user's
/// configuration directory, or the built-in ones are used.
fn config_source(args: &Args) -> ConfigSource {
    if let (Some(patterns), Some(profiles)) = (&args.patterns, &args.profiles) {
        return ConfigSource::Files {
            patterns: patterns.clone(),
            profiles: profiles.clone(),
        };
    }
    if let Some(dir) = config_dir() {
        let (patterns, profiles) = (dir.join("patterns.yaml"), dir.join("profiles.yaml"));
        if patterns.is_file() && profiles.is_file() {
            tracing::info!(directory = %dir.display(), "using user configuration");
            return ConfigSource::Files { patterns, profiles };
        }
    }
    ConfigSource::Builtin
}

fn settings_file(args: &Args) -> Option<PathBuf> {
    args.settings
        .clone()
        .or_else(|| config_dir().map(|dir| dir.join("settings.yaml")).filter(|file| file.is_file()))
}

fn failure<E>(error: &exn::Exn<E>, verbose: u8) -> ExitCode
where
    E: StdError + Send + Sync + 'static,
{
    let kind: &E = error;
    eprintln!("error: {kind}");
    if verbose > 0 {
        eprintln!("{error:?}");
    }
    ExitCode::FAILURE
}

fn print_proposals(normalization: &Normalization) {
    for proposal in normalization.proposals() {
        let details = display_details(proposal);
        let target = match (proposal.destination(), proposal.error()) {
            (_, Some(error)) => format!("! {error}"),
            (Some(destination), None) => destination.display().to_string(),
            (None, None) => String::new(),
        };
        println!("{:<9} {:<12} {} -> {target}", details.columns["status"], details.icon_hint, details.columns["name"]);
    }
    let count = |status| normalization.proposals().iter().filter(|p| p.status() == status).count();
    eprintln!(
        "{} proposals: {} auto, {} ambiguous, {} errors; {} entries skipped",
        normalization.proposals().len(),
        count(Status::Auto),
        count(Status::Ambiguous),
        count(Status::Error),
        normalization.scan().skipped.len(),
    );
}

async fn run(orchestrator: &Orchestrator, source: &Path, profile: &str, dest: &Path, verbose: u8) -> ExitCode {
    let job = match orchestrator.scan_and_normalize(source, profile, dest) {
        Ok(job) => job,
        Err(e) => return failure(&e, verbose),
    };
    let result = job
        .wait_with(|event| match event {
            Event::ScanWarning(skipped) => eprintln!("skipped {}: {}", skipped.path.display(), skipped.reason),
            Event::Scan(progress) => tracing::debug!(path = %progress.path.display(), files = progress.files, "scanned"),
            Event::Mapping(progress) => tracing::debug!(mapped = progress.mapped, total = progress.total, "mapped"),
        })
        .await;
    match result {
        Ok(normalization) => {
            print_proposals(&normalization);
            ExitCode::SUCCESS
        },
        Err(e) => failure(&e, verbose),
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(args.verbose);

    let store = match PatternStore::load(config_source(&args)) {
        Ok(store) => store,
        Err(e) => return failure(&e, args.verbose),
    };
    let settings = match Settings::load(settings_file(&args).as_deref()) {
        Ok(settings) => settings,
        Err(e) => return failure(&e, args.verbose),
    };
    let orchestrator = Orchestrator::new(store, settings);

    if args.list_profiles {
        for name in orchestrator.profile_names() {
            let description = orchestrator.store().profile(&name).and_then(|p| p.description.clone());
            match description {
                Some(description) => println!("{name}\t{description}"),
                None => println!("{name}"),
            }
        }
        return ExitCode::SUCCESS;
    }
    let (Some(source), Some(dest)) = (&args.source, &args.dest) else {
        eprintln!("error: a source directory and --dest are required");
        return ExitCode::FAILURE;
    };
    run(&orchestrator, source, &args.profile, dest, args.verbose).await
}
