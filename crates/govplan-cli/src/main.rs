//! `govplan` - split, summarize, derive and validate governance documents
//!
//! Every subcommand prints JSON to stdout; logs go to stderr.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{bail, Context, Result};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use govplan_artifact::{ArtifactSet, DocumentMeta};
use govplan_core::{
    ArtifactPaths, ArtifactRegistry, CancellationFlag, DerivationEngine, EngineConfig, EngineError,
};
use govplan_ingest::{Document, SectionSummarizer};
use govplan_validate::{HierarchyValidator, ValidationPolicy};
use serde::Serialize;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn cli() -> Command {
    let file = || {
        Arg::new("file")
            .required(true)
            .value_parser(value_parser!(PathBuf))
            .help("Converted markdown document (front matter optional)")
    };

    Command::new("govplan")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Derive epics, features and stories from governance documents")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("log-json")
                .long("log-json")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Emit logs as JSON lines"),
        )
        .subcommand(
            Command::new("split")
                .about("Split a document into sections")
                .arg(file()),
        )
        .subcommand(
            Command::new("summarize")
                .about("Split a document and extract per-section facts")
                .arg(file()),
        )
        .subcommand(
            Command::new("derive")
                .about("Derive and validate the full hierarchy for a document")
                .arg(file())
                .arg(
                    Arg::new("config")
                        .long("config")
                        .value_parser(value_parser!(PathBuf))
                        .help("Engine configuration (TOML)"),
                )
                .arg(
                    Arg::new("project")
                        .long("project")
                        .help("Project name used in feature and story ids"),
                )
                .arg(
                    Arg::new("registry")
                        .long("registry")
                        .value_parser(value_parser!(PathBuf))
                        .help("Record the accepted artifacts in this YAML manifest"),
                )
                .arg(
                    Arg::new("artifacts-dir")
                        .long("artifacts-dir")
                        .default_value("artifacts")
                        .value_parser(value_parser!(PathBuf))
                        .help("Root under which registry paths are laid out"),
                ),
        )
        .subcommand(
            Command::new("validate")
                .about("Validate a JSON artifact set")
                .arg(
                    Arg::new("artifacts")
                        .required(true)
                        .value_parser(value_parser!(PathBuf))
                        .help("JSON file with epics, features and stories"),
                )
                .arg(
                    Arg::new("config")
                        .long("config")
                        .value_parser(value_parser!(PathBuf))
                        .help("Engine configuration (TOML) supplying the validation policy"),
                )
                .arg(
                    Arg::new("document-id")
                        .long("document-id")
                        .help("Pin epic ids to this document"),
                ),
        )
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let matches = cli().get_matches();
    init_tracing(matches.get_flag("log-json"));

    match run(&matches).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(e) => {
            tracing::error!(error = %format!("{e:#}"), "govplan failed");
            eprintln!("error: {e:#}");
            ExitCode::from(2)
        }
    }
}

/// Run the chosen subcommand; `Ok(false)` means validation failed
async fn run(matches: &ArgMatches) -> Result<bool> {
    match matches.subcommand() {
        Some(("split", args)) => {
            let document = load_document(required_path(args, "file")?)?;
            print_json(&document.sections())?;
            Ok(true)
        }
        Some(("summarize", args)) => {
            let document = load_document(required_path(args, "file")?)?;
            let summaries = SectionSummarizer::default().summarize_all(&document.sections());
            print_json(&summaries)?;
            Ok(true)
        }
        Some(("derive", args)) => derive(args).await,
        Some(("validate", args)) => validate(args),
        Some((other, _)) => bail!("unknown subcommand '{other}'"),
        None => bail!("no subcommand given"),
    }
}

async fn derive(args: &ArgMatches) -> Result<bool> {
    let document = load_document(required_path(args, "file")?)?;
    let mut config = load_config(args.get_one::<PathBuf>("config"))?;
    if let Some(project) = args.get_one::<String>("project") {
        config = config.with_project(project.clone());
    }
    let engine = DerivationEngine::new(config).context("invalid engine configuration")?;

    let cancel = CancellationFlag::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupt received, finishing epics in progress");
            on_interrupt.cancel();
        }
    });

    let outcome = match engine.derive_with_cancel(&document, &cancel).await {
        Ok(outcome) => outcome,
        Err(EngineError::ValidationFailed { scope, attempts, report }) => {
            tracing::error!(%scope, attempts, "derivation rejected by validation");
            print_json(&report)?;
            return Ok(false);
        }
        Err(e) => {
            return Err(e).with_context(|| format!("failed to derive '{}'", document.id()));
        }
    };

    if let Some(registry_path) = args.get_one::<PathBuf>("registry") {
        if outcome.partial {
            tracing::warn!("partial outcome, registry left unchanged");
        } else {
            let root = required_path(args, "artifacts-dir")?;
            let mut registry = ArtifactRegistry::load(registry_path)
                .await
                .with_context(|| format!("failed to load registry {}", registry_path.display()))?;
            registry
                .record(&outcome, &document.meta.filename, &ArtifactPaths::new(root))
                .context("failed to record outcome")?;
            registry
                .save(registry_path)
                .await
                .with_context(|| format!("failed to save registry {}", registry_path.display()))?;
        }
    }

    print_json(&outcome)?;
    Ok(outcome.report.valid)
}

fn validate(args: &ArgMatches) -> Result<bool> {
    let path = required_path(args, "artifacts")?;
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let set: ArtifactSet = serde_json::from_str(&text)
        .with_context(|| format!("{} is not a valid artifact set", path.display()))?;

    let policy = match args.get_one::<PathBuf>("config") {
        Some(config) => load_config(Some(config))?.validation,
        None => ValidationPolicy::default(),
    };
    let mut validator = HierarchyValidator::new(policy);
    if let Some(document_id) = args.get_one::<String>("document-id") {
        validator = validator.with_document_id(document_id.clone());
    }

    let report = validator.validate(&set);
    tracing::info!(
        errors = report.errors.len(),
        warnings = report.warnings.len(),
        "validated artifact set"
    );
    print_json(&report)?;
    Ok(report.valid)
}

fn required_path<'a>(args: &'a ArgMatches, name: &str) -> Result<&'a Path> {
    args.get_one::<PathBuf>(name)
        .map(PathBuf::as_path)
        .with_context(|| format!("missing argument '{name}'"))
}

fn load_config(path: Option<&PathBuf>) -> Result<EngineConfig> {
    match path {
        Some(path) => EngineConfig::load(path)
            .with_context(|| format!("failed to load config {}", path.display())),
        None => Ok(EngineConfig::default()),
    }
}

/// Parse front matter when present, otherwise derive metadata from the path
fn load_document(path: &Path) -> Result<Document> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    if raw.starts_with("---") {
        return Document::parse(&raw)
            .with_context(|| format!("invalid front matter in {}", path.display()));
    }

    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .filter(|s| !s.trim().is_empty())
        .with_context(|| format!("cannot derive a document id from {}", path.display()))?;
    let filename = path
        .file_name()
        .map_or_else(|| stem.clone(), |s| s.to_string_lossy().into_owned());
    let location = path.display().to_string();
    let meta = DocumentMeta::new(stem)
        .with_filename(filename)
        .with_source_path(location.clone())
        .with_markdown_path(location);
    Ok(Document::from_parts(meta, raw))
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("failed to encode output")?;
    println!("{json}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn cli_definition_is_consistent() {
        cli().debug_assert();
    }

    #[test]
    fn derive_arguments_parse() {
        let matches = cli()
            .try_get_matches_from([
                "govplan",
                "derive",
                "policy.md",
                "--project",
                "acme",
                "--log-json",
            ])
            .unwrap();
        assert!(matches.get_flag("log-json"));
        let (name, args) = matches.subcommand().unwrap();
        assert_eq!(name, "derive");
        assert_eq!(args.get_one::<String>("project").unwrap(), "acme");
        assert_eq!(
            args.get_one::<PathBuf>("artifacts-dir").unwrap(),
            &PathBuf::from("artifacts")
        );
    }

    #[test]
    fn missing_subcommand_is_rejected() {
        assert!(cli().try_get_matches_from(["govplan"]).is_err());
    }

    #[test]
    fn plain_markdown_takes_id_from_file_name() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("access-policy.md");
        std::fs::write(&path, "## Scope\n\nStaff must wear badges.\n").unwrap();

        let document = load_document(&path).unwrap();
        assert_eq!(document.id(), "access-policy");
        assert_eq!(document.meta.filename, "access-policy.md");
        assert_eq!(document.sections().len(), 1);
    }

    #[test]
    fn front_matter_is_honoured() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "---\ndocument_id: hr-policy\n---\n## Leave\n\nStaff must book leave.\n").unwrap();

        let document = load_document(file.path()).unwrap();
        assert_eq!(document.id(), "hr-policy");
    }

    #[tokio::test]
    async fn invalid_artifact_set_fails_validation() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"epics": [], "features": [], "stories": []}}"#).unwrap();
        let matches = cli()
            .try_get_matches_from(["govplan", "validate", &file.path().to_string_lossy()])
            .unwrap();

        assert!(!run(&matches).await.unwrap());
    }
}
