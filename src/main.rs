//! Command-line entry point.
//!
//! ```text
//! sounds-like-correct [--project P] [--confidence C] [--registry DIR]...
//!                     [--config FILE] [--summary] [FILE]
//! ```
//!
//! # Startup sequence
//!
//! 1. Initialise logging.
//! 2. Parse arguments.
//! 3. Load [`AppConfig`] (returns default on first run).
//! 4. Build the [`CorrectionContext`] and [`CorrectionPhase`].
//! 5. Read the document from FILE or stdin and run one pass.
//! 6. Print the corrected text to stdout and the stats as JSON to stderr.

use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use sounds_like_correct::{
    config::AppConfig,
    correction::{Classification, CorrectionContext, CorrectionPhase, LogSink},
};

// ---------------------------------------------------------------------------
// Arguments
// ---------------------------------------------------------------------------

#[derive(Parser, Debug, Clone, Default, PartialEq)]
#[command(
    name = "sounds-like-correct",
    about = "Correct sounds-like entity names in transcribed text"
)]
struct CliArgs {
    /// Project the document was classified under (enables tier 2)
    #[arg(long)]
    project: Option<String>,

    /// Classifier confidence for --project
    #[arg(long)]
    confidence: Option<f64>,

    /// Registry directory; repeat to read several, replaces the configured list
    #[arg(long = "registry", value_name = "DIR")]
    registries: Vec<PathBuf>,

    /// Settings file to use instead of the default location
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Print the database summary instead of correcting text
    #[arg(long)]
    summary: bool,

    /// Input document; stdin when omitted
    #[arg(value_name = "FILE")]
    input: Option<PathBuf>,
}

// ---------------------------------------------------------------------------
// main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    // 1. Logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    // 2. Arguments
    let args = CliArgs::parse();

    // 3. Configuration
    let loaded = match &args.config {
        Some(path) => AppConfig::load_from(path),
        None => AppConfig::load(),
    };
    let mut config = loaded.unwrap_or_else(|e| {
        log::warn!("Failed to load config ({e}); using defaults");
        AppConfig::default()
    });
    if !args.registries.is_empty() {
        config.registry.sources = args.registries.clone();
    }

    // 4. Engine (misconfiguration is fatal here, never later)
    let context = Arc::new(CorrectionContext::from_config(&config)?);
    let phase = CorrectionPhase::new(&config.engine)?.with_sink(Arc::new(LogSink));

    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to create tokio runtime")?;

    rt.block_on(async move {
        if args.summary {
            let db = context.database().await;
            println!("{}", serde_json::to_string_pretty(&db.summary())?);
            return Ok(());
        }

        // 5. Input
        let text = match &args.input {
            Some(path) => tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("failed to read {}", path.display()))?,
            None => {
                let mut buf = String::new();
                std::io::stdin()
                    .read_to_string(&mut buf)
                    .context("failed to read stdin")?;
                buf
            }
        };

        let classification = Classification::new(args.project.as_deref(), args.confidence);
        let outcome = phase.run(&context, &text, &classification).await;

        // 6. Output
        print!("{}", outcome.text);
        eprintln!("{}", serde_json::to_string_pretty(&outcome.stats)?);
        Ok::<(), anyhow::Error>(())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<CliArgs, clap::Error> {
        CliArgs::try_parse_from(std::iter::once("sounds-like-correct").chain(args.iter().copied()))
    }

    #[test]
    fn parses_all_options() {
        let args = parse(&[
            "--project",
            "alpha",
            "--confidence",
            "0.8",
            "--registry",
            "/a",
            "--registry",
            "/b",
            "--config",
            "settings.toml",
            "--summary",
            "notes.txt",
        ])
        .unwrap();
        assert_eq!(args.project.as_deref(), Some("alpha"));
        assert_eq!(args.confidence, Some(0.8));
        assert_eq!(args.registries, vec![PathBuf::from("/a"), PathBuf::from("/b")]);
        assert_eq!(args.config, Some(PathBuf::from("settings.toml")));
        assert!(args.summary);
        assert_eq!(args.input, Some(PathBuf::from("notes.txt")));
    }

    #[test]
    fn no_arguments_reads_stdin() {
        assert_eq!(parse(&[]).unwrap(), CliArgs::default());
    }

    #[test]
    fn rejects_bad_input() {
        assert!(parse(&["--confidence", "high"]).is_err());
        assert!(parse(&["--project"]).is_err());
        assert!(parse(&["--frobnicate"]).is_err());
        assert!(parse(&["a.txt", "b.txt"]).is_err());
    }

    #[test]
    fn definition_is_consistent() {
        use clap::CommandFactory;
        CliArgs::command().debug_assert();
    }
}
