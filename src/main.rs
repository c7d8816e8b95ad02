//! Application entry point.
//!
//! # Startup sequence
//!
//! 1. Parse the command line and initialise logging.
//! 2. Load [`AppConfig`] from disk (defaults on first run), apply CLI
//!    overrides. `--save-config` writes the result back.
//! 3. Load the fish catalog (configured file, user data dir, or bundled).
//! 4. Create the [`tokio`] runtime (multi-thread, 2 workers).
//! 5. Build the language model gateway and, when enabled, the embedding
//!    index for the similarity fallback. A failed index build only
//!    disables the fallback.
//! 6. Terminal frontend: run the dialogue on stdin/stdout.
//!    Window frontend: spawn the dialogue runner on the runtime and run
//!    [`eframe::run_native`], which blocks until the window is closed.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use eframe::egui;
use tokio::sync::mpsc;

use finfinder::{
    app::FinFinderApp,
    catalog::{load_store, CandidateStore},
    config::{AppConfig, AppPaths, Frontend, ValidationMode},
    dialogue::{ChannelPresenter, DialogueCommand, DialogueEvent, DialogueRunner, TerminalPresenter},
    engine::{Glossary, NarrowingEngine, SimilarityRanker},
    llm::{ApiGateway, LanguageModelGateway, PromptBuilder},
};

// ---------------------------------------------------------------------------
// Command line
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(name = "finfinder", version, about = "Identify a fish through a short guided dialogue")]
struct Args {
    /// Use the line-based terminal dialogue instead of the window
    #[arg(long)]
    terminal: bool,

    /// Fish catalog file (.csv or .json)
    #[arg(long, value_name = "PATH")]
    data: Option<PathBuf>,

    /// Settings file to use instead of the default settings.toml
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Disable the similarity fallback (no embedding requests)
    #[arg(long)]
    no_embeddings: bool,

    /// Accept free-text answers, checked by the language model
    #[arg(long)]
    free_text: bool,

    /// Write the effective settings (file plus flags) back to the settings file
    #[arg(long)]
    save_config: bool,
}

fn apply_overrides(config: &mut AppConfig, args: &Args) {
    if args.terminal {
        config.ui.frontend = Frontend::Terminal;
    }
    if let Some(path) = &args.data {
        config.catalog.data_file = Some(path.clone());
    }
    if args.no_embeddings {
        config.engine.embedding_fallback = false;
    }
    if args.free_text {
        config.engine.validation = ValidationMode::FreeText;
    }
}

/// Persist `config` to `--config` when given, else the default settings file.
fn save_settings(config: &AppConfig, args: &Args) -> anyhow::Result<()> {
    match &args.config {
        Some(path) => config.save_to(path),
        None => config.save(),
    }
}

// ---------------------------------------------------------------------------
// Dialogue wiring
// ---------------------------------------------------------------------------

async fn build_runner(
    config: &AppConfig,
    store: Arc<CandidateStore>,
    gateway: Arc<dyn LanguageModelGateway>,
) -> DialogueRunner {
    let prompts = PromptBuilder::new(&config.llm.language);
    let runner = DialogueRunner::new(
        NarrowingEngine::new(Arc::clone(&store), &config.engine),
        Arc::clone(&gateway),
        prompts.clone(),
        Glossary::new(config.glossary.clone()),
        config.engine.validation,
    );

    if !config.engine.embedding_fallback {
        log::info!("Similarity fallback disabled");
        return runner;
    }

    // Degrade gracefully: without an index the dialogue still narrows.
    match SimilarityRanker::build(store, gateway, prompts, config.engine.top_k).await {
        Ok(ranker) => runner.with_ranker(ranker),
        Err(e) => {
            log::warn!("Could not build embedding index ({e}); similarity fallback disabled");
            runner
        }
    }
}

fn native_options(config: &AppConfig) -> eframe::NativeOptions {
    let (width, height) = config.ui.window_size;
    let mut vp = egui::ViewportBuilder::default()
        .with_title("FinFinder")
        .with_inner_size([width, height])
        .with_min_inner_size([360.0, 320.0]);

    if config.ui.always_on_top {
        vp = vp.with_always_on_top();
    }

    eframe::NativeOptions {
        viewport: vp,
        ..Default::default()
    }
}

// ---------------------------------------------------------------------------
// main
// ---------------------------------------------------------------------------

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // 1. Logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    log::info!("FinFinder starting up");

    // 2. Configuration
    let paths = AppPaths::new();
    let loaded = match &args.config {
        Some(path) => AppConfig::load_from(path),
        None => AppConfig::load(),
    };
    let mut config = loaded.unwrap_or_else(|e| {
        log::warn!("Failed to load config ({e}); using defaults");
        AppConfig::default()
    });
    apply_overrides(&mut config, &args);
    if args.save_config {
        save_settings(&config, &args).context("failed to save settings")?;
        log::info!("Settings saved");
    }

    // 3. Catalog
    let store = Arc::new(load_store(&config.catalog, &paths).context("failed to load the fish catalog")?);
    log::info!(
        "Catalog ready: {} fish, {} attributes",
        store.len(),
        store.catalog().len()
    );

    // 4. Tokio runtime
    let rt = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .context("failed to create tokio runtime")?;

    // 5. Gateway and runner
    let gateway: Arc<dyn LanguageModelGateway> = Arc::new(ApiGateway::from_config(&config.llm));
    let runner = rt.block_on(build_runner(&config, store, gateway));

    // 6. Frontend
    match config.ui.frontend {
        Frontend::Terminal => rt.block_on(async {
            let reader = tokio::io::BufReader::new(tokio::io::stdin());
            let mut presenter = TerminalPresenter::new(reader, tokio::io::stdout());
            runner.run(&mut presenter).await
        })?,
        Frontend::Window => {
            let (command_tx, command_rx) = mpsc::channel::<DialogueCommand>(16);
            let (event_tx, event_rx) = mpsc::channel::<DialogueEvent>(32);

            rt.spawn(async move {
                let mut presenter = ChannelPresenter::new(event_tx, command_rx);
                if let Err(e) = runner.run(&mut presenter).await {
                    log::error!("Dialogue stopped: {e}");
                }
            });

            let app = FinFinderApp::new(command_tx, event_rx, config.clone());
            eframe::run_native(
                "FinFinder",
                native_options(&config),
                Box::new(move |_cc| Ok(Box::new(app))),
            )
            .map_err(|e| anyhow::anyhow!("window failed: {e}"))?;
        }
    }

    log::info!("FinFinder shutting down");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_flags_override_settings() {
        let args = Args::parse_from([
            "finfinder",
            "--terminal",
            "--data",
            "/tmp/fish.json",
            "--no-embeddings",
            "--free-text",
        ]);
        let mut config = AppConfig::default();
        apply_overrides(&mut config, &args);

        assert_eq!(config.ui.frontend, Frontend::Terminal);
        assert_eq!(config.catalog.data_file, Some(PathBuf::from("/tmp/fish.json")));
        assert!(!config.engine.embedding_fallback);
        assert_eq!(config.engine.validation, ValidationMode::FreeText);
    }

    #[test]
    fn no_flags_keep_settings() {
        let args = Args::parse_from(["finfinder"]);
        let mut config = AppConfig::default();
        apply_overrides(&mut config, &args);

        assert_eq!(config.ui.frontend, Frontend::Window);
        assert!(config.engine.embedding_fallback);
        assert!(!args.save_config);
    }

    #[test]
    fn save_config_writes_overridden_settings() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("nested").join("settings.toml");
        let args = Args::parse_from([
            "finfinder",
            "--config",
            path.to_str().expect("utf-8 path"),
            "--free-text",
            "--save-config",
        ]);
        let mut config = AppConfig::default();
        apply_overrides(&mut config, &args);
        save_settings(&config, &args).expect("save");

        let loaded = AppConfig::load_from(&path).expect("load");
        assert_eq!(loaded.engine.validation, ValidationMode::FreeText);
    }
}
