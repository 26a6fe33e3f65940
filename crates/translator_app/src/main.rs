use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use log::LevelFilter;
use translator_app::{
    load_document, save_document, Controller, ControllerConfig, StderrAlertSink,
};
use translator_engine::{
    ClientSettings, ItemQueuePage, PageAdapter, Provider, ReqwestModelClient,
    SettingsStore,
};
use translator_logging::{translator_info, LogDestination};

/// Translates the items of a RON document with an LLM, one at a time or
/// continuously until the queue is empty.
#[derive(Debug, Parser)]
#[command(name = "translator", version)]
struct Cli {
    /// Settings JSON (apiKey, selectedModel, systemPrompt, provider).
    #[arg(long)]
    settings: PathBuf,

    /// RON document holding the items to translate.
    #[arg(long)]
    document: PathBuf,

    /// Keep going with the next item after each save.
    #[arg(long)]
    auto: bool,

    #[arg(long, default_value = "terminal")]
    log: LogDestination,

    #[arg(long)]
    verbose: bool,

    /// Pause between saving one item and opening the next.
    #[arg(long, default_value_t = 1000)]
    settle_ms: u64,

    /// Stores a new API key before running.
    #[arg(long)]
    api_key: Option<String>,

    /// Stores a new model before running.
    #[arg(long)]
    model: Option<String>,

    #[arg(long)]
    provider: Option<Provider>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let level = if cli.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    translator_logging::initialize(cli.log, level);

    let store = Arc::new(
        SettingsStore::open(&cli.settings)
            .with_context(|| format!("loading settings from {:?}", cli.settings))?,
    );
    if let Some(api_key) = &cli.api_key {
        store.set_api_key(api_key)?;
    }
    if let Some(model) = &cli.model {
        store.set_model(model)?;
    }
    if let Some(provider) = cli.provider {
        store.set_provider(provider)?;
    }

    let items = load_document(&cli.document)?;
    let mut controller = Controller::new(
        ItemQueuePage::new(items),
        Arc::new(ReqwestModelClient::new(ClientSettings::default())),
        store,
        Box::new(StderrAlertSink),
        ControllerConfig {
            settle_delay: Duration::from_millis(cli.settle_ms),
        },
    );

    let handle = controller.handle();
    let interrupt = handle.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            translator_info!("interrupt received; stopping");
            interrupt.stop();
        }
    });

    if cli.auto {
        handle.start_auto();
    } else {
        handle.start_single();
    }
    controller.run_until_idle().await;

    let view = controller.view();
    let mut page = controller.into_page();
    // A single translation is left as a draft; commit it like a user would.
    if page.draft().is_some() && page.has_save_affordance() {
        page.trigger_save();
    }
    let items = page.into_items();
    save_document(&cli.document, &items)?;

    translator_info!(
        "finished: {} operation(s), {} completed, last status {:?}",
        view.operations_started,
        view.completed_items,
        view.last_status
    );
    Ok(())
}
