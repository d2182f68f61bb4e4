use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::Context;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use pokerscout::{
    AgentConfig, AgentLoop, CaptureProducer, ChartStore, DecisionEngine, FallbackChain,
    SnapshotSource, SystemProbe, TableAnalyzer, TableLayout, TemplateLibrary,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("pokerscout.json"));
    let config = match AgentConfig::load(&config_path) {
        Ok(config) => config,
        Err(e) => {
            warn!(path = %config_path.display(), error = %e, "config unavailable, using defaults");
            AgentConfig::default()
        }
    };

    let layout = TableLayout::load(&config.layout_path)
        .with_context(|| format!("loading table layout {}", config.layout_path.display()))?;

    let templates = TemplateLibrary::load(&config.template_dir);
    if templates.is_empty() {
        warn!(dir = %config.template_dir.display(), "no templates loaded, card and dealer detection disabled");
    } else {
        info!(count = templates.len(), "templates loaded");
    }

    let store = ChartStore::open(&config.chart_dir);
    let engine = DecisionEngine::new(&store, &config.game_type, &config.chart_type);
    let analyzer = TableAnalyzer::new(&templates, config.match_threshold);

    let mut producer = CaptureProducer::start(config.capture_fps);
    let frames = FallbackChain::new(producer.source(), SnapshotSource::new());

    let cancel = Arc::new(AtomicBool::new(false));
    let ctrlc_cancel = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("shutdown requested");
            ctrlc_cancel.store(true, Ordering::SeqCst);
        }
    });

    let mut agent = AgentLoop::new(SystemProbe::new(), frames, analyzer, engine, config, layout);
    agent.run(cancel).await;

    producer.shutdown();
    Ok(())
}
