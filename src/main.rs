use anyhow::Result;
use taxiscraper::{config::PipelineConfig, logging, pipeline::Pipeline};
use tracing::info;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // ─── 1) init logging ─────────────────────────────────────────────
    logging::init();

    std::panic::set_hook(Box::new(|info| {
        eprintln!("panic: {:?}", info);
    }));

    // ─── 2) configure ────────────────────────────────────────────────
    let config = PipelineConfig::default();
    info!(config = %serde_json::to_string(&config)?, "startup");

    // ─── 3) fetch, clean, append ─────────────────────────────────────
    let pipeline = Pipeline::new(config)?;
    pipeline.run().await?;
    Ok(())
}
