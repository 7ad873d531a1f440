use trigon_engine::core::AppConfig;
use trigon_engine::device::GpuInit;
use trigon_engine::logging::{init_logging, LoggingConfig};
use trigon_engine::window::Runtime;

fn main() -> anyhow::Result<()> {
    init_logging(LoggingConfig::default());

    let config = AppConfig::default();
    log::info!(
        "starting `{}` ({}x{}, {} fps cap)",
        config.title,
        config.size.width,
        config.size.height,
        config.target_fps
    );

    Runtime::run(config, GpuInit::default())
}
