use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use anyhow::Context;
use tracing::{error, info, warn};

use recipe_curator::{app::ComponentRegistry, config::Config};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    std::panic::set_hook(Box::new(|panic_info| {
        let thread = std::thread::current();
        let thread_name = thread.name().unwrap_or("unnamed");
        let message = panic_info
            .payload()
            .downcast_ref::<&str>()
            .copied()
            .or_else(|| {
                panic_info
                    .payload()
                    .downcast_ref::<String>()
                    .map(|s| s.as_str())
            })
            .unwrap_or("unknown panic payload");

        if let Some(location) = panic_info.location() {
            error!(
                thread = thread_name,
                file = location.file(),
                line = location.line(),
                column = location.column(),
                message,
                "panic occurred"
            );
        } else {
            error!(
                thread = thread_name,
                message, "panic occurred without location information"
            );
        }
    }));

    // Tracing initialization is handled by Telemetry::new()
    let config = Config::from_env().context("failed to load configuration")?;
    if let Err(error) = rayon::ThreadPoolBuilder::new()
        .num_threads(config.worker_threads().get())
        .build_global()
    {
        warn!(error = %error, "rayon pool already initialised");
    }
    let registry = ComponentRegistry::build(config).context("failed to build components")?;

    let stop = Arc::new(AtomicBool::new(false));
    let signal_flag = Arc::clone(&stop);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("interrupt received, stopping after the current candidate");
            signal_flag.store(true, Ordering::Relaxed);
        }
    });

    let report = registry.run(stop).await?;
    if report.skipped > 0 {
        warn!(skipped = report.skipped, "run was interrupted");
    }
    if report.persist_failures > 0 {
        warn!(
            failures = report.persist_failures,
            "some outputs could not be written"
        );
    }
    Ok(())
}
