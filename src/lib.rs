pub mod audio;
pub mod commands;
pub mod config;
pub mod database;
pub mod engine;
pub mod errors;
pub mod events;
pub mod library;
pub mod playback;
pub mod playlist;
pub mod queue;
pub mod scrobble;

pub use engine::Engine;
pub use errors::AppError;
pub use events::{EventBus, EventReceiver, PlayerEvent};

use config::{get_config_file_path, Config};
use std::path::PathBuf;

/// Runs a headless player until Ctrl-C. `library_root`, when given, is
/// registered as a library before the engine starts.
pub fn run(library_root: Option<PathBuf>) -> anyhow::Result<()> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    runtime.block_on(async move {
        let mut config = Config::load_or_default(&get_config_file_path())?;
        if let Some(root) = &library_root {
            config.add_library(root);
            config.save()?;
        }
        let default_root = config.default_library().map(|l| l.path.clone());

        let engine = Engine::start(config).await?;
        let mut rx = engine.subscribe();

        if engine.get_library().await.is_empty() {
            if let Some(root) = default_root {
                let report = engine.scan_library(&root).await?;
                log::info!(
                    "[Engine] Initial scan added {} songs ({} warnings)",
                    report.added,
                    report.warnings.len()
                );
            }
        }

        log::info!("[Engine] Ready, press Ctrl-C to quit");
        loop {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => break,
                event = rx.recv() => match event {
                    Some(PlayerEvent::PlaybackInfo { .. }) => {}
                    Some(event) => log::info!("[Engine] {}", event.name()),
                    None => break,
                },
            }
        }

        engine.shutdown().await?;
        Ok(())
    })
}
