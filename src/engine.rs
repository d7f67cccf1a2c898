//! The engine ties the library, playlists, queue and transport together
//! behind one lock and owns the background tasks that keep them moving.

use parking_lot::{Mutex, RwLock};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::audio::{create_backend, AudioBackend};
use crate::config::Config;
use crate::database::DatabaseManager;
use crate::errors::AppError;
use crate::events::{EventBus, EventReceiver};
use crate::library::LibraryIndex;
use crate::playback::{PlaybackController, VolumeLevel};
use crate::playlist::PlaylistManager;
use crate::queue::PlayQueue;
use crate::scrobble;

const VOLUME_SETTING: &str = "player_volume";
const SHUFFLE_SETTING: &str = "queue_shuffle";

pub struct EngineState {
    pub library: LibraryIndex,
    pub playlists: PlaylistManager,
    pub queue: PlayQueue,
    pub player: PlaybackController,
}

pub struct Engine {
    pub(crate) state: Arc<RwLock<EngineState>>,
    pub(crate) events: EventBus,
    pub(crate) config: Arc<RwLock<Config>>,
    pub(crate) store: Option<Persister>,
    pub(crate) tasks: Mutex<Vec<JoinHandle<()>>>,
    shutdown: Arc<AtomicBool>,
}

impl Engine {
    /// Starts with the backend named in `config`.
    pub async fn start(config: Config) -> Result<Self, AppError> {
        let backend = create_backend(config.backend);
        Self::start_with_backend(config, backend).await
    }

    pub async fn start_with_backend(
        config: Config,
        backend: Box<dyn AudioBackend>,
    ) -> Result<Self, AppError> {
        let events = EventBus::new();

        let store = match &config.database_path {
            Some(path) => Some(DatabaseManager::open(path).await?),
            None => None,
        };

        let (songs, playlists, volume, shuffle) = match &store {
            Some(db) => {
                let volume = db
                    .get_setting(VOLUME_SETTING)
                    .await?
                    .and_then(|v| v.parse::<VolumeLevel>().ok())
                    .unwrap_or_else(|| VolumeLevel::from(config.volume));
                let shuffle = db.get_setting(SHUFFLE_SETTING).await?.as_deref() == Some("true");
                (db.load_library().await?, db.load_playlists().await?, volume, shuffle)
            }
            None => (Vec::new(), Vec::new(), VolumeLevel::from(config.volume), false),
        };

        log::info!(
            "[Engine] Loaded {} songs and {} playlists",
            songs.len(),
            playlists.len()
        );

        let mut player = PlaybackController::new(backend, events.clone());
        player.set_volume(volume);
        let mut queue = PlayQueue::new();
        queue.set_shuffle(shuffle);

        let state = Arc::new(RwLock::new(EngineState {
            library: LibraryIndex::from_songs(songs),
            playlists: PlaylistManager::from_playlists(playlists),
            queue,
            player,
        }));
        let shutdown = Arc::new(AtomicBool::new(false));

        let mut tasks = vec![spawn_timer(
            state.clone(),
            shutdown.clone(),
            config.position_interval_ms,
        )];
        let submitters = scrobble::build_submitters(&config.connections);
        if let Some(handle) =
            scrobble::spawn_connector(&events, submitters, config.connections.scrobble_dwell_secs)
        {
            tasks.push(handle);
        }

        Ok(Self {
            state,
            events,
            config: Arc::new(RwLock::new(config)),
            store: store.map(Persister::new),
            tasks: Mutex::new(tasks),
            shutdown,
        })
    }

    pub fn subscribe(&self) -> EventReceiver {
        self.events.subscribe()
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn config(&self) -> Config {
        self.config.read().clone()
    }

    pub fn is_running(&self) -> bool {
        !self.shutdown.load(Ordering::Relaxed)
    }

    /// Writes library, playlists and settings to the store, if there is one.
    pub async fn persist(&self) -> Result<(), AppError> {
        match &self.store {
            Some(store) => store.save(&self.state).await,
            None => Ok(()),
        }
    }

    /// Like [`Engine::persist`] but only logs failures.
    pub(crate) async fn persist_quietly(&self) {
        if let Some(store) = &self.store {
            store.save_quietly(&self.state).await;
        }
    }

    pub(crate) fn track_task(&self, handle: JoinHandle<()>) {
        let mut tasks = self.tasks.lock();
        tasks.retain(|t| !t.is_finished());
        tasks.push(handle);
    }

    /// Stops playback, flushes state to disk and cancels background work.
    /// Safe to call more than once.
    pub async fn shutdown(&self) -> Result<(), AppError> {
        if self.shutdown.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        log::info!("[Engine] Shutting down");

        let volume = {
            let mut state = self.state.write();
            state.player.stop();
            state.player.volume()
        };

        let result = self.persist().await;

        {
            let mut config = self.config.write();
            config.volume = volume;
            if let Err(e) = config.save() {
                log::warn!("[Engine] Failed to save config: {}", e);
            }
        }

        for task in self.tasks.lock().drain(..) {
            task.abort();
        }
        self.events.close();

        if let Some(store) = &self.store {
            store.close().await;
        }
        result
    }
}

/// Store handle shared by commands and background scans. Writers queue on
/// `lock` and snapshot only once they hold it, so a stale snapshot can never
/// overwrite a newer one.
#[derive(Clone)]
pub(crate) struct Persister {
    db: DatabaseManager,
    lock: Arc<tokio::sync::Mutex<()>>,
}

impl Persister {
    fn new(db: DatabaseManager) -> Self {
        Self {
            db,
            lock: Arc::new(tokio::sync::Mutex::new(())),
        }
    }

    pub(crate) async fn save(&self, state: &RwLock<EngineState>) -> Result<(), AppError> {
        let _writer = self.lock.lock().await;

        let (songs, playlists, volume, shuffle) = {
            let state = state.read();
            (
                state.library.list().to_vec(),
                state.playlists.list().to_vec(),
                state.player.volume(),
                state.queue.is_shuffled(),
            )
        };

        self.db.save_library(&songs).await?;
        self.db.save_playlists(&playlists).await?;
        self.db
            .set_setting(VOLUME_SETTING, &volume.to_string())
            .await?;
        self.db
            .set_setting(SHUFFLE_SETTING, &shuffle.to_string())
            .await?;
        log::debug!("[Engine] Persisted {} songs", songs.len());
        Ok(())
    }

    pub(crate) async fn save_quietly(&self, state: &RwLock<EngineState>) {
        if let Err(e) = self.save(state).await {
            log::warn!("[Engine] Failed to persist state: {}", e);
        }
    }

    async fn close(&self) {
        let _writer = self.lock.lock().await;
        self.db.pool.close().await;
    }
}

/// Drives [`PlaybackController::tick`] until shutdown.
fn spawn_timer(
    state: Arc<RwLock<EngineState>>,
    shutdown: Arc<AtomicBool>,
    interval_ms: u64,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_millis(interval_ms.max(10)));
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            interval.tick().await;
            if shutdown.load(Ordering::Relaxed) {
                break;
            }
            let mut guard = state.write();
            let EngineState {
                library,
                queue,
                player,
                ..
            } = &mut *guard;
            player.tick(queue, library);
        }
        log::debug!("[Engine] Timer stopped");
    })
}
