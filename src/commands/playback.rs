use crate::engine::{Engine, EngineState};
use crate::playback::{PlaybackState, VolumeLevel};

impl Engine {
    fn with_transport<R>(&self, f: impl FnOnce(&mut EngineState) -> R) -> R {
        f(&mut self.state.write())
    }

    /// Resumes when paused, starts the queue head when stopped.
    pub async fn play(&self) {
        self.with_transport(|state| {
            let EngineState {
                library,
                queue,
                player,
                ..
            } = state;
            player.play(queue, library);
        })
    }

    pub async fn pause(&self) {
        self.with_transport(|state| state.player.pause())
    }

    pub async fn stop(&self) {
        self.with_transport(|state| state.player.stop())
    }

    pub async fn next(&self) {
        self.with_transport(|state| {
            let EngineState {
                library,
                queue,
                player,
                ..
            } = state;
            player.next(queue, library);
        })
    }

    pub async fn prev(&self) {
        self.with_transport(|state| {
            let EngineState {
                library,
                queue,
                player,
                ..
            } = state;
            player.prev(queue, library);
        })
    }

    /// Seeks the loaded track to `position_ms`, clamped to its length.
    pub async fn seek(&self, position_ms: u64) {
        self.with_transport(|state| state.player.seek(position_ms))
    }

    pub async fn set_volume(&self, level: VolumeLevel) {
        self.with_transport(|state| state.player.set_volume(level));
        self.config.write().volume = level.get();
    }

    pub async fn get_playback_state(&self) -> PlaybackState {
        let state = self.state.read();
        state.player.state(&state.queue)
    }
}
