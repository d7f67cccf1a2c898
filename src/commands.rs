//! Every operation a presentation layer can invoke, as async methods on
//! [`Engine`](crate::engine::Engine). Handlers take the state lock only for
//! synchronous sections and never hold it across an `.await`.

pub mod library;
pub mod playback;
pub mod playlist;
pub mod queue;

use crate::engine::EngineState;
use crate::errors::AppError;
use crate::queue::PlayerLocation;
use uuid::Uuid;

/// Checks that a queue request names a song and origin that exist.
fn validate_entry(
    state: &EngineState,
    song: &Uuid,
    location: &PlayerLocation,
) -> Result<(), AppError> {
    state.library.get(song)?;
    if let PlayerLocation::Playlist(playlist) = location {
        state.playlists.info(playlist)?;
    }
    Ok(())
}
