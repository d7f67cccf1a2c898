pub mod m3u;
pub mod manager;
pub mod models;

pub use manager::PlaylistManager;
pub use models::PlaylistInfo;
