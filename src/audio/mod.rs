pub mod backend;
pub mod buffer;
pub mod decoder;
pub mod loader;
pub mod native;
pub mod null;
pub mod output;
pub mod types;

pub use backend::{create_backend, AudioBackend, BackendEvent, BackendKind, LoadRequest};
pub use native::NativeBackend;
pub use null::NullBackend;
