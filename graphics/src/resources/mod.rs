//! GPU resources.
//!
//! - [`GraphicsResource`] - common interface of types owning a backend handle
//! - [`OwnedHandle`] - RAII wrapper that releases a handle on drop
//! - [`Buffer`] - typed, CPU-mirrored GPU buffer with lazy synchronization

mod buffer;
mod resource;

pub use buffer::{Buffer, SyncOutcome};
pub use resource::{GraphicsResource, OwnedHandle};
