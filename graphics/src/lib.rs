//! # InsectRTS Graphics
//!
//! GPU buffer management for the InsectRTS renderer.
//!
//! ## Overview
//!
//! This crate provides:
//! - [`Buffer`] - typed host-side data mirrored lazily into GPU memory
//! - [`GraphicsResource`] / [`OwnedHandle`] - exclusive ownership of backend handles
//! - [`GpuBackend`] - trait for the graphics context the resources talk to
//! - Multiple backend support: wgpu and Dummy (for testing)
//!
//! ## Example
//!
//! ```ignore
//! use insect_graphics::{Buffer, BufferTarget, BufferUsageHint, InstanceParameters};
//!
//! let backend = insect_graphics::create_backend(&InstanceParameters::default())?;
//! let mut vertices = Buffer::<[f32; 3]>::new(&backend, BufferTarget::ArrayBuffer)?;
//! vertices.replace(&[[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]]);
//! vertices.synchronize(BufferUsageHint::DynamicDraw)?;
//! ```

pub mod backend;
pub mod error;
pub mod instance;
pub mod resources;
pub mod types;

// Re-export main types for convenience
#[cfg(feature = "wgpu-backend")]
pub use backend::wgpu_impl::WgpuBackend;
pub use backend::{BackendStats, DummyBackend, GpuBackend, GpuHandle, create_backend};
pub use error::GraphicsError;
pub use instance::{BackendType, DeviceCapabilities, InstanceParameters, WgpuBackendType};
pub use resources::{Buffer, GraphicsResource, OwnedHandle, SyncOutcome};
pub use types::{BufferTarget, BufferUsageHint};

/// Graphics library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize the graphics subsystem.
///
/// This should be called before using any graphics functionality.
pub fn init() {
    log::info!("InsectRTS Graphics v{} initialized", VERSION);
}
