//! GPU backend abstraction layer.
//!
//! This module provides a trait-based abstraction over the graphics context
//! that owns buffer objects, so the resource types can work against different
//! GPU APIs.
//!
//! # Available Backends
//!
//! - `dummy` (always built): headless in-memory backend for testing and CI
//! - `wgpu-backend`: cross-platform backend using wgpu
//!
//! # Architecture
//!
//! Each backend implements the [`GpuBackend`] trait, which provides:
//! - Buffer handle allocation and release
//! - Per-target binding state
//! - Full allocation-with-copy and partial update of the bound buffer
//! - Blocking readback for verification

pub mod dummy;

#[cfg(feature = "wgpu-backend")]
pub mod wgpu_impl;

pub use dummy::{BackendStats, DummyBackend};

use std::collections::HashMap;
use std::fmt;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use parking_lot::Mutex;

use crate::error::GraphicsError;
use crate::instance::{BackendType, DeviceCapabilities, InstanceParameters};
use crate::types::{BufferTarget, BufferUsageHint};

/// Opaque identifier of a GPU resource owned by a backend.
///
/// Handles are never zero; zero is reserved for "nothing bound".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GpuHandle(NonZeroU32);

impl GpuHandle {
    /// Wrap a raw id, returning `None` for zero.
    pub fn new(raw: u32) -> Option<Self> {
        NonZeroU32::new(raw).map(Self)
    }

    /// Get the raw id.
    pub fn get(self) -> u32 {
        self.0.get()
    }
}

impl fmt::Display for GpuHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Sequential handle generator shared by the backends.
#[derive(Debug)]
pub(crate) struct HandleAllocator {
    next: AtomicU32,
}

impl HandleAllocator {
    pub(crate) fn new() -> Self {
        Self::starting_at(1)
    }

    fn starting_at(next: u32) -> Self {
        Self {
            next: AtomicU32::new(next),
        }
    }

    /// Hand out the next id, failing once the id space is exhausted.
    ///
    /// Exhaustion is permanent: ids are never reused.
    pub(crate) fn allocate(&self) -> Result<GpuHandle, GraphicsError> {
        self.next
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |raw| {
                (raw != 0).then(|| raw.checked_add(1).unwrap_or(0))
            })
            .ok()
            .and_then(GpuHandle::new)
            .ok_or_else(|| {
                GraphicsError::ResourceCreationFailed("buffer handle space exhausted".to_string())
            })
    }
}

/// Which handle is active on each binding point.
#[derive(Debug, Default)]
pub(crate) struct BindingTable {
    bound: Mutex<HashMap<BufferTarget, GpuHandle>>,
}

impl BindingTable {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn set(&self, target: BufferTarget, handle: Option<GpuHandle>) {
        let mut bound = self.bound.lock();
        match handle {
            Some(handle) => {
                bound.insert(target, handle);
            }
            None => {
                bound.remove(&target);
            }
        }
    }

    pub(crate) fn get(&self, target: BufferTarget) -> Option<GpuHandle> {
        self.bound.lock().get(&target).copied()
    }

    /// Get the handle bound to `target`, or fail with [`GraphicsError::NoResourceBound`].
    pub(crate) fn require(&self, target: BufferTarget) -> Result<GpuHandle, GraphicsError> {
        self.get(target)
            .ok_or(GraphicsError::NoResourceBound(target.name()))
    }

    /// Drop every binding that refers to `handle`.
    pub(crate) fn forget(&self, handle: GpuHandle) {
        self.bound.lock().retain(|_, bound| *bound != handle);
    }
}

/// GPU backend trait for abstracting the graphics context.
///
/// All calls are expected to come from the thread that owns the context.
/// Implementations use interior mutability so a backend can be shared behind
/// an `Arc` by every resource created from it.
pub trait GpuBackend: Send + Sync + 'static {
    /// Get the backend name.
    fn name(&self) -> &'static str;

    /// Get the backend capabilities.
    fn capabilities(&self) -> DeviceCapabilities;

    /// Allocate one buffer handle. No storage is attached until the first
    /// [`buffer_data`](Self::buffer_data) on it.
    fn create_buffer_handle(&self) -> Result<GpuHandle, GraphicsError>;

    /// Release a buffer handle and its storage.
    ///
    /// Any binding that refers to the handle is cleared.
    fn release_buffer_handle(&self, handle: GpuHandle);

    /// Make `handle` active for `target`, or clear the target with `None`.
    fn bind_buffer(&self, target: BufferTarget, handle: Option<GpuHandle>);

    /// Get the handle currently active for `target`.
    fn bound_buffer(&self, target: BufferTarget) -> Option<GpuHandle>;

    /// Replace the storage of the buffer bound to `target` with a new
    /// allocation of exactly `data.len()` bytes initialised from `data`.
    fn buffer_data(
        &self,
        target: BufferTarget,
        data: &[u8],
        usage: BufferUsageHint,
    ) -> Result<(), GraphicsError>;

    /// Overwrite `data.len()` bytes at `offset` in the storage of the buffer
    /// bound to `target` without reallocating it.
    fn buffer_sub_data(
        &self,
        target: BufferTarget,
        offset: u64,
        data: &[u8],
    ) -> Result<(), GraphicsError>;

    /// Read bytes back from a buffer's storage.
    ///
    /// This is a blocking operation that waits for the GPU to finish.
    fn read_buffer(
        &self,
        handle: GpuHandle,
        offset: u64,
        size: u64,
    ) -> Result<Vec<u8>, GraphicsError>;
}

/// Creates the backend selected by `params`.
pub fn create_backend(params: &InstanceParameters) -> Result<Arc<dyn GpuBackend>, GraphicsError> {
    match params.backend {
        BackendType::Dummy => {
            log::info!("Using dummy backend");
            Ok(Arc::new(dummy::DummyBackend::with_params(params)))
        }
        BackendType::Wgpu => create_wgpu_backend(params),
        BackendType::Auto => match create_wgpu_backend(params) {
            Ok(backend) => Ok(backend),
            Err(e) => {
                log::warn!("Failed to create wgpu backend: {}", e);
                log::info!("Using dummy backend");
                Ok(Arc::new(dummy::DummyBackend::with_params(params)))
            }
        },
    }
}

#[cfg(feature = "wgpu-backend")]
fn create_wgpu_backend(params: &InstanceParameters) -> Result<Arc<dyn GpuBackend>, GraphicsError> {
    let backend = wgpu_impl::WgpuBackend::with_params(params)?;
    log::info!("Using wgpu backend");
    Ok(Arc::new(backend))
}

#[cfg(not(feature = "wgpu-backend"))]
fn create_wgpu_backend(_params: &InstanceParameters) -> Result<Arc<dyn GpuBackend>, GraphicsError> {
    Err(GraphicsError::InitializationFailed(
        "wgpu backend not compiled in (enable the `wgpu-backend` feature)".to_string(),
    ))
}
