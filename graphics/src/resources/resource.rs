//! Exclusive ownership of backend handles.

use std::sync::Arc;

use crate::backend::{GpuBackend, GpuHandle};
use crate::error::GraphicsError;

/// A type that controls a handle to an unmanaged graphics resource.
///
/// Implementors own their handle exclusively: it is acquired when the value
/// is built, released when it is dropped, and never shared with another value.
pub trait GraphicsResource {
    /// Get the backend handle.
    fn handle(&self) -> GpuHandle;

    /// Get the backend that owns the handle.
    fn backend(&self) -> &Arc<dyn GpuBackend>;
}

/// A buffer handle released back to its backend on drop.
///
/// An `OwnedHandle` only exists once acquisition succeeded, so a failed
/// acquisition never leads to a release.
pub struct OwnedHandle {
    backend: Arc<dyn GpuBackend>,
    handle: GpuHandle,
}

impl OwnedHandle {
    /// Allocate a buffer handle from `backend`.
    ///
    /// # Errors
    ///
    /// Propagates the backend's allocation failure.
    pub fn acquire_buffer(backend: &Arc<dyn GpuBackend>) -> Result<Self, GraphicsError> {
        let handle = backend.create_buffer_handle()?;
        log::debug!("{}: acquired buffer handle {}", backend.name(), handle);
        Ok(Self {
            backend: Arc::clone(backend),
            handle,
        })
    }
}

impl GraphicsResource for OwnedHandle {
    fn handle(&self) -> GpuHandle {
        self.handle
    }

    fn backend(&self) -> &Arc<dyn GpuBackend> {
        &self.backend
    }
}

impl Drop for OwnedHandle {
    fn drop(&mut self) {
        log::debug!(
            "{}: releasing buffer handle {}",
            self.backend.name(),
            self.handle
        );
        self.backend.release_buffer_handle(self.handle);
    }
}

impl std::fmt::Debug for OwnedHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OwnedHandle")
            .field("backend", &self.backend.name())
            .field("handle", &self.handle)
            .finish()
    }
}

static_assertions::assert_impl_all!(OwnedHandle: Send, Sync);
static_assertions::assert_not_impl_any!(OwnedHandle: Clone, Copy);
