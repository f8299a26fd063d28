//! CPU-mirrored GPU buffer.
//!
//! A [`Buffer`] owns a staging sequence of `T` on the host and a backend
//! handle for the matching GPU allocation. Mutating the staging copy marks the
//! buffer dirty; [`Buffer::synchronize`] then does the least work needed to make
//! the GPU copy match:
//!
//! - nothing, if the buffer is clean;
//! - an in-place update, if the current allocation is large enough;
//! - a full reallocation sized to the staging data otherwise.
//!
//! GPU capacity never shrinks, so a buffer whose size fluctuates below its
//! historical peak (typical for per-frame vertex, index and uniform data) stops
//! reallocating after the first few frames.
//!
//! # Example
//!
//! ```ignore
//! let mut vertices = Buffer::<f32>::with_capacity(&backend, BufferTarget::ArrayBuffer, 4)?;
//! vertices.as_mut_slice().copy_from_slice(&[0.0, 1.0, 2.0, 3.0]);
//! vertices.synchronize(BufferUsageHint::DynamicDraw)?; // allocates 16 bytes
//!
//! vertices.truncate(2);
//! vertices.synchronize(BufferUsageHint::DynamicDraw)?; // updates in place
//! ```
//!
//! # Context
//!
//! Every operation must run on the thread that owns the backend's context, and
//! the context must outlive the buffer. Holding an `Arc` to the backend keeps
//! the backend object alive but cannot keep a torn-down native context valid.

use std::any::type_name;
use std::fmt;
use std::sync::Arc;

use bytemuck::Pod;

use crate::backend::{GpuBackend, GpuHandle};
use crate::error::GraphicsError;
use crate::types::{BufferTarget, BufferUsageHint};

use super::resource::{GraphicsResource, OwnedHandle};

/// What a call to [`Buffer::synchronize`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SyncOutcome {
    /// The buffer was clean; nothing was uploaded.
    Clean,
    /// The existing allocation was updated in place.
    Updated {
        /// Bytes written.
        bytes: u64,
    },
    /// A new allocation of exactly `bytes` replaced the previous one.
    Allocated {
        /// Size of the new allocation.
        bytes: u64,
    },
}

impl SyncOutcome {
    /// Whether anything was sent to the backend.
    pub fn uploaded(&self) -> bool {
        !matches!(self, Self::Clean)
    }

    /// Whether the GPU storage was (re)allocated.
    pub fn reallocated(&self) -> bool {
        matches!(self, Self::Allocated { .. })
    }

    /// Bytes sent to the backend.
    pub fn bytes(&self) -> u64 {
        match self {
            Self::Clean => 0,
            Self::Updated { bytes } | Self::Allocated { bytes } => *bytes,
        }
    }
}

/// Binds a buffer for the duration of a scope and restores the previous
/// binding of the target when dropped, including on early return.
struct BindScope<'a> {
    backend: &'a dyn GpuBackend,
    target: BufferTarget,
    previous: Option<GpuHandle>,
}

impl<'a> BindScope<'a> {
    fn enter(backend: &'a dyn GpuBackend, target: BufferTarget, handle: GpuHandle) -> Self {
        let previous = backend.bound_buffer(target);
        backend.bind_buffer(target, Some(handle));
        Self {
            backend,
            target,
            previous,
        }
    }
}

impl Drop for BindScope<'_> {
    fn drop(&mut self) {
        self.backend.bind_buffer(self.target, self.previous);
    }
}

/// A typed buffer whose contents are mirrored to GPU memory on demand.
///
/// The staging sequence is the source of truth. The GPU allocation is a
/// lazily updated copy of it whose size in bytes only ever grows.
pub struct Buffer<T: Pod> {
    resource: OwnedHandle,
    target: BufferTarget,
    staging: Vec<T>,
    // `None` until the first synchronization allocates GPU storage.
    gpu_capacity: Option<u64>,
    dirty: bool,
}

impl<T: Pod> Buffer<T> {
    /// Size of one element in bytes.
    pub const ELEMENT_SIZE: u64 = std::mem::size_of::<T>() as u64;

    /// Create a buffer holding a single zeroed element.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot allocate a handle.
    pub fn new(backend: &Arc<dyn GpuBackend>, target: BufferTarget) -> Result<Self, GraphicsError> {
        Self::with_capacity(backend, target, 1)
    }

    /// Create a buffer holding `capacity` zeroed elements.
    ///
    /// A capacity of zero is allowed; the buffer still needs one
    /// synchronization to create its (empty) GPU allocation.
    ///
    /// # Errors
    ///
    /// Returns [`GraphicsError::InvalidParameter`] if the staging size in bytes
    /// is not addressable, [`GraphicsError::OutOfMemory`] if the host cannot
    /// hold it, or the backend's error if it cannot allocate a handle.
    pub fn with_capacity(
        backend: &Arc<dyn GpuBackend>,
        target: BufferTarget,
        capacity: usize,
    ) -> Result<Self, GraphicsError> {
        const { assert!(std::mem::size_of::<T>() > 0, "buffer elements cannot be zero-sized") };

        let staging = Self::zeroed_staging(capacity)?;
        let resource = OwnedHandle::acquire_buffer(backend)?;
        Ok(Self {
            resource,
            target,
            staging,
            gpu_capacity: None,
            dirty: true,
        })
    }

    fn zeroed_staging(capacity: usize) -> Result<Vec<T>, GraphicsError> {
        let addressable = (capacity as u64)
            .checked_mul(Self::ELEMENT_SIZE)
            .is_some_and(|bytes| bytes <= isize::MAX as u64);
        if !addressable {
            return Err(GraphicsError::InvalidParameter(format!(
                "buffer of {capacity} elements of {} bytes is too large",
                Self::ELEMENT_SIZE
            )));
        }

        let mut staging = Vec::new();
        staging
            .try_reserve_exact(capacity)
            .map_err(|_| GraphicsError::OutOfMemory)?;
        staging.resize(capacity, T::zeroed());
        Ok(staging)
    }

    /// Create a buffer from a signed element count.
    ///
    /// # Errors
    ///
    /// Returns [`GraphicsError::InvalidParameter`] if `capacity` is negative,
    /// before any handle is allocated.
    pub fn with_signed_capacity(
        backend: &Arc<dyn GpuBackend>,
        target: BufferTarget,
        capacity: i64,
    ) -> Result<Self, GraphicsError> {
        let capacity = usize::try_from(capacity).map_err(|_| {
            GraphicsError::InvalidParameter(format!(
                "buffer capacity must not be negative (got {capacity})"
            ))
        })?;
        Self::with_capacity(backend, target, capacity)
    }

    /// Create a buffer whose staging sequence is a copy of `data`.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot allocate a handle.
    pub fn from_slice(
        backend: &Arc<dyn GpuBackend>,
        target: BufferTarget,
        data: &[T],
    ) -> Result<Self, GraphicsError> {
        let mut buffer = Self::with_capacity(backend, target, 0)?;
        buffer.staging.extend_from_slice(data);
        Ok(buffer)
    }

    // ------------------------------------------------------------------------
    // Observation
    // ------------------------------------------------------------------------

    /// Number of elements in the staging sequence.
    #[inline]
    pub fn count(&self) -> usize {
        self.staging.len()
    }

    /// Whether the staging sequence is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.staging.is_empty()
    }

    /// Get the binding target.
    #[inline]
    pub fn target(&self) -> BufferTarget {
        self.target
    }

    /// Whether the staging data may differ from the GPU copy.
    #[inline]
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Size in bytes of the current GPU allocation, 0 before the first upload.
    #[inline]
    pub fn gpu_capacity_bytes(&self) -> u64 {
        self.gpu_capacity.unwrap_or(0)
    }

    /// Whether GPU storage has been allocated yet.
    #[inline]
    pub fn is_allocated(&self) -> bool {
        self.gpu_capacity.is_some()
    }

    /// Size of the staging data in bytes.
    #[inline]
    pub fn size_bytes(&self) -> u64 {
        Self::ELEMENT_SIZE * self.staging.len() as u64
    }

    /// View the staging sequence.
    #[inline]
    pub fn as_slice(&self) -> &[T] {
        &self.staging
    }

    /// Get an element of the staging sequence.
    #[inline]
    pub fn get(&self, index: usize) -> Option<&T> {
        self.staging.get(index)
    }

    /// Iterate over the staging sequence.
    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.staging.iter()
    }

    // ------------------------------------------------------------------------
    // Mutation (every accessor here marks the buffer dirty)
    // ------------------------------------------------------------------------

    /// Force the next [`synchronize`](Self::synchronize) to upload.
    #[inline]
    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    /// Mutable view of the staging sequence.
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        self.dirty = true;
        &mut self.staging
    }

    /// Mutable access to the whole staging vector, for resizing edits.
    pub fn staging_mut(&mut self) -> &mut Vec<T> {
        self.dirty = true;
        &mut self.staging
    }

    /// Get a mutable element; marks the buffer dirty only if `index` is in range.
    pub fn get_mut(&mut self, index: usize) -> Option<&mut T> {
        let element = self.staging.get_mut(index)?;
        self.dirty = true;
        Some(element)
    }

    /// Overwrite one element.
    ///
    /// # Errors
    ///
    /// Returns [`GraphicsError::InvalidParameter`] if `index` is out of range.
    pub fn set(&mut self, index: usize, value: T) -> Result<(), GraphicsError> {
        let count = self.staging.len();
        let element = self.get_mut(index).ok_or_else(|| {
            GraphicsError::InvalidParameter(format!(
                "index {index} out of range for buffer of {count} elements"
            ))
        })?;
        *element = value;
        Ok(())
    }

    /// Append one element.
    pub fn push(&mut self, value: T) {
        self.dirty = true;
        self.staging.push(value);
    }

    /// Append a run of elements.
    pub fn extend_from_slice(&mut self, values: &[T]) {
        self.dirty = true;
        self.staging.extend_from_slice(values);
    }

    /// Shorten the staging sequence to `len` elements.
    pub fn truncate(&mut self, len: usize) {
        self.dirty = true;
        self.staging.truncate(len);
    }

    /// Resize the staging sequence, filling new slots with `value`.
    pub fn resize(&mut self, len: usize, value: T) {
        self.dirty = true;
        self.staging.resize(len, value);
    }

    /// Remove every element.
    pub fn clear(&mut self) {
        self.dirty = true;
        self.staging.clear();
    }

    /// Replace the staging sequence with a copy of `data`.
    pub fn replace(&mut self, data: &[T]) {
        self.dirty = true;
        self.staging.clear();
        self.staging.extend_from_slice(data);
    }

    // ------------------------------------------------------------------------
    // GPU side
    // ------------------------------------------------------------------------

    /// Make this buffer the active one for its target.
    pub fn bind(&self) {
        self.resource
            .backend()
            .bind_buffer(self.target, Some(self.resource.handle()));
    }

    /// Clear the binding of this buffer's target.
    pub fn unbind(&self) {
        self.resource.backend().bind_buffer(self.target, None);
    }

    /// Upload the staging data if it changed since the last upload.
    ///
    /// Reuses the current allocation when it is large enough; otherwise
    /// allocates exactly [`size_bytes`](Self::size_bytes) with `usage`. The
    /// usage hint is ignored on the in-place path. The target's binding is the
    /// same after the call as before it, whether the call succeeds or fails.
    ///
    /// # Errors
    ///
    /// Propagates backend allocation failures such as
    /// [`GraphicsError::OutOfMemory`] or [`GraphicsError::BufferTooLarge`]. On
    /// error the buffer stays dirty and its GPU capacity is unchanged.
    pub fn synchronize(&mut self, usage: BufferUsageHint) -> Result<SyncOutcome, GraphicsError> {
        if !self.dirty {
            return Ok(SyncOutcome::Clean);
        }

        let backend = self.resource.backend().as_ref();
        let _scope = BindScope::enter(backend, self.target, self.resource.handle());

        let bytes: &[u8] = bytemuck::cast_slice(&self.staging);
        let required = bytes.len() as u64;

        let outcome = match self.gpu_capacity {
            Some(capacity) if capacity >= required => {
                backend.buffer_sub_data(self.target, 0, bytes)?;
                SyncOutcome::Updated { bytes: required }
            }
            _ => {
                backend.buffer_data(self.target, bytes, usage)?;
                self.gpu_capacity = Some(required);
                SyncOutcome::Allocated { bytes: required }
            }
        };
        self.dirty = false;

        log::trace!("{}: {:?}", self.describe(), outcome);
        Ok(outcome)
    }

    /// Read the GPU copy of the staging range back as raw bytes.
    ///
    /// Reads [`size_bytes`](Self::size_bytes) bytes, so call it after
    /// [`synchronize`](Self::synchronize).
    ///
    /// # Errors
    ///
    /// Fails if the GPU allocation is smaller than the staging data.
    pub fn read_back_bytes(&self) -> Result<Vec<u8>, GraphicsError> {
        self.resource
            .backend()
            .read_buffer(self.resource.handle(), 0, self.size_bytes())
    }

    /// Read the GPU copy of the staging range back as elements.
    ///
    /// # Errors
    ///
    /// Fails if the GPU allocation is smaller than the staging data.
    pub fn read_back(&self) -> Result<Vec<T>, GraphicsError> {
        Ok(bytemuck::pod_collect_to_vec(&self.read_back_bytes()?))
    }

    /// Describe this buffer for diagnostics.
    pub fn describe(&self) -> String {
        format!(
            "Buffer<{}> Handle:{} ElementSize:{} Count:{}",
            type_name::<T>(),
            self.resource.handle(),
            Self::ELEMENT_SIZE,
            self.count()
        )
    }
}

impl<T: Pod> GraphicsResource for Buffer<T> {
    fn handle(&self) -> GpuHandle {
        self.resource.handle()
    }

    fn backend(&self) -> &Arc<dyn GpuBackend> {
        self.resource.backend()
    }
}

impl<T: Pod> fmt::Display for Buffer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.describe())
    }
}

impl<T: Pod> fmt::Debug for Buffer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Buffer")
            .field("element", &type_name::<T>())
            .field("target", &self.target)
            .field("handle", &self.resource.handle())
            .field("count", &self.count())
            .field("gpu_capacity", &self.gpu_capacity)
            .field("dirty", &self.dirty)
            .finish()
    }
}

// Ensure Buffer is Send + Sync and cannot be duplicated
static_assertions::assert_impl_all!(Buffer<f32>: Send, Sync);
static_assertions::assert_not_impl_any!(Buffer<f32>: Clone);
