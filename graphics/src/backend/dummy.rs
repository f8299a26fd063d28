//! Dummy GPU backend for testing and development.
//!
//! This backend doesn't talk to a GPU. Buffer storage lives in host memory,
//! so uploads can be read back and every call the resource types make can be
//! counted, which makes it the reference backend for tests and CI.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;

use crate::error::GraphicsError;
use crate::instance::{DeviceCapabilities, InstanceParameters};
use crate::types::{BufferTarget, BufferUsageHint};

use super::{BindingTable, GpuBackend, GpuHandle, HandleAllocator};

/// Counters for the calls a [`DummyBackend`] has served.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BackendStats {
    /// Buffer handles allocated.
    pub handles_created: u64,
    /// Buffer handles released.
    pub handles_released: u64,
    /// Full allocations (`buffer_data` calls).
    pub full_allocations: u64,
    /// In-place updates (`buffer_sub_data` calls).
    pub partial_updates: u64,
    /// Total bytes written by both kinds of upload.
    pub bytes_uploaded: u64,
}

impl BackendStats {
    /// Number of handles allocated and not yet released.
    pub fn live_handles(&self) -> u64 {
        self.handles_created - self.handles_released
    }

    /// Total number of uploads of either kind.
    pub fn uploads(&self) -> u64 {
        self.full_allocations + self.partial_updates
    }
}

/// Host-side storage of one buffer.
#[derive(Debug)]
struct DummyAllocation {
    data: Vec<u8>,
    usage: BufferUsageHint,
}

/// Dummy GPU backend.
#[derive(Debug)]
pub struct DummyBackend {
    capabilities: DeviceCapabilities,
    handles: HandleAllocator,
    // `None` until the first `buffer_data` on the handle.
    storage: Mutex<HashMap<GpuHandle, Option<DummyAllocation>>>,
    bindings: BindingTable,
    stats: Mutex<BackendStats>,
    fail_next_handle: AtomicBool,
}

impl DummyBackend {
    /// Create a new dummy backend.
    pub fn new() -> Self {
        Self::with_params(&InstanceParameters::default())
    }

    /// Create a new dummy backend honouring the limits in `params`.
    pub fn with_params(params: &InstanceParameters) -> Self {
        Self {
            capabilities: DeviceCapabilities::default().restricted_by(params),
            handles: HandleAllocator::new(),
            storage: Mutex::new(HashMap::new()),
            bindings: BindingTable::new(),
            stats: Mutex::new(BackendStats::default()),
            fail_next_handle: AtomicBool::new(false),
        }
    }

    /// Get a snapshot of the call counters.
    pub fn stats(&self) -> BackendStats {
        *self.stats.lock()
    }

    /// Make the next [`create_buffer_handle`](GpuBackend::create_buffer_handle) fail.
    pub fn fail_next_handle_allocation(&self) {
        self.fail_next_handle.store(true, Ordering::Release);
    }

    /// Check whether `handle` is currently allocated.
    pub fn is_live(&self, handle: GpuHandle) -> bool {
        self.storage.lock().contains_key(&handle)
    }

    /// Size of the storage attached to `handle`, if any.
    pub fn allocation_size(&self, handle: GpuHandle) -> Option<u64> {
        self.storage
            .lock()
            .get(&handle)
            .and_then(|alloc| alloc.as_ref())
            .map(|alloc| alloc.data.len() as u64)
    }

    /// Usage hint the storage attached to `handle` was allocated with.
    pub fn allocation_usage(&self, handle: GpuHandle) -> Option<BufferUsageHint> {
        self.storage
            .lock()
            .get(&handle)
            .and_then(|alloc| alloc.as_ref())
            .map(|alloc| alloc.usage)
    }
}

impl Default for DummyBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl GpuBackend for DummyBackend {
    fn name(&self) -> &'static str {
        "Dummy Backend"
    }

    fn capabilities(&self) -> DeviceCapabilities {
        self.capabilities
    }

    fn create_buffer_handle(&self) -> Result<GpuHandle, GraphicsError> {
        if self.fail_next_handle.swap(false, Ordering::AcqRel) {
            return Err(GraphicsError::ResourceCreationFailed(
                "injected handle allocation failure".to_string(),
            ));
        }

        let handle = self.handles.allocate()?;
        self.storage.lock().insert(handle, None);
        self.stats.lock().handles_created += 1;

        log::trace!("DummyBackend: created buffer handle {}", handle);
        Ok(handle)
    }

    fn release_buffer_handle(&self, handle: GpuHandle) {
        if self.storage.lock().remove(&handle).is_none() {
            log::warn!("DummyBackend: release of unknown buffer handle {}", handle);
            return;
        }
        self.bindings.forget(handle);
        self.stats.lock().handles_released += 1;

        log::trace!("DummyBackend: released buffer handle {}", handle);
    }

    fn bind_buffer(&self, target: BufferTarget, handle: Option<GpuHandle>) {
        if let Some(handle) = handle
            && !self.is_live(handle)
        {
            log::warn!(
                "DummyBackend: ignoring bind of unknown handle {} to {}",
                handle,
                target
            );
            return;
        }
        self.bindings.set(target, handle);
    }

    fn bound_buffer(&self, target: BufferTarget) -> Option<GpuHandle> {
        self.bindings.get(target)
    }

    fn buffer_data(
        &self,
        target: BufferTarget,
        data: &[u8],
        usage: BufferUsageHint,
    ) -> Result<(), GraphicsError> {
        let handle = self.bindings.require(target)?;
        let size = data.len() as u64;
        if size > self.capabilities.max_buffer_size {
            return Err(GraphicsError::BufferTooLarge {
                requested: size,
                max: self.capabilities.max_buffer_size,
            });
        }

        let mut storage = self.storage.lock();
        let slot = storage
            .get_mut(&handle)
            .ok_or(GraphicsError::InvalidHandle(handle.get()))?;
        *slot = Some(DummyAllocation {
            data: data.to_vec(),
            usage,
        });
        drop(storage);

        let mut stats = self.stats.lock();
        stats.full_allocations += 1;
        stats.bytes_uploaded += size;

        log::trace!(
            "DummyBackend: buffer_data target={} handle={} size={} usage={}",
            target,
            handle,
            size,
            usage
        );
        Ok(())
    }

    fn buffer_sub_data(
        &self,
        target: BufferTarget,
        offset: u64,
        data: &[u8],
    ) -> Result<(), GraphicsError> {
        let handle = self.bindings.require(target)?;

        let mut storage = self.storage.lock();
        let alloc = storage
            .get_mut(&handle)
            .ok_or(GraphicsError::InvalidHandle(handle.get()))?
            .as_mut()
            .ok_or_else(|| {
                GraphicsError::InvalidParameter(format!(
                    "buffer {handle} has no storage to update"
                ))
            })?;

        let size = alloc.data.len();
        let target_bytes = byte_range(offset, data.len() as u64)
            .and_then(|range| alloc.data.get_mut(range))
            .ok_or_else(|| {
                GraphicsError::InvalidParameter(format!(
                    "update of {} bytes at {offset} exceeds buffer size {size}",
                    data.len()
                ))
            })?;
        target_bytes.copy_from_slice(data);
        drop(storage);

        let mut stats = self.stats.lock();
        stats.partial_updates += 1;
        stats.bytes_uploaded += data.len() as u64;

        log::trace!(
            "DummyBackend: buffer_sub_data target={} handle={} offset={} len={}",
            target,
            handle,
            offset,
            data.len()
        );
        Ok(())
    }

    fn read_buffer(
        &self,
        handle: GpuHandle,
        offset: u64,
        size: u64,
    ) -> Result<Vec<u8>, GraphicsError> {
        log::trace!("DummyBackend: read_buffer offset={} size={}", offset, size);

        let storage = self.storage.lock();
        let data = match storage.get(&handle) {
            None => return Err(GraphicsError::InvalidHandle(handle.get())),
            Some(None) => &[][..],
            Some(Some(alloc)) => alloc.data.as_slice(),
        };

        byte_range(offset, size)
            .and_then(|range| data.get(range))
            .map(<[u8]>::to_vec)
            .ok_or_else(|| {
                GraphicsError::InvalidParameter(format!(
                    "read of {size} bytes at {offset} exceeds buffer size {}",
                    data.len()
                ))
            })
    }
}

/// `offset..offset + len` as host indices, if it is representable.
fn byte_range(offset: u64, len: u64) -> Option<std::ops::Range<usize>> {
    let start = usize::try_from(offset).ok()?;
    let end = start.checked_add(usize::try_from(len).ok()?)?;
    Some(start..end)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bound(backend: &DummyBackend, target: BufferTarget) -> GpuHandle {
        let handle = backend.create_buffer_handle().unwrap();
        backend.bind_buffer(target, Some(handle));
        handle
    }

    #[test]
    fn test_dummy_backend_name() {
        let backend = DummyBackend::new();
        assert_eq!(backend.name(), "Dummy Backend");
    }

    #[test]
    fn test_buffer_data_then_read() {
        let backend = DummyBackend::new();
        let handle = bound(&backend, BufferTarget::ArrayBuffer);

        backend
            .buffer_data(BufferTarget::ArrayBuffer, &[1, 2, 3, 4], BufferUsageHint::StaticDraw)
            .unwrap();

        assert_eq!(backend.allocation_size(handle), Some(4));
        assert_eq!(
            backend.allocation_usage(handle),
            Some(BufferUsageHint::StaticDraw)
        );
        assert_eq!(backend.read_buffer(handle, 1, 2).unwrap(), vec![2, 3]);
    }

    #[test]
    fn test_sub_data_keeps_allocation_size() {
        let backend = DummyBackend::new();
        let handle = bound(&backend, BufferTarget::UniformBuffer);

        backend
            .buffer_data(BufferTarget::UniformBuffer, &[0; 8], BufferUsageHint::default())
            .unwrap();
        backend
            .buffer_sub_data(BufferTarget::UniformBuffer, 2, &[9, 9])
            .unwrap();

        assert_eq!(backend.allocation_size(handle), Some(8));
        assert_eq!(
            backend.read_buffer(handle, 0, 8).unwrap(),
            vec![0, 0, 9, 9, 0, 0, 0, 0]
        );

        let stats = backend.stats();
        assert_eq!(stats.full_allocations, 1);
        assert_eq!(stats.partial_updates, 1);
        assert_eq!(stats.bytes_uploaded, 10);
    }

    #[test]
    fn test_sub_data_out_of_range() {
        let backend = DummyBackend::new();
        bound(&backend, BufferTarget::ArrayBuffer);
        backend
            .buffer_data(BufferTarget::ArrayBuffer, &[0; 4], BufferUsageHint::default())
            .unwrap();

        let result = backend.buffer_sub_data(BufferTarget::ArrayBuffer, 2, &[1, 2, 3]);
        assert!(matches!(result, Err(GraphicsError::InvalidParameter(_))));
    }

    #[test]
    fn test_upload_without_binding() {
        let backend = DummyBackend::new();
        let result =
            backend.buffer_data(BufferTarget::ArrayBuffer, &[1], BufferUsageHint::default());
        assert_eq!(result, Err(GraphicsError::NoResourceBound("ArrayBuffer")));
    }

    #[test]
    fn test_buffer_too_large() {
        let backend =
            DummyBackend::with_params(&InstanceParameters::new().with_max_buffer_size(16));
        bound(&backend, BufferTarget::ArrayBuffer);

        let result =
            backend.buffer_data(BufferTarget::ArrayBuffer, &[0; 17], BufferUsageHint::default());
        assert_eq!(
            result,
            Err(GraphicsError::BufferTooLarge {
                requested: 17,
                max: 16
            })
        );
    }

    #[test]
    fn test_release_clears_bindings() {
        let backend = DummyBackend::new();
        let handle = bound(&backend, BufferTarget::ElementArrayBuffer);

        backend.release_buffer_handle(handle);

        assert!(!backend.is_live(handle));
        assert_eq!(backend.bound_buffer(BufferTarget::ElementArrayBuffer), None);
        assert_eq!(backend.stats().live_handles(), 0);
    }

    #[test]
    fn test_bind_unknown_handle_is_ignored() {
        let backend = DummyBackend::new();
        let stray = GpuHandle::new(42).unwrap();

        backend.bind_buffer(BufferTarget::ArrayBuffer, Some(stray));
        assert_eq!(backend.bound_buffer(BufferTarget::ArrayBuffer), None);
    }

    #[test]
    fn test_injected_handle_failure() {
        let backend = DummyBackend::new();
        backend.fail_next_handle_allocation();

        assert!(matches!(
            backend.create_buffer_handle(),
            Err(GraphicsError::ResourceCreationFailed(_))
        ));
        assert!(backend.create_buffer_handle().is_ok());
        assert_eq!(backend.stats().handles_created, 1);
    }

    #[test]
    fn test_read_unallocated_handle() {
        let backend = DummyBackend::new();
        let handle = backend.create_buffer_handle().unwrap();

        assert_eq!(backend.read_buffer(handle, 0, 0).unwrap(), Vec::<u8>::new());
        assert!(backend.read_buffer(handle, 0, 1).is_err());
    }

    #[test]
    fn test_overflowing_ranges_rejected() {
        let backend = DummyBackend::new();
        let handle = bound(&backend, BufferTarget::ArrayBuffer);
        backend
            .buffer_data(BufferTarget::ArrayBuffer, &[0; 4], BufferUsageHint::default())
            .unwrap();

        assert!(matches!(
            backend.read_buffer(handle, u64::MAX, 2),
            Err(GraphicsError::InvalidParameter(_))
        ));
        assert!(matches!(
            backend.read_buffer(handle, 1, u64::MAX),
            Err(GraphicsError::InvalidParameter(_))
        ));
        assert!(matches!(
            backend.buffer_sub_data(BufferTarget::ArrayBuffer, u64::MAX, &[1]),
            Err(GraphicsError::InvalidParameter(_))
        ));
        assert_eq!(backend.read_buffer(handle, 0, 4).unwrap(), vec![0; 4]);
    }
}
