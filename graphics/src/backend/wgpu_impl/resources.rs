//! Buffer object operations for the wgpu backend.

use wgpu::util::DeviceExt;

use crate::error::GraphicsError;
use crate::instance::DeviceCapabilities;
use crate::types::{BufferTarget, BufferUsageHint};

use super::super::{GpuBackend, GpuHandle};
use super::conversion::{align_copy_size, convert_buffer_target};
use super::{WgpuAllocation, WgpuBackend};

impl GpuBackend for WgpuBackend {
    fn name(&self) -> &'static str {
        "wgpu Backend"
    }

    fn capabilities(&self) -> DeviceCapabilities {
        self.capabilities
    }

    fn create_buffer_handle(&self) -> Result<GpuHandle, GraphicsError> {
        let handle = self.handles.allocate()?;
        self.buffers.lock().insert(handle, None);
        log::trace!("WgpuBackend: created buffer handle {}", handle);
        Ok(handle)
    }

    fn release_buffer_handle(&self, handle: GpuHandle) {
        match self.buffers.lock().remove(&handle) {
            Some(Some(alloc)) => alloc.buffer.destroy(),
            Some(None) => {}
            None => {
                log::warn!("WgpuBackend: release of unknown buffer handle {}", handle);
                return;
            }
        }
        self.bindings.forget(handle);
        log::trace!("WgpuBackend: released buffer handle {}", handle);
    }

    fn bind_buffer(&self, target: BufferTarget, handle: Option<GpuHandle>) {
        if let Some(handle) = handle
            && !self.buffers.lock().contains_key(&handle)
        {
            log::warn!(
                "WgpuBackend: ignoring bind of unknown handle {} to {}",
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

        let mut buffers = self.buffers.lock();
        let slot = buffers
            .get_mut(&handle)
            .ok_or(GraphicsError::InvalidHandle(handle.get()))?;

        let label = self.debug_labels.then(|| format!("{target} #{handle}"));

        self.device.push_error_scope(wgpu::ErrorFilter::Validation);
        self.device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);
        let buffer = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: label.as_deref(),
                contents: data,
                usage: convert_buffer_target(target),
            });
        let out_of_memory = pollster::block_on(self.device.pop_error_scope());
        let invalid = pollster::block_on(self.device.pop_error_scope());

        if out_of_memory.is_some() {
            buffer.destroy();
            return Err(GraphicsError::OutOfMemory);
        }
        if let Some(e) = invalid {
            buffer.destroy();
            return Err(GraphicsError::ResourceCreationFailed(e.to_string()));
        }

        // The previous allocation, if any, is no longer reachable.
        if let Some(old) = slot.replace(WgpuAllocation { buffer, len: size }) {
            old.buffer.destroy();
        }

        log::trace!(
            "WgpuBackend: buffer_data target={} handle={} size={} usage={} (hint not used by wgpu)",
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
        if offset % wgpu::COPY_BUFFER_ALIGNMENT != 0 {
            return Err(GraphicsError::InvalidParameter(format!(
                "update offset {offset} is not {}-byte aligned",
                wgpu::COPY_BUFFER_ALIGNMENT
            )));
        }

        let buffers = self.buffers.lock();
        let alloc = buffers
            .get(&handle)
            .ok_or(GraphicsError::InvalidHandle(handle.get()))?
            .as_ref()
            .ok_or_else(|| {
                GraphicsError::InvalidParameter(format!(
                    "buffer {handle} has no storage to update"
                ))
            })?;

        let len = data.len() as u64;
        if offset + len > alloc.len {
            return Err(GraphicsError::InvalidParameter(format!(
                "update range {offset}..{} exceeds buffer size {}",
                offset + len,
                alloc.len
            )));
        }
        if data.is_empty() {
            return Ok(());
        }

        // Writes must be a multiple of the copy alignment. Allocations are padded
        // the same way, so the padded tail always fits.
        let padded = align_copy_size(len);
        if padded == len {
            self.queue.write_buffer(&alloc.buffer, offset, data);
        } else {
            let mut bytes = data.to_vec();
            bytes.resize(padded as usize, 0);
            self.queue.write_buffer(&alloc.buffer, offset, &bytes);
        }

        log::trace!(
            "WgpuBackend: buffer_sub_data target={} handle={} offset={} len={}",
            target,
            handle,
            offset,
            len
        );
        Ok(())
    }

    fn read_buffer(
        &self,
        handle: GpuHandle,
        offset: u64,
        size: u64,
    ) -> Result<Vec<u8>, GraphicsError> {
        let source = {
            let buffers = self.buffers.lock();
            let alloc = buffers
                .get(&handle)
                .ok_or(GraphicsError::InvalidHandle(handle.get()))?;
            let len = alloc.as_ref().map_or(0, |alloc| alloc.len);
            if offset + size > len {
                return Err(GraphicsError::InvalidParameter(format!(
                    "read range {offset}..{} exceeds buffer size {len}",
                    offset + size
                )));
            }
            match alloc {
                Some(alloc) if size > 0 => alloc.buffer.clone(),
                _ => return Ok(Vec::new()),
            }
        };

        // Copies must start and end on the copy alignment; read the aligned
        // window and cut the requested range out of it.
        let copy_start = offset - offset % wgpu::COPY_BUFFER_ALIGNMENT;
        let copy_size = align_copy_size(offset + size) - copy_start;

        let staging = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Read Staging Buffer"),
            size: copy_size,
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Read Buffer Encoder"),
            });
        encoder.copy_buffer_to_buffer(&source, copy_start, &staging, 0, copy_size);
        let idx = self.queue.submit(std::iter::once(encoder.finish()));

        // Wait for copy to complete
        let _ = self.device.poll(wgpu::PollType::Wait {
            submission_index: Some(idx),
            timeout: Some(std::time::Duration::from_secs(10)),
        });

        // Map and read
        let slice = staging.slice(..);
        let (tx, rx) = std::sync::mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = tx.send(result);
        });
        let _ = self.device.poll(wgpu::PollType::wait_indefinitely());

        match rx.recv() {
            Ok(Ok(())) => {}
            Ok(Err(e)) => return Err(GraphicsError::Internal(format!("buffer map failed: {e}"))),
            Err(e) => return Err(GraphicsError::Internal(format!("buffer map dropped: {e}"))),
        }

        let skip = (offset - copy_start) as usize;
        let data = slice.get_mapped_range()[skip..skip + size as usize].to_vec();
        staging.unmap();

        log::trace!("WgpuBackend: read_buffer offset={} size={}", offset, size);
        Ok(data)
    }
}
