//! wgpu GPU backend implementation.
//!
//! This backend uses wgpu for cross-platform GPU access, supporting
//! Vulkan, Metal, DX12, and WebGPU.
//!
//! wgpu has no binding points or usage hints; both are emulated. Bindings are
//! tracked on the host and resolved when an upload names a target, and usage
//! hints are only logged.

pub(crate) mod conversion;
mod resources;

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::GraphicsError;
use crate::instance::{DeviceCapabilities, InstanceParameters};

use super::{BindingTable, GpuHandle, HandleAllocator};

/// A GPU allocation behind a buffer handle.
#[derive(Debug)]
pub(crate) struct WgpuAllocation {
    pub(crate) buffer: wgpu::Buffer,
    /// Bytes requested by the caller; the wgpu buffer may be padded past this.
    pub(crate) len: u64,
}

/// wgpu-based GPU backend.
pub struct WgpuBackend {
    #[allow(dead_code)]
    instance: wgpu::Instance,
    adapter: wgpu::Adapter,
    device: Arc<wgpu::Device>,
    queue: Arc<wgpu::Queue>,
    capabilities: DeviceCapabilities,
    debug_labels: bool,
    handles: HandleAllocator,
    // `None` until the first `buffer_data` on the handle.
    buffers: Mutex<HashMap<GpuHandle, Option<WgpuAllocation>>>,
    bindings: BindingTable,
}

impl std::fmt::Debug for WgpuBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WgpuBackend")
            .field("adapter", &self.adapter.get_info().name)
            .field("capabilities", &self.capabilities)
            .finish_non_exhaustive()
    }
}

impl WgpuBackend {
    /// Create a new wgpu backend with custom parameters.
    pub fn with_params(params: &InstanceParameters) -> Result<Self, GraphicsError> {
        // Determine which wgpu backends to enable
        let backends = params.wgpu_backend.to_wgpu_backends();

        // Configure instance flags based on validation/debug settings
        let mut flags = wgpu::InstanceFlags::default();
        if params.validation {
            flags |= wgpu::InstanceFlags::VALIDATION;
        }
        if params.debug {
            flags |= wgpu::InstanceFlags::DEBUG;
        }

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends,
            flags,
            backend_options: wgpu::BackendOptions::default(),
            memory_budget_thresholds: wgpu::MemoryBudgetThresholds::default(),
        });

        // Request adapter
        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: None,
            force_fallback_adapter: false,
        }))
        .map_err(|e| {
            GraphicsError::InitializationFailed(format!("No compatible GPU adapter: {e}"))
        })?;

        log::info!("wgpu adapter: {:?}", adapter.get_info());

        // Request device
        let (device, queue) = pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor {
            label: Some("InsectRTS Device"),
            required_features: wgpu::Features::empty(),
            required_limits: wgpu::Limits::default(),
            memory_hints: wgpu::MemoryHints::default(),
            experimental_features: wgpu::ExperimentalFeatures::default(),
            trace: wgpu::Trace::Off,
        }))
        .map_err(|e| GraphicsError::InitializationFailed(format!("Device creation failed: {e}")))?;

        let capabilities = DeviceCapabilities {
            max_buffer_size: device.limits().max_buffer_size,
        }
        .restricted_by(params);

        Ok(Self {
            instance,
            adapter,
            device: Arc::new(device),
            queue: Arc::new(queue),
            capabilities,
            debug_labels: params.debug,
            handles: HandleAllocator::new(),
            buffers: Mutex::new(HashMap::new()),
            bindings: BindingTable::new(),
        })
    }
}
