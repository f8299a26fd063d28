//! Backend selection and device limits.
//!
//! [`InstanceParameters`] is the configuration surface of the crate: it picks
//! which [`GpuBackend`](crate::GpuBackend) [`create_backend`](crate::create_backend)
//! builds and tunes how that backend is set up.

/// Which GPU backend to create.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BackendType {
    /// Use wgpu when it is compiled in and an adapter is found, else the dummy backend.
    #[default]
    Auto,
    /// wgpu backend; fails if no adapter is available.
    Wgpu,
    /// Headless in-memory backend.
    Dummy,
}

/// Which native API the wgpu backend drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum WgpuBackendType {
    /// Let wgpu pick among every API available on the platform.
    #[default]
    Auto,
    /// Vulkan.
    Vulkan,
    /// Metal.
    Metal,
    /// DirectX 12.
    Dx12,
    /// OpenGL / WebGL.
    Gl,
}

#[cfg(feature = "wgpu-backend")]
impl WgpuBackendType {
    /// Convert to the wgpu backend set to enable.
    pub fn to_wgpu_backends(self) -> wgpu::Backends {
        match self {
            Self::Auto => wgpu::Backends::all(),
            Self::Vulkan => wgpu::Backends::VULKAN,
            Self::Metal => wgpu::Backends::METAL,
            Self::Dx12 => wgpu::Backends::DX12,
            Self::Gl => wgpu::Backends::GL,
        }
    }
}

/// Parameters for creating a GPU backend.
///
/// # Example
///
/// ```ignore
/// let params = InstanceParameters::new()
///     .with_backend(BackendType::Wgpu)
///     .with_wgpu_backend(WgpuBackendType::Vulkan)
///     .with_validation(true);
/// let backend = create_backend(&params)?;
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstanceParameters {
    /// Backend to create.
    pub backend: BackendType,
    /// Native API for the wgpu backend.
    pub wgpu_backend: WgpuBackendType,
    /// Enable API validation layers.
    pub validation: bool,
    /// Enable debug labels and markers.
    pub debug: bool,
    /// Lower the maximum size of a single buffer allocation.
    pub max_buffer_size: Option<u64>,
}

impl Default for InstanceParameters {
    fn default() -> Self {
        Self {
            backend: BackendType::Auto,
            wgpu_backend: WgpuBackendType::Auto,
            validation: cfg!(debug_assertions),
            debug: cfg!(debug_assertions),
            max_buffer_size: None,
        }
    }
}

impl InstanceParameters {
    /// Create parameters with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the backend type.
    pub fn with_backend(mut self, backend: BackendType) -> Self {
        self.backend = backend;
        self
    }

    /// Set the native API for the wgpu backend.
    pub fn with_wgpu_backend(mut self, wgpu_backend: WgpuBackendType) -> Self {
        self.wgpu_backend = wgpu_backend;
        self
    }

    /// Enable or disable validation layers.
    pub fn with_validation(mut self, validation: bool) -> Self {
        self.validation = validation;
        self
    }

    /// Enable or disable debug labels.
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Cap the size of a single buffer allocation.
    pub fn with_max_buffer_size(mut self, max_buffer_size: u64) -> Self {
        self.max_buffer_size = Some(max_buffer_size);
        self
    }
}

/// Capabilities of a GPU backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeviceCapabilities {
    /// Maximum size of a single buffer allocation in bytes.
    pub max_buffer_size: u64,
}

impl Default for DeviceCapabilities {
    fn default() -> Self {
        Self {
            max_buffer_size: 1 << 30, // 1 GB
        }
    }
}

impl DeviceCapabilities {
    /// Apply the overrides from `params`; overrides can only lower limits.
    pub fn restricted_by(mut self, params: &InstanceParameters) -> Self {
        if let Some(max) = params.max_buffer_size {
            self.max_buffer_size = self.max_buffer_size.min(max);
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parameters_builder() {
        let params = InstanceParameters::new()
            .with_backend(BackendType::Dummy)
            .with_wgpu_backend(WgpuBackendType::Gl)
            .with_validation(false)
            .with_debug(true)
            .with_max_buffer_size(4096);

        assert_eq!(params.backend, BackendType::Dummy);
        assert_eq!(params.wgpu_backend, WgpuBackendType::Gl);
        assert!(!params.validation);
        assert!(params.debug);
        assert_eq!(params.max_buffer_size, Some(4096));
    }

    #[test]
    fn test_capabilities_override_only_lowers() {
        let caps = DeviceCapabilities::default();

        let lowered = caps.restricted_by(&InstanceParameters::new().with_max_buffer_size(64));
        assert_eq!(lowered.max_buffer_size, 64);

        let raised = caps.restricted_by(&InstanceParameters::new().with_max_buffer_size(u64::MAX));
        assert_eq!(raised.max_buffer_size, caps.max_buffer_size);
    }
}
