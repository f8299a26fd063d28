//! Common utilities for buffer integration tests.
//!
//! This module provides shared test infrastructure that can be reused
//! across different backend implementations.

use std::sync::{Arc, Once};

use insect_graphics::{
    BackendType, DummyBackend, GpuBackend, InstanceParameters, WgpuBackendType, create_backend,
};

// ============================================================================
// Backend Enumeration
// ============================================================================

/// Available GPU backends for testing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Backend {
    /// Dummy backend (host memory, no GPU).
    Dummy,
    /// wgpu backend on whatever adapter the platform offers.
    Wgpu,
}

impl Backend {
    /// Check if this backend is compiled in.
    pub fn is_available(&self) -> bool {
        match self {
            // Dummy backend is always available
            Backend::Dummy => true,
            #[cfg(feature = "wgpu-backend")]
            Backend::Wgpu => true,
            #[cfg(not(feature = "wgpu-backend"))]
            Backend::Wgpu => false,
        }
    }

    /// Convert to InstanceParameters for creating the backend.
    pub fn to_instance_parameters(self) -> InstanceParameters {
        match self {
            Backend::Dummy => InstanceParameters::new().with_backend(BackendType::Dummy),
            Backend::Wgpu => InstanceParameters::new()
                .with_backend(BackendType::Wgpu)
                .with_wgpu_backend(WgpuBackendType::Auto),
        }
    }
}

// ============================================================================
// Test Context
// ============================================================================

static LOGGER: Once = Once::new();

fn init_logging() {
    LOGGER.call_once(|| {
        let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
            .is_test(true)
            .try_init();
    });
}

/// Test context owning the backend the buffers are created on.
pub struct TestContext {
    /// The backend being tested.
    #[allow(dead_code)]
    pub backend: Backend,
    /// Backend handed to buffers.
    pub gpu: Arc<dyn GpuBackend>,
    /// Concrete dummy backend, for inspecting its counters.
    dummy: Option<Arc<DummyBackend>>,
}

impl TestContext {
    /// Create a new test context for the given backend.
    ///
    /// Returns `None` if the backend is not available, including when wgpu
    /// is compiled in but no adapter can be found.
    pub fn new(backend: Backend) -> Option<Self> {
        Self::with_parameters(backend, backend.to_instance_parameters())
    }

    /// Create a test context with a device size limit.
    pub fn with_max_buffer_size(backend: Backend, max: u64) -> Option<Self> {
        Self::with_parameters(
            backend,
            backend.to_instance_parameters().with_max_buffer_size(max),
        )
    }

    fn with_parameters(backend: Backend, params: InstanceParameters) -> Option<Self> {
        init_logging();
        if !backend.is_available() {
            return None;
        }

        match backend {
            Backend::Dummy => {
                let dummy = Arc::new(DummyBackend::with_params(&params));
                Some(Self {
                    backend,
                    gpu: dummy.clone(),
                    dummy: Some(dummy),
                })
            }
            Backend::Wgpu => {
                let gpu = create_backend(&params).ok()?;
                Some(Self {
                    backend,
                    gpu,
                    dummy: None,
                })
            }
        }
    }

    /// The dummy backend, when testing on it.
    #[allow(dead_code)]
    pub fn dummy(&self) -> Option<&DummyBackend> {
        self.dummy.as_deref()
    }
}

// ============================================================================
// Test Data Generators
// ============================================================================

/// Generate a float pattern of `count` distinct values.
#[allow(dead_code)]
pub fn generate_test_pattern(count: usize, seed: f32) -> Vec<f32> {
    (0..count).map(|i| seed + i as f32 * 0.5).collect()
}
