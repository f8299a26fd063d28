//! # Buffer Sync Demo
//!
//! Streams a vertex buffer whose size changes every frame, the way a particle
//! system or a debug-line batch would, and logs what each synchronization did.
//!
//! After the first few frames the buffer stops reallocating: once the GPU
//! allocation has reached the largest size seen, every later frame is an
//! in-place update.
//!
//! ```bash
//! cargo run --bin buffer_sync_demo -- --backend dummy --frames 30
//! RUST_LOG=trace cargo run --bin buffer_sync_demo -- --backend wgpu --gpu-api vulkan
//! ```

use bytemuck::{Pod, Zeroable};
use clap::Parser;
use insect_graphics::{
    BackendType, Buffer, BufferTarget, BufferUsageHint, GraphicsError, InstanceParameters,
    SyncOutcome, WgpuBackendType,
};

/// Particle vertex streamed to the GPU every frame.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
struct ParticleVertex {
    position: [f32; 3],
    color: [f32; 4],
}

// ============================================================================
// CLI
// ============================================================================

/// Graphics backend selection for CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
enum CliBackend {
    /// Automatically select the best available backend (wgpu preferred).
    #[default]
    Auto,
    /// Cross-platform backend via wgpu.
    Wgpu,
    /// In-memory backend for testing and CI environments.
    Dummy,
}

impl From<CliBackend> for BackendType {
    fn from(cli: CliBackend) -> Self {
        match cli {
            CliBackend::Auto => BackendType::Auto,
            CliBackend::Wgpu => BackendType::Wgpu,
            CliBackend::Dummy => BackendType::Dummy,
        }
    }
}

/// GPU API selection for wgpu backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
enum CliGpuApi {
    /// Platform-appropriate default.
    #[default]
    Auto,
    /// Vulkan (Linux, Windows, Android).
    Vulkan,
    /// Metal (macOS and iOS).
    Metal,
    /// DirectX 12 (Windows).
    Dx12,
    /// OpenGL (cross-platform fallback).
    Gl,
}

impl From<CliGpuApi> for WgpuBackendType {
    fn from(cli: CliGpuApi) -> Self {
        match cli {
            CliGpuApi::Auto => WgpuBackendType::Auto,
            CliGpuApi::Vulkan => WgpuBackendType::Vulkan,
            CliGpuApi::Metal => WgpuBackendType::Metal,
            CliGpuApi::Dx12 => WgpuBackendType::Dx12,
            CliGpuApi::Gl => WgpuBackendType::Gl,
        }
    }
}

/// InsectRTS buffer synchronization demo.
#[derive(Parser, Debug)]
#[command(
    name = "buffer_sync_demo",
    about = "Stream a fluctuating vertex buffer and report each upload",
    long_about = "Streams a per-frame vertex buffer whose element count changes every frame \
        and logs whether each synchronization skipped, updated in place or reallocated.\n\n\
        EXAMPLES:\n\
          # Headless run\n\
          ./buffer_sync_demo --backend dummy --frames 30\n\
        \n\
          # wgpu with explicit Vulkan API, verifying uploads by readback\n\
          ./buffer_sync_demo --backend wgpu --gpu-api vulkan --verify",
    version
)]
struct Args {
    /// Graphics backend to use.
    #[arg(long, default_value = "auto", value_enum)]
    backend: CliBackend,

    /// GPU API for wgpu backend.
    /// Only applies when --backend is 'wgpu' or 'auto'.
    #[arg(long, default_value = "auto", value_enum)]
    gpu_api: CliGpuApi,

    /// Number of frames to simulate.
    #[arg(long, default_value = "16")]
    frames: u32,

    /// Largest particle count a frame can reach.
    #[arg(long, default_value = "4096")]
    max_particles: usize,

    /// Read every upload back and compare it with the staging data.
    #[arg(long)]
    verify: bool,

    /// Enable GPU validation layers.
    #[arg(long)]
    validation: bool,
}

// ============================================================================
// Simulation
// ============================================================================

/// Particle count for a frame: a slow swell with per-frame jitter.
fn particle_count(frame: u32, max: usize) -> usize {
    let t = frame as f32;
    let swell = 0.5 + 0.35 * (t * 0.4).sin();
    let jitter = 0.15 * (t * 2.3).cos();
    ((swell + jitter).clamp(0.0, 1.0) * max as f32) as usize
}

fn emit_particles(buffer: &mut Buffer<ParticleVertex>, frame: u32, count: usize) {
    let t = frame as f32 * 0.016;
    let particles = buffer.staging_mut();
    particles.clear();
    particles.extend((0..count).map(|i| {
        let angle = i as f32 * 0.618 + t;
        let radius = (i % 64) as f32 / 64.0;
        ParticleVertex {
            position: [radius * angle.cos(), radius * angle.sin(), 0.0],
            color: [1.0, radius, 0.2, 1.0 - radius],
        }
    }));
}

fn run(args: &Args) -> Result<(), GraphicsError> {
    let params = InstanceParameters::new()
        .with_backend(args.backend.into())
        .with_wgpu_backend(args.gpu_api.into())
        .with_validation(args.validation);
    let backend = insect_graphics::create_backend(&params)?;
    log::info!("Backend: {}", backend.name());

    let mut particles =
        Buffer::<ParticleVertex>::with_capacity(&backend, BufferTarget::ArrayBuffer, 0)?;

    let mut reallocations = 0u32;
    let mut updates = 0u32;
    for frame in 0..args.frames {
        let count = particle_count(frame, args.max_particles);
        emit_particles(&mut particles, frame, count);

        let outcome = particles.synchronize(BufferUsageHint::StreamDraw)?;
        if outcome.reallocated() {
            reallocations += 1;
        } else if outcome.uploaded() {
            updates += 1;
        }
        log::info!(
            "frame {:>3}: {} -> {:?} (GPU capacity {} bytes)",
            frame,
            particles,
            outcome,
            particles.gpu_capacity_bytes()
        );

        if args.verify && particles.read_back()? != particles.as_slice() {
            return Err(GraphicsError::Internal(format!(
                "frame {frame}: GPU contents differ from staging data"
            )));
        }

        // Nothing changed: this one is free.
        let repeat = particles.synchronize(BufferUsageHint::StreamDraw)?;
        debug_assert_eq!(repeat, SyncOutcome::Clean);
    }

    log::info!(
        "{} frames: {} reallocations, {} in-place updates, final capacity {} bytes",
        args.frames,
        reallocations,
        updates,
        particles.gpu_capacity_bytes()
    );
    Ok(())
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    log::info!("Buffer Sync Demo");
    log::info!("Graphics version: {}", insect_graphics::VERSION);
    insect_graphics::init();

    let args = Args::parse();
    if let Err(e) = run(&args) {
        log::error!("Demo failed: {}", e);
        std::process::exit(1);
    }
}
