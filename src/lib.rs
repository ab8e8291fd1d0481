//! Image-seeded stable-fluids solver for inkwash.
//!
//! A velocity field seeded from a user image is advected, implicitly
//! diffused, and pressure-projected each frame, as full-grid passes over
//! floating-point buffers. The pass sequence is backend-agnostic: the
//! default software executor evaluates the per-texel kernels directly, the
//! `gpu` feature runs the same passes as fullscreen-quad fragment shaders
//! on wgpu.

pub mod analysis;
pub mod app;
pub mod error;
pub mod export;
pub mod grid;
pub mod pass;
pub mod renderer;
pub mod seed;
pub mod solver;

#[cfg(feature = "gpu")]
pub mod gpu_context;

#[cfg(feature = "gpu")]
pub mod gpu_pass;

#[cfg(feature = "gpu")]
pub mod gpu_renderer;

pub use analysis::{AnalysisRecorder, FieldMetrics};
pub use app::InkwashApp;
pub use error::SolverError;
pub use export::ImageExporter;
pub use grid::{ChannelFormat, FieldId, FieldStore, GridBuffer};
pub use pass::{PassKind, PassUniforms};
pub use renderer::{CpuDevice, PassDevice};
pub use seed::SeedHandle;
pub use solver::{
    DIFFUSION_SWEEPS, DisplayMode, FORCE_EXPONENT, FORCE_MAGNITUDE, FluidSolver,
    PRESSURE_SWEEPS, SIM_SIZE, VISCOSITY, diffusion_coefficients,
};

#[cfg(feature = "gpu")]
pub use gpu_context::GpuContext;

#[cfg(feature = "gpu")]
pub use gpu_renderer::WgpuDevice;

// Feature-based backend selection
#[cfg(feature = "cpu")]
pub type DefaultDevice = renderer::CpuDevice;

#[cfg(all(feature = "gpu", not(feature = "cpu")))]
pub type DefaultDevice = gpu_renderer::WgpuDevice;
