//! Device acquisition and capability checks for the wgpu backend.

use crate::error::SolverError;

/// The float-filtering capability the pass textures need; without it the
/// Rg32Float/R32Float fields cannot be sampled with linear filtering and
/// startup fails hard.
const REQUIRED_FEATURES: wgpu::Features = wgpu::Features::FLOAT32_FILTERABLE;

pub struct GpuContext {
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
}

impl GpuContext {
    pub async fn new() -> Result<Self, SolverError> {
        let instance = wgpu::Instance::default();

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await
            .ok_or_else(|| SolverError::DeviceUnavailable("no adapter found".into()))?;

        if !adapter.features().contains(REQUIRED_FEATURES) {
            return Err(SolverError::MissingCapability(
                "FLOAT32_FILTERABLE (linear filtering of float render targets)",
            ));
        }

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("inkwash"),
                    required_features: REQUIRED_FEATURES,
                    required_limits: wgpu::Limits::downlevel_defaults(),
                },
                None,
            )
            .await
            .map_err(|e| SolverError::DeviceUnavailable(e.to_string()))?;

        Ok(Self { device, queue })
    }
}
