//! Shader program loading for the wgpu backend.
//!
//! Each pass compiles from the shared fullscreen-quad vertex stage plus its
//! own fragment stage. Compilation or link failure is terminal for that
//! program: the error carries the diagnostic text and the program is never
//! drawn with. Bind group layouts are derived from the pass kind, so a
//! program only exposes the sampler slots its operator actually reads.

use crate::error::SolverError;
use crate::pass::PassKind;

pub const QUAD_VERTEX_SHADER: &str = include_str!("shaders/quad.wgsl");

pub fn fragment_source(kind: PassKind) -> &'static str {
    match kind {
        PassKind::Advect => include_str!("shaders/advect.wgsl"),
        PassKind::JacobiVector => include_str!("shaders/jacobi_vector.wgsl"),
        PassKind::JacobiScalar => include_str!("shaders/jacobi_scalar.wgsl"),
        PassKind::Divergence => include_str!("shaders/divergence.wgsl"),
        PassKind::GradientSubtract => include_str!("shaders/gradient_subtract.wgsl"),
        PassKind::Force => include_str!("shaders/force.wgsl"),
        PassKind::Passthrough => include_str!("shaders/passthrough.wgsl"),
        PassKind::VelocityDisplay => include_str!("shaders/velocity_display.wgsl"),
    }
}

/// A linked pass program: pipeline plus the layout its draw binds against.
pub struct PassProgram {
    pub pipeline: wgpu::RenderPipeline,
    pub bind_group_layout: wgpu::BindGroupLayout,
}

impl PassProgram {
    /// Compile both stages and link a pipeline rendering to `target_format`.
    /// Validation errors surface through an error scope rather than a
    /// device panic.
    pub async fn compile(
        device: &wgpu::Device,
        kind: PassKind,
        target_format: wgpu::TextureFormat,
    ) -> Result<Self, SolverError> {
        let vertex_module = compile_stage(device, "vertex", QUAD_VERTEX_SHADER).await?;
        let fragment_module = compile_stage(device, "fragment", fragment_source(kind)).await?;

        let mut entries = vec![
            wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            },
            wgpu::BindGroupLayoutEntry {
                binding: 1,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                count: None,
            },
        ];
        for slot in 0..kind.sampler_count() as u32 {
            entries.push(wgpu::BindGroupLayoutEntry {
                binding: 2 + slot,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Texture {
                    sample_type: wgpu::TextureSampleType::Float { filterable: true },
                    view_dimension: wgpu::TextureViewDimension::D2,
                    multisampled: false,
                },
                count: None,
            });
        }

        let bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("pass bind group layout"),
                entries: &entries,
            });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("pass pipeline layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        device.push_error_scope(wgpu::ErrorFilter::Validation);
        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("pass pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &vertex_module,
                entry_point: "vs_main",
                compilation_options: wgpu::PipelineCompilationOptions::default(),
                buffers: &[wgpu::VertexBufferLayout {
                    array_stride: 8,
                    step_mode: wgpu::VertexStepMode::Vertex,
                    // Position and UV share the 0..1 quad coordinates.
                    attributes: &[
                        wgpu::VertexAttribute {
                            format: wgpu::VertexFormat::Float32x2,
                            offset: 0,
                            shader_location: 0,
                        },
                        wgpu::VertexAttribute {
                            format: wgpu::VertexFormat::Float32x2,
                            offset: 0,
                            shader_location: 1,
                        },
                    ],
                }],
            },
            fragment: Some(wgpu::FragmentState {
                module: &fragment_module,
                entry_point: "fs_main",
                compilation_options: wgpu::PipelineCompilationOptions::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format: target_format,
                    blend: None,
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            primitive: wgpu::PrimitiveState::default(),
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
        });
        if let Some(error) = device.pop_error_scope().await {
            return Err(SolverError::ShaderCompile {
                stage: "link",
                log: error.to_string(),
            });
        }

        Ok(Self {
            pipeline,
            bind_group_layout,
        })
    }
}

async fn compile_stage(
    device: &wgpu::Device,
    stage: &'static str,
    source: &str,
) -> Result<wgpu::ShaderModule, SolverError> {
    device.push_error_scope(wgpu::ErrorFilter::Validation);
    let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(stage),
        source: wgpu::ShaderSource::Wgsl(source.into()),
    });
    if let Some(error) = device.pop_error_scope().await {
        return Err(SolverError::ShaderCompile {
            stage,
            log: error.to_string(),
        });
    }
    Ok(module)
}
