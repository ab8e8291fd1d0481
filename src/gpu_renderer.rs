//! wgpu pass executor: the fullscreen-quad renderer and texture-backed
//! field pool.
//!
//! Every pass is one render pass drawing a static two-triangle quad (4
//! vertices, 6 indices) into the target field's texture, with the input
//! fields bound as sampled textures and the scalar uniforms in one shared
//! uniform buffer. Draws are issued in sequence and the device serializes
//! dependent reads and writes between them.

use crate::error::SolverError;
use crate::grid::{ChannelFormat, FieldId, GridBuffer};
use crate::gpu_context::GpuContext;
use crate::gpu_pass::PassProgram;
use crate::pass::{PassKind, PassUniforms};
use crate::renderer::PassDevice;
use bytemuck::{Pod, Zeroable};
use std::collections::HashMap;
use wgpu::util::DeviceExt;

#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
struct GpuPassUniforms {
    delta_time: f32,
    alpha: f32,
    beta: f32,
    exponent: f32,
    cursor: [f32; 2],
    impulse: [f32; 2],
    texel: [f32; 2],
    _pad: [f32; 2],
}

fn texture_format(format: ChannelFormat) -> wgpu::TextureFormat {
    match format {
        ChannelFormat::R32Float => wgpu::TextureFormat::R32Float,
        ChannelFormat::Rg32Float => wgpu::TextureFormat::Rg32Float,
        ChannelFormat::Rgba8Unorm => wgpu::TextureFormat::Rgba8Unorm,
    }
}

/// Which (pass, target format) pipelines the step sequence needs.
const PROGRAM_SET: &[(PassKind, wgpu::TextureFormat)] = &[
    (PassKind::Advect, wgpu::TextureFormat::Rg32Float),
    (PassKind::Advect, wgpu::TextureFormat::Rgba8Unorm),
    (PassKind::JacobiVector, wgpu::TextureFormat::Rg32Float),
    (PassKind::JacobiScalar, wgpu::TextureFormat::R32Float),
    (PassKind::Divergence, wgpu::TextureFormat::Rg32Float),
    (PassKind::GradientSubtract, wgpu::TextureFormat::Rg32Float),
    (PassKind::Force, wgpu::TextureFormat::Rg32Float),
    (PassKind::Passthrough, wgpu::TextureFormat::Rg32Float),
    (PassKind::Passthrough, wgpu::TextureFormat::R32Float),
    (PassKind::Passthrough, wgpu::TextureFormat::Rgba8Unorm),
    (PassKind::VelocityDisplay, wgpu::TextureFormat::Rgba8Unorm),
];

struct FieldTexture {
    #[allow(dead_code)]
    texture: wgpu::Texture,
    view: wgpu::TextureView,
}

pub struct WgpuDevice {
    ctx: GpuContext,
    width: u32,
    height: u32,

    quad_vertices: wgpu::Buffer,
    quad_indices: wgpu::Buffer,
    sampler: wgpu::Sampler,
    uniform_buffer: wgpu::Buffer,
    programs: HashMap<(PassKind, wgpu::TextureFormat), PassProgram>,

    fields: Option<HashMap<FieldId, FieldTexture>>,

    frame_texture: wgpu::Texture,
    frame_view: wgpu::TextureView,
    readback_buffer: wgpu::Buffer,
    surface: Vec<u8>,
}

impl WgpuDevice {
    pub async fn new(ctx: GpuContext, width: u32, height: u32) -> Result<Self, SolverError> {
        let device = &ctx.device;

        // Quad geometry: 4 corners of the unit square, two triangles.
        let vertex_data: [f32; 8] = [0.0, 0.0, 0.0, 1.0, 1.0, 1.0, 1.0, 0.0];
        let quad_vertices = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("quad vertices"),
            contents: bytemuck::cast_slice(&vertex_data),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index_data: [u16; 6] = [0, 1, 2, 0, 2, 3];
        let quad_indices = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("quad indices"),
            contents: bytemuck::cast_slice(&index_data),
            usage: wgpu::BufferUsages::INDEX,
        });

        // Clamp-to-edge linear filtering is the boundary policy for every
        // sampled pass.
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("pass sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        let uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("pass uniforms"),
            size: std::mem::size_of::<GpuPassUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let mut programs = HashMap::new();
        for &(kind, format) in PROGRAM_SET {
            let program = PassProgram::compile(device, kind, format).await?;
            programs.insert((kind, format), program);
        }

        let frame_texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("presented frame"),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8Unorm,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        });
        let frame_view = frame_texture.create_view(&wgpu::TextureViewDescriptor::default());

        let padded_bytes_per_row = ((width * 4 + 255) / 256) * 256;
        let readback_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("frame readback"),
            size: (padded_bytes_per_row * height) as u64,
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });

        Ok(Self {
            ctx,
            width,
            height,
            quad_vertices,
            quad_indices,
            sampler,
            uniform_buffer,
            programs,
            fields: None,
            frame_texture,
            frame_view,
            readback_buffer,
            surface: vec![0; (width * height * 4) as usize],
        })
    }

    fn create_field(&self, format: ChannelFormat) -> FieldTexture {
        let texture = self.ctx.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("simulation field"),
            size: wgpu::Extent3d {
                width: self.width,
                height: self.height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: texture_format(format),
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        FieldTexture { texture, view }
    }

    fn write_uniforms(&self, uniforms: &PassUniforms) {
        let gpu_uniforms = GpuPassUniforms {
            delta_time: uniforms.delta_time,
            alpha: uniforms.alpha,
            beta: uniforms.beta,
            exponent: uniforms.exponent,
            cursor: uniforms.cursor.to_array(),
            impulse: uniforms.impulse.to_array(),
            texel: [1.0 / self.width as f32, 1.0 / self.height as f32],
            _pad: [0.0; 2],
        };
        self.ctx
            .queue
            .write_buffer(&self.uniform_buffer, 0, bytemuck::cast_slice(&[gpu_uniforms]));
    }

    /// The generic draw path: bind the quad, the program, and each input
    /// view in sampler order, then issue the six indexed vertices.
    fn draw_raw(
        &self,
        target_view: &wgpu::TextureView,
        target_format: wgpu::TextureFormat,
        inputs: &[&wgpu::TextureView],
        kind: PassKind,
        uniforms: &PassUniforms,
    ) -> Result<(), SolverError> {
        let program = self
            .programs
            .get(&(kind, target_format))
            .ok_or(SolverError::ShaderCompile {
                stage: "lookup",
                log: format!("no program for {kind:?} targeting {target_format:?}"),
            })?;

        self.write_uniforms(uniforms);

        let mut entries = vec![
            wgpu::BindGroupEntry {
                binding: 0,
                resource: self.uniform_buffer.as_entire_binding(),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::Sampler(&self.sampler),
            },
        ];
        for (slot, view) in inputs.iter().enumerate() {
            entries.push(wgpu::BindGroupEntry {
                binding: 2 + slot as u32,
                resource: wgpu::BindingResource::TextureView(view),
            });
        }
        let bind_group = self.ctx.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("pass bind group"),
            layout: &program.bind_group_layout,
            entries: &entries,
        });

        let mut encoder = self
            .ctx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("pass encoder"),
            });
        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: target_view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Load,
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            render_pass.set_pipeline(&program.pipeline);
            render_pass.set_vertex_buffer(0, self.quad_vertices.slice(..));
            render_pass.set_index_buffer(self.quad_indices.slice(..), wgpu::IndexFormat::Uint16);
            render_pass.set_bind_group(0, &bind_group, &[]);
            render_pass.draw_indexed(0..6, 0, 0..1);
        }
        self.ctx.queue.submit(std::iter::once(encoder.finish()));
        Ok(())
    }

    fn field_view(&self, id: FieldId) -> Result<&FieldTexture, SolverError> {
        self.fields
            .as_ref()
            .and_then(|fields| fields.get(&id))
            .ok_or(SolverError::FieldsUninitialized)
    }
}

impl PassDevice for WgpuDevice {
    fn init_fields(&mut self, seed: &GridBuffer) -> Result<(), SolverError> {
        let mut fields = HashMap::new();
        for id in FieldId::ALL {
            fields.insert(id, self.create_field(id.format()));
        }

        // Upload the decoded seed as a float texture, then passthrough-draw
        // it into the first velocity and color buffers.
        let seed_texture = self.ctx.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("seed image"),
            size: wgpu::Extent3d {
                width: seed.width() as u32,
                height: seed.height() as u32,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba32Float,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        self.ctx.queue.write_texture(
            wgpu::ImageCopyTexture {
                texture: &seed_texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            bytemuck::cast_slice(seed.data()),
            wgpu::ImageDataLayout {
                offset: 0,
                bytes_per_row: Some(seed.width() as u32 * 16),
                rows_per_image: Some(seed.height() as u32),
            },
            wgpu::Extent3d {
                width: seed.width() as u32,
                height: seed.height() as u32,
                depth_or_array_layers: 1,
            },
        );
        let seed_view = seed_texture.create_view(&wgpu::TextureViewDescriptor::default());

        let uniforms = PassUniforms::default();
        self.draw_raw(
            &fields[&FieldId::Velocity1].view,
            wgpu::TextureFormat::Rg32Float,
            &[&seed_view],
            PassKind::Passthrough,
            &uniforms,
        )?;
        self.draw_raw(
            &fields[&FieldId::Color1].view,
            wgpu::TextureFormat::Rgba8Unorm,
            &[&seed_view],
            PassKind::Passthrough,
            &uniforms,
        )?;

        self.fields = Some(fields);
        Ok(())
    }

    fn draw(
        &mut self,
        target: FieldId,
        inputs: &[FieldId],
        kind: PassKind,
        uniforms: &PassUniforms,
    ) -> Result<(), SolverError> {
        if inputs.contains(&target) {
            log::error!("rejected {kind:?} pass: {target:?} bound as both source and target");
            return Err(SolverError::SelfFeedback(target));
        }
        let expected = kind.sampler_count();
        if inputs.len() != expected {
            return Err(SolverError::InputArity {
                kind,
                expected,
                got: inputs.len(),
            });
        }

        let target_field = self.field_view(target)?;
        let target_view = &target_field.view;
        let input_views: Vec<&wgpu::TextureView> = inputs
            .iter()
            .map(|id| self.field_view(*id).map(|f| &f.view))
            .collect::<Result<_, _>>()?;
        self.draw_raw(
            target_view,
            texture_format(target.format()),
            &input_views,
            kind,
            uniforms,
        )
    }

    fn copy(&mut self, src: FieldId, dest: FieldId) -> Result<(), SolverError> {
        self.draw(dest, &[src], PassKind::Passthrough, &PassUniforms::default())
    }

    fn clear(&mut self, target: FieldId) -> Result<(), SolverError> {
        let field = self.field_view(target)?;
        let mut encoder = self
            .ctx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("clear encoder"),
            });
        encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("clear"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: &field.view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
        });
        self.ctx.queue.submit(std::iter::once(encoder.finish()));
        Ok(())
    }

    fn present(&mut self, src: FieldId, kind: PassKind) -> Result<(), SolverError> {
        let source_view = &self.field_view(src)?.view;
        let uniforms = PassUniforms::default();
        self.draw_raw(
            &self.frame_view,
            wgpu::TextureFormat::Rgba8Unorm,
            &[source_view],
            kind,
            &uniforms,
        )?;

        // Read the presented frame back so the shell can blit it.
        let padded_bytes_per_row = ((self.width * 4 + 255) / 256) * 256;
        let mut encoder = self
            .ctx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("readback encoder"),
            });
        encoder.copy_texture_to_buffer(
            wgpu::ImageCopyTexture {
                texture: &self.frame_texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::ImageCopyBuffer {
                buffer: &self.readback_buffer,
                layout: wgpu::ImageDataLayout {
                    offset: 0,
                    bytes_per_row: Some(padded_bytes_per_row),
                    rows_per_image: Some(self.height),
                },
            },
            wgpu::Extent3d {
                width: self.width,
                height: self.height,
                depth_or_array_layers: 1,
            },
        );
        self.ctx.queue.submit(std::iter::once(encoder.finish()));

        let buffer_slice = self.readback_buffer.slice(..);
        let (sender, receiver) = std::sync::mpsc::channel();
        buffer_slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = sender.send(result);
        });
        self.ctx.device.poll(wgpu::Maintain::Wait);
        match receiver.recv() {
            Ok(Ok(())) => {}
            _ => {
                return Err(SolverError::DeviceUnavailable(
                    "frame readback mapping failed".into(),
                ));
            }
        }

        {
            let data = buffer_slice.get_mapped_range();
            let row_bytes = (self.width * 4) as usize;
            for y in 0..self.height as usize {
                let src_base = y * padded_bytes_per_row as usize;
                let dst_base = y * row_bytes;
                self.surface[dst_base..dst_base + row_bytes]
                    .copy_from_slice(&data[src_base..src_base + row_bytes]);
            }
        }
        self.readback_buffer.unmap();
        Ok(())
    }

    fn frame(&self) -> &[u8] {
        &self.surface
    }

    fn size(&self) -> (usize, usize) {
        (self.width as usize, self.height as usize)
    }
}
