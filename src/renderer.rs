//! The generic full-grid pass executor and its software backend.
//!
//! Every pass follows the same shape: up to three input buffers, one target
//! buffer, a handful of scalar uniforms, and a draw that overwrites every
//! texel of the target. The solver talks to a `PassDevice` so the same step
//! sequence runs on the software backend (default, fully testable) and on
//! the wgpu backend (`gpu` feature).

use crate::error::SolverError;
use crate::grid::{FieldId, FieldStore, GridBuffer};
use crate::pass::{self, PassKind, PassUniforms};
use rayon::prelude::*;

/// Executes numerical passes over the field pool.
pub trait PassDevice {
    /// Allocate the full field pool and write the decoded seed image into
    /// the first velocity buffer and the first color buffer. Called exactly
    /// once, on the first tick after the seed decodes.
    fn init_fields(&mut self, seed: &GridBuffer) -> Result<(), SolverError>;

    /// Run one pass: read `inputs` in sampler order, overwrite `target`.
    /// Reading and writing the same buffer in one draw is rejected.
    fn draw(
        &mut self,
        target: FieldId,
        inputs: &[FieldId],
        kind: PassKind,
        uniforms: &PassUniforms,
    ) -> Result<(), SolverError>;

    /// Copy `src` into `dest` through a passthrough draw. `copy(x, x)` is a
    /// programming error and fails fast without touching `dest`.
    fn copy(&mut self, src: FieldId, dest: FieldId) -> Result<(), SolverError>;

    /// Zero-fill a buffer (pressure initial guess).
    fn clear(&mut self, target: FieldId) -> Result<(), SolverError>;

    /// Draw `src` through `kind` to the visible surface.
    fn present(&mut self, src: FieldId, kind: PassKind) -> Result<(), SolverError>;

    /// The last presented RGBA8 frame.
    fn frame(&self) -> &[u8];

    /// Grid dimensions in texels.
    fn size(&self) -> (usize, usize);
}

/// Software pass executor. Evaluates the same per-texel kernels the WGSL
/// shaders implement, one row per rayon task. Doubles as the stub device for
/// every unit test.
pub struct CpuDevice {
    width: usize,
    height: usize,
    store: Option<FieldStore>,
    surface: Vec<u8>,
}

impl CpuDevice {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            store: None,
            surface: vec![0; width * height * 4],
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn fields_allocated(&self) -> bool {
        self.store.is_some()
    }

    /// Direct read access to a field, for instrumentation and tests.
    pub fn field(&self, id: FieldId) -> Option<&GridBuffer> {
        self.store.as_ref().map(|s| s.get(id))
    }

    /// Direct write access, for seeding synthetic fields in tests and the
    /// headless driver.
    pub fn field_mut(&mut self, id: FieldId) -> Option<&mut GridBuffer> {
        self.store.as_mut().map(|s| s.get_mut(id))
    }

    fn check_draw(
        &self,
        target: FieldId,
        inputs: &[FieldId],
        kind: PassKind,
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
        Ok(())
    }
}

impl PassDevice for CpuDevice {
    fn init_fields(&mut self, seed: &GridBuffer) -> Result<(), SolverError> {
        let mut store = FieldStore::new(self.width, self.height);
        blit(seed, store.get_mut(FieldId::Velocity1));
        blit(seed, store.get_mut(FieldId::Color1));
        self.store = Some(store);
        Ok(())
    }

    fn draw(
        &mut self,
        target: FieldId,
        inputs: &[FieldId],
        kind: PassKind,
        uniforms: &PassUniforms,
    ) -> Result<(), SolverError> {
        self.check_draw(target, inputs, kind)?;
        let store = self.store.as_mut().ok_or(SolverError::FieldsUninitialized)?;

        let mut out = store.take(target);
        {
            let sources: Vec<&GridBuffer> = inputs.iter().map(|id| store.get(*id)).collect();
            let (width, height) = (out.width(), out.height());
            let channels = out.format().channels();
            out.data_mut()
                .par_chunks_mut(width * channels)
                .enumerate()
                .for_each(|(y, row)| {
                    for x in 0..width {
                        let texel = pass::shade(kind, &sources, uniforms, x, y, width, height);
                        row[x * channels..(x + 1) * channels]
                            .copy_from_slice(&texel[..channels]);
                    }
                });
        }
        store.put(target, out);
        Ok(())
    }

    fn copy(&mut self, src: FieldId, dest: FieldId) -> Result<(), SolverError> {
        self.draw(dest, &[src], PassKind::Passthrough, &PassUniforms::default())
    }

    fn clear(&mut self, target: FieldId) -> Result<(), SolverError> {
        let store = self.store.as_mut().ok_or(SolverError::FieldsUninitialized)?;
        store.get_mut(target).data_mut().fill(0.0);
        Ok(())
    }

    fn present(&mut self, src: FieldId, kind: PassKind) -> Result<(), SolverError> {
        if kind.sampler_count() != 1 {
            return Err(SolverError::InputArity {
                kind,
                expected: 1,
                got: kind.sampler_count(),
            });
        }
        let store = self.store.as_ref().ok_or(SolverError::FieldsUninitialized)?;
        let source = store.get(src);
        let uniforms = PassUniforms::default();
        let (width, height) = (self.width, self.height);
        self.surface
            .par_chunks_mut(width * 4)
            .enumerate()
            .for_each(|(y, row)| {
                for x in 0..width {
                    let texel = pass::shade(kind, &[source], &uniforms, x, y, width, height);
                    for c in 0..4 {
                        row[x * 4 + c] = (texel[c].clamp(0.0, 1.0) * 255.0) as u8;
                    }
                }
            });
        Ok(())
    }

    fn frame(&self) -> &[u8] {
        &self.surface
    }

    fn size(&self) -> (usize, usize) {
        (self.width, self.height)
    }
}

/// Resample `src` into `dest` with a bilinear passthrough, keeping as many
/// channels as the destination holds.
fn blit(src: &GridBuffer, dest: &mut GridBuffer) {
    let (width, height) = (dest.width(), dest.height());
    for y in 0..height {
        for x in 0..width {
            let uv = glam::Vec2::new(
                (x as f32 + 0.5) / width as f32,
                (y as f32 + 0.5) / height as f32,
            );
            dest.set_texel(x, y, src.sample(uv));
        }
    }
}
