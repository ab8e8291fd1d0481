//! The numerical operators, one per pass, expressed as per-texel fragment
//! kernels. The wgpu backend runs the WGSL twins of these under
//! `src/shaders/`; the software backend evaluates them directly.

use crate::grid::GridBuffer;
use glam::Vec2;

/// One compiled numerical operator. Each kind declares how many of the three
/// sampler slots it reads; the generic draw path binds exactly those and
/// silently skips the rest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PassKind {
    /// Semi-Lagrangian transport: sampler 0 is the advected quantity,
    /// sampler 1 the carrying velocity.
    Advect,
    /// One Jacobi relaxation sweep on a two-channel field: sampler 0 is the
    /// running iterate, sampler 1 the fixed source term.
    JacobiVector,
    /// One Jacobi relaxation sweep on a one-channel field.
    JacobiScalar,
    /// Velocity divergence, written to the x channel of the target.
    Divergence,
    /// Subtract the pressure gradient: sampler 0 velocity, sampler 1 pressure.
    GradientSubtract,
    /// Splat an impulse around the cursor with exponential falloff.
    Force,
    /// Copy sampler 0 to the target.
    Passthrough,
    /// Map velocity to a viewable color.
    VelocityDisplay,
}

impl PassKind {
    pub fn sampler_count(self) -> usize {
        match self {
            PassKind::Advect
            | PassKind::JacobiVector
            | PassKind::JacobiScalar
            | PassKind::GradientSubtract => 2,
            PassKind::Divergence
            | PassKind::Force
            | PassKind::Passthrough
            | PassKind::VelocityDisplay => 1,
        }
    }
}

/// Scalar uniforms a pass may read. Kinds that do not use a slot ignore it.
#[derive(Debug, Clone, Copy)]
pub struct PassUniforms {
    /// Time step in seconds.
    pub delta_time: f32,
    /// Jacobi center weight: dx²/(ν·Δt) for diffusion, -dx² for projection.
    pub alpha: f32,
    /// Jacobi divisor: alpha + 4 for diffusion, 4 for projection.
    pub beta: f32,
    /// Force falloff exponent.
    pub exponent: f32,
    /// Cursor position in normalized grid coordinates.
    pub cursor: Vec2,
    /// Velocity impulse injected at the cursor.
    pub impulse: Vec2,
}

impl Default for PassUniforms {
    fn default() -> Self {
        Self {
            delta_time: 0.0,
            alpha: 0.0,
            beta: 1.0,
            exponent: 0.0,
            cursor: Vec2::ZERO,
            impulse: Vec2::ZERO,
        }
    }
}

/// Evaluate one output texel of `kind` at grid position (x, y).
///
/// Neighbor stencils use nearest-texel reads with clamped coordinates;
/// advection uses a bilinear clamp-to-edge sample at the backtraced point.
pub fn shade(
    kind: PassKind,
    inputs: &[&GridBuffer],
    u: &PassUniforms,
    x: usize,
    y: usize,
    width: usize,
    height: usize,
) -> [f32; 4] {
    let xi = x as i32;
    let yi = y as i32;
    let uv = Vec2::new(
        (x as f32 + 0.5) / width as f32,
        (y as f32 + 0.5) / height as f32,
    );
    // Grid spacing; the simulation grid is square so 1/height throughout.
    let dx = 1.0 / height as f32;

    match kind {
        PassKind::Advect => {
            let vel = inputs[1].texel(xi, yi);
            let src = uv - Vec2::new(vel[0], vel[1]) * u.delta_time;
            inputs[0].sample(src)
        }
        PassKind::JacobiVector => {
            let l = inputs[0].texel(xi - 1, yi);
            let r = inputs[0].texel(xi + 1, yi);
            let t = inputs[0].texel(xi, yi - 1);
            let b = inputs[0].texel(xi, yi + 1);
            let s = inputs[1].texel(xi, yi);
            [
                (l[0] + r[0] + t[0] + b[0] + u.alpha * s[0]) / u.beta,
                (l[1] + r[1] + t[1] + b[1] + u.alpha * s[1]) / u.beta,
                0.0,
                1.0,
            ]
        }
        PassKind::JacobiScalar => {
            let l = inputs[0].texel(xi - 1, yi);
            let r = inputs[0].texel(xi + 1, yi);
            let t = inputs[0].texel(xi, yi - 1);
            let b = inputs[0].texel(xi, yi + 1);
            let s = inputs[1].texel(xi, yi);
            [
                (l[0] + r[0] + t[0] + b[0] + u.alpha * s[0]) / u.beta,
                0.0,
                0.0,
                1.0,
            ]
        }
        PassKind::Divergence => {
            let l = inputs[0].texel(xi - 1, yi);
            let r = inputs[0].texel(xi + 1, yi);
            let t = inputs[0].texel(xi, yi - 1);
            let b = inputs[0].texel(xi, yi + 1);
            let div = ((r[0] - l[0]) + (b[1] - t[1])) / (2.0 * dx);
            [div, 0.0, 0.0, 1.0]
        }
        PassKind::GradientSubtract => {
            let vel = inputs[0].texel(xi, yi);
            let l = inputs[1].texel(xi - 1, yi);
            let r = inputs[1].texel(xi + 1, yi);
            let t = inputs[1].texel(xi, yi - 1);
            let b = inputs[1].texel(xi, yi + 1);
            [
                vel[0] - (r[0] - l[0]) / (2.0 * dx),
                vel[1] - (b[0] - t[0]) / (2.0 * dx),
                0.0,
                1.0,
            ]
        }
        PassKind::Force => {
            let vel = inputs[0].texel(xi, yi);
            let d = uv - u.cursor;
            let falloff = (-d.length_squared() * u.exponent).exp();
            [
                vel[0] + u.impulse.x * falloff,
                vel[1] + u.impulse.y * falloff,
                0.0,
                1.0,
            ]
        }
        PassKind::Passthrough => inputs[0].sample(uv),
        PassKind::VelocityDisplay => {
            let vel = inputs[0].texel(xi, yi);
            let speed = Vec2::new(vel[0], vel[1]).length();
            [
                0.5 + 0.5 * vel[0],
                0.5 + 0.5 * vel[1],
                0.5 + 0.5 * speed,
                1.0,
            ]
        }
    }
}
