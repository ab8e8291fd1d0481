//! The per-frame solver: advection, implicit diffusion, pressure
//! projection, ink transport, present.

use crate::error::SolverError;
use crate::grid::FieldId::*;
use crate::pass::{PassKind, PassUniforms};
use crate::renderer::PassDevice;
use crate::seed::SeedHandle;
use glam::Vec2;

pub const SIM_SIZE: usize = 512;
pub const VISCOSITY: f32 = 0.002478;
pub const FORCE_MAGNITUDE: f32 = 300.0;
pub const FORCE_EXPONENT: f32 = 200.0;

/// Diffusion and pressure sweep counts. Both even, so each stage's result
/// lands back in its primary buffer after the V3/V2 and P2/P1 ping-pong.
pub const DIFFUSION_SWEEPS: usize = 2;
pub const PRESSURE_SWEEPS: usize = 30;

/// Implicit-diffusion Jacobi coefficients: alpha = (dx²/ν)/Δt and
/// beta = alpha + 4 (the 4-connected stencil degree).
pub fn diffusion_coefficients(precursor: f32, delta_time: f32) -> (f32, f32) {
    let alpha = precursor / delta_time;
    (alpha, alpha + 4.0)
}

/// What the present pass shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayMode {
    Ink,
    Velocity,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SolverState {
    WaitingForSeed,
    Ready,
}

/// Orchestrates the fixed pass sequence against a `PassDevice`.
///
/// Construction kicks off the seed decode; every tick before the pixels
/// arrive is a silent no-op. The first tick after the decode allocates the
/// field pool, the next tick only records a timestamp baseline, and every
/// tick after that advances the simulation by the elapsed delta.
pub struct FluidSolver<D: PassDevice> {
    device: D,
    seed: SeedHandle,
    state: SolverState,
    last_timestamp: Option<f64>,
    last_delta: Option<f32>,
    dx: f32,
    diffusion_precursor: f32,
    cursor: Option<Vec2>,
    cursor_at_last_step: Option<Vec2>,
    pub display: DisplayMode,
}

impl<D: PassDevice> FluidSolver<D> {
    pub fn new(device: D, seed: SeedHandle) -> Self {
        Self {
            device,
            seed,
            state: SolverState::WaitingForSeed,
            last_timestamp: None,
            last_delta: None,
            dx: 0.0,
            diffusion_precursor: 0.0,
            cursor: None,
            cursor_at_last_step: None,
            display: DisplayMode::Ink,
        }
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    pub fn device_mut(&mut self) -> &mut D {
        &mut self.device
    }

    pub fn is_ready(&self) -> bool {
        self.state == SolverState::Ready
    }

    /// Delta used by the most recent simulated tick, in seconds.
    pub fn last_delta(&self) -> Option<f32> {
        self.last_delta
    }

    /// Record the cursor position in surface-local pixels. Consumed by the
    /// next simulated tick as a force splat if it moved.
    pub fn set_cursor(&mut self, x: f32, y: f32) {
        let (width, height) = self.device.size();
        self.cursor = Some(Vec2::new(x / width as f32, y / height as f32));
    }

    /// Driver entry point, called once per display refresh with a monotone
    /// timestamp in milliseconds.
    pub fn on_frame(&mut self, timestamp_ms: f64) -> Result<(), SolverError> {
        if self.state == SolverState::WaitingForSeed {
            let Some(seed) = self.seed.try_take() else {
                return Ok(());
            };
            self.device.init_fields(&seed)?;
            let (_, height) = self.device.size();
            self.dx = 1.0 / height as f32;
            self.diffusion_precursor = self.dx * self.dx / VISCOSITY;
            self.state = SolverState::Ready;
            return Ok(());
        }

        // Priming tick: establish the delta baseline without simulating.
        let Some(previous) = self.last_timestamp else {
            self.last_timestamp = Some(timestamp_ms);
            return Ok(());
        };
        let delta_time = ((timestamp_ms - previous) / 1000.0) as f32;
        self.last_timestamp = Some(timestamp_ms);
        if delta_time <= 0.0 {
            // Duplicate timestamp from the driver; nothing elapsed.
            return Ok(());
        }
        self.last_delta = Some(delta_time);
        self.step(delta_time)
    }

    fn step(&mut self, delta_time: f32) -> Result<(), SolverError> {
        // Advect velocity by itself: V1 -> V2.
        self.device.draw(
            Velocity2,
            &[Velocity1, Velocity1],
            PassKind::Advect,
            &PassUniforms {
                delta_time,
                ..Default::default()
            },
        )?;

        // Cursor drag injects an impulse: V2 -> V3, copied back.
        if let Some(impulse) = self.take_impulse(delta_time) {
            self.device.draw(
                Velocity3,
                &[Velocity2],
                PassKind::Force,
                &PassUniforms {
                    delta_time,
                    exponent: FORCE_EXPONENT,
                    cursor: self.cursor.unwrap_or(Vec2::ZERO),
                    impulse,
                    ..Default::default()
                },
            )?;
            self.device.copy(Velocity3, Velocity2)?;
        }

        // Implicit diffusion. V1 holds the fixed source term; the iterate
        // ping-pongs V2 -> V3 -> V2 so no sweep reads its own target.
        let (alpha, beta) = diffusion_coefficients(self.diffusion_precursor, delta_time);
        self.device.copy(Velocity2, Velocity1)?;
        let diffuse = PassUniforms {
            alpha,
            beta,
            ..Default::default()
        };
        for _ in 0..DIFFUSION_SWEEPS / 2 {
            self.device
                .draw(Velocity3, &[Velocity2, Velocity1], PassKind::JacobiVector, &diffuse)?;
            self.device
                .draw(Velocity2, &[Velocity3, Velocity1], PassKind::JacobiVector, &diffuse)?;
        }

        // Projection: divergence into V3.x, pressure relaxed P1 <-> P2
        // against it, then the gradient subtracted into V1. The final,
        // divergence-free velocity therefore ends the frame in V1, where the
        // next tick's advection reads it.
        self.device
            .draw(Velocity3, &[Velocity2], PassKind::Divergence, &PassUniforms::default())?;
        self.device.clear(Pressure1)?;
        let relax = PassUniforms {
            alpha: -self.dx * self.dx,
            beta: 4.0,
            ..Default::default()
        };
        for _ in 0..PRESSURE_SWEEPS / 2 {
            self.device
                .draw(Pressure2, &[Pressure1, Velocity3], PassKind::JacobiScalar, &relax)?;
            self.device
                .draw(Pressure1, &[Pressure2, Velocity3], PassKind::JacobiScalar, &relax)?;
        }
        self.device.draw(
            Velocity1,
            &[Velocity2, Pressure1],
            PassKind::GradientSubtract,
            &PassUniforms::default(),
        )?;

        // Carry the ink along the final velocity: C1 -> C2, copied back.
        self.device.draw(
            Color2,
            &[Color1, Velocity1],
            PassKind::Advect,
            &PassUniforms {
                delta_time,
                ..Default::default()
            },
        )?;
        self.device.copy(Color2, Color1)?;

        match self.display {
            DisplayMode::Ink => self.device.present(Color1, PassKind::Passthrough),
            DisplayMode::Velocity => self.device.present(Velocity1, PassKind::VelocityDisplay),
        }
    }

    /// Impulse from cursor motion since the last simulated tick, or None if
    /// the cursor is unknown or stationary.
    fn take_impulse(&mut self, delta_time: f32) -> Option<Vec2> {
        let current = self.cursor?;
        let previous = self.cursor_at_last_step.replace(current);
        let motion = current - previous?;
        if motion.length_squared() == 0.0 {
            return None;
        }
        Some(motion * FORCE_MAGNITUDE * delta_time)
    }
}
