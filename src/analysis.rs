//! Field diagnostics for the headless driver and the projection tests.

use crate::grid::GridBuffer;

#[derive(Debug, Clone)]
pub struct FieldMetrics {
    pub total_kinetic_energy: f32,
    pub max_speed: f32,
    pub avg_speed: f32,
    pub max_divergence: f32,
    pub avg_divergence: f32,
    pub frame: usize,
}

impl FieldMetrics {
    /// Measure a two-channel velocity field. Divergence uses central
    /// differences over the interior (the clamped edge ring would read its
    /// own value and report zero there regardless).
    pub fn measure(velocity: &GridBuffer, frame: usize) -> Self {
        let width = velocity.width();
        let height = velocity.height();
        let dx = 1.0 / height as f32;

        let mut total_kinetic_energy: f32 = 0.0;
        let mut max_speed: f32 = 0.0;
        let mut speed_sum: f32 = 0.0;
        let mut max_divergence: f32 = 0.0;
        let mut divergence_sum: f32 = 0.0;

        for y in 1..height - 1 {
            for x in 1..width - 1 {
                let (xi, yi) = (x as i32, y as i32);
                let v = velocity.texel(xi, yi);
                let speed_sq = v[0] * v[0] + v[1] * v[1];
                total_kinetic_energy += 0.5 * speed_sq;
                let speed = speed_sq.sqrt();
                max_speed = max_speed.max(speed);
                speed_sum += speed;

                let l = velocity.texel(xi - 1, yi);
                let r = velocity.texel(xi + 1, yi);
                let t = velocity.texel(xi, yi - 1);
                let b = velocity.texel(xi, yi + 1);
                let divergence = ((r[0] - l[0]) + (b[1] - t[1])) / (2.0 * dx);
                max_divergence = max_divergence.max(divergence.abs());
                divergence_sum += divergence.abs();
            }
        }

        let interior = ((width - 2) * (height - 2)) as f32;
        Self {
            total_kinetic_energy,
            max_speed,
            avg_speed: speed_sum / interior,
            max_divergence,
            avg_divergence: divergence_sum / interior,
            frame,
        }
    }

    pub fn print_summary(&self) {
        println!("Frame {} Metrics:", self.frame);
        println!("  Kinetic Energy: {:.6}", self.total_kinetic_energy);
        println!("  Max Speed: {:.6}", self.max_speed);
        println!("  Avg Speed: {:.6}", self.avg_speed);
        println!("  Max |Divergence|: {:.6}", self.max_divergence);
        println!("  Avg |Divergence|: {:.6}", self.avg_divergence);
        println!();
    }
}

pub struct AnalysisRecorder {
    pub metrics_history: Vec<FieldMetrics>,
}

impl AnalysisRecorder {
    pub fn new() -> Self {
        Self {
            metrics_history: Vec::new(),
        }
    }

    pub fn record_frame(&mut self, velocity: &GridBuffer, frame: usize) {
        self.metrics_history.push(FieldMetrics::measure(velocity, frame));
    }

    pub fn print_trends(&self) {
        if self.metrics_history.len() < 2 {
            return;
        }

        let first = &self.metrics_history[0];
        let last = &self.metrics_history[self.metrics_history.len() - 1];

        println!("=== TREND ANALYSIS ===");
        println!(
            "Kinetic Energy: {:.6} -> {:.6} ({:+.3}%)",
            first.total_kinetic_energy,
            last.total_kinetic_energy,
            (last.total_kinetic_energy - first.total_kinetic_energy)
                / first.total_kinetic_energy.max(0.001)
                * 100.0
        );
        println!(
            "Max |Divergence|: {:.6} -> {:.6}",
            first.max_divergence, last.max_divergence
        );
    }
}

impl Default for AnalysisRecorder {
    fn default() -> Self {
        Self::new()
    }
}
