//! Interactive shell: drives the solver once per repaint and blits the
//! presented frame.

use crate::renderer::PassDevice;
use crate::solver::{DisplayMode, FluidSolver, SIM_SIZE};
use eframe::egui;

pub struct InkwashApp<D: PassDevice> {
    solver: FluidSolver<D>,
    texture: Option<egui::TextureHandle>,
    paused: bool,
    frame_count: usize,
}

impl<D: PassDevice> InkwashApp<D> {
    pub fn new(solver: FluidSolver<D>) -> Self {
        Self {
            solver,
            texture: None,
            paused: false,
            frame_count: 0,
        }
    }
}

impl<D: PassDevice> eframe::App for InkwashApp<D> {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        egui::CentralPanel::default().show(ctx, |ui| {
            ui.heading("inkwash - stable fluids");

            ui.horizontal(|ui| {
                if ui.button("Pause/Resume").clicked() {
                    self.paused = !self.paused;
                }
                ui.radio_value(&mut self.solver.display, DisplayMode::Ink, "Ink");
                ui.radio_value(&mut self.solver.display, DisplayMode::Velocity, "Velocity");
            });

            ui.separator();

            let side = SIM_SIZE as f32;
            let (rect, response) =
                ui.allocate_exact_size(egui::Vec2::splat(side), egui::Sense::hover());

            // Cursor positions feed the force splat on the next tick.
            if let Some(pos) = response.hover_pos() {
                self.solver.set_cursor(pos.x - rect.left(), pos.y - rect.top());
            }

            if !self.paused {
                let timestamp_ms = ctx.input(|i| i.time) * 1000.0;
                if let Err(err) = self.solver.on_frame(timestamp_ms) {
                    log::error!("frame tick failed: {err}");
                }
                self.frame_count += 1;
            }

            if self.solver.is_ready() {
                let image = egui::ColorImage::from_rgba_unmultiplied(
                    [SIM_SIZE, SIM_SIZE],
                    self.solver.device().frame(),
                );
                match &mut self.texture {
                    Some(texture) => texture.set(image, egui::TextureOptions::LINEAR),
                    None => {
                        self.texture = Some(ctx.load_texture(
                            "inkwash-frame",
                            image,
                            egui::TextureOptions::LINEAR,
                        ));
                    }
                }
            }

            if let Some(texture) = &self.texture {
                ui.painter().image(
                    texture.id(),
                    rect,
                    egui::Rect::from_min_max(egui::pos2(0.0, 0.0), egui::pos2(1.0, 1.0)),
                    egui::Color32::WHITE,
                );
            } else {
                ui.painter().rect_filled(rect, 0.0, egui::Color32::BLACK);
                ui.label("waiting for seed image...");
            }

            ui.label(format!("Frame: {}", self.frame_count));
        });

        ctx.request_repaint();
    }
}
