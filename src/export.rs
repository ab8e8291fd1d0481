use crate::error::SolverError;
use crate::grid::GridBuffer;
use image::{ImageBuffer, Rgb, Rgba, RgbaImage};
use std::path::Path;

/// PNG export of presented frames and raw fields, for the headless driver.
pub struct ImageExporter;

impl ImageExporter {
    /// Save the last presented RGBA8 frame.
    pub fn export_frame_png(
        frame: &[u8],
        width: u32,
        height: u32,
        path: &Path,
    ) -> Result<(), SolverError> {
        let img: RgbaImage = ImageBuffer::from_fn(width, height, |x, y| {
            let base = ((y * width + x) * 4) as usize;
            Rgba([
                frame[base],
                frame[base + 1],
                frame[base + 2],
                frame[base + 3],
            ])
        });
        img.save(path)?;
        Ok(())
    }

    /// Save a velocity field with x mapped to red, y to green.
    pub fn export_velocity_png(velocity: &GridBuffer, path: &Path) -> Result<(), SolverError> {
        let img = ImageBuffer::from_fn(velocity.width() as u32, velocity.height() as u32, |x, y| {
            let v = velocity.texel(x as i32, y as i32);
            let r = ((0.5 + 0.5 * v[0]).clamp(0.0, 1.0) * 255.0) as u8;
            let g = ((0.5 + 0.5 * v[1]).clamp(0.0, 1.0) * 255.0) as u8;
            Rgb([r, g, 128])
        });
        img.save(path)?;
        Ok(())
    }
}
