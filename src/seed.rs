//! Asynchronous seed-image decode.
//!
//! The image decodes on a worker thread; the solver polls `try_take` once
//! per tick and stays in its waiting state until the pixels arrive. A decode
//! failure is logged once and the handle stays pending, so the solver simply
//! never starts (there is no retry and no timeout).

use crate::grid::{ChannelFormat, GridBuffer};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

#[derive(Clone)]
pub struct SeedHandle {
    slot: Arc<Mutex<Option<GridBuffer>>>,
}

impl SeedHandle {
    /// Kick off a decode of `path`, resampled to `width` x `height`.
    pub fn load(path: PathBuf, width: u32, height: u32) -> Self {
        let slot = Arc::new(Mutex::new(None));
        let worker_slot = Arc::clone(&slot);
        std::thread::spawn(move || match image::open(&path) {
            Ok(img) => {
                let grid = grid_from_image(&img, width, height);
                log::info!("seed image {} decoded", path.display());
                *worker_slot.lock().unwrap() = Some(grid);
            }
            Err(err) => {
                log::error!("failed to decode seed image {}: {err}", path.display());
            }
        });
        Self { slot }
    }

    /// A handle that is ready immediately. Used by the headless driver and
    /// tests, where the pixels are synthesized rather than decoded.
    pub fn ready(seed: GridBuffer) -> Self {
        Self {
            slot: Arc::new(Mutex::new(Some(seed))),
        }
    }

    /// A handle that never resolves.
    pub fn pending() -> Self {
        Self {
            slot: Arc::new(Mutex::new(None)),
        }
    }

    pub fn try_take(&self) -> Option<GridBuffer> {
        self.slot.lock().unwrap().take()
    }
}

fn grid_from_image(img: &image::DynamicImage, width: u32, height: u32) -> GridBuffer {
    let resized = img
        .resize_exact(width, height, image::imageops::FilterType::Triangle)
        .to_rgba8();
    let mut grid = GridBuffer::new(ChannelFormat::Rgba8Unorm, width as usize, height as usize);
    for (x, y, pixel) in resized.enumerate_pixels() {
        grid.set_texel(
            x as usize,
            y as usize,
            [
                pixel[0] as f32 / 255.0,
                pixel[1] as f32 / 255.0,
                pixel[2] as f32 / 255.0,
                pixel[3] as f32 / 255.0,
            ],
        );
    }
    grid
}
