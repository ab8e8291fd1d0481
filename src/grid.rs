//! Float grid buffers and the fixed pool of named simulation fields.

use glam::Vec2;

/// Channel layout of a grid buffer. Velocity fields are two-channel,
/// pressure is one-channel, and the display buffers are four-channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelFormat {
    R32Float,
    Rg32Float,
    Rgba8Unorm,
}

impl ChannelFormat {
    pub fn channels(self) -> usize {
        match self {
            ChannelFormat::R32Float => 1,
            ChannelFormat::Rg32Float => 2,
            ChannelFormat::Rgba8Unorm => 4,
        }
    }
}

/// A 2D array of float texels, fixed in shape after creation. Mutation only
/// happens by being the target of a pass; reads go through `texel` (nearest,
/// clamped) or `sample` (bilinear, clamp-to-edge).
#[derive(Debug, Clone)]
pub struct GridBuffer {
    width: usize,
    height: usize,
    format: ChannelFormat,
    data: Vec<f32>,
}

impl GridBuffer {
    pub fn new(format: ChannelFormat, width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            format,
            data: vec![0.0; width * height * format.channels()],
        }
    }

    /// Zero-sized placeholder used when a buffer is temporarily moved out of
    /// the store while a pass writes into it.
    fn empty() -> Self {
        Self {
            width: 0,
            height: 0,
            format: ChannelFormat::R32Float,
            data: Vec::new(),
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn format(&self) -> ChannelFormat {
        self.format
    }

    pub fn data(&self) -> &[f32] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [f32] {
        &mut self.data
    }

    /// Nearest texel read with clamp-to-edge coordinates. Missing channels
    /// read as (0, 0, 0, 1), matching how a texture unit pads short formats.
    pub fn texel(&self, x: i32, y: i32) -> [f32; 4] {
        let x = x.clamp(0, self.width as i32 - 1) as usize;
        let y = y.clamp(0, self.height as i32 - 1) as usize;
        let ch = self.format.channels();
        let base = (y * self.width + x) * ch;
        let mut out = [0.0, 0.0, 0.0, 1.0];
        out[..ch].copy_from_slice(&self.data[base..base + ch]);
        out
    }

    pub fn set_texel(&mut self, x: usize, y: usize, value: [f32; 4]) {
        let ch = self.format.channels();
        let base = (y * self.width + x) * ch;
        self.data[base..base + ch].copy_from_slice(&value[..ch]);
    }

    /// Bilinear sample at normalized coordinates, clamp-to-edge. Texel
    /// centers sit at (x + 0.5) / width.
    pub fn sample(&self, uv: Vec2) -> [f32; 4] {
        let px = (uv.x * self.width as f32 - 0.5).clamp(0.0, self.width as f32 - 1.0);
        let py = (uv.y * self.height as f32 - 0.5).clamp(0.0, self.height as f32 - 1.0);
        let x0 = px.floor() as i32;
        let y0 = py.floor() as i32;
        let tx = px - x0 as f32;
        let ty = py - y0 as f32;

        let c00 = self.texel(x0, y0);
        let c10 = self.texel(x0 + 1, y0);
        let c01 = self.texel(x0, y0 + 1);
        let c11 = self.texel(x0 + 1, y0 + 1);

        let mut out = [0.0; 4];
        for c in 0..4 {
            let top = c00[c] + (c10[c] - c00[c]) * tx;
            let bottom = c01[c] + (c11[c] - c01[c]) * tx;
            out[c] = top + (bottom - top) * ty;
        }
        out
    }

    pub fn max_abs(&self) -> f32 {
        self.data.iter().fold(0.0f32, |m, v| m.max(v.abs()))
    }
}

/// Names for the fixed pool of simulation buffers: three velocity
/// ping-pong/scratch slots, two pressure slots, two display-color slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldId {
    Velocity1,
    Velocity2,
    Velocity3,
    Pressure1,
    Pressure2,
    Color1,
    Color2,
}

impl FieldId {
    pub const ALL: [FieldId; 7] = [
        FieldId::Velocity1,
        FieldId::Velocity2,
        FieldId::Velocity3,
        FieldId::Pressure1,
        FieldId::Pressure2,
        FieldId::Color1,
        FieldId::Color2,
    ];

    pub fn format(self) -> ChannelFormat {
        match self {
            FieldId::Velocity1 | FieldId::Velocity2 | FieldId::Velocity3 => ChannelFormat::Rg32Float,
            FieldId::Pressure1 | FieldId::Pressure2 => ChannelFormat::R32Float,
            FieldId::Color1 | FieldId::Color2 => ChannelFormat::Rgba8Unorm,
        }
    }
}

/// The fixed pool itself. All buffers are allocated once, on the first tick
/// after the seed image decodes, and live for the process lifetime.
#[derive(Debug, Clone)]
pub struct FieldStore {
    velocity1: GridBuffer,
    velocity2: GridBuffer,
    velocity3: GridBuffer,
    pressure1: GridBuffer,
    pressure2: GridBuffer,
    color1: GridBuffer,
    color2: GridBuffer,
}

impl FieldStore {
    pub fn new(width: usize, height: usize) -> Self {
        let buf = |id: FieldId| GridBuffer::new(id.format(), width, height);
        Self {
            velocity1: buf(FieldId::Velocity1),
            velocity2: buf(FieldId::Velocity2),
            velocity3: buf(FieldId::Velocity3),
            pressure1: buf(FieldId::Pressure1),
            pressure2: buf(FieldId::Pressure2),
            color1: buf(FieldId::Color1),
            color2: buf(FieldId::Color2),
        }
    }

    pub fn get(&self, id: FieldId) -> &GridBuffer {
        match id {
            FieldId::Velocity1 => &self.velocity1,
            FieldId::Velocity2 => &self.velocity2,
            FieldId::Velocity3 => &self.velocity3,
            FieldId::Pressure1 => &self.pressure1,
            FieldId::Pressure2 => &self.pressure2,
            FieldId::Color1 => &self.color1,
            FieldId::Color2 => &self.color2,
        }
    }

    pub fn get_mut(&mut self, id: FieldId) -> &mut GridBuffer {
        match id {
            FieldId::Velocity1 => &mut self.velocity1,
            FieldId::Velocity2 => &mut self.velocity2,
            FieldId::Velocity3 => &mut self.velocity3,
            FieldId::Pressure1 => &mut self.pressure1,
            FieldId::Pressure2 => &mut self.pressure2,
            FieldId::Color1 => &mut self.color1,
            FieldId::Color2 => &mut self.color2,
        }
    }

    /// Move a buffer out so a pass can write into it while the rest of the
    /// store stays readable. Pair with `put`.
    pub fn take(&mut self, id: FieldId) -> GridBuffer {
        std::mem::replace(self.get_mut(id), GridBuffer::empty())
    }

    pub fn put(&mut self, id: FieldId, buffer: GridBuffer) {
        *self.get_mut(id) = buffer;
    }
}
