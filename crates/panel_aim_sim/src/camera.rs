use image::{Rgba, RgbaImage};
use panel_aim::panel::FrameSource;

/// Produces a moving test pattern at a fixed fraction of the tick rate.
pub struct SyntheticCamera {
    width: u32,
    height: u32,
    every: u32,
    calls: u64,
    frames: u64,
}

impl SyntheticCamera {
    pub fn new(width: u32, height: u32, every: u32) -> Self {
        Self {
            width,
            height,
            every: every.max(1),
            calls: 0,
            frames: 0,
        }
    }

    fn render(&self) -> RgbaImage {
        let (w, h) = (self.width.max(1), self.height.max(1));
        // A vertical bar sweeps across a gradient so consecutive frames differ.
        let bar = (self.frames * 8 % w as u64) as u32;
        RgbaImage::from_fn(w, h, |x, y| {
            if x.abs_diff(bar) < 6 {
                Rgba([255, 255, 255, 255])
            } else {
                Rgba([(x * 255 / w) as u8, (y * 255 / h) as u8, 96, 255])
            }
        })
    }
}

impl FrameSource for SyntheticCamera {
    fn latest_frame(&mut self) -> Option<RgbaImage> {
        let due = self.calls % self.every as u64 == 0;
        self.calls += 1;
        if !due {
            return None;
        }
        let frame = self.render();
        self.frames += 1;
        Some(frame)
    }
}
