use image::RgbImage;

use crate::foundation::error::{MosaicError, MosaicResult};

/// Receiver of finished screen pixels (the windowing layer's blit).
pub trait DisplaySink {
    /// Draw `width`×`height` RGB8 pixels at device position (`x`, `y`).
    /// Rows of `rgb` are `rowstride` bytes apart.
    fn draw_rgb(
        &mut self,
        x: i32,
        y: i32,
        width: u32,
        height: u32,
        rgb: &[u8],
        rowstride: usize,
    ) -> MosaicResult<()>;
}

/// In-memory RGB8 surface for tests and offscreen rendering.
#[derive(Clone, Debug)]
pub struct FrameRGB {
    pub width: u32,
    pub height: u32,
    /// Tightly packed, row-major.
    pub data: Vec<u8>,
}

impl FrameRGB {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            data: vec![0; width as usize * height as usize * 3],
        }
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 3]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = (y as usize * self.width as usize + x as usize) * 3;
        Some([self.data[i], self.data[i + 1], self.data[i + 2]])
    }

    pub fn to_rgb_image(&self) -> MosaicResult<RgbImage> {
        RgbImage::from_raw(self.width, self.height, self.data.clone())
            .ok_or_else(|| MosaicError::render("frame buffer does not match its dimensions"))
    }
}

impl DisplaySink for FrameRGB {
    fn draw_rgb(
        &mut self,
        x: i32,
        y: i32,
        width: u32,
        height: u32,
        rgb: &[u8],
        rowstride: usize,
    ) -> MosaicResult<()> {
        let row_len = width as usize * 3;
        if rowstride < row_len
            || (height > 0 && rgb.len() < (height as usize - 1) * rowstride + row_len)
        {
            return Err(MosaicError::validation(
                "draw_rgb buffer is smaller than width, height and rowstride imply",
            ));
        }
        let x0 = x.max(0);
        let x1 = (i64::from(x) + i64::from(width)).min(i64::from(self.width)) as i32;
        if x1 <= x0 {
            return Ok(());
        }
        let skip = (x0 - x) as usize * 3;
        let len = (x1 - x0) as usize * 3;
        for row in 0..height as usize {
            let dy = i64::from(y) + row as i64;
            if dy < 0 || dy >= i64::from(self.height) {
                continue;
            }
            let src = row * rowstride + skip;
            let dst = (dy as usize * self.width as usize + x0 as usize) * 3;
            self.data[dst..dst + len].copy_from_slice(&rgb[src..src + len]);
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/sink.rs"]
mod tests;
