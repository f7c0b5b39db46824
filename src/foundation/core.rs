use crate::foundation::error::{MosaicError, MosaicResult};

/// Integer rectangle in pixel coordinates. `right`/`bottom` are exclusive.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Rect {
    pub const fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn from_size(width: u32, height: u32) -> Self {
        Self::new(0, 0, clamp_i32(width), clamp_i32(height))
    }

    pub fn is_empty(self) -> bool {
        self.width <= 0 || self.height <= 0
    }

    pub fn right(self) -> i32 {
        self.x.saturating_add(self.width)
    }

    pub fn bottom(self) -> i32 {
        self.y.saturating_add(self.height)
    }

    /// Overlap of two rectangles, `None` when it has no area.
    pub fn intersect(self, other: Rect) -> Option<Rect> {
        let x0 = self.x.max(other.x);
        let y0 = self.y.max(other.y);
        let x1 = self.right().min(other.right());
        let y1 = self.bottom().min(other.bottom());
        if x1 <= x0 || y1 <= y0 {
            return None;
        }
        Some(Rect::new(x0, y0, x1 - x0, y1 - y0))
    }

    pub fn translate(self, dx: i32, dy: i32) -> Self {
        Self::new(self.x + dx, self.y + dy, self.width, self.height)
    }

    pub fn contains_rect(self, other: Rect) -> bool {
        self.x <= other.x
            && self.y <= other.y
            && self.right() >= other.right()
            && self.bottom() >= other.bottom()
    }

    pub fn contains_point(self, x: i32, y: i32) -> bool {
        x >= self.x && x < self.right() && y >= self.y && y < self.bottom()
    }

    /// Fails on negative extents. Zero-sized rectangles are accepted.
    pub fn validate_non_negative(self, what: &str) -> MosaicResult<()> {
        if self.width < 0 || self.height < 0 {
            return Err(MosaicError::validation(format!(
                "{what} has negative size {}x{}",
                self.width, self.height
            )));
        }
        Ok(())
    }
}

fn clamp_i32(v: u32) -> i32 {
    i32::try_from(v).unwrap_or(i32::MAX)
}

/// Pixel layout of a tile store.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PixelFormat {
    Rgb,
    Rgba,
    Gray,
    GrayA,
    Indexed,
    IndexedA,
}

impl PixelFormat {
    pub fn bytes(self) -> usize {
        match self {
            PixelFormat::Rgb => 3,
            PixelFormat::Rgba => 4,
            PixelFormat::Gray => 1,
            PixelFormat::GrayA => 2,
            PixelFormat::Indexed => 1,
            PixelFormat::IndexedA => 2,
        }
    }

    pub fn has_alpha(self) -> bool {
        matches!(
            self,
            PixelFormat::Rgba | PixelFormat::GrayA | PixelFormat::IndexedA
        )
    }

    pub fn base_type(self) -> ImageBaseType {
        match self {
            PixelFormat::Rgb | PixelFormat::Rgba => ImageBaseType::Rgb,
            PixelFormat::Gray | PixelFormat::GrayA => ImageBaseType::Gray,
            PixelFormat::Indexed | PixelFormat::IndexedA => ImageBaseType::Indexed,
        }
    }

    pub fn with_alpha(self) -> Self {
        match self {
            PixelFormat::Rgb | PixelFormat::Rgba => PixelFormat::Rgba,
            PixelFormat::Gray | PixelFormat::GrayA => PixelFormat::GrayA,
            PixelFormat::Indexed | PixelFormat::IndexedA => PixelFormat::IndexedA,
        }
    }

    /// Index of the alpha byte, if any.
    pub fn alpha_index(self) -> Option<usize> {
        self.has_alpha().then(|| self.bytes() - 1)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageBaseType {
    Rgb,
    Gray,
    Indexed,
}

impl ImageBaseType {
    /// Composite format of the projection for images of this base type.
    pub fn projection_format(self) -> PixelFormat {
        match self {
            ImageBaseType::Rgb | ImageBaseType::Indexed => PixelFormat::Rgba,
            ImageBaseType::Gray => PixelFormat::GrayA,
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/core.rs"]
mod tests;
