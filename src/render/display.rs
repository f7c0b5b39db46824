use crate::{
    foundation::{
        core::PixelFormat,
        error::{MosaicError, MosaicResult},
    },
    tile::store::TileStore,
};

/// Channel left untouched by the mask overlay; the other two are dimmed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaskChannel {
    #[default]
    Red,
    Green,
    Blue,
}

impl MaskChannel {
    #[inline]
    pub(crate) fn dim(self, px: &mut [u8]) {
        let keep = match self {
            MaskChannel::Red => 0,
            MaskChannel::Green => 1,
            MaskChannel::Blue => 2,
        };
        for (c, v) in px.iter_mut().enumerate().take(3) {
            if c != keep {
                *v >>= 2;
            }
        }
    }
}

/// Gray selection mask in image coordinates. Pixels whose mask byte has
/// the top bit clear are dimmed.
#[derive(Clone, Copy, Debug)]
pub struct MaskOverlay<'a> {
    tiles: &'a TileStore,
    pub channel: MaskChannel,
}

impl<'a> MaskOverlay<'a> {
    pub fn new(tiles: &'a TileStore, channel: MaskChannel) -> MosaicResult<Self> {
        if tiles.format() != PixelFormat::Gray {
            return Err(MosaicError::validation(format!(
                "mask overlay must be gray, got {:?}",
                tiles.format()
            )));
        }
        Ok(Self { tiles, channel })
    }

    pub fn tiles(&self) -> &'a TileStore {
        self.tiles
    }
}

/// View parameters of one display: scroll offsets into the scaled image,
/// device offsets of the drawing area, zoom, and an optional mask overlay.
#[derive(Clone, Copy, Debug)]
pub struct DisplayState<'a> {
    pub offset_x: i32,
    pub offset_y: i32,
    pub disp_xoffset: i32,
    pub disp_yoffset: i32,
    pub scale_x: f64,
    pub scale_y: f64,
    pub mask: Option<MaskOverlay<'a>>,
}

impl Default for DisplayState<'_> {
    fn default() -> Self {
        Self {
            offset_x: 0,
            offset_y: 0,
            disp_xoffset: 0,
            disp_yoffset: 0,
            scale_x: 1.0,
            scale_y: 1.0,
            mask: None,
        }
    }
}

impl<'a> DisplayState<'a> {
    pub fn with_scale(mut self, scale_x: f64, scale_y: f64) -> Self {
        self.scale_x = scale_x;
        self.scale_y = scale_y;
        self
    }

    pub fn with_offset(mut self, x: i32, y: i32) -> Self {
        self.offset_x = x;
        self.offset_y = y;
        self
    }

    pub fn with_display_offset(mut self, x: i32, y: i32) -> Self {
        self.disp_xoffset = x;
        self.disp_yoffset = y;
        self
    }

    pub fn with_mask(mut self, mask: MaskOverlay<'a>) -> Self {
        self.mask = Some(mask);
        self
    }

    pub(crate) fn validate(&self) -> MosaicResult<()> {
        for (axis, s) in [("x", self.scale_x), ("y", self.scale_y)] {
            if !s.is_finite() || s <= 0.0 {
                return Err(MosaicError::render(format!(
                    "display scale_{axis} must be positive and finite, got {s}"
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/display.rs"]
mod tests;
