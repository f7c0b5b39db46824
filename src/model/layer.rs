use crate::{
    foundation::{
        core::{PixelFormat, Rect},
        error::{MosaicError, MosaicResult},
    },
    paint::modes::BlendMode,
    tile::store::TileStore,
};

/// Gray mask attached to a layer. `apply` multiplies it into the layer alpha,
/// `show` displays the mask itself instead of the layer.
#[derive(Clone, Debug)]
pub struct LayerMask {
    pub pixels: TileStore,
    pub apply: bool,
    pub show: bool,
}

impl LayerMask {
    pub fn new(pixels: TileStore) -> MosaicResult<Self> {
        if pixels.format() != PixelFormat::Gray {
            return Err(MosaicError::validation(format!(
                "layer mask must be gray, got {:?}",
                pixels.format()
            )));
        }
        Ok(Self {
            pixels,
            apply: true,
            show: false,
        })
    }
}

#[derive(Clone, Debug)]
pub struct Layer {
    pub name: String,
    pub pixels: TileStore,
    /// In `0..=1`.
    pub opacity: f64,
    pub mode: BlendMode,
    pub visible: bool,
    pub offset_x: i32,
    pub offset_y: i32,
    pub mask: Option<LayerMask>,
}

impl Layer {
    pub fn new(name: impl Into<String>, pixels: TileStore) -> Self {
        Self {
            name: name.into(),
            pixels,
            opacity: 1.0,
            mode: BlendMode::Normal,
            visible: true,
            offset_x: 0,
            offset_y: 0,
            mask: None,
        }
    }

    pub fn with_opacity(mut self, opacity: f64) -> Self {
        self.opacity = opacity;
        self
    }

    pub fn with_mode(mut self, mode: BlendMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_offset(mut self, x: i32, y: i32) -> Self {
        self.offset_x = x;
        self.offset_y = y;
        self
    }

    /// Attach a mask; it must have the layer's dimensions.
    pub fn with_mask(mut self, mask: LayerMask) -> MosaicResult<Self> {
        if mask.pixels.width() != self.pixels.width() || mask.pixels.height() != self.pixels.height() {
            return Err(MosaicError::validation(format!(
                "mask is {}x{}, layer '{}' is {}x{}",
                mask.pixels.width(),
                mask.pixels.height(),
                self.name,
                self.pixels.width(),
                self.pixels.height()
            )));
        }
        self.mask = Some(mask);
        Ok(self)
    }

    pub fn format(&self) -> PixelFormat {
        self.pixels.format()
    }

    /// Extent in image coordinates.
    pub fn bounds(&self) -> Rect {
        self.pixels.bounds().translate(self.offset_x, self.offset_y)
    }
}
