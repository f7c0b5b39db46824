use crate::{
    foundation::{
        core::PixelFormat,
        error::{MosaicError, MosaicResult},
    },
    paint::ops::ChannelPolarity,
    tile::store::TileStore,
};

/// Auxiliary gray channel drawn as a colored overlay on the projection.
#[derive(Clone, Debug)]
pub struct Channel {
    pub name: String,
    pub pixels: TileStore,
    pub color: [u8; 3],
    pub opacity: f64,
    /// Paint where the channel is unselected instead of selected.
    pub show_masked: bool,
    pub visible: bool,
}

impl Channel {
    pub fn new(name: impl Into<String>, pixels: TileStore, color: [u8; 3]) -> MosaicResult<Self> {
        if pixels.format() != PixelFormat::Gray {
            return Err(MosaicError::validation(format!(
                "channel must be gray, got {:?}",
                pixels.format()
            )));
        }
        Ok(Self {
            name: name.into(),
            pixels,
            color,
            opacity: 0.5,
            show_masked: false,
            visible: true,
        })
    }

    pub fn polarity(&self) -> ChannelPolarity {
        if self.show_masked {
            ChannelPolarity::Masked
        } else {
            ChannelPolarity::Selection
        }
    }
}
