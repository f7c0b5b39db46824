//! Mosaic is the raster core of a layered image editor.
//!
//! It keeps pixels in 64×64 tiles and turns an [`Image`] into screen pixels
//! in two stages:
//!
//! - [`Projection::construct_projection`] composites the visible layers and
//!   channels of an image into a flat projection with reduced levels.
//! - [`ScaledRenderer::render`] resamples a projection at any zoom, puts
//!   transparent areas over a checkerboard and hands RGB rows to a
//!   [`DisplaySink`].
#![forbid(unsafe_code)]

mod foundation;

pub(crate) mod compose;
pub(crate) mod model;
pub(crate) mod paint;
pub(crate) mod render;
pub(crate) mod tile;

pub use crate::foundation::core::{ImageBaseType, PixelFormat, Rect};
pub use crate::foundation::error::{MosaicError, MosaicResult};
pub use crate::foundation::math::opacity_to_u8;

pub use crate::compose::projection::Projection;
pub use crate::model::{Channel, Colormap, FloatingSelection, Image, Layer, LayerMask};
pub use crate::paint::modes::BlendMode;
pub use crate::paint::ops::{
    ChannelPolarity, OpParams, blend_onto_layer, clear, combine_channel, combine_regions,
    copy_gray, initial_channel, initial_region,
};
pub use crate::render::display::{DisplayState, MaskChannel, MaskOverlay};
pub use crate::render::scaled::{RenderSource, ScaledRenderer};
pub use crate::render::settings::RenderSettings;
pub use crate::render::sink::{DisplaySink, FrameRGB};
pub use crate::render::tables::{AlphaTable, CheckSize, CheckTables, CheckType};
pub use crate::tile::region::{
    PixelRegion, PixelRegionMut, Portion, PortionMut, process_regions,
};
pub use crate::tile::store::{TILE_HEIGHT, TILE_WIDTH, TileMut, TileRef, TileStore};
