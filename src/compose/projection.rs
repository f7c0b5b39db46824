use crate::{
    compose::pyramid::{build_levels, level_for_scale, update_levels},
    foundation::{
        core::{ImageBaseType, PixelFormat, Rect},
        error::{MosaicError, MosaicResult},
        math::opacity_to_u8,
    },
    model::{Image, Layer},
    paint::{
        modes::BlendMode,
        ops::{
            OpParams, clear, combine_channel, combine_regions, copy_gray, initial_channel,
            initial_region,
        },
    },
    tile::{
        region::{PixelRegion, PixelRegionMut},
        store::TileStore,
    },
};

/// Flattened raster of an image plus its reduced-resolution levels.
#[derive(Clone, Debug)]
pub struct Projection {
    base_type: ImageBaseType,
    format: PixelFormat,
    levels: Vec<TileStore>,
    construct_flag: bool,
    opacity: f64,
}

impl Projection {
    pub fn new(width: u32, height: u32, base_type: ImageBaseType) -> Self {
        let format = base_type.projection_format();
        Self {
            base_type,
            format,
            levels: build_levels(width, height, format),
            construct_flag: false,
            opacity: 1.0,
        }
    }

    pub fn for_image(image: &Image) -> Self {
        Self::new(image.width(), image.height(), image.base_type())
    }

    pub fn format(&self) -> PixelFormat {
        self.format
    }

    pub fn width(&self) -> u32 {
        self.levels[0].width()
    }

    pub fn height(&self) -> u32 {
        self.levels[0].height()
    }

    /// Full-resolution pixels.
    pub fn tiles(&self) -> &TileStore {
        &self.levels[0]
    }

    /// Full-resolution pixels for direct writes. Reduced levels go stale
    /// until [`Projection::refresh_levels`] runs over the touched area.
    pub fn tiles_mut(&mut self) -> &mut TileStore {
        &mut self.levels[0]
    }

    /// Rebuild the reduced levels under `rect` from full-resolution pixels.
    pub fn refresh_levels(&mut self, rect: Rect) -> MosaicResult<()> {
        rect.validate_non_negative("refresh rect")?;
        match rect.intersect(self.levels[0].bounds()) {
            Some(r) => update_levels(&mut self.levels, r),
            None => Ok(()),
        }
    }

    pub fn level_count(&self) -> usize {
        self.levels.len()
    }

    pub fn tiles_at_level(&self, level: usize) -> Option<&TileStore> {
        self.levels.get(level)
    }

    /// Level to sample for a display scale, with the scale adjusted to it.
    pub fn level_for_scale(&self, scale_x: f64, scale_y: f64) -> (usize, f64, f64) {
        level_for_scale(self.levels.len(), scale_x, scale_y)
    }

    /// Whether anything was written during the last composite.
    pub fn construct_flag(&self) -> bool {
        self.construct_flag
    }

    pub fn opacity(&self) -> f64 {
        self.opacity
    }

    pub fn set_opacity(&mut self, opacity: f64) {
        self.opacity = opacity.clamp(0.0, 1.0);
    }

    /// Full-resolution tiles written since the last call.
    pub fn take_dirty_tiles(&mut self) -> Vec<(u32, u32)> {
        let dirty = self.levels[0].take_dirty();
        for level in &mut self.levels[1..] {
            level.take_dirty();
        }
        dirty
    }

    /// Composite every visible layer and channel of `image` into `rect`.
    ///
    /// A floating selection is merged into its parent first. Layers whose
    /// format does not belong to the image, indexed layers without a
    /// colormap and layers whose mask does not match them are skipped with
    /// a warning.
    #[tracing::instrument(skip(self, image), fields(layers = image.get_layers().len()))]
    pub fn construct_projection(&mut self, image: &mut Image, rect: Rect) -> MosaicResult<()> {
        rect.validate_non_negative("projection rect")?;
        if image.width() != self.width() || image.height() != self.height() {
            return Err(MosaicError::composite(format!(
                "image is {}x{}, projection is {}x{}",
                image.width(),
                image.height(),
                self.width(),
                self.height()
            )));
        }
        if image.base_type() != self.base_type {
            return Err(MosaicError::composite(format!(
                "image base type {:?} does not match projection {:?}",
                image.base_type(),
                self.base_type
            )));
        }
        let Some(r) = rect.intersect(image.bounds()) else {
            return Ok(());
        };

        image.flatten_floating_selection(r)?;
        let image: &Image = image;
        self.construct_flag = false;

        let pass: Vec<(&Layer, Rect)> = image
            .get_layers()
            .iter()
            .enumerate()
            .rev()
            .filter(|(i, l)| l.visible && !image.is_floating_layer(*i))
            .filter_map(|(_, l)| l.bounds().intersect(r).map(|clip| (l, clip)))
            .filter(|(l, _)| usable(image, l))
            .collect();

        if !initial_write_covers(&pass, r) {
            let mut dest = PixelRegionMut::new(&mut self.levels[0], r, true);
            clear(&mut dest)?;
        }

        for (layer, clip) in pass {
            self.composite_layer(image, layer, clip)?;
            self.construct_flag = true;
        }

        for channel in image.get_channels().iter().rev().filter(|c| c.visible) {
            if !channel.pixels.bounds().contains_rect(r) {
                tracing::warn!(channel = %channel.name, "channel does not cover the image; skipping");
                continue;
            }
            let src = PixelRegion::new(&channel.pixels, r);
            let mut dest = PixelRegionMut::new(&mut self.levels[0], r, true);
            let opacity = opacity_to_u8(channel.opacity);
            if self.construct_flag {
                combine_channel(&mut dest, &src, channel.color, opacity, channel.polarity())?;
            } else {
                initial_channel(&mut dest, &src, channel.color, opacity, channel.polarity())?;
            }
            self.construct_flag = true;
        }

        update_levels(&mut self.levels, r)?;
        tracing::debug!(levels = self.levels.len(), "projection updated");
        Ok(())
    }

    fn composite_layer(&mut self, image: &Image, layer: &Layer, clip: Rect) -> MosaicResult<()> {
        let src_rect = clip.translate(-layer.offset_x, -layer.offset_y);
        let src = PixelRegion::new(&layer.pixels, src_rect);
        let mut dest = PixelRegionMut::new(&mut self.levels[0], clip, true);

        if let Some(mask) = &layer.mask
            && mask.show
        {
            let mask_region = PixelRegion::new(&mask.pixels, src_rect);
            return copy_gray(&mut dest, &mask_region);
        }

        let format = layer.format();
        let mask_region = layer
            .mask
            .as_ref()
            .filter(|m| m.apply && format.has_alpha())
            .map(|m| PixelRegion::new(&m.pixels, src_rect));
        let params = OpParams {
            opacity: opacity_to_u8(layer.opacity),
            mode: layer.mode,
            colormap: image.get_colormap(),
        };
        let initial = !self.construct_flag;
        match format {
            PixelFormat::Rgb | PixelFormat::Gray | PixelFormat::Indexed => {
                if initial {
                    initial_region(&mut dest, &src, None, &params)
                } else {
                    combine_regions(&mut dest, &src, None, &params)
                }
            }
            PixelFormat::Rgba | PixelFormat::GrayA | PixelFormat::IndexedA => {
                if initial {
                    initial_region(&mut dest, &src, mask_region.as_ref(), &params)
                } else {
                    combine_regions(&mut dest, &src, mask_region.as_ref(), &params)
                }
            }
        }
    }
}

/// Layers the compositor can draw into this image at all.
fn usable(image: &Image, layer: &Layer) -> bool {
    let format = layer.format();
    if format.base_type() != image.base_type() {
        tracing::warn!(layer = %layer.name, ?format, "layer format does not match image; skipping");
        return false;
    }
    if format.base_type() == ImageBaseType::Indexed && image.get_colormap().is_none() {
        tracing::warn!(layer = %layer.name, "indexed layer without a colormap; skipping");
        return false;
    }
    if let Some(mask) = &layer.mask {
        let (pixels, m) = (&layer.pixels, &mask.pixels);
        if m.format() != PixelFormat::Gray
            || m.width() != pixels.width()
            || m.height() != pixels.height()
        {
            tracing::warn!(
                layer = %layer.name,
                mask_format = ?m.format(),
                mask_size = ?(m.width(), m.height()),
                layer_size = ?(pixels.width(), pixels.height()),
                "layer mask does not match its layer; skipping"
            );
            return false;
        }
    }
    true
}

/// True when some layer of the pass writes every pixel of `r` opaquely, so
/// clearing first is unnecessary. Indexed layers only count as the first
/// write, since they cannot be combined.
fn initial_write_covers(pass: &[(&Layer, Rect)], r: Rect) -> bool {
    pass.iter().enumerate().any(|(i, (layer, clip))| {
        let format = layer.format();
        *clip == r
            && !format.has_alpha()
            && layer.mode == BlendMode::Normal
            && opacity_to_u8(layer.opacity) == 255
            && (format != PixelFormat::Indexed || i == 0)
    })
}

#[cfg(test)]
#[path = "../../tests/unit/compose/projection.rs"]
mod tests;
