use crate::{
    compose::projection::Projection,
    foundation::{
        core::{PixelFormat, Rect},
        error::{MosaicError, MosaicResult},
        math::opacity_to_u8,
    },
    model::Colormap,
    render::{
        display::{DisplayState, MaskOverlay},
        fault::{RenderInfo, RowCursor, Side, fixed_pos},
        settings::RenderSettings,
        sink::DisplaySink,
        tables::{AlphaTable, CheckTables},
    },
    tile::store::{TILE_HEIGHT, TileStore},
};

/// Pixels handed to the scaled renderer, with the scale of the store
/// relative to the full-resolution image.
#[derive(Clone, Copy, Debug)]
pub struct RenderSource<'a> {
    tiles: &'a TileStore,
    colormap: Option<&'a Colormap>,
    opacity: f64,
    level_scale: f64,
}

impl<'a> RenderSource<'a> {
    pub fn new(tiles: &'a TileStore) -> Self {
        Self {
            tiles,
            colormap: None,
            opacity: 1.0,
            level_scale: 1.0,
        }
    }

    /// One pyramid level of `projection`, carrying its opacity.
    pub fn from_projection(projection: &'a Projection, level: usize) -> MosaicResult<Self> {
        let tiles = projection.tiles_at_level(level).ok_or_else(|| {
            MosaicError::render(format!(
                "projection has {} levels, level {level} requested",
                projection.level_count()
            ))
        })?;
        Ok(Self {
            tiles,
            colormap: None,
            opacity: projection.opacity(),
            level_scale: f64::from(1u32 << level.min(31)),
        })
    }

    pub fn with_colormap(mut self, colormap: Option<&'a Colormap>) -> Self {
        self.colormap = colormap;
        self
    }

    pub fn with_opacity(mut self, opacity: f64) -> Self {
        self.opacity = opacity;
        self
    }

    pub fn tiles(&self) -> &'a TileStore {
        self.tiles
    }
}

/// Renders a rectangle of the zoomed image into RGB8 screen pixels.
///
/// Holds the lookup tables derived from [`RenderSettings`] and scratch
/// buffers that are reused between calls.
#[derive(Debug)]
pub struct ScaledRenderer {
    settings: RenderSettings,
    checks: CheckTables,
    alpha: AlphaTable,
    row: Vec<u8>,
    out: Vec<u8>,
}

impl Default for ScaledRenderer {
    fn default() -> Self {
        Self::new(RenderSettings::default())
    }
}

impl ScaledRenderer {
    pub fn new(settings: RenderSettings) -> Self {
        Self {
            checks: CheckTables::new(settings.check_type, settings.transparency_indicator),
            alpha: AlphaTable::new(255),
            settings,
            row: Vec::new(),
            out: Vec::new(),
        }
    }

    pub fn settings(&self) -> &RenderSettings {
        &self.settings
    }

    /// Adopt new preferences, regenerating the check tables if needed.
    pub fn settings_changed(&mut self, settings: RenderSettings) {
        if settings.check_type != self.settings.check_type
            || settings.transparency_indicator != self.settings.transparency_indicator
        {
            self.checks = CheckTables::new(settings.check_type, settings.transparency_indicator);
            tracing::debug!(
                check_type = ?settings.check_type,
                indicator = settings.transparency_indicator,
                "check tables regenerated"
            );
        }
        self.settings = settings;
    }

    /// Render `rect` (scaled-image coordinates relative to the display
    /// offsets) from the pyramid level that best matches the display zoom.
    #[tracing::instrument(
        skip(self, projection, view, sink),
        fields(scale_x = view.scale_x, scale_y = view.scale_y)
    )]
    pub fn render(
        &mut self,
        projection: &Projection,
        view: &DisplayState<'_>,
        rect: Rect,
        highlight: Option<Rect>,
        sink: &mut dyn DisplaySink,
    ) -> MosaicResult<()> {
        view.validate()?;
        let (level, _, _) = projection.level_for_scale(view.scale_x, view.scale_y);
        let source = RenderSource::from_projection(projection, level)?;
        tracing::debug!(level, "pyramid level selected");
        self.render_source(&source, view, rect, highlight, sink)
    }

    /// Render `rect` from an explicit source store.
    pub fn render_source(
        &mut self,
        source: &RenderSource<'_>,
        view: &DisplayState<'_>,
        rect: Rect,
        highlight: Option<Rect>,
        sink: &mut dyn DisplaySink,
    ) -> MosaicResult<()> {
        if rect.width <= 0 || rect.height <= 0 {
            return Err(MosaicError::invalid_rect(format!(
                "render rect {rect:?} has no area"
            )));
        }
        view.validate()?;

        let format = source.tiles.format();
        let colormap = match (format, source.colormap) {
            (PixelFormat::Indexed | PixelFormat::IndexedA, None) => {
                tracing::warn!("indexed source without colormap, rendering indices as gray");
                None
            }
            (_, cmap) => cmap,
        };
        self.alpha.update(opacity_to_u8(source.opacity));

        let (w, h) = (rect.width as usize, rect.height as usize);
        let x0 = i64::from(rect.x) + i64::from(view.offset_x);
        let y0 = i64::from(rect.y) + i64::from(view.offset_y);
        let scale_y = view.scale_y * source.level_scale;
        let info = RenderInfo::new(source.tiles, view.scale_x * source.level_scale, scale_y, x0, w);
        let stride = w * 3;

        let mut row = std::mem::take(&mut self.row);
        row.clear();
        row.resize(w * info.bpp, 0);
        let mut out = std::mem::take(&mut self.out);
        out.clear();
        out.resize(stride * h, 0);

        let (check_mask, _) = self.settings.check_size.mask_shift();
        let check_mask = i64::from(check_mask);
        let mut prev_src_y = None;
        let mut reused = 0usize;
        for j in 0..h {
            let dy = y0 + j as i64;
            let ypos = fixed_pos(dy, scale_y);
            let src_y = ypos >> 16;
            let (done, rest) = out.split_at_mut(j * stride);
            let dest = &mut rest[..stride];

            // Alpha rows only repeat inside a check cell.
            let same_checks = !format.has_alpha() || (dy & check_mask) != 0;
            if self.settings.row_reuse && prev_src_y == Some(src_y) && same_checks {
                reuse_previous_row(&done[(j - 1) * stride..], dest);
                reused += 1;
                continue;
            }
            info.fault_row(ypos, &mut row);
            self.output_row(format, colormap, &row, dest, x0, dy);
            prev_src_y = Some(src_y);
        }
        tracing::trace!(rows = h, reused, nearest = info.uses_nearest(), "rows rendered");

        if let Some(highlight) = highlight {
            dim_outside(&mut out, stride, rect, highlight);
        } else if let Some(mask) = view.mask {
            apply_mask(&mut out, stride, rect, view, &mask);
        }

        let result = sink.draw_rgb(
            rect.x + view.disp_xoffset,
            rect.y + view.disp_yoffset,
            w as u32,
            h as u32,
            &out,
            stride,
        );
        self.row = row;
        self.out = out;
        result
    }

    /// Turn one row of source pixels into RGB, compositing alpha over the
    /// checkerboard.
    fn output_row(
        &self,
        format: PixelFormat,
        colormap: Option<&Colormap>,
        src: &[u8],
        dest: &mut [u8],
        x0: i64,
        dy: i64,
    ) {
        let lookup = |i: u8| colormap.map_or([i, i, i], |c| c.get(i));
        let (mask, shift) = self.settings.check_size.mask_shift();
        let mask = i64::from(mask);
        let mut dark = ((dy >> shift) + (x0 >> shift)) & 1 == 1;
        let dests = dest.chunks_exact_mut(3);
        let bpp = format.bytes();
        let pixels = src.chunks_exact(bpp);

        let color = |s: &[u8]| -> [u8; 3] {
            match format {
                PixelFormat::Rgb | PixelFormat::Rgba => [s[0], s[1], s[2]],
                PixelFormat::Gray | PixelFormat::GrayA => [s[0], s[0], s[0]],
                PixelFormat::Indexed | PixelFormat::IndexedA => lookup(s[0]),
            }
        };

        match format.alpha_index() {
            None => {
                for (d, s) in dests.zip(pixels) {
                    d.copy_from_slice(&color(s));
                }
            }
            Some(ai) => {
                for (i, (d, s)) in dests.zip(pixels).enumerate() {
                    let key = self.alpha.key(s[ai]);
                    for (dc, c) in d.iter_mut().zip(color(s)) {
                        *dc = self.checks.blend_key(dark, key | usize::from(c));
                    }
                    if (x0 + i as i64 + 1) & mask == 0 {
                        dark = !dark;
                    }
                }
            }
        }
    }
}

#[inline]
fn reuse_previous_row(prev: &[u8], dest: &mut [u8]) {
    dest.copy_from_slice(&prev[..dest.len()]);
}

/// Halve every pixel of `rect` that lies outside `highlight`.
fn dim_outside(out: &mut [u8], stride: usize, rect: Rect, highlight: Rect) {
    let inner = highlight.intersect(rect);
    for (j, row) in out.chunks_exact_mut(stride).enumerate() {
        let y = rect.y + j as i32;
        let keep = match inner {
            Some(h) if y >= h.y && y < h.bottom() => {
                ((h.x - rect.x) as usize * 3)..((h.right() - rect.x) as usize * 3)
            }
            _ => 0..0,
        };
        for (k, v) in row.iter_mut().enumerate() {
            if !keep.contains(&k) {
                *v >>= 1;
            }
        }
    }
}

/// Dim pixels whose mask value has the top bit clear. The mask is sampled
/// in image space; pixels outside it count as unselected.
fn apply_mask(
    out: &mut [u8],
    stride: usize,
    rect: Rect,
    display: &DisplayState<'_>,
    mask: &MaskOverlay<'_>,
) {
    let tiles = mask.tiles();
    let image_coord = |d: i64, scale: f64| (d as f64 / scale).floor() as i64;
    let mx: Vec<Option<u32>> = (0..rect.width as i64)
        .map(|i| {
            let x = image_coord(i64::from(rect.x) + i64::from(display.offset_x) + i, display.scale_x);
            (x >= 0 && x < i64::from(tiles.width())).then_some(x as u32)
        })
        .collect();
    let mut value = [0u8; 1];
    for (j, row) in out.chunks_exact_mut(stride).enumerate() {
        let y = image_coord(
            i64::from(rect.y) + i64::from(display.offset_y) + j as i64,
            display.scale_y,
        );
        let y = (y >= 0 && y < i64::from(tiles.height())).then_some(y as u32);
        let mut cursor = y.map(|y| RowCursor::new(tiles, y / TILE_HEIGHT));
        for (px, x) in row.chunks_exact_mut(3).zip(&mx) {
            let selected = match (cursor.as_mut(), y, x) {
                (Some(cursor), Some(y), Some(x)) => {
                    cursor.read(Side::Left, *x, y, &mut value);
                    value[0] & 0x80 != 0
                }
                _ => false,
            };
            if !selected {
                mask.channel.dim(px);
            }
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/scaled.rs"]
mod tests;
