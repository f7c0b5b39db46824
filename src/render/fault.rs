//! Scanline tile faulting and resampling.
//!
//! Each output row is filled from the source store by one of three paths:
//! nearest neighbour, bilinear within a single tile row (two tiles live at a
//! time), and bilinear across two tile rows (four tiles). Tiles are held by
//! per-row cursors and only re-acquired when the source column crosses into
//! another tile.

use crate::{
    foundation::core::PixelFormat,
    tile::store::{TILE_HEIGHT, TILE_WIDTH, TileRef, TileStore},
};

/// 16.16 fixed-point source position for scaled-image coordinate `d`.
#[inline]
pub(crate) fn fixed_pos(d: i64, scale: f64) -> i64 {
    ((d as f64) * 65536.0 / scale).floor() as i64
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum FaultPath {
    Nearest,
    SingleRow,
    FourTile,
}

/// Per-render sampling state.
pub(crate) struct RenderInfo<'s> {
    pub src: &'s TileStore,
    pub format: PixelFormat,
    pub bpp: usize,
    pub scale_x: f64,
    pub scale_y: f64,
    /// Fixed-point source x for every output column.
    xpos: Vec<i64>,
}

impl<'s> RenderInfo<'s> {
    pub fn new(src: &'s TileStore, scale_x: f64, scale_y: f64, x0: i64, width: usize) -> Self {
        Self {
            src,
            format: src.format(),
            bpp: src.bpp(),
            scale_x,
            scale_y,
            xpos: (0..width as i64).map(|i| fixed_pos(x0 + i, scale_x)).collect(),
        }
    }

    /// Nearest neighbour at identity scale or when enlarging on both axes.
    /// Indexed data cannot be interpolated and always samples directly.
    pub fn uses_nearest(&self) -> bool {
        let indexed = matches!(self.format, PixelFormat::Indexed | PixelFormat::IndexedA);
        indexed
            || (self.scale_x == 1.0 && self.scale_y == 1.0)
            || (self.scale_x > 1.0 && self.scale_y > 1.0)
    }

    /// Fill `row` with resampled pixels for source row position `ypos`.
    pub fn fault_row(&self, ypos: i64, row: &mut [u8]) -> FaultPath {
        let src_y = ypos >> 16;
        if self.uses_nearest() {
            self.fault_nearest(src_y, row);
            return FaultPath::Nearest;
        }
        let fy = ((ypos >> 8) & 0xff) as u8;
        self.fault_bilinear(src_y, fy, row)
    }

    fn row_in_store(&self, src_y: i64) -> Option<u32> {
        (src_y >= 0 && src_y < i64::from(self.src.height())).then_some(src_y as u32)
    }

    fn col_in_store(&self, src_x: i64) -> Option<u32> {
        (src_x >= 0 && src_x < i64::from(self.src.width())).then_some(src_x as u32)
    }

    fn fault_nearest(&self, src_y: i64, row: &mut [u8]) {
        let Some(y) = self.row_in_store(src_y) else {
            row.fill(0);
            return;
        };
        let mut cursor = RowCursor::new(self.src, y / TILE_HEIGHT);
        for (out, &xpos) in row.chunks_exact_mut(self.bpp).zip(&self.xpos) {
            match self.col_in_store(xpos >> 16) {
                Some(x) => cursor.read(Side::Left, x, y, out),
                None => out.fill(0),
            }
        }
    }

    fn fault_bilinear(&self, src_y: i64, fy: u8, row: &mut [u8]) -> FaultPath {
        let Some(y) = self.row_in_store(src_y) else {
            row.fill(0);
            return FaultPath::SingleRow;
        };
        // Neighbours past the edge repeat the last row/column.
        let ny = (y + 1).min(self.src.height() - 1);
        let mut top = RowCursor::new(self.src, y / TILE_HEIGHT);
        let mut bottom = (ny / TILE_HEIGHT != y / TILE_HEIGHT)
            .then(|| RowCursor::new(self.src, ny / TILE_HEIGHT));
        let path = if bottom.is_some() {
            FaultPath::FourTile
        } else {
            FaultPath::SingleRow
        };

        let alpha = self.format.alpha_index();
        let mut samples = [[0u8; 4]; 4];
        for (out, &xpos) in row.chunks_exact_mut(self.bpp).zip(&self.xpos) {
            let Some(x) = self.col_in_store(xpos >> 16) else {
                out.fill(0);
                continue;
            };
            let nx = (x + 1).min(self.src.width() - 1);
            let fx = ((xpos >> 8) & 0xff) as u8;
            let bpp = self.bpp;
            top.read(Side::Left, x, y, &mut samples[0][..bpp]);
            top.read(Side::Right, nx, y, &mut samples[1][..bpp]);
            let lower = bottom.as_mut().unwrap_or(&mut top);
            lower.read(Side::Left, x, ny, &mut samples[2][..bpp]);
            lower.read(Side::Right, nx, ny, &mut samples[3][..bpp]);
            mix_pixels(fx, fy, &samples, bpp, alpha, out);
        }
        path
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Side {
    Left,
    Right,
}

/// Holds up to two tiles of one tile row for the duration of a scanline.
pub(crate) struct RowCursor<'s> {
    src: &'s TileStore,
    tile_row: u32,
    left: Option<TileRef<'s>>,
    right: Option<TileRef<'s>>,
    fetches: u32,
}

impl<'s> RowCursor<'s> {
    pub fn new(src: &'s TileStore, tile_row: u32) -> Self {
        Self {
            src,
            tile_row,
            left: None,
            right: None,
            fetches: 0,
        }
    }

    /// Number of tile acquisitions so far.
    pub fn fetches(&self) -> u32 {
        self.fetches
    }

    /// Copy pixel (`x`, `y`) into `out`. The pixel must be inside the store
    /// and `y` inside this cursor's tile row.
    pub fn read(&mut self, side: Side, x: u32, y: u32, out: &mut [u8]) {
        let col = x / TILE_WIDTH;
        let slot = match side {
            Side::Left => &mut self.left,
            Side::Right => &mut self.right,
        };
        if slot.as_ref().map(TileRef::col) != Some(col) {
            *slot = self.src.acquire(col, self.tile_row);
            self.fetches += 1;
        }
        match slot {
            Some(tile) => out.copy_from_slice(tile.pixel(x % TILE_WIDTH, y % TILE_HEIGHT)),
            None => out.fill(0),
        }
    }
}

/// Pull an interpolation weight halfway toward the centre.
#[inline]
fn skew(w: u8) -> u32 {
    (((i32::from(w) - 128) >> 1) + 128) as u32
}

/// Bilinear mix of `[p00, p10, p01, p11]` with 8-bit fractions. With an
/// alpha channel the colors are weighted by each sample's alpha and divided
/// back out afterwards.
pub(crate) fn mix_pixels(
    fx: u8,
    fy: u8,
    samples: &[[u8; 4]; 4],
    bpp: usize,
    alpha: Option<usize>,
    out: &mut [u8],
) {
    let (wx, wy) = (skew(fx), skew(fy));
    let weights = [
        u64::from((256 - wx) * (256 - wy)),
        u64::from(wx * (256 - wy)),
        u64::from((256 - wx) * wy),
        u64::from(wx * wy),
    ];
    match alpha {
        None => {
            for c in 0..bpp {
                let sum: u64 = weights
                    .iter()
                    .zip(samples)
                    .map(|(w, p)| w * u64::from(p[c]))
                    .sum();
                out[c] = ((sum + 32_768) >> 16) as u8;
            }
        }
        Some(ai) => {
            let wa: [u64; 4] = std::array::from_fn(|k| weights[k] * u64::from(samples[k][ai]));
            let a_sum: u64 = wa.iter().sum();
            out[ai] = ((a_sum + 32_768) >> 16) as u8;
            for c in (0..bpp).filter(|&c| c != ai) {
                out[c] = if a_sum == 0 {
                    0
                } else {
                    let sum: u64 = wa
                        .iter()
                        .zip(samples)
                        .map(|(w, p)| w * u64::from(p[c]))
                        .sum();
                    ((sum + a_sum / 2) / a_sum) as u8
                };
            }
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/fault.rs"]
mod tests;
