use smallvec::SmallVec;

use crate::{
    foundation::{
        core::{PixelFormat, Rect},
        error::{MosaicError, MosaicResult},
    },
    tile::store::{EMPTY_TILE, TILE_HEIGHT, TILE_WIDTH, TileMut, TileRef, TileStore},
};

/// Read-only rectangular window into a tile store, clipped to its bounds.
#[derive(Clone, Copy, Debug)]
pub struct PixelRegion<'a> {
    store: &'a TileStore,
    rect: Rect,
}

impl<'a> PixelRegion<'a> {
    pub fn new(store: &'a TileStore, rect: Rect) -> Self {
        Self {
            store,
            rect: clip(store, rect),
        }
    }

    pub fn rect(&self) -> Rect {
        self.rect
    }

    pub fn format(&self) -> PixelFormat {
        self.store.format()
    }

    pub fn store(&self) -> &'a TileStore {
        self.store
    }
}

/// Writable window. With `dirty = false` the touched tiles keep their
/// dirty flags.
#[derive(Debug)]
pub struct PixelRegionMut<'a> {
    store: &'a mut TileStore,
    rect: Rect,
    dirty: bool,
}

impl<'a> PixelRegionMut<'a> {
    pub fn new(store: &'a mut TileStore, rect: Rect, dirty: bool) -> Self {
        let rect = clip(store, rect);
        Self { store, rect, dirty }
    }

    pub fn rect(&self) -> Rect {
        self.rect
    }

    pub fn format(&self) -> PixelFormat {
        self.store.format()
    }
}

fn clip(store: &TileStore, rect: Rect) -> Rect {
    rect.intersect(store.bounds())
        .unwrap_or(Rect::new(rect.x, rect.y, 0, 0))
}

/// Tile-contained piece of a source region handed to the processing callback.
#[derive(Clone, Copy, Debug)]
pub struct Portion<'t> {
    data: &'t [u8],
    rowstride: usize,
    pub bpp: usize,
    pub x: i32,
    pub y: i32,
    pub width: usize,
    pub height: usize,
}

impl<'t> Portion<'t> {
    fn in_tile(tile: &'t TileRef<'_>, x: i32, y: i32, width: usize, height: usize) -> Self {
        let bpp = tile.bpp();
        let rowstride = tile.rowstride();
        let off = (y as u32 % TILE_HEIGHT) as usize * rowstride + (x as u32 % TILE_WIDTH) as usize * bpp;
        Self {
            data: &tile.data()[off..],
            rowstride,
            bpp,
            x,
            y,
            width,
            height,
        }
    }

    fn transparent(bpp: usize, x: i32, y: i32, width: usize, height: usize) -> Self {
        Self {
            data: &EMPTY_TILE[..],
            rowstride: width * bpp,
            bpp,
            x,
            y,
            width,
            height,
        }
    }

    #[inline]
    pub fn row(&self, i: usize) -> &'t [u8] {
        let start = i * self.rowstride;
        &self.data[start..start + self.width * self.bpp]
    }

    pub fn rowstride(&self) -> usize {
        self.rowstride
    }
}

/// Destination piece; rows are disjoint slices of one tile.
#[derive(Debug)]
pub struct PortionMut<'t> {
    data: &'t mut [u8],
    rowstride: usize,
    pub bpp: usize,
    pub x: i32,
    pub y: i32,
    pub width: usize,
    pub height: usize,
}

impl<'t> PortionMut<'t> {
    fn in_tile(tile: &'t mut TileMut<'_>, x: i32, y: i32, width: usize, height: usize) -> Self {
        let bpp = tile.bpp();
        let rowstride = tile.rowstride();
        let off = (y as u32 % TILE_HEIGHT) as usize * rowstride + (x as u32 % TILE_WIDTH) as usize * bpp;
        Self {
            data: &mut tile.data_mut()[off..],
            rowstride,
            bpp,
            x,
            y,
            width,
            height,
        }
    }

    #[inline]
    pub fn row(&self, i: usize) -> &[u8] {
        let start = i * self.rowstride;
        &self.data[start..start + self.width * self.bpp]
    }

    #[inline]
    pub fn row_mut(&mut self, i: usize) -> &mut [u8] {
        let start = i * self.rowstride;
        &mut self.data[start..start + self.width * self.bpp]
    }
}

/// Distance from `v` to the next tile boundary along an axis of `tile` pixels.
#[inline]
fn to_boundary(v: i32, tile: u32) -> i32 {
    tile as i32 - v.rem_euclid(tile as i32)
}

/// Walk `dest` and `srcs` in lock-step, handing the callback pieces that each
/// lie inside a single tile of every participating store.
///
/// All regions must have the same width and height. Piece heights depend only
/// on the row offset and piece widths only on the column offset, so every
/// callback sees congruent portions. Tiles are checked out for the duration of
/// one callback and released afterwards.
pub fn process_regions<F>(
    dest: &mut PixelRegionMut<'_>,
    srcs: &[&PixelRegion<'_>],
    mut f: F,
) -> MosaicResult<()>
where
    F: FnMut(&mut PortionMut<'_>, &[Portion<'_>]),
{
    let (w, h) = (dest.rect.width, dest.rect.height);
    for (i, src) in srcs.iter().enumerate() {
        if src.rect.width != w || src.rect.height != h {
            return Err(MosaicError::validation(format!(
                "source region {i} is {}x{}, destination is {w}x{h}",
                src.rect.width, src.rect.height
            )));
        }
    }
    if w <= 0 || h <= 0 {
        return Ok(());
    }

    let origins: SmallVec<[(i32, i32); 4]> = srcs
        .iter()
        .map(|r| (r.rect.x, r.rect.y))
        .chain(std::iter::once((dest.rect.x, dest.rect.y)))
        .collect();

    let mut oy = 0;
    while oy < h {
        let band = origins
            .iter()
            .map(|&(_, y)| to_boundary(y + oy, TILE_HEIGHT))
            .fold(h - oy, i32::min);
        let mut ox = 0;
        while ox < w {
            let span = origins
                .iter()
                .map(|&(x, _)| to_boundary(x + ox, TILE_WIDTH))
                .fold(w - ox, i32::min);

            let guards: SmallVec<[Option<TileRef<'_>>; 4]> = srcs
                .iter()
                .map(|r| r.store.acquire_at(r.rect.x + ox, r.rect.y + oy))
                .collect();
            let portions: SmallVec<[Portion<'_>; 4]> = guards
                .iter()
                .zip(srcs.iter())
                .map(|(g, r)| {
                    let (px, py) = (r.rect.x + ox, r.rect.y + oy);
                    match g {
                        Some(tile) => Portion::in_tile(tile, px, py, span as usize, band as usize),
                        None => Portion::transparent(r.store.bpp(), px, py, span as usize, band as usize),
                    }
                })
                .collect();

            let (dx, dy) = (dest.rect.x + ox, dest.rect.y + oy);
            let mark_dirty = dest.dirty;
            if let Some(mut tile) = dest.store.acquire_mut_at(dx, dy) {
                {
                    let mut out = PortionMut::in_tile(&mut tile, dx, dy, span as usize, band as usize);
                    f(&mut out, &portions);
                }
                tile.release(mark_dirty);
            }
            ox += span;
        }
        oy += band;
    }
    Ok(())
}

#[cfg(test)]
#[path = "../../tests/unit/tile/region.rs"]
mod tests;
