use std::sync::atomic::{AtomicU32, Ordering};

use image::{GrayImage, RgbImage, RgbaImage};

use crate::foundation::{
    core::{PixelFormat, Rect},
    error::{MosaicError, MosaicResult},
};

pub const TILE_WIDTH: u32 = 64;
pub const TILE_HEIGHT: u32 = 64;

const MAX_TILE_BYTES: usize = (TILE_WIDTH * TILE_HEIGHT * 4) as usize;

/// Backing bytes for tiles that were never written.
pub(crate) static EMPTY_TILE: [u8; MAX_TILE_BYTES] = [0; MAX_TILE_BYTES];

/// Fixed-size block of packed pixels. Edge tiles are cropped to the store
/// bounds (`width`/`height` below are the effective extents).
pub struct Tile {
    data: Option<Box<[u8]>>,
    width: u32,
    height: u32,
    bpp: usize,
    ref_count: AtomicU32,
    dirty: bool,
}

impl Tile {
    fn new(width: u32, height: u32, bpp: usize) -> Self {
        Self {
            data: None,
            width,
            height,
            bpp,
            ref_count: AtomicU32::new(0),
            dirty: false,
        }
    }

    fn len(&self) -> usize {
        self.width as usize * self.height as usize * self.bpp
    }

    fn data(&self) -> &[u8] {
        match &self.data {
            Some(d) => d,
            None => &EMPTY_TILE[..self.len()],
        }
    }

    fn data_mut(&mut self) -> &mut [u8] {
        let len = self.len();
        self.data
            .get_or_insert_with(|| vec![0u8; len].into_boxed_slice())
    }
}

impl Clone for Tile {
    fn clone(&self) -> Self {
        Self {
            data: self.data.clone(),
            width: self.width,
            height: self.height,
            bpp: self.bpp,
            ref_count: AtomicU32::new(0),
            dirty: self.dirty,
        }
    }
}

impl std::fmt::Debug for Tile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tile")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("bpp", &self.bpp)
            .field("allocated", &self.data.is_some())
            .field("ref_count", &self.ref_count.load(Ordering::Relaxed))
            .field("dirty", &self.dirty)
            .finish()
    }
}

/// Read checkout of one tile. Dropping the guard releases the tile.
pub struct TileRef<'a> {
    tile: &'a Tile,
    col: u32,
    row: u32,
}

impl<'a> TileRef<'a> {
    fn checkout(tile: &'a Tile, col: u32, row: u32) -> Self {
        tile.ref_count.fetch_add(1, Ordering::AcqRel);
        Self { tile, col, row }
    }

    pub fn col(&self) -> u32 {
        self.col
    }

    pub fn row(&self) -> u32 {
        self.row
    }

    pub fn width(&self) -> u32 {
        self.tile.width
    }

    pub fn height(&self) -> u32 {
        self.tile.height
    }

    pub fn bpp(&self) -> usize {
        self.tile.bpp
    }

    pub fn rowstride(&self) -> usize {
        self.tile.width as usize * self.tile.bpp
    }

    pub fn data(&self) -> &[u8] {
        self.tile.data()
    }

    /// Pixel at tile-local coordinates.
    #[inline]
    pub fn pixel(&self, lx: u32, ly: u32) -> &[u8] {
        let off = ly as usize * self.rowstride() + lx as usize * self.tile.bpp;
        &self.tile.data()[off..off + self.tile.bpp]
    }
}

impl Drop for TileRef<'_> {
    fn drop(&mut self) {
        self.tile.ref_count.fetch_sub(1, Ordering::AcqRel);
    }
}

/// Write checkout of one tile. The tile is marked dirty on release once
/// its bytes were handed out mutably, unless released with `release(false)`.
pub struct TileMut<'a> {
    tile: &'a mut Tile,
    col: u32,
    row: u32,
    written: bool,
}

impl<'a> TileMut<'a> {
    fn checkout(tile: &'a mut Tile, col: u32, row: u32) -> Self {
        tile.ref_count.fetch_add(1, Ordering::AcqRel);
        Self {
            tile,
            col,
            row,
            written: false,
        }
    }

    pub fn col(&self) -> u32 {
        self.col
    }

    pub fn row(&self) -> u32 {
        self.row
    }

    pub fn width(&self) -> u32 {
        self.tile.width
    }

    pub fn height(&self) -> u32 {
        self.tile.height
    }

    pub fn bpp(&self) -> usize {
        self.tile.bpp
    }

    pub fn rowstride(&self) -> usize {
        self.tile.width as usize * self.tile.bpp
    }

    pub fn data(&self) -> &[u8] {
        self.tile.data()
    }

    pub fn data_mut(&mut self) -> &mut [u8] {
        self.written = true;
        self.tile.data_mut()
    }

    /// Explicit release; `mark_dirty = false` keeps the dirty flag untouched.
    pub fn release(mut self, mark_dirty: bool) {
        self.written = mark_dirty;
    }
}

impl Drop for TileMut<'_> {
    fn drop(&mut self) {
        if self.written {
            self.tile.dirty = true;
        }
        self.tile.ref_count.fetch_sub(1, Ordering::AcqRel);
    }
}

/// Image-sized pixel buffer split into `TILE_WIDTH`×`TILE_HEIGHT` tiles.
#[derive(Clone, Debug)]
pub struct TileStore {
    width: u32,
    height: u32,
    format: PixelFormat,
    cols: u32,
    rows: u32,
    tiles: Vec<Tile>,
}

impl TileStore {
    pub fn new(width: u32, height: u32, format: PixelFormat) -> Self {
        let cols = width.div_ceil(TILE_WIDTH);
        let rows = height.div_ceil(TILE_HEIGHT);
        let bpp = format.bytes();
        let mut tiles = Vec::with_capacity((cols * rows) as usize);
        for row in 0..rows {
            for col in 0..cols {
                let tw = TILE_WIDTH.min(width - col * TILE_WIDTH);
                let th = TILE_HEIGHT.min(height - row * TILE_HEIGHT);
                tiles.push(Tile::new(tw, th, bpp));
            }
        }
        Self {
            width,
            height,
            format,
            cols,
            rows,
            tiles,
        }
    }

    /// Store filled from packed row-major pixels of `format`.
    pub fn from_raw(width: u32, height: u32, format: PixelFormat, data: &[u8]) -> MosaicResult<Self> {
        let expected = (width as usize)
            .checked_mul(height as usize)
            .and_then(|v| v.checked_mul(format.bytes()))
            .ok_or_else(|| MosaicError::validation("tile store size overflow"))?;
        if data.len() != expected {
            return Err(MosaicError::validation(format!(
                "expected {expected} bytes for a {width}x{height} {format:?} store, got {}",
                data.len()
            )));
        }
        let mut store = Self::new(width, height, format);
        store.write_rect(store.bounds(), data)?;
        store.take_dirty();
        Ok(store)
    }

    pub fn from_rgba_image(img: &RgbaImage) -> Self {
        Self::from_image_bytes(img.width(), img.height(), PixelFormat::Rgba, img.as_raw())
    }

    pub fn from_rgb_image(img: &RgbImage) -> Self {
        Self::from_image_bytes(img.width(), img.height(), PixelFormat::Rgb, img.as_raw())
    }

    pub fn from_gray_image(img: &GrayImage) -> Self {
        Self::from_image_bytes(img.width(), img.height(), PixelFormat::Gray, img.as_raw())
    }

    fn from_image_bytes(width: u32, height: u32, format: PixelFormat, raw: &[u8]) -> Self {
        let mut store = Self::new(width, height, format);
        if width == 0 {
            return store;
        }
        // The image crate guarantees raw.len() == w * h * channels.
        for (y, line) in raw
            .chunks_exact(width as usize * format.bytes())
            .enumerate()
        {
            store.write_row(0, y as u32, line);
        }
        store.take_dirty();
        store
    }

    /// Flatten an RGBA or GrayA store (gray is expanded) into an `RgbaImage`.
    pub fn to_rgba_image(&self) -> MosaicResult<RgbaImage> {
        let raw = self.read_rect(self.bounds());
        let rgba: Vec<u8> = match self.format {
            PixelFormat::Rgba => raw,
            PixelFormat::GrayA => raw
                .chunks_exact(2)
                .flat_map(|p| [p[0], p[0], p[0], p[1]])
                .collect(),
            PixelFormat::Rgb => raw
                .chunks_exact(3)
                .flat_map(|p| [p[0], p[1], p[2], 255])
                .collect(),
            PixelFormat::Gray => raw.iter().flat_map(|&v| [v, v, v, 255]).collect(),
            PixelFormat::Indexed | PixelFormat::IndexedA => {
                return Err(MosaicError::validation(
                    "indexed stores need a colormap to convert to rgba",
                ));
            }
        };
        RgbaImage::from_raw(self.width, self.height, rgba)
            .ok_or_else(|| MosaicError::validation("rgba buffer does not match store size"))
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn format(&self) -> PixelFormat {
        self.format
    }

    pub fn bpp(&self) -> usize {
        self.format.bytes()
    }

    pub fn cols(&self) -> u32 {
        self.cols
    }

    pub fn rows(&self) -> u32 {
        self.rows
    }

    pub fn bounds(&self) -> Rect {
        Rect::from_size(self.width, self.height)
    }

    #[inline]
    fn index(&self, col: u32, row: u32) -> Option<usize> {
        (col < self.cols && row < self.rows).then(|| (row * self.cols + col) as usize)
    }

    /// Read checkout; `None` for tiles outside the store.
    #[inline]
    pub fn acquire(&self, col: u32, row: u32) -> Option<TileRef<'_>> {
        let idx = self.index(col, row)?;
        Some(TileRef::checkout(&self.tiles[idx], col, row))
    }

    /// Write checkout; `None` for tiles outside the store.
    #[inline]
    pub fn acquire_mut(&mut self, col: u32, row: u32) -> Option<TileMut<'_>> {
        let idx = self.index(col, row)?;
        Some(TileMut::checkout(&mut self.tiles[idx], col, row))
    }

    /// Read checkout of the tile holding pixel (x, y).
    #[inline]
    pub fn acquire_at(&self, x: i32, y: i32) -> Option<TileRef<'_>> {
        let (col, row) = self.tile_coords(x, y)?;
        self.acquire(col, row)
    }

    #[inline]
    pub fn acquire_mut_at(&mut self, x: i32, y: i32) -> Option<TileMut<'_>> {
        let (col, row) = self.tile_coords(x, y)?;
        self.acquire_mut(col, row)
    }

    fn tile_coords(&self, x: i32, y: i32) -> Option<(u32, u32)> {
        if x < 0 || y < 0 || x as u32 >= self.width || y as u32 >= self.height {
            return None;
        }
        Some((x as u32 / TILE_WIDTH, y as u32 / TILE_HEIGHT))
    }

    pub fn ref_count(&self, col: u32, row: u32) -> u32 {
        self.index(col, row)
            .map(|i| self.tiles[i].ref_count.load(Ordering::Acquire))
            .unwrap_or(0)
    }

    /// Sum of reference counts over all tiles; zero when no guard is alive.
    pub fn outstanding_refs(&self) -> u32 {
        self.tiles
            .iter()
            .map(|t| t.ref_count.load(Ordering::Acquire))
            .sum()
    }

    pub fn is_dirty(&self, col: u32, row: u32) -> bool {
        self.index(col, row)
            .map(|i| self.tiles[i].dirty)
            .unwrap_or(false)
    }

    /// Coordinates of dirty tiles; flags are cleared.
    pub fn take_dirty(&mut self) -> Vec<(u32, u32)> {
        let cols = self.cols;
        let mut out = Vec::new();
        for (i, tile) in self.tiles.iter_mut().enumerate() {
            if tile.dirty {
                tile.dirty = false;
                out.push((i as u32 % cols, i as u32 / cols));
            }
        }
        out
    }

    /// Number of tiles that own pixel memory.
    pub fn allocated_tiles(&self) -> usize {
        self.tiles.iter().filter(|t| t.data.is_some()).count()
    }

    /// Copy pixel (x, y) into `out[..bpp]`. Returns false outside the store.
    pub fn read_pixel(&self, x: i32, y: i32, out: &mut [u8]) -> bool {
        let Some(tile) = self.acquire_at(x, y) else {
            return false;
        };
        let px = tile.pixel(x as u32 % TILE_WIDTH, y as u32 % TILE_HEIGHT);
        out[..px.len()].copy_from_slice(px);
        true
    }

    pub fn pixel(&self, x: i32, y: i32) -> Option<Vec<u8>> {
        let mut out = vec![0u8; self.bpp()];
        self.read_pixel(x, y, &mut out).then_some(out)
    }

    pub fn write_pixel(&mut self, x: i32, y: i32, px: &[u8]) -> MosaicResult<()> {
        let bpp = self.bpp();
        if px.len() != bpp {
            return Err(MosaicError::validation(format!(
                "pixel has {} bytes, store expects {bpp}",
                px.len()
            )));
        }
        if let Some(mut tile) = self.acquire_mut_at(x, y) {
            let off = (y as u32 % TILE_HEIGHT) as usize * tile.rowstride()
                + (x as u32 % TILE_WIDTH) as usize * bpp;
            tile.data_mut()[off..off + bpp].copy_from_slice(px);
        }
        Ok(())
    }

    /// Fill `rect` (clipped to the store) with one pixel value.
    pub fn fill_rect(&mut self, rect: Rect, px: &[u8]) -> MosaicResult<()> {
        let bpp = self.bpp();
        if px.len() != bpp {
            return Err(MosaicError::validation(format!(
                "fill pixel has {} bytes, store expects {bpp}",
                px.len()
            )));
        }
        let Some(rect) = rect.intersect(self.bounds()) else {
            return Ok(());
        };
        for (col, row, part) in tile_spans(rect) {
            let Some(mut tile) = self.acquire_mut(col, row) else {
                continue;
            };
            let rowstride = tile.rowstride();
            let lx = (part.x as u32 - col * TILE_WIDTH) as usize;
            let ly = (part.y as u32 - row * TILE_HEIGHT) as usize;
            let data = tile.data_mut();
            for r in 0..part.height as usize {
                let start = (ly + r) * rowstride + lx * bpp;
                let line = &mut data[start..start + part.width as usize * bpp];
                for dst in line.chunks_exact_mut(bpp) {
                    dst.copy_from_slice(px);
                }
            }
        }
        Ok(())
    }

    pub fn fill(&mut self, px: &[u8]) -> MosaicResult<()> {
        self.fill_rect(self.bounds(), px)
    }

    /// Packed copy of `rect`; pixels outside the store read as zero.
    pub fn read_rect(&self, rect: Rect) -> Vec<u8> {
        let bpp = self.bpp();
        let (w, h) = (rect.width.max(0) as usize, rect.height.max(0) as usize);
        let mut out = vec![0u8; w * h * bpp];
        let Some(clip) = rect.intersect(self.bounds()) else {
            return out;
        };
        for (col, row, part) in tile_spans(clip) {
            let Some(tile) = self.acquire(col, row) else {
                continue;
            };
            let lx = (part.x as u32 - col * TILE_WIDTH) as usize;
            let ly = (part.y as u32 - row * TILE_HEIGHT) as usize;
            let len = part.width as usize * bpp;
            for r in 0..part.height as usize {
                let src = (ly + r) * tile.rowstride() + lx * bpp;
                let oy = (part.y - rect.y) as usize + r;
                let ox = (part.x - rect.x) as usize;
                let dst = (oy * w + ox) * bpp;
                out[dst..dst + len].copy_from_slice(&tile.data()[src..src + len]);
            }
        }
        out
    }

    /// Write packed pixels into `rect`; parts outside the store are dropped.
    pub fn write_rect(&mut self, rect: Rect, data: &[u8]) -> MosaicResult<()> {
        rect.validate_non_negative("write rect")?;
        let bpp = self.bpp();
        let w = rect.width as usize;
        if data.len() != w * rect.height as usize * bpp {
            return Err(MosaicError::validation(
                "write_rect expects data matching width*height*bpp",
            ));
        }
        let Some(clip) = rect.intersect(self.bounds()) else {
            return Ok(());
        };
        for (col, row, part) in tile_spans(clip) {
            let Some(mut tile) = self.acquire_mut(col, row) else {
                continue;
            };
            let rowstride = tile.rowstride();
            let lx = (part.x as u32 - col * TILE_WIDTH) as usize;
            let ly = (part.y as u32 - row * TILE_HEIGHT) as usize;
            let len = part.width as usize * bpp;
            let dst_data = tile.data_mut();
            for r in 0..part.height as usize {
                let dst = (ly + r) * rowstride + lx * bpp;
                let sy = (part.y - rect.y) as usize + r;
                let sx = (part.x - rect.x) as usize;
                let src = (sy * w + sx) * bpp;
                dst_data[dst..dst + len].copy_from_slice(&data[src..src + len]);
            }
        }
        Ok(())
    }

    fn write_row(&mut self, x: u32, y: u32, line: &[u8]) {
        let width = (line.len() / self.bpp()) as i32;
        // Length is derived from the line itself, so this cannot fail.
        let _ = self.write_rect(Rect::new(x as i32, y as i32, width, 1), line);
    }
}

/// Split a rectangle (inside non-negative space) into per-tile pieces.
pub(crate) fn tile_spans(rect: Rect) -> impl Iterator<Item = (u32, u32, Rect)> {
    let col0 = rect.x.max(0) as u32 / TILE_WIDTH;
    let row0 = rect.y.max(0) as u32 / TILE_HEIGHT;
    let col1 = (rect.right().max(1) as u32 - 1) / TILE_WIDTH;
    let row1 = (rect.bottom().max(1) as u32 - 1) / TILE_HEIGHT;
    (row0..=row1).flat_map(move |row| {
        (col0..=col1).filter_map(move |col| {
            let tile_rect = Rect::new(
                (col * TILE_WIDTH) as i32,
                (row * TILE_HEIGHT) as i32,
                TILE_WIDTH as i32,
                TILE_HEIGHT as i32,
            );
            tile_rect.intersect(rect).map(|part| (col, row, part))
        })
    })
}

#[cfg(test)]
#[path = "../../tests/unit/tile/store.rs"]
mod tests;
