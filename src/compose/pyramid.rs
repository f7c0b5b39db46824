use crate::{
    foundation::{
        core::{PixelFormat, Rect},
        error::MosaicResult,
    },
    tile::store::{TILE_HEIGHT, TILE_WIDTH, TileStore},
};

/// Level 0 at full size plus successively halved levels, stopping once a
/// level fits into a single tile.
pub(crate) fn build_levels(width: u32, height: u32, format: PixelFormat) -> Vec<TileStore> {
    let mut levels = vec![TileStore::new(width, height, format)];
    let (mut w, mut h) = (width, height);
    while w > TILE_WIDTH || h > TILE_HEIGHT {
        w = w.div_ceil(2).max(1);
        h = h.div_ceil(2).max(1);
        levels.push(TileStore::new(w, h, format));
    }
    levels
}

/// Pick the coarsest level that still has at least one source pixel per
/// output pixel. Returns the level and the scales to apply to it.
pub(crate) fn level_for_scale(level_count: usize, scale_x: f64, scale_y: f64) -> (usize, f64, f64) {
    let (mut level, mut sx, mut sy) = (0, scale_x, scale_y);
    while sx.max(sy) <= 0.5 && level + 1 < level_count {
        sx *= 2.0;
        sy *= 2.0;
        level += 1;
    }
    (level, sx, sy)
}

/// Recompute the parts of levels 1.. that depend on `rect` (level-0 space).
pub(crate) fn update_levels(levels: &mut [TileStore], rect: Rect) -> MosaicResult<()> {
    let mut rect = rect;
    for n in 1..levels.len() {
        let (lower, upper) = levels.split_at_mut(n);
        let src = &lower[n - 1];
        let dst = &mut upper[0];
        let x0 = rect.x.max(0) / 2;
        let y0 = rect.y.max(0) / 2;
        let x1 = (rect.right().max(0) + 1) / 2;
        let y1 = (rect.bottom().max(0) + 1) / 2;
        let Some(next) = Rect::new(x0, y0, x1 - x0, y1 - y0).intersect(dst.bounds()) else {
            return Ok(());
        };
        reduce(src, dst, next)?;
        rect = next;
    }
    Ok(())
}

/// 2×2 box filter of `src` into `area` of `dst`. Colors are weighted by
/// alpha; samples past the source edge are left out.
fn reduce(src: &TileStore, dst: &mut TileStore, area: Rect) -> MosaicResult<()> {
    let format = src.format();
    let bpp = format.bytes();
    let alpha = format.alpha_index();
    let n = bpp - usize::from(alpha.is_some());
    let src_rect = Rect::new(area.x * 2, area.y * 2, area.width * 2, area.height * 2);
    let block = src.read_rect(src_rect);
    let sw = src_rect.width as usize;
    let mut out = vec![0u8; area.width as usize * area.height as usize * bpp];

    for oy in 0..area.height as usize {
        for ox in 0..area.width as usize {
            let mut sums = [0u32; 4];
            let mut a_sum = 0u32;
            let mut count = 0u32;
            for (dx, dy) in [(0, 0), (1, 0), (0, 1), (1, 1)] {
                let (sx, sy) = (ox * 2 + dx, oy * 2 + dy);
                if src_rect.x as usize + sx >= src.width() as usize
                    || src_rect.y as usize + sy >= src.height() as usize
                {
                    continue;
                }
                let px = &block[(sy * sw + sx) * bpp..][..bpp];
                let w = alpha.map_or(1, |i| u32::from(px[i]));
                for c in 0..n {
                    sums[c] += u32::from(px[c]) * w;
                }
                a_sum += w;
                count += 1;
            }
            let dst_px = &mut out[(oy * area.width as usize + ox) * bpp..][..bpp];
            if count == 0 {
                continue;
            }
            if a_sum > 0 {
                for c in 0..n {
                    dst_px[c] = ((sums[c] + a_sum / 2) / a_sum) as u8;
                }
            }
            if let Some(i) = alpha {
                dst_px[i] = ((a_sum + count / 2) / count) as u8;
            }
        }
    }
    dst.write_rect(area, &out)
}

#[cfg(test)]
#[path = "../../tests/unit/compose/pyramid.rs"]
mod tests;
