//! Region-level pixel kernels used by the projection compositor.
//!
//! All kernels work in straight (non-premultiplied) alpha with 8-bit integer
//! arithmetic. Destinations are projection stores (`Rgba` or `GrayA`) except
//! for [`blend_onto_layer`], which writes into a layer of any format.

use smallvec::SmallVec;

use crate::{
    foundation::{
        core::{ImageBaseType, PixelFormat},
        error::MosaicResult,
        math::{luminance, mul_div255, mul3_div255, pixel_noise},
    },
    model::Colormap,
    paint::modes::BlendMode,
    tile::region::{PixelRegion, PixelRegionMut, process_regions},
};

/// Per-layer parameters for [`initial_region`] and [`combine_regions`].
#[derive(Clone, Copy, Debug)]
pub struct OpParams<'a> {
    pub opacity: u8,
    pub mode: BlendMode,
    pub colormap: Option<&'a Colormap>,
}

/// Which side of a channel is painted with its color.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelPolarity {
    /// Paint where the channel value is high.
    #[default]
    Selection,
    /// Paint where the channel value is low.
    Masked,
}

impl ChannelPolarity {
    #[inline]
    fn coverage(self, v: u8) -> u8 {
        match self {
            ChannelPolarity::Selection => v,
            ChannelPolarity::Masked => 255 - v,
        }
    }
}

#[inline]
fn fetch(format: PixelFormat, px: &[u8], colormap: Option<&Colormap>) -> ([u8; 3], u8) {
    let lookup = |i: u8| colormap.map_or([i, i, i], |c| c.get(i));
    match format {
        PixelFormat::Rgb => ([px[0], px[1], px[2]], 255),
        PixelFormat::Rgba => ([px[0], px[1], px[2]], px[3]),
        PixelFormat::Gray => ([px[0]; 3], 255),
        PixelFormat::GrayA => ([px[0]; 3], px[1]),
        PixelFormat::Indexed => (lookup(px[0]), 255),
        PixelFormat::IndexedA => (lookup(px[0]), px[1]),
    }
}

#[inline]
fn dissolve(alpha: u8, x: i32, y: i32) -> u8 {
    if pixel_noise(x, y) % 255 < alpha { 255 } else { 0 }
}

#[inline]
fn threshold(alpha: u8) -> u8 {
    if alpha > 127 { 255 } else { 0 }
}

/// Color part of a projection pixel widened to three channels.
#[inline]
fn base_color(px: &[u8], n: usize) -> [u8; 3] {
    if n >= 3 {
        [px[0], px[1], px[2]]
    } else {
        [px[0]; 3]
    }
}

/// Straight-alpha "over" of `color`/`la` onto a projection pixel.
#[inline]
fn over(base: &mut [u8], n: usize, color: [u8; 3], la: u8) {
    let ba = base[n];
    let na = ba + mul_div255(255 - ba, la);
    if na == 0 {
        return;
    }
    let (la, na32) = (u32::from(la), u32::from(na));
    let rest = na32.saturating_sub(la);
    for c in 0..n {
        let v = (u32::from(color[c]) * la + u32::from(base[c]) * rest + na32 / 2) / na32;
        base[c] = v.min(255) as u8;
    }
    base[n] = na;
}

fn with_mask<'r, 'a>(
    src: &'r PixelRegion<'a>,
    mask: Option<&'r PixelRegion<'a>>,
) -> SmallVec<[&'r PixelRegion<'a>; 2]> {
    let mut srcs: SmallVec<[&PixelRegion<'a>; 2]> = SmallVec::new();
    srcs.push(src);
    if let Some(m) = mask {
        srcs.push(m);
    }
    srcs
}

/// Fill `dest` with zeros.
pub fn clear(dest: &mut PixelRegionMut<'_>) -> MosaicResult<()> {
    process_regions(dest, &[], |out, _| {
        for r in 0..out.height {
            out.row_mut(r).fill(0);
        }
    })
}

/// First (bottom-most) contribution to a projection region.
pub fn initial_region(
    dest: &mut PixelRegionMut<'_>,
    src: &PixelRegion<'_>,
    mask: Option<&PixelRegion<'_>>,
    params: &OpParams<'_>,
) -> MosaicResult<()> {
    let src_format = src.format();
    let dbpp = dest.format().bytes();
    let n = dbpp - 1;
    let sbpp = src_format.bytes();
    let srcs = with_mask(src, mask);
    process_regions(dest, &srcs, |out, ins| {
        let (x0, y0) = (out.x, out.y);
        for r in 0..out.height {
            let lrow = ins[0].row(r);
            let mrow = ins.get(1).map(|m| m.row(r));
            let y = y0 + r as i32;
            let drow = out.row_mut(r);
            for (i, px) in drow.chunks_exact_mut(dbpp).enumerate() {
                let (color, raw) = fetch(src_format, &lrow[i * sbpp..], params.colormap);
                let m = mrow.map_or(255, |m| m[i]);
                let a = match src_format {
                    PixelFormat::Indexed => 255,
                    PixelFormat::IndexedA => threshold(mul3_div255(raw, m, params.opacity)),
                    _ => {
                        let a = mul3_div255(raw, params.opacity, m);
                        if params.mode == BlendMode::Dissolve {
                            dissolve(a, x0 + i as i32, y)
                        } else {
                            a
                        }
                    }
                };
                write_color(px, n, color);
                px[n] = a;
            }
        }
    })
}

#[inline]
fn write_color(px: &mut [u8], n: usize, color: [u8; 3]) {
    if n >= 3 {
        px[..3].copy_from_slice(&color);
    } else {
        px[0] = color[0];
    }
}

/// Blend a layer region over the projection region already in `dest`.
pub fn combine_regions(
    dest: &mut PixelRegionMut<'_>,
    src: &PixelRegion<'_>,
    mask: Option<&PixelRegion<'_>>,
    params: &OpParams<'_>,
) -> MosaicResult<()> {
    let src_format = src.format();
    if src_format == PixelFormat::Indexed {
        tracing::warn!("combine onto an indexed layer without alpha is not supported; skipping");
        return Ok(());
    }
    let dbpp = dest.format().bytes();
    let n = dbpp - 1;
    let sbpp = src_format.bytes();
    let srcs = with_mask(src, mask);
    process_regions(dest, &srcs, |out, ins| {
        let (x0, y0) = (out.x, out.y);
        for r in 0..out.height {
            let lrow = ins[0].row(r);
            let mrow = ins.get(1).map(|m| m.row(r));
            let y = y0 + r as i32;
            let drow = out.row_mut(r);
            for (i, px) in drow.chunks_exact_mut(dbpp).enumerate() {
                let (color, raw) = fetch(src_format, &lrow[i * sbpp..], params.colormap);
                let m = mrow.map_or(255, |m| m[i]);
                if src_format == PixelFormat::IndexedA {
                    if threshold(mul3_div255(raw, m, params.opacity)) == 255 {
                        write_color(px, n, color);
                        px[n] = 255;
                    }
                    continue;
                }
                let raw = if params.mode.limits_to_base_alpha() {
                    raw.min(px[n])
                } else {
                    raw
                };
                let mut la = mul3_div255(raw, params.opacity, m);
                if params.mode == BlendMode::Dissolve {
                    la = dissolve(la, x0 + i as i32, y);
                }
                let blended = params.mode.apply(base_color(px, n), color, n);
                over(px, n, blended, la);
            }
        }
    })
}

/// Channel color written for a projection with `n` color channels.
#[inline]
fn channel_color(color: [u8; 3], n: usize) -> [u8; 3] {
    if n >= 3 {
        color
    } else {
        [luminance(color); 3]
    }
}

/// First contribution when a channel is the bottom of the stack.
pub fn initial_channel(
    dest: &mut PixelRegionMut<'_>,
    channel: &PixelRegion<'_>,
    color: [u8; 3],
    opacity: u8,
    polarity: ChannelPolarity,
) -> MosaicResult<()> {
    let dbpp = dest.format().bytes();
    let n = dbpp - 1;
    let color = channel_color(color, n);
    process_regions(dest, &[channel], |out, ins| {
        for r in 0..out.height {
            let crow = ins[0].row(r);
            for (px, &v) in out.row_mut(r).chunks_exact_mut(dbpp).zip(crow) {
                write_color(px, n, color);
                px[n] = mul_div255(polarity.coverage(v), opacity);
            }
        }
    })
}

/// Tint the projection with a channel's color where it is visible.
pub fn combine_channel(
    dest: &mut PixelRegionMut<'_>,
    channel: &PixelRegion<'_>,
    color: [u8; 3],
    opacity: u8,
    polarity: ChannelPolarity,
) -> MosaicResult<()> {
    let dbpp = dest.format().bytes();
    let n = dbpp - 1;
    let color = channel_color(color, n);
    process_regions(dest, &[channel], |out, ins| {
        for r in 0..out.height {
            let crow = ins[0].row(r);
            for (px, &v) in out.row_mut(r).chunks_exact_mut(dbpp).zip(crow) {
                let mut ca = mul_div255(polarity.coverage(v), opacity);
                let a = px[n];
                let na = a + mul_div255(255 - a, ca);
                if na != 0 && na != 255 {
                    ca = ((u32::from(ca) * 255) / u32::from(na)).min(255) as u8;
                }
                for c in 0..n {
                    px[c] = mul_div255(color[c], ca).saturating_add(mul_div255(px[c], 255 - ca));
                }
                px[n] = na;
            }
        }
    })
}

/// Show-mask path: mask values as opaque gray.
pub fn copy_gray(dest: &mut PixelRegionMut<'_>, mask: &PixelRegion<'_>) -> MosaicResult<()> {
    let dbpp = dest.format().bytes();
    let n = dbpp - 1;
    process_regions(dest, &[mask], |out, ins| {
        for r in 0..out.height {
            let mrow = ins[0].row(r);
            for (px, &v) in out.row_mut(r).chunks_exact_mut(dbpp).zip(mrow) {
                px[..n].fill(v);
                px[n] = 255;
            }
        }
    })
}

/// Normal-mode merge of one layer region into another of the same base type.
/// Indexed destinations take the source index where its alpha exceeds half.
pub fn blend_onto_layer(
    dest: &mut PixelRegionMut<'_>,
    src: &PixelRegion<'_>,
    opacity: u8,
) -> MosaicResult<()> {
    let dest_format = dest.format();
    let src_format = src.format();
    let dbpp = dest_format.bytes();
    let sbpp = src_format.bytes();
    let n = dbpp - usize::from(dest_format.has_alpha());
    process_regions(dest, &[src], |out, ins| {
        for r in 0..out.height {
            let srow = ins[0].row(r);
            for (px, s) in out
                .row_mut(r)
                .chunks_exact_mut(dbpp)
                .zip(srow.chunks_exact(sbpp))
            {
                let raw = src_format.alpha_index().map_or(255, |i| s[i]);
                let sa = mul_div255(raw, opacity);
                if dest_format.base_type() == ImageBaseType::Indexed {
                    if threshold(sa) == 255 {
                        px[0] = s[0];
                        if dest_format.has_alpha() {
                            px[1] = 255;
                        }
                    }
                    continue;
                }
                if dest_format.has_alpha() {
                    over(px, n, base_color(s, n), sa);
                } else {
                    let (sa, inv) = (u32::from(sa), 255 - u32::from(sa));
                    for c in 0..n {
                        px[c] = ((u32::from(s[c]) * sa + u32::from(px[c]) * inv + 127) / 255) as u8;
                    }
                }
            }
        }
    })
}

#[cfg(test)]
#[path = "../../tests/unit/paint/ops.rs"]
mod tests;
