use crate::foundation::math::{clamp_u8, mul_div255};

/// Layer combination mode. Serialized names are stable.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlendMode {
    #[default]
    Normal,
    Dissolve,
    Multiply,
    Screen,
    Overlay,
    Difference,
    Addition,
    Subtract,
    DarkenOnly,
    LightenOnly,
    Hue,
    Saturation,
    Color,
    Value,
    Divide,
    Dodge,
    Burn,
    HardLight,
    SoftLight,
    GrainExtract,
    GrainMerge,
}

impl BlendMode {
    /// Normal and Dissolve use the layer alpha as is; every other mode is
    /// limited to where the base already has coverage.
    pub fn limits_to_base_alpha(self) -> bool {
        !matches!(self, BlendMode::Normal | BlendMode::Dissolve)
    }

    fn is_hsv(self) -> bool {
        matches!(
            self,
            BlendMode::Hue | BlendMode::Saturation | BlendMode::Color | BlendMode::Value
        )
    }

    /// Blended color of `layer` over `base`, before alpha is applied. Only
    /// the first `n` channels are meaningful (1 for gray, 3 for rgb).
    pub fn apply(self, base: [u8; 3], layer: [u8; 3], n: usize) -> [u8; 3] {
        if self.is_hsv() {
            // Hue-based modes have no meaning on a single channel.
            if n < 3 {
                return base;
            }
            return self.apply_hsv(base, layer);
        }
        let mut out = base;
        for c in 0..n.min(3) {
            out[c] = self.apply_channel(base[c], layer[c]);
        }
        out
    }

    fn apply_channel(self, a: u8, b: u8) -> u8 {
        let (ai, bi) = (i32::from(a), i32::from(b));
        match self {
            BlendMode::Normal | BlendMode::Dissolve => b,
            BlendMode::Multiply => mul_div255(a, b),
            BlendMode::Screen => 255 - mul_div255(255 - a, 255 - b),
            BlendMode::Overlay => {
                if a < 128 {
                    clamp_u8((2 * ai * bi + 127) / 255)
                } else {
                    clamp_u8(255 - (2 * (255 - ai) * (255 - bi) + 127) / 255)
                }
            }
            BlendMode::Difference => a.abs_diff(b),
            BlendMode::Addition => a.saturating_add(b),
            BlendMode::Subtract => a.saturating_sub(b),
            BlendMode::DarkenOnly => a.min(b),
            BlendMode::LightenOnly => a.max(b),
            BlendMode::Divide => clamp_u8((ai * 256) / (bi + 1)),
            BlendMode::Dodge => clamp_u8((ai * 256) / (256 - bi)),
            BlendMode::Burn => clamp_u8(255 - ((255 - ai) * 256) / (bi + 1)),
            BlendMode::HardLight => {
                if b > 128 {
                    let t = (255 - ai) * (255 - ((bi - 128) << 1));
                    clamp_u8(255 - (t >> 8))
                } else {
                    clamp_u8((ai * (bi << 1)) >> 8)
                }
            }
            BlendMode::SoftLight => {
                let m = mul_div255(a, b);
                let s = 255 - mul_div255(255 - a, 255 - b);
                mul_div255(255 - a, m).saturating_add(mul_div255(a, s))
            }
            BlendMode::GrainExtract => clamp_u8(ai - bi + 128),
            BlendMode::GrainMerge => clamp_u8(ai + bi - 128),
            BlendMode::Hue | BlendMode::Saturation | BlendMode::Color | BlendMode::Value => a,
        }
    }

    fn apply_hsv(self, base: [u8; 3], layer: [u8; 3]) -> [u8; 3] {
        match self {
            BlendMode::Color => {
                let (_, _, l) = rgb_to_hsl(base);
                let (h, s, _) = rgb_to_hsl(layer);
                hsl_to_rgb(h, s, l)
            }
            _ => {
                let (mut h, mut s, mut v) = rgb_to_hsv(base);
                let (lh, ls, lv) = rgb_to_hsv(layer);
                match self {
                    BlendMode::Hue => {
                        // Achromatic layers carry no hue.
                        if ls > 0.0 {
                            h = lh;
                        }
                    }
                    BlendMode::Saturation => s = ls,
                    BlendMode::Value => v = lv,
                    _ => {}
                }
                hsv_to_rgb(h, s, v)
            }
        }
    }
}

/// Hue in degrees `[0, 360)`, saturation and value in `[0, 1]`.
fn rgb_to_hsv(rgb: [u8; 3]) -> (f32, f32, f32) {
    let [r, g, b] = rgb.map(|c| f32::from(c) / 255.0);
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let delta = max - min;
    let s = if max > 0.0 { delta / max } else { 0.0 };
    (hue_of(r, g, b, max, delta), s, max)
}

fn hsv_to_rgb(h: f32, s: f32, v: f32) -> [u8; 3] {
    if s <= 0.0 {
        let c = to_u8(v);
        return [c, c, c];
    }
    let c = v * s;
    let (r, g, b) = hue_sector(h, c);
    let m = v - c;
    [to_u8(r + m), to_u8(g + m), to_u8(b + m)]
}

/// Hue in degrees, saturation and lightness in `[0, 1]`.
fn rgb_to_hsl(rgb: [u8; 3]) -> (f32, f32, f32) {
    let [r, g, b] = rgb.map(|c| f32::from(c) / 255.0);
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let delta = max - min;
    let l = (max + min) / 2.0;
    let s = if delta <= 0.0 {
        0.0
    } else {
        delta / (1.0 - (2.0 * l - 1.0).abs())
    };
    (hue_of(r, g, b, max, delta), s.clamp(0.0, 1.0), l)
}

fn hsl_to_rgb(h: f32, s: f32, l: f32) -> [u8; 3] {
    let c = (1.0 - (2.0 * l - 1.0).abs()) * s;
    let (r, g, b) = hue_sector(h, c);
    let m = l - c / 2.0;
    [to_u8(r + m), to_u8(g + m), to_u8(b + m)]
}

fn hue_of(r: f32, g: f32, b: f32, max: f32, delta: f32) -> f32 {
    if delta <= 0.0 {
        return 0.0;
    }
    let h = if max == r {
        60.0 * ((g - b) / delta)
    } else if max == g {
        60.0 * ((b - r) / delta) + 120.0
    } else {
        60.0 * ((r - g) / delta) + 240.0
    };
    h.rem_euclid(360.0)
}

fn hue_sector(h: f32, c: f32) -> (f32, f32, f32) {
    let hp = h.rem_euclid(360.0) / 60.0;
    let x = c * (1.0 - (hp % 2.0 - 1.0).abs());
    match hp as u32 {
        0 => (c, x, 0.0),
        1 => (x, c, 0.0),
        2 => (0.0, c, x),
        3 => (0.0, x, c),
        4 => (x, 0.0, c),
        _ => (c, 0.0, x),
    }
}

fn to_u8(v: f32) -> u8 {
    (v * 255.0).round().clamp(0.0, 255.0) as u8
}

#[cfg(test)]
#[path = "../../tests/unit/paint/modes.rs"]
mod tests;
