#[derive(Clone, Copy, Debug)]
pub(crate) struct Fnv1a64(u64);

impl Fnv1a64 {
    const OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0000_0100_0000_01B3;

    pub(crate) fn new_default() -> Self {
        Self(Self::OFFSET_BASIS)
    }

    pub(crate) fn write_u32(&mut self, v: u32) {
        self.write_bytes(&v.to_le_bytes());
    }

    pub(crate) fn write_bytes(&mut self, bytes: &[u8]) {
        let mut h = self.0;
        for &b in bytes {
            h ^= u64::from(b);
            h = h.wrapping_mul(Self::PRIME);
        }
        self.0 = h;
    }

    pub(crate) fn finish(self) -> u64 {
        self.0
    }
}

/// Rounded `x * y / 255` for 8-bit operands.
#[inline]
pub(crate) fn mul_div255(x: u8, y: u8) -> u8 {
    (((u32::from(x) * u32::from(y)) + 127) / 255) as u8
}

/// Rounded `x * y * z / 255²` for 8-bit operands.
#[inline]
pub(crate) fn mul3_div255(x: u8, y: u8, z: u8) -> u8 {
    (((u32::from(x) * u32::from(y) * u32::from(z)) + 32_512) / 65_025) as u8
}

/// Scalar opacity in `0..=1` to the 8-bit scale used by the compositing kernels.
pub fn opacity_to_u8(opacity: f64) -> u8 {
    if !opacity.is_finite() {
        return 0;
    }
    let scaled = (opacity.clamp(0.0, 1.0) * 255.999).round();
    scaled.min(255.0) as u8
}

/// Deterministic per-pixel noise byte, stable across composite calls.
pub(crate) fn pixel_noise(x: i32, y: i32) -> u8 {
    let mut h = Fnv1a64::new_default();
    h.write_u32(x as u32);
    h.write_u32(y as u32);
    (h.finish() >> 56) as u8
}

/// Integer luma with 0.30/0.59/0.11 weights.
#[inline]
pub(crate) fn luminance(rgb: [u8; 3]) -> u8 {
    let [r, g, b] = rgb.map(u32::from);
    ((r * 77 + g * 151 + b * 28 + 128) >> 8) as u8
}

#[inline]
pub(crate) fn clamp_u8(v: i32) -> u8 {
    v.clamp(0, 255) as u8
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/math.rs"]
mod tests;
