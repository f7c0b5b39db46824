//! Lookup tables for the checkerboard and opacity stages of the renderer.

/// Checkerboard cell size.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckSize {
    Small,
    #[default]
    Medium,
    Large,
}

impl CheckSize {
    /// `(mask, shift)`: cells are `mask + 1 == 1 << shift` pixels wide.
    pub fn mask_shift(self) -> (i32, u32) {
        match self {
            CheckSize::Small => (0x3, 2),
            CheckSize::Medium => (0x7, 3),
            CheckSize::Large => (0xf, 4),
        }
    }

    pub(crate) fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "small" => Some(CheckSize::Small),
            "medium" => Some(CheckSize::Medium),
            "large" => Some(CheckSize::Large),
            _ => None,
        }
    }
}

/// Checkerboard color scheme.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckType {
    LightChecks,
    #[default]
    GrayChecks,
    DarkChecks,
    WhiteOnly,
    GrayOnly,
    BlackOnly,
}

impl CheckType {
    /// `(dark, light)` cell values.
    pub fn colors(self) -> (u8, u8) {
        match self {
            CheckType::LightChecks => (204, 255),
            CheckType::GrayChecks => (102, 153),
            CheckType::DarkChecks => (0, 51),
            CheckType::WhiteOnly => (255, 255),
            CheckType::GrayOnly => (127, 127),
            CheckType::BlackOnly => (0, 0),
        }
    }

    pub(crate) fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "light" => Some(CheckType::LightChecks),
            "gray" => Some(CheckType::GrayChecks),
            "dark" => Some(CheckType::DarkChecks),
            "white" => Some(CheckType::WhiteOnly),
            "gray-only" => Some(CheckType::GrayOnly),
            "black" => Some(CheckType::BlackOnly),
            _ => None,
        }
    }
}

const TABLE_LEN: usize = 256 * 256;

/// Precomputed `sample over check` blends for both checkerboard phases,
/// keyed by `(alpha << 8) | sample`.
#[derive(Clone)]
pub struct CheckTables {
    light: Box<[u8]>,
    dark: Box<[u8]>,
}

impl CheckTables {
    pub fn new(check_type: CheckType, transparency_indicator: bool) -> Self {
        let (dark, light) = check_type.colors();
        let dark = if transparency_indicator { dark } else { light };
        Self {
            light: build_table(light),
            dark: build_table(dark),
        }
    }

    #[inline]
    pub fn blend(&self, dark_phase: bool, alpha: u8, sample: u8) -> u8 {
        self.blend_key(dark_phase, (usize::from(alpha) << 8) | usize::from(sample))
    }

    #[inline]
    pub(crate) fn blend_key(&self, dark_phase: bool, key: usize) -> u8 {
        if dark_phase {
            self.dark[key]
        } else {
            self.light[key]
        }
    }
}

impl std::fmt::Debug for CheckTables {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CheckTables")
            .field("light_zero", &self.light[0])
            .field("dark_zero", &self.dark[0])
            .finish()
    }
}

fn build_table(check: u8) -> Box<[u8]> {
    let check = u32::from(check);
    let mut table = vec![0u8; TABLE_LEN];
    for alpha in 0..256u32 {
        for sample in 0..256u32 {
            let v = (sample * alpha + check * (255 - alpha)) / 255;
            table[((alpha << 8) | sample) as usize] = v as u8;
        }
    }
    table.into_boxed_slice()
}

/// Opacity multiplier: `mult[a] >> 8` is the alpha after scaling by the
/// source opacity, pre-shifted to form a [`CheckTables`] key.
#[derive(Clone, Debug)]
pub struct AlphaTable {
    scale: u8,
    mult: [u32; 256],
}

impl AlphaTable {
    pub fn new(scale: u8) -> Self {
        let mut table = Self {
            scale,
            mult: [0; 256],
        };
        table.rebuild();
        table
    }

    pub fn scale(&self) -> u8 {
        self.scale
    }

    /// Rebuild for a new opacity scale; returns false when nothing changed.
    pub fn update(&mut self, scale: u8) -> bool {
        if scale == self.scale {
            return false;
        }
        self.scale = scale;
        self.rebuild();
        tracing::trace!(scale, "alpha table rebuilt");
        true
    }

    fn rebuild(&mut self) {
        let scale = u32::from(self.scale);
        for (i, m) in self.mult.iter_mut().enumerate() {
            *m = ((scale * i as u32) / 255) << 8;
        }
    }

    #[inline]
    pub fn key(&self, alpha: u8) -> usize {
        self.mult[usize::from(alpha)] as usize
    }

    #[inline]
    pub fn apply(&self, alpha: u8) -> u8 {
        (self.mult[usize::from(alpha)] >> 8) as u8
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/tables.rs"]
mod tests;
