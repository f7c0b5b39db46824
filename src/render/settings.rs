use crate::{
    foundation::error::{MosaicError, MosaicResult},
    render::tables::{CheckSize, CheckType},
};

/// Display preferences read by the scaled renderer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct RenderSettings {
    pub check_size: CheckSize,
    pub check_type: CheckType,
    /// Draw checks behind transparent pixels; when off both phases use the
    /// light check value.
    pub transparency_indicator: bool,
    /// Copy the previous output row when the source row repeats.
    pub row_reuse: bool,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            check_size: CheckSize::Medium,
            check_type: CheckType::GrayChecks,
            transparency_indicator: true,
            row_reuse: true,
        }
    }
}

impl RenderSettings {
    /// Defaults overlaid with `MOSAIC_*` environment variables.
    pub fn from_env() -> Self {
        Self::default().overlay_vars(|key| std::env::var(key).ok())
    }

    /// Parse a persisted settings document. Missing fields take defaults.
    pub fn from_json_str(s: &str) -> MosaicResult<Self> {
        serde_json::from_str(s).map_err(|e| MosaicError::settings(format!("invalid render settings: {e}")))
    }

    pub fn to_json_string(&self) -> MosaicResult<String> {
        serde_json::to_string_pretty(self).map_err(|e| MosaicError::settings(e.to_string()))
    }

    /// Apply overrides from `get`, which maps variable names to values.
    /// Unparseable values are ignored.
    pub fn overlay_vars(mut self, get: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(v) = read_var(&get, "MOSAIC_CHECK_SIZE", CheckSize::parse) {
            self.check_size = v;
        }
        if let Some(v) = read_var(&get, "MOSAIC_CHECK_TYPE", CheckType::parse) {
            self.check_type = v;
        }
        if let Some(v) = read_var(&get, "MOSAIC_TRANSPARENCY_INDICATOR", parse_flag) {
            self.transparency_indicator = v;
        }
        if let Some(v) = read_var(&get, "MOSAIC_ROW_REUSE", parse_flag) {
            self.row_reuse = v;
        }
        self
    }
}

fn read_var<T>(
    get: &impl Fn(&str) -> Option<String>,
    key: &str,
    parse: fn(&str) -> Option<T>,
) -> Option<T> {
    let raw = get(key)?;
    let parsed = parse(&raw);
    if parsed.is_none() {
        tracing::warn!(key, value = %raw, "ignoring unparseable setting");
    }
    parsed
}

fn parse_flag(s: &str) -> Option<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "on" | "yes" => Some(true),
        "0" | "false" | "off" | "no" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/settings.rs"]
mod tests;
