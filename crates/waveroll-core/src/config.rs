//! Piano roll configuration
//!
//! Configuration is stored as YAML in the user's config directory.
//! Default location: ~/.config/waveroll/piano-roll.yaml

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::error::ConfigError;
use crate::types::{HighlightMode, NoteRange, OnsetMarkerStyle, PatternKind};

/// Smallest zoom factor ever applied, whatever the configured limits say
const ZOOM_FLOOR: f64 = 1e-3;

/// Clamp range for the horizontal and vertical zoom factors
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ZoomLimits {
    pub min_x: f64,
    pub max_x: f64,
    pub min_y: f64,
    pub max_y: f64,
}

impl Default for ZoomLimits {
    fn default() -> Self {
        Self {
            min_x: 0.1,
            max_x: 100.0,
            min_y: 0.25,
            max_y: 10.0,
        }
    }
}

impl ZoomLimits {
    /// Clamp a horizontal zoom; the result is always positive
    pub fn clamp_x(&self, zoom: f64) -> f64 {
        Self::clamp(zoom, self.min_x, self.max_x)
    }

    /// Clamp a vertical zoom; the result is always positive
    pub fn clamp_y(&self, zoom: f64) -> f64 {
        Self::clamp(zoom, self.min_y, self.max_y)
    }

    fn clamp(zoom: f64, min: f64, max: f64) -> f64 {
        let lo = if min.is_finite() { min.max(ZOOM_FLOOR) } else { ZOOM_FLOOR };
        let hi = if max.is_finite() { max.max(lo) } else { lo };
        if zoom.is_nan() {
            return lo;
        }
        zoom.clamp(lo, hi)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        for (min, max) in [(self.min_x, self.max_x), (self.min_y, self.max_y)] {
            if !(min > 0.0 && min.is_finite() && max.is_finite() && min <= max) {
                return Err(ConfigError::InvalidZoomRange { min, max });
            }
        }
        Ok(())
    }
}

/// Root configuration structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PianoRollConfig {
    /// Initial viewport width in logical pixels
    pub width: f64,
    /// Initial viewport height in logical pixels
    pub height: f64,
    /// Reserve a 60px piano-key column at the left edge
    pub show_piano_keys: bool,
    pub note_range: NoteRange,
    /// Major grid step in seconds (labelled)
    pub time_step: f64,
    /// Minor grid step in seconds (faint, unlabelled)
    pub minor_time_step: f64,
    /// Default note tint, hex (e.g. "#4285f4")
    pub note_color: String,
    pub background_color: String,
    /// Overrides the playhead core colour
    pub playhead_color: Option<String>,
    pub zoom: ZoomLimits,
    pub show_onset_markers: bool,
    /// Only mark notes whose time equals their source note's onset
    pub only_original_onsets: bool,
    pub highlight_mode: HighlightMode,
    /// fileId -> hex colour
    pub file_colors: HashMap<String, String>,
    /// fileId -> tiled pattern overlay
    pub file_patterns: HashMap<String, PatternKind>,
    /// fileId -> onset marker style
    pub onset_styles: HashMap<String, OnsetMarkerStyle>,
}

impl Default for PianoRollConfig {
    fn default() -> Self {
        Self {
            width: 800.0,
            height: 400.0,
            show_piano_keys: true,
            note_range: NoteRange::default(),
            time_step: 1.0,
            minor_time_step: 0.5,
            note_color: "#4285f4".to_string(),
            background_color: "#ffffff".to_string(),
            playhead_color: None,
            zoom: ZoomLimits::default(),
            show_onset_markers: false,
            only_original_onsets: true,
            highlight_mode: HighlightMode::File,
            file_colors: HashMap::new(),
            file_patterns: HashMap::new(),
            onset_styles: HashMap::new(),
        }
    }
}

impl PianoRollConfig {
    /// Report the first invalid field
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.width > 0.0 && self.height > 0.0 && self.width.is_finite() && self.height.is_finite()) {
            return Err(ConfigError::InvalidViewport {
                width: self.width,
                height: self.height,
            });
        }
        for step in [self.time_step, self.minor_time_step] {
            if !(step > 0.0 && step.is_finite()) {
                return Err(ConfigError::InvalidTimeStep(step));
            }
        }
        let NoteRange { min, max } = self.note_range;
        if min >= max || max > 127 {
            return Err(ConfigError::InvalidNoteRange { min, max });
        }
        self.zoom.validate()?;

        parse_hex_color(&self.note_color)?;
        parse_hex_color(&self.background_color)?;
        if let Some(color) = &self.playhead_color {
            parse_hex_color(color)?;
        }
        for color in self.file_colors.values() {
            parse_hex_color(color)?;
        }
        Ok(())
    }

    /// Default note tint as 0xRRGGBB, falling back to the built-in blue
    pub fn note_color_rgb(&self) -> u32 {
        parse_hex_color_or(&self.note_color, 0x4285f4)
    }

    pub fn background_color_rgb(&self) -> u32 {
        parse_hex_color_or(&self.background_color, 0xffffff)
    }

    pub fn playhead_color_rgb(&self) -> Option<u32> {
        self.playhead_color
            .as_deref()
            .and_then(|hex| parse_hex_color(hex).ok())
    }

    /// Parsed per-file colours; invalid entries are logged and skipped
    pub fn file_colors_rgb(&self) -> HashMap<String, u32> {
        self.file_colors
            .iter()
            .filter_map(|(file_id, hex)| match parse_hex_color(hex) {
                Ok(rgb) => Some((file_id.clone(), rgb)),
                Err(e) => {
                    log::warn!("file_colors: {} for '{}', ignoring", e, file_id);
                    None
                }
            })
            .collect()
    }
}

/// Parse "#RRGGBB" / "RRGGBB" into 0xRRGGBB
pub fn parse_hex_color(hex: &str) -> Result<u32, ConfigError> {
    let digits = hex.trim().trim_start_matches('#');
    if digits.len() != 6 {
        return Err(ConfigError::InvalidColor(hex.to_string()));
    }
    u32::from_str_radix(digits, 16).map_err(|_| ConfigError::InvalidColor(hex.to_string()))
}

fn parse_hex_color_or(hex: &str, fallback: u32) -> u32 {
    parse_hex_color(hex).unwrap_or_else(|e| {
        log::warn!("{}, using #{:06x}", e, fallback);
        fallback
    })
}

/// Get the default config file path
///
/// Returns: ~/.config/waveroll/piano-roll.yaml
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")))
        .join("waveroll")
        .join("piano-roll.yaml")
}

/// Configuration types that can reject values serde accepts
pub trait Validate {
    fn validate(&self) -> Result<(), ConfigError>;
}

impl Validate for PianoRollConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        PianoRollConfig::validate(self)
    }
}

fn read_config<T>(path: &Path) -> Result<T>
where
    T: DeserializeOwned + Validate,
{
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;
    let config: T = serde_yaml::from_str(&contents).context("Failed to parse config")?;
    config.validate().context("Invalid config")?;
    Ok(config)
}

/// Load configuration from a YAML file
///
/// A missing file yields the default config. So does a file that cannot be
/// read, parsed or validated, after a warning.
///
/// ```ignore
/// let config: PianoRollConfig = load_config(&default_config_path());
/// ```
pub fn load_config<T>(path: &Path) -> T
where
    T: DeserializeOwned + Default + Validate,
{
    if !path.exists() {
        log::info!("load_config: {:?} not found, using defaults", path);
        return T::default();
    }

    match read_config(path) {
        Ok(config) => {
            log::info!("load_config: Loaded {:?}", path);
            config
        }
        Err(e) => {
            log::warn!("load_config: {:#}, using defaults", e);
            T::default()
        }
    }
}

/// Save configuration to a YAML file, creating parent directories
///
/// Invalid configurations are refused so a later load never falls back to defaults.
pub fn save_config<T>(config: &T, path: &Path) -> Result<()>
where
    T: Serialize + Validate,
{
    config.validate().context("Refusing to save invalid config")?;

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create config directory: {:?}", parent))?;
    }
    let yaml = serde_yaml::to_string(config).context("Failed to serialize config to YAML")?;
    std::fs::write(path, yaml).with_context(|| format!("Failed to write config file: {:?}", path))?;

    log::debug!("save_config: Wrote {:?}", path);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{OnsetMarkerShape, OnsetMarkerVariant};

    #[test]
    fn test_default_config() {
        let config = PianoRollConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.note_color_rgb(), 0x4285f4);
        assert_eq!(config.background_color_rgb(), 0xffffff);
        assert!(config.only_original_onsets);
        assert!(!config.show_onset_markers);
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let yaml = r##"
time_step: 2.0
highlight_mode: highlight-blend
file_colors:
  a: "#ff0000"
file_patterns:
  a: dots
onset_styles:
  a:
    shape: triangle-up
    variant: outlined
"##;
        let config: PianoRollConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.time_step, 2.0);
        assert_eq!(config.minor_time_step, 0.5);
        assert_eq!(config.highlight_mode, HighlightMode::HighlightBlend);
        assert_eq!(config.file_colors_rgb().get("a"), Some(&0xff0000));
        assert_eq!(config.file_patterns.get("a"), Some(&PatternKind::Dots));

        let style = config.onset_styles["a"];
        assert_eq!(style.shape, OnsetMarkerShape::TriangleUp);
        assert_eq!(style.variant, OnsetMarkerVariant::Outlined);
        assert_eq!(style.size, 12.0, "Missing style fields fall back to defaults");
    }

    #[test]
    fn test_yaml_round_trip() {
        let mut config = PianoRollConfig::default();
        config.playhead_color = Some("#d00000".to_string());
        config.file_colors.insert("b".to_string(), "#00aa00".to_string());
        let yaml = serde_yaml::to_string(&config).unwrap();
        let parsed: PianoRollConfig = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_validation_errors() {
        let mut config = PianoRollConfig::default();
        config.time_step = 0.0;
        assert_eq!(config.validate(), Err(ConfigError::InvalidTimeStep(0.0)));

        let mut config = PianoRollConfig::default();
        config.note_range = NoteRange { min: 80, max: 40 };
        assert_eq!(
            config.validate(),
            Err(ConfigError::InvalidNoteRange { min: 80, max: 40 })
        );

        let mut config = PianoRollConfig::default();
        config.zoom.min_y = 0.0;
        assert!(matches!(config.validate(), Err(ConfigError::InvalidZoomRange { .. })));

        let mut config = PianoRollConfig::default();
        config.note_color = "blue".to_string();
        assert_eq!(
            config.validate(),
            Err(ConfigError::InvalidColor("blue".to_string()))
        );
    }

    #[test]
    fn test_zoom_clamp_survives_bad_limits() {
        let limits = ZoomLimits {
            min_x: -1.0,
            max_x: -5.0,
            min_y: 2.0,
            max_y: 1.0,
        };
        assert!(limits.clamp_x(0.0) > 0.0);
        assert_eq!(limits.clamp_y(5.0), 2.0);
    }

    #[test]
    fn test_missing_file_loads_defaults() {
        let path = std::env::temp_dir().join("waveroll-test-missing").join("none.yaml");
        let config: PianoRollConfig = load_config(&path);
        assert_eq!(config, PianoRollConfig::default());
    }

    #[test]
    fn test_invalid_file_loads_defaults_and_save_refuses_it() {
        let dir = std::env::temp_dir().join(format!("waveroll-config-bad-{}", std::process::id()));
        let path = dir.join("piano-roll.yaml");
        let mut config = PianoRollConfig::default();
        config.time_step = -1.0;
        assert!(save_config(&config, &path).is_err());
        assert!(!path.exists());

        std::fs::create_dir_all(&dir).unwrap();
        let yaml = serde_yaml::to_string(&config).unwrap();
        std::fs::write(&path, yaml).unwrap();
        let loaded: PianoRollConfig = load_config(&path);
        assert_eq!(loaded, PianoRollConfig::default());
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_save_then_load() {
        let _ = env_logger::builder().is_test(true).try_init();
        let dir = std::env::temp_dir().join(format!("waveroll-config-{}", std::process::id()));
        let path = dir.join("piano-roll.yaml");
        let mut config = PianoRollConfig::default();
        config.show_onset_markers = true;
        config.width = 1024.0;
        save_config(&config, &path).unwrap();
        let loaded: PianoRollConfig = load_config(&path);
        assert_eq!(loaded, config);
        let _ = std::fs::remove_dir_all(&dir);
    }
}
