//! Configuration management with layered loading
//!
//! Precedence (lowest to highest):
//! 1. Compiled defaults
//! 2. Global config: `$XDG_CONFIG_HOME/atdraw/atdraw.toml`
//! 3. Local config: `<document_dir>/.atdraw.toml`
//! 4. Environment variables: `ATDRAW_*` prefix, `__` as section separator

use std::path::{Path, PathBuf};

use config::{Config, ConfigError, Environment};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::application::ApplicationError;
use crate::domain::Point;

/// Geometry and iteration limits of the layout engine.
///
/// Passed explicitly into the engine; the engine reads no global state.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LayoutSettings {
    /// Width of every node box
    pub node_width: f64,
    /// Height of a threat/countermeasure box without attributes
    pub node_height: f64,
    /// Extra height per attribute row
    pub attribute_row_height: f64,
    /// Height of a conjunction box
    pub conjunction_height: f64,
    /// Conjunction boxes are this much wider on each side
    pub conjunction_margin: f64,
    /// Distance between the left edges of neighbouring children
    pub horizontal_spacing: f64,
    /// Gap between a node's bottom and its children's top
    pub vertical_spacing: f64,
    /// Distance a colliding group moves per iteration
    pub shift_step: f64,
    /// Cap on shifts for one left/right pairing
    pub max_shift_iterations: u32,
    /// Cap on collision passes per component
    pub max_passes: u32,
    /// Vertical gap above each disconnected component
    pub component_gap: f64,
    /// Position of the first component's top node
    pub origin: Point,
    /// Keep existing positions and skip collision resolution
    pub fixed_positions: bool,
}

impl Default for LayoutSettings {
    fn default() -> Self {
        Self {
            node_width: 200.0,
            node_height: 60.0,
            attribute_row_height: 20.0,
            conjunction_height: 40.0,
            conjunction_margin: 20.0,
            horizontal_spacing: 250.0,
            vertical_spacing: 100.0,
            shift_step: 125.0,
            max_shift_iterations: 20,
            max_passes: 20,
            component_gap: 50.0,
            origin: Point::new(0.0, 10.0),
            fixed_positions: false,
        }
    }
}

/// Raw layout settings for intermediate parsing (`None` = not specified, inherit).
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawLayoutSettings {
    pub node_width: Option<f64>,
    pub node_height: Option<f64>,
    pub attribute_row_height: Option<f64>,
    pub conjunction_height: Option<f64>,
    pub conjunction_margin: Option<f64>,
    pub horizontal_spacing: Option<f64>,
    pub vertical_spacing: Option<f64>,
    pub shift_step: Option<f64>,
    pub max_shift_iterations: Option<u32>,
    pub max_passes: Option<u32>,
    pub component_gap: Option<f64>,
    pub origin: Option<Point>,
    pub fixed_positions: Option<bool>,
}

/// Raw settings for intermediate parsing.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawSettings {
    pub layout: RawLayoutSettings,
}

impl LayoutSettings {
    /// Overlay wins where it specifies a value.
    pub fn merge(&self, overlay: &RawLayoutSettings) -> Self {
        Self {
            node_width: overlay.node_width.unwrap_or(self.node_width),
            node_height: overlay.node_height.unwrap_or(self.node_height),
            attribute_row_height: overlay
                .attribute_row_height
                .unwrap_or(self.attribute_row_height),
            conjunction_height: overlay
                .conjunction_height
                .unwrap_or(self.conjunction_height),
            conjunction_margin: overlay
                .conjunction_margin
                .unwrap_or(self.conjunction_margin),
            horizontal_spacing: overlay
                .horizontal_spacing
                .unwrap_or(self.horizontal_spacing),
            vertical_spacing: overlay.vertical_spacing.unwrap_or(self.vertical_spacing),
            shift_step: overlay.shift_step.unwrap_or(self.shift_step),
            max_shift_iterations: overlay
                .max_shift_iterations
                .unwrap_or(self.max_shift_iterations),
            max_passes: overlay.max_passes.unwrap_or(self.max_passes),
            component_gap: overlay.component_gap.unwrap_or(self.component_gap),
            origin: overlay.origin.unwrap_or(self.origin),
            fixed_positions: overlay.fixed_positions.unwrap_or(self.fixed_positions),
        }
    }

    /// Rejects geometry the engine cannot work with.
    pub fn validate(&self) -> Result<(), ApplicationError> {
        let positive = [
            ("node_width", self.node_width),
            ("node_height", self.node_height),
            ("conjunction_height", self.conjunction_height),
            ("horizontal_spacing", self.horizontal_spacing),
            ("shift_step", self.shift_step),
        ];
        for (name, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(ApplicationError::Config {
                    message: format!("layout.{name} must be a positive number, got {value}"),
                });
            }
        }
        let non_negative = [
            ("attribute_row_height", self.attribute_row_height),
            ("conjunction_margin", self.conjunction_margin),
            ("vertical_spacing", self.vertical_spacing),
            ("component_gap", self.component_gap),
        ];
        for (name, value) in non_negative {
            if !(value.is_finite() && value >= 0.0) {
                return Err(ApplicationError::Config {
                    message: format!("layout.{name} must not be negative, got {value}"),
                });
            }
        }
        Ok(())
    }
}

/// Unified configuration for atdraw.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Settings {
    /// Layout engine geometry
    pub layout: LayoutSettings,
}

/// Get the XDG config directory for atdraw.
pub fn global_config_dir() -> Option<PathBuf> {
    ProjectDirs::from("", "", "atdraw").map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the path to the global config file.
pub fn global_config_path() -> Option<PathBuf> {
    global_config_dir().map(|dir| dir.join("atdraw.toml"))
}

/// Get the path to the local config file in a document directory.
pub fn local_config_path(document_dir: &Path) -> PathBuf {
    document_dir.join(".atdraw.toml")
}

/// Load a TOML file into RawSettings for manual merging.
fn load_raw_settings(path: &Path) -> Result<RawSettings, ApplicationError> {
    let content = std::fs::read_to_string(path).map_err(|e| ApplicationError::Config {
        message: format!("read {}: {}", path.display(), e),
    })?;
    toml::from_str(&content).map_err(|e| ApplicationError::Config {
        message: format!("parse {}: {}", path.display(), e),
    })
}

impl Settings {
    fn merge_with(&self, overlay: &RawSettings) -> Self {
        Self {
            layout: self.layout.merge(&overlay.layout),
        }
    }

    /// Load settings with layered precedence.
    ///
    /// # Arguments
    /// * `document_dir` - Optional directory of the document for local config
    pub fn load(document_dir: Option<&Path>) -> Result<Self, ApplicationError> {
        let mut current = Self::default();

        if let Some(global_path) = global_config_path() {
            if global_path.exists() {
                let raw = load_raw_settings(&global_path)?;
                current = current.merge_with(&raw);
            }
        }

        if let Some(dir) = document_dir {
            let local_path = local_config_path(dir);
            if local_path.exists() {
                let raw = load_raw_settings(&local_path)?;
                current = current.merge_with(&raw);
            }
        }

        current = Self::apply_env_overrides(current)?;
        current.layout.validate()?;

        Ok(current)
    }

    /// Apply ATDRAW_* environment variables as explicit overrides.
    fn apply_env_overrides(mut settings: Self) -> Result<Self, ApplicationError> {
        let config = Config::builder()
            .add_source(
                Environment::with_prefix("ATDRAW")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()
            .map_err(config_err)?;

        let layout = &mut settings.layout;
        let floats: [(&str, &mut f64); 10] = [
            ("layout.node_width", &mut layout.node_width),
            ("layout.node_height", &mut layout.node_height),
            ("layout.attribute_row_height", &mut layout.attribute_row_height),
            ("layout.conjunction_height", &mut layout.conjunction_height),
            ("layout.conjunction_margin", &mut layout.conjunction_margin),
            ("layout.horizontal_spacing", &mut layout.horizontal_spacing),
            ("layout.vertical_spacing", &mut layout.vertical_spacing),
            ("layout.shift_step", &mut layout.shift_step),
            ("layout.component_gap", &mut layout.component_gap),
            ("layout.origin.y", &mut layout.origin.y),
        ];
        for (key, slot) in floats {
            if let Ok(val) = config.get_float(key) {
                *slot = val;
            }
        }
        if let Ok(val) = config.get_float("layout.origin.x") {
            layout.origin.x = val;
        }
        if let Ok(val) = config.get_int("layout.max_shift_iterations") {
            layout.max_shift_iterations = u32::try_from(val).map_err(|_| ApplicationError::Config {
                message: format!("layout.max_shift_iterations out of range: {val}"),
            })?;
        }
        if let Ok(val) = config.get_int("layout.max_passes") {
            layout.max_passes = u32::try_from(val).map_err(|_| ApplicationError::Config {
                message: format!("layout.max_passes out of range: {val}"),
            })?;
        }
        if let Ok(val) = config.get_bool("layout.fixed_positions") {
            layout.fixed_positions = val;
        }

        Ok(settings)
    }

    /// Show the effective configuration as TOML.
    pub fn to_toml(&self) -> Result<String, ApplicationError> {
        toml::to_string_pretty(self).map_err(|e| ApplicationError::Config {
            message: format!("serialize config: {e}"),
        })
    }

    /// Generate a template config file.
    pub fn template() -> String {
        r#"# atdraw configuration
#
# Locations (by precedence, lowest to highest):
#   Global: ~/.config/atdraw/atdraw.toml
#   Local:  <document_dir>/.atdraw.toml
#   Env:    ATDRAW_LAYOUT__<KEY> environment variables

[layout]
# Node box geometry
# node_width = 200.0
# node_height = 60.0
# attribute_row_height = 20.0
# conjunction_height = 40.0
# conjunction_margin = 20.0

# Child row spacing
# horizontal_spacing = 250.0
# vertical_spacing = 100.0

# Collision resolution
# shift_step = 125.0
# max_shift_iterations = 20
# max_passes = 20

# Disconnected components are stacked below with this gap
# component_gap = 50.0

# origin = { x = 0.0, y = 10.0 }

# Keep stored positions instead of recomputing them
# fixed_positions = false
"#
        .to_string()
    }
}

fn config_err(e: ConfigError) -> ApplicationError {
    ApplicationError::Config {
        message: e.to_string(),
    }
}
