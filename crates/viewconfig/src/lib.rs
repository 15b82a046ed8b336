//! Configuration file for the quadmap viewer.
//!
//! A versioned TOML document with window, render, animation and session
//! tables, plus `[params]` and `[view]` tables that override parameter
//! defaults. A missing file means defaults.

use std::collections::BTreeMap;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use params::ParamValue;
use serde::de::{self, Deserializer};
use serde::Deserialize;
pub use session::TimeMode;

pub const CONFIG_VERSION: u32 = 1;
pub const MAX_COLORMAP_RESOLUTION: usize = 4096;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read configuration {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AddressSetting {
    #[serde(alias = "mirror")]
    MirroredRepeat,
    Repeat,
    #[serde(alias = "clamp-to-edge")]
    Clamp,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ViewConfig {
    pub version: u32,
    #[serde(default)]
    pub window: WindowConfig,
    #[serde(default)]
    pub render: RenderConfig,
    #[serde(default)]
    pub animation: AnimationConfig,
    #[serde(default)]
    pub session: SessionConfig,
    /// Default overrides for the simulation parameters.
    #[serde(default)]
    pub params: BTreeMap<String, toml::Value>,
    /// Default overrides for the presentation parameters.
    #[serde(default)]
    pub view: BTreeMap<String, toml::Value>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    pub width: u32,
    pub height: u32,
    pub title: String,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
            title: "quadmap".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    pub iteration_address: AddressSetting,
    pub gradient_address: AddressSetting,
    pub colormap_resolution: usize,
    pub autoplay: bool,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            iteration_address: AddressSetting::MirroredRepeat,
            gradient_address: AddressSetting::Repeat,
            colormap_resolution: 100,
            autoplay: false,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AnimationConfig {
    /// Frame interval. Strings are humantime (`"60ms"`); bare numbers are
    /// milliseconds, matching the on-screen interval parameter.
    #[serde(default, deserialize_with = "deserialize_interval_opt")]
    pub interval: Option<Duration>,
    /// Simulation time added per frame.
    #[serde(default)]
    pub dt: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub time: TimeMode,
    /// Include the simulation time in shared tokens.
    pub include_time: bool,
    /// Page the shared fragment is appended to; tokens are printed bare
    /// without one.
    pub share_base: Option<String>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            time: TimeMode::Restore,
            include_time: true,
            share_base: None,
        }
    }
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            window: WindowConfig::default(),
            render: RenderConfig::default(),
            animation: AnimationConfig::default(),
            session: SessionConfig::default(),
            params: BTreeMap::new(),
            view: BTreeMap::new(),
        }
    }
}

fn deserialize_interval_opt<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
where
    D: Deserializer<'de>,
{
    struct Visitor;
    impl<'de> de::Visitor<'de> for Visitor {
        type Value = Option<Duration>;

        fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
            formatter.write_str("an interval as milliseconds or a human-readable string")
        }

        fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            humantime::parse_duration(v)
                .map(Some)
                .map_err(|err| E::custom(format!("invalid interval '{v}': {err}")))
        }

        fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(Some(Duration::from_millis(v)))
        }

        fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            if v < 0 {
                return Err(E::custom("interval must be non-negative"));
            }
            Ok(Some(Duration::from_millis(v as u64)))
        }

        fn visit_f64<E>(self, v: f64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            if v.is_sign_negative() {
                return Err(E::custom("interval must be a non-negative number"));
            }
            Duration::try_from_secs_f64(v / 1000.0)
                .map(Some)
                .map_err(|err| E::custom(format!("invalid interval {v}: {err}")))
        }
    }

    deserializer.deserialize_any(Visitor)
}

impl ViewConfig {
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        let raw: ViewConfig = toml::from_str(input)?;
        raw.validate()?;
        Ok(raw)
    }

    /// Loads `path`, falling back to defaults when the file does not exist.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(contents) => Self::from_toml_str(&contents),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(Self::default()),
            Err(source) => Err(ConfigError::Read {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.version != CONFIG_VERSION {
            return Err(ConfigError::Invalid(format!(
                "unsupported config version {}; expected {CONFIG_VERSION}",
                self.version
            )));
        }

        if self.window.width == 0 || self.window.height == 0 {
            return Err(ConfigError::Invalid(format!(
                "window size {}x{} must be non-zero",
                self.window.width, self.window.height
            )));
        }

        let resolution = self.render.colormap_resolution;
        if !(1..=MAX_COLORMAP_RESOLUTION).contains(&resolution) {
            return Err(ConfigError::Invalid(format!(
                "render.colormap_resolution {resolution} must be within 1..={MAX_COLORMAP_RESOLUTION}"
            )));
        }

        if let Some(dt) = self.animation.dt {
            if !dt.is_finite() {
                return Err(ConfigError::Invalid("animation.dt must be finite".into()));
            }
        }

        if let Some(base) = &self.session.share_base {
            if base.trim().is_empty() {
                return Err(ConfigError::Invalid(
                    "session.share_base may not be empty".into(),
                ));
            }
        }

        param_overrides("params", &self.params)?;
        param_overrides("view", &self.view)?;
        Ok(())
    }

    pub fn simulation_overrides(&self) -> Result<Vec<(String, ParamValue)>, ConfigError> {
        param_overrides("params", &self.params)
    }

    /// Presentation overrides, with `[animation]` settings folded into the
    /// `interval` and `dt` parameters.
    pub fn view_overrides(&self) -> Result<Vec<(String, ParamValue)>, ConfigError> {
        let mut overrides = param_overrides("view", &self.view)?;
        if let Some(interval) = self.animation.interval {
            overrides.push((
                "interval".to_string(),
                ParamValue::Number(interval.as_nanos() as f64 / 1_000_000.0),
            ));
        }
        if let Some(dt) = self.animation.dt {
            overrides.push(("dt".to_string(), ParamValue::Number(dt)));
        }
        Ok(overrides)
    }
}

fn param_overrides(
    table: &str,
    values: &BTreeMap<String, toml::Value>,
) -> Result<Vec<(String, ParamValue)>, ConfigError> {
    values
        .iter()
        .map(|(id, value)| {
            let value = match value {
                toml::Value::Integer(v) => ParamValue::Integer(*v),
                toml::Value::Float(v) => ParamValue::Number(*v),
                toml::Value::String(v) => ParamValue::Choice(v.clone()),
                other => {
                    return Err(ConfigError::Invalid(format!(
                        "{table}.{id} must be a number or string, found {}",
                        other.type_str()
                    )))
                }
            };
            Ok((id.clone(), value))
        })
        .collect()
}
