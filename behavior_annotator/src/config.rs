// THEORY:
// The session configuration holds the behavior catalog, the control keys and the
// playback tunables. It is loaded from TOML once at startup and validated in full
// (the catalog is built once as a check), so a broken file never produces a partial
// session.

use crate::core_modules::action_catalog::{ActionCatalog, BehaviorDescriptor};
use crate::core_modules::input_event::{parse_key, ControlKeys};
use crate::core_modules::playback::PlaybackSettings;
use crate::error::{ConfigError, ConfigResult};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Location of the shipped config, relative to the install or working directory.
pub const DEFAULT_CONFIG: &str = "config/default_config.toml";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct RawConfig {
    actions: ActionsSection,
    playback: PlaybackSettings,
    controls: RawControls,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct ActionsSection {
    selectable: Vec<BehaviorDescriptor>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
struct RawControls {
    quit: String,
    pause: String,
    speed_up: String,
    speed_down: String,
    jump_back: String,
    jump_forward: String,
    save: String,
}

impl Default for RawControls {
    fn default() -> Self {
        Self {
            quit: "esc".into(),
            pause: "space".into(),
            speed_up: "]".into(),
            speed_down: "[".into(),
            jump_back: ",".into(),
            jump_forward: ".".into(),
            save: "s".into(),
        }
    }
}

impl RawControls {
    fn resolve(&self) -> ConfigResult<ControlKeys> {
        let key = |owner: &str, raw: &str| {
            parse_key(raw).ok_or_else(|| ConfigError::InvalidKey {
                owner: format!("controls.{owner}"),
                key: raw.to_string(),
            })
        };

        let controls = ControlKeys {
            quit: key("quit", &self.quit)?,
            pause: key("pause", &self.pause)?,
            speed_up: key("speed_up", &self.speed_up)?,
            speed_down: key("speed_down", &self.speed_down)?,
            jump_back: key("jump_back", &self.jump_back)?,
            jump_forward: key("jump_forward", &self.jump_forward)?,
            save: key("save", &self.save)?,
        };

        let bindings = controls.playback_bindings();
        for (i, (key, first)) in bindings.iter().enumerate() {
            if let Some((_, second)) = bindings[i + 1..].iter().find(|(other, _)| other == key) {
                return Err(ConfigError::DuplicateKey {
                    key: *key,
                    first: first.to_string(),
                    second: second.to_string(),
                });
            }
        }
        Ok(controls)
    }
}

/// Validated configuration of an annotation session.
#[derive(Debug, Clone, Default)]
pub struct AnnotatorConfig {
    pub behaviors: Vec<BehaviorDescriptor>,
    pub controls: ControlKeys,
    pub playback: PlaybackSettings,
}

impl AnnotatorConfig {
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    pub fn from_toml_str(text: &str) -> ConfigResult<Self> {
        let raw: RawConfig = toml::from_str(text)?;

        if raw.playback.max_speed == 0 {
            return Err(ConfigError::InvalidSetting {
                name: "playback.max_speed",
                reason: "must be at least 1".into(),
            });
        }
        if raw.playback.jump_size == 0 {
            return Err(ConfigError::InvalidSetting {
                name: "playback.jump_size",
                reason: "must be at least 1".into(),
            });
        }

        let config = Self {
            behaviors: raw.actions.selectable,
            controls: raw.controls.resolve()?,
            playback: raw.playback,
        };
        // Surface catalog errors at load time too.
        config.catalog()?;
        Ok(config)
    }

    pub fn catalog(&self) -> ConfigResult<ActionCatalog> {
        ActionCatalog::build_with_controls(&self.behaviors, &self.controls)
    }
}

/// The default config beside `executable`, falling back to the working directory.
pub fn find_default_config(executable: Option<&Path>) -> PathBuf {
    let beside_executable = executable
        .and_then(Path::parent)
        .map(|dir| dir.join(DEFAULT_CONFIG));
    match beside_executable {
        Some(path) if path.is_file() => path,
        _ => PathBuf::from(DEFAULT_CONFIG),
    }
}
