// THEORY:
// The `ActionCatalog` is the immutable vocabulary of a session: which key selects
// which behavior, and which colour that behavior is painted with. It is built once
// from configuration and only read afterwards.
//
// Key invariants:
// 1.  Every key maps to exactly one behavior.
// 2.  The reserved "no activity" behavior always resolves. If configuration omits it,
//     it is inserted on its reserved key with a neutral gray, and that key must be free.
// 3.  No behavior key shadows a playback control key, otherwise that behavior could
//     never be selected.

use crate::core_modules::input_event::{key_label, parse_key, ControlKeys};
use crate::core_modules::segment_encoder::VIDEO_END;
use crate::error::{ConfigError, ConfigResult};
use image::Rgb;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// A behavior label. Cheap to clone; every cell of a buffer shares the catalog's allocation.
pub type Behavior = Arc<str>;

/// Display colour of a behavior, in RGB order.
pub type Colour = Rgb<u8>;

pub const NO_ACTIVITY: &str = "no_activity";
pub const NO_ACTIVITY_KEY: char = 'z';
pub const NO_ACTIVITY_COLOUR: Colour = Rgb([50, 50, 50]);
/// Legend colour of the non-behavior commands.
pub const COMMAND_COLOUR: Colour = Rgb([255, 255, 255]);

/// One selectable behavior as written in configuration.
///
/// Fields default to empty so that a missing field is reported with the index of
/// the offending entry instead of a bare deserialization error.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct BehaviorDescriptor {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub key: String,
    /// Three comma-separated floats in [0, 1], RGB.
    #[serde(default, alias = "color")]
    pub colour: String,
}

impl BehaviorDescriptor {
    pub fn new(name: impl Into<String>, key: impl Into<String>, colour: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            key: key.into(),
            colour: colour.into(),
        }
    }
}

/// A row of the on-screen legend.
#[derive(Debug, Clone, PartialEq)]
pub struct LegendEntry {
    pub key: String,
    pub label: String,
    pub colour: Colour,
}

#[derive(Debug, Clone)]
pub struct ActionCatalog {
    key_to_behavior: HashMap<char, Behavior>,
    behavior_to_colour: HashMap<Behavior, Colour>,
    /// Bindings in configuration order, the reserved entry last when it was inserted.
    bindings: Vec<(char, Behavior)>,
    no_activity: Behavior,
}

impl ActionCatalog {
    /// Builds a catalog against the default control keys.
    pub fn build(descriptors: &[BehaviorDescriptor]) -> ConfigResult<Self> {
        Self::build_with_controls(descriptors, &ControlKeys::default())
    }

    pub fn build_with_controls(descriptors: &[BehaviorDescriptor], controls: &ControlKeys) -> ConfigResult<Self> {
        let mut key_to_behavior: HashMap<char, Behavior> = HashMap::new();
        let mut behavior_to_colour: HashMap<Behavior, Colour> = HashMap::new();
        let mut bindings = Vec::with_capacity(descriptors.len() + 1);

        for (index, descriptor) in descriptors.iter().enumerate() {
            let name = descriptor.name.trim();
            if name.is_empty() {
                return Err(ConfigError::MissingField { index, field: "name" });
            }
            if name == VIDEO_END {
                return Err(ConfigError::ReservedName {
                    behavior: name.to_string(),
                });
            }
            if descriptor.key.is_empty() {
                return Err(ConfigError::MissingField { index, field: "key" });
            }
            if descriptor.colour.trim().is_empty() {
                return Err(ConfigError::MissingField { index, field: "colour" });
            }

            let key = parse_key(&descriptor.key).ok_or_else(|| ConfigError::InvalidKey {
                owner: name.to_string(),
                key: descriptor.key.clone(),
            })?;
            if let Some(command) = controls.command_for(key) {
                return Err(ConfigError::ReservedKey {
                    key,
                    behavior: name.to_string(),
                    reserved_for: command.to_string(),
                });
            }
            if let Some(first) = key_to_behavior.get(&key) {
                return Err(ConfigError::DuplicateKey {
                    key,
                    first: first.to_string(),
                    second: name.to_string(),
                });
            }

            let colour = parse_colour(name, &descriptor.colour)?;
            let behavior = match behavior_to_colour.get_key_value(name) {
                Some((existing, _)) => existing.clone(),
                None => Behavior::from(name),
            };

            key_to_behavior.insert(key, behavior.clone());
            behavior_to_colour.insert(behavior.clone(), colour);
            bindings.push((key, behavior));
        }

        let no_activity = match behavior_to_colour.get_key_value(NO_ACTIVITY) {
            Some((existing, _)) => existing.clone(),
            None => {
                if let Some(owner) = key_to_behavior.get(&NO_ACTIVITY_KEY) {
                    return Err(ConfigError::ReservedKey {
                        key: NO_ACTIVITY_KEY,
                        behavior: owner.to_string(),
                        reserved_for: "no activity".to_string(),
                    });
                }
                if let Some(command) = controls.command_for(NO_ACTIVITY_KEY) {
                    return Err(ConfigError::ReservedKey {
                        key: NO_ACTIVITY_KEY,
                        behavior: NO_ACTIVITY.to_string(),
                        reserved_for: command.to_string(),
                    });
                }
                let behavior = Behavior::from(NO_ACTIVITY);
                key_to_behavior.insert(NO_ACTIVITY_KEY, behavior.clone());
                behavior_to_colour.insert(behavior.clone(), NO_ACTIVITY_COLOUR);
                bindings.push((NO_ACTIVITY_KEY, behavior.clone()));
                behavior
            }
        };

        debug!(
            bindings = bindings.len(),
            behaviors = behavior_to_colour.len(),
            "built action catalog"
        );

        Ok(Self {
            key_to_behavior,
            behavior_to_colour,
            bindings,
            no_activity,
        })
    }

    pub fn behavior_for_key(&self, key: char) -> Option<&Behavior> {
        self.key_to_behavior.get(&key)
    }

    pub fn colour_of(&self, behavior: &str) -> Option<Colour> {
        self.behavior_to_colour.get(behavior).copied()
    }

    /// First key bound to `behavior`.
    pub fn key_of(&self, behavior: &str) -> Option<char> {
        self.bindings
            .iter()
            .find(|(_, bound)| &**bound == behavior)
            .map(|(key, _)| *key)
    }

    /// The reserved default label every frame starts with.
    pub fn no_activity(&self) -> &Behavior {
        &self.no_activity
    }

    /// Key bindings in configuration order.
    pub fn bindings(&self) -> impl Iterator<Item = (char, &Behavior)> {
        self.bindings.iter().map(|(key, behavior)| (*key, behavior))
    }

    /// Behavior name to colour, for consumers outside the session.
    pub fn colour_map(&self) -> HashMap<String, Colour> {
        self.behavior_to_colour
            .iter()
            .map(|(behavior, colour)| (behavior.to_string(), *colour))
            .collect()
    }

    /// Behaviors first, then the speed and seek commands.
    pub fn legend(&self, controls: &ControlKeys) -> Vec<LegendEntry> {
        let mut entries: Vec<LegendEntry> = self
            .bindings
            .iter()
            .map(|(key, behavior)| LegendEntry {
                key: key_label(*key),
                label: behavior.replace('_', " "),
                colour: self.behavior_to_colour[behavior],
            })
            .collect();

        let commands = [
            (controls.speed_up, "increase speed"),
            (controls.speed_down, "decrease speed"),
            (controls.jump_back, "jump back"),
            (controls.jump_forward, "jump forward"),
        ];
        entries.extend(commands.into_iter().map(|(key, label)| LegendEntry {
            key: key_label(key),
            label: label.to_string(),
            colour: COMMAND_COLOUR,
        }));
        entries
    }
}

/// Parses `"r,g,b"` floats in [0, 1] into an 8-bit colour, flooring each channel.
pub fn parse_colour(behavior: &str, value: &str) -> ConfigResult<Colour> {
    let malformed = |reason: String| ConfigError::MalformedColour {
        behavior: behavior.to_string(),
        value: value.to_string(),
        reason,
    };

    let components: Vec<&str> = value.split(',').map(str::trim).collect();
    if components.len() != 3 {
        return Err(malformed(format!(
            "expected three comma-separated components, found {}",
            components.len()
        )));
    }

    let mut channels = [0u8; 3];
    for (channel, component) in channels.iter_mut().zip(&components) {
        let parsed: f64 = component
            .parse()
            .map_err(|_| malformed(format!("{component:?} is not a number")))?;
        if !parsed.is_finite() || !(0.0..=1.0).contains(&parsed) {
            return Err(malformed(format!("{component} is outside [0, 1]")));
        }
        *channel = (255.0 * parsed).floor() as u8;
    }
    Ok(Rgb(channels))
}
