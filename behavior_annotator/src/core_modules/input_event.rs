// THEORY:
// Raw key codes from the windowing toolkit are turned into a closed set of
// `InputEvent`s in exactly one place, `classify`. Everything downstream matches on
// the enum exhaustively and never looks at a key code again.
//
// Control keys are fixed for a session (configurable at load time). Behavior keys
// come from the `ActionCatalog`. The catalog guarantees the two sets never overlap,
// so the order of the checks below only matters for keys that are neither.

use crate::core_modules::action_catalog::{ActionCatalog, Behavior};

pub const ESCAPE: char = '\u{1b}';
pub const SPACE: char = ' ';

/// The non-behavior keys of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControlKeys {
    pub quit: char,
    pub pause: char,
    pub speed_up: char,
    pub speed_down: char,
    pub jump_back: char,
    pub jump_forward: char,
    /// Only meaningful as the answer to the save prompt.
    pub save: char,
}

impl Default for ControlKeys {
    fn default() -> Self {
        Self {
            quit: ESCAPE,
            pause: SPACE,
            speed_up: ']',
            speed_down: '[',
            jump_back: ',',
            jump_forward: '.',
            save: 's',
        }
    }
}

impl ControlKeys {
    /// Keys that are dispatched during playback, with the command they trigger.
    /// The save key is excluded: it is free to double as a behavior key.
    pub fn playback_bindings(&self) -> [(char, &'static str); 6] {
        [
            (self.quit, "quit"),
            (self.pause, "pause"),
            (self.speed_up, "increase speed"),
            (self.speed_down, "decrease speed"),
            (self.jump_back, "jump back"),
            (self.jump_forward, "jump forward"),
        ]
    }

    /// Returns the command name if `key` is a playback control key.
    pub fn command_for(&self, key: char) -> Option<&'static str> {
        self.playback_bindings()
            .into_iter()
            .find(|(bound, _)| *bound == key)
            .map(|(_, command)| command)
    }
}

/// Parses a key as written in configuration: one character, or a named key.
pub fn parse_key(raw: &str) -> Option<char> {
    match raw.to_ascii_lowercase().as_str() {
        "esc" | "escape" => return Some(ESCAPE),
        "space" | "spacebar" => return Some(SPACE),
        _ => {}
    }
    let mut chars = raw.chars();
    match (chars.next(), chars.next()) {
        (Some(key), None) => Some(key),
        _ => None,
    }
}

/// Human-readable key label for legends and overlays.
pub fn key_label(key: char) -> String {
    match key {
        ESCAPE => "esc".to_string(),
        SPACE => "space".to_string(),
        other => other.to_string(),
    }
}

/// What the key source delivered at the end of a wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyInput {
    /// The wait interval elapsed with nothing pressed.
    Timeout,
    Key(char),
}

/// A classified operator command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputEvent {
    Quit,
    TogglePause,
    SpeedUp,
    SpeedDown,
    JumpBack,
    JumpForward,
    SelectBehavior { key: char, behavior: Behavior },
}

/// Maps a raw key to at most one command. Unrecognized keys and timeouts yield `None`.
pub fn classify(input: KeyInput, controls: &ControlKeys, catalog: &ActionCatalog) -> Option<InputEvent> {
    let KeyInput::Key(key) = input else {
        return None;
    };

    if key == controls.quit {
        Some(InputEvent::Quit)
    } else if key == controls.speed_up {
        Some(InputEvent::SpeedUp)
    } else if key == controls.speed_down {
        Some(InputEvent::SpeedDown)
    } else if key == controls.jump_back {
        Some(InputEvent::JumpBack)
    } else if key == controls.jump_forward {
        Some(InputEvent::JumpForward)
    } else if let Some(behavior) = catalog.behavior_for_key(key) {
        Some(InputEvent::SelectBehavior {
            key,
            behavior: behavior.clone(),
        })
    } else if key == controls.pause {
        Some(InputEvent::TogglePause)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_modules::action_catalog::{BehaviorDescriptor, NO_ACTIVITY, NO_ACTIVITY_KEY};

    fn catalog() -> ActionCatalog {
        ActionCatalog::build(&[BehaviorDescriptor::new("groom", "g", "1.0,0,0")]).expect("valid catalog")
    }

    #[test]
    fn control_keys_classify_to_commands() {
        let controls = ControlKeys::default();
        let catalog = catalog();
        let cases = [
            (ESCAPE, InputEvent::Quit),
            (SPACE, InputEvent::TogglePause),
            (']', InputEvent::SpeedUp),
            ('[', InputEvent::SpeedDown),
            (',', InputEvent::JumpBack),
            ('.', InputEvent::JumpForward),
        ];
        for (key, expected) in cases {
            assert_eq!(classify(KeyInput::Key(key), &controls, &catalog), Some(expected));
        }
    }

    #[test]
    fn behavior_keys_select_behaviors() {
        let controls = ControlKeys::default();
        let catalog = catalog();

        let groom = classify(KeyInput::Key('g'), &controls, &catalog);
        assert!(matches!(groom, Some(InputEvent::SelectBehavior { key: 'g', ref behavior }) if &**behavior == "groom"));

        // The reserved no-activity key is an ordinary behavior, not a pen-up command.
        let none = classify(KeyInput::Key(NO_ACTIVITY_KEY), &controls, &catalog);
        assert!(matches!(none, Some(InputEvent::SelectBehavior { ref behavior, .. }) if &**behavior == NO_ACTIVITY));
    }

    #[test]
    fn unknown_keys_and_timeouts_are_ignored() {
        let controls = ControlKeys::default();
        let catalog = catalog();
        assert_eq!(classify(KeyInput::Timeout, &controls, &catalog), None);
        assert_eq!(classify(KeyInput::Key('q'), &controls, &catalog), None);
        // No dedicated lift-pen key exists.
        assert_eq!(classify(KeyInput::Key('/'), &controls, &catalog), None);
        // The save key means nothing during playback.
        assert_eq!(classify(KeyInput::Key('s'), &controls, &catalog), None);
    }

    #[test]
    fn parses_named_and_single_character_keys() {
        assert_eq!(parse_key("esc"), Some(ESCAPE));
        assert_eq!(parse_key("Space"), Some(SPACE));
        assert_eq!(parse_key("g"), Some('g'));
        assert_eq!(parse_key(""), None);
        assert_eq!(parse_key("gg"), None);
        assert_eq!(key_label(ESCAPE), "esc");
    }
}
