//! Application configuration and persisted user settings.
//!
//! `Config` covers process-level concerns resolved from the environment
//! (storage directory, auto-save delay, editor, API credential). `Settings`
//! are the user preferences persisted through the key-value store; each key
//! falls back to its reference default independently, so one corrupted
//! entry never takes the others down. Settings are an explicit object
//! handed to whoever needs them, not ambient process state.

use std::path::PathBuf;
use std::time::Duration;

use clap::ValueEnum;
use log::debug;
use serde::{Deserialize, Serialize};
use which::which;

use crate::{AccentColor, KeyValueStore, PadError, Result, Theme, VoiceName, AUTOSAVE_DELAY};

/// Store key for the note collection.
pub const NOTES_KEY: &str = "notes";
/// Store key for the theme preference.
pub const THEME_KEY: &str = "theme";
/// Store key for the accent color preference.
pub const ACCENT_KEY: &str = "accent";
/// Store key for the preferred voice.
pub const VOICE_KEY: &str = "voice";

/// Application configuration settings.
#[derive(Debug, Clone)]
pub struct Config {
    /// Directory where the key-value store lives
    pub data_dir: PathBuf,

    /// Delay after the last edit before an auto-save commit
    pub autosave_delay: Duration,

    /// Default editor command
    pub editor_command: Option<String>,

    /// Credential for the remote collaborator
    pub api_key: Option<String>,
}

impl Config {
    /// Resolves configuration from the environment with platform fallbacks.
    pub fn load() -> Self {
        let data_dir = std::env::var_os("TUTORPAD_DATA_DIR")
            .map(PathBuf::from)
            .or_else(|| dirs::data_dir().map(|d| d.join("tutorpad")))
            .unwrap_or_else(|| PathBuf::from(".tutorpad"));

        let api_key = std::env::var("GEMINI_API_KEY")
            .or_else(|_| std::env::var("API_KEY"))
            .ok();

        debug!("Config resolved: data_dir={}", data_dir.display());

        Self {
            data_dir,
            autosave_delay: AUTOSAVE_DELAY,
            editor_command: None,
            api_key,
        }
    }

    // This method provides smart fallbacks when no editor is configured
    pub fn get_editor_command(&self) -> String {
        // First try the configured editor
        if let Some(editor) = &self.editor_command {
            return editor.clone();
        }

        // Then try environment variable
        if let Ok(editor) = std::env::var("EDITOR") {
            return editor;
        }

        // Fall back to platform defaults
        if cfg!(windows) {
            "notepad".to_string()
        } else if cfg!(target_os = "macos") {
            "open -t".to_string()
        } else {
            // Try common Linux editors
            for editor in &["nano", "vim", "vi", "emacs"] {
                if which(editor).is_ok() {
                    return editor.to_string();
                }
            }
            "nano".to_string()
        }
    }
}

/// Persisted user preferences.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Settings {
    pub theme: Theme,
    pub accent: AccentColor,
    pub voice: VoiceName,
}

impl Settings {
    /// Loads each preference from its own store key, falling back to the
    /// reference default per key.
    pub fn load(store: &KeyValueStore) -> Self {
        Self {
            theme: store.read(THEME_KEY, Theme::default()),
            accent: store.read(ACCENT_KEY, AccentColor::default()),
            voice: store.read(VOICE_KEY, VoiceName::default()),
        }
    }

    /// Persists every preference under its own store key.
    pub fn save(&self, store: &KeyValueStore) {
        store.write(THEME_KEY, &self.theme);
        store.write(ACCENT_KEY, &self.accent);
        store.write(VOICE_KEY, &self.voice);
    }

    /// Applies a `key=value` assignment (e.g. `theme=dark`, `voice=Kore`).
    pub fn set(&mut self, assignment: &str) -> Result<()> {
        let (key, value) = assignment.split_once('=').ok_or(PadError::ConfigError {
            message: format!("Expected key=value, got '{}'", assignment),
        })?;

        match key.trim() {
            "theme" => {
                self.theme = Theme::from_str(value.trim(), true).map_err(|e| {
                    PadError::ConfigError { message: e }
                })?;
            }
            "accent" => {
                self.accent = AccentColor::from_str(value.trim(), true).map_err(|e| {
                    PadError::ConfigError { message: e }
                })?;
            }
            "voice" => {
                self.voice = VoiceName::from_str(value.trim(), true).map_err(|e| {
                    PadError::ConfigError { message: e }
                })?;
            }
            other => {
                return Err(PadError::ConfigError {
                    message: format!("Unknown setting '{}'", other),
                });
            }
        }

        Ok(())
    }
}
