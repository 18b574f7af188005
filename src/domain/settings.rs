use crate::domain::gestures::GestureConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogSettings {
    #[serde(default = "default_level")]
    pub level: String, // "trace", "debug", "info", "warn", "error"
    #[serde(default = "default_true")]
    pub file_logging_enabled: bool,
    #[serde(default = "default_true")]
    pub console_logging_enabled: bool,
    #[serde(default = "default_log_dir")]
    pub log_dir: String,
    #[serde(default = "default_prefix")]
    pub file_name_prefix: String,
    #[serde(default = "default_true")]
    pub show_file_line: bool,
    #[serde(default = "default_false")]
    pub show_thread_ids: bool,
    #[serde(default = "default_true")]
    pub show_target: bool,
    #[serde(default = "default_true")]
    pub ansi_colors: bool,
    #[serde(default = "default_rotation")]
    pub rotation: String, // "daily", "hourly", "minutely", "never"
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            level: default_level(),
            file_logging_enabled: default_true(),
            console_logging_enabled: default_true(),
            log_dir: default_log_dir(),
            file_name_prefix: default_prefix(),
            show_file_line: default_true(),
            show_thread_ids: default_false(),
            show_target: default_true(),
            ansi_colors: default_true(),
            rotation: default_rotation(),
        }
    }
}

fn default_level() -> String {
    "info".to_string()
}
fn default_true() -> bool {
    true
}
fn default_false() -> bool {
    false
}
fn default_log_dir() -> String {
    "logs".to_string()
}
fn default_prefix() -> String {
    "hovermouse".to_string()
}
fn default_rotation() -> String {
    "daily".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Name the emulated device advertises to hosts.
    #[serde(default = "default_device_name")]
    pub device_name: String,

    // Pointer
    #[serde(default = "default_pointer_sensitivity")]
    pub pointer_sensitivity: f64,

    // Pinch click
    #[serde(default = "default_pinch_press_threshold")]
    pub pinch_press_threshold: f64,
    #[serde(default = "default_pinch_release_threshold")]
    pub pinch_release_threshold: f64,
    #[serde(default = "default_pinch_debounce_frames")]
    pub pinch_debounce_frames: usize,

    // Picture-frame action gesture
    #[serde(default = "default_frame_hold_frames")]
    pub frame_hold_frames: usize,
    #[serde(default = "default_frame_cooldown_frames")]
    pub frame_cooldown_frames: usize,

    // Two-finger scroll
    #[serde(default = "default_scroll_raise_threshold")]
    pub scroll_raise_threshold: f64,
    #[serde(default = "default_scroll_sensitivity")]
    pub scroll_sensitivity: f64,

    /// Consecutive interrupt-channel write failures tolerated before the
    /// transport failure is treated as fatal instead of a reconnect.
    #[serde(default = "default_max_write_failures")]
    pub max_write_failures: u32,

    // Logging Settings
    #[serde(default)]
    pub log_settings: LogSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            device_name: default_device_name(),
            pointer_sensitivity: default_pointer_sensitivity(),
            pinch_press_threshold: default_pinch_press_threshold(),
            pinch_release_threshold: default_pinch_release_threshold(),
            pinch_debounce_frames: default_pinch_debounce_frames(),
            frame_hold_frames: default_frame_hold_frames(),
            frame_cooldown_frames: default_frame_cooldown_frames(),
            scroll_raise_threshold: default_scroll_raise_threshold(),
            scroll_sensitivity: default_scroll_sensitivity(),
            max_write_failures: default_max_write_failures(),
            log_settings: LogSettings::default(),
        }
    }
}

impl Settings {
    pub fn gesture_config(&self) -> GestureConfig {
        GestureConfig {
            pointer_sensitivity: self.pointer_sensitivity,
            pinch_press_threshold: self.pinch_press_threshold,
            pinch_release_threshold: self.pinch_release_threshold,
            pinch_debounce_frames: self.pinch_debounce_frames,
            frame_hold_frames: self.frame_hold_frames,
            frame_cooldown_frames: self.frame_cooldown_frames,
            scroll_raise_threshold: self.scroll_raise_threshold,
            scroll_sensitivity: self.scroll_sensitivity,
        }
    }
}

fn default_device_name() -> String {
    "Hover Mouse".to_string()
}
fn default_pointer_sensitivity() -> f64 {
    1200.0
}
fn default_pinch_press_threshold() -> f64 {
    0.045
}
fn default_pinch_release_threshold() -> f64 {
    0.060
}
fn default_pinch_debounce_frames() -> usize {
    3
}
// 1 s hold / 2 s cooldown at the nominal 30 fps capture rate.
fn default_frame_hold_frames() -> usize {
    30
}
fn default_frame_cooldown_frames() -> usize {
    60
}
fn default_scroll_raise_threshold() -> f64 {
    0.015
}
fn default_scroll_sensitivity() -> f64 {
    100.0
}
fn default_max_write_failures() -> u32 {
    3
}

pub struct SettingsService {
    settings: Settings,
    settings_path: PathBuf,
}

impl SettingsService {
    pub fn new() -> anyhow::Result<Self> {
        let settings_path = Self::get_settings_path()?;
        let settings = Self::load_from_file(&settings_path).unwrap_or_default();

        Ok(Self {
            settings,
            settings_path,
        })
    }

    fn get_settings_path() -> anyhow::Result<PathBuf> {
        let mut path = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;
        path.push("HoverMouse");
        fs::create_dir_all(&path)?;
        path.push("settings.json");
        Ok(path)
    }

    fn load_from_file(path: &PathBuf) -> anyhow::Result<Settings> {
        let contents = fs::read_to_string(path)?;
        let settings = serde_json::from_str(&contents)?;
        Ok(settings)
    }

    pub fn save(&self) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(&self.settings)?;
        fs::write(&self.settings_path, json)?;
        Ok(())
    }

    pub fn get(&self) -> &Settings {
        &self.settings
    }

    pub fn get_mut(&mut self) -> &mut Settings {
        &mut self.settings
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_deserialize_from_empty_object() {
        let settings: Settings = serde_json::from_str("{}").unwrap();
        assert_eq!(settings.device_name, "Hover Mouse");
        assert_eq!(settings.pinch_debounce_frames, 3);
        assert_eq!(settings.max_write_failures, 3);
    }

    #[test]
    fn partial_file_keeps_remaining_defaults() {
        let settings: Settings =
            serde_json::from_str(r#"{"pointer_sensitivity": 800.0}"#).unwrap();
        assert_eq!(settings.pointer_sensitivity, 800.0);
        assert_eq!(settings.frame_hold_frames, 30);
    }
}
