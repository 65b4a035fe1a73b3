//! Configuration, persisted as JSON. Durations are stored in minutes and
//! converted to seconds at the point of use.

use serde::{Deserialize, Serialize};
use std::{fs, io, path::PathBuf};

#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(default)]
pub struct Settings {
    pub pomodoro_minutes: u32,
    pub short_break_minutes: u32,
    pub long_break_minutes: u32,
    pub push_notification: bool,
    /// ServerChan send key for the push channel; empty means unconfigured.
    pub secret_key: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            pomodoro_minutes: 25,
            short_break_minutes: 5,
            long_break_minutes: 15,
            push_notification: false,
            secret_key: String::new(),
        }
    }
}

impl Settings {
    /// Nominal length of one pomodoro interval in seconds.
    pub fn duration_seconds(&self) -> u32 {
        self.pomodoro_minutes.saturating_mul(60)
    }
}

pub fn config_path(filename: &str) -> PathBuf {
    let mut path = PathBuf::from(".");
    path.push("pomark");
    let _ = fs::create_dir_all(&path);
    path.push(filename);
    path
}

pub fn load(path: &PathBuf) -> Settings {
    fs::read_to_string(path)
        .ok()
        .and_then(|s| serde_json::from_str(&s).ok())
        .unwrap_or_default()
}

pub fn save(path: &PathBuf, settings: &Settings) -> io::Result<()> {
    fs::write(path, serde_json::to_string_pretty(settings)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_classic_pomodoro() {
        let s = Settings::default();
        assert_eq!(s.pomodoro_minutes, 25);
        assert_eq!(s.duration_seconds(), 1500);
        assert!(!s.push_notification);
        assert!(s.secret_key.is_empty());
    }

    #[test]
    fn partial_config_files_fill_in_defaults() {
        let s: Settings = serde_json::from_str(r#"{"pomodoro_minutes": 50}"#).unwrap();
        assert_eq!(s.duration_seconds(), 3000);
        assert_eq!(s.short_break_minutes, 5);
    }
}
