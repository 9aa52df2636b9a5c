use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
    sync::{RwLock, RwLockReadGuard, RwLockWriteGuard},
    time::Duration,
};

use crate::timeline::ResumeStrategy;

pub const OCEAN_WAVES_URL: &str =
    "https://assets.mixkit.co/sfx/preview/mixkit-beach-waves-loop-1196.mp3";

/// Self-paced speeds offered to the user.
pub const ALLOWED_PACES: [f64; 3] = [1.0, 1.5, 2.0];

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum AmbientSource {
    Url { url: String },
    /// Synthesized surf, no download.
    Ocean,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct AmbientSettings {
    pub enabled: bool,
    pub volume: f32,
    pub fade_in_ms: u64,
    pub fade_out_ms: u64,
    pub source: AmbientSource,
}

impl AmbientSettings {
    pub fn fade_in(&self) -> Duration {
        Duration::from_millis(self.fade_in_ms)
    }

    pub fn fade_out(&self) -> Duration {
        Duration::from_millis(self.fade_out_ms)
    }
}

impl Default for AmbientSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            volume: 0.25,
            fade_in_ms: 3000,
            fade_out_ms: 5000,
            source: AmbientSource::Url {
                url: OCEAN_WAVES_URL.into(),
            },
        }
    }
}

/// Sent to the TTS service as-is, so the field names follow its API.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct VoiceSettings {
    pub stability: f32,
    pub similarity_boost: f32,
    pub style: f32,
    pub use_speaker_boost: bool,
    pub speed: f32,
}

impl Default for VoiceSettings {
    fn default() -> Self {
        Self {
            // eleven_v3 only accepts 0.0, 0.5 or 1.0 here
            stability: 1.0,
            similarity_boost: 0.7,
            style: 0.0,
            use_speaker_boost: true,
            speed: 0.7,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct NarrationSettings {
    pub voice_volume: f32,
    pub voice_id: String,
    pub model_id: String,
    pub voice: VoiceSettings,
    /// Narration counts as finished this close to the end of the track.
    pub completion_epsilon_secs: f64,
    /// Where rendered narration is written. Defaults to the system temp dir.
    pub cache_dir: Option<PathBuf>,
}

impl Default for NarrationSettings {
    fn default() -> Self {
        Self {
            voice_volume: 1.0,
            voice_id: "21m00Tcm4TlvDq8ikWAM".into(),
            model_id: "eleven_v3".into(),
            voice: VoiceSettings::default(),
            completion_epsilon_secs: 1.0,
            cache_dir: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct BodyScanSettings {
    pub min_items: usize,
    pub max_items: usize,
}

impl Default for BodyScanSettings {
    fn default() -> Self {
        Self {
            min_items: 7,
            max_items: 11,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct BoxBreathingSettings {
    pub phase_secs: f64,
    pub cycles: u32,
    pub feeling_better_secs: f64,
    /// Cycles after which an early reset still counts as a finished session.
    pub min_cycles_for_completion: u32,
}

impl Default for BoxBreathingSettings {
    fn default() -> Self {
        Self {
            phase_secs: 4.0,
            cycles: 8,
            feeling_better_secs: 30.0,
            min_cycles_for_completion: 2,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct SessionSettings {
    pub resume_strategy: ResumeStrategy,
    pub pace: f64,
}

impl SessionSettings {
    /// The configured pace, or 1.0 when it is not one of [`ALLOWED_PACES`].
    pub fn effective_pace(&self) -> f64 {
        if ALLOWED_PACES.contains(&self.pace) {
            self.pace
        } else {
            1.0
        }
    }
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            resume_strategy: ResumeStrategy::Snapshot,
            pace: 1.0,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct GuidedSettings {
    pub ambient: AmbientSettings,
    pub narration: NarrationSettings,
    pub body_scan: BodyScanSettings,
    pub box_breathing: BoxBreathingSettings,
    pub session: SessionSettings,
}

pub struct SettingsStore {
    path: PathBuf,
    data: RwLock<GuidedSettings>,
}

impl SettingsStore {
    pub fn new(path: PathBuf) -> Result<Self> {
        let data = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read settings from {}", path.display()))?;
            serde_json::from_str(&contents).unwrap_or_else(|err| {
                log::warn!(
                    "Ignoring unreadable settings at {}: {}",
                    path.display(),
                    err
                );
                GuidedSettings::default()
            })
        } else {
            GuidedSettings::default()
        };

        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn snapshot(&self) -> GuidedSettings {
        self.read().clone()
    }

    pub fn ambient(&self) -> AmbientSettings {
        self.read().ambient.clone()
    }

    pub fn narration(&self) -> NarrationSettings {
        self.read().narration.clone()
    }

    pub fn update_ambient(&self, settings: AmbientSettings) -> Result<()> {
        self.update(|data| data.ambient = settings)
    }

    pub fn update_narration(&self, settings: NarrationSettings) -> Result<()> {
        self.update(|data| data.narration = settings)
    }

    pub fn update_session(&self, settings: SessionSettings) -> Result<()> {
        self.update(|data| data.session = settings)
    }

    /// Applies `change` and writes the whole document back.
    pub fn update(&self, change: impl FnOnce(&mut GuidedSettings)) -> Result<()> {
        let mut guard = self.write();
        change(&mut guard);
        self.persist(&guard)
    }

    pub fn reload(&self) -> Result<()> {
        let contents = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read settings from {}", self.path.display()))?;
        let data: GuidedSettings = serde_json::from_str(&contents)
            .with_context(|| format!("Malformed settings in {}", self.path.display()))?;
        *self.write() = data;
        Ok(())
    }

    fn persist(&self, data: &GuidedSettings) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create settings dir {}", parent.display())
                })?;
            }
        }
        let serialized = serde_json::to_string_pretty(data)?;
        fs::write(&self.path, serialized)
            .with_context(|| format!("Failed to write settings to {}", self.path.display()))
    }

    fn read(&self) -> RwLockReadGuard<'_, GuidedSettings> {
        self.data.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, GuidedSettings> {
        self.data.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_loads_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let store = SettingsStore::new(dir.path().join("settings.json")).unwrap();
        let settings = store.snapshot();
        assert_eq!(settings, GuidedSettings::default());
        assert_eq!(settings.ambient.volume, 0.25);
        assert_eq!(settings.body_scan.min_items, 7);
        assert_eq!(settings.body_scan.max_items, 11);
        assert_eq!(settings.session.resume_strategy, ResumeStrategy::Snapshot);
    }

    #[test]
    fn updates_persist_across_stores() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("settings.json");
        let store = SettingsStore::new(path.clone()).unwrap();

        let mut ambient = store.ambient();
        ambient.enabled = false;
        ambient.source = AmbientSource::Ocean;
        store.update_ambient(ambient).unwrap();

        let reopened = SettingsStore::new(path).unwrap();
        assert!(!reopened.ambient().enabled);
        assert_eq!(reopened.ambient().source, AmbientSource::Ocean);
    }

    #[test]
    fn narration_and_session_updates_round_trip_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        let store = SettingsStore::new(path.clone()).unwrap();

        let mut narration = store.narration();
        narration.voice_volume = 0.5;
        store.update_narration(narration).unwrap();
        store
            .update_session(SessionSettings {
                resume_strategy: ResumeStrategy::LegacyHeuristic,
                pace: 2.0,
            })
            .unwrap();

        let reopened = SettingsStore::new(path).unwrap().snapshot();
        assert_eq!(reopened.narration.voice_volume, 0.5);
        assert_eq!(reopened.session.pace, 2.0);
        assert_eq!(reopened.session.effective_pace(), 2.0);
        assert_eq!(
            reopened.session.resume_strategy,
            ResumeStrategy::LegacyHeuristic
        );
    }

    #[test]
    fn partial_documents_fill_in_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, r#"{"session":{"resumeStrategy":"legacyHeuristic"}}"#).unwrap();

        let store = SettingsStore::new(path).unwrap();
        let settings = store.snapshot();
        assert_eq!(
            settings.session.resume_strategy,
            ResumeStrategy::LegacyHeuristic
        );
        assert_eq!(settings.session.pace, 1.0);
        assert_eq!(settings.narration.completion_epsilon_secs, 1.0);
    }

    #[test]
    fn garbage_falls_back_to_defaults_but_reload_reports_it() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, "not json").unwrap();

        let store = SettingsStore::new(path).unwrap();
        assert_eq!(store.snapshot(), GuidedSettings::default());
        assert!(store.reload().is_err());
    }

    #[test]
    fn unknown_pace_runs_at_normal_speed() {
        let mut session = SessionSettings::default();
        session.pace = 1.5;
        assert_eq!(session.effective_pace(), 1.5);
        session.pace = 3.0;
        assert_eq!(session.effective_pace(), 1.0);
    }
}
