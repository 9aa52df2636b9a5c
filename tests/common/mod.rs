//! Shared collaborators for session integration tests.
#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::watch;

use guided_sessions_lib::audio::{
    AmbientTransport, AudioBackend, NarrationPosition, NarrationTransport,
};
use guided_sessions_lib::collaborators::{
    ActivityKind, EngagementHook, EngagementStage, NarrationAsset, TtsClient,
};
use guided_sessions_lib::session::SessionController;
use guided_sessions_lib::settings::{AmbientSource, GuidedSettings};
use guided_sessions_lib::{SessionError, SessionResult};

/// Records every volume written so ramps can be inspected step by step.
#[derive(Default)]
pub struct RecordingAmbient {
    pub playing: AtomicBool,
    pub volumes: Mutex<Vec<f32>>,
}

impl RecordingAmbient {
    pub fn volumes(&self) -> Vec<f32> {
        self.volumes.lock().unwrap().clone()
    }
}

#[async_trait]
impl AmbientTransport for RecordingAmbient {
    async fn play(&self) -> SessionResult<()> {
        self.playing.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn pause(&self) {
        self.playing.store(false, Ordering::SeqCst);
    }

    fn stop(&self) {
        self.playing.store(false, Ordering::SeqCst);
    }

    fn set_volume(&self, volume: f32) {
        self.volumes.lock().unwrap().push(volume);
    }
}

pub struct ScriptedNarration {
    positions: watch::Sender<NarrationPosition>,
}

impl Default for ScriptedNarration {
    fn default() -> Self {
        let (positions, _) = watch::channel(NarrationPosition::default());
        Self { positions }
    }
}

impl ScriptedNarration {
    pub fn report(&self, position_secs: f64, duration_secs: f64) {
        self.positions.send_replace(NarrationPosition {
            position_secs,
            duration_secs: Some(duration_secs),
            ended: false,
        });
    }
}

#[async_trait]
impl NarrationTransport for ScriptedNarration {
    fn subscribe(&self) -> watch::Receiver<NarrationPosition> {
        self.positions.subscribe()
    }

    async fn play(&self) -> SessionResult<()> {
        Ok(())
    }

    fn pause(&self) {}

    fn restart(&self) {}

    fn stop(&self) {}

    fn set_volume(&self, _volume: f32) {}
}

#[derive(Default)]
pub struct TestBackend {
    pub narrations: Mutex<Vec<Arc<ScriptedNarration>>>,
}

impl TestBackend {
    pub fn narration(&self) -> Option<Arc<ScriptedNarration>> {
        self.narrations.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl AudioBackend for TestBackend {
    async fn open_ambient(&self, _source: &AmbientSource) -> SessionResult<Arc<dyn AmbientTransport>> {
        Ok(Arc::new(RecordingAmbient::default()))
    }

    async fn open_narration(
        &self,
        _asset: &NarrationAsset,
    ) -> SessionResult<Arc<dyn NarrationTransport>> {
        let narration = Arc::new(ScriptedNarration::default());
        self.narrations.lock().unwrap().push(narration.clone());
        Ok(narration)
    }
}

/// Resolves immediately, either with a fixed asset or with a generation error.
pub struct StubTts {
    pub failure: Option<String>,
}

#[async_trait]
impl TtsClient for StubTts {
    async fn text_to_speech(&self, _full_text: &str) -> SessionResult<NarrationAsset> {
        match &self.failure {
            Some(message) => Err(SessionError::Generation(message.clone())),
            None => Ok(NarrationAsset {
                path: PathBuf::from("narration.mp3"),
            }),
        }
    }
}

#[derive(Default)]
pub struct EngagementLog {
    pub events: Mutex<Vec<(ActivityKind, EngagementStage)>>,
}

impl EngagementLog {
    pub fn stages(&self) -> Vec<EngagementStage> {
        self.events.lock().unwrap().iter().map(|(_, stage)| *stage).collect()
    }
}

impl EngagementHook for EngagementLog {
    fn notify(&self, kind: ActivityKind, stage: EngagementStage) {
        self.events.lock().unwrap().push((kind, stage));
    }
}

pub struct TestSession {
    pub controller: SessionController,
    pub backend: Arc<TestBackend>,
    pub engagement: Arc<EngagementLog>,
}

/// A controller wired to in-memory collaborators with a fixed seed.
pub fn test_session(tts_failure: Option<&str>) -> TestSession {
    let mut settings = GuidedSettings::default();
    settings.ambient.source = AmbientSource::Ocean;

    let backend = Arc::new(TestBackend::default());
    let engagement = Arc::new(EngagementLog::default());
    let controller = SessionController::builder(settings)
        .backend(backend.clone())
        .tts(Arc::new(StubTts {
            failure: tts_failure.map(str::to_string),
        }))
        .engagement(engagement.clone())
        .seed(2024)
        .build();

    TestSession {
        controller,
        backend,
        engagement,
    }
}
