//! In-memory stand-ins for the audio, TTS and engagement collaborators.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::{watch, Semaphore};

use crate::audio::{AmbientTransport, AudioBackend, NarrationPosition, NarrationTransport};
use crate::collaborators::{ActivityKind, EngagementHook, EngagementStage, NarrationAsset, TtsClient};
use crate::error::{SessionError, SessionResult};
use crate::settings::AmbientSource;

#[derive(Default)]
pub struct FakeAmbient {
    reject: bool,
    playing: AtomicBool,
    stopped: AtomicBool,
    volumes: Mutex<Vec<f32>>,
}

impl FakeAmbient {
    /// Refuses every `play`, like a runtime that blocks autoplay.
    pub fn rejecting() -> Self {
        Self {
            reject: true,
            ..Self::default()
        }
    }

    pub fn is_playing(&self) -> bool {
        self.playing.load(Ordering::SeqCst)
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }

    pub fn last_volume(&self) -> Option<f32> {
        self.volumes.lock().unwrap().last().copied()
    }
}

#[async_trait]
impl AmbientTransport for FakeAmbient {
    async fn play(&self) -> SessionResult<()> {
        if self.reject {
            return Err(SessionError::PlaybackRejected("autoplay blocked".into()));
        }
        self.playing.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn pause(&self) {
        self.playing.store(false, Ordering::SeqCst);
    }

    fn stop(&self) {
        self.playing.store(false, Ordering::SeqCst);
        self.stopped.store(true, Ordering::SeqCst);
    }

    fn set_volume(&self, volume: f32) {
        self.volumes.lock().unwrap().push(volume);
    }
}

/// A narration track whose position is pushed by the test.
pub struct FakeNarration {
    positions: watch::Sender<NarrationPosition>,
    playing: AtomicBool,
    stopped: AtomicBool,
    restarts: AtomicUsize,
    volume: Mutex<Option<f32>>,
}

impl Default for FakeNarration {
    fn default() -> Self {
        let (positions, _) = watch::channel(NarrationPosition::default());
        Self {
            positions,
            playing: AtomicBool::new(false),
            stopped: AtomicBool::new(false),
            restarts: AtomicUsize::new(0),
            volume: Mutex::new(None),
        }
    }
}

impl FakeNarration {
    pub fn report(&self, position_secs: f64, duration_secs: Option<f64>) {
        self.positions.send_replace(NarrationPosition {
            position_secs,
            duration_secs,
            ended: false,
        });
    }

    pub fn is_playing(&self) -> bool {
        self.playing.load(Ordering::SeqCst)
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }

    pub fn restarts(&self) -> usize {
        self.restarts.load(Ordering::SeqCst)
    }

    pub fn volume(&self) -> Option<f32> {
        *self.volume.lock().unwrap()
    }
}

#[async_trait]
impl NarrationTransport for FakeNarration {
    fn subscribe(&self) -> watch::Receiver<NarrationPosition> {
        self.positions.subscribe()
    }

    async fn play(&self) -> SessionResult<()> {
        self.playing.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn pause(&self) {
        self.playing.store(false, Ordering::SeqCst);
    }

    fn restart(&self) {
        self.restarts.fetch_add(1, Ordering::SeqCst);
    }

    fn stop(&self) {
        self.playing.store(false, Ordering::SeqCst);
        self.stopped.store(true, Ordering::SeqCst);
    }

    fn set_volume(&self, volume: f32) {
        *self.volume.lock().unwrap() = Some(volume);
    }
}

/// Hands out fresh fakes and keeps them for inspection.
#[derive(Default)]
pub struct FakeBackend {
    ambients: Mutex<Vec<Arc<FakeAmbient>>>,
    narrations: Mutex<Vec<Arc<FakeNarration>>>,
}

impl FakeBackend {
    pub fn narrations_opened(&self) -> usize {
        self.narrations.lock().unwrap().len()
    }

    pub fn last_narration(&self) -> Option<Arc<FakeNarration>> {
        self.narrations.lock().unwrap().last().cloned()
    }

    pub fn last_ambient(&self) -> Option<Arc<FakeAmbient>> {
        self.ambients.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl AudioBackend for FakeBackend {
    async fn open_ambient(&self, _source: &AmbientSource) -> SessionResult<Arc<dyn AmbientTransport>> {
        let ambient = Arc::new(FakeAmbient::default());
        self.ambients.lock().unwrap().push(ambient.clone());
        Ok(ambient)
    }

    async fn open_narration(
        &self,
        _asset: &NarrationAsset,
    ) -> SessionResult<Arc<dyn NarrationTransport>> {
        let narration = Arc::new(FakeNarration::default());
        self.narrations.lock().unwrap().push(narration.clone());
        Ok(narration)
    }
}

pub struct FakeTts {
    failure: Option<String>,
    gate: Option<Semaphore>,
    requests: AtomicUsize,
}

impl FakeTts {
    pub fn succeeding() -> Self {
        Self {
            failure: None,
            gate: None,
            requests: AtomicUsize::new(0),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            failure: Some(message.to_string()),
            ..Self::succeeding()
        }
    }

    /// Holds every request until [`FakeTts::release`] is called.
    pub fn gated(mut self) -> Self {
        self.gate = Some(Semaphore::new(0));
        self
    }

    pub fn release(&self) {
        if let Some(gate) = &self.gate {
            gate.add_permits(1);
        }
    }

    pub fn requests(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TtsClient for FakeTts {
    async fn text_to_speech(&self, _full_text: &str) -> SessionResult<NarrationAsset> {
        let request = self.requests.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.gate {
            gate.acquire()
                .await
                .map_err(|e| SessionError::Generation(e.to_string()))?
                .forget();
        }
        match &self.failure {
            Some(message) => Err(SessionError::Generation(message.clone())),
            None => Ok(NarrationAsset {
                path: PathBuf::from(format!("narration-{request}.mp3")),
            }),
        }
    }
}

#[derive(Default)]
pub struct RecordingEngagement {
    events: Mutex<Vec<(ActivityKind, EngagementStage)>>,
}

impl RecordingEngagement {
    pub fn stages(&self) -> Vec<EngagementStage> {
        self.events.lock().unwrap().iter().map(|(_, stage)| *stage).collect()
    }

    pub fn kinds(&self) -> Vec<ActivityKind> {
        self.events.lock().unwrap().iter().map(|(kind, _)| *kind).collect()
    }

    pub fn count(&self, stage: EngagementStage) -> usize {
        self.stages().into_iter().filter(|s| *s == stage).count()
    }
}

impl EngagementHook for RecordingEngagement {
    fn notify(&self, kind: ActivityKind, stage: EngagementStage) {
        self.events.lock().unwrap().push((kind, stage));
    }
}
