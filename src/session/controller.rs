use std::sync::Arc;

use chrono::Utc;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::audio::{AmbientCrossfader, AudioBackend, NarrationTransport, RodioBackend};
use crate::collaborators::{
    ElevenLabsClient, EngagementHook, EngagementStage, LoggingEngagement, NarrationAsset,
    TtsClient,
};
use crate::error::{SessionError, SessionResult};
use crate::narration::AudioSyncAdapter;
use crate::script::PAUSED_TEXT;
use crate::sequence::SequenceGenerator;
use crate::settings::{GuidedSettings, SettingsStore};
use crate::timeline::resume::resume_elapsed;
use crate::timeline::{PauseSnapshot, PhaseScheduler, ResumeStrategy};
use crate::utils::format_elapsed;

use super::exercise::{Exercise, SessionPlan};
use super::state::{SessionMode, SessionState, SessionStatus};
use super::tick::{LocalTicker, NarrationTicker, Tick, TickSource};
use super::view::{ScriptHistory, SessionView, GENERATING_TEXT};

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_error, log_info, log_warn};

/// Resources owned by one started session. Dropped as a whole on reset.
struct Running {
    plan: SessionPlan,
    scheduler: PhaseScheduler,
    ambient: Option<Arc<AmbientCrossfader>>,
    narration: Option<Arc<dyn NarrationTransport>>,
    sync: Option<AudioSyncAdapter>,
    /// The tick source while no ticker task holds it (paused).
    parked: Option<Box<dyn TickSource>>,
    completion_notified: bool,
}

impl Running {
    fn progress_percent(&self) -> f64 {
        match &self.sync {
            Some(sync) => sync.progress_percent(),
            None => self
                .scheduler
                .progress_percent(self.scheduler.total_elapsed()),
        }
    }

    /// A replacement when the ticker task did not hand its source back.
    fn fresh_source(&self, pace: f64) -> Box<dyn TickSource> {
        match &self.narration {
            Some(narration) => Box::new(NarrationTicker::new(Arc::clone(narration))),
            None => Box::new(LocalTicker::new(pace)),
        }
    }
}

struct Session {
    state: SessionState,
    exercise: Exercise,
    settings: GuidedSettings,
    generator: SequenceGenerator<StdRng>,
    running: Option<Running>,
    history: ScriptHistory,
    /// Bumped on every start and reset so late TTS results can tell they are stale.
    epoch: u64,
}

impl Session {
    fn view(&mut self) -> SessionView {
        let status = self.state.status;
        let mut view = SessionView {
            status,
            mode: self.state.mode,
            elapsed_formatted: format_elapsed(self.state.total_elapsed),
            cycle: self.state.cycle,
            error: self.state.error.clone(),
            ..SessionView::default()
        };

        match (status, self.running.as_ref()) {
            (SessionStatus::Generating, _) => view.current_text = GENERATING_TEXT.to_string(),
            (
                SessionStatus::Active | SessionStatus::Paused | SessionStatus::Completed,
                Some(running),
            ) => {
                let position = running.scheduler.current();
                let items = &running.plan.items;
                view.current_focus_item = position
                    .phase
                    .item_index
                    .and_then(|index| items.get(index))
                    .map(|item| item.name.clone());
                view.phase = Some(position.phase.kind);
                view.progress_percent = if status == SessionStatus::Completed {
                    100.0
                } else {
                    running.progress_percent()
                };
                view.feeling_better = running.plan.exercise == Exercise::BoxBreathing
                    && position.total_elapsed_secs >= self.settings.box_breathing.feeling_better_secs;
                view.current_text = if status == SessionStatus::Paused {
                    PAUSED_TEXT.to_string()
                } else {
                    running.plan.resolver.text_at(&position, items)
                };
                if status != SessionStatus::Paused {
                    self.history.push(&view.current_text);
                }
            }
            _ => view.current_text = self.exercise.description().to_string(),
        }

        view.script_history = self.history.lines();
        view
    }

    /// Box breathing stopped after enough full cycles still counts as done.
    fn early_stop_counts_as_complete(&self) -> bool {
        self.exercise == Exercise::BoxBreathing
            && self.state.cycle.saturating_sub(1) >= self.settings.box_breathing.min_cycles_for_completion
    }
}

struct TickerTask {
    token: CancellationToken,
    handle: JoinHandle<Box<dyn TickSource>>,
}

struct Inner {
    session: Mutex<Session>,
    ticker: Mutex<Option<TickerTask>>,
    views: watch::Sender<SessionView>,
    backend: Arc<dyn AudioBackend>,
    tts: Arc<dyn TtsClient>,
    engagement: Arc<dyn EngagementHook>,
    store: Option<Arc<SettingsStore>>,
}

pub struct SessionControllerBuilder {
    settings: GuidedSettings,
    backend: Option<Arc<dyn AudioBackend>>,
    tts: Option<Arc<dyn TtsClient>>,
    engagement: Option<Arc<dyn EngagementHook>>,
    store: Option<Arc<SettingsStore>>,
    seed: Option<u64>,
}

impl SessionControllerBuilder {
    pub fn backend(mut self, backend: Arc<dyn AudioBackend>) -> Self {
        self.backend = Some(backend);
        self
    }

    pub fn tts(mut self, tts: Arc<dyn TtsClient>) -> Self {
        self.tts = Some(tts);
        self
    }

    pub fn engagement(mut self, engagement: Arc<dyn EngagementHook>) -> Self {
        self.engagement = Some(engagement);
        self
    }

    /// Where voice, ambient and session choices are saved as they change.
    pub fn settings_store(mut self, store: Arc<SettingsStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Fixes the focus sequences drawn by this controller.
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn build(self) -> SessionController {
        let rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let backend = self
            .backend
            .unwrap_or_else(|| Arc::new(RodioBackend::new()));
        let tts = self
            .tts
            .unwrap_or_else(|| Arc::new(ElevenLabsClient::from_env(self.settings.narration.clone())));
        let engagement = self
            .engagement
            .unwrap_or_else(|| Arc::new(LoggingEngagement));

        let mut session = Session {
            state: SessionState::idle(SessionMode::SelfPaced),
            exercise: Exercise::BodyScan,
            settings: self.settings,
            generator: SequenceGenerator::with_rng(rng),
            running: None,
            history: ScriptHistory::default(),
            epoch: 0,
        };
        let (views, _) = watch::channel(session.view());

        SessionController {
            inner: Arc::new(Inner {
                session: Mutex::new(session),
                ticker: Mutex::new(None),
                views,
                backend,
                tts,
                engagement,
                store: self.store,
            }),
        }
    }
}

/// Owns the lifecycle of guided sessions: idle, generating, active, paused and
/// completed. One session at a time; every transition goes through here.
#[derive(Clone)]
pub struct SessionController {
    inner: Arc<Inner>,
}

impl SessionController {
    pub fn builder(settings: GuidedSettings) -> SessionControllerBuilder {
        SessionControllerBuilder {
            settings,
            backend: None,
            tts: None,
            engagement: None,
            store: None,
            seed: None,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionView> {
        self.inner.views.subscribe()
    }

    pub async fn snapshot(&self) -> SessionView {
        self.inner.session.lock().await.view()
    }

    pub async fn state(&self) -> SessionState {
        self.inner.session.lock().await.state.clone()
    }

    /// True while a ticker task is alive.
    pub async fn is_ticking(&self) -> bool {
        self.inner
            .ticker
            .lock()
            .await
            .as_ref()
            .is_some_and(|task| !task.handle.is_finished())
    }

    /// Builds a fresh timeline and starts the session. Narrated sessions wait for
    /// the narration to render and only become active once it has.
    pub async fn start(&self, exercise: Exercise, mode: SessionMode) -> SessionResult<()> {
        let mut guard = self.inner.session.lock().await;
        let session = &mut *guard;
        session.state.require("start", &[SessionStatus::Idle])?;

        let plan = SessionPlan::build(&exercise, mode, &session.settings, &mut session.generator)?;
        let script = match mode {
            SessionMode::Narrated => Some(plan.narration_script()?),
            SessionMode::SelfPaced => None,
        };

        session.epoch += 1;
        session.exercise = exercise;
        session.history.clear();
        session.state = SessionState::begin(mode, Utc::now());
        self.inner
            .engagement
            .notify(session.exercise.activity(), EngagementStage::Start);
        log_info!(
            "starting session {} {:?} ({:?}) with {} phases over {:.0}s",
            session.state.session_id.as_deref().unwrap_or_default(),
            session.exercise,
            mode,
            plan.timeline.len(),
            plan.timeline.total_secs()
        );

        let Some(script) = script else {
            let ambient = self.open_ambient(&session.settings).await;
            let scheduler = PhaseScheduler::new(Arc::clone(&plan.timeline));
            let running = Running {
                plan,
                scheduler,
                ambient,
                narration: None,
                sync: None,
                parked: None,
                completion_notified: false,
            };
            let source = Box::new(LocalTicker::new(session.settings.session.effective_pace()));
            self.activate(session, running, source).await;
            return Ok(());
        };

        session.state.status = SessionStatus::Generating;
        self.publish(session);
        let epoch = session.epoch;
        let settings = session.settings.clone();
        drop(guard);

        let outcome = self.prepare_narration(&script, &settings).await;

        let mut guard = self.inner.session.lock().await;
        let session = &mut *guard;
        if session.epoch != epoch || session.state.status != SessionStatus::Generating {
            log_info!("discarding narration for a session that was reset");
            if let Ok((_, narration, ambient)) = outcome {
                narration.stop();
                if let Some(ambient) = ambient {
                    ambient.shutdown().await;
                }
            }
            return Ok(());
        }

        match outcome {
            Err(err) => {
                log_error!("narration generation failed: {}", err);
                session.state.status = SessionStatus::Idle;
                session.state.error = Some(err.to_string());
                self.inner
                    .engagement
                    .notify(session.exercise.activity(), EngagementStage::Cancel);
                self.publish(session);
                Err(err)
            }
            Ok((asset, narration, ambient)) => {
                narration.set_volume(settings.narration.voice_volume);
                let scheduler = PhaseScheduler::new(Arc::clone(&plan.timeline));
                let source = Box::new(NarrationTicker::new(Arc::clone(&narration)));
                let running = Running {
                    plan,
                    scheduler,
                    ambient,
                    narration: Some(narration),
                    sync: Some(AudioSyncAdapter::new(
                        asset,
                        settings.narration.completion_epsilon_secs,
                    )),
                    parked: None,
                    completion_notified: false,
                };
                self.activate(session, running, source).await;
                Ok(())
            }
        }
    }

    /// Stops the tick source, keeps the position and fades the ambient bed out.
    pub async fn pause(&self) -> SessionResult<()> {
        self.inner
            .session
            .lock()
            .await
            .state
            .require("pause", &[SessionStatus::Active])?;

        // The ticker task takes the session lock on every tick, so it has to be
        // stopped before the lock is held here.
        let source = self.stop_ticker().await;

        let mut guard = self.inner.session.lock().await;
        let session = &mut *guard;
        // The session may have finished while the ticker was being stopped.
        session.state.require("pause", &[SessionStatus::Active])?;
        let pace = session.settings.session.effective_pace();
        let fade_out = session.settings.ambient.fade_out();
        let Some(running) = session.running.as_mut() else {
            return Err(SessionError::InvalidTransition {
                from: session.state.status,
                action: "pause",
            });
        };

        let mut source = source.unwrap_or_else(|| running.fresh_source(pace));
        source.stop();
        running.parked = Some(source);
        let position = running.scheduler.current();
        let ambient = running.ambient.clone();

        session.state.apply(&position);
        session.state.paused_snapshot = Some(PauseSnapshot::capture(&position));
        session.state.status = SessionStatus::Paused;
        if let Some(ambient) = ambient {
            ambient.fade_out(fade_out, true).await;
        }
        self.publish(session);
        log_info!("session paused at {:.1}s", position.total_elapsed_secs);
        Ok(())
    }

    /// Continues from the pause snapshot, restarting the tick source and fading
    /// the ambient bed back in.
    pub async fn resume(&self) -> SessionResult<()> {
        let mut guard = self.inner.session.lock().await;
        let session = &mut *guard;
        session.state.require("resume", &[SessionStatus::Paused])?;
        let strategy = session.settings.session.resume_strategy;
        let pace = session.settings.session.effective_pace();
        let fade_in = session.settings.ambient.fade_in();
        let snapshot = session.state.paused_snapshot.take();
        let Some(running) = session.running.as_mut() else {
            return Err(SessionError::InvalidTransition {
                from: session.state.status,
                action: "resume",
            });
        };

        let elapsed = match (running.plan.mode, snapshot) {
            (SessionMode::SelfPaced, Some(snapshot)) => {
                resume_elapsed(strategy, running.scheduler.timeline(), &snapshot)
            }
            // Narration picks up wherever the track was paused.
            _ => running.scheduler.total_elapsed(),
        };
        let position = running.scheduler.seek(elapsed);
        let mut source = running
            .parked
            .take()
            .unwrap_or_else(|| running.fresh_source(pace));
        let ambient = running.ambient.clone();

        session.state.apply(&position);
        session.state.status = SessionStatus::Active;
        if let Some(ambient) = ambient {
            ambient.fade_in(ambient.preferred_volume(), fade_in).await;
        }
        source.start(elapsed).await;
        self.publish(session);
        self.spawn_ticker(source).await;
        log_info!("session resumed at {:.1}s", elapsed);
        Ok(())
    }

    /// Tears the session down from any state and returns to idle. Also cancels
    /// a narration that is still being generated.
    pub async fn reset(&self) -> SessionResult<()> {
        drop(self.stop_ticker().await);

        let mut guard = self.inner.session.lock().await;
        let session = &mut *guard;
        let status = session.state.status;
        session.epoch += 1;

        let activity = session.exercise.activity();
        let stage = if session.early_stop_counts_as_complete() {
            EngagementStage::Complete
        } else {
            EngagementStage::Cancel
        };

        if let Some(mut running) = session.running.take() {
            if matches!(status, SessionStatus::Active | SessionStatus::Paused)
                && !running.completion_notified
            {
                self.inner.engagement.notify(activity, stage);
            }
            running.parked = None;
            if let Some(narration) = running.narration.take() {
                narration.stop();
            }
            if let Some(ambient) = running.ambient.take() {
                ambient.shutdown().await;
            }
        } else if status == SessionStatus::Generating {
            self.inner
                .engagement
                .notify(activity, EngagementStage::Cancel);
        }

        session.state = SessionState::idle(session.state.mode);
        session.history.clear();
        self.publish(session);
        if status != SessionStatus::Idle {
            log_info!("session reset from {:?}", status);
        }
        Ok(())
    }

    pub async fn set_voice_volume(&self, volume: f32) {
        let volume = volume.clamp(0.0, 1.0);
        let mut session = self.inner.session.lock().await;
        session.settings.narration.voice_volume = volume;
        if let Some(narration) = session.running.as_ref().and_then(|r| r.narration.as_ref()) {
            narration.set_volume(volume);
        }
        let narration = session.settings.narration.clone();
        self.remember("voice", |store| store.update_narration(narration));
    }

    pub async fn set_ambient_volume(&self, volume: f32) {
        let volume = volume.clamp(0.0, 1.0);
        let mut session = self.inner.session.lock().await;
        session.settings.ambient.volume = volume;
        if let Some(ambient) = session.running.as_ref().and_then(|r| r.ambient.as_ref()) {
            ambient.set_volume(volume);
        }
        let ambient = session.settings.ambient.clone();
        self.remember("ambient", |store| store.update_ambient(ambient));
    }

    /// Fades immediately while the session is playing. While paused the choice
    /// is only remembered and playback is never started.
    pub async fn set_ambient_enabled(&self, enabled: bool) {
        let mut guard = self.inner.session.lock().await;
        let session = &mut *guard;
        session.settings.ambient.enabled = enabled;
        let playing = session.state.status == SessionStatus::Active;
        if let Some(ambient) = session.running.as_ref().and_then(|r| r.ambient.clone()) {
            ambient
                .set_enabled(
                    enabled,
                    playing,
                    session.settings.ambient.fade_in(),
                    session.settings.ambient.fade_out(),
                )
                .await;
        }
        let ambient = session.settings.ambient.clone();
        self.remember("ambient", |store| store.update_ambient(ambient));
    }

    /// Self-paced speed multiplier. Takes effect from the next start.
    pub async fn set_pace(&self, pace: f64) {
        let mut session = self.inner.session.lock().await;
        session.settings.session.pace = pace;
        if session.settings.session.effective_pace() != pace {
            log_warn!("pace {} is not offered, sessions will run at 1x", pace);
        }
        let preferences = session.settings.session.clone();
        self.remember("session", |store| store.update_session(preferences));
    }

    /// How self-paced sessions pick up after a pause. Applies to the next resume.
    pub async fn set_resume_strategy(&self, strategy: ResumeStrategy) {
        let mut session = self.inner.session.lock().await;
        session.settings.session.resume_strategy = strategy;
        let preferences = session.settings.session.clone();
        self.remember("session", |store| store.update_session(preferences));
    }

    /// Writes a changed preference through to the attached settings file.
    fn remember(&self, what: &str, write: impl FnOnce(&SettingsStore) -> anyhow::Result<()>) {
        if let Some(store) = self.inner.store.as_deref() {
            if let Err(err) = write(store) {
                log_warn!("failed to save {} settings: {:#}", what, err);
            }
        }
    }

    /// Seeks the narration back to the start without leaving the session.
    pub async fn restart_narration(&self) -> SessionResult<()> {
        let mut guard = self.inner.session.lock().await;
        let session = &mut *guard;
        session
            .state
            .require("restart narration", &[SessionStatus::Active, SessionStatus::Paused])?;
        let status = session.state.status;
        let Some(running) = session.running.as_mut() else {
            return Err(SessionError::InvalidTransition {
                from: status,
                action: "restart narration",
            });
        };
        let (Some(narration), Some(sync)) = (running.narration.as_ref(), running.sync.as_mut())
        else {
            // Self-paced sessions have no track to restart.
            return Err(SessionError::InvalidTransition {
                from: status,
                action: "restart narration",
            });
        };

        narration.restart();
        let position = sync.rewind(&mut running.scheduler);
        session.state.apply(&position);
        if status == SessionStatus::Paused {
            session.state.paused_snapshot = Some(PauseSnapshot::capture(&position));
        }
        self.publish(session);
        log_info!("narration restarted");
        Ok(())
    }

    async fn activate(
        &self,
        session: &mut Session,
        mut running: Running,
        mut source: Box<dyn TickSource>,
    ) {
        let position = running.scheduler.seek(0.0);
        let ambient = running.ambient.clone();
        session.running = Some(running);

        session.state.apply(&position);
        session.state.status = SessionStatus::Active;
        session.state.error = None;
        if let Some(ambient) = ambient {
            ambient
                .fade_in(ambient.preferred_volume(), session.settings.ambient.fade_in())
                .await;
        }
        source.start(0.0).await;
        self.publish(session);
        self.spawn_ticker(source).await;
    }

    async fn prepare_narration(
        &self,
        script: &str,
        settings: &GuidedSettings,
    ) -> SessionResult<(
        NarrationAsset,
        Arc<dyn NarrationTransport>,
        Option<Arc<AmbientCrossfader>>,
    )> {
        let asset = self.inner.tts.text_to_speech(script).await?;
        let narration = self.inner.backend.open_narration(&asset).await?;
        let ambient = self.open_ambient(settings).await;
        Ok((asset, narration, ambient))
    }

    /// A missing ambient bed never stops a session.
    async fn open_ambient(&self, settings: &GuidedSettings) -> Option<Arc<AmbientCrossfader>> {
        match self.inner.backend.open_ambient(&settings.ambient.source).await {
            Ok(transport) => Some(Arc::new(AmbientCrossfader::new(
                transport,
                settings.ambient.volume,
                settings.ambient.enabled,
            ))),
            Err(err) => {
                log_warn!("ambient sound unavailable: {}", err);
                None
            }
        }
    }

    async fn spawn_ticker(&self, mut source: Box<dyn TickSource>) {
        let token = CancellationToken::new();
        let cancelled = token.clone();
        let controller = self.clone();

        let handle = tokio::spawn(async move {
            loop {
                let tick = tokio::select! {
                    biased;
                    _ = cancelled.cancelled() => break,
                    tick = source.next() => tick,
                };
                match tick {
                    Some(tick) => {
                        if !controller.on_tick(tick).await {
                            break;
                        }
                    }
                    None => break,
                }
            }
            source
        });

        let previous = self
            .inner
            .ticker
            .lock()
            .await
            .replace(TickerTask { token, handle });
        if let Some(previous) = previous {
            log_warn!("replacing a ticker that was still registered");
            previous.token.cancel();
            previous.handle.abort();
        }
    }

    async fn stop_ticker(&self) -> Option<Box<dyn TickSource>> {
        let task = self.inner.ticker.lock().await.take()?;
        task.token.cancel();
        match task.handle.await {
            Ok(source) => Some(source),
            Err(err) => {
                log_error!("ticker task ended abnormally: {}", err);
                None
            }
        }
    }

    /// Applies one tick. Returns false once the ticker should stop.
    async fn on_tick(&self, tick: Tick) -> bool {
        let mut guard = self.inner.session.lock().await;
        let session = &mut *guard;
        if session.state.status != SessionStatus::Active {
            return false;
        }
        let Some(running) = session.running.as_mut() else {
            return false;
        };

        let (position, completed) = match tick {
            Tick::Local { elapsed_secs } => {
                let position = running.scheduler.seek(elapsed_secs);
                (position, position.completed)
            }
            Tick::Narration(report) => match running.sync.as_mut() {
                Some(sync) => {
                    let position = sync.update(report, &mut running.scheduler);
                    (position, sync.is_complete())
                }
                None => return true,
            },
        };
        session.state.apply(&position);

        if completed {
            self.finish(session).await;
            return false;
        }
        self.publish(session);
        true
    }

    async fn finish(&self, session: &mut Session) {
        session.state.status = SessionStatus::Completed;
        let activity = session.exercise.activity();
        let fade_out = session.settings.ambient.fade_out();
        if let Some(running) = session.running.as_mut() {
            if !running.completion_notified {
                running.completion_notified = true;
                self.inner
                    .engagement
                    .notify(activity, EngagementStage::Complete);
            }
            if let Some(ambient) = running.ambient.clone() {
                ambient.fade_out(fade_out, true).await;
            }
        }
        self.publish(session);
        log_info!(
            "session completed after {}",
            format_elapsed(session.state.total_elapsed)
        );
    }

    fn publish(&self, session: &mut Session) {
        self.inner.views.send_replace(session.view());
    }
}
