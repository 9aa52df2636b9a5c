use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use serde::Serialize;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};

use super::AmbientTransport;

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_warn};

/// Interval between volume steps.
pub const FADE_STEP: Duration = Duration::from_millis(50);

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum FadeDirection {
    None,
    In,
    Out,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AmbientEnvelope {
    pub target_volume: f32,
    pub current_volume: f32,
    pub active_fade: FadeDirection,
}

/// Counts live fade tasks; decremented when a task ends or is aborted.
struct LiveFade(Arc<AtomicUsize>);

impl LiveFade {
    fn enter(counter: &Arc<AtomicUsize>) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(Arc::clone(counter))
    }
}

impl Drop for LiveFade {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Linear volume ramps for the ambient bed. At most one ramp runs at a time:
/// every new fade cancels the previous one before it starts.
pub struct AmbientCrossfader {
    transport: Arc<dyn AmbientTransport>,
    envelope: Arc<Mutex<AmbientEnvelope>>,
    fade: tokio::sync::Mutex<Option<JoinHandle<()>>>,
    live_fades: Arc<AtomicUsize>,
    enabled: AtomicBool,
    preferred_volume: Mutex<f32>,
}

impl AmbientCrossfader {
    pub fn new(transport: Arc<dyn AmbientTransport>, volume: f32, enabled: bool) -> Self {
        Self {
            transport,
            envelope: Arc::new(Mutex::new(AmbientEnvelope {
                target_volume: volume,
                current_volume: 0.0,
                active_fade: FadeDirection::None,
            })),
            fade: tokio::sync::Mutex::new(None),
            live_fades: Arc::new(AtomicUsize::new(0)),
            enabled: AtomicBool::new(enabled),
            preferred_volume: Mutex::new(volume.clamp(0.0, 1.0)),
        }
    }

    pub fn envelope(&self) -> AmbientEnvelope {
        *lock(&self.envelope)
    }

    pub fn current_volume(&self) -> f32 {
        self.envelope().current_volume
    }

    /// Number of ramp tasks currently alive. Never more than one.
    pub fn active_fades(&self) -> usize {
        self.live_fades.load(Ordering::SeqCst)
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    pub fn preferred_volume(&self) -> f32 {
        *lock(&self.preferred_volume)
    }

    /// Starts playback from silence and ramps to `target_volume`.
    /// Does nothing while ambient sound is disabled.
    pub async fn fade_in(&self, target_volume: f32, duration: Duration) {
        let target = target_volume.clamp(0.0, 1.0);
        let mut slot = self.fade.lock().await;
        cancel(&mut slot).await;

        if !self.is_enabled() {
            return;
        }

        {
            let mut envelope = lock(&self.envelope);
            envelope.current_volume = 0.0;
            envelope.target_volume = target;
            envelope.active_fade = FadeDirection::In;
        }
        self.transport.set_volume(0.0);
        if let Err(err) = self.transport.play().await {
            log_warn!("ambient playback refused: {}", err);
        }

        log_debug!("ambient fade in to {:.2} over {:?}", target, duration);
        *slot = Some(self.spawn_ramp(0.0, target, duration, false));
    }

    /// Ramps from the current volume to silence, pausing playback at zero when
    /// `stop_after` is set.
    pub async fn fade_out(&self, duration: Duration, stop_after: bool) {
        let mut slot = self.fade.lock().await;
        cancel(&mut slot).await;

        let from = {
            let mut envelope = lock(&self.envelope);
            envelope.target_volume = 0.0;
            if envelope.current_volume <= 0.0 {
                envelope.current_volume = 0.0;
                envelope.active_fade = FadeDirection::None;
                None
            } else {
                envelope.active_fade = FadeDirection::Out;
                Some(envelope.current_volume)
            }
        };

        match from {
            Some(from) => {
                log_debug!("ambient fade out from {:.2} over {:?}", from, duration);
                *slot = Some(self.spawn_ramp(from, 0.0, duration, stop_after));
            }
            None => {
                if stop_after {
                    self.transport.pause();
                }
            }
        }
    }

    /// Toggles the ambient bed. Only fades when narration is audible; while
    /// paused the flag is stored and playback is left alone.
    pub async fn set_enabled(
        &self,
        enabled: bool,
        narration_playing: bool,
        fade_in: Duration,
        fade_out: Duration,
    ) {
        self.enabled.store(enabled, Ordering::SeqCst);
        if !narration_playing {
            return;
        }
        if enabled {
            self.fade_in(self.preferred_volume(), fade_in).await;
        } else {
            self.fade_out(fade_out, true).await;
        }
    }

    /// Changes the level used by the next fade in. Applied immediately when no
    /// ramp is running and the bed is audible.
    pub fn set_volume(&self, volume: f32) {
        let volume = volume.clamp(0.0, 1.0);
        *lock(&self.preferred_volume) = volume;

        let mut envelope = lock(&self.envelope);
        if envelope.active_fade == FadeDirection::None && envelope.current_volume > 0.0 {
            envelope.current_volume = volume;
            envelope.target_volume = volume;
            self.transport.set_volume(volume);
        }
    }

    /// Cancels any ramp and stops the transport.
    pub async fn shutdown(&self) {
        let mut slot = self.fade.lock().await;
        cancel(&mut slot).await;
        {
            let mut envelope = lock(&self.envelope);
            envelope.current_volume = 0.0;
            envelope.active_fade = FadeDirection::None;
        }
        self.transport.stop();
    }

    fn spawn_ramp(&self, from: f32, to: f32, duration: Duration, stop_after: bool) -> JoinHandle<()> {
        let steps = (duration.as_millis() / FADE_STEP.as_millis()).max(1) as f32;
        let step = (to - from) / steps;
        let rising = to >= from;
        let envelope = Arc::clone(&self.envelope);
        let transport = Arc::clone(&self.transport);
        let live = LiveFade::enter(&self.live_fades);

        tokio::spawn(async move {
            let _live = live;
            let mut ticker = time::interval_at(Instant::now() + FADE_STEP, FADE_STEP);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;

                let (volume, done) = {
                    let mut current = lock(&envelope);
                    let next = current.current_volume + step;
                    let done = if rising { next >= to } else { next <= to };
                    // The last step lands on the target instead of accumulating past it.
                    current.current_volume = if done { to } else { next };
                    if done {
                        current.active_fade = FadeDirection::None;
                    }
                    (current.current_volume, done)
                };
                transport.set_volume(volume);

                if done {
                    if stop_after {
                        transport.pause();
                    }
                    break;
                }
            }
        })
    }
}

async fn cancel(slot: &mut Option<JoinHandle<()>>) {
    if let Some(handle) = slot.take() {
        handle.abort();
        // Wait for the abort to land so the old ramp cannot write another step.
        let _ = handle.await;
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
