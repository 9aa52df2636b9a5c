use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::watch;
use tokio::time::{self, Instant, Interval, MissedTickBehavior};

use crate::audio::{NarrationPosition, NarrationTransport};

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::log_warn;

/// Interval of the self-paced clock.
pub const LOCAL_TICK: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Tick {
    /// Session time counted locally.
    Local { elapsed_secs: f64 },
    /// A report from the narration transport, taken as ground truth.
    Narration(NarrationPosition),
}

/// The single source of time for a running session. Self-paced sessions count
/// locally, narrated sessions follow the audio; the controller sees only ticks.
#[async_trait]
pub trait TickSource: Send {
    /// Begins (or continues) producing ticks from `elapsed_secs`.
    async fn start(&mut self, elapsed_secs: f64);

    /// Stops producing ticks until the next `start`.
    fn stop(&mut self);

    /// Waits for the next tick. `None` once the source can never tick again.
    async fn next(&mut self) -> Option<Tick>;
}

/// One-second interval over an anchored clock. Elapsed time is the baseline
/// from earlier running windows plus time since the anchor, scaled by pace.
pub struct LocalTicker {
    pace: f64,
    baseline: f64,
    anchor: Option<Instant>,
    interval: Option<Interval>,
}

impl LocalTicker {
    pub fn new(pace: f64) -> Self {
        Self {
            pace: if pace.is_finite() && pace > 0.0 { pace } else { 1.0 },
            baseline: 0.0,
            anchor: None,
            interval: None,
        }
    }

    pub fn elapsed(&self) -> f64 {
        match self.anchor {
            Some(anchor) => self.baseline + anchor.elapsed().as_secs_f64() * self.pace,
            None => self.baseline,
        }
    }
}

#[async_trait]
impl TickSource for LocalTicker {
    async fn start(&mut self, elapsed_secs: f64) {
        let now = Instant::now();
        self.baseline = elapsed_secs.max(0.0);
        self.anchor = Some(now);

        let mut interval = time::interval_at(now + LOCAL_TICK, LOCAL_TICK);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        self.interval = Some(interval);
    }

    fn stop(&mut self) {
        self.baseline = self.elapsed();
        self.anchor = None;
        self.interval = None;
    }

    async fn next(&mut self) -> Option<Tick> {
        let interval = self.interval.as_mut()?;
        interval.tick().await;
        Some(Tick::Local {
            elapsed_secs: self.elapsed(),
        })
    }
}

/// Follows the narration transport's position reports, at whatever cadence the
/// transport produces them.
pub struct NarrationTicker {
    transport: Arc<dyn NarrationTransport>,
    positions: watch::Receiver<NarrationPosition>,
    running: bool,
}

impl NarrationTicker {
    pub fn new(transport: Arc<dyn NarrationTransport>) -> Self {
        let positions = transport.subscribe();
        Self {
            transport,
            positions,
            running: false,
        }
    }
}

#[async_trait]
impl TickSource for NarrationTicker {
    /// The track carries its own position, so `elapsed_secs` is not used.
    async fn start(&mut self, _elapsed_secs: f64) {
        // Anything reported while stopped is stale.
        self.positions.borrow_and_update();
        if let Err(err) = self.transport.play().await {
            log_warn!("narration playback refused: {}", err);
        }
        self.running = true;
    }

    fn stop(&mut self) {
        self.transport.pause();
        self.running = false;
    }

    async fn next(&mut self) -> Option<Tick> {
        if !self.running {
            return None;
        }
        self.positions.changed().await.ok()?;
        let report = *self.positions.borrow_and_update();
        Some(Tick::Narration(report))
    }
}
