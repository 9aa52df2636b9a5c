pub mod crossfade;
pub mod engine;
pub mod ocean;

pub use crossfade::{AmbientCrossfader, AmbientEnvelope, FadeDirection, FADE_STEP};
pub use engine::RodioBackend;

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::watch;

use crate::collaborators::NarrationAsset;
use crate::error::SessionResult;
use crate::settings::AmbientSource;

/// The looping background bed. Volume is driven by [`AmbientCrossfader`].
#[async_trait]
pub trait AmbientTransport: Send + Sync {
    /// Starts or continues playback. May be refused by the audio runtime.
    async fn play(&self) -> SessionResult<()>;
    fn pause(&self);
    fn stop(&self);
    fn set_volume(&self, volume: f32);
}

/// Playback position as reported by a narration transport.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct NarrationPosition {
    pub position_secs: f64,
    /// `None` until the decoder has worked out the track length.
    pub duration_secs: Option<f64>,
    pub ended: bool,
}

/// A pre-rendered narration track.
#[async_trait]
pub trait NarrationTransport: Send + Sync {
    /// Position updates at the transport's own cadence, not a fixed rate.
    fn subscribe(&self) -> watch::Receiver<NarrationPosition>;
    async fn play(&self) -> SessionResult<()>;
    fn pause(&self);
    fn restart(&self);
    fn stop(&self);
    fn set_volume(&self, volume: f32);
}

/// Creates per-session transports. Each session opens its own and disposes of
/// them on reset.
#[async_trait]
pub trait AudioBackend: Send + Sync {
    async fn open_ambient(&self, source: &AmbientSource) -> SessionResult<Arc<dyn AmbientTransport>>;

    async fn open_narration(
        &self,
        asset: &NarrationAsset,
    ) -> SessionResult<Arc<dyn NarrationTransport>>;
}
