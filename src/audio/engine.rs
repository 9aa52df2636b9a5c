use std::io::Cursor;
use std::sync::{
    mpsc::{self, RecvTimeoutError, Sender},
    Arc,
};
use std::thread;
use std::time::Duration;

use async_trait::async_trait;
use rodio::{Decoder, OutputStream, Sink, Source};
use tokio::sync::{oneshot, watch};

use super::ocean::OceanWaves;
use super::{AmbientTransport, AudioBackend, NarrationPosition, NarrationTransport};
use crate::collaborators::NarrationAsset;
use crate::error::{SessionError, SessionResult};
use crate::settings::AmbientSource;

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_info, log_warn};

/// Cadence of position reports from the audio thread, close to a browser's
/// `timeupdate`.
const POSITION_REPORT: Duration = Duration::from_millis(250);

type BoxedSource = Box<dyn Source<Item = f32> + Send>;

/// Builds a fresh source each time playback starts from the top.
#[derive(Clone)]
enum TrackMedia {
    Encoded(Arc<[u8]>),
    EncodedLoop(Arc<[u8]>),
    Ocean,
}

impl TrackMedia {
    fn open(&self) -> Result<BoxedSource, String> {
        match self {
            TrackMedia::Encoded(bytes) => {
                let decoder = Decoder::new(Cursor::new(Arc::clone(bytes)))
                    .map_err(|e| format!("Failed to decode audio: {}", e))?;
                Ok(Box::new(decoder.convert_samples::<f32>()))
            }
            TrackMedia::EncodedLoop(bytes) => {
                let decoder = Decoder::new(Cursor::new(Arc::clone(bytes)))
                    .map_err(|e| format!("Failed to decode audio: {}", e))?;
                Ok(Box::new(decoder.convert_samples::<f32>().repeat_infinite()))
            }
            TrackMedia::Ocean => Ok(Box::new(OceanWaves::new())),
        }
    }

    /// Track length, decoding the whole stream when the container has no header.
    /// Only one-shot tracks have a length.
    fn measure(&self) -> Option<f64> {
        let TrackMedia::Encoded(bytes) = self else {
            return None;
        };
        let decoder = Decoder::new(Cursor::new(Arc::clone(bytes))).ok()?;
        if let Some(total) = decoder.total_duration() {
            return Some(total.as_secs_f64());
        }
        let channels = f64::from(decoder.channels().max(1));
        let rate = f64::from(decoder.sample_rate().max(1));
        let samples = decoder.count() as f64;
        Some(samples / channels / rate)
    }
}

enum TrackCommand {
    Play(oneshot::Sender<Result<(), String>>),
    Pause,
    Restart,
    Stop,
    SetVolume(f32),
    /// Length worked out by the measuring thread.
    Measured(f64),
}

/// One track on its own audio thread. rodio's output stream is not `Send`, so
/// everything audio-related lives on that thread and is driven by commands.
struct TrackHandle {
    tx: Sender<TrackCommand>,
    position_rx: watch::Receiver<NarrationPosition>,
}

impl TrackHandle {
    fn spawn(name: &str, media: TrackMedia) -> SessionResult<Self> {
        let (tx, rx) = mpsc::channel::<TrackCommand>();
        let (position_tx, position_rx) = watch::channel(NarrationPosition::default());

        // Decoding a whole track can take seconds, so the length is measured
        // beside the audio thread and handed over as a command.
        if matches!(media, TrackMedia::Encoded(_)) {
            let measure_media = media.clone();
            let measure_tx = tx.clone();
            thread::Builder::new()
                .name(format!("{name}-measure"))
                .spawn(move || {
                    if let Some(secs) = measure_media.measure() {
                        let _ = measure_tx.send(TrackCommand::Measured(secs));
                    }
                })
                .map_err(|e| SessionError::Audio(e.to_string()))?;
        }

        thread::Builder::new()
            .name(name.to_string())
            .spawn(move || run_track(media, rx, position_tx))
            .map_err(|e| SessionError::Audio(e.to_string()))?;

        Ok(Self { tx, position_rx })
    }

    fn send(&self, command: TrackCommand) {
        // A closed channel means the thread already shut down.
        let _ = self.tx.send(command);
    }

    async fn play(&self) -> SessionResult<()> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(TrackCommand::Play(reply_tx))
            .map_err(|_| SessionError::PlaybackRejected("audio thread stopped".into()))?;
        reply_rx
            .await
            .map_err(|_| SessionError::PlaybackRejected("audio thread stopped".into()))?
            .map_err(SessionError::PlaybackRejected)
    }
}

impl Drop for TrackHandle {
    fn drop(&mut self) {
        let _ = self.tx.send(TrackCommand::Stop);
    }
}

/// The output stream and the sink playing on it. Dropping it silences the track.
struct Output {
    _stream: OutputStream,
    sink: Sink,
}

impl Output {
    fn open(media: &TrackMedia, volume: f32) -> Result<Self, String> {
        let (stream, handle) = OutputStream::try_default()
            .map_err(|e| format!("Failed to create audio output stream: {}", e))?;
        let sink = Sink::try_new(&handle).map_err(|e| format!("Failed to create audio sink: {}", e))?;
        sink.set_volume(volume);
        sink.pause();
        sink.append(media.open()?);
        Ok(Self {
            _stream: stream,
            sink,
        })
    }
}

fn run_track(
    media: TrackMedia,
    rx: mpsc::Receiver<TrackCommand>,
    position_tx: watch::Sender<NarrationPosition>,
) {
    let mut output: Option<Output> = None;
    let mut volume = 1.0_f32;
    let mut playing = false;
    let mut ended = false;
    let mut duration = None;
    let mut last_position = 0.0_f64;

    loop {
        match rx.recv_timeout(POSITION_REPORT) {
            Ok(TrackCommand::Play(reply)) => {
                let result = if output.is_some() {
                    Ok(())
                } else {
                    Output::open(&media, volume).map(|opened| {
                        output = Some(opened);
                    })
                };
                if let (Ok(()), Some(out)) = (&result, output.as_ref()) {
                    out.sink.play();
                    playing = true;
                }
                let _ = reply.send(result);
            }
            Ok(TrackCommand::Pause) => {
                if let Some(ref out) = output {
                    out.sink.pause();
                }
                playing = false;
            }
            Ok(TrackCommand::Restart) => {
                ended = false;
                last_position = 0.0;
                let rewound = match output {
                    Some(ref out) if !out.sink.empty() => match out.sink.try_seek(Duration::ZERO) {
                        Ok(()) => true,
                        Err(err) => {
                            log_warn!("narration seek failed ({:?}), reopening track", err);
                            false
                        }
                    },
                    // Never opened: the next play starts from the top anyway.
                    None => true,
                    Some(_) => false,
                };
                if !rewound {
                    output = None;
                    match Output::open(&media, volume) {
                        Ok(opened) => {
                            if playing {
                                opened.sink.play();
                            }
                            output = Some(opened);
                        }
                        Err(err) => {
                            log_warn!("narration restart failed: {}", err);
                            playing = false;
                        }
                    }
                }
            }
            Ok(TrackCommand::SetVolume(v)) => {
                volume = v.clamp(0.0, 1.0);
                if let Some(ref out) = output {
                    out.sink.set_volume(volume);
                }
            }
            Ok(TrackCommand::Measured(secs)) => {
                log_info!("narration length known: {:.1}s", secs);
                duration = Some(secs);
            }
            Ok(TrackCommand::Stop) | Err(RecvTimeoutError::Disconnected) => {
                if let Some(out) = output.take() {
                    out.sink.stop();
                }
                break;
            }
            Err(RecvTimeoutError::Timeout) => {}
        }

        if let Some(ref out) = output {
            if playing && out.sink.empty() {
                playing = false;
                ended = true;
            }
            if !ended {
                last_position = out.sink.get_pos().as_secs_f64();
            }
        }

        if position_tx.receiver_count() > 0 {
            let position_secs = match (ended, duration) {
                (true, Some(total)) => total,
                (_, Some(total)) => last_position.min(total),
                (_, None) => last_position,
            };
            position_tx.send_replace(NarrationPosition {
                position_secs,
                duration_secs: duration,
                ended,
            });
        }
    }
}

pub struct RodioNarration {
    track: TrackHandle,
}

#[async_trait]
impl NarrationTransport for RodioNarration {
    fn subscribe(&self) -> watch::Receiver<NarrationPosition> {
        self.track.position_rx.clone()
    }

    async fn play(&self) -> SessionResult<()> {
        self.track.play().await
    }

    fn pause(&self) {
        self.track.send(TrackCommand::Pause);
    }

    fn restart(&self) {
        self.track.send(TrackCommand::Restart);
    }

    fn stop(&self) {
        self.track.send(TrackCommand::Stop);
    }

    fn set_volume(&self, volume: f32) {
        self.track.send(TrackCommand::SetVolume(volume));
    }
}

pub struct RodioAmbient {
    track: TrackHandle,
}

#[async_trait]
impl AmbientTransport for RodioAmbient {
    async fn play(&self) -> SessionResult<()> {
        self.track.play().await
    }

    fn pause(&self) {
        self.track.send(TrackCommand::Pause);
    }

    fn stop(&self) {
        self.track.send(TrackCommand::Stop);
    }

    fn set_volume(&self, volume: f32) {
        self.track.send(TrackCommand::SetVolume(volume));
    }
}

/// Speaker output through rodio. The ambient loop is downloaded once per
/// session and decoded from memory.
pub struct RodioBackend {
    http: reqwest::Client,
}

impl RodioBackend {
    pub fn new() -> Self {
        Self {
            http: reqwest::Client::new(),
        }
    }

    async fn fetch(&self, url: &str) -> Result<Vec<u8>, String> {
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| e.to_string())?;
        if !response.status().is_success() {
            return Err(format!("HTTP {}", response.status().as_u16()));
        }
        let bytes = response.bytes().await.map_err(|e| e.to_string())?;
        Ok(bytes.to_vec())
    }
}

impl Default for RodioBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AudioBackend for RodioBackend {
    async fn open_ambient(&self, source: &AmbientSource) -> SessionResult<Arc<dyn AmbientTransport>> {
        let media = match source {
            AmbientSource::Url { url } => match self.fetch(url).await {
                Ok(bytes) => TrackMedia::EncodedLoop(Arc::from(bytes)),
                Err(err) => {
                    log_warn!("ambient loop {} unavailable ({}), using synthesized surf", url, err);
                    TrackMedia::Ocean
                }
            },
            AmbientSource::Ocean => TrackMedia::Ocean,
        };
        let track = TrackHandle::spawn("ambient-track", media)?;
        Ok(Arc::new(RodioAmbient { track }))
    }

    async fn open_narration(
        &self,
        asset: &NarrationAsset,
    ) -> SessionResult<Arc<dyn NarrationTransport>> {
        let bytes = tokio::fs::read(&asset.path)
            .await
            .map_err(|e| SessionError::Audio(format!("{}: {}", asset.path.display(), e)))?;
        let track = TrackHandle::spawn("narration-track", TrackMedia::Encoded(Arc::from(bytes)))?;
        Ok(Arc::new(RodioNarration { track }))
    }
}
