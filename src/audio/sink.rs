//! Audio outputs.

use std::sync::{Arc, Mutex};

use derive_getters::Getters;
use strum::Display;
use tracing::trace;

/// Mixer channel a clip plays on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[strum(serialize_all = "snake_case")]
pub enum Channel {
    /// Short one-shot cues. Overlap freely.
    Effects,
    /// Looping drone bed and twinkles.
    Ambience,
    /// Narration.
    Voice,
}

/// A buffer of mono samples ready for playback.
#[derive(Debug, Clone, PartialEq, Getters)]
pub struct Clip {
    samples: Vec<f32>,
    sample_rate: u32,
    /// Playback speed multiplier (1.0 is native).
    speed: f32,
    /// Output gain multiplier.
    gain: f32,
    looped: bool,
}

impl Clip {
    /// A one-shot clip at native speed and unit gain.
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
            speed: 1.0,
            gain: 1.0,
            looped: false,
        }
    }

    /// Plays faster or slower.
    pub fn with_speed(mut self, speed: f32) -> Self {
        self.speed = speed;
        self
    }

    /// Scales the output level.
    pub fn with_gain(mut self, gain: f32) -> Self {
        self.gain = gain;
        self
    }

    /// Repeats until the channel is stopped.
    pub fn looping(mut self) -> Self {
        self.looped = true;
        self
    }

    /// Consumes the clip, returning its samples.
    pub fn into_samples(self) -> Vec<f32> {
        self.samples
    }
}

/// Somewhere clips can be sent. Playback is fire-and-forget.
pub trait AudioSink: Send + Sync {
    /// Starts playing `clip` on `channel`.
    fn play(&self, channel: Channel, clip: Clip);

    /// Silences everything on `channel`.
    fn stop(&self, channel: Channel);
}

/// Discards audio. Used when sound is disabled or unavailable.
#[derive(Debug, Clone, Copy, Default)]
pub struct SilentSink;

impl AudioSink for SilentSink {
    fn play(&self, channel: Channel, clip: Clip) {
        trace!(%channel, samples = clip.samples.len(), "Dropping clip");
    }

    fn stop(&self, channel: Channel) {
        trace!(%channel, "Stop on silent sink");
    }
}

/// What a [`RecordingSink`] observed.
#[derive(Debug, Clone, PartialEq)]
pub enum SinkEvent {
    /// A clip was played.
    Played {
        /// Channel used.
        channel: Channel,
        /// The clip.
        clip: Clip,
    },
    /// A channel was stopped.
    Stopped(Channel),
}

/// Keeps every request in memory so tests can inspect playback.
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    events: Arc<Mutex<Vec<SinkEvent>>>,
}

impl RecordingSink {
    /// Creates an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all events so far.
    pub fn events(&self) -> Vec<SinkEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    /// Number of clips played on `channel`.
    pub fn played_on(&self, channel: Channel) -> usize {
        self.events()
            .iter()
            .filter(|e| matches!(e, SinkEvent::Played { channel: c, .. } if *c == channel))
            .count()
    }

    fn push(&self, event: SinkEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}

impl AudioSink for RecordingSink {
    fn play(&self, channel: Channel, clip: Clip) {
        self.push(SinkEvent::Played { channel, clip });
    }

    fn stop(&self, channel: Channel) {
        self.push(SinkEvent::Stopped(channel));
    }
}

#[cfg(feature = "audio")]
pub use speaker::SpeakerSink;

#[cfg(feature = "audio")]
mod speaker {
    //! Speaker output through rodio.
    //!
    //! rodio's output stream must stay on the thread that opened it, so a
    //! dedicated thread owns it and receives clips over a channel.

    use std::collections::HashMap;

    use rodio::buffer::SamplesBuffer;
    use rodio::{OutputStream, Sink, Source};
    use tokio::sync::mpsc;
    use tracing::{debug, error, info, warn};

    use super::{AudioSink, Channel, Clip};

    enum Command {
        Play(Channel, Clip),
        Stop(Channel),
    }

    /// Plays clips on the default output device.
    #[derive(Debug, Clone)]
    pub struct SpeakerSink {
        tx: mpsc::UnboundedSender<Command>,
    }

    impl std::fmt::Debug for Command {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            match self {
                Command::Play(channel, _) => write!(f, "Play({channel})"),
                Command::Stop(channel) => write!(f, "Stop({channel})"),
            }
        }
    }

    impl SpeakerSink {
        /// Opens the default output device on a background thread.
        pub fn open() -> Result<Self, rodio::StreamError> {
            let (tx, mut rx) = mpsc::unbounded_channel::<Command>();
            let (ready_tx, ready_rx) = std::sync::mpsc::channel();

            std::thread::Builder::new()
                .name("nebula-audio".to_string())
                .spawn(move || {
                    let (_stream, handle) = match OutputStream::try_default() {
                        Ok(pair) => {
                            let _ = ready_tx.send(Ok(()));
                            pair
                        }
                        Err(e) => {
                            let _ = ready_tx.send(Err(e));
                            return;
                        }
                    };
                    info!("Audio output opened");

                    let mut held: HashMap<Channel, Vec<Sink>> = HashMap::new();
                    while let Some(command) = rx.blocking_recv() {
                        match command {
                            Command::Play(channel, clip) => {
                                let sink = match Sink::try_new(&handle) {
                                    Ok(sink) => sink,
                                    Err(e) => {
                                        warn!(error = %e, "Could not create sink");
                                        continue;
                                    }
                                };
                                let speed = *clip.speed();
                                let gain = *clip.gain();
                                let looped = *clip.looped();
                                let rate = *clip.sample_rate();
                                let source = SamplesBuffer::new(1, rate, clip.into_samples())
                                    .speed(speed)
                                    .amplify(gain);
                                if looped {
                                    sink.append(source.repeat_infinite());
                                } else {
                                    sink.append(source);
                                }
                                let slot = held.entry(channel).or_default();
                                slot.retain(|s| !s.empty());
                                slot.push(sink);
                            }
                            Command::Stop(channel) => {
                                debug!(%channel, "Stopping channel");
                                if let Some(sinks) = held.remove(&channel) {
                                    for sink in sinks {
                                        sink.stop();
                                    }
                                }
                            }
                        }
                    }
                    debug!("Audio thread exiting");
                })
                .map_err(|e| {
                    error!(error = %e, "Failed to spawn audio thread");
                    rodio::StreamError::NoDevice
                })?;

            match ready_rx.recv() {
                Ok(Ok(())) => Ok(Self { tx }),
                Ok(Err(e)) => Err(e),
                Err(_) => Err(rodio::StreamError::NoDevice),
            }
        }

        fn send(&self, command: Command) {
            if self.tx.send(command).is_err() {
                warn!("Audio thread is gone");
            }
        }
    }

    impl AudioSink for SpeakerSink {
        fn play(&self, channel: Channel, clip: Clip) {
            self.send(Command::Play(channel, clip));
        }

        fn stop(&self, channel: Channel) {
            self.send(Command::Stop(channel));
        }
    }
}
