//! Procedural sound: event cues, ambience and narration playback.

mod ambience;
mod cue;
mod sink;
mod tone;

pub use ambience::{
    DRONE_FADE_IN, DRONE_MASTER_GAIN, DRONE_VOICES, DroneVoice, LFO_DEPTH_HZ, LFO_HZ,
    TWINKLE_FREQUENCIES, TwinkleScheduler, render_drone,
};
pub use cue::Cue;
#[cfg(feature = "audio")]
pub use sink::SpeakerSink;
pub use sink::{AudioSink, Channel, Clip, RecordingSink, SilentSink, SinkEvent};
pub use tone::{ENVELOPE_FLOOR, Envelope, Tone, Waveform};

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use rand::SeedableRng;
use rand::rngs::StdRng;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, instrument};

use crate::llm_client::SpeechClip;

/// Sample rate cues and ambience are rendered at.
pub const SAMPLE_RATE: u32 = 44_100;

/// Narration plays this much faster than the model speaks.
pub const NARRATION_SPEED: f32 = 1.6;

/// Narration output level.
pub const NARRATION_GAIN: f32 = 0.55;

/// Length of the looped drone buffer: two full LFO periods.
const DRONE_LOOP_SECONDS: f32 = 2.0 / LFO_HZ;

/// Place of a narration request in line order.
///
/// Taken when the line is requested, so a late clip for an older line never
/// replaces a newer one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct SpeechTicket(u64);

/// Front door for all game audio.
///
/// Cheap to clone; clones share the sink and the ambience task.
#[derive(Clone)]
pub struct SoundBoard {
    sink: Arc<dyn AudioSink>,
    sample_rate: u32,
    ambience: Arc<Mutex<Option<JoinHandle<()>>>>,
    speech_issued: Arc<AtomicU64>,
    speech_played: Arc<AtomicU64>,
}

impl std::fmt::Debug for SoundBoard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SoundBoard")
            .field("sample_rate", &self.sample_rate)
            .field("ambience_running", &self.ambience_running())
            .finish()
    }
}

impl SoundBoard {
    /// Creates a board that renders at [`SAMPLE_RATE`].
    pub fn new(sink: Arc<dyn AudioSink>) -> Self {
        Self::with_sample_rate(sink, SAMPLE_RATE)
    }

    /// Creates a board with a custom render rate.
    pub fn with_sample_rate(sink: Arc<dyn AudioSink>, sample_rate: u32) -> Self {
        Self {
            sink,
            sample_rate: sample_rate.max(1),
            ambience: Arc::new(Mutex::new(None)),
            speech_issued: Arc::new(AtomicU64::new(0)),
            speech_played: Arc::new(AtomicU64::new(0)),
        }
    }

    /// A board that plays nothing.
    pub fn silent() -> Self {
        Self::new(Arc::new(SilentSink))
    }

    /// Plays `cue` on the effects channel.
    #[instrument(skip(self))]
    pub fn play_cue(&self, cue: Cue) {
        debug!(%cue, "Playing cue");
        let samples = cue.render(self.sample_rate);
        self.sink
            .play(Channel::Effects, Clip::new(samples, self.sample_rate));
    }

    /// Plays each cue in order without waiting between them.
    pub fn play_cues(&self, cues: &[Cue]) {
        for &cue in cues {
            self.play_cue(cue);
        }
    }

    /// Reserves the next place in narration order.
    pub fn speech_ticket(&self) -> SpeechTicket {
        SpeechTicket(self.speech_issued.fetch_add(1, Ordering::SeqCst) + 1)
    }

    /// Plays narration on the voice channel, replacing any narration in progress.
    ///
    /// Returns `false` and plays nothing when a line with a later ticket has
    /// already started.
    #[instrument(skip(self, clip), fields(ticket = ticket.0, samples = clip.samples().len()))]
    pub fn play_speech(&self, ticket: SpeechTicket, clip: &SpeechClip) -> bool {
        let newest = self.speech_played.fetch_max(ticket.0, Ordering::SeqCst);
        if newest >= ticket.0 {
            debug!(newest, "Dropping stale narration");
            return false;
        }
        self.sink.stop(Channel::Voice);
        let clip = Clip::new(clip.to_f32(), *clip.sample_rate())
            .with_speed(NARRATION_SPEED)
            .with_gain(NARRATION_GAIN);
        self.sink.play(Channel::Voice, clip);
        true
    }

    /// Whether the ambience task is alive.
    pub fn ambience_running(&self) -> bool {
        self.ambience
            .lock()
            .map(|slot| slot.as_ref().is_some_and(|h| !h.is_finished()))
            .unwrap_or(false)
    }

    /// Starts the drone bed and twinkles. Does nothing if already running.
    ///
    /// Must be called inside a tokio runtime.
    #[instrument(skip(self))]
    pub fn start_ambience(&self, seed: Option<u64>) {
        let Ok(mut slot) = self.ambience.lock() else {
            return;
        };
        if slot.as_ref().is_some_and(|h| !h.is_finished()) {
            debug!("Ambience already running");
            return;
        }

        info!("Starting ambience");
        let rate = self.sample_rate;
        let intro = render_drone(&DRONE_VOICES, DRONE_FADE_IN, rate, true);
        let bed = render_drone(&DRONE_VOICES, DRONE_LOOP_SECONDS, rate, false);
        self.sink.play(Channel::Ambience, Clip::new(intro, rate));

        let sink = Arc::clone(&self.sink);
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        // The bed takes over exactly when the intro's fade ends.
        let bed_at = Instant::now() + Duration::from_secs_f32(DRONE_FADE_IN);
        *slot = Some(tokio::spawn(async move {
            let mut scheduler = TwinkleScheduler::new(rng);
            let mut bed = Some(bed);
            let mut next_twinkle = Instant::now();
            loop {
                let wake = if bed.is_some() {
                    next_twinkle.min(bed_at)
                } else {
                    next_twinkle
                };
                tokio::time::sleep_until(wake).await;

                let now = Instant::now();
                if now >= bed_at {
                    if let Some(bed) = bed.take() {
                        debug!("Looping drone bed");
                        sink.play(Channel::Ambience, Clip::new(bed, rate).looping());
                    }
                }
                if now >= next_twinkle {
                    let tone = scheduler.next_tone();
                    sink.play(Channel::Ambience, Clip::new(tone.render(rate), rate));
                    next_twinkle = now + scheduler.next_gap();
                }
            }
        }));
    }

    /// Stops the drone bed and twinkles.
    #[instrument(skip(self))]
    pub fn stop_ambience(&self) {
        if let Ok(mut slot) = self.ambience.lock() {
            if let Some(handle) = slot.take() {
                info!("Stopping ambience");
                handle.abort();
            }
        }
        self.sink.stop(Channel::Ambience);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cue_goes_to_effects() {
        let recorder = RecordingSink::new();
        let board = SoundBoard::with_sample_rate(Arc::new(recorder.clone()), 8_000);
        board.play_cues(&[Cue::Scan, Cue::HintLow]);
        assert_eq!(recorder.played_on(Channel::Effects), 2);
        assert_eq!(recorder.played_on(Channel::Ambience), 0);
    }

    #[test]
    fn speech_is_sped_up_and_replaces_previous() {
        let recorder = RecordingSink::new();
        let board = SoundBoard::new(Arc::new(recorder.clone()));
        let ticket = board.speech_ticket();
        assert!(board.play_speech(ticket, &SpeechClip::new(vec![0, 100, -100], 24_000)));

        let events = recorder.events();
        assert_eq!(events[0], SinkEvent::Stopped(Channel::Voice));
        match &events[1] {
            SinkEvent::Played { channel, clip } => {
                assert_eq!(*channel, Channel::Voice);
                assert_eq!(*clip.speed(), NARRATION_SPEED);
                assert_eq!(*clip.sample_rate(), 24_000);
            }
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn ambience_starts_once_and_stops() {
        let recorder = RecordingSink::new();
        let board = SoundBoard::with_sample_rate(Arc::new(recorder.clone()), 1_000);

        board.start_ambience(Some(1));
        board.start_ambience(Some(2));
        assert!(board.ambience_running());

        tokio::time::sleep(std::time::Duration::from_secs(20)).await;
        let looped = recorder.events().iter().any(|e| {
            matches!(e, SinkEvent::Played { channel: Channel::Ambience, clip } if *clip.looped())
        });
        assert!(looped, "drone bed should be looping after the fade-in");

        board.stop_ambience();
        tokio::task::yield_now().await;
        assert!(!board.ambience_running());
        assert_eq!(
            recorder.events().last(),
            Some(&SinkEvent::Stopped(Channel::Ambience))
        );
    }

    #[test]
    fn older_speech_ticket_is_dropped() {
        let recorder = RecordingSink::new();
        let board = SoundBoard::new(Arc::new(recorder.clone()));
        let greeting = board.speech_ticket();
        let reply = board.speech_ticket();
        assert!(greeting < reply);

        let clip = SpeechClip::new(vec![1, 2, 3], 24_000);
        assert!(board.play_speech(reply, &clip));
        assert!(!board.play_speech(greeting, &clip));
        assert!(!board.play_speech(reply, &clip));
        assert_eq!(recorder.played_on(Channel::Voice), 1);
    }

    /// Notes when each ambience clip reached the sink.
    #[derive(Default)]
    struct TimedSink {
        plays: Mutex<Vec<(Instant, bool)>>,
    }

    impl AudioSink for TimedSink {
        fn play(&self, channel: Channel, clip: Clip) {
            if channel == Channel::Ambience {
                self.plays.lock().unwrap().push((Instant::now(), *clip.looped()));
            }
        }

        fn stop(&self, _channel: Channel) {}
    }

    #[tokio::test(start_paused = true)]
    async fn drone_bed_follows_fade_in_without_gap() {
        let sink = Arc::new(TimedSink::default());
        let rate = 1_000;
        let board = SoundBoard::with_sample_rate(sink.clone(), rate);

        let start = Instant::now();
        board.start_ambience(Some(7));
        tokio::time::sleep(Duration::from_secs(12)).await;
        board.stop_ambience();

        let plays = sink.plays.lock().unwrap().clone();
        let beds: Vec<_> = plays.iter().filter(|(_, looped)| *looped).collect();
        assert_eq!(beds.len(), 1, "bed should start exactly once");

        let offset = beds[0].0.duration_since(start).as_secs_f64();
        let one_sample = 1.0 / rate as f64;
        assert!(
            (offset - DRONE_FADE_IN as f64).abs() <= one_sample,
            "bed started at {offset}s"
        );
        assert!(plays.len() > 2, "twinkles should keep playing around the bed");
    }
}
