//! Background ambience: a slow drone bed with random twinkles on top.

use std::f32::consts::TAU;
use std::time::Duration;

use derive_getters::Getters;
use rand::Rng;

use super::tone::{Tone, Waveform};

/// Master gain the drone bed fades in to.
pub const DRONE_MASTER_GAIN: f32 = 0.4;

/// Seconds for the drone bed to fade in.
pub const DRONE_FADE_IN: f32 = 3.0;

/// Rate of the pitch wobble on each drone voice.
pub const LFO_HZ: f32 = 0.2;

/// Depth of the pitch wobble, in Hz.
pub const LFO_DEPTH_HZ: f32 = 5.0;

/// Pitches a twinkle is drawn from.
pub const TWINKLE_FREQUENCIES: [f32; 5] = [880.0, 1046.5, 1318.51, 1567.98, 1760.0];

/// One sustained voice of the drone bed.
#[derive(Debug, Clone, Copy, PartialEq, Getters)]
pub struct DroneVoice {
    frequency: f32,
    gain: f32,
}

/// The default drone chord: low A and E stacked over two octaves.
pub const DRONE_VOICES: [DroneVoice; 4] = [
    DroneVoice { frequency: 55.0, gain: 0.08 },
    DroneVoice { frequency: 82.41, gain: 0.06 },
    DroneVoice { frequency: 110.0, gain: 0.05 },
    DroneVoice { frequency: 164.81, gain: 0.03 },
];

/// Renders `seconds` of the drone bed.
///
/// With `fade_in` the master gain ramps linearly from silence over
/// [`DRONE_FADE_IN`]; without it the buffer sits at full level and loops
/// cleanly when `seconds` is a whole number of LFO periods.
pub fn render_drone(voices: &[DroneVoice], seconds: f32, sample_rate: u32, fade_in: bool) -> Vec<f32> {
    let rate = sample_rate.max(1) as f32;
    let count = (seconds.max(0.0) * rate).round() as usize;
    let mut out = vec![0.0f32; count];

    for voice in voices {
        let mut phase = 0.0f32;
        for (i, slot) in out.iter_mut().enumerate() {
            let t = i as f32 / rate;
            let freq = voice.frequency + LFO_DEPTH_HZ * (TAU * LFO_HZ * t).sin();
            *slot += Waveform::Sine.sample(phase) * voice.gain;
            phase = (phase + freq / rate).fract();
        }
    }

    for (i, slot) in out.iter_mut().enumerate() {
        let master = if fade_in {
            DRONE_MASTER_GAIN * (i as f32 / rate / DRONE_FADE_IN).min(1.0)
        } else {
            DRONE_MASTER_GAIN
        };
        *slot = (*slot * master).clamp(-1.0, 1.0);
    }
    out
}

/// Picks twinkle pitches and the gaps between them.
#[derive(Debug)]
pub struct TwinkleScheduler<R> {
    rng: R,
}

impl<R: Rng> TwinkleScheduler<R> {
    /// Creates a scheduler drawing from `rng`.
    pub fn new(rng: R) -> Self {
        Self { rng }
    }

    /// Next twinkle tone: a long, quiet sine.
    pub fn next_tone(&mut self) -> Tone {
        let idx = self.rng.gen_range(0..TWINKLE_FREQUENCIES.len());
        Tone::new(TWINKLE_FREQUENCIES[idx], Waveform::Sine, 5.0, 0.04)
    }

    /// Wait before the following twinkle, between 1.5 and 4.5 seconds.
    pub fn next_gap(&mut self) -> Duration {
        Duration::from_millis(1500 + self.rng.gen_range(0..3000))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn fade_in_starts_silent() {
        let bed = render_drone(&DRONE_VOICES, 1.0, 8_000, true);
        assert_eq!(bed.len(), 8_000);
        assert_eq!(bed[0], 0.0);
        let early: f32 = bed[..800].iter().map(|s| s.abs()).sum();
        let late: f32 = bed[7_200..].iter().map(|s| s.abs()).sum();
        assert!(early < late);
    }

    #[test]
    fn drone_stays_in_range() {
        let bed = render_drone(&DRONE_VOICES, 2.0, 4_000, false);
        assert!(bed.iter().all(|s| s.is_finite() && s.abs() <= 1.0));
        assert!(bed.iter().any(|s| s.abs() > 0.01));
    }

    #[test]
    fn twinkles_come_from_the_scale() {
        let mut scheduler = TwinkleScheduler::new(StdRng::seed_from_u64(7));
        for _ in 0..50 {
            let tone = scheduler.next_tone();
            assert!(TWINKLE_FREQUENCIES.contains(tone.frequency()));
            let gap = scheduler.next_gap();
            assert!(gap >= Duration::from_millis(1500));
            assert!(gap < Duration::from_millis(4500));
        }
    }
}
