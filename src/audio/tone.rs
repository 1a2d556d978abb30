//! Single oscillator tones rendered to mono PCM.

use std::f32::consts::TAU;

use derive_getters::Getters;

/// Floor the exponential envelope decays to.
pub const ENVELOPE_FLOOR: f32 = 0.0001;

/// Oscillator shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Waveform {
    /// Pure sine.
    Sine,
    /// Symmetric triangle.
    Triangle,
}

impl Waveform {
    /// Value at `phase` in cycles, in `[-1, 1]`.
    pub fn sample(self, phase: f32) -> f32 {
        let p = phase.rem_euclid(1.0);
        match self {
            Waveform::Sine => (TAU * p).sin(),
            Waveform::Triangle => 1.0 - 4.0 * (p - 0.5).abs(),
        }
    }
}

/// Gain over the life of a tone.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Envelope {
    /// Starts at `peak`, decays exponentially to [`ENVELOPE_FLOOR`].
    Exponential {
        /// Starting gain.
        peak: f32,
    },
    /// Starts at `peak`, falls linearly to silence.
    Linear {
        /// Starting gain.
        peak: f32,
    },
}

impl Envelope {
    /// Gain at `progress` in `[0, 1]`.
    pub fn gain(self, progress: f32) -> f32 {
        let t = progress.clamp(0.0, 1.0);
        match self {
            Envelope::Exponential { peak } => {
                let peak = peak.max(ENVELOPE_FLOOR);
                peak * (ENVELOPE_FLOOR / peak).powf(t)
            }
            Envelope::Linear { peak } => peak * (1.0 - t),
        }
    }

    /// Gain at the start of the tone.
    pub fn peak(self) -> f32 {
        match self {
            Envelope::Exponential { peak } | Envelope::Linear { peak } => peak,
        }
    }
}

/// One scheduled tone inside a cue.
#[derive(Debug, Clone, Copy, PartialEq, Getters)]
pub struct Tone {
    frequency: f32,
    /// Frequency reached at the end through an exponential sweep.
    end_frequency: Option<f32>,
    waveform: Waveform,
    duration: f32,
    /// Start time relative to the cue, in seconds.
    offset: f32,
    envelope: Envelope,
}

impl Tone {
    /// A steady tone with an exponentially decaying envelope.
    pub fn new(frequency: f32, waveform: Waveform, duration: f32, peak: f32) -> Self {
        Self {
            frequency,
            end_frequency: None,
            waveform,
            duration,
            offset: 0.0,
            envelope: Envelope::Exponential { peak },
        }
    }

    /// A sine sweeping exponentially from `from` to `to` with a linear fade.
    pub fn sweep(from: f32, to: f32, duration: f32, peak: f32) -> Self {
        Self {
            frequency: from,
            end_frequency: Some(to),
            waveform: Waveform::Sine,
            duration,
            offset: 0.0,
            envelope: Envelope::Linear { peak },
        }
    }

    /// Delays the tone by `seconds` within its cue.
    pub fn at(mut self, seconds: f32) -> Self {
        self.offset = seconds.max(0.0);
        self
    }

    /// End time relative to the cue, in seconds.
    pub fn end(&self) -> f32 {
        self.offset + self.duration
    }

    /// Instantaneous frequency at `progress` in `[0, 1]`.
    pub fn frequency_at(&self, progress: f32) -> f32 {
        match self.end_frequency {
            Some(end) if self.frequency > 0.0 && end > 0.0 => {
                self.frequency * (end / self.frequency).powf(progress.clamp(0.0, 1.0))
            }
            _ => self.frequency,
        }
    }

    /// Renders the tone alone, without its offset.
    pub fn render(&self, sample_rate: u32) -> Vec<f32> {
        let rate = sample_rate.max(1) as f32;
        let count = (self.duration.max(0.0) * rate).round() as usize;
        let mut out = Vec::with_capacity(count);
        let mut phase = 0.0f32;
        for i in 0..count {
            let progress = i as f32 / count as f32;
            out.push(self.waveform.sample(phase) * self.envelope.gain(progress));
            phase = (phase + self.frequency_at(progress) / rate).fract();
        }
        out
    }

    /// Adds the rendered tone into `buffer` at its offset, growing the buffer as needed.
    pub fn mix_into(&self, buffer: &mut Vec<f32>, sample_rate: u32) {
        let start = (self.offset * sample_rate as f32).round() as usize;
        let samples = self.render(sample_rate);
        if buffer.len() < start + samples.len() {
            buffer.resize(start + samples.len(), 0.0);
        }
        for (slot, s) in buffer[start..].iter_mut().zip(samples) {
            *slot += s;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn triangle_hits_its_corners() {
        assert!((Waveform::Triangle.sample(0.0) + 1.0).abs() < 1e-6);
        assert!((Waveform::Triangle.sample(0.5) - 1.0).abs() < 1e-6);
        assert!(Waveform::Triangle.sample(0.25).abs() < 1e-6);
    }

    #[test]
    fn exponential_envelope_reaches_floor() {
        let env = Envelope::Exponential { peak: 0.1 };
        assert!((env.gain(0.0) - 0.1).abs() < 1e-6);
        assert!((env.gain(1.0) - ENVELOPE_FLOOR).abs() < 1e-6);
        assert!(env.gain(0.5) < env.gain(0.25));
    }

    #[test]
    fn render_length_follows_duration() {
        let tone = Tone::new(440.0, Waveform::Sine, 0.5, 0.1);
        assert_eq!(tone.render(8_000).len(), 4_000);
    }

    #[test]
    fn sweep_moves_between_endpoints() {
        let tone = Tone::sweep(220.0, 55.0, 1.5, 0.2);
        assert!((tone.frequency_at(0.0) - 220.0).abs() < 1e-3);
        assert!((tone.frequency_at(1.0) - 55.0).abs() < 1e-3);
        assert!((tone.frequency_at(0.5) - 110.0).abs() < 1e-2);
    }

    #[test]
    fn offset_pads_with_silence() {
        let mut buffer = Vec::new();
        Tone::new(440.0, Waveform::Sine, 0.1, 0.1)
            .at(0.05)
            .mix_into(&mut buffer, 1_000);
        assert_eq!(buffer.len(), 150);
        assert!(buffer[..50].iter().all(|&s| s == 0.0));
    }
}
