//! Discrete sound cues for game events.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

use super::tone::{Tone, Waveform};

/// Sound effect tied to a game event.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumIter, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Cue {
    /// A guess was submitted.
    Scan,
    /// The Sage speaks on an ongoing game.
    SageIntro,
    /// The guess was above the target.
    HintHigh,
    /// The guess was below the target.
    HintLow,
    /// The target was found.
    Victory,
    /// Attempts ran out.
    GameOver,
    /// A new game began.
    Reset,
}

impl Cue {
    /// The tones that make up this cue.
    pub fn tones(self) -> Vec<Tone> {
        use Waveform::{Sine, Triangle};

        match self {
            Cue::Scan => vec![
                Tone::new(880.0, Triangle, 0.2, 0.08),
                Tone::new(1760.0, Triangle, 0.1, 0.05).at(0.05),
            ],
            Cue::SageIntro => [440.0, 554.37, 659.25]
                .into_iter()
                .enumerate()
                .map(|(i, f)| Tone::new(f, Sine, 1.5, 0.08).at(i as f32 * 0.15))
                .collect(),
            Cue::HintHigh => vec![
                Tone::new(660.0, Sine, 0.3, 0.1),
                Tone::new(520.0, Sine, 0.2, 0.05).at(0.1),
            ],
            Cue::HintLow => vec![
                Tone::new(330.0, Sine, 0.3, 0.1),
                Tone::new(440.0, Sine, 0.2, 0.05).at(0.1),
            ],
            Cue::Victory => [523.25, 659.25, 783.99, 1046.5]
                .into_iter()
                .enumerate()
                .map(|(i, f)| Tone::new(f, Sine, 2.0, 0.1).at(i as f32 * 0.1))
                .collect(),
            Cue::GameOver => vec![Tone::sweep(220.0, 55.0, 1.5, 0.2)],
            Cue::Reset => vec![Tone::sweep(110.0, 440.0, 0.8, 0.1)],
        }
    }

    /// Length of the cue in seconds.
    pub fn duration(self) -> f32 {
        self.tones().iter().map(Tone::end).fold(0.0, f32::max)
    }

    /// Renders the cue to mono PCM, clamped to `[-1, 1]`.
    pub fn render(self, sample_rate: u32) -> Vec<f32> {
        let mut buffer = Vec::new();
        for tone in self.tones() {
            tone.mix_into(&mut buffer, sample_rate);
        }
        for s in &mut buffer {
            *s = s.clamp(-1.0, 1.0);
        }
        buffer
    }
}
