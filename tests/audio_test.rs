//! Tests for procedural cues and ambience rendering.

use std::str::FromStr;
use std::sync::Arc;

use nebula_sage::audio::{
    Channel, Cue, DRONE_VOICES, Envelope, LFO_HZ, RecordingSink, SAMPLE_RATE, SoundBoard, Tone,
    Waveform, render_drone,
};
use strum::IntoEnumIterator;

#[test]
fn test_every_cue_renders_in_range() {
    for cue in Cue::iter() {
        let samples = cue.render(SAMPLE_RATE);
        assert!(!samples.is_empty(), "{cue} rendered nothing");
        assert!(
            samples.iter().all(|s| s.is_finite() && (-1.0..=1.0).contains(s)),
            "{cue} left [-1, 1]"
        );
        assert!(samples.iter().any(|s| s.abs() > 0.001), "{cue} is silent");

        let expected = (cue.duration() * SAMPLE_RATE as f32).round() as usize;
        assert!(samples.len().abs_diff(expected) <= 2, "{cue} length");
    }
}

#[test]
fn test_cue_names_parse() {
    for cue in Cue::iter() {
        assert_eq!(Cue::from_str(&cue.to_string()).unwrap(), cue);
    }
    assert_eq!(Cue::from_str("game_over").unwrap(), Cue::GameOver);
    assert!(Cue::from_str("fanfare").is_err());
}

#[test]
fn test_exponential_envelope_decays() {
    let env = Envelope::Exponential { peak: 0.1 };
    let mut last = env.gain(0.0);
    assert!((last - 0.1).abs() < 1e-6);
    for step in 1..=10 {
        let g = env.gain(step as f32 / 10.0);
        assert!(g < last);
        last = g;
    }
    assert!(last <= 0.0001 + 1e-6);
}

#[test]
fn test_sweep_moves_pitch() {
    let tone = Tone::sweep(220.0, 55.0, 1.5, 0.2);
    assert!((tone.frequency_at(0.0) - 220.0).abs() < 1e-3);
    assert!((tone.frequency_at(1.0) - 55.0).abs() < 1e-3);
    assert!(tone.frequency_at(0.5) < 220.0);
    assert!((tone.end() - 1.5).abs() < 1e-6);
    assert_eq!(*tone.waveform(), Waveform::Sine);
}

#[test]
fn test_drone_loop_length() {
    let rate = 2_000;
    let seconds = 2.0 / LFO_HZ;
    let bed = render_drone(&DRONE_VOICES, seconds, rate, false);
    assert_eq!(bed.len(), (seconds * rate as f32).round() as usize);
    assert!(bed.iter().all(|s| s.is_finite() && s.abs() <= 1.0));
}

#[test]
fn test_board_routes_cues() {
    let recorder = RecordingSink::new();
    let board = SoundBoard::with_sample_rate(Arc::new(recorder.clone()), 8_000);
    board.play_cues(&[Cue::SageIntro, Cue::HintHigh]);
    board.play_cue(Cue::Victory);
    assert_eq!(recorder.played_on(Channel::Effects), 3);
    assert_eq!(recorder.played_on(Channel::Voice), 0);
}
