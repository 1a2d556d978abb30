//! Headless bisection games through the real turn controller.

use nebula_sage::simulate::{play_game, run};
use nebula_sage::{GameStatus, MAX_ATTEMPTS, MAX_GUESS, MIN_GUESS, OfflineSage};
use rand::SeedableRng;
use rand::rngs::StdRng;

#[tokio::test]
async fn test_bisection_wins_every_target() {
    for target in MIN_GUESS..=MAX_GUESS {
        let summary = play_game(target, MAX_ATTEMPTS, &OfflineSage).await.unwrap();
        assert_eq!(*summary.status(), GameStatus::Won, "target {target}");
        assert!(summary.guesses().len() <= 7, "target {target}");
        assert_eq!(summary.guesses().last(), Some(&target));
        assert_eq!(*summary.fallbacks(), summary.guesses().len());
    }
}

#[tokio::test]
async fn test_tight_budget_can_lose() {
    let summary = play_game(1, 3, &OfflineSage).await.unwrap();
    assert_eq!(*summary.status(), GameStatus::Lost);
    assert_eq!(summary.guesses().len(), 3);
}

#[tokio::test]
async fn test_seeded_runs_repeat() {
    let first = run(20, MAX_ATTEMPTS, &mut StdRng::seed_from_u64(9), &OfflineSage)
        .await
        .unwrap();
    let second = run(20, MAX_ATTEMPTS, &mut StdRng::seed_from_u64(9), &OfflineSage)
        .await
        .unwrap();

    let targets = |r: &nebula_sage::simulate::SimulationReport| {
        r.games().iter().map(|g| *g.target()).collect::<Vec<_>>()
    };
    assert_eq!(targets(&first), targets(&second));
    assert_eq!(*first.wins(), 20);
    assert_eq!(*first.losses(), 0);
    assert!(*first.max_guesses() <= 7);

    let json = serde_json::to_value(&first).unwrap();
    assert_eq!(json["games"].as_array().map(Vec::len), Some(20));
}
