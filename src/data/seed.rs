//! Sample game data for development databases

use chrono::{Duration, Utc};
use rand::{Rng, seq::SliceRandom};

use super::{Database, NewScore};
use crate::error::AppError;

/// Number of players created by [`reseed`]
pub const SEED_USER_COUNT: usize = 20;

const FIRST_NAMES: &[&str] = &[
    "Alice", "Bruno", "Chiara", "Dmitri", "Elena", "Farah", "Gustav", "Hana", "Ibrahim", "Julia",
    "Kenji", "Lena", "Mateo", "Nadia", "Oskar", "Priya", "Quinn", "Rosa", "Sven", "Tomoko",
    "Uma", "Victor", "Wen", "Yara", "Zoltan",
];

const LEVEL_NAMES: &[&str] = &[
    "Tutorial",
    "Forest Path",
    "Crystal Caves",
    "Sky Fortress",
    "Final Ascent",
];

/// Row counts written by [`reseed`]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SeedSummary {
    pub users: usize,
    pub levels: usize,
    pub play_sessions: usize,
    pub scores: usize,
}

/// Wipe the game tables and fill them with random sample data
///
/// Admins and login sessions are untouched. Players are aged 18 to 80, each
/// with 1 to 4 play sessions of 1 to 5 scores. Roughly one attempt in ten is
/// abandoned and has no score.
pub async fn reseed<R: Rng>(db: &Database, rng: &mut R) -> Result<SeedSummary, AppError> {
    db.reset_game_data().await?;
    tracing::info!("Game data reset");

    let mut summary = SeedSummary::default();

    let mut level_ids = Vec::with_capacity(LEVEL_NAMES.len());
    for name in LEVEL_NAMES {
        level_ids.push(db.insert_level(name).await?);
    }
    summary.levels = level_ids.len();

    let now = Utc::now();
    for _ in 0..SEED_USER_COUNT {
        let name = FIRST_NAMES.choose(rng).copied().unwrap_or("Player");
        let age = rng.gen_range(18..=80);
        let user_id = db.insert_user(name, Some(age)).await?;
        summary.users += 1;

        for _ in 0..rng.gen_range(1..=4) {
            let started_at = now - Duration::minutes(rng.gen_range(0..60 * 24 * 90));
            let session_id = db.insert_play_session(user_id, started_at).await?;
            summary.play_sessions += 1;

            for attempt in 0..rng.gen_range(1..=5) {
                let Some(&level_id) = level_ids.choose(rng) else {
                    continue;
                };
                let score = NewScore {
                    session_id,
                    level_id,
                    score: (!rng.gen_bool(0.1)).then(|| rng.gen_range(0..=10_000)),
                    accuracy: rng.gen_range(0.0..=1.0),
                    time_taken: rng.gen_range(15.0..600.0),
                    created_at: started_at + Duration::minutes(attempt * 5),
                };
                db.insert_score(&score).await?;
                summary.scores += 1;
            }
        }
    }

    tracing::info!(
        users = summary.users,
        levels = summary.levels,
        play_sessions = summary.play_sessions,
        scores = summary.scores,
        "Game data seeded"
    );
    Ok(summary)
}
