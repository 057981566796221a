use rand::rngs::StdRng;
use rand::seq::{IndexedRandom, SliceRandom};
use rand::SeedableRng;
use sha2::{Digest, Sha256};

use crate::engine::weighting::{allocate, ChapterPool};
use crate::error::EngineResult;

pub const DAILY_TEST_SIZE: usize = 10;

/// A chapter's candidate questions for the daily draw. Callers must pass
/// `question_ids` sorted ascending so the draw does not depend on database
/// iteration order.
#[derive(Debug, Clone)]
pub struct DailyPool {
    pub chapter: String,
    pub weight: f64,
    pub question_ids: Vec<String>,
}

/// Derives the RNG seed for a calendar date from the first eight bytes of
/// its SHA-256 digest. Every instance computes the same seed for the same
/// `YYYY-MM-DD` string.
pub fn date_seed(date: &str) -> u64 {
    let digest = Sha256::digest(date.as_bytes());
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&digest[..8]);
    u64::from_be_bytes(bytes)
}

/// Picks the shared daily paper for `date`: ten questions split across
/// chapters by the same weight table as full tests, drawn with a
/// date-seeded RNG so concurrent first callers agree on the result.
pub fn pick_daily_questions(date: &str, pools: &[DailyPool]) -> EngineResult<Vec<String>> {
    let chapter_pools: Vec<ChapterPool> = pools
        .iter()
        .map(|p| ChapterPool {
            chapter: p.chapter.clone(),
            weight: p.weight,
            available: p.question_ids.len(),
        })
        .collect();
    let allocation = allocate(DAILY_TEST_SIZE, &chapter_pools)?;

    let mut rng = StdRng::seed_from_u64(date_seed(date));
    let mut picked: Vec<String> = Vec::with_capacity(DAILY_TEST_SIZE);
    for (pool, count) in pools.iter().zip(allocation) {
        picked.extend(
            pool.question_ids
                .choose_multiple(&mut rng, count)
                .cloned(),
        );
    }
    picked.shuffle(&mut rng);
    Ok(picked)
}
