//! # Difficulty Retarget
//!
//! Moving-window retarget: the average difficulty of the window is scaled by
//! `expected_span / actual_span`, with the actual span clamped to
//! `[expected/4, expected*4]` so one window can move difficulty by at most 4x.
//! More stake online means faster blocks, a shorter span and a higher result.

use serde::{Deserialize, Serialize};

use crate::domain::params::ProtocolParams;

/// One block's contribution to the retarget window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DifficultySample {
    pub timestamp: u64,
    pub difficulty: u64,
}

/// Difficulty for the block following `window`.
///
/// `window` holds the most recent samples, oldest first, ending at the
/// parent. Only the last `params.difficulty_window` entries are used.
pub fn next_difficulty(window: &[DifficultySample], params: &ProtocolParams) -> u64 {
    let start = window.len().saturating_sub(params.difficulty_window);
    let window = &window[start..];
    let n = window.len();
    if n < 2 {
        return params.genesis_difficulty;
    }

    let (first, last) = (window[0], window[n - 1]);
    let total: u128 = window.iter().map(|s| s.difficulty as u128).sum();
    let average = total / n as u128;

    let expected = params.target_block_time_secs as u128 * (n as u128 - 1);
    let actual = last.timestamp.saturating_sub(first.timestamp) as u128;
    let clamped = actual.clamp((expected / 4).max(1), expected * 4);

    let next = average * expected / clamped;
    u64::try_from(next)
        .unwrap_or(u64::MAX)
        .max(params.min_difficulty)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn samples(spacing: u64, difficulty: u64, n: usize) -> Vec<DifficultySample> {
        (0..n as u64)
            .map(|i| DifficultySample {
                timestamp: 1_000 + i * spacing,
                difficulty,
            })
            .collect()
    }

    #[test]
    fn test_short_window_uses_genesis_difficulty() {
        let params = ProtocolParams::default();
        assert_eq!(next_difficulty(&[], &params), params.genesis_difficulty);
        assert_eq!(
            next_difficulty(&samples(60, 5, 1), &params),
            params.genesis_difficulty
        );
    }

    #[test]
    fn test_on_target_keeps_difficulty() {
        let params = ProtocolParams::default();
        assert_eq!(next_difficulty(&samples(60, 5_000, 30), &params), 5_000);
    }

    #[test]
    fn test_fast_blocks_raise_difficulty() {
        let params = ProtocolParams::default();
        assert_eq!(next_difficulty(&samples(30, 5_000, 30), &params), 10_000);
    }

    #[test]
    fn test_adjustment_is_clamped() {
        let params = ProtocolParams::default();
        // 1s blocks would be 60x; clamp caps it at 4x
        assert_eq!(next_difficulty(&samples(1, 5_000, 30), &params), 20_000);
        // very slow blocks drop at most to a quarter
        assert_eq!(next_difficulty(&samples(6_000, 5_000, 30), &params), 1_250);
    }

    #[test]
    fn test_min_difficulty_floor() {
        let params = ProtocolParams {
            min_difficulty: 10,
            ..ProtocolParams::default()
        };
        assert_eq!(next_difficulty(&samples(6_000, 1, 30), &params), 10);
    }

    #[test]
    fn test_only_last_window_entries_count() {
        let params = ProtocolParams::default();
        let mut history = samples(1, 999_999, 10);
        let base = history.last().unwrap().timestamp;
        history.extend((1..=30u64).map(|i| DifficultySample {
            timestamp: base + i * 60,
            difficulty: 5_000,
        }));
        assert_eq!(next_difficulty(&history, &params), 5_000);
    }

    #[test]
    fn test_monotonic_in_block_rate() {
        let params = ProtocolParams::default();
        let slow = next_difficulty(&samples(90, 5_000, 30), &params);
        let mid = next_difficulty(&samples(60, 5_000, 30), &params);
        let fast = next_difficulty(&samples(40, 5_000, 30), &params);
        assert!(slow < mid && mid < fast);
    }
}
