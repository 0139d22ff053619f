//! Per-league display precision for fantasy points.
//!
//! Leagues score in whole, tenth or hundredth points. The precision is
//! detected once from observed values and reused for the life of the
//! process. Entries are never evicted.

use dashmap::DashMap;

/// Used when nothing has been sampled or values need more than two decimals
pub const DEFAULT_PRECISION: u8 = 2;

const MAX_PRECISION: u8 = 2;
const EPSILON: f64 = 1e-6;

/// Identifies a league season
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LeagueKey {
    pub league_id: u64,
    pub season: u16,
}

/// Smallest number of decimals (0..=2) that reproduces every sample
pub fn detect_precision(samples: &[f64]) -> u8 {
    let samples: Vec<f64> = samples.iter().copied().filter(|v| v.is_finite()).collect();
    if samples.is_empty() {
        return DEFAULT_PRECISION;
    }

    (0..=MAX_PRECISION)
        .find(|&decimals| {
            let factor = 10f64.powi(decimals as i32);
            samples
                .iter()
                .all(|v| ((v * factor).round() / factor - v).abs() < EPSILON)
        })
        .unwrap_or(DEFAULT_PRECISION)
}

/// Render points with a fixed number of decimals
pub fn format_points(value: f64, precision: u8) -> String {
    format!("{:.*}", precision as usize, value)
}

#[derive(Debug, Default)]
pub struct PrecisionCache {
    leagues: DashMap<LeagueKey, u8>,
}

impl PrecisionCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: LeagueKey) -> Option<u8> {
        self.leagues.get(&key).map(|p| *p)
    }

    /// Cached precision for a league, detecting it from `samples` on first use.
    ///
    /// An empty sample set is not cached so a later call can still detect.
    pub fn get_or_detect<F>(&self, key: LeagueKey, samples: F) -> u8
    where
        F: FnOnce() -> Vec<f64>,
    {
        if let Some(p) = self.get(key) {
            return p;
        }
        let samples = samples();
        let precision = detect_precision(&samples);
        if !samples.is_empty() {
            self.leagues.insert(key, precision);
        }
        precision
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.leagues.len()
    }
}
