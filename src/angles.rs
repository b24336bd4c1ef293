//! Spoke angles for radar charts.
//!
//! Spokes are evenly spaced and start at twelve o'clock (π/2), proceeding
//! clockwise. The angle list only depends on the number of categories, so the
//! [`AngleTable`] memoizes it per count in a small bounded cache.

use std::collections::HashMap;
use std::f64::consts::{FRAC_PI_2, TAU};
use std::sync::{Arc, Mutex, OnceLock};

use log::debug;

use crate::error::{ReportError, Result};

/// Immutable, shareable list of spoke angles in radians.
pub type AngleSet = Arc<[f64]>;

/// Default number of distinct category counts kept in the cache.
pub const DEFAULT_CAPACITY: usize = 128;

/// Computes the spoke angles for `n` categories without caching.
///
/// `angle[i] = π/2 − 2π·i/n`.
pub fn compute_angles(n: usize) -> Result<AngleSet> {
    if n == 0 {
        return Err(ReportError::invalid(
            "a radar chart needs at least one category",
        ));
    }
    let step = TAU / n as f64;
    Ok((0..n).map(|i| FRAC_PI_2 - step * i as f64).collect())
}

struct CacheEntry {
    angles: AngleSet,
    last_used: u64,
}

#[derive(Default)]
struct CacheState {
    entries: HashMap<usize, CacheEntry>,
    clock: u64,
}

/// Bounded memo of category count to spoke angles.
///
/// Lookups and insertions are serialized by a mutex. When the cache is full
/// the least recently used count is evicted.
pub struct AngleTable {
    capacity: usize,
    state: Mutex<CacheState>,
}

impl Default for AngleTable {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }
}

impl AngleTable {
    /// Creates an empty table holding at most `capacity` angle sets (minimum 1).
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            state: Mutex::new(CacheState::default()),
        }
    }

    /// Returns the process-wide table.
    pub fn global() -> Arc<AngleTable> {
        static GLOBAL: OnceLock<Arc<AngleTable>> = OnceLock::new();
        Arc::clone(GLOBAL.get_or_init(|| Arc::new(AngleTable::default())))
    }

    /// Returns the angles for `n` spokes, computing and caching them on first use.
    pub fn angles(&self, n: usize) -> Result<AngleSet> {
        if n == 0 {
            return compute_angles(n);
        }

        let mut state = self
            .state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        state.clock += 1;
        let now = state.clock;

        if let Some(entry) = state.entries.get_mut(&n) {
            entry.last_used = now;
            return Ok(Arc::clone(&entry.angles));
        }

        let angles = compute_angles(n)?;
        if state.entries.len() >= self.capacity {
            let oldest = state
                .entries
                .iter()
                .min_by_key(|(_, entry)| entry.last_used)
                .map(|(count, _)| *count);
            if let Some(count) = oldest {
                debug!("evicting cached angles for {count} spokes");
                state.entries.remove(&count);
            }
        }
        state.entries.insert(
            n,
            CacheEntry {
                angles: Arc::clone(&angles),
                last_used: now,
            },
        );
        Ok(angles)
    }

    /// Number of category counts currently cached.
    pub fn len(&self) -> usize {
        self.state
            .lock()
            .map(|state| state.entries.len())
            .unwrap_or_else(|poisoned| poisoned.into_inner().entries.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether angles for `n` spokes are cached right now.
    pub fn contains(&self, n: usize) -> bool {
        self.state
            .lock()
            .map(|state| state.entries.contains_key(&n))
            .unwrap_or_else(|poisoned| poisoned.into_inner().entries.contains_key(&n))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-12;

    #[test]
    fn angles_start_at_twelve_oclock_and_step_clockwise() {
        for n in 1..=12 {
            let angles = compute_angles(n).unwrap();
            assert_eq!(angles.len(), n);
            assert!((angles[0] - FRAC_PI_2).abs() < EPS);
            for pair in angles.windows(2) {
                assert!((pair[1] - pair[0] + TAU / n as f64).abs() < EPS);
            }
        }
    }

    #[test]
    fn zero_categories_is_invalid() {
        assert!(matches!(
            AngleTable::default().angles(0),
            Err(ReportError::InvalidInput(_))
        ));
    }

    #[test]
    fn repeated_lookups_share_the_cached_set() {
        let table = AngleTable::default();
        let a = table.angles(6).unwrap();
        let b = table.angles(6).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn least_recently_used_count_is_evicted() {
        let table = AngleTable::with_capacity(2);
        table.angles(3).unwrap();
        table.angles(4).unwrap();
        table.angles(3).unwrap();
        table.angles(5).unwrap();

        assert!(table.contains(3));
        assert!(!table.contains(4));
        assert!(table.contains(5));
        assert_eq!(table.len(), 2);
    }
}
