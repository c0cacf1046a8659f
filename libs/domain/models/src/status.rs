// [libs/domain/models/src/status.rs]
//! Run state and progress, single-writer per spec.md §5.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunState {
    Starting,
    Running,
    Finished,
    Failed,
    Stuck,
}

/// Integer in `[0, 100]`, monotonically non-decreasing except the
/// final jump to 100 driven by `analysis_finished`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ProgressCounter(u8);

impl ProgressCounter {
    pub fn zero() -> Self {
        ProgressCounter(0)
    }

    pub fn value(self) -> u8 {
        self.0
    }

    /// Advances to `next`, clamped to `[current, 100]`. Use
    /// `force_complete` for the `analysis_finished` transition, which
    /// is the one allowed exception to monotonic advance-only.
    pub fn advance(&mut self, next: u8) {
        let clamped = next.min(100);
        if clamped > self.0 {
            self.0 = clamped;
        }
    }

    pub fn force_complete(&mut self) {
        self.0 = 100;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn advance_never_decreases() {
        let mut p = ProgressCounter::zero();
        p.advance(50);
        p.advance(10);
        assert_eq!(p.value(), 50);
    }

    #[test]
    fn advance_clamps_to_100() {
        let mut p = ProgressCounter::zero();
        p.advance(250);
        assert_eq!(p.value(), 100);
    }

    #[test]
    fn force_complete_always_wins() {
        let mut p = ProgressCounter::zero();
        p.advance(90);
        p.force_complete();
        assert_eq!(p.value(), 100);
    }
}
