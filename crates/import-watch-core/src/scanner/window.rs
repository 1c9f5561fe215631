use crate::error::Error;
use crate::model::CandidateFile;
use chrono::{DateTime, Local};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Decides whether a located file counts as newly arrived.
///
/// The orchestrator only talks to this trait, so a persisted ledger of
/// handled files can stand in for the time window.
pub trait FreshnessPolicy {
    fn is_fresh(&self, file: &CandidateFile) -> bool;

    fn describe(&self) -> String;
}

/// The trailing window `(now - window, ..)`.
///
/// The old edge is exclusive. There is no upper edge: a file created at
/// `now`, or stamped slightly in the future by a skewed file server, is new.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    start: SystemTime,
    now: SystemTime,
}

impl TimeWindow {
    pub fn trailing(now: SystemTime, window: Duration) -> Self {
        let start = now.checked_sub(window).unwrap_or(UNIX_EPOCH);
        Self { start, now }
    }

    /// Window of `hours` ending at `now`. Rejects negative, NaN, infinite or
    /// unrepresentably large lengths.
    pub fn from_hours(now: SystemTime, hours: f64) -> Result<Self, Error> {
        if !hours.is_finite() || hours < 0.0 {
            return Err(Error::WindowHours(hours));
        }
        let window = Duration::try_from_secs_f64(hours * 3600.0).map_err(|_| Error::WindowHours(hours))?;
        Ok(Self::trailing(now, window))
    }

    pub fn start(&self) -> SystemTime {
        self.start
    }

    pub fn now(&self) -> SystemTime {
        self.now
    }

    pub fn contains(&self, created: SystemTime) -> bool {
        created > self.start
    }
}

impl FreshnessPolicy for TimeWindow {
    fn is_fresh(&self, file: &CandidateFile) -> bool {
        self.contains(file.created)
    }

    fn describe(&self) -> String {
        format!(
            "created after {}",
            DateTime::<Local>::from(self.start).format("%Y-%m-%d %H:%M:%S")
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HOUR: Duration = Duration::from_secs(3600);

    fn at(secs: u64) -> SystemTime {
        UNIX_EPOCH + Duration::from_secs(secs)
    }

    #[test]
    fn old_edge_is_exclusive() {
        let now = at(1_000_000);
        let window = TimeWindow::trailing(now, 24 * HOUR);
        assert!(!window.contains(now - 24 * HOUR));
        assert!(window.contains(now - 24 * HOUR + Duration::from_nanos(1)));
        assert!(!window.contains(now - 25 * HOUR));
    }

    #[test]
    fn files_created_at_scan_instant_are_included() {
        let now = at(1_000_000);
        let window = TimeWindow::trailing(now, HOUR);
        assert!(window.contains(now));
        assert!(window.contains(now + Duration::from_secs(5)));
    }

    #[test]
    fn window_longer_than_epoch_clamps() {
        let now = at(10);
        let window = TimeWindow::trailing(now, HOUR);
        assert_eq!(window.start(), UNIX_EPOCH);
        assert!(window.contains(at(1)));
    }

    #[test]
    fn from_hours_matches_trailing() {
        let now = at(1_000_000);
        assert_eq!(
            TimeWindow::from_hours(now, 2.0).unwrap(),
            TimeWindow::trailing(now, 2 * HOUR)
        );
        assert_eq!(TimeWindow::from_hours(now, 0.0).unwrap().start(), now);
    }

    #[test]
    fn from_hours_rejects_unusable_lengths() {
        let now = at(1_000_000);
        for hours in [f64::INFINITY, f64::NEG_INFINITY, f64::NAN, -1.0, f64::MAX] {
            assert!(
                matches!(TimeWindow::from_hours(now, hours), Err(Error::WindowHours(_))),
                "{} hours accepted",
                hours
            );
        }
    }

    #[test]
    fn policy_uses_creation_time() {
        let now = at(1_000_000);
        let window = TimeWindow::trailing(now, HOUR);
        let fresh = CandidateFile {
            path: "a.tif".into(),
            created: now - Duration::from_secs(60),
        };
        let stale = CandidateFile {
            path: "b.tif".into(),
            created: now - 2 * HOUR,
        };
        assert!(window.is_fresh(&fresh));
        assert!(!window.is_fresh(&stale));
    }
}
