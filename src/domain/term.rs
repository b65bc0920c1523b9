use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// A lease period: a start instant plus a length in days.
/// Two terms are equal only when both start and days are identical.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Term {
    pub start: DateTime<Utc>,
    pub days: u32,
}

impl Term {
    pub fn new(start: DateTime<Utc>, days: u32) -> Self {
        Self { start, days }
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.start + Duration::days(i64::from(self.days))
    }
}

impl std::fmt::Display for Term {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} + {} days",
            self.start.date_naive(),
            self.days
        )
    }
}
