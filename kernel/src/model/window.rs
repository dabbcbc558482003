use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use shared::error::{AppError, AppResult};

/// Half-open time range `[starts_at, ends_at)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    starts_at: DateTime<Utc>,
    ends_at: DateTime<Utc>,
}

impl TimeWindow {
    pub fn new(starts_at: DateTime<Utc>, ends_at: DateTime<Utc>) -> AppResult<Self> {
        if starts_at >= ends_at {
            return Err(AppError::InvalidWindow(format!(
                "開始時刻（{starts_at}）は終了時刻（{ends_at}）より前である必要があります。"
            )));
        }
        Ok(Self { starts_at, ends_at })
    }

    pub fn starts_at(&self) -> DateTime<Utc> {
        self.starts_at
    }

    pub fn ends_at(&self) -> DateTime<Utc> {
        self.ends_at
    }

    pub fn duration(&self) -> Duration {
        self.ends_at - self.starts_at
    }

    // 境界が接するだけなら重ならない
    pub fn overlaps(&self, other: &TimeWindow) -> bool {
        self.starts_at < other.ends_at && self.ends_at > other.starts_at
    }
}
