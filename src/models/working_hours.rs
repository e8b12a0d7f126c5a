use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

pub const WEEKDAY_NAMES: [&str; 7] = ["mon", "tue", "wed", "thu", "fri", "sat", "sun"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BreakInterval {
    pub start: NaiveTime,
    pub end: NaiveTime,
}

/// One weekday of a shop's schedule. Weekday 0 is Monday.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkingHours {
    pub is_closed: bool,
    pub open: Option<NaiveTime>,
    pub close: Option<NaiveTime>,
    #[serde(default)]
    pub breaks: Vec<BreakInterval>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ScheduleError {
    #[error("weekday must be between 0 (mon) and 6 (sun), got {0}")]
    InvalidWeekday(u8),

    #[error("{0} time is required when the day is not closed")]
    MissingTime(&'static str),

    #[error("opening time {open} must be before closing time {close}")]
    OpenNotBeforeClose { open: NaiveTime, close: NaiveTime },

    #[error("break #{index} ({start}-{end}) must start before it ends")]
    EmptyBreak {
        index: usize,
        start: NaiveTime,
        end: NaiveTime,
    },

    #[error("break #{index} ({start}-{end}) lies outside opening hours")]
    BreakOutsideHours {
        index: usize,
        start: NaiveTime,
        end: NaiveTime,
    },

    #[error("break #{first} overlaps break #{second}")]
    OverlappingBreaks { first: usize, second: usize },
}

impl WorkingHours {
    pub fn closed() -> Self {
        Self {
            is_closed: true,
            open: None,
            close: None,
            breaks: vec![],
        }
    }

    pub fn open(open: NaiveTime, close: NaiveTime, breaks: Vec<BreakInterval>) -> Self {
        Self {
            is_closed: false,
            open: Some(open),
            close: Some(close),
            breaks,
        }
    }

    /// Checks the record and returns it with breaks sorted by start time.
    /// Break indices in errors refer to the order the caller supplied.
    pub fn validated(mut self) -> Result<Self, ScheduleError> {
        if self.is_closed {
            return Ok(self);
        }

        let open = self.open.ok_or(ScheduleError::MissingTime("open"))?;
        let close = self.close.ok_or(ScheduleError::MissingTime("close"))?;
        if open >= close {
            return Err(ScheduleError::OpenNotBeforeClose { open, close });
        }

        for (index, b) in self.breaks.iter().enumerate() {
            if b.start >= b.end {
                return Err(ScheduleError::EmptyBreak {
                    index,
                    start: b.start,
                    end: b.end,
                });
            }
            if b.start < open || b.end > close {
                return Err(ScheduleError::BreakOutsideHours {
                    index,
                    start: b.start,
                    end: b.end,
                });
            }
        }

        let mut order: Vec<usize> = (0..self.breaks.len()).collect();
        order.sort_by_key(|&i| self.breaks[i].start);
        for pair in order.windows(2) {
            let (a, b) = (pair[0], pair[1]);
            if self.breaks[a].end > self.breaks[b].start {
                return Err(ScheduleError::OverlappingBreaks {
                    first: a.min(b),
                    second: a.max(b),
                });
            }
        }

        self.breaks.sort_by_key(|b| b.start);
        Ok(self)
    }

    /// The day's working intervals, `[open, close)` minus every break.
    /// Assumes a validated record.
    pub fn open_intervals(&self) -> Vec<(NaiveTime, NaiveTime)> {
        let (open, close) = match (self.is_closed, self.open, self.close) {
            (false, Some(open), Some(close)) if open < close => (open, close),
            _ => return vec![],
        };

        let mut intervals = Vec::with_capacity(self.breaks.len() + 1);
        let mut cursor = open;
        for b in &self.breaks {
            if b.start > cursor {
                intervals.push((cursor, b.start));
            }
            if b.end > cursor {
                cursor = b.end;
            }
        }
        if cursor < close {
            intervals.push((cursor, close));
        }
        intervals
    }

    pub fn to_human_readable(&self) -> String {
        match (self.is_closed, self.open, self.close) {
            (false, Some(open), Some(close)) => {
                let mut text = format!("{}-{}", open.format("%H:%M"), close.format("%H:%M"));
                if !self.breaks.is_empty() {
                    let breaks = self
                        .breaks
                        .iter()
                        .map(|b| format!("{}-{}", b.start.format("%H:%M"), b.end.format("%H:%M")))
                        .collect::<Vec<_>>()
                        .join(", ");
                    text.push_str(&format!(" (breaks: {breaks})"));
                }
                text
            }
            _ => "closed".to_string(),
        }
    }
}

pub fn check_weekday(weekday: u8) -> Result<u8, ScheduleError> {
    if weekday > 6 {
        return Err(ScheduleError::InvalidWeekday(weekday));
    }
    Ok(weekday)
}
