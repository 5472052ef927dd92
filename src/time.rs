//! DMG time codes.
//!
//! Survey times are stored as `HH * 100 + MM` integers ("DMG" time), so
//! `0615` is a quarter past six. Arithmetic has to go through linear
//! minutes-of-day, since `0615 - 14` is not `0601` in DMG terms.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{ReportError, Result};

/// Width of one survey bucket, in minutes.
pub const INTERVAL_MINUTES: u32 = 15;

/// Offset from a bucket's end time back to its first minute.
const BUCKET_START_OFFSET: u32 = INTERVAL_MINUTES - 1;

/// A validated DMG time code. The minute field is always below 60.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct DmgTime(u32);

impl DmgTime {
    pub fn new(value: u32) -> Result<Self> {
        if value % 100 >= 60 {
            return Err(ReportError::InvalidTimeCode { value });
        }
        Ok(Self(value))
    }

    /// Builds a DMG time from minutes past midnight.
    pub fn from_minutes(minutes: u32) -> Self {
        Self(to_dmg(minutes))
    }

    pub fn value(self) -> u32 {
        self.0
    }

    pub fn minutes(self) -> u32 {
        (self.0 / 100) * 60 + self.0 % 100
    }

    /// First minute of the fifteen-minute bucket that ends at `self`.
    pub fn interval_start(self) -> Result<Self> {
        let minutes = self.minutes();
        if minutes < BUCKET_START_OFFSET {
            return Err(ReportError::BeforeMidnight { value: self.0 });
        }
        Ok(Self::from_minutes(minutes - BUCKET_START_OFFSET))
    }
}

impl TryFrom<u32> for DmgTime {
    type Error = ReportError;

    fn try_from(value: u32) -> Result<Self> {
        Self::new(value)
    }
}

impl From<DmgTime> for u32 {
    fn from(time: DmgTime) -> Self {
        time.0
    }
}

impl fmt::Display for DmgTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Converts a raw DMG value to minutes past midnight.
pub fn to_minutes(dmg: u32) -> Result<u32> {
    Ok(DmgTime::new(dmg)?.minutes())
}

/// Converts minutes past midnight to a raw DMG value.
pub fn to_dmg(minutes: u32) -> u32 {
    (minutes / 60) * 100 + minutes % 60
}

/// Start of the fifteen-minute bucket ending at `dmg`, as a raw DMG value.
pub fn interval_start(dmg: u32) -> Result<u32> {
    Ok(DmgTime::new(dmg)?.interval_start()?.value())
}

/// Number of fifteen-minute buckets between `start` and `end`, inclusive.
pub fn interval_count(start: DmgTime, end: DmgTime) -> Result<u32> {
    let (from, to) = (start.minutes(), end.minutes());
    if to < from {
        return Err(ReportError::ReversedInterval {
            start: start.value(),
            end: end.value(),
        });
    }
    Ok((to - from) / INTERVAL_MINUTES + 1)
}
