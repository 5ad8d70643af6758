//! Repeat-specification expansion for schedules.
//!
//! The hub has no native recurring schedules; "repeat every N intervals,
//! M times" becomes M independently created schedules. The expansion here
//! only computes the occurrence timestamps; the client turns each one into
//! hub requests.

use crate::error::HueError;
use chrono::{Duration, NaiveDateTime};
use serde_json::Value;

/// How many schedules to create and how far apart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Repeat {
    pub times: u32,
    pub interval: Duration,
}

impl Repeat {
    pub fn new(times: u32, interval: Duration) -> Self {
        Repeat { times, interval }
    }

    /// Parse a repeat spec out of untyped input of the shape
    /// `{"times": N, "interval": {"hours": H, "minutes": M, "seconds": S}}`.
    /// Both `times` and `interval` are required; the interval must be
    /// positive.
    pub fn from_value(value: &Value) -> Result<Repeat, HueError> {
        let obj = value
            .as_object()
            .ok_or_else(|| HueError::InvalidSchedule("repeat spec must be an object".into()))?;
        let times = obj
            .get("times")
            .and_then(Value::as_u64)
            .ok_or_else(|| HueError::InvalidSchedule("repeat spec missing `times`".into()))?;
        let interval = obj
            .get("interval")
            .and_then(Value::as_object)
            .ok_or_else(|| HueError::InvalidSchedule("repeat spec missing `interval`".into()))?;

        let mut duration = Duration::zero();
        for (unit, to_duration) in [
            ("hours", Duration::hours as fn(i64) -> Duration),
            ("minutes", Duration::minutes),
            ("seconds", Duration::seconds),
        ] {
            if let Some(raw) = interval.get(unit) {
                let n = raw.as_i64().ok_or_else(|| {
                    HueError::InvalidSchedule(format!("interval `{}` must be an integer", unit))
                })?;
                duration += to_duration(n);
            }
        }
        if duration <= Duration::zero() {
            return Err(HueError::InvalidSchedule("repeat interval must be positive".into()));
        }

        let times = u32::try_from(times)
            .map_err(|_| HueError::InvalidSchedule(format!("repeat count {} out of range", times)))?;

        Ok(Repeat {
            times,
            interval: duration,
        })
    }
}

/// Expand a start time into the full list of occurrence timestamps.
///
/// Iterative on purpose: large repeat counts must not grow the stack.
/// While more than one occurrence remains, emit the working time, step it by
/// one interval and decrement; the last occurrence carries no further
/// repeat. No repeat spec, or a count of 1, degenerates to the single
/// occurrence at `start`.
pub fn occurrences(
    start: NaiveDateTime,
    repeat: Option<&Repeat>,
) -> Result<Vec<NaiveDateTime>, HueError> {
    let Some(repeat) = repeat else {
        return Ok(vec![start]);
    };
    if repeat.times == 0 {
        return Err(HueError::InvalidSchedule("repeat count must be at least 1".into()));
    }

    let mut times = Vec::with_capacity(repeat.times as usize);
    let mut at = start;
    let mut remaining = repeat.times;
    while remaining > 1 {
        times.push(at);
        at += repeat.interval;
        remaining -= 1;
    }
    times.push(at);
    Ok(times)
}
