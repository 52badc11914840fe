//! Five-field cron expressions evaluated in a named timezone

use crate::error::{BotError, Result};
use chrono::{DateTime, Datelike, Duration, LocalResult, NaiveDate, NaiveDateTime, TimeZone, Timelike, Utc};
use chrono_tz::Tz;
use std::fmt;
use std::str::FromStr;

/// How far ahead `next_after` searches before giving up (covers Feb 29 rules)
const SEARCH_HORIZON_DAYS: i64 = 366 * 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Field {
    bits: u64,
    /// False when the field was written starting with `*`
    restricted: bool,
}

impl Field {
    fn parse(spec: &str, min: u32, max: u32, name: &str) -> Result<Self> {
        if spec.is_empty() {
            return Err(BotError::Schedule(format!("empty {} field", name)));
        }

        let mut bits = 0u64;
        for part in spec.split(',') {
            let (range, step) = match part.split_once('/') {
                Some((range, step)) => {
                    let step: u32 = step
                        .parse()
                        .map_err(|_| BotError::Schedule(format!("bad step '{}' in {} field", step, name)))?;
                    if step == 0 {
                        return Err(BotError::Schedule(format!("zero step in {} field", name)));
                    }
                    (range, Some(step))
                }
                None => (part, None),
            };

            let (start, end) = if range == "*" {
                (min, max)
            } else if let Some((a, b)) = range.split_once('-') {
                (parse_value(a, name)?, parse_value(b, name)?)
            } else {
                let v = parse_value(range, name)?;
                // `5/15` means "from 5 through max, every 15"
                if step.is_some() { (v, max) } else { (v, v) }
            };

            if start < min || end > max || start > end {
                return Err(BotError::Schedule(format!(
                    "{} field '{}' outside {}-{}",
                    name, part, min, max
                )));
            }

            for v in (start..=end).step_by(step.unwrap_or(1) as usize) {
                bits |= 1u64 << v;
            }
        }

        Ok(Self {
            bits,
            restricted: !spec.starts_with('*'),
        })
    }

    fn contains(&self, v: u32) -> bool {
        self.bits & (1u64 << v) != 0
    }
}

fn parse_value(raw: &str, name: &str) -> Result<u32> {
    raw.parse()
        .map_err(|_| BotError::Schedule(format!("bad value '{}' in {} field", raw, name)))
}

/// A parsed `minute hour day-of-month month day-of-week` expression
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CronSchedule {
    expr: String,
    minutes: Field,
    hours: Field,
    days_of_month: Field,
    months: Field,
    days_of_week: Field,
}

impl CronSchedule {
    pub fn parse(expr: &str) -> Result<Self> {
        let fields: Vec<&str> = expr.split_whitespace().collect();
        if fields.len() != 5 {
            return Err(BotError::Schedule(format!(
                "expected 5 fields in '{}', got {}",
                expr,
                fields.len()
            )));
        }

        let mut days_of_week = Field::parse(fields[4], 0, 7, "day-of-week")?;
        // 7 is an alias for Sunday
        if days_of_week.contains(7) {
            days_of_week.bits = (days_of_week.bits & !(1u64 << 7)) | 1;
        }

        Ok(Self {
            expr: fields.join(" "),
            minutes: Field::parse(fields[0], 0, 59, "minute")?,
            hours: Field::parse(fields[1], 0, 23, "hour")?,
            days_of_month: Field::parse(fields[2], 1, 31, "day-of-month")?,
            months: Field::parse(fields[3], 1, 12, "month")?,
            days_of_week,
        })
    }

    pub fn expr(&self) -> &str {
        &self.expr
    }

    fn matches_day(&self, date: NaiveDate) -> bool {
        if !self.months.contains(date.month()) {
            return false;
        }
        let dom = self.days_of_month.contains(date.day());
        let dow = self
            .days_of_week
            .contains(date.weekday().num_days_from_sunday());
        if self.days_of_month.restricted && self.days_of_week.restricted {
            dom || dow
        } else {
            dom && dow
        }
    }

    /// Whether the schedule fires at this wall-clock minute
    pub fn matches(&self, local: &NaiveDateTime) -> bool {
        self.matches_day(local.date())
            && self.hours.contains(local.hour())
            && self.minutes.contains(local.minute())
    }

    /// First instant strictly after `after` at which the schedule fires in `tz`.
    ///
    /// Wall-clock times skipped by a DST gap never fire; a repeated wall-clock
    /// time fires once, at its earliest instant that is still after `after`.
    pub fn next_after(&self, after: DateTime<Utc>, tz: Tz) -> Option<DateTime<Utc>> {
        let local = after.with_timezone(&tz).naive_local();
        let mut cursor = local.with_second(0)?.with_nanosecond(0)? + Duration::minutes(1);
        let horizon = local + Duration::days(SEARCH_HORIZON_DAYS);

        while cursor <= horizon {
            if !self.matches_day(cursor.date()) {
                cursor = cursor.date().succ_opt()?.and_hms_opt(0, 0, 0)?;
                continue;
            }
            if !self.hours.contains(cursor.hour()) {
                cursor = cursor.with_minute(0)? + Duration::hours(1);
                continue;
            }
            if !self.minutes.contains(cursor.minute()) {
                cursor += Duration::minutes(1);
                continue;
            }

            let candidate = match tz.from_local_datetime(&cursor) {
                LocalResult::Single(dt) => Some(dt),
                LocalResult::Ambiguous(earliest, latest) => {
                    [earliest, latest].into_iter().find(|dt| dt.with_timezone(&Utc) > after)
                }
                LocalResult::None => None,
            };
            if let Some(dt) = candidate.map(|dt| dt.with_timezone(&Utc)) {
                if dt > after {
                    return Some(dt);
                }
            }
            cursor += Duration::minutes(1);
        }

        None
    }
}

impl FromStr for CronSchedule {
    type Err = BotError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for CronSchedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.expr)
    }
}
