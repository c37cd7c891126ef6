use anyhow::{Context, Result};
use chrono::{DateTime, Duration, NaiveTime, Utc};
use std::cmp::Ordering;
use std::str::FromStr;

/// Wall-clock time of day ("HH:MM", 24h), interpreted in UTC
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DailyTime {
    time: NaiveTime,
}

impl DailyTime {
    pub fn new(hour: u32, minute: u32) -> Option<Self> {
        NaiveTime::from_hms_opt(hour, minute, 0).map(|time| Self { time })
    }

    /// Next instant strictly after `after` that falls on this time of day
    pub fn next_occurrence(&self, after: DateTime<Utc>) -> DateTime<Utc> {
        let today = after.date_naive().and_time(self.time).and_utc();
        if today > after {
            today
        } else {
            today + Duration::days(1)
        }
    }
}

/// Work due at a worker wake-up
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DailyJob {
    Collect,
    Publish,
    /// Both times coincide: collect first, then publish what was gathered
    CollectAndPublish,
}

impl DailyJob {
    pub fn collects(self) -> bool {
        matches!(self, DailyJob::Collect | DailyJob::CollectAndPublish)
    }

    pub fn publishes(self) -> bool {
        matches!(self, DailyJob::Publish | DailyJob::CollectAndPublish)
    }
}

impl std::fmt::Display for DailyJob {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            DailyJob::Collect => "collection",
            DailyJob::Publish => "publication",
            DailyJob::CollectAndPublish => "collection and publication",
        })
    }
}

/// Earliest upcoming wake-up after `now` and the job due then
pub fn next_job(collect_at: DailyTime, publish_at: DailyTime, now: DateTime<Utc>) -> (DateTime<Utc>, DailyJob) {
    let next_collect = collect_at.next_occurrence(now);
    let next_publish = publish_at.next_occurrence(now);
    match next_collect.cmp(&next_publish) {
        Ordering::Less => (next_collect, DailyJob::Collect),
        Ordering::Greater => (next_publish, DailyJob::Publish),
        Ordering::Equal => (next_collect, DailyJob::CollectAndPublish),
    }
}

impl FromStr for DailyTime {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let (hour, minute) = s.trim().split_once(':').context("expected HH:MM")?;
        let hour: u32 = hour.parse().with_context(|| format!("invalid hour in '{}'", s))?;
        let minute: u32 = minute.parse().with_context(|| format!("invalid minute in '{}'", s))?;
        DailyTime::new(hour, minute).with_context(|| format!("time out of range: '{}'", s))
    }
}
