use crate::display::day_name;
use crate::error::{Error, Result};
use chrono::{Datelike, NaiveDateTime, NaiveTime, TimeDelta};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Seconds after firing before an entry may fire again.
pub const REARM_AFTER_SECS: i64 = 60;

/// What a schedule entry does to playback when it fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScheduleAction {
    /// Start playing with a fresh play-time accumulator.
    Play,
    /// Stop playing.
    Pause,
}

impl fmt::Display for ScheduleAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScheduleAction::Play => write!(f, "play"),
            ScheduleAction::Pause => write!(f, "pause"),
        }
    }
}

impl ScheduleAction {
    /// Parse an action from a string (case-insensitive).
    pub fn from_str_loose(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "play" => Ok(ScheduleAction::Play),
            "pause" => Ok(ScheduleAction::Pause),
            _ => Err(Error::validation(format!(
                "Unknown schedule action '{}'. Expected: play, pause",
                s
            ))),
        }
    }
}

/// A configured time-of-day + day-of-week rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleEntry {
    pub id: u32,
    /// Time of day, zero-padded 24-hour "HH:MM".
    pub time: String,
    /// Days of the week (0=Sun..6=Sat), sorted and unique. Never empty.
    pub days: Vec<u8>,
    pub action: ScheduleAction,
}

impl ScheduleEntry {
    /// Format the days field for display.
    pub fn days_display(&self) -> String {
        self.days
            .iter()
            .filter_map(|&d| day_name(d))
            .collect::<Vec<_>>()
            .join(",")
    }

    pub fn matches(&self, time: &str, day: u8) -> bool {
        self.time == time && self.days.contains(&day)
    }
}

/// A schedule entry as submitted by the user, before validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewSchedule {
    pub time: String,
    pub days: Vec<u8>,
    pub action: ScheduleAction,
}

impl NewSchedule {
    /// Validate and normalise into an entry with the given id.
    pub fn into_entry(self, id: u32) -> Result<ScheduleEntry> {
        let time = parse_time(&self.time)?;
        let days = normalize_days(&self.days)?;
        Ok(ScheduleEntry {
            id,
            time,
            days,
            action: self.action,
        })
    }
}

/// Parse a time string in HH:MM (or HH:MM:SS) format into canonical "HH:MM".
pub fn parse_time(s: &str) -> Result<String> {
    let s = s.trim();
    if s.is_empty() {
        return Err(Error::validation("Schedule time is required"));
    }
    NaiveTime::parse_from_str(s, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M:%S"))
        .map(|t| t.format("%H:%M").to_string())
        .map_err(|_| Error::validation(format!("Invalid time '{}'. Expected HH:MM", s)))
}

/// Sort and de-duplicate days, rejecting an empty set or a day outside 0..=6.
pub fn normalize_days(days: &[u8]) -> Result<Vec<u8>> {
    if days.is_empty() {
        return Err(Error::validation("Select at least one day"));
    }
    if let Some(bad) = days.iter().find(|&&d| d > 6) {
        return Err(Error::validation(format!(
            "Invalid day {}. Use 0=Sun..6=Sat",
            bad
        )));
    }
    let mut days = days.to_vec();
    days.sort_unstable();
    days.dedup();
    Ok(days)
}

/// The "HH:MM" and day-of-week (0=Sunday) a timestamp falls in.
pub fn minute_key(now: NaiveDateTime) -> (String, u8) {
    (
        now.format("%H:%M").to_string(),
        now.weekday().num_days_from_sunday() as u8,
    )
}

/// An entry that matched the current minute on this tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Firing {
    pub entry_id: u32,
    pub action: ScheduleAction,
}

/// Owns the schedule entries and their fired-this-minute state.
///
/// A fired entry carries the instant it re-arms; the flag is cleared by the
/// first evaluation at or after that instant. Removing an entry drops its
/// flag with it.
#[derive(Debug, Clone, Default)]
pub struct ScheduleEvaluator {
    entries: Vec<ScheduleEntry>,
    rearm_at: HashMap<u32, NaiveDateTime>,
}

impl ScheduleEvaluator {
    pub fn new(entries: Vec<ScheduleEntry>) -> Self {
        ScheduleEvaluator {
            entries,
            rearm_at: HashMap::new(),
        }
    }

    /// Swap in a freshly loaded entry list, keeping fired state for ids that
    /// are still present.
    pub fn replace_entries(&mut self, entries: Vec<ScheduleEntry>) {
        self.rearm_at
            .retain(|id, _| entries.iter().any(|e| e.id == *id));
        self.entries = entries;
    }

    pub fn insert(&mut self, entry: ScheduleEntry) {
        self.remove(entry.id);
        self.entries.push(entry);
    }

    pub fn remove(&mut self, id: u32) -> Option<ScheduleEntry> {
        self.rearm_at.remove(&id);
        let pos = self.entries.iter().position(|e| e.id == id)?;
        Some(self.entries.remove(pos))
    }

    /// Get all entries sorted by time, then id.
    pub fn entries_by_time(&self) -> Vec<&ScheduleEntry> {
        let mut sorted: Vec<&ScheduleEntry> = self.entries.iter().collect();
        sorted.sort_by(|a, b| a.time.cmp(&b.time).then(a.id.cmp(&b.id)));
        sorted
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn is_fired(&self, id: u32) -> bool {
        self.rearm_at.contains_key(&id)
    }

    /// Evaluate every entry against `now`. Returns firings ordered by entry id.
    pub fn evaluate(&mut self, now: NaiveDateTime) -> Vec<Firing> {
        self.rearm_at.retain(|_, rearm| now < *rearm);

        let (time, day) = minute_key(now);
        let mut due: Vec<&ScheduleEntry> = self
            .entries
            .iter()
            .filter(|e| e.matches(&time, day) && !self.rearm_at.contains_key(&e.id))
            .collect();
        due.sort_by_key(|e| e.id);

        let rearm = now + TimeDelta::seconds(REARM_AFTER_SECS);
        let firings: Vec<Firing> = due
            .into_iter()
            .map(|e| Firing {
                entry_id: e.id,
                action: e.action,
            })
            .collect();
        for firing in &firings {
            self.rearm_at.insert(firing.entry_id, rearm);
        }
        firings
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    // 2024-01-01 was a Monday (day 1).
    fn monday_at(h: u32, m: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(h, m, s)
            .unwrap()
    }

    fn entry(id: u32, time: &str, days: Vec<u8>, action: ScheduleAction) -> ScheduleEntry {
        ScheduleEntry {
            id,
            time: time.to_string(),
            days,
            action,
        }
    }

    #[test]
    fn parse_time_hhmm() {
        assert_eq!(parse_time("14:00").unwrap(), "14:00");
        assert_eq!(parse_time(" 07:30 ").unwrap(), "07:30");
    }

    #[test]
    fn parse_time_drops_seconds() {
        assert_eq!(parse_time("14:30:15").unwrap(), "14:30");
    }

    #[test]
    fn parse_time_invalid() {
        assert!(parse_time("25:00").is_err());
        assert!(parse_time("abc").is_err());
        assert!(matches!(parse_time(""), Err(Error::Validation(_))));
    }

    #[test]
    fn action_from_str() {
        assert_eq!(ScheduleAction::from_str_loose("PLAY").unwrap(), ScheduleAction::Play);
        assert_eq!(ScheduleAction::from_str_loose("pause").unwrap(), ScheduleAction::Pause);
        assert!(ScheduleAction::from_str_loose("stop").is_err());
    }

    #[test]
    fn normalize_days_sorts_and_dedups() {
        assert_eq!(normalize_days(&[5, 1, 5, 0]).unwrap(), vec![0, 1, 5]);
        assert!(normalize_days(&[]).is_err());
        assert!(normalize_days(&[7]).is_err());
    }

    #[test]
    fn new_schedule_without_days_is_rejected() {
        let new = NewSchedule {
            time: "09:00".into(),
            days: vec![],
            action: ScheduleAction::Play,
        };
        assert!(matches!(new.into_entry(1), Err(Error::Validation(_))));
    }

    #[test]
    fn minute_key_uses_sunday_zero() {
        let (time, day) = minute_key(monday_at(9, 5, 42));
        assert_eq!(time, "09:05");
        assert_eq!(day, 1);
        let sunday = NaiveDate::from_ymd_opt(2023, 12, 31)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        assert_eq!(minute_key(sunday).1, 0);
    }

    #[test]
    fn fires_once_per_minute_and_rearms() {
        let mut eval = ScheduleEvaluator::new(vec![entry(
            1,
            "09:00",
            vec![1],
            ScheduleAction::Play,
        )]);

        let fired = eval.evaluate(monday_at(9, 0, 0));
        assert_eq!(
            fired,
            vec![Firing {
                entry_id: 1,
                action: ScheduleAction::Play
            }]
        );
        assert!(eval.is_fired(1));

        for s in 1..60 {
            assert!(eval.evaluate(monday_at(9, 0, s)).is_empty());
        }

        assert!(eval.evaluate(monday_at(9, 1, 1)).is_empty());
        assert!(!eval.is_fired(1));
    }

    #[test]
    fn wrong_day_or_time_does_not_fire() {
        let mut eval = ScheduleEvaluator::new(vec![entry(
            1,
            "09:00",
            vec![2, 3],
            ScheduleAction::Pause,
        )]);
        assert!(eval.evaluate(monday_at(9, 0, 0)).is_empty());
        assert!(eval.evaluate(monday_at(9, 1, 0)).is_empty());
    }

    #[test]
    fn multiple_entries_fire_independently() {
        let mut eval = ScheduleEvaluator::new(vec![
            entry(3, "12:00", vec![1], ScheduleAction::Pause),
            entry(1, "12:00", vec![0, 1], ScheduleAction::Play),
            entry(2, "13:00", vec![1], ScheduleAction::Play),
        ]);
        let fired = eval.evaluate(monday_at(12, 0, 30));
        let ids: Vec<u32> = fired.iter().map(|f| f.entry_id).collect();
        assert_eq!(ids, vec![1, 3]);
        assert!(!eval.is_fired(2));
    }

    #[test]
    fn remove_drops_fired_state() {
        let mut eval = ScheduleEvaluator::new(vec![entry(
            1,
            "09:00",
            vec![1],
            ScheduleAction::Play,
        )]);
        eval.evaluate(monday_at(9, 0, 0));
        let removed = eval.remove(1).unwrap();
        assert_eq!(removed.id, 1);
        assert!(!eval.is_fired(1));
        assert!(eval.is_empty());
        assert!(eval.remove(1).is_none());
    }

    #[test]
    fn replace_entries_keeps_flags_for_surviving_ids() {
        let mut eval = ScheduleEvaluator::new(vec![
            entry(1, "09:00", vec![1], ScheduleAction::Play),
            entry(2, "09:00", vec![1], ScheduleAction::Pause),
        ]);
        assert_eq!(eval.evaluate(monday_at(9, 0, 0)).len(), 2);

        eval.replace_entries(vec![
            entry(1, "09:00", vec![1], ScheduleAction::Play),
            entry(4, "09:00", vec![1], ScheduleAction::Play),
        ]);
        assert!(eval.is_fired(1));
        assert!(!eval.is_fired(2));

        let fired = eval.evaluate(monday_at(9, 0, 20));
        assert_eq!(fired.len(), 1);
        assert_eq!(fired[0].entry_id, 4);
    }

    #[test]
    fn entries_by_time_sorted() {
        let eval = ScheduleEvaluator::new(vec![
            entry(1, "18:00", vec![1], ScheduleAction::Pause),
            entry(2, "06:00", vec![1], ScheduleAction::Play),
            entry(3, "12:00", vec![1], ScheduleAction::Play),
        ]);
        let times: Vec<&str> = eval.entries_by_time().iter().map(|e| e.time.as_str()).collect();
        assert_eq!(times, vec!["06:00", "12:00", "18:00"]);
    }

    #[test]
    fn days_display_names() {
        let e = entry(1, "08:00", vec![1, 2, 3, 4, 5], ScheduleAction::Play);
        assert_eq!(e.days_display(), "Mon,Tue,Wed,Thu,Fri");
    }

    #[test]
    fn entry_serialization_roundtrip() {
        let e = entry(9, "21:15", vec![0, 6], ScheduleAction::Pause);
        let json = serde_json::to_string(&e).unwrap();
        assert!(json.contains("\"pause\""));
        let loaded: ScheduleEntry = serde_json::from_str(&json).unwrap();
        assert_eq!(loaded, e);
    }
}
