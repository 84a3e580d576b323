//! Headless integration tests for hushplay.
//!
//! These tests exercise AppCore and the session runtime end-to-end against
//! real state files in temp directories, without any audio output.

use chrono::{NaiveDate, NaiveDateTime, TimeDelta};
use hushplay::app_core::AppCore;
use hushplay::clock::ManualClock;
use hushplay::error::{Error, Result};
use hushplay::events::PlaybackEvent;
use hushplay::playlist::MoveDirection;
use hushplay::runtime::{spawn_session, RuntimeEvent, SessionCmd};
use hushplay::scheduler::{NewSchedule, ScheduleAction, ScheduleEntry};
use hushplay::settings::Settings;
use hushplay::silence::Phase;
use hushplay::store::Store;
use hushplay::track::Track;
use std::fs;
use std::io;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

fn make_core() -> AppCore {
    AppCore::new_test()
}

// 2024-01-01 was a Monday.
fn monday_at(h: u32, m: u32, s: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 1, 1)
        .unwrap()
        .and_hms_opt(h, m, s)
        .unwrap()
}

fn write_audio(dir: &Path, name: &str) -> std::path::PathBuf {
    let path = dir.join(name);
    fs::write(&path, b"fake audio").unwrap();
    path
}

fn one_minute_limit(core: &mut AppCore, silence_duration: u32) {
    core.update_settings(Settings {
        silence_duration,
        fade_enabled: true,
        max_play_duration: 1,
    })
    .unwrap();
}

// ── Play-time limit ───────────────────────────────────────────────────────

#[test]
fn play_limit_cycle_repeats() {
    let mut core = make_core();
    one_minute_limit(&mut core, 5);
    core.toggle_play_pause();

    let mut now = monday_at(14, 0, 0);
    let mut started = 0;
    let mut ended = 0;
    for _ in 0..(2 * (60 + 5)) {
        for event in core.tick(now) {
            match event {
                PlaybackEvent::SilenceStarted { silence_seconds } => {
                    assert_eq!(silence_seconds, 5);
                    started += 1;
                }
                PlaybackEvent::SilenceEnded => ended += 1,
                _ => {}
            }
        }
        let state = core.state();
        assert!(!(state.is_playing && state.in_silence));
        now += TimeDelta::seconds(1);
    }
    assert_eq!(started, 2);
    assert_eq!(ended, 2);
    assert_eq!(core.phase(), Phase::Playing);
}

#[test]
fn lowering_ceiling_applies_next_tick() {
    let mut core = make_core();
    core.toggle_play_pause();
    for s in 0..50 {
        core.tick(monday_at(15, 0, s));
    }
    // Drop the hour-long ceiling to one minute with 50s already played.
    one_minute_limit(&mut core, 2);
    for s in 50..59 {
        core.tick(monday_at(15, 0, s));
    }
    assert_eq!(core.phase(), Phase::Playing);
    let events = core.tick(monday_at(15, 0, 59));
    assert_eq!(events, vec![PlaybackEvent::SilenceStarted { silence_seconds: 2 }]);
}

#[test]
fn running_silence_keeps_its_length() {
    let mut core = make_core();
    one_minute_limit(&mut core, 10);
    core.toggle_play_pause();
    for s in 0..60 {
        core.tick(monday_at(16, 0, s));
    }
    assert_eq!(core.state().silence_remaining_seconds, 10);

    one_minute_limit(&mut core, 600);
    core.tick(monday_at(16, 1, 0));
    assert_eq!(core.state().silence_remaining_seconds, 9);
}

#[test]
fn zero_silence_resumes_on_next_tick() {
    let mut core = make_core();
    one_minute_limit(&mut core, 0);
    core.toggle_play_pause();
    for s in 0..60 {
        core.tick(monday_at(17, 0, s));
    }
    assert_eq!(core.phase(), Phase::Silence);
    let events = core.tick(monday_at(17, 1, 0));
    assert_eq!(events, vec![PlaybackEvent::SilenceEnded]);
    assert_eq!(core.phase(), Phase::Playing);
}

// ── Schedule ──────────────────────────────────────────────────────────────

#[test]
fn schedule_rearms_after_a_minute() {
    let mut core = make_core();
    let id = core.add_schedule("09:00", vec![1], "pause").unwrap();
    core.toggle_play_pause();

    let fired_at = |core: &mut AppCore, t: NaiveDateTime| {
        core.tick(t)
            .iter()
            .any(|e| matches!(e, PlaybackEvent::ScheduleFired { entry_id, .. } if *entry_id == id))
    };

    assert!(fired_at(&mut core, monday_at(9, 0, 0)));
    assert_eq!(core.phase(), Phase::Paused);
    assert!(!fired_at(&mut core, monday_at(9, 0, 30)));
    // Re-armed at 09:01:00, but the minute no longer matches.
    assert!(!fired_at(&mut core, monday_at(9, 1, 0)));
    assert!(!core.get_schedule()[0].fired);

    // Same time next week fires again.
    let next_week = monday_at(9, 0, 0) + TimeDelta::days(7);
    assert!(fired_at(&mut core, next_week));
}

#[test]
fn schedule_ignores_other_days() {
    let mut core = make_core();
    core.add_schedule("09:00", vec![0, 6], "play").unwrap();
    assert!(core.tick(monday_at(9, 0, 0)).is_empty());
    assert_eq!(core.phase(), Phase::Paused);
}

#[test]
fn two_entries_same_minute_fire_in_id_order() {
    let mut core = make_core();
    let play = core.add_schedule("07:30", vec![1], "play").unwrap();
    let pause = core.add_schedule("07:30", vec![1], "pause").unwrap();

    let fired: Vec<u32> = core
        .tick(monday_at(7, 30, 0))
        .into_iter()
        .filter_map(|e| match e {
            PlaybackEvent::ScheduleFired { entry_id, .. } => Some(entry_id),
            _ => None,
        })
        .collect();
    assert_eq!(fired, vec![play, pause]);
    assert_eq!(core.phase(), Phase::Paused);
}

#[test]
fn fired_state_survives_reload() {
    let dir = tempfile::tempdir().unwrap();
    let state = dir.path().join("state.json");
    let mut core = AppCore::open(&state, None).unwrap();
    let keep = core.add_schedule("08:00", vec![1], "play").unwrap();
    let gone = core.add_schedule("08:00", vec![1], "pause").unwrap();
    core.tick(monday_at(8, 0, 0));

    // Another process deletes one entry behind our back.
    {
        let mut other = AppCore::open(&state, None).unwrap();
        other.remove_schedule(gone).unwrap();
    }
    core.reload().unwrap();

    let schedule = core.get_schedule();
    assert_eq!(schedule.len(), 1);
    assert_eq!(schedule[0].id, keep);
    assert!(schedule[0].fired);
    assert!(core.tick(monday_at(8, 0, 1)).is_empty());
}

// ── Store round-trip ──────────────────────────────────────────────────────

#[test]
fn full_library_lifecycle() {
    let src = tempfile::tempdir().unwrap();
    let data = tempfile::tempdir().unwrap();
    let state = data.path().join("state.json");
    let media = data.path().join("media");

    {
        let mut core = AppCore::open(&state, Some(media.as_path())).unwrap();
        for name in ["one.mp3", "two.flac", "three.m4a"] {
            core.import_track(&write_audio(src.path(), name)).unwrap();
        }
        assert!(core.import_track(&write_audio(src.path(), "notes.txt")).is_err());
        assert_eq!(core.get_tracks().len(), 3);

        core.select_track(2).unwrap();
        assert_eq!(core.get_status().track_title.as_deref(), Some("three"));

        assert!(core.move_track(2, MoveDirection::Up).unwrap());
        core.add_schedule("18:45", vec![5], "pause").unwrap();
        one_minute_limit(&mut core, 30);
    }

    let mut core = AppCore::open(&state, Some(media.as_path())).unwrap();
    let titles: Vec<String> = core.get_tracks().iter().map(|t| t.title.clone()).collect();
    assert_eq!(titles, vec!["one", "three", "two"]);
    assert_eq!(core.get_schedule()[0].time, "18:45");
    assert_eq!(core.config().max_play_seconds, 60);
    assert_eq!(core.config().silence_seconds, 30);
    // Playback state itself is not persisted.
    assert_eq!(core.phase(), Phase::Paused);

    let ids: Vec<u32> = core.get_tracks().iter().map(|t| t.id).collect();
    core.select_track(2).unwrap();
    core.delete_track(ids[2]).unwrap();
    core.delete_track(ids[1]).unwrap();
    assert_eq!(core.state().current_track_index, 0);
    assert_eq!(fs::read_dir(&media).unwrap().count(), 1);
}

// ── Transient store failures ──────────────────────────────────────────────

/// Reads work, every write fails as if the disk were gone.
struct FailingStore {
    schedules: Vec<ScheduleEntry>,
}

fn disk_gone() -> Error {
    Error::Io(io::Error::new(io::ErrorKind::PermissionDenied, "read-only"))
}

impl Store for FailingStore {
    fn tracks(&self) -> Result<Vec<Track>> {
        Ok(Vec::new())
    }
    fn schedules(&self) -> Result<Vec<ScheduleEntry>> {
        Ok(self.schedules.clone())
    }
    fn settings(&self) -> Result<Settings> {
        Ok(Settings::default())
    }
    fn create_schedule(&mut self, _new: NewSchedule) -> Result<ScheduleEntry> {
        Err(disk_gone())
    }
    fn delete_schedule(&mut self, _id: u32) -> Result<()> {
        Err(disk_gone())
    }
    fn update_settings(&mut self, _settings: Settings) -> Result<()> {
        Err(disk_gone())
    }
    fn import_track(&mut self, _path: &Path) -> Result<Track> {
        Err(disk_gone())
    }
    fn edit_track(&mut self, _id: u32, _title: String, _artist: String) -> Result<()> {
        Err(disk_gone())
    }
    fn delete_track(&mut self, _id: u32) -> Result<()> {
        Err(disk_gone())
    }
    fn reorder_tracks(&mut self, _ids: &[u32]) -> Result<()> {
        Err(disk_gone())
    }
}

#[test]
fn failed_writes_leave_state_unchanged() {
    let entry = ScheduleEntry {
        id: 1,
        time: "09:00".to_string(),
        days: vec![1],
        action: ScheduleAction::Play,
    };
    let mut core = AppCore::new(Box::new(FailingStore {
        schedules: vec![entry],
    }))
    .unwrap();
    let config = *core.config();

    let err = core
        .update_settings(Settings {
            max_play_duration: 5,
            ..Settings::default()
        })
        .unwrap_err();
    assert!(err.is_transient());
    assert_eq!(*core.config(), config);

    assert!(core.add_schedule("10:00", vec![1], "pause").is_err());
    assert!(core.remove_schedule(1).is_err());
    assert_eq!(core.get_schedule().len(), 1);

    let logs = core.get_logs(None);
    assert_eq!(logs.len(), 3);
    assert!(logs.iter().all(|l| l.level == "error"));

    // The tick pipeline keeps running on what was loaded.
    core.tick(monday_at(9, 0, 0));
    assert_eq!(core.phase(), Phase::Playing);
}

// ── Session runtime ───────────────────────────────────────────────────────

#[test]
fn runtime_drives_silence_with_manual_clock() {
    let events: Arc<Mutex<Vec<RuntimeEvent>>> = Arc::new(Mutex::new(Vec::new()));
    let events_clone = events.clone();

    let mut core = make_core();
    one_minute_limit(&mut core, 2);
    let clock = ManualClock::new(monday_at(11, 0, 0));

    let runtime = spawn_session(core, Box::new(clock.clone()), Duration::from_millis(2), move |evt| {
        events_clone.lock().unwrap().push(evt);
    })
    .unwrap();
    let handle = runtime.handle();
    assert!(handle.send(SessionCmd::TogglePlayPause));

    let mut saw_silence = false;
    for _ in 0..500 {
        if events
            .lock()
            .unwrap()
            .iter()
            .any(|e| matches!(e, RuntimeEvent::Playback(PlaybackEvent::SilenceStarted { .. })))
        {
            saw_silence = true;
            break;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    assert!(saw_silence, "expected a silence period within the wait window");

    drop(runtime);
    let count = events.lock().unwrap().len();
    std::thread::sleep(Duration::from_millis(20));
    assert_eq!(events.lock().unwrap().len(), count);
    assert!(handle.status().is_none());
    assert!(!handle.send(SessionCmd::NextTrack));
}

#[test]
fn runtime_reports_stopped_on_shutdown() {
    let stopped = Arc::new(Mutex::new(false));
    let stopped_clone = stopped.clone();
    let runtime = spawn_session(
        make_core(),
        Box::new(ManualClock::new(monday_at(0, 0, 0))),
        Duration::from_secs(60),
        move |evt| {
            if matches!(evt, RuntimeEvent::Stopped) {
                *stopped_clone.lock().unwrap() = true;
            }
        },
    )
    .unwrap();
    runtime.shutdown();
    assert!(*stopped.lock().unwrap());
}
