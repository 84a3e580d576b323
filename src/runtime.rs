//! SessionRuntime — dedicated session thread with channel-based command dispatch.
//!
//! The thread owns the `AppCore` and is the only place that mutates it, so
//! ticks and user commands never interleave. External code talks to it through
//! `SessionHandle` (wraps `mpsc::Sender<SessionCmd>`). Ticks come from
//! `recv_timeout` running out at the next one-second deadline.

use crate::app_core::{AppCore, ScheduleData, StatusData};
use crate::clock::Clock;
use crate::events::PlaybackEvent;
use crate::settings::Settings;
use std::io;
use std::sync::mpsc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_secs(1);

// ── Commands & Events ────────────────────────────────────────────────────────

/// Commands sent to the session thread.
#[derive(Debug)]
pub enum SessionCmd {
    TogglePlayPause,
    NextTrack,
    PreviousTrack,
    SelectTrack(usize),
    TrackEnded,
    ResetPlayTime,
    AddSchedule {
        time: String,
        days: Vec<u8>,
        action: String,
    },
    RemoveSchedule(u32),
    UpdateSettings(Settings),
    /// Re-read tracks, schedules and settings from the store.
    Reload,
    Status(mpsc::Sender<StatusData>),
    Schedule(mpsc::Sender<Vec<ScheduleData>>),
    Shutdown,
}

/// Events emitted by the session thread back to the caller.
#[derive(Debug, Clone)]
pub enum RuntimeEvent {
    /// Snapshot taken after every tick.
    Tick(StatusData),
    Playback(PlaybackEvent),
    CommandFailed(String),
    Stopped,
}

// ── Handle ───────────────────────────────────────────────────────────────────

/// Thread-safe handle for sending commands to the session runtime.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    tx: mpsc::Sender<SessionCmd>,
}

impl SessionHandle {
    /// Queue a command. Returns false once the session has stopped.
    pub fn send(&self, cmd: SessionCmd) -> bool {
        self.tx.send(cmd).is_ok()
    }

    pub fn toggle_play_pause(&self) {
        let _ = self.tx.send(SessionCmd::TogglePlayPause);
    }

    pub fn next_track(&self) {
        let _ = self.tx.send(SessionCmd::NextTrack);
    }

    pub fn previous_track(&self) {
        let _ = self.tx.send(SessionCmd::PreviousTrack);
    }

    pub fn select_track(&self, index: usize) {
        let _ = self.tx.send(SessionCmd::SelectTrack(index));
    }

    pub fn track_ended(&self) {
        let _ = self.tx.send(SessionCmd::TrackEnded);
    }

    pub fn reset_play_time(&self) {
        let _ = self.tx.send(SessionCmd::ResetPlayTime);
    }

    pub fn reload(&self) {
        let _ = self.tx.send(SessionCmd::Reload);
    }

    /// Ask the session for a snapshot. None if it has stopped.
    pub fn status(&self) -> Option<StatusData> {
        let (reply, rx) = mpsc::channel();
        self.tx.send(SessionCmd::Status(reply)).ok()?;
        rx.recv().ok()
    }

    pub fn schedule(&self) -> Option<Vec<ScheduleData>> {
        let (reply, rx) = mpsc::channel();
        self.tx.send(SessionCmd::Schedule(reply)).ok()?;
        rx.recv().ok()
    }

    pub fn shutdown(&self) {
        let _ = self.tx.send(SessionCmd::Shutdown);
    }
}

// ── Runtime ──────────────────────────────────────────────────────────────────

/// Owns the session thread. Dropping it shuts the session down and waits for
/// the thread to exit, so no tick fires after the drop returns.
#[derive(Debug)]
pub struct SessionRuntime {
    handle: SessionHandle,
    thread: Option<JoinHandle<()>>,
}

impl SessionRuntime {
    pub fn handle(&self) -> SessionHandle {
        self.handle.clone()
    }

    /// Stop the session and wait for its thread.
    pub fn shutdown(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        self.handle.shutdown();
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                tracing::error!("session thread panicked");
            }
        }
    }
}

impl Drop for SessionRuntime {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Spawn the session on a dedicated thread.
///
/// `on_event` is called from the session thread for every playback event,
/// every failed command and once per tick with a fresh status snapshot.
/// A zero `tick_interval` is rejected with [`io::ErrorKind::InvalidInput`].
pub fn spawn_session<F>(
    core: AppCore,
    clock: Box<dyn Clock>,
    tick_interval: Duration,
    on_event: F,
) -> io::Result<SessionRuntime>
where
    F: Fn(RuntimeEvent) + Send + 'static,
{
    if tick_interval.is_zero() {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            "tick interval must be non-zero",
        ));
    }

    let (tx, rx) = mpsc::channel::<SessionCmd>();

    let thread = std::thread::Builder::new()
        .name("session-runtime".into())
        .spawn(move || {
            session_loop(rx, core, clock, tick_interval, on_event);
        })?;

    Ok(SessionRuntime {
        handle: SessionHandle { tx },
        thread: Some(thread),
    })
}

/// Main loop for the session thread. Owns the AppCore.
fn session_loop<F>(
    rx: mpsc::Receiver<SessionCmd>,
    mut core: AppCore,
    clock: Box<dyn Clock>,
    tick_interval: Duration,
    on_event: F,
) where
    F: Fn(RuntimeEvent),
{
    tracing::info!(interval_ms = tick_interval.as_millis() as u64, "session runtime started");
    let mut next_tick = Instant::now() + tick_interval;

    'session: loop {
        let now = Instant::now();
        if now >= next_tick {
            for event in core.tick(clock.now()) {
                on_event(RuntimeEvent::Playback(event));
            }
            on_event(RuntimeEvent::Tick(core.get_status()));

            let after = Instant::now();
            next_tick += tick_interval;
            // Fell more than a full interval behind: re-anchor instead of bursting.
            if next_tick <= after {
                next_tick = after + tick_interval;
            }

            // Commands queued while the tick ran are served before the next tick.
            loop {
                match rx.try_recv() {
                    Ok(SessionCmd::Shutdown) => break 'session,
                    Ok(cmd) => apply_command(&mut core, cmd, &on_event),
                    Err(mpsc::TryRecvError::Empty) => break,
                    Err(mpsc::TryRecvError::Disconnected) => break 'session,
                }
            }
            continue;
        }

        match rx.recv_timeout(next_tick - now) {
            Ok(SessionCmd::Shutdown) => break,
            Ok(cmd) => apply_command(&mut core, cmd, &on_event),
            Err(mpsc::RecvTimeoutError::Timeout) => {}
            // All senders dropped, shut down
            Err(mpsc::RecvTimeoutError::Disconnected) => break,
        }
    }

    tracing::info!("session runtime stopped");
    on_event(RuntimeEvent::Stopped);
}

fn apply_command<F>(core: &mut AppCore, cmd: SessionCmd, on_event: &F)
where
    F: Fn(RuntimeEvent),
{
    let result = match cmd {
        SessionCmd::TogglePlayPause => Ok(core.toggle_play_pause()),
        SessionCmd::NextTrack => Ok(core.next_track()),
        SessionCmd::PreviousTrack => Ok(core.previous_track()),
        SessionCmd::SelectTrack(index) => core.select_track(index),
        SessionCmd::TrackEnded => Ok(core.on_track_ended()),
        SessionCmd::ResetPlayTime => Ok(core.reset_play_time()),
        SessionCmd::AddSchedule { time, days, action } => {
            core.add_schedule(&time, days, &action).map(|_| Vec::new())
        }
        SessionCmd::RemoveSchedule(id) => core.remove_schedule(id).map(|()| Vec::new()),
        SessionCmd::UpdateSettings(settings) => core.update_settings(settings).map(|()| Vec::new()),
        SessionCmd::Reload => core.reload(),
        SessionCmd::Status(reply) => {
            let _ = reply.send(core.get_status());
            Ok(Vec::new())
        }
        SessionCmd::Schedule(reply) => {
            let _ = reply.send(core.get_schedule());
            Ok(Vec::new())
        }
        SessionCmd::Shutdown => Ok(Vec::new()),
    };

    match result {
        Ok(events) => {
            for event in events {
                on_event(RuntimeEvent::Playback(event));
            }
        }
        Err(e) => {
            tracing::warn!(error = %e, "command failed");
            on_event(RuntimeEvent::CommandFailed(e.to_string()));
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────
