use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use hushplay::app_core::{AppCore, StatusData};
use hushplay::clock::SystemClock;
use hushplay::display::{format_minutes, format_silence};
use hushplay::events::PlaybackEvent;
use hushplay::playlist::MoveDirection;
use hushplay::runtime::{spawn_session, RuntimeEvent, SessionCmd};
use hushplay::settings::Settings;
use std::io::BufRead;
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "hushplay", about = "Scheduled music player with mandatory silence periods")]
struct Cli {
    /// State file (default: <data dir>/hushplay/state.json)
    #[arg(long, global = true)]
    state: Option<PathBuf>,
    /// Directory imported tracks are copied into (default: <data dir>/hushplay/media)
    #[arg(long, global = true)]
    media_dir: Option<PathBuf>,
    /// Log filter, e.g. "debug" or "hushplay=trace" (overrides RUST_LOG)
    #[arg(long, global = true)]
    log: Option<String>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show player status
    Status,
    /// Run the scheduler, reading commands from stdin
    Run {
        /// Tick interval in milliseconds
        #[arg(long, default_value = "1000")]
        tick_ms: u64,
    },
    /// Track management
    Track {
        #[command(subcommand)]
        action: TrackCmd,
    },
    /// Schedule management (weekly play/pause entries)
    Schedule {
        #[command(subcommand)]
        action: ScheduleCmd,
    },
    /// Play-time and silence settings
    Settings {
        #[command(subcommand)]
        action: SettingsCmd,
    },
}

#[derive(Subcommand)]
enum TrackCmd {
    /// List tracks in play order
    List,
    /// Import audio file(s) into the library
    Import {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Change a track's title and/or artist
    Edit {
        id: u32,
        #[arg(short, long)]
        title: Option<String>,
        #[arg(short, long)]
        artist: Option<String>,
    },
    /// Remove a track by ID
    Remove { id: u32 },
    /// Move a track one place up or down (position is 1-based)
    Move {
        position: usize,
        /// up or down
        direction: String,
    },
    /// Set the full play order by track ID
    Reorder {
        #[arg(required = true)]
        ids: Vec<u32>,
    },
}

#[derive(Subcommand)]
enum ScheduleCmd {
    /// Add a schedule entry
    Add {
        /// Time of day (HH:MM)
        time: String,
        /// Action: play or pause
        action: String,
        /// Days of week (0=Sun..6=Sat), comma-separated. Omit for daily.
        #[arg(short, long)]
        days: Option<String>,
    },
    /// List schedule entries
    List,
    /// Remove a schedule entry by ID
    Remove { id: u32 },
}

#[derive(Subcommand)]
enum SettingsCmd {
    /// Show current settings
    Show,
    /// Change settings; omitted values are kept
    Set {
        /// Silence length in seconds (0-1800)
        #[arg(long)]
        silence: Option<u32>,
        /// Play time before a silence period, in minutes (1-480)
        #[arg(long)]
        max_play: Option<u32>,
        /// Fade in/out around silence periods
        #[arg(long)]
        fade: Option<bool>,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log.as_deref());

    let data_dir = dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("hushplay");
    let state_path = cli.state.unwrap_or_else(|| data_dir.join("state.json"));
    let media_dir = cli.media_dir.unwrap_or_else(|| data_dir.join("media"));

    let mut core = AppCore::open(&state_path, Some(media_dir.as_path()))
        .with_context(|| format!("loading {}", state_path.display()))?;

    match cli.command {
        Commands::Status => print_status(&core.get_status()),
        Commands::Run { tick_ms } => run(core, Duration::from_millis(tick_ms.max(1)))?,
        Commands::Track { action } => match action {
            TrackCmd::List => {
                let tracks = core.get_tracks();
                if tracks.is_empty() {
                    println!("No tracks. Use 'track import' to add some.");
                    return Ok(());
                }
                println!(
                    "{:<4} {:<4} {:<30} {:<24} {}",
                    "#", "ID", "Title", "Artist", "Length"
                );
                println!("{}", "-".repeat(72));
                for (i, t) in tracks.iter().enumerate() {
                    println!(
                        "{:<4} {:<4} {:<30} {:<24} {}",
                        i + 1,
                        t.id,
                        truncate(&t.title, 29),
                        truncate(&t.artist, 23),
                        t.duration
                    );
                }
            }
            TrackCmd::Import { files } => {
                let mut failed = 0;
                for file in &files {
                    match core.import_track(file) {
                        Ok(t) => println!("Imported #{}: {} — {} ({})", t.id, t.artist, t.title, t.duration),
                        Err(e) => {
                            eprintln!("Error: {}", e);
                            failed += 1;
                        }
                    }
                }
                if failed > 0 {
                    bail!("{} of {} file(s) failed to import", failed, files.len());
                }
            }
            TrackCmd::Edit { id, title, artist } => {
                let current = core
                    .get_tracks()
                    .iter()
                    .find(|t| t.id == id)
                    .cloned()
                    .with_context(|| format!("track {} not found", id))?;
                core.edit_track(
                    id,
                    title.unwrap_or(current.title),
                    artist.unwrap_or(current.artist),
                )?;
                println!("Updated track #{}", id);
            }
            TrackCmd::Remove { id } => {
                core.delete_track(id)?;
                println!("Removed track #{}", id);
            }
            TrackCmd::Move {
                position,
                direction,
            } => {
                let dir = match direction.trim().to_lowercase().as_str() {
                    "up" => MoveDirection::Up,
                    "down" => MoveDirection::Down,
                    other => bail!("unknown direction '{}'. Expected: up, down", other),
                };
                if position == 0 {
                    bail!("positions start at 1");
                }
                if core.move_track(position - 1, dir)? {
                    println!("Moved track {} {}", position, direction);
                } else {
                    println!("Track {} is already at the edge", position);
                }
            }
            TrackCmd::Reorder { ids } => {
                core.reorder_tracks(&ids)?;
                println!("Reordered {} track(s)", ids.len());
            }
        },
        Commands::Schedule { action } => match action {
            ScheduleCmd::Add { time, action, days } => {
                let days = match days {
                    Some(d) => parse_days(&d)?,
                    None => (0..=6).collect(),
                };
                let id = core.add_schedule(&time, days, &action)?;
                if let Some(entry) = core.get_schedule().into_iter().find(|e| e.id == id) {
                    println!(
                        "Added schedule entry #{}: {} at {} ({})",
                        id, entry.action, entry.time, entry.days_display
                    );
                }
            }
            ScheduleCmd::List => {
                let entries = core.get_schedule();
                if entries.is_empty() {
                    println!("No schedule entries. Use 'schedule add' to create one.");
                    return Ok(());
                }
                println!("{:<4} {:<6} {:<6} {}", "ID", "Time", "Action", "Days");
                println!("{}", "-".repeat(48));
                for e in entries {
                    println!(
                        "{:<4} {:<6} {:<6} {}",
                        e.id,
                        e.time,
                        e.action.to_string(),
                        e.days_display
                    );
                }
            }
            ScheduleCmd::Remove { id } => {
                core.remove_schedule(id)?;
                println!("Removed schedule entry #{}", id);
            }
        },
        Commands::Settings { action } => match action {
            SettingsCmd::Show => print_settings(&core.get_settings()?),
            SettingsCmd::Set {
                silence,
                max_play,
                fade,
            } => {
                let current = core.get_settings()?;
                let updated = Settings {
                    silence_duration: silence.unwrap_or(current.silence_duration),
                    max_play_duration: max_play.unwrap_or(current.max_play_duration),
                    fade_enabled: fade.unwrap_or(current.fade_enabled),
                };
                core.update_settings(updated)?;
                print_settings(&updated);
            }
        },
    }

    Ok(())
}

fn init_logging(filter: Option<&str>) {
    let filter = match filter {
        Some(f) => EnvFilter::new(f),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Run the session until stdin closes or "quit" is entered.
fn run(core: AppCore, tick_interval: Duration) -> anyhow::Result<()> {
    let runtime = spawn_session(core, Box::new(SystemClock), tick_interval, |evt| match evt {
        RuntimeEvent::Playback(event) => println!("{}", describe(&event)),
        RuntimeEvent::CommandFailed(msg) => eprintln!("Error: {}", msg),
        RuntimeEvent::Tick(_) | RuntimeEvent::Stopped => {}
    })
    .context("starting session thread")?;
    let handle = runtime.handle();

    println!("Commands: play, next, prev, select <n>, ended, reset, status, schedule, reload, quit");
    for line in std::io::stdin().lock().lines() {
        let line = line?;
        let mut parts = line.split_whitespace();
        let cmd = match parts.next() {
            Some(c) => c.to_lowercase(),
            None => continue,
        };
        let sent = match cmd.as_str() {
            "play" | "pause" | "p" => handle.send(SessionCmd::TogglePlayPause),
            "next" | "n" => handle.send(SessionCmd::NextTrack),
            "prev" | "previous" => handle.send(SessionCmd::PreviousTrack),
            "ended" => handle.send(SessionCmd::TrackEnded),
            "reset" => handle.send(SessionCmd::ResetPlayTime),
            "reload" => handle.send(SessionCmd::Reload),
            "select" => match parts.next().and_then(|n| n.parse::<usize>().ok()) {
                Some(n) if n >= 1 => handle.send(SessionCmd::SelectTrack(n - 1)),
                _ => {
                    eprintln!("Usage: select <track number>");
                    true
                }
            },
            "status" => match handle.status() {
                Some(status) => {
                    print_status(&status);
                    true
                }
                None => false,
            },
            "schedule" => match handle.schedule() {
                Some(entries) => {
                    for e in entries {
                        let fired = if e.fired { " (fired)" } else { "" };
                        println!("#{} {} {} {}{}", e.id, e.time, e.action, e.days_display, fired);
                    }
                    true
                }
                None => false,
            },
            "quit" | "exit" | "q" => break,
            other => {
                eprintln!("Unknown command '{}'", other);
                true
            }
        };
        if !sent {
            bail!("session stopped unexpectedly");
        }
    }

    runtime.shutdown();
    Ok(())
}

fn describe(event: &PlaybackEvent) -> String {
    match event {
        PlaybackEvent::PhaseChanged { phase } => format!("Now {}", phase),
        PlaybackEvent::TrackChanged { index } => format!("Track {}", index + 1),
        PlaybackEvent::SilenceStarted { silence_seconds } => {
            format!("Play limit reached, silence for {}", format_silence(*silence_seconds))
        }
        PlaybackEvent::SilenceEnded => "Silence over, playing".to_string(),
        PlaybackEvent::ScheduleFired { entry_id, action } => {
            format!("Schedule #{} fired: {}", entry_id, action)
        }
        PlaybackEvent::PlayTimeReset => "Play time reset".to_string(),
    }
}

fn print_status(status: &StatusData) {
    println!("hushplay v{}", env!("CARGO_PKG_VERSION"));
    println!(
        "State: {} | Tracks: {} | Schedule: {} entr{} | Fade: {}",
        status.phase,
        status.track_count,
        status.schedule_count,
        if status.schedule_count == 1 { "y" } else { "ies" },
        if status.fade_enabled { "on" } else { "off" }
    );
    if let Some(title) = &status.track_title {
        println!(
            "Current track: [{}/{}] {} — {}",
            status.state.current_track_index + 1,
            status.track_count,
            status.track_artist.as_deref().unwrap_or(""),
            title
        );
    }
    println!(
        "Played: {} of {} ({} left, {:.0}%)",
        status.play_time,
        status.max_play_display,
        status.remaining_display,
        status.progress * 100.0
    );
    if let Some(banner) = &status.silence_banner {
        println!("{}", banner);
    }
}

fn print_settings(settings: &Settings) {
    println!(
        "Max play: {} | Silence: {} | Fade: {}",
        format_minutes(settings.max_play_duration),
        format_silence(settings.silence_duration),
        if settings.fade_enabled { "on" } else { "off" }
    );
}

fn parse_days(s: &str) -> anyhow::Result<Vec<u8>> {
    let mut days = Vec::new();
    for part in s.split(',') {
        match part.trim().parse::<u8>() {
            Ok(v) if v <= 6 => days.push(v),
            _ => bail!("invalid day '{}'. Use 0=Sun..6=Sat", part.trim()),
        }
    }
    Ok(days)
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max.saturating_sub(1)).collect();
        format!("{}…", cut)
    }
}
