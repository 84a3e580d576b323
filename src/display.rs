//! Human-readable formatting for durations and days.

const DAY_NAMES: [&str; 7] = ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"];

/// Short day name for 0=Sunday..6=Saturday.
pub fn day_name(day: u8) -> Option<&'static str> {
    DAY_NAMES.get(day as usize).copied()
}

/// Seconds as "m:ss" (minutes are not wrapped into hours).
pub fn format_clock(secs: u32) -> String {
    format!("{}:{:02}", secs / 60, secs % 60)
}

/// Minutes as "45 min", "2h" or "1h 30m".
pub fn format_minutes(minutes: u32) -> String {
    if minutes < 60 {
        return format!("{} min", minutes);
    }
    match minutes % 60 {
        0 => format!("{}h", minutes / 60),
        rest => format!("{}h {}m", minutes / 60, rest),
    }
}

/// Seconds as "45s", "5m" or "2m 30s".
pub fn format_silence(secs: u32) -> String {
    if secs < 60 {
        return format!("{}s", secs);
    }
    match secs % 60 {
        0 => format!("{}m", secs / 60),
        rest => format!("{}m {}s", secs / 60, rest),
    }
}
