//! hushplay — core library for a scheduled music player with mandatory silence.
//!
//! Playback accumulates play time on a one-second tick; once the configured
//! ceiling is reached a silence period runs before playback resumes on its
//! own. Weekly schedule entries start or pause playback at a given minute.
//! The CLI and any GUI front end consume this crate.

pub mod app_core;
pub mod clock;
pub mod controller;
pub mod display;
pub mod error;
pub mod events;
pub mod playlist;
pub mod runtime;
pub mod scheduler;
pub mod settings;
pub mod silence;
pub mod store;
pub mod track;
