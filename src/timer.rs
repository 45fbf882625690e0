//! Countdown engine for focus sessions. The UI event loop calls `poll` every
//! iteration; the engine owns the tick schedule and commits stats exactly
//! once per naturally completed session.

use crate::model::PomodoroStats;
use log::info;
use std::time::{Duration, Instant};

/// Fallback when the configured duration comes out as zero: 25 minutes.
/// A zero-length session is degenerate, so this is a guard, not an error.
pub const DEFAULT_DURATION_SECS: u64 = 1500;

const TICK_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    /// Tick against an idle engine; ignored.
    Idle,
    Running,
    Completed,
}

/// The one active schedule. Present exactly while the engine runs, so at
/// most one schedule can exist; dropping it is the cancellation.
#[derive(Debug)]
struct TickSchedule {
    next_due: Instant,
}

#[derive(Debug)]
pub struct TimerEngine {
    configured_secs: u64,
    remaining_secs: u64,
    schedule: Option<TickSchedule>,
}

impl Default for TimerEngine {
    fn default() -> Self {
        TimerEngine {
            configured_secs: DEFAULT_DURATION_SECS,
            remaining_secs: DEFAULT_DURATION_SECS,
            schedule: None,
        }
    }
}

impl TimerEngine {
    pub fn new() -> Self {
        TimerEngine::default()
    }

    /// Sets the session duration from hour/minute inputs, falling back to
    /// the default when the result is zero. While idle the remaining time
    /// reloads immediately; while running only future resets see it.
    pub fn configure(&mut self, hours: u64, minutes: u64) -> u64 {
        let secs = hours * 3600 + minutes * 60;
        self.configured_secs = if secs > 0 { secs } else { DEFAULT_DURATION_SECS };
        if self.schedule.is_none() {
            self.remaining_secs = self.configured_secs;
        }
        self.configured_secs
    }

    pub fn is_running(&self) -> bool {
        self.schedule.is_some()
    }

    pub fn remaining_secs(&self) -> u64 {
        self.remaining_secs
    }

    pub fn configured_secs(&self) -> u64 {
        self.configured_secs
    }

    /// Fraction of the session elapsed, for the progress gauge.
    pub fn progress(&self) -> f64 {
        if self.configured_secs == 0 {
            return 0.0;
        }
        1.0 - self.remaining_secs as f64 / self.configured_secs as f64
    }

    /// No-op while running. A start after natural completion begins a fresh
    /// session at the configured duration; a start after pause resumes.
    pub fn start(&mut self, now: Instant) -> bool {
        if self.schedule.is_some() {
            return false;
        }
        if self.remaining_secs == 0 {
            self.remaining_secs = self.configured_secs;
        }
        self.schedule = Some(TickSchedule {
            next_due: now + TICK_INTERVAL,
        });
        true
    }

    /// No-op while idle. Preserves the remaining time exactly.
    pub fn pause(&mut self) -> bool {
        self.schedule.take().is_some()
    }

    /// Cancels any schedule and reloads the configured duration. Idempotent;
    /// never touches stats.
    pub fn reset(&mut self) {
        self.schedule = None;
        self.remaining_secs = self.configured_secs;
    }

    /// One second elapses. At zero the schedule is dropped and exactly one
    /// session is committed: the configured total, not elapsed wall time.
    pub fn tick(&mut self, stats: &mut PomodoroStats) -> Tick {
        if self.schedule.is_none() {
            return Tick::Idle;
        }
        self.remaining_secs = self.remaining_secs.saturating_sub(1);
        if self.remaining_secs > 0 {
            return Tick::Running;
        }
        self.schedule = None;
        stats.record_session(self.configured_secs);
        info!(
            "focus session complete: {}s (total {} sessions)",
            self.configured_secs, stats.sessions
        );
        Tick::Completed
    }

    /// Fires every due tick, catching up after slow frames. Returns true
    /// when a session completed, so the caller persists stats once.
    pub fn poll(&mut self, now: Instant, stats: &mut PomodoroStats) -> bool {
        let mut completed = false;
        loop {
            match self.schedule.as_mut() {
                Some(schedule) if now >= schedule.next_due => {
                    schedule.next_due += TICK_INTERVAL;
                }
                _ => break,
            }
            if self.tick(stats) == Tick::Completed {
                completed = true;
            }
        }
        completed
    }

    /// `H:MM:SS` when hours remain, else `MM:SS`.
    pub fn format_remaining(&self) -> String {
        format_secs(self.remaining_secs)
    }
}

pub fn format_secs(total: u64) -> String {
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let seconds = total % 60;
    if hours > 0 {
        format!("{hours}:{minutes:02}:{seconds:02}")
    } else {
        format!("{minutes:02}:{seconds:02}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine_with(secs: u64) -> TimerEngine {
        let mut engine = TimerEngine::new();
        engine.configure(0, 0);
        engine.configured_secs = secs;
        engine.remaining_secs = secs;
        engine
    }

    #[test]
    fn zero_configuration_falls_back_to_default() {
        let mut engine = TimerEngine::new();
        assert_eq!(engine.configure(0, 0), DEFAULT_DURATION_SECS);
        assert_eq!(engine.remaining_secs(), DEFAULT_DURATION_SECS);
    }

    #[test]
    fn configure_computes_hours_and_minutes() {
        let mut engine = TimerEngine::new();
        assert_eq!(engine.configure(1, 30), 5400);
        assert_eq!(engine.remaining_secs(), 5400);
    }

    #[test]
    fn configure_while_running_leaves_remaining_alone() {
        let mut engine = engine_with(10);
        engine.start(Instant::now());
        engine.configure(0, 45);
        assert_eq!(engine.remaining_secs(), 10);
        assert_eq!(engine.configured_secs(), 2700);
    }

    #[test]
    fn start_is_a_noop_while_running() {
        let mut engine = engine_with(10);
        let now = Instant::now();
        assert!(engine.start(now));
        assert!(!engine.start(now));
        assert!(engine.is_running());
    }

    #[test]
    fn five_ticks_complete_and_commit_exactly_one_session() {
        let mut engine = engine_with(5);
        let mut stats = PomodoroStats::default();
        engine.start(Instant::now());

        for _ in 0..4 {
            assert_eq!(engine.tick(&mut stats), Tick::Running);
        }
        assert_eq!(engine.tick(&mut stats), Tick::Completed);

        assert!(!engine.is_running());
        assert_eq!(stats.sessions, 1);
        assert_eq!(stats.seconds, 5);

        // an orphaned tick after completion is ignored
        assert_eq!(engine.tick(&mut stats), Tick::Idle);
        assert_eq!(stats.sessions, 1);
    }

    #[test]
    fn pause_preserves_remaining_and_commits_nothing() {
        let mut engine = engine_with(5);
        let mut stats = PomodoroStats::default();
        engine.start(Instant::now());
        engine.tick(&mut stats);
        engine.tick(&mut stats);

        assert!(engine.pause());
        assert!(!engine.is_running());
        assert_eq!(engine.remaining_secs(), 3);
        assert_eq!(stats, PomodoroStats::default());

        // second pause is a no-op
        assert!(!engine.pause());
    }

    #[test]
    fn resume_after_pause_continues_where_it_stood() {
        let mut engine = engine_with(5);
        let mut stats = PomodoroStats::default();
        let now = Instant::now();
        engine.start(now);
        engine.tick(&mut stats);
        engine.pause();

        engine.start(now);
        assert_eq!(engine.remaining_secs(), 4);
    }

    #[test]
    fn reset_is_idempotent_and_never_touches_stats() {
        let mut engine = engine_with(60);
        let mut stats = PomodoroStats::default();
        engine.start(Instant::now());
        engine.tick(&mut stats);

        engine.reset();
        let after_once = engine.remaining_secs();
        engine.reset();
        assert_eq!(engine.remaining_secs(), after_once);
        assert_eq!(after_once, 60);
        assert!(!engine.is_running());
        assert_eq!(stats, PomodoroStats::default());
    }

    #[test]
    fn poll_catches_up_on_slow_frames() {
        let mut engine = engine_with(10);
        let mut stats = PomodoroStats::default();
        let start = Instant::now();
        engine.start(start);

        assert!(!engine.poll(start + Duration::from_secs(3), &mut stats));
        assert_eq!(engine.remaining_secs(), 7);
    }

    #[test]
    fn poll_reports_completion_once() {
        let mut engine = engine_with(2);
        let mut stats = PomodoroStats::default();
        let start = Instant::now();
        engine.start(start);

        assert!(engine.poll(start + Duration::from_secs(5), &mut stats));
        assert_eq!(stats.sessions, 1);
        assert_eq!(stats.seconds, 2);
        assert!(!engine.poll(start + Duration::from_secs(10), &mut stats));
        assert_eq!(stats.sessions, 1);
    }

    #[test]
    fn start_after_completion_begins_a_fresh_session() {
        let mut engine = engine_with(1);
        let mut stats = PomodoroStats::default();
        let now = Instant::now();
        engine.start(now);
        assert_eq!(engine.tick(&mut stats), Tick::Completed);
        assert_eq!(engine.remaining_secs(), 0);

        engine.start(now);
        assert_eq!(engine.remaining_secs(), 1);
    }

    #[test]
    fn formats_with_hours_only_when_present() {
        assert_eq!(format_secs(5400), "1:30:00");
        assert_eq!(format_secs(1500), "25:00");
        assert_eq!(format_secs(65), "01:05");
        assert_eq!(format_secs(0), "00:00");
    }
}
