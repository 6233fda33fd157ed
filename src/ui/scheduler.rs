//! # Refresh Scheduler
//!
//! Decides when the watched command runs next.
//!
//! - **Coalescing**: at most one wake-up is ever pending. Asking for another
//!   while one is queued is a no-op.
//! - **Idle suspension**: once the user has not touched the keyboard for longer
//!   than the idle threshold, nothing new is scheduled and the session freezes
//!   on its last output. The next interaction resumes refreshing immediately.
//! - **Minimum interval**: sessions that are not privileged cannot refresh more
//!   often than a configured floor (see [`effective_interval`]).

use std::time::{Duration, Instant};

/// Default idle threshold: 30 minutes.
pub const DEFAULT_IDLE_THRESHOLD: Duration = Duration::from_secs(30 * 60);

/// Default floor for non-privileged sessions.
pub const DEFAULT_MIN_INTERVAL: Duration = Duration::from_secs(60);

/// Longest interval accepted: one year.
pub const MAX_INTERVAL: Duration = Duration::from_secs(365 * 24 * 60 * 60);

/// Decides whether the current session may refresh faster than the floor.
pub trait PrivilegePolicy {
    fn is_privileged(&self) -> bool;
}

impl<F: Fn() -> bool> PrivilegePolicy for F {
    fn is_privileged(&self) -> bool {
        self()
    }
}

/// Privileged when the current OS user id is on an allow-list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UidAllowList {
    uids: Vec<u32>,
    current: Option<u32>,
}

impl UidAllowList {
    /// Check against the user this process runs as.
    pub fn for_current_user(uids: Vec<u32>) -> Self {
        Self {
            uids,
            current: current_uid(),
        }
    }

    /// Check against an explicit user id.
    pub fn for_uid(uids: Vec<u32>, uid: u32) -> Self {
        Self {
            uids,
            current: Some(uid),
        }
    }
}

impl PrivilegePolicy for UidAllowList {
    fn is_privileged(&self) -> bool {
        self.current.is_some_and(|uid| self.uids.contains(&uid))
    }
}

#[cfg(unix)]
fn current_uid() -> Option<u32> {
    Some(nix::unistd::getuid().as_raw())
}

#[cfg(not(unix))]
fn current_uid() -> Option<u32> {
    None
}

/// The interval actually used for scheduling.
///
/// Non-privileged sessions are raised to at least `floor`; privileged sessions
/// get exactly what they asked for.
pub fn effective_interval(
    requested: Duration,
    floor: Duration,
    policy: &dyn PrivilegePolicy,
) -> Duration {
    if policy.is_privileged() {
        requested
    } else {
        requested.max(floor)
    }
}

/// Time of the last user interaction, used for idle detection.
#[derive(Debug, Clone, Copy)]
pub struct SessionClock {
    last_interaction: Instant,
    idle_threshold: Duration,
}

impl SessionClock {
    pub fn new(now: Instant, idle_threshold: Duration) -> Self {
        Self {
            last_interaction: now,
            idle_threshold,
        }
    }

    pub fn touch(&mut self, now: Instant) {
        self.last_interaction = now;
    }

    pub fn since_interaction(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.last_interaction)
    }

    pub fn is_idle(&self, now: Instant) -> bool {
        self.since_interaction(now) > self.idle_threshold
    }
}

#[derive(Debug)]
pub struct Scheduler {
    interval: Duration,
    pending: Option<Instant>,
    session: SessionClock,
    idle: bool,
}

impl Scheduler {
    pub fn new(interval: Duration, idle_threshold: Duration, now: Instant) -> Self {
        Self {
            interval: interval.min(MAX_INTERVAL),
            pending: None,
            session: SessionClock::new(now, idle_threshold),
            idle: false,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn pending(&self) -> Option<Instant> {
        self.pending
    }

    pub fn is_idle(&self) -> bool {
        self.idle
    }

    /// Register a wake-up at `when`. Returns `false` without touching the
    /// pending wake-up if one is already queued.
    pub fn schedule_next(&mut self, when: Instant) -> bool {
        if self.pending.is_some() {
            return false;
        }
        self.pending = Some(when);
        true
    }

    /// Consume the pending wake-up if it is due.
    pub fn take_due(&mut self, now: Instant) -> bool {
        match self.pending {
            Some(when) if when <= now => {
                self.pending = None;
                true
            }
            _ => false,
        }
    }

    /// How long the event loop may wait before the pending wake-up is due.
    /// `None` when nothing is scheduled.
    pub fn time_until_due(&self, now: Instant) -> Option<Duration> {
        self.pending
            .map(|when| when.saturating_duration_since(now))
    }

    pub fn record_interaction(&mut self, now: Instant) {
        self.session.touch(now);
    }

    /// The command just ran. Leaves idle mode so the next wake-up is a full
    /// interval out instead of immediate.
    pub fn mark_refreshed(&mut self) {
        if self.idle {
            tracing::info!("refreshed after idle, resuming refresh");
        }
        self.idle = false;
    }

    /// End-of-tick policy, called once after every handled event.
    ///
    /// Past the idle threshold the session goes idle and nothing is scheduled.
    /// Otherwise a wake-up is queued if none is pending: one interval out, or
    /// right away when the session is waking up from idle.
    pub fn settle(&mut self, now: Instant) {
        if self.session.is_idle(now) {
            if !self.idle {
                tracing::info!(
                    idle_for = ?self.session.since_interaction(now),
                    "no interaction, suspending refresh"
                );
            }
            self.idle = true;
            return;
        }

        if self.pending.is_none() {
            let delay = if self.idle {
                Duration::ZERO
            } else {
                self.interval
            };
            self.schedule_next(now + delay);
        }
        if self.idle {
            tracing::info!("interaction after idle, resuming refresh");
        }
        self.idle = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINUTE: Duration = Duration::from_secs(60);

    #[test]
    fn test_schedule_next_coalesces() {
        let now = Instant::now();
        let mut s = Scheduler::new(MINUTE, DEFAULT_IDLE_THRESHOLD, now);

        assert!(s.schedule_next(now + MINUTE));
        assert!(!s.schedule_next(now + Duration::from_secs(1)));
        assert_eq!(s.pending(), Some(now + MINUTE));
    }

    #[test]
    fn test_take_due_consumes_once() {
        let now = Instant::now();
        let mut s = Scheduler::new(MINUTE, DEFAULT_IDLE_THRESHOLD, now);
        s.schedule_next(now + MINUTE);

        assert!(!s.take_due(now));
        assert!(s.take_due(now + MINUTE));
        assert!(!s.take_due(now + MINUTE));
        assert_eq!(s.pending(), None);
    }

    #[test]
    fn test_time_until_due() {
        let now = Instant::now();
        let mut s = Scheduler::new(MINUTE, DEFAULT_IDLE_THRESHOLD, now);
        assert_eq!(s.time_until_due(now), None);

        s.schedule_next(now + MINUTE);
        assert_eq!(s.time_until_due(now), Some(MINUTE));
        assert_eq!(s.time_until_due(now + 2 * MINUTE), Some(Duration::ZERO));
    }

    #[test]
    fn test_settle_schedules_one_interval_out() {
        let now = Instant::now();
        let mut s = Scheduler::new(MINUTE, DEFAULT_IDLE_THRESHOLD, now);
        s.settle(now);
        assert_eq!(s.pending(), Some(now + MINUTE));

        // A pending wake-up is left alone.
        s.settle(now + Duration::from_secs(10));
        assert_eq!(s.pending(), Some(now + MINUTE));
    }

    #[test]
    fn test_idle_suppresses_scheduling() {
        let threshold = Duration::from_secs(300);
        let start = Instant::now();
        let mut s = Scheduler::new(MINUTE, threshold, start);

        s.settle(start);
        let first = s.pending();
        assert!(first.is_some());

        // The timer fires without any interaction in between.
        let later = start + threshold + Duration::from_secs(1);
        assert!(s.take_due(later));
        s.settle(later);

        assert!(s.is_idle());
        assert_eq!(s.pending(), None);

        // Still idle on the next tick, still nothing scheduled.
        s.settle(later + MINUTE);
        assert!(s.is_idle());
        assert_eq!(s.pending(), None);
    }

    #[test]
    fn test_interaction_resumes_immediately() {
        let threshold = Duration::from_secs(300);
        let start = Instant::now();
        let mut s = Scheduler::new(MINUTE, threshold, start);

        let later = start + threshold + Duration::from_secs(1);
        s.settle(later);
        assert!(s.is_idle());

        s.record_interaction(later);
        s.settle(later);
        assert!(!s.is_idle());
        assert_eq!(s.pending(), Some(later));
    }

    #[test]
    fn test_refresh_while_idle_waits_full_interval() {
        let threshold = Duration::from_secs(300);
        let start = Instant::now();
        let mut s = Scheduler::new(MINUTE, threshold, start);

        let later = start + threshold + Duration::from_secs(1);
        s.settle(later);
        assert!(s.is_idle());

        s.mark_refreshed();
        s.record_interaction(later);
        s.settle(later);
        assert!(!s.is_idle());
        assert_eq!(s.pending(), Some(later + MINUTE));
    }

    #[test]
    fn test_huge_interval_is_capped() {
        let now = Instant::now();
        let mut s = Scheduler::new(Duration::from_secs(u64::MAX), DEFAULT_IDLE_THRESHOLD, now);
        assert_eq!(s.interval(), MAX_INTERVAL);

        s.settle(now);
        assert_eq!(s.pending(), Some(now + MAX_INTERVAL));
    }

    #[test]
    fn test_min_interval_clamp_for_unprivileged() {
        let policy = || false;
        let effective = effective_interval(Duration::from_secs(10), DEFAULT_MIN_INTERVAL, &policy);
        assert_eq!(effective, Duration::from_secs(60));

        let effective = effective_interval(Duration::from_secs(120), DEFAULT_MIN_INTERVAL, &policy);
        assert_eq!(effective, Duration::from_secs(120));
    }

    #[test]
    fn test_privileged_is_unrestricted() {
        let policy = || true;
        let effective = effective_interval(Duration::from_secs(2), DEFAULT_MIN_INTERVAL, &policy);
        assert_eq!(effective, Duration::from_secs(2));
    }

    #[test]
    fn test_uid_allow_list() {
        assert!(UidAllowList::for_uid(vec![0, 1000], 1000).is_privileged());
        assert!(!UidAllowList::for_uid(vec![0], 1000).is_privileged());
        assert!(!UidAllowList::for_uid(vec![], 0).is_privileged());
    }

    #[test]
    fn test_session_clock() {
        let start = Instant::now();
        let mut clock = SessionClock::new(start, MINUTE);
        assert!(!clock.is_idle(start + MINUTE));
        assert!(clock.is_idle(start + MINUTE + Duration::from_secs(1)));
        clock.touch(start + MINUTE);
        assert!(!clock.is_idle(start + MINUTE + Duration::from_secs(1)));
    }
}
