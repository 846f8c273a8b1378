// Bounded wait for the transport to become active. The transport reports readiness with a
// `Connected` event; the deadline makes sure a connection that never comes up doesn't keep the
// session waiting forever.

use std::time::Duration;

use instant::Instant;


pub const DEFAULT_CONNECTION_WAIT_TIMEOUT: Duration = Duration::from_secs(5);

#[must_use]
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum WaitOutcome {
    // Not waiting for anything.
    // Action. None.
    Idle,

    // Still waiting.
    // Action. None; check again on the next event or tick.
    Pending,

    // The transport is active. The wait is over.
    // Action. Perform the deferred work (subscriptions, join).
    Ready,

    // The deadline passed without a connection. The wait is over.
    // Action. Give up on the deferred work. Subscribing later requires a new wait.
    TimedOut,
}

#[derive(Clone, Debug)]
pub struct ConnectionWait {
    timeout: Duration,
    deadline: Option<Instant>,
}

impl ConnectionWait {
    pub fn new(timeout: Duration) -> Self { ConnectionWait { timeout, deadline: None } }

    pub fn is_waiting(&self) -> bool { self.deadline.is_some() }
    pub fn deadline(&self) -> Option<Instant> { self.deadline }

    pub fn start(&mut self, now: Instant) { self.deadline = Some(now + self.timeout); }
    pub fn cancel(&mut self) { self.deadline = None; }

    pub fn poll(&mut self, transport_active: bool, now: Instant) -> WaitOutcome {
        let Some(deadline) = self.deadline else {
            return WaitOutcome::Idle;
        };
        if transport_active {
            self.deadline = None;
            WaitOutcome::Ready
        } else if now >= deadline {
            log::warn!("Connection not established within {:?}, giving up", self.timeout);
            self.deadline = None;
            WaitOutcome::TimedOut
        } else {
            WaitOutcome::Pending
        }
    }
}

impl Default for ConnectionWait {
    fn default() -> Self { Self::new(DEFAULT_CONNECTION_WAIT_TIMEOUT) }
}
