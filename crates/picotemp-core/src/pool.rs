//! Admission bookkeeping for a fixed pool of listening sockets
//!
//! The TCP stack has no listen backlog, so the firmware keeps one socket per
//! admission slot. [`SlotTable`] decides, from each socket's coarse state,
//! which ones to re-arm, which to reclaim and which established one to hand
//! out next. It never touches a socket itself.

use embassy_time::{Duration, Instant};

/// Coarse lifecycle of one pooled socket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotState {
    /// Neither listening nor connected.
    Closed,
    /// Listening or mid-handshake.
    Pending,
    /// Established, or half-closed by the peer. Can be served.
    Ready,
    /// Our side has closed; waiting on the peer's FIN or ACK.
    Closing,
    /// Both sides closed; only the TIME-WAIT timer is left.
    TimeWait,
}

/// What the pool should do to a socket after [`SlotTable::observe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotAction {
    Keep,
    /// Start listening again.
    Listen,
    /// Drop the connection, then start listening again.
    Abort,
}

#[derive(Debug)]
pub struct SlotTable<const N: usize> {
    /// Admission order of ready sockets; `None` while not admitted.
    tickets: [Option<u32>; N],
    /// When each slot was released after service.
    closing_since: [Option<Instant>; N],
    next_ticket: u32,
    linger: Duration,
}

impl<const N: usize> SlotTable<N> {
    /// `linger` bounds how long a released socket may wait on its peer.
    pub const fn new(linger: Duration) -> Self {
        Self {
            tickets: [None; N],
            closing_since: [None; N],
            next_ticket: 0,
            linger,
        }
    }

    /// Record the current state of `slot` and say what to do with it.
    pub fn observe(&mut self, slot: usize, state: SlotState, now: Instant) -> SlotAction {
        match state {
            SlotState::Closed => {
                self.clear(slot);
                SlotAction::Listen
            }
            SlotState::TimeWait => {
                self.clear(slot);
                SlotAction::Abort
            }
            SlotState::Pending => {
                self.clear(slot);
                SlotAction::Keep
            }
            SlotState::Ready => {
                self.closing_since[slot] = None;
                if self.tickets[slot].is_none() {
                    self.tickets[slot] = Some(self.next_ticket);
                    self.next_ticket = self.next_ticket.wrapping_add(1);
                }
                SlotAction::Keep
            }
            SlotState::Closing => {
                self.tickets[slot] = None;
                let since = *self.closing_since[slot].get_or_insert(now);
                if now.saturating_duration_since(since) >= self.linger {
                    self.closing_since[slot] = None;
                    SlotAction::Abort
                } else {
                    SlotAction::Keep
                }
            }
        }
    }

    /// The ready slot admitted earliest.
    pub fn oldest_ready(&self) -> Option<usize> {
        self.tickets
            .iter()
            .enumerate()
            .filter_map(|(i, ticket)| ticket.map(|t| (i, t)))
            .min_by_key(|&(_, t)| t.wrapping_sub(self.next_ticket))
            .map(|(i, _)| i)
    }

    /// Mark `slot` as served and closing from `now`.
    pub fn release(&mut self, slot: usize, now: Instant) {
        self.tickets[slot] = None;
        self.closing_since[slot] = Some(now);
    }

    /// Earliest moment a closing slot becomes reclaimable.
    pub fn next_expiry(&self) -> Option<Instant> {
        self.closing_since
            .iter()
            .flatten()
            .map(|&since| since + self.linger)
            .min()
    }

    fn clear(&mut self, slot: usize) {
        self.tickets[slot] = None;
        self.closing_since[slot] = None;
    }
}
