//! Per-slot request tickets for discarding stale completions.

use std::sync::atomic::{AtomicU64, Ordering};

/// UI target a response is written to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    /// Record viewer.
    Viewer,
    /// Password reveal/copy.
    Reveal,
    /// Edit form loader.
    Editor,
}

impl Slot {
    fn index(self) -> usize {
        match self {
            Self::Viewer => 0,
            Self::Reveal => 1,
            Self::Editor => 2,
        }
    }
}

/// Proof of which request last targeted a slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket {
    slot: Slot,
    generation: u64,
}

/// Ticket dispenser. Issuing a ticket invalidates earlier ones for the slot.
#[derive(Debug, Default)]
pub struct InFlight {
    generations: [AtomicU64; 3],
}

impl InFlight {
    /// Issues the newest ticket for `slot`.
    pub fn issue(&self, slot: Slot) -> Ticket {
        let generation = self.generations[slot.index()].fetch_add(1, Ordering::SeqCst) + 1;
        Ticket { slot, generation }
    }

    /// Returns `true` while no newer ticket exists for the ticket's slot.
    pub fn is_current(&self, ticket: Ticket) -> bool {
        self.generations[ticket.slot.index()].load(Ordering::SeqCst) == ticket.generation
    }
}
