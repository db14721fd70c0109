//! Cross-room stealing: how an idle doctor borrows work from peer rooms.
//!
//! The scan never holds two room locks at once. Each peer's head is read under
//! that peer's lock, the lock is released, and the chosen candidate is removed
//! later only if it is still that peer's head (see [`Room::remove_if_head`]).
//! A vanished candidate restarts the scan.

use tracing::debug;

use crate::core::patient::{QueueEntry, QueueKey};
use crate::core::room::Room;
use crate::util::serde::RoomId;

/// Rank of the most urgent tier, eligible for borrow-critical.
const MOST_URGENT_RANK: u8 = 0;

/// Which tier of the policy produced a stolen entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StealTier {
    /// A peer's head was of the most urgent rank.
    BorrowCritical,
    /// Smallest head across all peers.
    GlobalSteal,
}

/// A successful steal.
#[derive(Debug, Clone)]
pub struct Stolen {
    /// The removed entry.
    pub entry: QueueEntry,
    /// Room it was taken from.
    pub from: RoomId,
    /// Tier that chose it.
    pub tier: StealTier,
}

enum Attempt {
    Taken(Stolen),
    Raced,
    Nothing,
}

/// Try to take one entry from a peer of `thief`.
///
/// Peers are scanned in room-id order. Returns `None` when every peer queue is
/// empty.
pub fn steal(rooms: &[Room], thief: RoomId) -> Option<Stolen> {
    loop {
        match borrow_critical(rooms, thief) {
            Attempt::Taken(stolen) => return Some(stolen),
            Attempt::Raced => continue,
            Attempt::Nothing => {}
        }
        match global_steal(rooms, thief) {
            Attempt::Taken(stolen) => return Some(stolen),
            Attempt::Raced => continue,
            Attempt::Nothing => return None,
        }
    }
}

fn peers(rooms: &[Room], thief: RoomId) -> impl Iterator<Item = &Room> {
    rooms.iter().filter(move |room| room.id() != thief)
}

fn take(room: &Room, key: &QueueKey, tier: StealTier) -> Attempt {
    room.remove_if_head(key).map_or_else(
        || {
            debug!(room = room.id(), patient_id = key.patient_id, "steal candidate vanished, rescanning");
            Attempt::Raced
        },
        |entry| {
            Attempt::Taken(Stolen {
                entry,
                from: room.id(),
                tier,
            })
        },
    )
}

fn borrow_critical(rooms: &[Room], thief: RoomId) -> Attempt {
    for room in peers(rooms, thief) {
        if let Some(key) = room.peek_key() {
            if key.rank == MOST_URGENT_RANK {
                return take(room, &key, StealTier::BorrowCritical);
            }
        }
    }
    Attempt::Nothing
}

fn global_steal(rooms: &[Room], thief: RoomId) -> Attempt {
    let best = peers(rooms, thief)
        .filter_map(|room| room.peek_key().map(|key| (room, key)))
        .min_by_key(|(_, key)| *key);
    match best {
        Some((room, key)) => take(room, &key, StealTier::GlobalSteal),
        None => Attempt::Nothing,
    }
}
