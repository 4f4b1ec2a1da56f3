//! Round pairing.
//!
//! Players are paired in the order given: 1v2, 3v4, ... A trailing odd
//! player gets a bye. The slot index becomes the new match's
//! `bracket_position`, which is the pairing order of the following round.

use shared_types::UserId;

/// One match slot of a round.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    Duel(UserId, UserId),
    Bye(UserId),
}

impl Slot {
    pub fn is_bye(&self) -> bool {
        matches!(self, Slot::Bye(_))
    }
}

/// Pair `players` in order.
pub fn pair_in_order(players: &[UserId]) -> Vec<Slot> {
    let mut slots = Vec::with_capacity(players.len().div_ceil(2));
    let mut queue = players.iter().copied();
    while let Some(a) = queue.next() {
        slots.push(match queue.next() {
            Some(b) => Slot::Duel(a, b),
            None => Slot::Bye(a),
        });
    }
    slots
}
