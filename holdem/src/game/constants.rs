//! Fixed limits of a single table.

/// Most seats a table can have. Nine players take 18 hole cards, which
/// together with the board leaves plenty of the deck unused.
pub const MAX_PLAYERS: usize = 9;

/// Fewest funded players needed to deal a round.
pub const MIN_PLAYERS: usize = 2;

pub const HOLE_CARDS: usize = 2;

pub const BOARD_CARDS: usize = 5;

pub const DECK_SIZE: usize = 52;

/// Cards considered by the evaluator when picking the best hand.
pub const HAND_SIZE: usize = 5;

/// Display names longer than this are truncated.
pub const MAX_NAME_LENGTH: usize = 32;
