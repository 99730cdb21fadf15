//! Error types for the table engine.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::entities::{Chips, Phase};

/// Requests the engine refuses. The table is left exactly as it was and the
/// requester may resubmit a corrected request.
#[derive(Clone, Debug, Deserialize, Eq, Error, PartialEq, Serialize)]
pub enum UserError {
    #[error("not your turn")]
    OutOfTurnAction,
    #[error("no hand in progress")]
    NoHandInProgress,
    #[error("can't check, ${to_call} to call")]
    CannotCheck { to_call: Chips },
    #[error("need ${required}, have ${available}")]
    InsufficientChips { required: Chips, available: Chips },
    #[error("raise must be to at least ${minimum}")]
    RaiseTooSmall { minimum: Chips },
    #[error("betting wasn't reopened, call or fold")]
    ActionNotReopened,
    #[error("raise amount must be positive")]
    InvalidRaiseAmount,
    #[error("unknown action {0:?}")]
    UnknownAction(String),
    #[error("nothing left to bet")]
    NoChipsLeft,
    #[error("not playing this hand")]
    UserNotPlaying,
    #[error("need 2+ players with chips")]
    NotEnoughPlayers,
    #[error("game already in progress")]
    GameAlreadyInProgress,
    #[error("table is full")]
    CapacityReached,
    #[error("player already seated")]
    UserAlreadyExists,
    #[error("player does not exist")]
    UserDoesNotExist,
    #[error("table halted after an internal error")]
    TableHalted,
}

/// Broken engine invariants. Any of these halts the table: it keeps its
/// state for inspection and accepts no further requests.
#[derive(Clone, Debug, Deserialize, Eq, Error, PartialEq, Serialize)]
pub enum InvariantViolation {
    #[error("deck exhausted")]
    DeckExhausted,
    #[error("pot is ${pot} but players contributed ${contributed}")]
    PotMismatch { pot: Chips, contributed: Chips },
    #[error("expected ${expected} chips on the table, found ${actual}")]
    ChipLeak { expected: u64, actual: u64 },
    #[error("unexpected phase {0}")]
    UnexpectedPhase(Phase),
    #[error("seat {0} out of bounds")]
    InvalidSeat(usize),
}

#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum GameError {
    #[error(transparent)]
    Rejected(#[from] UserError),
    #[error("table halted: {0}")]
    Halted(#[from] InvariantViolation),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_error_messages() {
        assert_eq!(UserError::OutOfTurnAction.to_string(), "not your turn");
        assert_eq!(
            UserError::RaiseTooSmall { minimum: 40 }.to_string(),
            "raise must be to at least $40"
        );
        assert_eq!(
            UserError::InsufficientChips {
                required: 100,
                available: 20
            }
            .to_string(),
            "need $100, have $20"
        );
    }

    #[test]
    fn test_game_error_conversions() {
        let rejected: GameError = UserError::CannotCheck { to_call: 10 }.into();
        assert_eq!(
            rejected,
            GameError::Rejected(UserError::CannotCheck { to_call: 10 })
        );
        assert_eq!(rejected.to_string(), "can't check, $10 to call");

        let halted: GameError = InvariantViolation::DeckExhausted.into();
        assert_eq!(halted.to_string(), "table halted: deck exhausted");
    }
}
