//! Poker game engine - cards, hand evaluation, betting, and settlement.
//!
//! - [`entities`]: cards, deck, players, actions, views
//! - [`functional`]: seven-card hand evaluator
//! - [`settlement`]: side pots and pot distribution
//! - [`state_machine`]: the per-table betting state machine

pub mod constants;
pub mod entities;
pub mod errors;
pub mod functional;
pub mod settlement;
pub mod state_machine;

pub use errors::{GameError, InvariantViolation, UserError};
pub use state_machine::{Game, GameEvent, GameSettings, TurnKey};
