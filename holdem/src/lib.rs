//! # Holdem
//!
//! A Texas Hold'em table engine: deck, seven-card hand evaluation, the
//! betting-round state machine, and pot settlement with side pots.
//!
//! ## Architecture
//!
//! A round moves through a fixed sequence of phases:
//!
//! - **Waiting**: between hands; players join and leave freely
//! - **PreFlop**: hole cards dealt, blinds posted
//! - **Flop/Turn/River**: community cards revealed, one betting round each
//! - **Showdown**: hands compared and the pot split
//!
//! When all but one player fold the round jumps straight to settlement.
//!
//! ## Core Modules
//!
//! - [`game`]: entities, hand evaluator, settlement, and the state machine
//! - [`table`]: one tokio actor per table plus the manager that routes to them
//!
//! ## Example
//!
//! ```
//! use holdem::{Game, GameSettings, game::entities::{Action, PlayerId}};
//!
//! let mut game = Game::new(GameSettings::default());
//! game.join(PlayerId::new("ann"), "Ann").unwrap();
//! game.join(PlayerId::new("bob"), "Bob").unwrap();
//! game.start_round().unwrap();
//! assert_eq!(game.pot(), 30);
//! game.take_action(&PlayerId::new("ann"), Action::Call).unwrap();
//! ```

/// Core game logic, entities, and state machine.
pub mod game;
pub use game::{
    Game, GameError, GameEvent, GameSettings, InvariantViolation, TurnKey, UserError,
    constants::{self, MAX_PLAYERS},
    entities, functional, settlement,
};

/// Table actors and the table manager.
pub mod table;
