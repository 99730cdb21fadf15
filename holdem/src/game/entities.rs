use rand::{Rng, seq::SliceRandom};
use serde::{Deserialize, Deserializer, Serialize};
use std::{fmt, str::FromStr};
use thiserror::Error;

use super::{
    constants,
    errors::{InvariantViolation, UserError},
};

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub enum Suit {
    Club,
    Diamond,
    Heart,
    Spade,
}

impl Suit {
    pub const ALL: [Suit; 4] = [Suit::Club, Suit::Diamond, Suit::Heart, Suit::Spade];
}

impl fmt::Display for Suit {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let repr = match self {
            Self::Club => "♣",
            Self::Diamond => "♦",
            Self::Heart => "♥",
            Self::Spade => "♠",
        };
        write!(f, "{repr}")
    }
}

/// Card values run from 2 to 14, aces are always 14. The evaluator treats
/// an ace as 1 only when looking for the wheel.
pub type Value = u8;

pub const JACK: Value = 11;
pub const QUEEN: Value = 12;
pub const KING: Value = 13;
pub const ACE: Value = 14;

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub struct Card(pub Value, pub Suit);

impl Card {
    #[must_use]
    pub const fn value(self) -> Value {
        self.0
    }

    #[must_use]
    pub const fn suit(self) -> Suit {
        self.1
    }
}

impl fmt::Display for Card {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.0 {
            JACK => write!(f, "J{}", self.1),
            QUEEN => write!(f, "Q{}", self.1),
            KING => write!(f, "K{}", self.1),
            ACE => write!(f, "A{}", self.1),
            v => write!(f, "{v}{}", self.1),
        }
    }
}

#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum ParseCardError {
    #[error("empty card")]
    Empty,
    #[error("unknown suit in {0:?}")]
    Suit(String),
    #[error("unknown value in {0:?}")]
    Value(String),
}

/// Parses cards such as `A♠`, `10♥`, `Td` or `2c`.
impl FromStr for Card {
    type Err = ParseCardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let suit_char = s.chars().last().ok_or(ParseCardError::Empty)?;
        let suit = match suit_char {
            '♣' | 'c' | 'C' => Suit::Club,
            '♦' | 'd' | 'D' => Suit::Diamond,
            '♥' | 'h' | 'H' => Suit::Heart,
            '♠' | 's' | 'S' => Suit::Spade,
            _ => return Err(ParseCardError::Suit(s.to_string())),
        };
        let value = match &s[..s.len() - suit_char.len_utf8()] {
            "J" | "j" => JACK,
            "Q" | "q" => QUEEN,
            "K" | "k" => KING,
            "A" | "a" => ACE,
            "T" | "t" => 10,
            v => match v.parse::<Value>() {
                Ok(v @ 2..=10) => v,
                _ => return Err(ParseCardError::Value(s.to_string())),
            },
        };
        Ok(Self(value, suit))
    }
}

/// A 52-card deck. Cards are drawn from the end of the sequence, so the
/// deck only ever shrinks until it's replaced at the next round.
#[derive(Clone, Debug)]
pub struct Deck {
    cards: Vec<Card>,
}

impl Deck {
    /// The fixed 52 cards in suit-major order.
    #[must_use]
    pub fn ordered() -> Self {
        let mut cards = Vec::with_capacity(constants::DECK_SIZE);
        for suit in Suit::ALL {
            for value in 2..=ACE {
                cards.push(Card(value, suit));
            }
        }
        Self { cards }
    }

    /// A uniformly shuffled deck (Fisher-Yates via `SliceRandom`).
    #[must_use]
    pub fn shuffled<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let mut deck = Self::ordered();
        deck.cards.shuffle(rng);
        deck
    }

    /// Shuffles with the thread-local generator.
    #[must_use]
    pub fn new_shuffled() -> Self {
        Self::shuffled(&mut rand::rng())
    }

    /// Running out of cards means the engine dealt more than a table can
    /// ever need, so it's reported as an invariant violation.
    pub fn draw(&mut self) -> Result<Card, InvariantViolation> {
        self.cards.pop().ok_or(InvariantViolation::DeckExhausted)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.cards.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    #[must_use]
    pub fn cards(&self) -> &[Card] {
        &self.cards
    }
}

impl Default for Deck {
    fn default() -> Self {
        Self::ordered()
    }
}

/// Whole chips. Stacks, bets and pots never go negative.
pub type Chips = u32;

/// Stable identity of a seated player, assigned by the transport layer.
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(transparent)]
pub struct PlayerId(String);

impl PlayerId {
    pub fn new(s: &str) -> Self {
        let id = s
            .trim()
            .chars()
            .map(|c| if c.is_ascii_whitespace() { '_' } else { c })
            .take(constants::MAX_NAME_LENGTH)
            .collect();
        Self(id)
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl<'de> Deserialize<'de> for PlayerId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Ok(Self::new(&s))
    }
}

impl From<&str> for PlayerId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for PlayerId {
    fn from(value: String) -> Self {
        Self::new(&value)
    }
}

/// Type alias for seat positions. Seating order is turn order.
pub type SeatIndex = usize;

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Blinds {
    pub small: Chips,
    pub big: Chips,
}

impl fmt::Display for Blinds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${}/{}", self.small, self.big)
    }
}

/// Round lifecycle. Phases only move forward; settlement always returns
/// the table to `Waiting`.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Waiting,
    PreFlop,
    Flop,
    Turn,
    River,
    Showdown,
}

impl Phase {
    /// Whether players are taking turns to bet.
    #[must_use]
    pub const fn is_betting(self) -> bool {
        matches!(self, Self::PreFlop | Self::Flop | Self::Turn | Self::River)
    }

    /// Community cards revealed when entering this phase.
    #[must_use]
    pub const fn cards_dealt(self) -> usize {
        match self {
            Self::Flop => 3,
            Self::Turn | Self::River => 1,
            _ => 0,
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let repr = match self {
            Self::Waiting => "waiting",
            Self::PreFlop => "pre-flop",
            Self::Flop => "flop",
            Self::Turn => "turn",
            Self::River => "river",
            Self::Showdown => "showdown",
        };
        write!(f, "{repr}")
    }
}

/// Validated player action.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(tag = "type", content = "amount", rename_all = "snake_case")]
pub enum Action {
    Fold,
    Check,
    Call,
    /// Raise the current bet *to* this total for the street.
    Raise(Chips),
    AllIn,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Fold => write!(f, "folds"),
            Self::Check => write!(f, "checks"),
            Self::Call => write!(f, "calls"),
            Self::Raise(amount) => write!(f, "raises to ${amount}"),
            Self::AllIn => write!(f, "goes all-in"),
        }
    }
}

/// Action payload as it arrives from a client, before validation.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct ActionRequest {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub amount: Option<i64>,
}

impl TryFrom<ActionRequest> for Action {
    type Error = UserError;

    fn try_from(value: ActionRequest) -> Result<Self, Self::Error> {
        let action = match value.kind.to_ascii_lowercase().as_str() {
            "fold" => Self::Fold,
            "check" => Self::Check,
            "call" => Self::Call,
            "allin" | "all_in" | "all-in" => Self::AllIn,
            "raise" => {
                let amount = value
                    .amount
                    .filter(|amount| *amount > 0)
                    .ok_or(UserError::InvalidRaiseAmount)?;
                Self::Raise(Chips::try_from(amount).map_err(|_| UserError::InvalidRaiseAmount)?)
            }
            _ => return Err(UserError::UnknownAction(value.kind)),
        };
        Ok(action)
    }
}

/// Where a player stands in the current round.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlayerState {
    // Dealt in and yet to act since the last full raise.
    Wait,
    Check,
    Call,
    Raise,
    // Whole stack is in the pot; no more decisions this round.
    AllIn,
    Fold,
    // Not dealt this round (busted or joined mid-hand).
    SittingOut,
}

impl fmt::Display for PlayerState {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let repr = match self {
            Self::Wait => "waiting",
            Self::Check => "check",
            Self::Call => "call",
            Self::Raise => "raise",
            Self::AllIn => "all-in",
            Self::Fold => "folded",
            Self::SittingOut => "sitting out",
        };
        write!(f, "{repr}")
    }
}

#[derive(Clone, Debug)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    pub chips: Chips,
    /// Wagered on the current street.
    pub bet: Chips,
    /// Wagered over the whole round, including `bet`.
    pub contributed: Chips,
    pub cards: Vec<Card>,
    pub state: PlayerState,
    pub is_host: bool,
    pub score: u32,
    /// Disconnected mid-round; the seat is dropped once the round ends.
    pub leaving: bool,
}

impl Player {
    #[must_use]
    pub fn new(id: PlayerId, name: &str, chips: Chips) -> Self {
        let name = name.trim().chars().take(constants::MAX_NAME_LENGTH).collect();
        Self {
            id,
            name,
            chips,
            bet: 0,
            contributed: 0,
            cards: Vec::with_capacity(constants::HOLE_CARDS),
            state: PlayerState::SittingOut,
            is_host: false,
            score: 0,
            leaving: false,
        }
    }

    /// Still contesting the pot.
    #[must_use]
    pub fn is_active(&self) -> bool {
        !matches!(self.state, PlayerState::Fold | PlayerState::SittingOut)
    }

    /// Still has decisions to make this round.
    #[must_use]
    pub fn can_act(&self) -> bool {
        self.is_active() && self.state != PlayerState::AllIn
    }

    /// Clears the previous round. Busted and departing players sit out.
    pub fn reset(&mut self) {
        self.cards.clear();
        self.bet = 0;
        self.contributed = 0;
        self.state = if self.chips > 0 && !self.leaving {
            PlayerState::Wait
        } else {
            PlayerState::SittingOut
        };
    }

    /// Moves up to `amount` from the stack into the pot and returns what
    /// was actually moved.
    pub fn put_in(&mut self, amount: Chips) -> Chips {
        let amount = amount.min(self.chips);
        self.chips -= amount;
        self.bet += amount;
        self.contributed += amount;
        if self.chips == 0 && self.is_active() {
            self.state = PlayerState::AllIn;
        }
        amount
    }
}

/// Button and blind seats plus whose turn it is.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct PlayPositions {
    pub button_idx: SeatIndex,
    pub small_blind_idx: Option<SeatIndex>,
    pub big_blind_idx: Option<SeatIndex>,
    pub next_action_idx: Option<SeatIndex>,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct PlayerView {
    pub seat: SeatIndex,
    pub id: PlayerId,
    pub name: String,
    pub chips: Chips,
    pub bet: Chips,
    pub state: PlayerState,
    pub is_host: bool,
    pub score: u32,
    /// Hole cards, empty unless the viewer owns them.
    pub cards: Vec<Card>,
}

/// Snapshot of a table as one viewer is allowed to see it.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct TableView {
    pub hand_number: u32,
    pub phase: Phase,
    pub blinds: Blinds,
    pub board: Vec<Card>,
    pub pot: Chips,
    pub current_bet: Chips,
    pub min_raise_to: Chips,
    pub play_positions: PlayPositions,
    pub players: Vec<PlayerView>,
}

impl TableView {
    #[must_use]
    pub fn player(&self, id: &PlayerId) -> Option<&PlayerView> {
        self.players.iter().find(|p| &p.id == id)
    }
}
