//! Betting state machine.
//!
//! [`Game`] owns one table: seats, deck, board, pot, and the round
//! lifecycle `Waiting -> PreFlop -> Flop -> Turn -> River -> Showdown ->
//! Waiting`. Every mutation goes through a public method that either applies
//! fully or returns a [`UserError`] with nothing changed. A broken invariant
//! halts the table for good.

use log::{debug, error, info};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::{collections::VecDeque, fmt};

use super::{
    constants::{HOLE_CARDS, MAX_PLAYERS},
    entities::{
        Action, Blinds, Card, Chips, Deck, Phase, PlayPositions, Player, PlayerId, PlayerState,
        PlayerView, SeatIndex, TableView,
    },
    errors::{GameError, InvariantViolation, UserError},
    settlement::{self, RoundResult},
};

pub const DEFAULT_SMALL_BLIND: Chips = 10;
pub const DEFAULT_BIG_BLIND: Chips = 20;
pub const DEFAULT_INITIAL_CHIPS: Chips = 1000;

/// Events that occur during gameplay
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub enum GameEvent {
    PlayerJoined { seat: SeatIndex, player_id: PlayerId },
    PlayerLeft(PlayerId),
    HostChanged(PlayerId),
    RoundStarted { hand_number: u32 },
    ActionTaken {
        seat: SeatIndex,
        player_id: PlayerId,
        action: Action,
    },
    PhaseAdvanced(Phase),
    RoundEnded(RoundResult),
    GameEnded { winner: Option<PlayerId> },
    TableHalted(InvariantViolation),
}

impl fmt::Display for GameEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let repr = match self {
            Self::PlayerJoined { seat, player_id } => format!("{player_id} sat down at seat {seat}"),
            Self::PlayerLeft(player_id) => format!("{player_id} left the table"),
            Self::HostChanged(player_id) => format!("{player_id} is now the host"),
            Self::RoundStarted { hand_number } => format!("hand #{hand_number} started"),
            Self::ActionTaken {
                player_id, action, ..
            } => format!("{player_id} {action}"),
            Self::PhaseAdvanced(phase) => format!("moved to the {phase}"),
            Self::RoundEnded(result) => {
                let winners: Vec<String> = result
                    .winners
                    .iter()
                    .map(|w| format!("{} won ${}", w.player_id, w.amount))
                    .collect();
                format!("hand #{} ended: {}", result.hand_number, winners.join(", "))
            }
            Self::GameEnded {
                winner: Some(winner),
            } => format!("game over, {winner} wins"),
            Self::GameEnded { winner: None } => "game over".to_string(),
            Self::TableHalted(reason) => format!("table halted: {reason}"),
        };
        write!(f, "{repr}")
    }
}

/// Game configuration settings
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct GameSettings {
    pub blinds: Blinds,
    pub initial_chips: Chips,
    pub max_players: usize,
    /// Deal the next hand as soon as one is settled.
    pub auto_start: bool,
    /// Fixed shuffle seed for reproducible games.
    pub seed: Option<u64>,
}

impl Default for GameSettings {
    fn default() -> Self {
        Self::new(
            DEFAULT_SMALL_BLIND,
            DEFAULT_BIG_BLIND,
            DEFAULT_INITIAL_CHIPS,
            MAX_PLAYERS,
        )
    }
}

impl GameSettings {
    #[must_use]
    pub const fn new(
        small_blind: Chips,
        big_blind: Chips,
        initial_chips: Chips,
        max_players: usize,
    ) -> Self {
        Self {
            blinds: Blinds {
                small: small_blind,
                big: big_blind,
            },
            initial_chips,
            max_players,
            auto_start: true,
            seed: None,
        }
    }
}

/// Identifies one turn. Any accepted action or phase change produces a new
/// key, so a timer armed for an old key can tell it went stale.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub struct TurnKey {
    pub hand_number: u32,
    pub action_seq: u64,
    pub seat: SeatIndex,
}

/// One poker table.
#[derive(Debug)]
pub struct Game {
    settings: GameSettings,
    rng: ChaCha8Rng,
    /// Replaced with a freshly shuffled deck every round.
    deck: Deck,
    players: Vec<Player>,
    board: Vec<Card>,
    pot: Chips,
    phase: Phase,
    current_bet: Chips,
    /// Size of the last full raise on this street.
    last_raise: Chips,
    play_positions: PlayPositions,
    hand_number: u32,
    action_seq: u64,
    events: VecDeque<GameEvent>,
    fault: Option<InvariantViolation>,
    /// Stacks plus pot when the round was dealt.
    chips_at_start: u64,
    game_over: bool,
}

impl Default for Game {
    fn default() -> Self {
        Self::new(GameSettings::default())
    }
}

impl Game {
    #[must_use]
    pub fn new(settings: GameSettings) -> Self {
        let rng = match settings.seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_rng(&mut rand::rng()),
        };
        Self {
            rng,
            deck: Deck::default(),
            players: Vec::with_capacity(settings.max_players),
            board: Vec::with_capacity(5),
            pot: 0,
            phase: Phase::Waiting,
            current_bet: 0,
            last_raise: settings.blinds.big,
            play_positions: PlayPositions::default(),
            hand_number: 0,
            action_seq: 0,
            events: VecDeque::new(),
            fault: None,
            chips_at_start: 0,
            game_over: false,
            settings,
        }
    }

    // === Accessors ===

    #[must_use]
    pub fn settings(&self) -> &GameSettings {
        &self.settings
    }

    #[must_use]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    #[must_use]
    pub fn pot(&self) -> Chips {
        self.pot
    }

    #[must_use]
    pub fn current_bet(&self) -> Chips {
        self.current_bet
    }

    /// Smallest legal `Raise` amount right now.
    #[must_use]
    pub fn min_raise_to(&self) -> Chips {
        self.current_bet + self.last_raise
    }

    #[must_use]
    pub fn board(&self) -> &[Card] {
        &self.board
    }

    #[must_use]
    pub fn players(&self) -> &[Player] {
        &self.players
    }

    #[must_use]
    pub fn player(&self, player_id: &PlayerId) -> Option<&Player> {
        self.players.iter().find(|p| &p.id == player_id)
    }

    #[must_use]
    pub fn seat_of(&self, player_id: &PlayerId) -> Option<SeatIndex> {
        self.players.iter().position(|p| &p.id == player_id)
    }

    #[must_use]
    pub fn play_positions(&self) -> &PlayPositions {
        &self.play_positions
    }

    #[must_use]
    pub fn hand_number(&self) -> u32 {
        self.hand_number
    }

    #[must_use]
    pub fn deck_len(&self) -> usize {
        self.deck.len()
    }

    /// The invariant that halted the table, if any.
    #[must_use]
    pub fn fault(&self) -> Option<&InvariantViolation> {
        self.fault.as_ref()
    }

    #[must_use]
    pub fn is_game_over(&self) -> bool {
        self.game_over
    }

    /// Stacks plus pot.
    #[must_use]
    pub fn total_chips(&self) -> u64 {
        self.players.iter().map(|p| u64::from(p.chips)).sum::<u64>() + u64::from(self.pot)
    }

    /// The turn currently waiting on a player.
    #[must_use]
    pub fn turn_key(&self) -> Option<TurnKey> {
        if !self.phase.is_betting() || self.fault.is_some() {
            return None;
        }
        self.play_positions.next_action_idx.map(|seat| TurnKey {
            hand_number: self.hand_number,
            action_seq: self.action_seq,
            seat,
        })
    }

    pub fn drain_events(&mut self) -> VecDeque<GameEvent> {
        std::mem::take(&mut self.events)
    }

    /// The table as `viewer` may see it. Hole cards are only shown to
    /// their owner.
    #[must_use]
    pub fn view_for(&self, viewer: Option<&PlayerId>) -> TableView {
        let players = self
            .players
            .iter()
            .enumerate()
            .map(|(seat, p)| PlayerView {
                seat,
                id: p.id.clone(),
                name: p.name.clone(),
                chips: p.chips,
                bet: p.bet,
                state: p.state,
                is_host: p.is_host,
                score: p.score,
                cards: if viewer == Some(&p.id) {
                    p.cards.clone()
                } else {
                    Vec::new()
                },
            })
            .collect();
        TableView {
            hand_number: self.hand_number,
            phase: self.phase,
            blinds: self.settings.blinds.clone(),
            board: self.board.clone(),
            pot: self.pot,
            current_bet: self.current_bet,
            min_raise_to: if self.phase.is_betting() {
                self.min_raise_to()
            } else {
                0
            },
            play_positions: self.play_positions.clone(),
            players,
        }
    }

    // === Requests ===

    /// Seats a new player at the end of the table.
    pub fn join(&mut self, player_id: PlayerId, name: &str) -> Result<SeatIndex, GameError> {
        self.guard()?;
        if self.seat_of(&player_id).is_some() {
            return Err(UserError::UserAlreadyExists.into());
        }
        if self.players.len() >= self.settings.max_players {
            return Err(UserError::CapacityReached.into());
        }
        let mut player = Player::new(player_id.clone(), name, self.settings.initial_chips);
        player.is_host = !self.players.iter().any(|p| p.is_host);
        let seat = self.players.len();
        if self.phase.is_betting() {
            // Sits out, but their stack is on the table from now on.
            self.chips_at_start += u64::from(player.chips);
        }
        self.players.push(player);
        info!("{player_id} joined at seat {seat}");
        self.events
            .push_back(GameEvent::PlayerJoined { seat, player_id });
        Ok(seat)
    }

    /// Removes a player. During a hand they're folded right away and
    /// their seat goes once the hand is settled.
    pub fn leave(&mut self, player_id: &PlayerId) -> Result<(), GameError> {
        self.run(|game| {
            let seat = game
                .seat_of(player_id)
                .ok_or(UserError::UserDoesNotExist)?;
            if !game.phase.is_betting() || !game.players[seat].is_active() {
                if game.phase.is_betting() {
                    game.players[seat].leaving = true;
                } else {
                    game.remove_seat(seat);
                }
                return Ok(());
            }

            let player = &mut game.players[seat];
            player.leaving = true;
            player.state = PlayerState::Fold;
            game.record_action(seat, Action::Fold);
            if game.play_positions.next_action_idx == Some(seat)
                || game.contenders() <= 1
                || game.betting_round_complete()
            {
                game.proceed(seat)
            } else {
                Ok(())
            }
        })
    }

    /// Deals a new hand.
    pub fn start_round(&mut self) -> Result<(), GameError> {
        self.run(Self::deal_round)
    }

    pub fn take_action(&mut self, player_id: &PlayerId, action: Action) -> Result<(), GameError> {
        self.run(|game| game.apply_action(player_id, action))
    }

    /// Acts for a player whose turn expired: checks when that's legal and
    /// folds otherwise. A stale key is ignored.
    pub fn timeout_action(&mut self, key: TurnKey) -> Result<Option<Action>, GameError> {
        self.run(|game| {
            if game.turn_key() != Some(key) {
                return Ok(None);
            }
            let player = &game.players[key.seat];
            let action = if player.bet >= game.current_bet {
                Action::Check
            } else {
                Action::Fold
            };
            let player_id = player.id.clone();
            info!("{player_id} timed out on hand #{}, auto-{action}", game.hand_number);
            game.apply_action(&player_id, action)?;
            Ok(Some(action))
        })
    }

    // === Internals ===

    fn guard(&self) -> Result<(), UserError> {
        match self.fault {
            Some(_) => Err(UserError::TableHalted),
            None => Ok(()),
        }
    }

    /// Runs a request, halting the table if it trips an invariant.
    fn run<T>(
        &mut self,
        request: impl FnOnce(&mut Self) -> Result<T, GameError>,
    ) -> Result<T, GameError> {
        self.guard()?;
        let result = request(self);
        if let Err(GameError::Halted(violation)) = &result {
            error!("hand #{} halted: {violation}", self.hand_number);
            self.play_positions.next_action_idx = None;
            self.fault = Some(violation.clone());
            self.events
                .push_back(GameEvent::TableHalted(violation.clone()));
        }
        result
    }

    /// Next seat after `from`, going around the table, that satisfies `pred`.
    fn next_seat(&self, from: SeatIndex, pred: impl Fn(&Player) -> bool) -> Option<SeatIndex> {
        let n = self.players.len();
        (1..=n)
            .map(|offset| (from + offset) % n)
            .find(|&seat| pred(&self.players[seat]))
    }

    /// Players still contesting the pot.
    fn contenders(&self) -> usize {
        self.players.iter().filter(|p| p.is_active()).count()
    }

    fn check_pot(&self) -> Result<(), InvariantViolation> {
        let contributed: Chips = self.players.iter().map(|p| p.contributed).sum();
        if contributed != self.pot {
            return Err(InvariantViolation::PotMismatch {
                pot: self.pot,
                contributed,
            });
        }
        Ok(())
    }

    fn record_action(&mut self, seat: SeatIndex, action: Action) {
        self.action_seq += 1;
        let player_id = self.players[seat].id.clone();
        debug!("hand #{}: {player_id} {action}", self.hand_number);
        self.events.push_back(GameEvent::ActionTaken {
            seat,
            player_id,
            action,
        });
    }

    fn remove_seat(&mut self, seat: SeatIndex) {
        let player = self.players.remove(seat);
        info!("{} left the table", player.id);
        self.events.push_back(GameEvent::PlayerLeft(player.id));
        if player.is_host {
            if let Some(next) = self.players.first_mut() {
                next.is_host = true;
                self.events.push_back(GameEvent::HostChanged(next.id.clone()));
            }
        }
        let button = &mut self.play_positions.button_idx;
        if seat < *button {
            *button -= 1;
        }
        if *button >= self.players.len() {
            *button = 0;
        }
    }

    fn deal_round(&mut self) -> Result<(), GameError> {
        if self.phase != Phase::Waiting {
            return Err(UserError::GameAlreadyInProgress.into());
        }
        let funded = self
            .players
            .iter()
            .filter(|p| p.chips > 0 && !p.leaving)
            .count();
        if funded < 2 {
            return Err(UserError::NotEnoughPlayers.into());
        }

        self.game_over = false;
        self.hand_number += 1;
        self.action_seq += 1;
        self.chips_at_start = self.total_chips();
        for player in &mut self.players {
            player.reset();
        }
        self.deck = Deck::shuffled(&mut self.rng);
        self.board.clear();
        self.pot = 0;

        if !self.players[self.play_positions.button_idx].is_active() {
            self.play_positions.button_idx = self
                .next_seat(self.play_positions.button_idx, Player::is_active)
                .ok_or(InvariantViolation::UnexpectedPhase(self.phase))?;
        }
        let button = self.play_positions.button_idx;

        for _ in 0..HOLE_CARDS {
            for player in self.players.iter_mut().filter(|p| p.is_active()) {
                player.cards.push(self.deck.draw()?);
            }
        }

        // Heads-up the button posts the small blind.
        let small_blind_idx = if funded == 2 {
            button
        } else {
            self.next_seat(button, Player::is_active)
                .ok_or(InvariantViolation::InvalidSeat(button))?
        };
        let big_blind_idx = self
            .next_seat(small_blind_idx, Player::is_active)
            .ok_or(InvariantViolation::InvalidSeat(small_blind_idx))?;
        let (small, big) = (self.settings.blinds.small, self.settings.blinds.big);
        self.pot += self.players[small_blind_idx].put_in(small);
        self.pot += self.players[big_blind_idx].put_in(big);
        self.current_bet = big;
        self.last_raise = big;
        self.play_positions.small_blind_idx = Some(small_blind_idx);
        self.play_positions.big_blind_idx = Some(big_blind_idx);
        self.phase = Phase::PreFlop;

        info!(
            "hand #{} dealt to {funded} players, button at seat {button}, blinds {}",
            self.hand_number, self.settings.blinds
        );
        self.events.push_back(GameEvent::RoundStarted {
            hand_number: self.hand_number,
        });
        self.check_pot()?;
        self.proceed(big_blind_idx)
    }

    fn apply_action(&mut self, player_id: &PlayerId, action: Action) -> Result<(), GameError> {
        if !self.phase.is_betting() {
            return Err(UserError::NoHandInProgress.into());
        }
        let seat = self
            .seat_of(player_id)
            .ok_or(UserError::UserDoesNotExist)?;
        if !self.players[seat].is_active() {
            return Err(UserError::UserNotPlaying.into());
        }
        if self.play_positions.next_action_idx != Some(seat) {
            return Err(UserError::OutOfTurnAction.into());
        }

        let current_bet = self.current_bet;
        let min_raise_to = self.min_raise_to();
        let player = &mut self.players[seat];
        let to_call = current_bet.saturating_sub(player.bet);
        // Acted already and only faces an incomplete raise.
        let reopened = player.state == PlayerState::Wait;
        let moved = match action {
            Action::Fold => {
                player.state = PlayerState::Fold;
                0
            }
            Action::Check | Action::Call if to_call == 0 => {
                player.state = PlayerState::Check;
                0
            }
            Action::Check => return Err(UserError::CannotCheck { to_call }.into()),
            Action::Call => {
                if player.chips < to_call {
                    return Err(UserError::InsufficientChips {
                        required: to_call,
                        available: player.chips,
                    }
                    .into());
                }
                player.state = PlayerState::Call;
                player.put_in(to_call)
            }
            Action::Raise(_) if !reopened => {
                return Err(UserError::ActionNotReopened.into());
            }
            Action::Raise(amount) => {
                if amount < min_raise_to {
                    return Err(UserError::RaiseTooSmall {
                        minimum: min_raise_to,
                    }
                    .into());
                }
                let required = amount - player.bet;
                if player.chips < required {
                    return Err(UserError::InsufficientChips {
                        required,
                        available: player.chips,
                    }
                    .into());
                }
                player.state = PlayerState::Raise;
                player.put_in(required)
            }
            Action::AllIn => {
                if player.chips == 0 {
                    return Err(UserError::NoChipsLeft.into());
                }
                if !reopened && player.chips > to_call {
                    return Err(UserError::ActionNotReopened.into());
                }
                let chips = player.chips;
                player.put_in(chips)
            }
        };
        let new_bet = player.bet;
        self.pot += moved;

        if new_bet > current_bet {
            let raised_by = new_bet - current_bet;
            self.current_bet = new_bet;
            // Only a full raise reopens the action.
            if raised_by >= self.last_raise {
                self.last_raise = raised_by;
                for (other, p) in self.players.iter_mut().enumerate() {
                    if other != seat && p.can_act() {
                        p.state = PlayerState::Wait;
                    }
                }
            }
        }

        self.record_action(seat, action);
        self.proceed(seat)
    }

    /// Betting on this street is over.
    fn betting_round_complete(&self) -> bool {
        let actors: Vec<&Player> = self.players.iter().filter(|p| p.can_act()).collect();
        actors.iter().all(|p| p.bet == self.current_bet)
            && (actors.len() <= 1 || actors.iter().all(|p| p.state != PlayerState::Wait))
    }

    /// Moves the game on after seat `from` acted: passes the turn, deals the
    /// next street, or settles.
    fn proceed(&mut self, mut from: SeatIndex) -> Result<(), GameError> {
        loop {
            if self.contenders() <= 1 {
                return self.settle_round();
            }
            if !self.betting_round_complete() {
                let current_bet = self.current_bet;
                let next = self
                    .next_seat(from, |p| {
                        p.can_act() && (p.state == PlayerState::Wait || p.bet < current_bet)
                    })
                    .ok_or(InvariantViolation::UnexpectedPhase(self.phase))?;
                self.play_positions.next_action_idx = Some(next);
                return Ok(());
            }
            if self.phase == Phase::River {
                return self.settle_round();
            }
            self.advance_phase()?;
            from = self.play_positions.button_idx;
        }
    }

    fn advance_phase(&mut self) -> Result<(), GameError> {
        self.check_pot()?;
        let next = match self.phase {
            Phase::PreFlop => Phase::Flop,
            Phase::Flop => Phase::Turn,
            Phase::Turn => Phase::River,
            phase => return Err(InvariantViolation::UnexpectedPhase(phase).into()),
        };
        for _ in 0..next.cards_dealt() {
            let card = self.deck.draw()?;
            self.board.push(card);
        }
        for player in &mut self.players {
            player.bet = 0;
            if player.can_act() {
                player.state = PlayerState::Wait;
            }
        }
        self.current_bet = 0;
        self.last_raise = self.settings.blinds.big;
        self.play_positions.next_action_idx = None;
        self.phase = next;
        self.action_seq += 1;
        debug!("hand #{} moved to the {next}", self.hand_number);
        self.events.push_back(GameEvent::PhaseAdvanced(next));
        Ok(())
    }

    fn settle_round(&mut self) -> Result<(), GameError> {
        if self.contenders() > 1 {
            self.phase = Phase::Showdown;
            self.events.push_back(GameEvent::PhaseAdvanced(Phase::Showdown));
        }
        let result = settlement::settle(
            &self.players,
            &self.board,
            self.pot,
            self.play_positions.button_idx,
            self.hand_number,
        )?;
        for winner in &result.winners {
            let player = &mut self.players[winner.seat];
            player.chips += winner.amount;
            player.score += 1;
        }
        self.pot = 0;
        let actual = self.total_chips();
        if actual != self.chips_at_start {
            return Err(InvariantViolation::ChipLeak {
                expected: self.chips_at_start,
                actual,
            }
            .into());
        }

        for player in &mut self.players {
            player.bet = 0;
            player.contributed = 0;
        }
        self.board.clear();
        self.current_bet = 0;
        self.phase = Phase::Waiting;
        self.action_seq += 1;
        self.play_positions.small_blind_idx = None;
        self.play_positions.big_blind_idx = None;
        self.play_positions.next_action_idx = None;
        info!(
            "hand #{} settled, ${} awarded to {} winner(s)",
            result.hand_number,
            result.pot_awarded,
            result.winners.len()
        );
        self.events.push_back(GameEvent::RoundEnded(result));
        self.finish_round()
    }

    /// Rotates the button, drops departed seats, and either ends the game
    /// or deals the next hand.
    fn finish_round(&mut self) -> Result<(), GameError> {
        let next_button = self
            .next_seat(self.play_positions.button_idx, |p| p.chips > 0 && !p.leaving)
            .map(|seat| self.players[seat].id.clone());

        while let Some(seat) = self.players.iter().position(|p| p.leaving) {
            self.remove_seat(seat);
        }
        self.play_positions.button_idx = next_button
            .and_then(|id| self.seat_of(&id))
            .unwrap_or(0);

        for player in &mut self.players {
            player.cards.clear();
            player.state = if player.chips > 0 {
                PlayerState::Wait
            } else {
                PlayerState::SittingOut
            };
        }

        let funded: Vec<&Player> = self.players.iter().filter(|p| p.chips > 0).collect();
        if funded.len() <= 1 {
            let winner = funded.first().map(|p| p.id.clone());
            match &winner {
                Some(winner) => info!("game over after hand #{}, {winner} wins", self.hand_number),
                None => info!("game over after hand #{}", self.hand_number),
            }
            self.game_over = true;
            self.events.push_back(GameEvent::GameEnded { winner });
            return Ok(());
        }
        if self.settings.auto_start {
            self.deal_round()?;
        }
        Ok(())
    }
}
