//! Table actor implementation with async message handling.

use super::{
    TableId,
    config::TableConfig,
    manager::TableManagerError,
    messages::{TableMessage, TableNotification, TableResponse, TableStateResponse},
    timer::TurnClock,
};
use crate::game::{
    Game, GameError, GameEvent,
    entities::{Action, PlayerId},
};
use std::collections::HashMap;
use tokio::{
    sync::mpsc,
    time::{Instant, sleep_until},
};

/// Table actor handle for sending messages
#[derive(Clone, Debug)]
pub struct TableHandle {
    sender: mpsc::Sender<TableMessage>,
    table_id: TableId,
}

impl TableHandle {
    /// Create a new table handle
    pub fn new(sender: mpsc::Sender<TableMessage>, table_id: TableId) -> Self {
        Self { sender, table_id }
    }

    /// Get table ID
    pub fn table_id(&self) -> TableId {
        self.table_id
    }

    /// Send a message to the table
    pub async fn send(&self, message: TableMessage) -> Result<(), TableManagerError> {
        self.sender
            .send(message)
            .await
            .map_err(|_| TableManagerError::TableClosed(self.table_id))
    }
}

/// Table actor managing a single poker table.
///
/// Requests are applied one at a time in the order they arrive. The only
/// other thing the loop waits on is the turn clock.
pub struct TableActor {
    /// Table ID
    id: TableId,

    /// Table configuration
    config: TableConfig,

    /// Betting state machine
    game: Game,

    /// Message inbox
    inbox: mpsc::Receiver<TableMessage>,

    /// Deadline for the player to act
    clock: TurnClock,

    /// Is table closed
    is_closed: bool,

    /// Notification channels, one per player
    subscribers: HashMap<PlayerId, mpsc::Sender<TableNotification>>,
}

impl TableActor {
    /// Create a new table actor
    ///
    /// # Arguments
    ///
    /// * `id` - Table ID
    /// * `config` - Table configuration, assumed already validated
    ///
    /// # Returns
    ///
    /// * `(TableActor, TableHandle)` - Actor and handle for sending messages
    pub fn new(id: TableId, config: TableConfig) -> (Self, TableHandle) {
        let (sender, inbox) = mpsc::channel(100);

        let actor = Self {
            id,
            game: Game::new(config.game_settings()),
            clock: TurnClock::new(config.turn_timeout()),
            config,
            inbox,
            is_closed: false,
            subscribers: HashMap::new(),
        };

        let handle = TableHandle::new(sender, id);

        (actor, handle)
    }

    /// Run the table actor event loop
    pub async fn run(mut self) {
        log::info!("Table {} '{}' starting", self.id, self.config.name);

        loop {
            let deadline = self.clock.deadline();
            tokio::select! {
                message = self.inbox.recv() => {
                    match message {
                        Some(message) => self.handle_message(message),
                        // Every handle is gone.
                        None => break,
                    }

                    if self.is_closed {
                        break;
                    }
                }

                _ = sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                    self.handle_timeout();
                }
            }
        }

        log::info!("Table {} '{}' closed", self.id, self.config.name);
    }

    /// Handle a table message
    fn handle_message(&mut self, message: TableMessage) {
        match message {
            TableMessage::JoinTable {
                player_id,
                name,
                response,
            } => {
                // A refused join may come from someone reusing a seated id.
                let result = self.game.join(player_id, &name).map(|_| ());
                let _ = response.send(self.respond(None, result));
            }

            TableMessage::LeaveTable {
                player_id,
                response,
            } => {
                let result = self.game.leave(&player_id);
                let reply = self.respond(Some(&player_id), result);
                if reply.is_success() {
                    self.subscribers.remove(&player_id);
                }
                let _ = response.send(reply);
            }

            TableMessage::StartRound { response } => {
                let result = self.game.start_round();
                let _ = response.send(self.respond(None, result));
            }

            TableMessage::TakeAction {
                player_id,
                action,
                response,
            } => {
                let result = self.game.take_action(&player_id, action);
                let _ = response.send(self.respond(Some(&player_id), result));
            }

            TableMessage::GetState { response } => {
                let _ = response.send(self.get_state());
            }

            TableMessage::GetView { viewer, response } => {
                let _ = response.send(self.game.view_for(viewer.as_ref()));
            }

            TableMessage::Subscribe { player_id, sender } => {
                log::debug!(
                    "Player {} subscribed to table {} notifications",
                    player_id,
                    self.id
                );
                self.subscribers.insert(player_id.clone(), sender);
                let snapshot = TableNotification::StateUpdated {
                    table_id: self.id,
                    view: self.game.view_for(Some(&player_id)),
                };
                self.notify_one(&player_id, snapshot);
            }

            TableMessage::Close { response } => {
                self.is_closed = true;
                let _ = response.send(TableResponse::Success);
            }
        }
    }

    /// Turns a game result into the reply, fans out whatever the game
    /// emitted, and re-syncs the turn clock.
    fn respond(&mut self, origin: Option<&PlayerId>, result: Result<(), GameError>) -> TableResponse {
        let response = match result {
            Ok(()) => TableResponse::Success,
            Err(GameError::Rejected(reason)) => {
                log::debug!(
                    "Table {}: rejected request from {}: {}",
                    self.id,
                    origin.map_or("table", PlayerId::as_str),
                    reason
                );
                if let Some(player_id) = origin {
                    let notification = TableNotification::ActionRejected {
                        table_id: self.id,
                        seat: self.game.seat_of(player_id),
                        reason: reason.clone(),
                    };
                    self.notify_one(player_id, notification);
                }
                TableResponse::Rejected(reason)
            }
            Err(GameError::Halted(violation)) => TableResponse::Halted(violation),
        };
        self.publish();
        self.clock.sync(self.game.turn_key());
        response
    }

    fn handle_timeout(&mut self) {
        let Some(key) = self.clock.expire() else {
            return;
        };
        match self.game.timeout_action(key) {
            Ok(Some(action)) => {
                log::info!(
                    "Table {}: seat {} ran out of time on hand #{}, {}",
                    self.id,
                    key.seat,
                    key.hand_number,
                    match action {
                        Action::Check => "checking",
                        _ => "folding",
                    }
                );
            }
            Ok(None) => {}
            Err(e) => log::error!("Table {}: timeout action failed: {}", self.id, e),
        }
        self.publish();
        self.clock.sync(self.game.turn_key());
    }

    /// Converts pending game events into notifications.
    fn publish(&mut self) {
        let events = self.game.drain_events();
        if events.is_empty() {
            return;
        }

        let table_id = self.id;
        for event in &events {
            log::debug!("Table {}: {}", table_id, event);
            match event {
                GameEvent::RoundStarted { .. } => {
                    broadcast(table_id, &mut self.subscribers, |player_id| {
                        TableNotification::RoundStarted {
                            table_id,
                            view: self.game.view_for(Some(player_id)),
                        }
                    });
                }
                GameEvent::RoundEnded(result) => {
                    broadcast(table_id, &mut self.subscribers, |_| {
                        TableNotification::RoundEnded {
                            table_id,
                            result: result.clone(),
                        }
                    });
                }
                GameEvent::GameEnded { winner } => {
                    broadcast(table_id, &mut self.subscribers, |_| {
                        TableNotification::GameEnded {
                            table_id,
                            winner: winner.clone(),
                        }
                    });
                }
                GameEvent::TableHalted(reason) => {
                    log::error!("Table {} halted: {}", table_id, reason);
                    broadcast(table_id, &mut self.subscribers, |_| {
                        TableNotification::TableHalted {
                            table_id,
                            reason: reason.clone(),
                        }
                    });
                }
                _ => {}
            }
        }

        broadcast(table_id, &mut self.subscribers, |player_id| {
            TableNotification::StateUpdated {
                table_id,
                view: self.game.view_for(Some(player_id)),
            }
        });
    }

    /// Send a notification to one player only
    fn notify_one(&mut self, player_id: &PlayerId, notification: TableNotification) {
        let Some(sender) = self.subscribers.get(player_id) else {
            return;
        };
        match sender.try_send(notification) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(_)) => {
                log::warn!("Subscriber {} channel full, dropping notification", player_id);
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                log::debug!("Subscriber {} disconnected, removing", player_id);
                self.subscribers.remove(player_id);
            }
        }
    }

    /// Get current table state
    fn get_state(&self) -> TableStateResponse {
        let blinds = &self.game.settings().blinds;
        TableStateResponse {
            table_id: self.id,
            table_name: self.config.name.clone(),
            player_count: self.game.players().len(),
            max_players: self.config.max_players,
            small_blind: blinds.small,
            big_blind: blinds.big,
            pot_size: self.game.pot(),
            phase: self.game.phase(),
            hand_number: self.game.hand_number(),
            players: self.game.players().iter().map(|p| p.id.clone()).collect(),
            speed: self.config.speed.to_string(),
            halted: self.game.fault().is_some(),
        }
    }
}

/// Send a notification to every subscriber, built per subscriber so hole
/// cards can be redacted
fn broadcast(
    table_id: TableId,
    subscribers: &mut HashMap<PlayerId, mpsc::Sender<TableNotification>>,
    make: impl Fn(&PlayerId) -> TableNotification,
) {
    subscribers.retain(|player_id, sender| match sender.try_send(make(player_id)) {
        Ok(()) => true,
        Err(mpsc::error::TrySendError::Full(_)) => {
            log::warn!(
                "Table {}: subscriber {} channel full, dropping notification",
                table_id,
                player_id
            );
            true
        }
        Err(mpsc::error::TrySendError::Closed(_)) => {
            log::debug!("Table {}: subscriber {} disconnected, removing", table_id, player_id);
            false
        }
    });
}
