//! Table actor message types.

use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, oneshot};

use super::TableId;
use crate::game::{
    InvariantViolation, UserError,
    entities::{Action, Chips, Phase, PlayerId, SeatIndex, TableView},
    settlement::RoundResult,
};

/// Messages that can be sent to a TableActor
#[derive(Debug)]
pub enum TableMessage {
    /// Join table request
    JoinTable {
        player_id: PlayerId,
        name: String,
        response: oneshot::Sender<TableResponse>,
    },

    /// Leave table request, also used for disconnects
    LeaveTable {
        player_id: PlayerId,
        response: oneshot::Sender<TableResponse>,
    },

    /// Deal a new hand
    StartRound {
        response: oneshot::Sender<TableResponse>,
    },

    /// Player action (fold, check, call, raise, all-in)
    TakeAction {
        player_id: PlayerId,
        action: Action,
        response: oneshot::Sender<TableResponse>,
    },

    /// Get current table state
    GetState {
        response: oneshot::Sender<TableStateResponse>,
    },

    /// Get the table as a specific viewer sees it
    GetView {
        viewer: Option<PlayerId>,
        response: oneshot::Sender<TableView>,
    },

    /// Subscribe to notifications for one player
    Subscribe {
        player_id: PlayerId,
        sender: mpsc::Sender<TableNotification>,
    },

    /// Close table
    Close {
        response: oneshot::Sender<TableResponse>,
    },
}

/// Outbound notifications, one copy per subscriber with hole cards
/// redacted for that subscriber.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum TableNotification {
    RoundStarted {
        table_id: TableId,
        view: TableView,
    },
    StateUpdated {
        table_id: TableId,
        view: TableView,
    },
    RoundEnded {
        table_id: TableId,
        result: RoundResult,
    },
    GameEnded {
        table_id: TableId,
        winner: Option<PlayerId>,
    },
    /// Only sent to the player whose request was refused.
    ActionRejected {
        table_id: TableId,
        seat: Option<SeatIndex>,
        reason: UserError,
    },
    TableHalted {
        table_id: TableId,
        reason: InvariantViolation,
    },
}

/// Response from table operations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", content = "reason", rename_all = "snake_case")]
pub enum TableResponse {
    /// Operation succeeded
    Success,

    /// Request refused, table unchanged
    Rejected(UserError),

    /// Request tripped an invariant and the table stopped
    Halted(InvariantViolation),
}

/// Table state response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableStateResponse {
    /// Table ID
    pub table_id: TableId,

    /// Table name
    pub table_name: String,

    /// Current player count
    pub player_count: usize,

    /// Maximum players
    pub max_players: usize,

    /// Small blind
    pub small_blind: Chips,

    /// Big blind
    pub big_blind: Chips,

    /// Current pot size
    pub pot_size: Chips,

    /// Current game phase
    pub phase: Phase,

    /// Hands dealt so far
    pub hand_number: u32,

    /// Player ids in seat order
    pub players: Vec<PlayerId>,

    /// Table speed
    pub speed: String,

    /// Whether an invariant violation stopped the table
    pub halted: bool,
}

impl TableResponse {
    /// Check if response is success
    pub fn is_success(&self) -> bool {
        matches!(self, TableResponse::Success)
    }

    /// Get error message if response is error
    pub fn error_message(&self) -> Option<String> {
        match self {
            TableResponse::Success => None,
            TableResponse::Rejected(e) => Some(e.to_string()),
            TableResponse::Halted(e) => Some(format!("table halted: {e}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_messages() {
        assert!(TableResponse::Success.is_success());
        assert_eq!(TableResponse::Success.error_message(), None);
        let rejected = TableResponse::Rejected(UserError::OutOfTurnAction);
        assert!(!rejected.is_success());
        assert_eq!(rejected.error_message().as_deref(), Some("not your turn"));
        let halted = TableResponse::Halted(InvariantViolation::DeckExhausted);
        assert_eq!(
            halted.error_message().as_deref(),
            Some("table halted: deck exhausted")
        );
    }

    #[test]
    fn test_notification_json_shape() {
        let notification = TableNotification::ActionRejected {
            table_id: 3,
            seat: Some(1),
            reason: UserError::CannotCheck { to_call: 20 },
        };
        let json = serde_json::to_value(&notification).unwrap();
        assert_eq!(json["event"], "action_rejected");
        assert_eq!(json["table_id"], 3);
        assert_eq!(json["seat"], 1);

        let ended = TableNotification::GameEnded {
            table_id: 3,
            winner: Some(PlayerId::new("p1")),
        };
        let json = serde_json::to_value(&ended).unwrap();
        assert_eq!(json["event"], "game_ended");
        assert_eq!(json["winner"], "p1");
    }
}
