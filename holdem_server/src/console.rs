//! JSON-lines console front end.
//!
//! Each stdin line is one command; replies and table notifications are
//! written to stdout as one JSON object per line.
//!
//! ```text
//! {"cmd":"join","table":1,"player":"p1","name":"Ann"}
//! {"cmd":"start","table":1}
//! {"cmd":"action","table":1,"player":"p1","action":{"type":"raise","amount":40}}
//! {"cmd":"view","table":1,"player":"p1"}
//! {"cmd":"leave","table":1,"player":"p1"}
//! {"cmd":"tables"}
//! ```

use crate::logging;
use holdem::{
    entities::{Action, ActionRequest, PlayerId, TableView},
    table::{
        TableId, TableManager, TableManagerError, TableNotification, TableResponse,
        TableStateResponse,
    },
};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tokio::sync::mpsc;

/// Commands read from stdin
#[derive(Debug, Deserialize)]
#[serde(tag = "cmd", rename_all = "snake_case")]
enum Command {
    Join {
        table: TableId,
        player: String,
        #[serde(default)]
        name: Option<String>,
    },
    Leave {
        table: TableId,
        player: String,
    },
    Start {
        table: TableId,
    },
    Action {
        table: TableId,
        player: String,
        action: ActionRequest,
    },
    View {
        table: TableId,
        #[serde(default)]
        player: Option<String>,
    },
    Tables,
}

impl Command {
    fn name(&self) -> &'static str {
        match self {
            Command::Join { .. } => "join",
            Command::Leave { .. } => "leave",
            Command::Start { .. } => "start",
            Command::Action { .. } => "action",
            Command::View { .. } => "view",
            Command::Tables => "tables",
        }
    }

    fn table(&self) -> Option<TableId> {
        match self {
            Command::Join { table, .. }
            | Command::Leave { table, .. }
            | Command::Start { table }
            | Command::Action { table, .. }
            | Command::View { table, .. } => Some(*table),
            Command::Tables => None,
        }
    }
}

/// Lines written to stdout
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerResponse {
    Success {
        message: String,
    },
    Error {
        message: String,
    },
    View {
        view: TableView,
    },
    Tables {
        tables: Vec<TableStateResponse>,
    },
    Notification {
        player: PlayerId,
        notification: TableNotification,
    },
}

impl ServerResponse {
    fn error(message: impl ToString) -> Self {
        ServerResponse::Error {
            message: message.to_string(),
        }
    }

    /// Serialize to a single output line
    pub fn to_line(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|e| {
            warn!("Failed to serialize response: {}", e);
            r#"{"type":"error","message":"serialization failed"}"#.to_string()
        })
    }
}

impl From<TableResponse> for ServerResponse {
    fn from(response: TableResponse) -> Self {
        match response.error_message() {
            None => ServerResponse::Success {
                message: "ok".to_string(),
            },
            Some(message) => ServerResponse::Error { message },
        }
    }
}

impl From<TableManagerError> for ServerResponse {
    fn from(err: TableManagerError) -> Self {
        ServerResponse::error(err)
    }
}

/// Routes console commands to tables and forwards notifications to `out`
pub struct Console {
    manager: TableManager,
    out: mpsc::Sender<String>,
}

impl Console {
    pub fn new(manager: TableManager, out: mpsc::Sender<String>) -> Self {
        Self { manager, out }
    }

    /// Parse and run one input line
    pub async fn handle_line(&self, line: &str) -> ServerResponse {
        let command = match serde_json::from_str::<Command>(line) {
            Ok(command) => command,
            Err(e) => {
                warn!("Failed to parse command: {}", e);
                return ServerResponse::error(format!("Invalid message format: {e}"));
            }
        };

        let name = command.name();
        let table = command.table();
        let start = Instant::now();
        let response = self.handle_command(command).await;
        logging::log_command(
            name,
            table,
            start.elapsed(),
            !matches!(response, ServerResponse::Error { .. }),
        );
        response
    }

    async fn handle_command(&self, command: Command) -> ServerResponse {
        match command {
            Command::Join {
                table,
                player,
                name,
            } => {
                let player_id = PlayerId::new(&player);
                let name = name.unwrap_or(player);
                match self
                    .manager
                    .join_table(table, player_id.clone(), name)
                    .await
                {
                    Ok(TableResponse::Success) => {
                        if let Err(e) = self.forward(table, player_id).await {
                            return e.into();
                        }
                        TableResponse::Success.into()
                    }
                    Ok(response) => response.into(),
                    Err(e) => e.into(),
                }
            }

            Command::Leave { table, player } => {
                match self.manager.leave_table(table, PlayerId::new(&player)).await {
                    Ok(response) => response.into(),
                    Err(e) => e.into(),
                }
            }

            Command::Start { table } => match self.manager.start_round(table).await {
                Ok(response) => response.into(),
                Err(e) => e.into(),
            },

            Command::Action {
                table,
                player,
                action,
            } => {
                let action = match Action::try_from(action) {
                    Ok(action) => action,
                    Err(e) => return ServerResponse::error(e),
                };
                match self
                    .manager
                    .submit_action(table, PlayerId::new(&player), action)
                    .await
                {
                    Ok(response) => response.into(),
                    Err(e) => e.into(),
                }
            }

            Command::View { table, player } => {
                let viewer = player.as_deref().map(PlayerId::new);
                match self.manager.get_view(table, viewer).await {
                    Ok(view) => ServerResponse::View { view },
                    Err(e) => e.into(),
                }
            }

            Command::Tables => ServerResponse::Tables {
                tables: self.manager.list_tables().await,
            },
        }
    }

    /// Subscribe `player_id` and copy its notifications to the output
    async fn forward(&self, table: TableId, player_id: PlayerId) -> Result<(), TableManagerError> {
        let (tx, mut rx) = mpsc::channel(64);
        self.manager.subscribe(table, player_id.clone(), tx).await?;

        let out = self.out.clone();
        tokio::spawn(async move {
            while let Some(notification) = rx.recv().await {
                let line = ServerResponse::Notification {
                    player: player_id.clone(),
                    notification,
                }
                .to_line();
                if out.send(line).await.is_err() {
                    break;
                }
            }
            info!("Stopped forwarding notifications for {}", player_id);
        });

        Ok(())
    }
}
