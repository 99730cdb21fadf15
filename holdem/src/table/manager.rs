//! Table manager for spawning and managing multiple table actors.

use super::{
    TableId,
    actor::{TableActor, TableHandle},
    config::{ConfigError, TableConfig},
    messages::{TableMessage, TableNotification, TableResponse, TableStateResponse},
};
use crate::game::entities::{Action, PlayerId, TableView};
use std::{collections::HashMap, sync::Arc};
use thiserror::Error;
use tokio::sync::{RwLock, mpsc, oneshot};

/// Errors routing a request to a table
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TableManagerError {
    #[error(transparent)]
    InvalidConfig(#[from] ConfigError),
    #[error("table {0} not found")]
    TableNotFound(TableId),
    #[error("table {0} is closed")]
    TableClosed(TableId),
}

/// Table manager for managing multiple table instances
#[derive(Clone, Default)]
pub struct TableManager {
    /// Active table handles
    tables: Arc<RwLock<HashMap<TableId, TableHandle>>>,

    /// Next table ID
    next_table_id: Arc<RwLock<TableId>>,
}

impl TableManager {
    /// Create a new table manager
    pub fn new() -> Self {
        Self {
            tables: Arc::new(RwLock::new(HashMap::new())),
            next_table_id: Arc::new(RwLock::new(1)),
        }
    }

    /// Create a table and spawn its actor
    ///
    /// # Arguments
    ///
    /// * `config` - Table configuration
    ///
    /// # Returns
    ///
    /// * `Result<TableId, TableManagerError>` - Table ID or the config error
    pub async fn create_table(&self, config: TableConfig) -> Result<TableId, TableManagerError> {
        config.validate()?;

        let mut next_id = self.next_table_id.write().await;
        let table_id = (*next_id).max(1);
        *next_id = table_id + 1;
        drop(next_id);

        let name = config.name.clone();
        let (actor, handle) = TableActor::new(table_id, config);

        let mut tables = self.tables.write().await;
        tables.insert(table_id, handle);
        drop(tables);

        tokio::spawn(async move {
            actor.run().await;
        });

        log::info!("Created and spawned table {} '{}'", table_id, name);

        Ok(table_id)
    }

    /// Get a table handle
    ///
    /// # Arguments
    ///
    /// * `table_id` - Table ID
    ///
    /// # Returns
    ///
    /// * `Option<TableHandle>` - Table handle if found
    pub async fn get_table(&self, table_id: TableId) -> Option<TableHandle> {
        let tables = self.tables.read().await;
        tables.get(&table_id).cloned()
    }

    /// Summaries of every open table, ordered by id
    pub async fn list_tables(&self) -> Vec<TableStateResponse> {
        let handles: Vec<TableHandle> = {
            let tables = self.tables.read().await;
            tables.values().cloned().collect()
        };

        let mut summaries = Vec::with_capacity(handles.len());
        for handle in handles {
            match self.get_table_state(handle.table_id()).await {
                Ok(state) => summaries.push(state),
                Err(e) => log::debug!("Skipping table {}: {}", handle.table_id(), e),
            }
        }
        summaries.sort_by_key(|s| s.table_id);
        summaries
    }

    /// Close a table
    ///
    /// # Arguments
    ///
    /// * `table_id` - Table ID
    pub async fn close_table(&self, table_id: TableId) -> Result<(), TableManagerError> {
        let handle = self
            .tables
            .write()
            .await
            .remove(&table_id)
            .ok_or(TableManagerError::TableNotFound(table_id))?;

        // An actor that already stopped counts as closed.
        let (tx, rx) = oneshot::channel();
        if handle.send(TableMessage::Close { response: tx }).await.is_ok() {
            let _ = rx.await;
        }

        log::info!("Closed table {}", table_id);

        Ok(())
    }

    /// Seat a player
    ///
    /// # Arguments
    ///
    /// * `table_id` - Table ID
    /// * `player_id` - Player ID
    /// * `name` - Display name
    pub async fn join_table(
        &self,
        table_id: TableId,
        player_id: PlayerId,
        name: String,
    ) -> Result<TableResponse, TableManagerError> {
        self.request(table_id, |response| TableMessage::JoinTable {
            player_id,
            name,
            response,
        })
        .await
    }

    /// Leave a table, or disconnect from it
    pub async fn leave_table(
        &self,
        table_id: TableId,
        player_id: PlayerId,
    ) -> Result<TableResponse, TableManagerError> {
        self.request(table_id, |response| TableMessage::LeaveTable {
            player_id,
            response,
        })
        .await
    }

    /// Deal a new hand
    pub async fn start_round(&self, table_id: TableId) -> Result<TableResponse, TableManagerError> {
        self.request(table_id, |response| TableMessage::StartRound { response })
            .await
    }

    /// Submit a validated action for a player
    ///
    /// # Arguments
    ///
    /// * `table_id` - Table ID
    /// * `player_id` - Acting player
    /// * `action` - The action, already parsed from the client payload
    pub async fn submit_action(
        &self,
        table_id: TableId,
        player_id: PlayerId,
        action: Action,
    ) -> Result<TableResponse, TableManagerError> {
        self.request(table_id, |response| TableMessage::TakeAction {
            player_id,
            action,
            response,
        })
        .await
    }

    /// Get table state
    pub async fn get_table_state(
        &self,
        table_id: TableId,
    ) -> Result<TableStateResponse, TableManagerError> {
        self.request(table_id, |response| TableMessage::GetState { response })
            .await
    }

    /// Get the table as one viewer sees it
    pub async fn get_view(
        &self,
        table_id: TableId,
        viewer: Option<PlayerId>,
    ) -> Result<TableView, TableManagerError> {
        self.request(table_id, |response| TableMessage::GetView { viewer, response })
            .await
    }

    /// Route a player's notifications to `sender`
    pub async fn subscribe(
        &self,
        table_id: TableId,
        player_id: PlayerId,
        sender: mpsc::Sender<TableNotification>,
    ) -> Result<(), TableManagerError> {
        self.handle(table_id)
            .await?
            .send(TableMessage::Subscribe { player_id, sender })
            .await
    }

    /// Get active table count
    pub async fn active_table_count(&self) -> usize {
        let tables = self.tables.read().await;
        tables.len()
    }

    async fn handle(&self, table_id: TableId) -> Result<TableHandle, TableManagerError> {
        self.get_table(table_id)
            .await
            .ok_or(TableManagerError::TableNotFound(table_id))
    }

    /// Send a message built around a oneshot reply channel and wait for the
    /// reply
    async fn request<T>(
        &self,
        table_id: TableId,
        message: impl FnOnce(oneshot::Sender<T>) -> TableMessage,
    ) -> Result<T, TableManagerError> {
        let handle = self.handle(table_id).await?;
        let (tx, rx) = oneshot::channel();
        handle.send(message(tx)).await?;
        rx.await.map_err(|_| TableManagerError::TableClosed(table_id))
    }
}
