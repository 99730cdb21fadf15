//! Table actor and manager tests.
//!
//! Drives tables through the manager the way a transport layer would and
//! checks replies, per-player notifications, and the turn clock.

use holdem::{
    UserError,
    game::entities::{Action, Phase, PlayerId},
    table::{
        TableConfig, TableManager, TableManagerError, TableNotification, TableResponse,
        TableSpeed,
    },
};
use std::time::Duration;
use tokio::sync::mpsc;

fn id(name: &str) -> PlayerId {
    PlayerId::new(name)
}

fn config(turn_timeout_secs: u64) -> TableConfig {
    TableConfig {
        name: "test".to_string(),
        turn_timeout_secs: Some(turn_timeout_secs),
        auto_start_next_round: false,
        seed: Some(99),
        ..TableConfig::default()
    }
}

fn drain(rx: &mut mpsc::Receiver<TableNotification>) -> Vec<TableNotification> {
    let mut out = Vec::new();
    while let Ok(notification) = rx.try_recv() {
        out.push(notification);
    }
    out
}

/// A two-seat table with both players subscribed.
async fn heads_up(
    manager: &TableManager,
    config: TableConfig,
) -> (
    i64,
    mpsc::Receiver<TableNotification>,
    mpsc::Receiver<TableNotification>,
) {
    let table_id = manager.create_table(config).await.unwrap();
    let mut receivers = Vec::new();
    for name in ["alice", "bob"] {
        let response = manager
            .join_table(table_id, id(name), name.to_string())
            .await
            .unwrap();
        assert_eq!(response, TableResponse::Success);
        let (tx, rx) = mpsc::channel(64);
        manager.subscribe(table_id, id(name), tx).await.unwrap();
        receivers.push(rx);
    }
    let bob = receivers.pop().unwrap();
    let alice = receivers.pop().unwrap();
    (table_id, alice, bob)
}

#[tokio::test]
async fn test_create_and_list_tables() {
    let manager = TableManager::new();
    let first = manager.create_table(config(0)).await.unwrap();
    let second = manager
        .create_table(TableConfig {
            name: "fast".to_string(),
            speed: TableSpeed::Hyper,
            ..TableConfig::default()
        })
        .await
        .unwrap();
    assert_ne!(first, second);
    assert_eq!(manager.active_table_count().await, 2);

    let tables = manager.list_tables().await;
    assert_eq!(tables.len(), 2);
    assert_eq!(tables[0].table_id, first);
    assert_eq!(tables[1].table_name, "fast");
    assert_eq!(tables[1].speed, "hyper");
    assert_eq!(tables[0].phase, Phase::Waiting);
}

#[tokio::test]
async fn test_invalid_config_is_rejected() {
    let manager = TableManager::new();
    let result = manager
        .create_table(TableConfig {
            big_blind: 5,
            small_blind: 10,
            ..TableConfig::default()
        })
        .await;
    assert!(matches!(result, Err(TableManagerError::InvalidConfig(_))));
    assert_eq!(manager.active_table_count().await, 0);
}

#[tokio::test]
async fn test_unknown_and_closed_tables() {
    let manager = TableManager::new();
    assert_eq!(
        manager.start_round(42).await,
        Err(TableManagerError::TableNotFound(42))
    );

    let table_id = manager.create_table(config(0)).await.unwrap();
    manager.close_table(table_id).await.unwrap();
    assert_eq!(manager.active_table_count().await, 0);
    assert_eq!(
        manager.get_table_state(table_id).await,
        Err(TableManagerError::TableNotFound(table_id))
    );
}

#[tokio::test]
async fn test_round_started_redacts_other_hands() {
    let manager = TableManager::new();
    let (table_id, mut alice, mut bob) = heads_up(&manager, config(0)).await;
    drain(&mut alice);
    drain(&mut bob);

    let response = manager.start_round(table_id).await.unwrap();
    assert!(response.is_success());

    let view = drain(&mut alice)
        .into_iter()
        .find_map(|n| match n {
            TableNotification::RoundStarted { view, .. } => Some(view),
            _ => None,
        })
        .unwrap();
    assert_eq!(view.pot, 30);
    assert_eq!(view.player(&id("alice")).unwrap().cards.len(), 2);
    assert!(view.player(&id("bob")).unwrap().cards.is_empty());

    let bob_view = drain(&mut bob)
        .into_iter()
        .find_map(|n| match n {
            TableNotification::StateUpdated { view, .. } => Some(view),
            _ => None,
        })
        .unwrap();
    assert!(bob_view.player(&id("alice")).unwrap().cards.is_empty());
    assert_eq!(bob_view.player(&id("bob")).unwrap().cards.len(), 2);
}

#[tokio::test]
async fn test_rejection_only_reaches_the_originator() {
    let manager = TableManager::new();
    let (table_id, mut alice, mut bob) = heads_up(&manager, config(0)).await;
    manager.start_round(table_id).await.unwrap();
    drain(&mut alice);
    drain(&mut bob);

    // bob is the big blind and acts second
    let response = manager
        .submit_action(table_id, id("bob"), Action::Check)
        .await
        .unwrap();
    assert_eq!(response, TableResponse::Rejected(UserError::OutOfTurnAction));

    let to_bob = drain(&mut bob);
    assert_eq!(
        to_bob,
        vec![TableNotification::ActionRejected {
            table_id,
            seat: Some(1),
            reason: UserError::OutOfTurnAction,
        }]
    );
    assert!(drain(&mut alice).is_empty());
}

#[tokio::test]
async fn test_duplicate_join_is_not_reported_to_the_seated_player() {
    let manager = TableManager::new();
    let (table_id, mut alice, mut bob) = heads_up(&manager, config(0)).await;
    drain(&mut alice);
    drain(&mut bob);

    let response = manager
        .join_table(table_id, id("alice"), "Impostor".to_string())
        .await
        .unwrap();
    assert_eq!(response, TableResponse::Rejected(UserError::UserAlreadyExists));
    assert!(drain(&mut alice).is_empty());
    assert!(drain(&mut bob).is_empty());

    let state = manager.get_table_state(table_id).await.unwrap();
    assert_eq!(state.player_count, 2);
}

#[tokio::test]
async fn test_hand_played_through_the_manager() {
    let manager = TableManager::new();
    let (table_id, mut alice, _bob) = heads_up(&manager, config(0)).await;
    manager.start_round(table_id).await.unwrap();

    for (player, action) in [("alice", Action::Raise(60)), ("bob", Action::Fold)] {
        let response = manager
            .submit_action(table_id, id(player), action)
            .await
            .unwrap();
        assert!(response.is_success(), "{player}: {:?}", response.error_message());
    }

    let notifications = drain(&mut alice);
    let result = notifications
        .iter()
        .find_map(|n| match n {
            TableNotification::RoundEnded { result, .. } => Some(result),
            _ => None,
        })
        .unwrap();
    assert_eq!(result.pot_awarded, 80);
    assert_eq!(result.winners[0].player_id, id("alice"));

    let view = manager.get_view(table_id, None).await.unwrap();
    assert_eq!(view.phase, Phase::Waiting);
    assert_eq!(view.player(&id("alice")).unwrap().chips, 1020);
    assert_eq!(view.player(&id("bob")).unwrap().chips, 980);
}

#[tokio::test(start_paused = true)]
async fn test_turn_timeout_folds_when_facing_a_bet() {
    let manager = TableManager::new();
    let (table_id, mut alice, _bob) = heads_up(&manager, config(5)).await;
    manager.start_round(table_id).await.unwrap();
    drain(&mut alice);

    tokio::time::sleep(Duration::from_secs(6)).await;

    let view = manager.get_view(table_id, None).await.unwrap();
    assert_eq!(view.phase, Phase::Waiting);
    assert_eq!(view.player(&id("alice")).unwrap().chips, 990);
    assert_eq!(view.player(&id("bob")).unwrap().chips, 1010);
    assert!(
        drain(&mut alice)
            .iter()
            .any(|n| matches!(n, TableNotification::RoundEnded { .. }))
    );
}

#[tokio::test(start_paused = true)]
async fn test_turn_timeout_checks_when_free() {
    let manager = TableManager::new();
    let (table_id, _alice, _bob) = heads_up(&manager, config(5)).await;
    manager.start_round(table_id).await.unwrap();

    // alice acts in time, which hands bob a fresh clock.
    tokio::time::sleep(Duration::from_secs(4)).await;
    manager
        .submit_action(table_id, id("alice"), Action::Call)
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_secs(4)).await;
    let view = manager.get_view(table_id, None).await.unwrap();
    assert_eq!(view.phase, Phase::PreFlop);

    tokio::time::sleep(Duration::from_secs(2)).await;
    let view = manager.get_view(table_id, None).await.unwrap();
    assert_eq!(view.phase, Phase::Flop);
    assert_eq!(view.pot, 40);
}

#[tokio::test(start_paused = true)]
async fn test_disabled_clock_waits_forever() {
    let manager = TableManager::new();
    let (table_id, _alice, _bob) = heads_up(&manager, config(0)).await;
    manager.start_round(table_id).await.unwrap();

    tokio::time::sleep(Duration::from_secs(3600)).await;
    let view = manager.get_view(table_id, None).await.unwrap();
    assert_eq!(view.phase, Phase::PreFlop);
    assert_eq!(view.pot, 30);
}

#[tokio::test]
async fn test_leave_drops_subscription() {
    let manager = TableManager::new();
    let (table_id, mut alice, mut bob) = heads_up(&manager, config(0)).await;
    let response = manager.leave_table(table_id, id("bob")).await.unwrap();
    assert!(response.is_success());

    let state = manager.get_table_state(table_id).await.unwrap();
    assert_eq!(state.player_count, 1);
    assert_eq!(state.players, vec![id("alice")]);
    assert!(drain(&mut alice).len() >= 2);

    // bob's sender was dropped by the actor
    drain(&mut bob);
    assert!(bob.recv().await.is_none());
}
