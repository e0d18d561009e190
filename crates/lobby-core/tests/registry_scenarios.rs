// crates/lobby-core/tests/registry_scenarios.rs
//
// Exercises the registry's atomic operations through the same channel
// plumbing real sessions use: each test client is an unbounded inbox
// channel standing in for the session's processor input.

use lobby_core::{
    Client, ClientMessage, InboxRx, LeaveOutcome, Registry, RegistryError,
};
use tokio::sync::mpsc;

fn test_client(name: &str, host: &str) -> (Client, InboxRx) {
    let (inbox_tx, inbox_rx) = mpsc::unbounded_channel();
    (Client::new(name, host, inbox_tx), inbox_rx)
}

#[tokio::test]
async fn add_client_registers_name() {
    let registry = Registry::new();
    let (alice, _inbox) = test_client("alice", "10.0.0.1:4000");

    registry.add_client(alice).await;

    assert!(registry.contains_client("alice").await);
    assert_eq!(registry.client_count().await, 1);
}

#[tokio::test]
async fn duplicate_login_displaces_incumbent() {
    let registry = Registry::new();
    let (old, mut old_inbox) = test_client("alice", "10.0.0.1:4000");
    let old_id = old.id;
    registry.add_client(old).await;

    let (new, _new_inbox) = test_client("alice", "10.0.0.2:4000");
    let new_id = new.id;
    registry.add_client(new).await;

    // The incumbent got a Logout before the new record became visible.
    assert_eq!(old_inbox.recv().await, Some(ClientMessage::Logout));
    assert_eq!(registry.client_id("alice").await, Some(new_id));
    assert_ne!(old_id, new_id);

    // The displaced session's cleanup must not evict its replacement.
    registry.remove_client("alice", old_id).await;
    assert_eq!(registry.client_id("alice").await, Some(new_id));

    // The replacement's own cleanup still works.
    registry.remove_client("alice", new_id).await;
    assert!(!registry.contains_client("alice").await);
}

#[tokio::test]
async fn displacement_dissolves_incumbents_games() {
    let registry = Registry::new();
    let (alice, _alice_inbox) = test_client("alice", "a:1");
    let (bob, mut bob_inbox) = test_client("bob", "b:1");
    registry.add_client(alice).await;
    registry.add_client(bob).await;

    registry
        .check_add_game("alice", "g1", "m", "mode", 4)
        .await
        .unwrap();
    registry.join_game("bob", "g1").await.unwrap();

    // Alice logs in again elsewhere: her hosted game closes for Bob.
    let (alice2, _alice2_inbox) = test_client("alice", "a:2");
    registry.add_client(alice2).await;

    assert_eq!(bob_inbox.recv().await, Some(ClientMessage::GameClosedByHost));
    assert!(registry.game_snapshot("g1").await.is_none());
}

#[tokio::test]
async fn check_add_game_seats_the_host() {
    let registry = Registry::new();
    let (alice, _inbox) = test_client("alice", "a:1");
    registry.add_client(alice).await;

    registry
        .check_add_game("alice", "g1", "desert", "conquest", 2)
        .await
        .unwrap();

    let snap = registry.game_snapshot("g1").await.unwrap();
    assert_eq!(snap.host, "alice");
    assert!(snap.players.contains_key("alice"));
    assert_eq!(snap.players.len(), 1);
    assert!(!snap.players["alice"].ready);

    // Same name again is refused.
    assert_eq!(
        registry.check_add_game("alice", "g1", "m", "mode", 2).await,
        Err(RegistryError::NameTaken)
    );
}

#[tokio::test]
async fn empty_or_zero_capacity_games_are_refused() {
    let registry = Registry::new();
    let (alice, _inbox) = test_client("alice", "a:1");
    registry.add_client(alice).await;

    assert_eq!(
        registry.check_add_game("alice", "", "m", "mode", 2).await,
        Err(RegistryError::InvalidName)
    );
    assert_eq!(
        registry.check_add_game("alice", "g1", "m", "mode", 0).await,
        Err(RegistryError::CapacityTooLow)
    );
}

#[tokio::test]
async fn one_hosted_game_per_client() {
    let registry = Registry::new();
    let (alice, _inbox) = test_client("alice", "a:1");
    registry.add_client(alice).await;

    registry
        .check_add_game("alice", "g1", "m", "mode", 2)
        .await
        .unwrap();
    assert_eq!(
        registry.check_add_game("alice", "g2", "m", "mode", 2).await,
        Err(RegistryError::AlreadyHosting)
    );
}

#[tokio::test]
async fn join_respects_capacity_and_membership() {
    let registry = Registry::new();
    for (name, addr) in [("alice", "a:1"), ("bob", "b:1"), ("carol", "c:1")] {
        let (client, _inbox) = test_client(name, addr);
        registry.add_client(client).await;
    }
    registry
        .check_add_game("alice", "g1", "m", "mode", 2)
        .await
        .unwrap();

    registry.join_game("bob", "g1").await.unwrap();
    assert_eq!(
        registry.join_game("bob", "g1").await,
        Err(RegistryError::AlreadyJoined)
    );
    assert_eq!(
        registry.join_game("carol", "g1").await,
        Err(RegistryError::GameFull)
    );
    assert_eq!(
        registry.join_game("carol", "nope").await,
        Err(RegistryError::NoSuchGame)
    );
}

#[tokio::test]
async fn host_leave_closes_and_notifies_members() {
    let registry = Registry::new();
    let (alice, _alice_inbox) = test_client("alice", "a:1");
    let (bob, mut bob_inbox) = test_client("bob", "b:1");
    registry.add_client(alice).await;
    registry.add_client(bob).await;
    registry
        .check_add_game("alice", "g1", "m", "mode", 4)
        .await
        .unwrap();
    registry.join_game("bob", "g1").await.unwrap();

    let outcome = registry.leave_game("alice", "g1").await.unwrap();
    assert_eq!(outcome, LeaveOutcome::Closed);
    assert!(registry.game_snapshot("g1").await.is_none());
    assert_eq!(bob_inbox.recv().await, Some(ClientMessage::GameClosedByHost));
}

#[tokio::test]
async fn member_leave_keeps_game_open() {
    let registry = Registry::new();
    let (alice, _alice_inbox) = test_client("alice", "a:1");
    let (bob, _bob_inbox) = test_client("bob", "b:1");
    registry.add_client(alice).await;
    registry.add_client(bob).await;
    registry
        .check_add_game("alice", "g1", "m", "mode", 4)
        .await
        .unwrap();
    registry.join_game("bob", "g1").await.unwrap();

    let outcome = registry.leave_game("bob", "g1").await.unwrap();
    assert_eq!(outcome, LeaveOutcome::Left);
    let snap = registry.game_snapshot("g1").await.unwrap();
    assert_eq!(snap.players.len(), 1);
    assert!(snap.players.contains_key("alice"));
}

#[tokio::test]
async fn remove_client_cascades_through_games() {
    let registry = Registry::new();
    let (alice, _alice_inbox) = test_client("alice", "a:1");
    let alice_id = alice.id;
    let (bob, mut bob_inbox) = test_client("bob", "b:1");
    registry.add_client(alice).await;
    registry.add_client(bob).await;
    registry
        .check_add_game("alice", "g1", "m", "mode", 4)
        .await
        .unwrap();
    registry.join_game("bob", "g1").await.unwrap();

    // Disconnect cleanup: host vanishes, game closes, member notified.
    registry.remove_client("alice", alice_id).await;
    assert!(!registry.contains_client("alice").await);
    assert!(registry.game_snapshot("g1").await.is_none());
    assert_eq!(bob_inbox.recv().await, Some(ClientMessage::GameClosedByHost));
}

#[tokio::test]
async fn update_game_enforces_capacity_floor() {
    let registry = Registry::new();
    let (alice, _alice_inbox) = test_client("alice", "a:1");
    let (bob, _bob_inbox) = test_client("bob", "b:1");
    registry.add_client(alice).await;
    registry.add_client(bob).await;
    registry
        .check_add_game("alice", "g1", "m", "mode", 4)
        .await
        .unwrap();
    registry.join_game("bob", "g1").await.unwrap();

    assert_eq!(
        registry.update_game("g1", "m2", "mode2", 1).await,
        Err(RegistryError::CapacityTooLow)
    );
    registry.update_game("g1", "m2", "mode2", 2).await.unwrap();

    let snap = registry.game_snapshot("g1").await.unwrap();
    assert_eq!(snap.map, "m2");
    assert_eq!(snap.mode, "mode2");
    assert_eq!(snap.max_players, 2);
}

#[tokio::test]
async fn update_player_changes_slot() {
    let registry = Registry::new();
    let (alice, _inbox) = test_client("alice", "a:1");
    registry.add_client(alice).await;
    registry
        .check_add_game("alice", "g1", "m", "mode", 2)
        .await
        .unwrap();

    registry
        .update_player("g1", "alice", "aztec", 3, true)
        .await
        .unwrap();
    let snap = registry.game_snapshot("g1").await.unwrap();
    let slot = &snap.players["alice"];
    assert_eq!(slot.civ, "aztec");
    assert_eq!(slot.team, 3);
    assert!(slot.ready);
    assert!(snap.all_ready());

    assert_eq!(
        registry.update_player("g1", "bob", "x", 0, false).await,
        Err(RegistryError::NotInGame)
    );
}

#[tokio::test]
async fn broadcast_reaches_every_member() {
    let registry = Registry::new();
    let (alice, mut alice_inbox) = test_client("alice", "a:1");
    let (bob, mut bob_inbox) = test_client("bob", "b:1");
    let (carol, mut carol_inbox) = test_client("carol", "c:1");
    registry.add_client(alice).await;
    registry.add_client(bob).await;
    registry.add_client(carol).await;
    registry
        .check_add_game("alice", "g1", "m", "mode", 4)
        .await
        .unwrap();
    registry.join_game("bob", "g1").await.unwrap();

    let chat = ClientMessage::ChatFromThread {
        origin: "alice".into(),
        content: "hello".into(),
    };
    registry.broadcast_to_game("g1", chat.clone()).await;

    // Sender included, members only.
    assert_eq!(alice_inbox.recv().await, Some(chat.clone()));
    assert_eq!(bob_inbox.recv().await, Some(chat));
    assert!(carol_inbox.try_recv().is_err());
}

#[tokio::test]
async fn host_map_reports_peer_addresses() {
    let registry = Registry::new();
    let (alice, _alice_inbox) = test_client("alice", "10.0.0.1:4000");
    let (bob, _bob_inbox) = test_client("bob", "10.0.0.2:4001");
    registry.add_client(alice).await;
    registry.add_client(bob).await;
    registry
        .check_add_game("alice", "g1", "m", "mode", 2)
        .await
        .unwrap();
    registry.join_game("bob", "g1").await.unwrap();

    let map = registry.host_map("g1").await.unwrap();
    assert_eq!(map["alice"], "10.0.0.1:4000");
    assert_eq!(map["bob"], "10.0.0.2:4001");
    assert!(registry.host_map("nope").await.is_none());
}
