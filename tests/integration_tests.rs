//! Integration tests for the duel-arena matchmaking service
//!
//! These tests drive the dispatcher through the same inbound events the
//! WebSocket layer produces and assert on the outbound broadcasts recorded
//! by the test sink: complete pairing workflows, finalization races,
//! disconnect cleanup, and cancellation.

use duel_arena::dispatch::{Dispatcher, RecordingEventSink};
use duel_arena::metrics::MetricsCollector;
use duel_arena::problem::{ProblemProvider, StaticProblemCatalog};
use duel_arena::types::{ClientMessage, ConnectionId, ServerMessage, SessionId};
use duel_arena::utils::generate_connection_id;
use std::sync::Arc;

/// Integration test setup that creates a complete dispatch pipeline
fn create_test_system() -> (Dispatcher, Arc<RecordingEventSink>, Arc<StaticProblemCatalog>) {
    let problems = Arc::new(
        StaticProblemCatalog::new(vec![
            "two-sum".to_string(),
            "valid-parentheses".to_string(),
            "merge-intervals".to_string(),
        ])
        .unwrap(),
    );
    let sink = Arc::new(RecordingEventSink::new());
    let metrics = Arc::new(MetricsCollector::new().unwrap());
    let dispatcher = Dispatcher::new(problems.clone(), sink.clone(), metrics);

    (dispatcher, sink, problems)
}

async fn send(dispatcher: &Dispatcher, connection_id: ConnectionId, message: ClientMessage) {
    dispatcher
        .handle_message(connection_id, message)
        .await
        .unwrap();
}

async fn start_matchmaking(dispatcher: &Dispatcher, name: &str) -> ConnectionId {
    let connection_id = generate_connection_id();
    send(
        dispatcher,
        connection_id,
        ClientMessage::StartMatchmaking {
            username: name.to_string(),
        },
    )
    .await;
    connection_id
}

fn match_found_for(
    sink: &RecordingEventSink,
    connection_id: ConnectionId,
) -> Option<(SessionId, String)> {
    sink.messages_for(connection_id)
        .into_iter()
        .find_map(|msg| match msg {
            ServerMessage::MatchFound {
                room_id,
                problem_id,
            } => Some((room_id, problem_id)),
            _ => None,
        })
}

#[tokio::test]
async fn test_two_players_receive_identical_match_found() {
    let (dispatcher, sink, problems) = create_test_system();

    let alice = start_matchmaking(&dispatcher, "alice").await;
    let bob = start_matchmaking(&dispatcher, "bob").await;

    let (room_a, problem_a) = match_found_for(&sink, alice).expect("alice got no matchFound");
    let (room_b, problem_b) = match_found_for(&sink, bob).expect("bob got no matchFound");

    assert_eq!(room_a, room_b);
    assert_eq!(problem_a, problem_b);
    assert!(problems.catalog().contains(&problem_a));
}

#[tokio::test]
async fn test_submission_broadcasts_game_over_and_removes_room() {
    let (dispatcher, sink, _) = create_test_system();

    let alice = start_matchmaking(&dispatcher, "alice").await;
    let bob = start_matchmaking(&dispatcher, "bob").await;
    let (room_id, _) = match_found_for(&sink, alice).unwrap();
    sink.clear();

    send(
        &dispatcher,
        alice,
        ClientMessage::SubmitCorrectSolution { room_id },
    )
    .await;

    // Both participants receive gameOver naming alice as winner.
    for connection_id in [alice, bob] {
        let messages = sink.messages_for(connection_id);
        assert_eq!(messages.len(), 1);
        match &messages[0] {
            ServerMessage::GameOver { winner, .. } => assert_eq!(*winner, alice),
            other => panic!("unexpected message: {:?}", other),
        }
    }

    assert_eq!(dispatcher.active_session_count(), 0);

    // A racing second submission for the same room is silent.
    sink.clear();
    send(
        &dispatcher,
        bob,
        ClientMessage::SubmitCorrectSolution { room_id },
    )
    .await;
    assert!(sink.sent_messages().is_empty());
}

#[tokio::test]
async fn test_cancelled_player_is_not_paired() {
    let (dispatcher, sink, _) = create_test_system();

    // Carol joins, then cancels before any pairing.
    let carol = start_matchmaking(&dispatcher, "carol").await;
    send(&dispatcher, carol, ClientMessage::CancelMatchmaking).await;

    // A later join by Dave does not pair with Carol; Dave waits alone.
    let dave = start_matchmaking(&dispatcher, "dave").await;

    assert!(match_found_for(&sink, carol).is_none());
    assert!(match_found_for(&sink, dave).is_none());
    assert!(dispatcher.is_queued(dave));
    assert_eq!(dispatcher.waiting_count(), 1);
    assert_eq!(dispatcher.active_session_count(), 0);
}

#[tokio::test]
async fn test_disconnect_notifies_opponent_once_and_removes_room() {
    let (dispatcher, sink, _) = create_test_system();

    let alice = start_matchmaking(&dispatcher, "alice").await;
    let bob = start_matchmaking(&dispatcher, "bob").await;
    let (room_id, _) = match_found_for(&sink, alice).unwrap();
    sink.clear();

    dispatcher.handle_disconnect(bob).await.unwrap();

    assert_eq!(
        sink.messages_for(alice),
        vec![ServerMessage::OpponentDisconnected]
    );
    assert_eq!(dispatcher.active_session_count(), 0);

    // A later submission for the abandoned room is a no-op.
    sink.clear();
    send(
        &dispatcher,
        alice,
        ClientMessage::SubmitCorrectSolution { room_id },
    )
    .await;
    assert!(sink.sent_messages().is_empty());
}

#[tokio::test]
async fn test_fifo_fairness_across_many_joins() {
    let (dispatcher, sink, _) = create_test_system();

    let mut connections = Vec::new();
    for i in 0..5 {
        connections.push(start_matchmaking(&dispatcher, &format!("player{}", i)).await);
    }

    // Arrival order pairing: (0,1) and (2,3) matched, 4 still waiting.
    let (room_01a, _) = match_found_for(&sink, connections[0]).unwrap();
    let (room_01b, _) = match_found_for(&sink, connections[1]).unwrap();
    let (room_23a, _) = match_found_for(&sink, connections[2]).unwrap();
    let (room_23b, _) = match_found_for(&sink, connections[3]).unwrap();

    assert_eq!(room_01a, room_01b);
    assert_eq!(room_23a, room_23b);
    assert_ne!(room_01a, room_23a);
    assert!(match_found_for(&sink, connections[4]).is_none());
    assert!(dispatcher.is_queued(connections[4]));
    assert_eq!(dispatcher.active_session_count(), 2);
}

#[tokio::test]
async fn test_concurrent_joins_pair_everyone_exactly_once() {
    let (dispatcher, sink, _) = create_test_system();
    let dispatcher = Arc::new(dispatcher);

    let mut handles = Vec::new();
    let mut connections = Vec::new();
    for i in 0..20 {
        let connection_id = generate_connection_id();
        connections.push(connection_id);
        let dispatcher = dispatcher.clone();
        handles.push(tokio::spawn(async move {
            dispatcher
                .handle_join(connection_id, format!("player{}", i))
                .await
                .unwrap();
        }));
    }
    for result in futures::future::join_all(handles).await {
        result.unwrap();
    }

    // 20 joins form exactly 10 sessions; every participant got exactly one
    // matchFound and nobody is left in the queue.
    assert_eq!(dispatcher.waiting_count(), 0);
    assert_eq!(dispatcher.active_session_count(), 10);
    for connection_id in connections {
        let found = sink
            .messages_for(connection_id)
            .into_iter()
            .filter(|m| matches!(m, ServerMessage::MatchFound { .. }))
            .count();
        assert_eq!(found, 1);
    }
}

#[tokio::test]
async fn test_disconnect_racing_pairing_never_strands_survivor() {
    // A participant can drop while the opponent's join is mid-pairing. No
    // interleaving may leave an active session holding the departed
    // connection while the survivor is never told.
    for _ in 0..50 {
        let (dispatcher, sink, _) = create_test_system();
        let dispatcher = Arc::new(dispatcher);

        let alice = start_matchmaking(&dispatcher, "alice").await;
        let bob = generate_connection_id();

        let join = {
            let dispatcher = dispatcher.clone();
            tokio::spawn(async move { dispatcher.handle_join(bob, "bob".to_string()).await })
        };
        let drop_alice = {
            let dispatcher = dispatcher.clone();
            tokio::spawn(async move { dispatcher.handle_disconnect(alice).await })
        };
        let (join, drop_alice) = futures::future::join(join, drop_alice).await;
        join.unwrap().unwrap();
        drop_alice.unwrap().unwrap();

        // Either the disconnect beat the pairing (bob waits alone) or the
        // pair formed and was immediately abandoned with bob notified.
        assert_eq!(dispatcher.active_session_count(), 0);
        if match_found_for(&sink, bob).is_some() {
            assert!(sink
                .messages_for(bob)
                .contains(&ServerMessage::OpponentDisconnected));
        } else {
            assert!(dispatcher.is_queued(bob));
        }
    }
}

#[tokio::test]
async fn test_racing_submissions_produce_single_game_over() {
    let (dispatcher, sink, _) = create_test_system();
    let dispatcher = Arc::new(dispatcher);

    let alice = start_matchmaking(&dispatcher, "alice").await;
    let bob = start_matchmaking(&dispatcher, "bob").await;
    let (room_id, _) = match_found_for(&sink, alice).unwrap();
    sink.clear();

    let submit_a = {
        let dispatcher = dispatcher.clone();
        tokio::spawn(async move { dispatcher.handle_submit(alice, room_id).await })
    };
    let submit_b = {
        let dispatcher = dispatcher.clone();
        tokio::spawn(async move { dispatcher.handle_submit(bob, room_id).await })
    };
    submit_a.await.unwrap().unwrap();
    submit_b.await.unwrap().unwrap();

    // Exactly one submission won: one gameOver per participant, both naming
    // the same winner.
    let game_overs: Vec<_> = sink
        .sent_messages()
        .into_iter()
        .filter(|(_, m)| matches!(m, ServerMessage::GameOver { .. }))
        .collect();
    assert_eq!(game_overs.len(), 2);

    let winners: Vec<ConnectionId> = game_overs
        .iter()
        .map(|(_, m)| match m {
            ServerMessage::GameOver { winner, .. } => *winner,
            _ => unreachable!(),
        })
        .collect();
    assert_eq!(winners[0], winners[1]);
    assert!(winners[0] == alice || winners[0] == bob);
}

#[tokio::test]
async fn test_winner_can_requeue_after_session_ends() {
    let (dispatcher, sink, _) = create_test_system();

    let alice = start_matchmaking(&dispatcher, "alice").await;
    let _bob = start_matchmaking(&dispatcher, "bob").await;
    let (room_id, _) = match_found_for(&sink, alice).unwrap();

    send(
        &dispatcher,
        alice,
        ClientMessage::SubmitCorrectSolution { room_id },
    )
    .await;
    sink.clear();

    // With the session terminal, alice's connection may queue again.
    send(
        &dispatcher,
        alice,
        ClientMessage::StartMatchmaking {
            username: "alice".to_string(),
        },
    )
    .await;
    assert!(dispatcher.is_queued(alice));
}
