//! End-to-end session scenarios over wire-encoded frames.
//!
//! Exercises the session the way a driver does: frames arrive as wire
//! text and go through the codec before dispatch, so the proto and core
//! layers are tested together.

use std::time::Duration;

use staychat_core::{ChatSession, SessionAction, SessionConfig, SessionState};
use staychat_proto::{Command, Frame, UserId, headers};

const GUEST: UserId = 200;

fn test_config() -> SessionConfig {
    SessionConfig {
        settle_delay: Duration::ZERO,
        reconnect_delay: Duration::ZERO,
        heartbeat_interval: Duration::from_secs(10),
    }
}

/// Decode wire text and feed it to the session.
#[allow(clippy::unwrap_used)]
fn feed(session: &mut ChatSession, wire: &str) -> Vec<SessionAction> {
    let frame = Frame::decode(wire).unwrap();
    session.handle_frame(&frame).unwrap()
}

#[allow(clippy::unwrap_used)]
fn current_subscription_header(session: &ChatSession) -> String {
    session.subscription().unwrap().id.to_string()
}

#[test]
#[allow(clippy::unwrap_used)]
fn guest_conversation_survives_a_reconnect() {
    let mut session = ChatSession::new(GUEST, test_config());

    // Connect and land in room 31.
    session.connect("guest-token").unwrap();
    let actions = session.transport_opened();
    let SessionAction::SendFrame(connect) = &actions[0] else {
        panic!("expected CONNECT frame, got {actions:?}");
    };
    assert_eq!(connect.command(), Command::Connect);
    assert_eq!(connect.header(headers::AUTHORIZATION), Some("Bearer guest-token"));

    feed(&mut session, "CONNECTED\nversion:1.2\n\n\0");
    assert_eq!(session.state(), SessionState::Connected);

    session.subscribe_to_room(31).unwrap();
    let sub = current_subscription_header(&session);

    // Both parties talk; the guest's own echo starts unread.
    feed(
        &mut session,
        &format!(
            "MESSAGE\nsubscription:{sub}\ndestination:/topic/chatroom/31\n\n\
             {{\"senderUserId\":200,\"content\":\"arriving around 9pm\"}}\0"
        ),
    );
    feed(
        &mut session,
        &format!(
            "MESSAGE\nsubscription:{sub}\ndestination:/topic/chatroom/31\n\n\
             {{\"senderUserId\":100,\"senderName\":\"Host Kim\",\"content\":\"no problem\"}}\0"
        ),
    );
    assert_eq!(session.messages().len(), 2);
    assert_eq!(session.messages()[0].read_by_recipient, Some(false));
    assert_eq!(session.messages()[1].read_by_recipient, None);

    // The host reads the room.
    feed(
        &mut session,
        &format!("MESSAGE\nsubscription:{sub}\n\n{{\"type\":\"MESSAGES_READ\",\"readerId\":100}}\0"),
    );
    assert_eq!(session.messages()[0].read_by_recipient, Some(true));

    // Network drop. The room stays targeted; a retry is scheduled.
    let actions = session.transport_closed();
    assert!(actions.iter().any(|a| matches!(a, SessionAction::ScheduleReconnect { .. })));
    assert_eq!(session.state(), SessionState::Disconnected);
    assert_eq!(session.active_room(), Some(31));

    // Retry fires, handshake succeeds, settle elapses: resubscribed to
    // the same room on a fresh subscription id, log cleared.
    assert_eq!(session.reconnect_elapsed(), vec![SessionAction::OpenTransport]);
    session.transport_opened();
    feed(&mut session, "CONNECTED\nversion:1.2\n\n\0");
    let actions = session.settle_elapsed();
    let SessionAction::SendFrame(subscribe) = &actions[0] else {
        panic!("expected SUBSCRIBE frame, got {actions:?}");
    };
    assert_eq!(subscribe.command(), Command::Subscribe);
    assert_eq!(subscribe.header(headers::DESTINATION), Some("/topic/chatroom/31"));
    assert_ne!(subscribe.header(headers::ID), Some(sub.as_str()));
    assert!(session.messages().is_empty());

    // A frame buffered under the pre-drop subscription id is stale now.
    feed(
        &mut session,
        &format!("MESSAGE\nsubscription:{sub}\n\n{{\"senderUserId\":100,\"content\":\"ghost\"}}\0"),
    );
    assert!(session.messages().is_empty());

    // The host speaks on the live subscription.
    let sub = current_subscription_header(&session);
    feed(
        &mut session,
        &format!("MESSAGE\nsubscription:{sub}\n\n{{\"senderUserId\":100,\"content\":\"welcome back\"}}\0"),
    );
    assert_eq!(session.messages().len(), 1);

    // Clean teardown.
    let actions = session.disconnect();
    assert!(actions.contains(&SessionAction::CloseTransport));
    assert!(session.messages().is_empty());
    assert!(feed(&mut session, "CONNECTED\n\n\0").is_empty());
}

#[test]
#[allow(clippy::unwrap_used)]
fn handshake_rejection_downgrades_without_killing_the_session() {
    let mut session = ChatSession::new(GUEST, test_config());
    session.connect("expired-token").unwrap();
    session.transport_opened();

    let actions = feed(&mut session, "ERROR\nmessage:invalid credentials\n\n\0");

    assert_eq!(session.state(), SessionState::Failing);
    assert!(actions.iter().any(|a| matches!(a, SessionAction::ScheduleReconnect { .. })));

    // The retry path re-runs the full handshake with the held credential.
    session.reconnect_elapsed();
    let actions = session.transport_opened();
    let SessionAction::SendFrame(connect) = &actions[0] else {
        panic!("expected CONNECT frame, got {actions:?}");
    };
    assert_eq!(connect.header(headers::AUTHORIZATION), Some("Bearer expired-token"));
}
