use anirec::chat::{ChatPhase, ChatState, ReplyOutcome, TickOutcome, REPLY_ERROR_TEXT};
use anirec::session::SessionStore;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use tempfile::TempDir;

fn make_token(sub: i64, username: &str, exp: i64) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
    let claims = URL_SAFE_NO_PAD
        .encode(serde_json::json!({ "sub": sub, "username": username, "exp": exp }).to_string());
    format!("{header}.{claims}.sig")
}

#[test]
fn send_reveal_complete_lifecycle() {
    let mut chat = ChatState::new();
    chat.draft = "hello".to_string();

    let intent = chat.begin_send().expect("send should be accepted");
    assert_eq!(chat.timeline.len(), 2);
    assert!(chat.timeline[0].is_user());
    assert_eq!(chat.timeline[0].visible_text(), "hello");
    assert!(chat.timeline[1].is_placeholder());

    // While the reply is pending, further sends are rejected.
    chat.draft = "impatient".to_string();
    assert!(chat.begin_send().is_none());
    chat.draft.clear();

    let ReplyOutcome::StartReveal(id) = chat.reply_arrived(intent.placeholder, "Hi there".into())
    else {
        panic!("expected a reveal to start");
    };
    assert!(chat.timeline.iter().all(|m| !m.is_placeholder()));

    // "Hi there" is 8 characters, so 8 ticks finish the reveal.
    for _ in 0..7 {
        assert_eq!(chat.reveal_tick(id), TickOutcome::Advanced);
        assert_eq!(chat.timeline.iter().filter(|m| m.is_revealing()).count(), 1);
    }
    assert_eq!(chat.reveal_tick(id), TickOutcome::Finished);
    assert_eq!(chat.timeline[1].visible_text(), "Hi there");
    assert_eq!(chat.phase, ChatPhase::Idle);

    // Sending works again once the reveal completed.
    chat.draft = "thanks".to_string();
    assert!(chat.begin_send().is_some());
}

#[test]
fn failed_send_degrades_to_error_message() {
    let mut chat = ChatState::new();
    chat.draft = "hello".to_string();
    let intent = chat.begin_send().unwrap();
    assert!(chat.reply_failed(intent.placeholder));
    assert_eq!(chat.timeline.last().unwrap().visible_text(), REPLY_ERROR_TEXT);
    assert_eq!(chat.phase, ChatPhase::Idle);
}

#[test]
fn deleting_active_conversation_clears_timeline_and_id() {
    let mut chat = ChatState::new();
    chat.load_history(
        "c1".to_string(),
        vec![anirec::api::HistoryMessage {
            role: "assistant".to_string(),
            content: "Watch Frieren.".to_string(),
            timestamp: Some("2026-08-01T10:00:00Z".to_string()),
        }],
    );
    assert_eq!(chat.active.as_deref(), Some("c1"));

    chat.clear_active();
    assert!(chat.timeline.is_empty());
    assert!(chat.active.is_none());
}

#[test]
fn session_restores_only_while_token_is_fresh() {
    let dir = TempDir::new().unwrap();
    let store = SessionStore::new(dir.path());

    let fresh = chrono::Utc::now().timestamp() + 3600;
    store.save(&make_token(7, "rei", fresh));
    let session = store.load().expect("fresh token should restore");
    assert_eq!(session.user_id, 7);
    assert_eq!(session.username, "rei");

    let stale = chrono::Utc::now().timestamp() - 3600;
    store.save(&make_token(7, "rei", stale));
    assert!(store.load().is_none());
    assert!(
        !dir.path().join("token").exists(),
        "expired token file should be removed"
    );
}
