use uuid::Uuid;

use crate::api::{ConversationId, ConversationSummary, HistoryMessage};

/// Synthetic assistant message appended when a send fails.
pub const REPLY_ERROR_TEXT: &str = "Error: Could not get response. Please try again.";

/// One timeline entry. The variants are the per-message lifecycle
/// states; a message only ever moves `Placeholder` -> `Revealing` ->
/// `Assistant`, and `User` entries are terminal on append.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    User { id: Uuid, text: String },
    Placeholder { id: Uuid },
    Revealing { id: Uuid, full: String, shown: usize },
    Assistant { id: Uuid, text: String },
}

impl Message {
    pub fn id(&self) -> Uuid {
        match self {
            Message::User { id, .. }
            | Message::Placeholder { id }
            | Message::Revealing { id, .. }
            | Message::Assistant { id, .. } => *id,
        }
    }

    /// Text currently shown for this entry. A revealing message exposes
    /// the prefix up to the current char boundary.
    pub fn visible_text(&self) -> &str {
        match self {
            Message::User { text, .. } | Message::Assistant { text, .. } => text,
            Message::Revealing { full, shown, .. } => &full[..*shown],
            Message::Placeholder { .. } => "",
        }
    }

    pub fn is_user(&self) -> bool {
        matches!(self, Message::User { .. })
    }

    pub fn is_placeholder(&self) -> bool {
        matches!(self, Message::Placeholder { .. })
    }

    pub fn is_revealing(&self) -> bool {
        matches!(self, Message::Revealing { .. })
    }
}

/// Send-lifecycle state of the chat screen. Sending is only accepted in
/// `Idle`, which is what keeps at most one reveal running.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatPhase {
    Idle,
    AwaitingReply { placeholder: Uuid },
    Revealing { message: Uuid },
}

/// Accepted send intent: the trimmed draft plus the placeholder id the
/// eventual reply must name.
#[derive(Debug, Clone)]
pub struct SendIntent {
    pub text: String,
    pub placeholder: Uuid,
}

#[derive(Debug, PartialEq, Eq)]
pub enum ReplyOutcome {
    /// Reveal started for the given message id; schedule the animator.
    StartReveal(Uuid),
    /// Empty reply, jumped straight to a completed message.
    Done,
    /// The reply named a placeholder that is no longer pending.
    Stale,
}

#[derive(Debug, PartialEq, Eq)]
pub enum TickOutcome {
    Advanced,
    /// Reveal finished; the animator must be cancelled.
    Finished,
    Stale,
}

/// Timeline, draft, and sidebar state for the chat screen.
#[derive(Debug)]
pub struct ChatState {
    pub draft: String,
    pub timeline: Vec<Message>,
    pub phase: ChatPhase,
    pub conversations: Vec<ConversationSummary>,
    pub selected: usize,
    pub active: Option<ConversationId>,
    pub sidebar_open: bool,
    /// History scroll, in lines up from the bottom. Zero means pinned
    /// to the newest message.
    pub scroll_from_bottom: u16,
}

impl ChatState {
    pub fn new() -> Self {
        Self {
            draft: String::new(),
            timeline: Vec::new(),
            phase: ChatPhase::Idle,
            conversations: Vec::new(),
            selected: 0,
            active: None,
            sidebar_open: false,
            scroll_from_bottom: 0,
        }
    }

    pub fn is_busy(&self) -> bool {
        self.phase != ChatPhase::Idle
    }

    /// Accepts the current draft as a send if the phase allows it.
    /// Appends the user message and the placeholder, and moves to
    /// `AwaitingReply`. Returns `None` (a no-op) while busy or when the
    /// draft is blank.
    pub fn begin_send(&mut self) -> Option<SendIntent> {
        if self.is_busy() {
            return None;
        }
        let text = self.draft.trim().to_string();
        if text.is_empty() {
            return None;
        }
        self.draft.clear();
        self.timeline.push(Message::User {
            id: Uuid::new_v4(),
            text: text.clone(),
        });
        let placeholder = Uuid::new_v4();
        self.timeline.push(Message::Placeholder { id: placeholder });
        self.phase = ChatPhase::AwaitingReply { placeholder };
        self.scroll_from_bottom = 0;
        Some(SendIntent { text, placeholder })
    }

    /// Folds the service reply into the timeline. The placeholder is
    /// removed; a non-empty body starts a reveal, an empty one
    /// completes immediately.
    pub fn reply_arrived(&mut self, placeholder: Uuid, full: String) -> ReplyOutcome {
        if self.phase != (ChatPhase::AwaitingReply { placeholder }) {
            return ReplyOutcome::Stale;
        }
        self.remove_placeholder(placeholder);
        self.scroll_from_bottom = 0;
        if full.is_empty() {
            self.timeline.push(Message::Assistant {
                id: Uuid::new_v4(),
                text: full,
            });
            self.phase = ChatPhase::Idle;
            return ReplyOutcome::Done;
        }
        let id = Uuid::new_v4();
        self.timeline.push(Message::Revealing { id, full, shown: 0 });
        self.phase = ChatPhase::Revealing { message: id };
        ReplyOutcome::StartReveal(id)
    }

    /// Send failure: placeholder out, fixed error message in, input
    /// unblocked. Returns false when the failure is stale.
    pub fn reply_failed(&mut self, placeholder: Uuid) -> bool {
        if self.phase != (ChatPhase::AwaitingReply { placeholder }) {
            return false;
        }
        self.remove_placeholder(placeholder);
        self.timeline.push(Message::Assistant {
            id: Uuid::new_v4(),
            text: REPLY_ERROR_TEXT.to_string(),
        });
        self.phase = ChatPhase::Idle;
        true
    }

    /// Advances the running reveal by one character. Ticks for any
    /// other message id are stale and ignored.
    pub fn reveal_tick(&mut self, id: Uuid) -> TickOutcome {
        if self.phase != (ChatPhase::Revealing { message: id }) {
            return TickOutcome::Stale;
        }
        let Some(entry) = self.timeline.iter_mut().find(|m| m.id() == id) else {
            return TickOutcome::Stale;
        };
        let Message::Revealing { full, shown, .. } = entry else {
            return TickOutcome::Stale;
        };
        if let Some(c) = full[*shown..].chars().next() {
            *shown += c.len_utf8();
        }
        if *shown >= full.len() {
            let text = std::mem::take(full);
            *entry = Message::Assistant { id, text };
            self.phase = ChatPhase::Idle;
            return TickOutcome::Finished;
        }
        TickOutcome::Advanced
    }

    /// Replaces the timeline with a loaded conversation history. Any
    /// in-progress send or reveal is abandoned (the caller cancels the
    /// animator; a late reply will be stale by phase mismatch).
    pub fn load_history(&mut self, id: ConversationId, messages: Vec<HistoryMessage>) {
        self.timeline = messages
            .into_iter()
            .map(|m| {
                let mid = Uuid::new_v4();
                if m.role == "user" {
                    Message::User {
                        id: mid,
                        text: m.content,
                    }
                } else {
                    Message::Assistant {
                        id: mid,
                        text: m.content,
                    }
                }
            })
            .collect();
        self.active = Some(id);
        self.phase = ChatPhase::Idle;
        self.scroll_from_bottom = 0;
    }

    /// Clears the active conversation, used after deleting it.
    pub fn clear_active(&mut self) {
        self.timeline.clear();
        self.active = None;
        self.phase = ChatPhase::Idle;
        self.scroll_from_bottom = 0;
    }

    pub fn set_conversations(&mut self, conversations: Vec<ConversationSummary>) {
        self.conversations = conversations;
        if self.selected >= self.conversations.len() {
            self.selected = self.conversations.len().saturating_sub(1);
        }
    }

    pub fn selected_conversation(&self) -> Option<&ConversationSummary> {
        self.conversations.get(self.selected)
    }

    pub fn select_prev(&mut self) {
        self.selected = self.selected.saturating_sub(1);
    }

    pub fn select_next(&mut self) {
        if self.selected + 1 < self.conversations.len() {
            self.selected += 1;
        }
    }

    pub fn scroll_up(&mut self) {
        self.scroll_from_bottom = self.scroll_from_bottom.saturating_add(1);
    }

    pub fn scroll_down(&mut self) {
        self.scroll_from_bottom = self.scroll_from_bottom.saturating_sub(1);
    }

    fn remove_placeholder(&mut self, id: Uuid) {
        self.timeline.retain(|m| !(m.is_placeholder() && m.id() == id));
    }
}

impl Default for ChatState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run_reveal_to_end(chat: &mut ChatState, id: Uuid) -> usize {
        let mut ticks = 0;
        loop {
            ticks += 1;
            match chat.reveal_tick(id) {
                TickOutcome::Advanced => continue,
                TickOutcome::Finished => return ticks,
                TickOutcome::Stale => panic!("tick went stale mid-reveal"),
            }
        }
    }

    #[test]
    fn send_appends_user_then_placeholder() {
        let mut chat = ChatState::new();
        chat.draft = "hello".to_string();
        let intent = chat.begin_send().unwrap();
        assert_eq!(intent.text, "hello");
        assert_eq!(chat.timeline.len(), 2);
        assert!(chat.timeline[0].is_user());
        assert!(chat.timeline[1].is_placeholder());
        assert!(chat.is_busy());
        assert!(chat.draft.is_empty());
    }

    #[test]
    fn blank_draft_is_a_noop() {
        let mut chat = ChatState::new();
        chat.draft = "   \n".to_string();
        assert!(chat.begin_send().is_none());
        assert!(chat.timeline.is_empty());
        assert_eq!(chat.phase, ChatPhase::Idle);
    }

    #[test]
    fn send_rejected_while_busy() {
        let mut chat = ChatState::new();
        chat.draft = "first".to_string();
        chat.begin_send().unwrap();
        chat.draft = "second".to_string();
        assert!(chat.begin_send().is_none());
        assert_eq!(chat.timeline.len(), 2);
    }

    #[test]
    fn reply_replaces_placeholder_and_reveal_runs_to_completion() {
        let mut chat = ChatState::new();
        chat.draft = "hello".to_string();
        let intent = chat.begin_send().unwrap();

        let outcome = chat.reply_arrived(intent.placeholder, "Hi there".to_string());
        let ReplyOutcome::StartReveal(id) = outcome else {
            panic!("expected a reveal to start");
        };
        assert!(chat.timeline.iter().all(|m| !m.is_placeholder()));
        assert_eq!(chat.timeline.len(), 2);

        let ticks = run_reveal_to_end(&mut chat, id);
        assert_eq!(ticks, "Hi there".len());
        assert_eq!(chat.timeline[1].visible_text(), "Hi there");
        assert_eq!(chat.phase, ChatPhase::Idle);
    }

    #[test]
    fn at_most_one_revealing_message_ever() {
        let mut chat = ChatState::new();
        for round in 0..3 {
            chat.draft = format!("msg {round}");
            let intent = chat.begin_send().unwrap();
            let ReplyOutcome::StartReveal(id) =
                chat.reply_arrived(intent.placeholder, "ok!".to_string())
            else {
                panic!("expected reveal");
            };
            loop {
                let revealing = chat.timeline.iter().filter(|m| m.is_revealing()).count();
                assert!(revealing <= 1);
                if chat.reveal_tick(id) == TickOutcome::Finished {
                    break;
                }
            }
        }
        assert_eq!(chat.timeline.iter().filter(|m| m.is_revealing()).count(), 0);
    }

    #[test]
    fn empty_reply_completes_without_reveal() {
        let mut chat = ChatState::new();
        chat.draft = "anything".to_string();
        let intent = chat.begin_send().unwrap();
        assert_eq!(
            chat.reply_arrived(intent.placeholder, String::new()),
            ReplyOutcome::Done
        );
        assert_eq!(chat.phase, ChatPhase::Idle);
        assert!(chat.timeline.iter().all(|m| !m.is_revealing()));
    }

    #[test]
    fn multibyte_reveal_lands_exactly_on_full_text() {
        let mut chat = ChatState::new();
        chat.draft = "recs".to_string();
        let intent = chat.begin_send().unwrap();
        let text = "観てね ☆ enjoy";
        let ReplyOutcome::StartReveal(id) = chat.reply_arrived(intent.placeholder, text.to_string())
        else {
            panic!("expected reveal");
        };
        let ticks = run_reveal_to_end(&mut chat, id);
        assert_eq!(ticks, text.chars().count());
        assert_eq!(chat.timeline[1].visible_text(), text);
    }

    #[test]
    fn failure_appends_error_message_and_unblocks() {
        let mut chat = ChatState::new();
        chat.draft = "hello".to_string();
        let intent = chat.begin_send().unwrap();
        assert!(chat.reply_failed(intent.placeholder));
        assert_eq!(chat.phase, ChatPhase::Idle);
        assert_eq!(chat.timeline.len(), 2);
        assert_eq!(chat.timeline[1].visible_text(), REPLY_ERROR_TEXT);
        assert!(chat.timeline.iter().all(|m| !m.is_placeholder()));
    }

    #[test]
    fn stale_reply_and_ticks_mutate_nothing() {
        let mut chat = ChatState::new();
        chat.draft = "hello".to_string();
        let intent = chat.begin_send().unwrap();
        // Conversation switch abandons the pending send.
        chat.load_history("c9".to_string(), Vec::new());

        assert_eq!(
            chat.reply_arrived(intent.placeholder, "late".to_string()),
            ReplyOutcome::Stale
        );
        assert!(!chat.reply_failed(intent.placeholder));
        assert_eq!(chat.reveal_tick(intent.placeholder), TickOutcome::Stale);
        assert!(chat.timeline.is_empty());
        assert_eq!(chat.phase, ChatPhase::Idle);
    }

    #[test]
    fn history_maps_roles_to_senders() {
        let mut chat = ChatState::new();
        chat.load_history(
            "c1".to_string(),
            vec![
                HistoryMessage {
                    role: "user".to_string(),
                    content: "any mecha?".to_string(),
                    timestamp: None,
                },
                HistoryMessage {
                    role: "assistant".to_string(),
                    content: "Try Gurren Lagann.".to_string(),
                    timestamp: None,
                },
            ],
        );
        assert_eq!(chat.active.as_deref(), Some("c1"));
        assert!(chat.timeline[0].is_user());
        assert!(!chat.timeline[1].is_user());
        assert_eq!(chat.timeline[1].visible_text(), "Try Gurren Lagann.");
    }

    #[test]
    fn clearing_active_conversation_empties_timeline() {
        let mut chat = ChatState::new();
        chat.load_history(
            "c1".to_string(),
            vec![HistoryMessage {
                role: "user".to_string(),
                content: "hi".to_string(),
                timestamp: None,
            }],
        );
        chat.clear_active();
        assert!(chat.timeline.is_empty());
        assert!(chat.active.is_none());
    }
}
