use color_eyre::eyre::OptionExt;
use futures::{FutureExt, StreamExt};
use ratatui::crossterm::event::Event as CrosstermEvent;
use std::time::Duration;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::api::{ConversationId, ConversationSummary, HistoryMessage};

/// The frequency at which tick events are emitted.
const TICK_FPS: f64 = 30.0;

/// Representation of all possible events.
#[derive(Clone, Debug)]
pub enum Event {
    /// An event that is emitted on a regular schedule.
    Tick,
    /// Crossterm events.
    Crossterm(CrosstermEvent),
    /// Application events.
    App(AppEvent),
}

/// Application events. Everything a spawned task reports back to the
/// main loop travels through one of these.
#[derive(Debug, Clone)]
pub enum AppEvent {
    // System
    Quit,

    // Session
    LoggedIn {
        token: String,
        user_id: i64,
        username: String,
    },
    LoginFailed(String),
    Registered,
    RegisterFailed(String),
    SessionExpired,

    // Conversations
    ConversationsLoaded(Vec<ConversationSummary>),
    ConversationLoaded {
        id: ConversationId,
        messages: Vec<HistoryMessage>,
    },
    ConversationCreated(ConversationId),
    ConversationDeleted(ConversationId),

    // Chat lifecycle
    ChatReply {
        placeholder: Uuid,
        response: String,
        conversation_id: ConversationId,
    },
    ChatFailed {
        placeholder: Uuid,
    },
    RevealTick(Uuid),
}

/// Cloneable handle for feeding application events into the main loop
/// from spawned tasks (network calls, the reveal animator).
#[derive(Debug, Clone)]
pub struct EventSender {
    pub(crate) sender: mpsc::UnboundedSender<Event>,
}

impl EventSender {
    /// Sends an application event. Returns false once the receiving
    /// side has shut down.
    pub fn send(&self, app_event: AppEvent) -> bool {
        self.sender.send(Event::App(app_event)).is_ok()
    }
}

/// Terminal event handler.
#[derive(Debug)]
pub struct EventHandler {
    /// Event sender channel.
    sender: mpsc::UnboundedSender<Event>,
    /// Event receiver channel.
    receiver: mpsc::UnboundedReceiver<Event>,
}

impl EventHandler {
    /// Constructs a new instance of [`EventHandler`] and spawns a new thread to handle events.
    pub fn new() -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        let actor = EventTask::new(sender.clone());
        tokio::spawn(async { actor.run().await });
        Self { sender, receiver }
    }

    /// Receives an event from the sender.
    pub async fn next(&mut self) -> color_eyre::Result<Event> {
        self.receiver
            .recv()
            .await
            .ok_or_eyre("Failed to receive event")
    }

    /// Queue an app event to be sent to the event receiver.
    pub fn send(&mut self, app_event: AppEvent) {
        let _ = self.sender.send(Event::App(app_event));
    }

    /// A cloneable sender for spawned tasks.
    pub fn handle(&self) -> EventSender {
        EventSender {
            sender: self.sender.clone(),
        }
    }
}

impl Default for EventHandler {
    fn default() -> Self {
        Self::new()
    }
}

/// A thread that handles reading crossterm events and emitting tick events on a regular schedule.
struct EventTask {
    /// Event sender channel.
    sender: mpsc::UnboundedSender<Event>,
}

impl EventTask {
    /// Constructs a new instance of [`EventTask`].
    fn new(sender: mpsc::UnboundedSender<Event>) -> Self {
        Self { sender }
    }

    /// Runs the event thread.
    async fn run(self) -> color_eyre::Result<()> {
        let tick_rate = Duration::from_secs_f64(1.0 / TICK_FPS);
        let mut reader = crossterm::event::EventStream::new();
        let mut tick = tokio::time::interval(tick_rate);
        loop {
            let tick_delay = tick.tick();
            let crossterm_event = reader.next().fuse();
            tokio::select! {
              _ = self.sender.closed() => {
                break;
              }
              _ = tick_delay => {
                self.send(Event::Tick);
              }
              Some(Ok(evt)) = crossterm_event => {
                self.send(Event::Crossterm(evt));
              }
            };
        }
        Ok(())
    }

    /// Sends an event to the receiver.
    fn send(&self, event: Event) {
        let _ = self.sender.send(event);
    }
}
