use crate::api::{ApiClient, ApiError, ConversationId};
use crate::chat::{ChatState, ReplyOutcome, TickOutcome};
use crate::config::Config;
use crate::event::{AppEvent, Event, EventHandler};
use crate::reveal::RevealAnimator;
use crate::session::{Session, SessionStore};
use color_eyre::Result;
use ratatui::{
    crossterm::event::{Event as CrosstermEvent, KeyCode, KeyEvent, KeyModifiers},
    DefaultTerminal,
};
use std::time::Duration;

#[derive(Debug, PartialEq, Eq)]
pub enum Screen {
    Login,
    Register,
    Chat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginField {
    Username,
    Password,
}

#[derive(Debug)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
    pub focus: LoginField,
    pub error: Option<String>,
    /// One-shot notice line (post-registration, session expiry).
    pub flash: Option<String>,
    pub busy: bool,
}

impl LoginForm {
    fn new() -> Self {
        Self {
            username: String::new(),
            password: String::new(),
            focus: LoginField::Username,
            error: None,
            flash: None,
            busy: false,
        }
    }

    fn focused_field(&mut self) -> &mut String {
        match self.focus {
            LoginField::Username => &mut self.username,
            LoginField::Password => &mut self.password,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegisterField {
    Username,
    Email,
    Password,
    Confirm,
}

#[derive(Debug)]
pub struct RegisterForm {
    pub username: String,
    pub email: String,
    pub password: String,
    pub confirm: String,
    pub focus: RegisterField,
    pub error: Option<String>,
    pub busy: bool,
}

impl RegisterForm {
    fn new() -> Self {
        Self {
            username: String::new(),
            email: String::new(),
            password: String::new(),
            confirm: String::new(),
            focus: RegisterField::Username,
            error: None,
            busy: false,
        }
    }

    fn focused_field(&mut self) -> &mut String {
        match self.focus {
            RegisterField::Username => &mut self.username,
            RegisterField::Email => &mut self.email,
            RegisterField::Password => &mut self.password,
            RegisterField::Confirm => &mut self.confirm,
        }
    }

    fn next_field(&mut self) {
        self.focus = match self.focus {
            RegisterField::Username => RegisterField::Email,
            RegisterField::Email => RegisterField::Password,
            RegisterField::Password => RegisterField::Confirm,
            RegisterField::Confirm => RegisterField::Username,
        };
    }
}

/// Chat-screen modal, if one is open.
#[derive(Debug, PartialEq, Eq)]
pub enum Modal {
    None,
    NewConversation {
        title: String,
    },
    Rename {
        id: ConversationId,
        title: String,
    },
    ConfirmDelete {
        id: ConversationId,
        title: String,
    },
}

/// Application.
#[derive(Debug)]
pub struct App {
    /// Is the application running?
    pub running: bool,
    /// Current screen.
    pub screen: Screen,
    pub login: LoginForm,
    pub register: RegisterForm,
    pub chat: ChatState,
    pub modal: Modal,
    pub session: Option<Session>,
    store: SessionStore,
    api: ApiClient,
    animator: RevealAnimator,
    config: Config,
    /// Event handler.
    pub events: EventHandler,
    /// Frame counter driving the placeholder-dots animation.
    pub tick_count: u64,
}

impl App {
    /// Constructs a new instance of [`App`]. Restores a persisted
    /// session when the token on disk is still valid.
    pub fn new(config: Config) -> Result<Self> {
        let store = SessionStore::new(&crate::config::data_dir()?);
        let session = store.load();
        let mut api = ApiClient::new(
            &config.service_url,
            Duration::from_secs(config.request_timeout_secs),
        )?;
        api.set_token(session.as_ref().map(|s| s.token.clone()));
        let screen = if session.is_some() {
            Screen::Chat
        } else {
            Screen::Login
        };

        let app = Self {
            running: true,
            screen,
            login: LoginForm::new(),
            register: RegisterForm::new(),
            chat: ChatState::new(),
            modal: Modal::None,
            session,
            store,
            api,
            animator: RevealAnimator::new(),
            config,
            events: EventHandler::new(),
            tick_count: 0,
        };
        if app.session.is_some() {
            app.spawn_list_conversations();
        }
        Ok(app)
    }

    /// Run the application's main loop.
    pub async fn run(mut self, mut terminal: DefaultTerminal) -> Result<()> {
        let mut needs_redraw = true;
        while self.running {
            if needs_redraw {
                terminal.draw(|frame| frame.render_widget(&self, frame.area()))?;
                needs_redraw = false;
            }
            match self.events.next().await {
                Ok(Event::Tick) => {
                    // Only the placeholder dots animate on ticks.
                    if self.screen == Screen::Chat && self.chat.is_busy() {
                        self.tick_count = self.tick_count.wrapping_add(1);
                        needs_redraw = true;
                    }
                }
                Ok(Event::Crossterm(event)) => {
                    if let CrosstermEvent::Key(key_event) = event {
                        self.handle_key_events(key_event)?;
                        needs_redraw = true;
                    }
                }
                Ok(Event::App(app_event)) => {
                    self.handle_app_event(app_event);
                    needs_redraw = true;
                }
                Err(e) => tracing::error!(error = %e, "event channel failed"),
            }
        }
        Ok(())
    }

    fn handle_app_event(&mut self, event: AppEvent) {
        match event {
            AppEvent::Quit => self.quit(),
            AppEvent::LoggedIn {
                token,
                user_id,
                username,
            } => self.on_logged_in(token, user_id, username),
            AppEvent::LoginFailed(message) => {
                self.login.busy = false;
                self.login.error = Some(message);
            }
            AppEvent::Registered => {
                self.register = RegisterForm::new();
                self.login = LoginForm::new();
                self.login.flash = Some("Registration successful! Please log in.".to_string());
                self.screen = Screen::Login;
            }
            AppEvent::RegisterFailed(message) => {
                self.register.busy = false;
                self.register.error = Some(message);
            }
            AppEvent::SessionExpired => {
                self.force_logout(Some("Session expired. Please log in again.".to_string()));
            }
            AppEvent::ConversationsLoaded(conversations) => {
                self.chat.set_conversations(conversations);
            }
            AppEvent::ConversationLoaded { id, messages } => {
                self.animator.cancel();
                self.chat.load_history(id, messages);
            }
            AppEvent::ConversationCreated(id) => {
                self.spawn_list_conversations();
                self.spawn_open_conversation(id);
            }
            AppEvent::ConversationDeleted(id) => {
                if self.chat.active.as_ref() == Some(&id) {
                    self.animator.cancel();
                    self.chat.clear_active();
                }
                self.chat.conversations.retain(|c| c.id != id);
                if self.chat.selected >= self.chat.conversations.len() {
                    self.chat.selected = self.chat.conversations.len().saturating_sub(1);
                }
            }
            AppEvent::ChatReply {
                placeholder,
                response,
                conversation_id,
            } => self.on_chat_reply(placeholder, response, conversation_id),
            AppEvent::ChatFailed { placeholder } => {
                if !self.chat.reply_failed(placeholder) {
                    tracing::debug!("dropping stale chat failure");
                }
            }
            AppEvent::RevealTick(id) => match self.chat.reveal_tick(id) {
                TickOutcome::Finished => self.animator.finish(id),
                TickOutcome::Advanced => {}
                TickOutcome::Stale => self.animator.finish(id),
            },
        }
    }

    /// Handles the key events and updates the state of [`App`].
    pub fn handle_key_events(&mut self, key_event: KeyEvent) -> Result<()> {
        if key_event.code == KeyCode::Char('c') && key_event.modifiers == KeyModifiers::CONTROL {
            self.events.send(AppEvent::Quit);
            return Ok(());
        }
        match self.screen {
            Screen::Login => self.handle_login_keys(key_event),
            Screen::Register => self.handle_register_keys(key_event),
            Screen::Chat => self.handle_chat_keys(key_event),
        }
        Ok(())
    }

    fn handle_login_keys(&mut self, key_event: KeyEvent) {
        if key_event.modifiers.contains(KeyModifiers::CONTROL) {
            if key_event.code == KeyCode::Char('r') {
                self.register = RegisterForm::new();
                self.screen = Screen::Register;
            }
            return;
        }
        match key_event.code {
            KeyCode::Esc => self.events.send(AppEvent::Quit),
            KeyCode::Tab | KeyCode::BackTab => {
                self.login.focus = match self.login.focus {
                    LoginField::Username => LoginField::Password,
                    LoginField::Password => LoginField::Username,
                };
            }
            KeyCode::Enter => self.submit_login(),
            KeyCode::Backspace => {
                self.login.focused_field().pop();
            }
            KeyCode::Char(ch) => {
                self.login.focused_field().push(ch);
            }
            _ => {}
        }
    }

    fn handle_register_keys(&mut self, key_event: KeyEvent) {
        if key_event.modifiers.contains(KeyModifiers::CONTROL) {
            return;
        }
        match key_event.code {
            KeyCode::Esc => {
                self.screen = Screen::Login;
            }
            KeyCode::Tab => self.register.next_field(),
            KeyCode::Enter => self.submit_register(),
            KeyCode::Backspace => {
                self.register.focused_field().pop();
            }
            KeyCode::Char(ch) => {
                self.register.focused_field().push(ch);
            }
            _ => {}
        }
    }

    fn handle_chat_keys(&mut self, key_event: KeyEvent) {
        if self.modal != Modal::None {
            self.handle_modal_keys(key_event);
            return;
        }
        if key_event.modifiers.contains(KeyModifiers::CONTROL) {
            match key_event.code {
                KeyCode::Char('b') => self.chat.sidebar_open = !self.chat.sidebar_open,
                KeyCode::Char('l') => self.logout(),
                _ => {}
            }
            return;
        }
        if self.chat.sidebar_open {
            self.handle_sidebar_keys(key_event);
            return;
        }
        match key_event.code {
            KeyCode::Enter => self.submit_chat_message(),
            // The input is frozen while a send or reveal is running.
            KeyCode::Backspace if !self.chat.is_busy() => {
                self.chat.draft.pop();
            }
            KeyCode::Char(ch) if !self.chat.is_busy() => self.chat.draft.push(ch),
            KeyCode::PageUp | KeyCode::Up => self.chat.scroll_up(),
            KeyCode::PageDown | KeyCode::Down => self.chat.scroll_down(),
            _ => {}
        }
    }

    fn handle_sidebar_keys(&mut self, key_event: KeyEvent) {
        match key_event.code {
            KeyCode::Esc => self.chat.sidebar_open = false,
            KeyCode::Up | KeyCode::Char('k') => self.chat.select_prev(),
            KeyCode::Down | KeyCode::Char('j') => self.chat.select_next(),
            KeyCode::Enter => {
                if let Some(summary) = self.chat.selected_conversation() {
                    let id = summary.id.clone();
                    self.animator.cancel();
                    self.chat.sidebar_open = false;
                    self.spawn_open_conversation(id);
                }
            }
            KeyCode::Char('n') => {
                self.modal = Modal::NewConversation {
                    title: String::new(),
                };
            }
            KeyCode::Char('r') => {
                if let Some(summary) = self.chat.selected_conversation() {
                    self.modal = Modal::Rename {
                        id: summary.id.clone(),
                        title: summary.title.clone(),
                    };
                }
            }
            KeyCode::Char('d') => {
                if let Some(summary) = self.chat.selected_conversation() {
                    self.modal = Modal::ConfirmDelete {
                        id: summary.id.clone(),
                        title: summary.title.clone(),
                    };
                }
            }
            _ => {}
        }
    }

    fn handle_modal_keys(&mut self, key_event: KeyEvent) {
        if key_event.code == KeyCode::Esc {
            self.modal = Modal::None;
            return;
        }
        if let Modal::ConfirmDelete { id, .. } = &self.modal {
            match key_event.code {
                KeyCode::Char('y') | KeyCode::Enter => {
                    let id = id.clone();
                    self.modal = Modal::None;
                    self.spawn_delete_conversation(id);
                }
                KeyCode::Char('n') => self.modal = Modal::None,
                _ => {}
            }
            return;
        }
        if key_event.code == KeyCode::Enter {
            self.submit_title_modal();
            return;
        }
        if let Modal::NewConversation { title } | Modal::Rename { title, .. } = &mut self.modal {
            match key_event.code {
                KeyCode::Backspace => {
                    title.pop();
                }
                KeyCode::Char(ch) => title.push(ch),
                _ => {}
            }
        }
    }

    fn submit_login(&mut self) {
        if self.login.busy {
            return;
        }
        let username = self.login.username.trim().to_string();
        let password = self.login.password.clone();
        if username.is_empty() || password.is_empty() {
            self.login.error = Some("Username and password are required".to_string());
            return;
        }
        self.login.busy = true;
        self.login.error = None;
        self.login.flash = None;
        let api = self.api.clone();
        let events = self.events.handle();
        tokio::spawn(async move {
            match api.login(&username, &password).await {
                Ok(reply) => events.send(AppEvent::LoggedIn {
                    token: reply.access_token,
                    user_id: reply.user_id,
                    username,
                }),
                Err(e) => {
                    tracing::warn!(error = %e, "login failed");
                    events.send(AppEvent::LoginFailed(login_error_message(e)))
                }
            };
        });
    }

    fn submit_register(&mut self) {
        if self.register.busy {
            return;
        }
        if self.register.password != self.register.confirm {
            self.register.error = Some("Passwords do not match".to_string());
            return;
        }
        if self.register.password.len() < 6 {
            self.register.error = Some("Password must be at least 6 characters long".to_string());
            return;
        }
        let username = self.register.username.trim().to_string();
        let email = self.register.email.trim().to_string();
        if username.is_empty() || email.is_empty() {
            self.register.error = Some("All fields are required".to_string());
            return;
        }
        self.register.busy = true;
        self.register.error = None;
        let password = self.register.password.clone();
        let api = self.api.clone();
        let events = self.events.handle();
        tokio::spawn(async move {
            match api.register(&username, &email, &password).await {
                Ok(()) => events.send(AppEvent::Registered),
                Err(e) => {
                    tracing::warn!(error = %e, "registration failed");
                    events.send(AppEvent::RegisterFailed(login_error_message(e)))
                }
            };
        });
    }

    fn on_logged_in(&mut self, token: String, user_id: i64, username: String) {
        self.store.save(&token);
        self.api.set_token(Some(token.clone()));
        self.session = Some(Session {
            token,
            user_id,
            username,
        });
        self.login = LoginForm::new();
        self.chat = ChatState::new();
        self.screen = Screen::Chat;
        self.spawn_list_conversations();
    }

    pub fn logout(&mut self) {
        self.force_logout(None);
    }

    fn force_logout(&mut self, notice: Option<String>) {
        self.animator.cancel();
        self.store.clear();
        self.api.set_token(None);
        self.session = None;
        self.chat = ChatState::new();
        self.modal = Modal::None;
        self.login = LoginForm::new();
        self.login.flash = notice;
        self.screen = Screen::Login;
    }

    fn submit_chat_message(&mut self) {
        let Some(intent) = self.chat.begin_send() else {
            return;
        };
        let conversation_id = self.chat.active.clone();
        let api = self.api.clone();
        let events = self.events.handle();
        tokio::spawn(async move {
            match api.send_chat(conversation_id.as_ref(), &intent.text).await {
                Ok(reply) => events.send(AppEvent::ChatReply {
                    placeholder: intent.placeholder,
                    response: reply.response,
                    conversation_id: reply.conversation_id,
                }),
                Err(e) if e.is_unauthorized() => events.send(AppEvent::SessionExpired),
                Err(e) => {
                    tracing::warn!(error = %e, "chat request failed");
                    events.send(AppEvent::ChatFailed {
                        placeholder: intent.placeholder,
                    })
                }
            };
        });
    }

    fn on_chat_reply(
        &mut self,
        placeholder: uuid::Uuid,
        response: String,
        conversation_id: ConversationId,
    ) {
        if self.screen != Screen::Chat {
            return;
        }
        let fresh_chat = self.chat.active.is_none();
        let outcome = self.chat.reply_arrived(placeholder, response);
        if outcome == ReplyOutcome::Stale {
            tracing::debug!("dropping stale chat reply");
            return;
        }
        // First message of a fresh chat: adopt the id the service
        // assigned and pick it up in the sidebar.
        if fresh_chat {
            self.chat.active = Some(conversation_id);
            self.spawn_list_conversations();
        }
        if let ReplyOutcome::StartReveal(id) = outcome {
            self.animator.start(
                id,
                Duration::from_millis(self.config.reveal_interval_ms),
                self.events.handle(),
            );
        }
    }

    fn submit_title_modal(&mut self) {
        let (rename_id, raw) = match &self.modal {
            Modal::NewConversation { title } => (None, title.clone()),
            Modal::Rename { id, title } => (Some(id.clone()), title.clone()),
            _ => return,
        };
        // A blank title is a no-op: the modal stays open, no request is
        // issued.
        let Some(title) = accepted_title(&raw) else {
            return;
        };
        self.modal = Modal::None;
        let api = self.api.clone();
        let events = self.events.handle();
        match rename_id {
            None => {
                tokio::spawn(async move {
                    match api.create_conversation(&title).await {
                        Ok(id) => {
                            events.send(AppEvent::ConversationCreated(id));
                        }
                        Err(e) if e.is_unauthorized() => {
                            events.send(AppEvent::SessionExpired);
                        }
                        Err(e) => tracing::warn!(error = %e, "failed to create conversation"),
                    }
                });
            }
            Some(id) => {
                tokio::spawn(async move {
                    match api.rename_conversation(&id, &title).await {
                        Ok(()) => match api.list_conversations().await {
                            Ok(conversations) => {
                                events.send(AppEvent::ConversationsLoaded(conversations));
                            }
                            Err(e) if e.is_unauthorized() => {
                                events.send(AppEvent::SessionExpired);
                            }
                            Err(e) => {
                                tracing::warn!(error = %e, "failed to refresh conversations")
                            }
                        },
                        Err(e) if e.is_unauthorized() => {
                            events.send(AppEvent::SessionExpired);
                        }
                        Err(e) => tracing::warn!(error = %e, "failed to rename conversation"),
                    }
                });
            }
        }
    }

    fn spawn_list_conversations(&self) {
        let api = self.api.clone();
        let events = self.events.handle();
        tokio::spawn(async move {
            match api.list_conversations().await {
                Ok(conversations) => {
                    events.send(AppEvent::ConversationsLoaded(conversations));
                }
                Err(e) if e.is_unauthorized() => {
                    events.send(AppEvent::SessionExpired);
                }
                Err(e) => tracing::warn!(error = %e, "failed to list conversations"),
            }
        });
    }

    fn spawn_open_conversation(&self, id: ConversationId) {
        let api = self.api.clone();
        let events = self.events.handle();
        tokio::spawn(async move {
            match api.get_conversation(&id).await {
                Ok(detail) => {
                    events.send(AppEvent::ConversationLoaded {
                        id: detail.id,
                        messages: detail.messages,
                    });
                }
                Err(e) if e.is_unauthorized() => {
                    events.send(AppEvent::SessionExpired);
                }
                Err(e) => tracing::warn!(error = %e, "failed to load conversation"),
            }
        });
    }

    fn spawn_delete_conversation(&self, id: ConversationId) {
        let api = self.api.clone();
        let events = self.events.handle();
        tokio::spawn(async move {
            match api.delete_conversation(&id).await {
                Ok(()) => {
                    events.send(AppEvent::ConversationDeleted(id));
                }
                Err(e) if e.is_unauthorized() => {
                    events.send(AppEvent::SessionExpired);
                }
                Err(e) => tracing::warn!(error = %e, "failed to delete conversation"),
            }
        });
    }

    /// Set running to false to quit the application.
    pub fn quit(&mut self) {
        self.animator.cancel();
        self.running = false;
    }
}

/// Form-facing message for an auth failure: the server's `detail` when
/// there is one, a generic line for transport errors.
fn login_error_message(error: ApiError) -> String {
    match error {
        ApiError::Status { detail, .. } => detail,
        ApiError::Network(_) => "Could not reach the service. Please try again.".to_string(),
    }
}

/// Trims a modal title, rejecting blank input.
fn accepted_title(raw: &str) -> Option<String> {
    let title = raw.trim();
    if title.is_empty() {
        None
    } else {
        Some(title.to_string())
    }
}
