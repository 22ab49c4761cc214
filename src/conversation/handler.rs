//! ConversationHandler: turns one inbound message into store calls and
//! replies, driven by the user's session state.

use std::sync::Arc;

use crate::channels::{IncomingMessage, OutgoingResponse};
use crate::store::model::DATE_FORMAT;
use crate::store::{Clock, SystemClock, TasteStore, UserRecord};

use super::command::{CommandParser, Inbound};
use super::menu::{MenuAction, main_menu_keyboard};
use super::messages;
use super::session::SessionManager;
use super::state::SessionState;

/// Runs the conversation for every user.
pub struct ConversationHandler {
    store: Arc<dyn TasteStore>,
    sessions: Arc<SessionManager>,
    clock: Arc<dyn Clock>,
}

impl ConversationHandler {
    pub fn new(store: Arc<dyn TasteStore>, sessions: Arc<SessionManager>) -> Self {
        Self {
            store,
            sessions,
            clock: Arc::new(SystemClock),
        }
    }

    /// Clock used for the date shown in taste confirmations.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn sessions(&self) -> &Arc<SessionManager> {
        &self.sessions
    }

    /// Process one message and return the replies to send, in order.
    ///
    /// Every message registers its sender in the store, commands included.
    pub async fn handle(&self, message: &IncomingMessage) -> Vec<OutgoingResponse> {
        let user_id = message.user_id.as_str();
        let record = self.store.get_or_create_user(user_id).await;
        self.sessions.touch(user_id).await;

        let inbound = CommandParser::parse(&message.content);
        let state = self.current_state(user_id, &record).await;
        tracing::debug!(user_id, %state, "Handling {}", inbound_kind(&inbound));

        match inbound {
            Inbound::Start => self.start(message, &record).await,
            Inbound::Help => {
                let mut replies = vec![OutgoingResponse::text(messages::HELP)];
                if !record.has_name()
                    && self.sessions.state(user_id).await != SessionState::AwaitingName
                {
                    replies.extend(self.start(message, &record).await);
                }
                replies
            }
            Inbound::MyTastes => {
                if record.has_name() {
                    vec![list_tastes(&record)]
                } else {
                    self.start(message, &record).await
                }
            }
            Inbound::UnknownCommand(command) => {
                // Never consumed as pending input; the session stays as it is.
                tracing::debug!(user_id, %command, "Ignoring unknown command");
                Vec::new()
            }
            Inbound::Text(text) => self.handle_text(message, &record, &text).await,
        }
    }

    /// Ask for a name, or show the menu if the user already has one.
    async fn start(&self, message: &IncomingMessage, record: &UserRecord) -> Vec<OutgoingResponse> {
        let user_id = message.user_id.as_str();
        if record.has_name() {
            self.advance(user_id, record, SessionState::Ready).await;
            vec![
                OutgoingResponse::text(messages::welcome_back(&record.name))
                    .with_keyboard(main_menu_keyboard()),
            ]
        } else {
            self.advance(user_id, record, SessionState::AwaitingName).await;
            vec![OutgoingResponse::text(messages::greeting(
                message.display_name(),
            ))]
        }
    }

    async fn handle_text(
        &self,
        message: &IncomingMessage,
        record: &UserRecord,
        text: &str,
    ) -> Vec<OutgoingResponse> {
        let user_id = message.user_id.as_str();

        // Pending input wins over menu labels.
        match self.current_state(user_id, record).await {
            SessionState::AwaitingName => {
                self.store.set_name(user_id, text).await;
                self.advance(user_id, record, SessionState::Ready).await;
                tracing::info!(user_id, "User name set");
                vec![
                    OutgoingResponse::text(messages::name_saved(text)),
                    OutgoingResponse::text(messages::MENU_AFTER_NAME)
                        .with_keyboard(main_menu_keyboard()),
                ]
            }
            SessionState::AwaitingTaste => {
                if !self.store.append_taste(user_id, text).await {
                    tracing::warn!(user_id, "Taste dropped: no record for user");
                }
                self.advance(user_id, record, SessionState::Ready).await;
                let date = self.clock.now().format(DATE_FORMAT).to_string();
                vec![
                    OutgoingResponse::text(messages::taste_saved(text, &date)),
                    OutgoingResponse::text(messages::MENU_AFTER_TASTE)
                        .with_keyboard(main_menu_keyboard()),
                ]
            }
            SessionState::Ready if record.has_name() => match MenuAction::from_label(text) {
                Some(MenuAction::AddTaste) => {
                    self.advance(user_id, record, SessionState::AwaitingTaste)
                        .await;
                    vec![OutgoingResponse::text(messages::TASTE_PROMPT)]
                }
                Some(MenuAction::ListTastes) => vec![list_tastes(record)],
                Some(MenuAction::ChangeName) => {
                    self.advance(user_id, record, SessionState::AwaitingName)
                        .await;
                    vec![OutgoingResponse::text(messages::RENAME_PROMPT)]
                }
                None => self.start(message, record).await,
            },
            SessionState::Fresh | SessionState::Ready => self.start(message, record).await,
        }
    }

    /// Session state, with a missing session for a named user read as `Ready`.
    async fn current_state(&self, user_id: &str, record: &UserRecord) -> SessionState {
        match self.sessions.state(user_id).await {
            SessionState::Fresh if record.has_name() => SessionState::Ready,
            state => state,
        }
    }

    async fn advance(&self, user_id: &str, record: &UserRecord, to: SessionState) {
        let from = self.current_state(user_id, record).await;
        if !from.can_transition_to(to) {
            tracing::warn!(user_id, %from, %to, "Unexpected session transition");
        }
        self.sessions.set(user_id, to).await;
    }
}

fn list_tastes(record: &UserRecord) -> OutgoingResponse {
    if record.tastes.is_empty() {
        OutgoingResponse::text(messages::NO_TASTES)
    } else {
        OutgoingResponse::text(messages::taste_list(&record.name, &record.tastes))
    }
}

/// Log label that never includes user text.
fn inbound_kind(inbound: &Inbound) -> &'static str {
    match inbound {
        Inbound::Start => "start",
        Inbound::Help => "help",
        Inbound::MyTastes => "mytastes",
        Inbound::UnknownCommand(_) => "unknown command",
        Inbound::Text(_) => "text",
    }
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, NaiveDateTime};

    use super::*;
    use crate::conversation::menu::{ADD_TASTE_LABEL, CHANGE_NAME_LABEL, MY_TASTES_LABEL};
    use crate::store::{FixedClock, MemoryStore};

    fn evening() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 6, 1)
            .unwrap()
            .and_hms_opt(21, 5, 0)
            .unwrap()
    }

    fn setup() -> (ConversationHandler, Arc<MemoryStore>) {
        let clock: Arc<dyn Clock> = Arc::new(FixedClock(evening()));
        let store = Arc::new(MemoryStore::with_clock(Arc::clone(&clock)));
        let handler = ConversationHandler::new(
            Arc::clone(&store) as Arc<dyn TasteStore>,
            Arc::new(SessionManager::new()),
        )
        .with_clock(clock);
        (handler, store)
    }

    fn msg(text: &str) -> IncomingMessage {
        IncomingMessage::new("test", "1001", text).with_user_name("Jay")
    }

    async fn say(handler: &ConversationHandler, text: &str) -> Vec<OutgoingResponse> {
        handler.handle(&msg(text)).await
    }

    async fn named(handler: &ConversationHandler, name: &str) {
        say(handler, "/start").await;
        say(handler, name).await;
    }

    #[tokio::test]
    async fn first_event_of_any_kind_asks_for_name() {
        for first in ["/start", "hello", MY_TASTES_LABEL, "/mytastes"] {
            let (handler, store) = setup();
            let replies = say(&handler, first).await;

            assert_eq!(replies.len(), 1, "for {first:?}");
            assert!(replies[0].content.contains("What's your name?"), "for {first:?}");
            assert!(replies[0].content.contains("Hi, Jay!"));
            let record = store.get_user("1001").await.unwrap();
            assert!(record.tastes.is_empty());
            assert_eq!(
                handler.sessions().state("1001").await,
                SessionState::AwaitingName
            );
        }
    }

    #[tokio::test]
    async fn help_for_new_user_is_followed_by_name_prompt() {
        let (handler, store) = setup();
        let replies = say(&handler, "/help").await;

        assert_eq!(replies.len(), 2);
        assert_eq!(replies[0].content, messages::HELP);
        assert!(replies[1].content.contains("What's your name?"));
        assert!(store.get_user("1001").await.is_some());
    }

    #[tokio::test]
    async fn help_keeps_pending_input() {
        let (handler, _store) = setup();
        named(&handler, "Jay").await;
        say(&handler, ADD_TASTE_LABEL).await;

        let replies = say(&handler, "/help").await;
        assert_eq!(replies, vec![OutgoingResponse::text(messages::HELP)]);
        assert_eq!(
            handler.sessions().state("1001").await,
            SessionState::AwaitingTaste
        );
    }

    #[tokio::test]
    async fn naming_shows_confirmation_and_menu() {
        let (handler, store) = setup();
        say(&handler, "/start").await;
        let replies = say(&handler, "Alex").await;

        assert_eq!(replies.len(), 2);
        assert_eq!(replies[0].content, "✅ Great, Alex!");
        assert_eq!(replies[1].keyboard, Some(main_menu_keyboard()));

        let record = store.get_user("1001").await.unwrap();
        assert_eq!(record.name, "Alex");
        assert_eq!(record.registration_date, "01.06.2024 21:05");
        assert_eq!(handler.sessions().state("1001").await, SessionState::Ready);
    }

    #[tokio::test]
    async fn add_and_list_scenario() {
        let (handler, _store) = setup();
        named(&handler, "Jay").await;

        let replies = say(&handler, ADD_TASTE_LABEL).await;
        assert_eq!(replies, vec![OutgoingResponse::text(messages::TASTE_PROMPT)]);

        let replies = say(&handler, "mango").await;
        assert_eq!(replies[0].content, "✅ Saved: 'mango'\n📅 01.06.2024");
        assert_eq!(replies[1].keyboard, Some(main_menu_keyboard()));

        let replies = say(&handler, MY_TASTES_LABEL).await;
        assert_eq!(replies.len(), 1);
        assert_eq!(
            replies[0].content,
            "📜 Jay, your tastes:\n\n1. 🗓️ 01.06.2024 21:05 - mango\n"
        );
    }

    #[tokio::test]
    async fn empty_history_shows_empty_state() {
        let (handler, _store) = setup();
        named(&handler, "Jay").await;

        let replies = say(&handler, MY_TASTES_LABEL).await;
        assert_eq!(replies, vec![OutgoingResponse::text(messages::NO_TASTES)]);

        let replies = say(&handler, "/mytastes").await;
        assert_eq!(replies, vec![OutgoingResponse::text(messages::NO_TASTES)]);
    }

    #[tokio::test]
    async fn menu_label_while_awaiting_is_consumed_verbatim() {
        let (handler, store) = setup();
        say(&handler, "/start").await;
        say(&handler, CHANGE_NAME_LABEL).await;
        assert_eq!(store.get_user("1001").await.unwrap().name, CHANGE_NAME_LABEL);

        say(&handler, ADD_TASTE_LABEL).await;
        say(&handler, MY_TASTES_LABEL).await;
        let record = store.get_user("1001").await.unwrap();
        assert_eq!(record.tastes.len(), 1);
        assert_eq!(record.tastes[0].taste, MY_TASTES_LABEL);
    }

    #[tokio::test]
    async fn change_name_flow() {
        let (handler, store) = setup();
        named(&handler, "Jay").await;

        let replies = say(&handler, CHANGE_NAME_LABEL).await;
        assert_eq!(replies, vec![OutgoingResponse::text(messages::RENAME_PROMPT)]);
        say(&handler, "Jordan").await;

        assert_eq!(store.get_user("1001").await.unwrap().name, "Jordan");
    }

    #[tokio::test]
    async fn unknown_text_in_ready_reruns_start() {
        let (handler, _store) = setup();
        named(&handler, "Jay").await;

        let replies = say(&handler, "what is this").await;
        assert_eq!(replies.len(), 1);
        assert_eq!(replies[0].content, "🎉 Jay, what would you like to do?");
        assert_eq!(replies[0].keyboard, Some(main_menu_keyboard()));
    }

    #[tokio::test]
    async fn start_clears_pending_input_for_named_user() {
        let (handler, store) = setup();
        named(&handler, "Jay").await;
        say(&handler, ADD_TASTE_LABEL).await;

        say(&handler, "/start").await;
        assert_eq!(handler.sessions().state("1001").await, SessionState::Ready);

        say(&handler, "mango").await;
        assert!(store.get_user("1001").await.unwrap().tastes.is_empty());
    }

    #[tokio::test]
    async fn unknown_command_leaves_pending_taste_alone() {
        let (handler, store) = setup();
        named(&handler, "Jay").await;
        say(&handler, ADD_TASTE_LABEL).await;

        let replies = say(&handler, "/settings").await;
        assert!(replies.is_empty());
        assert_eq!(
            handler.sessions().state("1001").await,
            SessionState::AwaitingTaste
        );
        assert!(store.get_user("1001").await.unwrap().tastes.is_empty());

        say(&handler, "mint").await;
        let tastes = store.get_user("1001").await.unwrap().tastes;
        assert_eq!(tastes.len(), 1);
        assert_eq!(tastes[0].taste, "mint");
    }

    #[tokio::test]
    async fn unknown_command_is_not_taken_as_a_name() {
        let (handler, store) = setup();
        say(&handler, "/start").await;
        say(&handler, "/settings").await;

        assert!(!store.get_user("1001").await.unwrap().has_name());
        assert_eq!(
            handler.sessions().state("1001").await,
            SessionState::AwaitingName
        );
    }

    #[tokio::test]
    async fn indented_command_is_a_taste_when_one_is_pending() {
        let (handler, store) = setup();
        named(&handler, "Jay").await;
        say(&handler, ADD_TASTE_LABEL).await;
        say(&handler, " /start").await;

        let tastes = store.get_user("1001").await.unwrap().tastes;
        assert_eq!(tastes[0].taste, " /start");
    }

    #[tokio::test]
    async fn taste_text_is_not_trimmed() {
        let (handler, store) = setup();
        named(&handler, "Jay").await;
        say(&handler, ADD_TASTE_LABEL).await;
        say(&handler, "  Double Apple ").await;

        assert_eq!(
            store.get_user("1001").await.unwrap().tastes[0].taste,
            "  Double Apple "
        );
    }

    #[tokio::test]
    async fn named_user_without_session_is_ready() {
        let (handler, store) = setup();
        store.set_name("1001", "Jay").await;

        let replies = say(&handler, ADD_TASTE_LABEL).await;
        assert_eq!(replies, vec![OutgoingResponse::text(messages::TASTE_PROMPT)]);
    }

    #[tokio::test]
    async fn users_do_not_share_sessions() {
        let (handler, store) = setup();
        named(&handler, "Jay").await;
        say(&handler, ADD_TASTE_LABEL).await;

        let other = IncomingMessage::new("test", "2002", "mango").with_user_name("Kim");
        let replies = handler.handle(&other).await;
        assert!(replies[0].content.contains("Hi, Kim!"));
        assert!(store.get_user("1001").await.unwrap().tastes.is_empty());
        assert!(store.get_user("2002").await.unwrap().tastes.is_empty());
    }
}
