//! Conversation layer: naming, recording and listing tastes.
//!
//! Each user has a volatile [`SessionState`] deciding how their next text is
//! read. Pending input (a name or a taste) takes precedence over menu labels;
//! otherwise text is matched against the main menu and anything unrecognized
//! restarts the flow. All durable changes go through the [`TasteStore`].
//!
//! [`TasteStore`]: crate::store::TasteStore

pub mod command;
pub mod handler;
pub mod menu;
pub mod messages;
pub mod session;
pub mod state;

pub use command::{CommandParser, Inbound};
pub use handler::ConversationHandler;
pub use menu::{MenuAction, main_menu_keyboard};
pub use session::SessionManager;
pub use state::SessionState;
