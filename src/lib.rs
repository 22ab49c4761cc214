//! Taste bot: records the flavours a chat user tries, per user, in a JSON file.

pub mod bot;
pub mod channels;
pub mod config;
pub mod conversation;
pub mod error;
pub mod health;
pub mod store;
