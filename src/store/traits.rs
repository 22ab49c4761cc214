//! `TasteStore` trait: the only way the conversation layer touches
//! persisted data.

use async_trait::async_trait;

use super::model::UserRecord;

/// Backend-agnostic per-user key-value store.
///
/// Operations never fail from the caller's point of view: backends log and
/// absorb their own I/O errors.
#[async_trait]
pub trait TasteStore: Send + Sync {
    /// Return the user's record, creating and persisting a blank one first if
    /// the user is unknown.
    async fn get_or_create_user(&self, user_id: &str) -> UserRecord;

    /// Set the display name and reset the registration date to now. Creates
    /// the record if needed.
    async fn set_name(&self, user_id: &str, name: &str);

    /// Append a taste stamped with the current date and time.
    ///
    /// Returns `false` and leaves the store untouched when the user has no
    /// record.
    async fn append_taste(&self, user_id: &str, taste: &str) -> bool;

    /// Read-only lookup; never creates a record.
    async fn get_user(&self, user_id: &str) -> Option<UserRecord>;
}
