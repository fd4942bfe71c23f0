//! Shapes the screens render. Per-viewer flags (`is_liked`, `is_saved`,
//! `is_following`, `is_viewed`) are resolved at read time from relation sets
//! and never stored on shared entities.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserCard {
    pub id: Uuid,
    pub name: String,
    /// Handle including the leading `@`, e.g. `@sarahc`.
    pub handle: String,
    pub avatar_url: Option<String>,
    pub bio: String,
    pub website: Option<String>,
    pub posts: i64,
    pub followers: i64,
    pub following: i64,
    pub verified: bool,
    pub is_following: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PostKind {
    Post,
    Reel,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedPost {
    pub id: Uuid,
    pub author: UserCard,
    pub image_url: String,
    pub caption: String,
    pub likes: i64,
    pub comments: i64,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    pub kind: PostKind,
    pub is_liked: bool,
    pub is_saved: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "type")]
pub enum StoryMedia {
    Image { url: String },
    Video { url: String, duration_secs: u32 },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoryCard {
    pub id: Uuid,
    pub author: UserCard,
    pub media: StoryMedia,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub expires_at: Option<OffsetDateTime>,
    pub is_viewed: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommentView {
    pub id: Uuid,
    pub author: UserCard,
    pub content: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: Uuid,
    pub sender: UserCard,
    pub content: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    pub is_read: bool,
}

/// A direct-message conversation. The full ordered thread is canonical;
/// "last message" is derived from it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chat {
    pub id: Uuid,
    pub peer: UserCard,
    pub messages: Vec<ChatMessage>,
    pub unread_count: u32,
}

impl Chat {
    pub fn last_message(&self) -> Option<&ChatMessage> {
        self.messages.last()
    }
}
