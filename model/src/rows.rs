//! Wire shapes of the hosted store's tables. Field names match the remote
//! schema exactly; timestamps travel as RFC 3339 strings.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

/// Reduced author profile embedded by joined selects
/// (`select=*,profiles(id,username,full_name,avatar_url)`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthorRef {
    pub id: Uuid,
    pub username: String,
    pub full_name: String,
    #[serde(default)]
    pub avatar_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub id: Uuid,
    pub username: String,
    pub full_name: String,
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub website: Option<String>,
    pub followers_count: i64,
    pub following_count: i64,
    pub posts_count: i64,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub caption: String,
    pub image_url: String,
    pub is_reel: bool,
    pub likes_count: i64,
    pub comments_count: i64,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
    #[serde(default)]
    pub profiles: Option<AuthorRef>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoryRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub image_url: String,
    #[serde(with = "time::serde::rfc3339")]
    pub expires_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(default)]
    pub profiles: Option<AuthorRef>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LikeRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub post_id: Uuid,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommentRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub post_id: Uuid,
    pub content: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(default)]
    pub profiles: Option<AuthorRef>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageRow {
    pub id: Uuid,
    pub sender_id: Uuid,
    pub receiver_id: Uuid,
    pub content: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(default)]
    pub profiles: Option<AuthorRef>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FollowRow {
    pub id: Uuid,
    pub follower_id: Uuid,
    pub following_id: Uuid,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaveRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub post_id: Uuid,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// Insert payload for `posts`; the store assigns id and timestamps.
#[derive(Debug, Clone, Serialize)]
pub struct NewPost {
    pub user_id: Uuid,
    pub caption: String,
    pub image_url: String,
    pub is_reel: bool,
}

/// Insert payload for `stories`.
#[derive(Debug, Clone, Serialize)]
pub struct NewStory {
    pub user_id: Uuid,
    pub image_url: String,
    #[serde(with = "time::serde::rfc3339")]
    pub expires_at: OffsetDateTime,
}

/// Insert payload for `comments`.
#[derive(Debug, Clone, Serialize)]
pub struct NewComment {
    pub user_id: Uuid,
    pub post_id: Uuid,
    pub content: String,
}

/// Insert payload for `messages`.
#[derive(Debug, Clone, Serialize)]
pub struct NewMessage {
    pub sender_id: Uuid,
    pub receiver_id: Uuid,
    pub content: String,
}

/// Partial update for `profiles`; absent fields are left untouched.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ProfilePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn post_row_with_embedded_author() {
        let json = r#"{
            "id": "7c9e6679-7425-40de-944b-e07fc1f90ae7",
            "user_id": "550e8400-e29b-41d4-a716-446655440000",
            "caption": "Golden hour magic",
            "image_url": "https://example.com/p.jpg",
            "is_reel": false,
            "likes_count": 2847,
            "comments_count": 156,
            "created_at": "2024-05-01T10:00:00Z",
            "updated_at": "2024-05-01T10:00:00Z",
            "profiles": {
                "id": "550e8400-e29b-41d4-a716-446655440000",
                "username": "sarahc",
                "full_name": "Sarah Chen",
                "avatar_url": null
            }
        }"#;
        let row: PostRow = serde_json::from_str(json).unwrap();
        assert_eq!(row.likes_count, 2847);
        assert_eq!(row.profiles.unwrap().username, "sarahc");
    }

    #[test]
    fn patch_skips_absent_fields() {
        let patch = ProfilePatch {
            bio: Some("new bio".into()),
            ..Default::default()
        };
        let s = serde_json::to_string(&patch).unwrap();
        assert_eq!(s, r#"{"bio":"new bio"}"#);
    }
}
