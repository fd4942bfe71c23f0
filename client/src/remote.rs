//! Typed CRUD against the hosted relational store's REST surface.
//!
//! Requests follow the PostgREST conventions the backend speaks: table paths
//! under `/rest/v1`, `eq.`/`gt.` column filters, `order=`, `limit=`/`offset=`
//! paging, embedded joins via `select=*,profiles(...)` and
//! `Prefer: return=representation` on inserts. Every operation returns an
//! explicit `Result`; nothing is swallowed here.

use std::collections::HashSet;
use std::time::Duration;

use ldhingram_model::{
    CommentRow, MessageRow, NewComment, NewMessage, NewPost, NewStory, PostRow, Profile,
    ProfilePatch, StoryRow,
};
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use tracing::debug;
use uuid::Uuid;

use crate::config::Config;
use crate::error::RemoteError;

/// Columns embedded for joined author profiles.
const AUTHOR_EMBED: &str = "*,profiles(id,username,full_name,avatar_url)";

pub struct RemoteClient {
    http: reqwest::Client,
    rest_base: String,
    anon_key: String,
}

impl RemoteClient {
    pub fn new(config: &Config) -> Result<Self, RemoteError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;
        Ok(Self {
            http,
            rest_base: config.rest_url(),
            anon_key: config.anon_key.clone(),
        })
    }

    // --- profiles ---

    pub async fn get_profile(&self, user_id: Uuid) -> Result<Option<Profile>, RemoteError> {
        let rows: Vec<Profile> = self
            .select("profiles", &[("select", "*"), ("id", &eq(user_id))])
            .await?;
        Ok(rows.into_iter().next())
    }

    pub async fn update_profile(
        &self,
        user_id: Uuid,
        patch: &ProfilePatch,
    ) -> Result<Profile, RemoteError> {
        let req = self
            .http
            .patch(self.table_url("profiles"))
            .query(&[("id", eq(user_id))])
            .header("Prefer", "return=representation")
            .json(patch);
        let rows: Vec<Profile> = self.execute(req, "profiles").await?;
        rows.into_iter().next().ok_or(RemoteError::EmptyRepresentation)
    }

    // --- posts ---

    /// Recency-ordered page of posts with joined author profiles.
    pub async fn get_posts(&self, limit: u32, offset: u32) -> Result<Vec<PostRow>, RemoteError> {
        self.select(
            "posts",
            &[
                ("select", AUTHOR_EMBED),
                ("order", "created_at.desc"),
                ("limit", &limit.to_string()),
                ("offset", &offset.to_string()),
            ],
        )
        .await
    }

    pub async fn get_post(&self, post_id: Uuid) -> Result<Option<PostRow>, RemoteError> {
        let rows: Vec<PostRow> = self
            .select("posts", &[("select", AUTHOR_EMBED), ("id", &eq(post_id))])
            .await?;
        Ok(rows.into_iter().next())
    }

    pub async fn create_post(&self, post: &NewPost) -> Result<PostRow, RemoteError> {
        self.insert("posts", post).await
    }

    // --- relation rows: likes / saves / follows ---

    pub async fn like_post(&self, user_id: Uuid, post_id: Uuid) -> Result<(), RemoteError> {
        self.insert_relation(
            "likes",
            &serde_json::json!({ "user_id": user_id, "post_id": post_id }),
        )
        .await
    }

    pub async fn unlike_post(&self, user_id: Uuid, post_id: Uuid) -> Result<(), RemoteError> {
        self.delete(
            "likes",
            &[("user_id", eq(user_id)), ("post_id", eq(post_id))],
        )
        .await
    }

    pub async fn save_post(&self, user_id: Uuid, post_id: Uuid) -> Result<(), RemoteError> {
        self.insert_relation(
            "saves",
            &serde_json::json!({ "user_id": user_id, "post_id": post_id }),
        )
        .await
    }

    pub async fn unsave_post(&self, user_id: Uuid, post_id: Uuid) -> Result<(), RemoteError> {
        self.delete(
            "saves",
            &[("user_id", eq(user_id)), ("post_id", eq(post_id))],
        )
        .await
    }

    pub async fn follow_user(&self, follower: Uuid, following: Uuid) -> Result<(), RemoteError> {
        self.insert_relation(
            "follows",
            &serde_json::json!({ "follower_id": follower, "following_id": following }),
        )
        .await
    }

    pub async fn unfollow_user(&self, follower: Uuid, following: Uuid) -> Result<(), RemoteError> {
        self.delete(
            "follows",
            &[
                ("follower_id", eq(follower)),
                ("following_id", eq(following)),
            ],
        )
        .await
    }

    /// Posts liked by the viewer, for resolving `is_liked` at read time.
    pub async fn liked_post_ids(&self, viewer: Uuid) -> Result<HashSet<Uuid>, RemoteError> {
        #[derive(Deserialize)]
        struct Row {
            post_id: Uuid,
        }
        let rows: Vec<Row> = self
            .select("likes", &[("select", "post_id"), ("user_id", &eq(viewer))])
            .await?;
        Ok(rows.into_iter().map(|r| r.post_id).collect())
    }

    pub async fn saved_post_ids(&self, viewer: Uuid) -> Result<HashSet<Uuid>, RemoteError> {
        #[derive(Deserialize)]
        struct Row {
            post_id: Uuid,
        }
        let rows: Vec<Row> = self
            .select("saves", &[("select", "post_id"), ("user_id", &eq(viewer))])
            .await?;
        Ok(rows.into_iter().map(|r| r.post_id).collect())
    }

    pub async fn following_ids(&self, viewer: Uuid) -> Result<HashSet<Uuid>, RemoteError> {
        #[derive(Deserialize)]
        struct Row {
            following_id: Uuid,
        }
        let rows: Vec<Row> = self
            .select(
                "follows",
                &[("select", "following_id"), ("follower_id", &eq(viewer))],
            )
            .await?;
        Ok(rows.into_iter().map(|r| r.following_id).collect())
    }

    // --- stories ---

    /// Non-expired stories, newest first.
    pub async fn get_stories(&self) -> Result<Vec<StoryRow>, RemoteError> {
        let now = rfc3339_now();
        self.select(
            "stories",
            &[
                ("select", AUTHOR_EMBED),
                ("expires_at", &format!("gt.{now}")),
                ("order", "created_at.desc"),
            ],
        )
        .await
    }

    pub async fn create_story(&self, story: &NewStory) -> Result<StoryRow, RemoteError> {
        self.insert("stories", story).await
    }

    // --- comments ---

    /// Comment thread under a post, oldest first.
    pub async fn get_comments(&self, post_id: Uuid) -> Result<Vec<CommentRow>, RemoteError> {
        self.select(
            "comments",
            &[
                ("select", AUTHOR_EMBED),
                ("post_id", &eq(post_id)),
                ("order", "created_at.asc"),
            ],
        )
        .await
    }

    pub async fn add_comment(&self, comment: &NewComment) -> Result<CommentRow, RemoteError> {
        self.insert("comments", comment).await
    }

    // --- messages ---

    /// Full thread between two users in either direction, oldest first.
    /// No pagination; the thread is the unit of transfer.
    pub async fn get_messages(&self, a: Uuid, b: Uuid) -> Result<Vec<MessageRow>, RemoteError> {
        let or = format!(
            "(and(sender_id.eq.{a},receiver_id.eq.{b}),and(sender_id.eq.{b},receiver_id.eq.{a}))"
        );
        self.select(
            "messages",
            &[
                ("select", AUTHOR_EMBED),
                ("or", &or),
                ("order", "created_at.asc"),
            ],
        )
        .await
    }

    pub async fn send_message(&self, message: &NewMessage) -> Result<MessageRow, RemoteError> {
        self.insert("messages", message).await
    }

    // --- plumbing ---

    fn table_url(&self, table: &str) -> String {
        format!("{}/{}", self.rest_base, table)
    }

    async fn select<T: DeserializeOwned>(
        &self,
        table: &str,
        query: &[(&str, &str)],
    ) -> Result<T, RemoteError> {
        let req = self.http.get(self.table_url(table)).query(query);
        self.execute(req, table).await
    }

    /// Insert returning the stored row with joined author.
    async fn insert<T: DeserializeOwned>(
        &self,
        table: &str,
        body: &impl Serialize,
    ) -> Result<T, RemoteError> {
        let req = self
            .http
            .post(self.table_url(table))
            .query(&[("select", AUTHOR_EMBED)])
            .header("Prefer", "return=representation")
            .json(body);
        let rows: Vec<T> = self.execute(req, table).await?;
        rows.into_iter().next().ok_or(RemoteError::EmptyRepresentation)
    }

    /// Insert a relation row, discarding the representation.
    async fn insert_relation(
        &self,
        table: &str,
        body: &serde_json::Value,
    ) -> Result<(), RemoteError> {
        let req = self.http.post(self.table_url(table)).json(body);
        debug!(table, "insert relation");
        let resp = self.send(req).await?;
        Self::check_status(resp).await.map(|_| ())
    }

    async fn delete(&self, table: &str, filters: &[(&str, String)]) -> Result<(), RemoteError> {
        let req = self.http.delete(self.table_url(table)).query(filters);
        debug!(table, "delete relation");
        let resp = self.send(req).await?;
        Self::check_status(resp).await.map(|_| ())
    }

    async fn execute<T: DeserializeOwned>(
        &self,
        req: RequestBuilder,
        table: &str,
    ) -> Result<T, RemoteError> {
        debug!(table, "remote round trip");
        let resp = self.send(req).await?;
        let body = Self::check_status(resp).await?;
        Ok(serde_json::from_str(&body)?)
    }

    async fn send(&self, req: RequestBuilder) -> Result<Response, RemoteError> {
        let resp = req
            .header("apikey", &self.anon_key)
            .bearer_auth(&self.anon_key)
            .send()
            .await?;
        Ok(resp)
    }

    async fn check_status(resp: Response) -> Result<String, RemoteError> {
        let status = resp.status();
        let body = resp.text().await?;
        if status == StatusCode::CONFLICT {
            return Err(RemoteError::Constraint(body));
        }
        if !status.is_success() {
            return Err(RemoteError::Status {
                status: status.as_u16(),
                message: body,
            });
        }
        Ok(body)
    }
}

fn eq(id: Uuid) -> String {
    format!("eq.{id}")
}

fn rfc3339_now() -> String {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .expect("utc timestamps always format as rfc3339")
}
