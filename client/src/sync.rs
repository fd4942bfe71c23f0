//! Remote-first orchestration with local fallback.
//!
//! Every feature tries the hosted store and, on any remote failure, serves
//! the equivalent operation from the injected [`MockStore`] instead — the
//! whole displayed collection is replaced, never merged. The origin of the
//! data travels with it as a [`Source`] so callers can tell live data from
//! fallback data.

use std::collections::HashSet;
use std::sync::Arc;

use ldhingram_model::{
    AuthorRef, ChatMessage, CommentRow, CommentView, FeedPost, MessageRow, NewMessage, NewPost,
    NewStory, PostKind, PostRow, Profile, ProfilePatch, StoryCard, StoryMedia, StoryRow, UserCard,
};
use time::{Duration, OffsetDateTime};
use tracing::warn;
use uuid::Uuid;

use crate::error::RemoteError;
use crate::remote::RemoteClient;
use crate::store::MockStore;

/// Which data source produced a result. Fallback data is served silently to
/// the end user; this tag is the seam through which tests and future UI can
/// tell the difference.
#[derive(Debug, Clone, PartialEq)]
pub enum Source<T> {
    Remote(T),
    Fallback(T),
}

impl<T> Source<T> {
    pub fn data(&self) -> &T {
        match self {
            Source::Remote(t) | Source::Fallback(t) => t,
        }
    }

    pub fn into_inner(self) -> T {
        match self {
            Source::Remote(t) | Source::Fallback(t) => t,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, Source::Fallback(_))
    }
}

/// Viewer relations fetched once per load to resolve per-viewer flags.
struct ViewerRelations {
    liked: HashSet<Uuid>,
    saved: HashSet<Uuid>,
    following: HashSet<Uuid>,
}

pub struct FeedService {
    remote: Arc<RemoteClient>,
    store: Arc<MockStore>,
    viewer: Uuid,
}

impl FeedService {
    pub fn new(remote: Arc<RemoteClient>, store: Arc<MockStore>, viewer: Uuid) -> Self {
        Self {
            remote,
            store,
            viewer,
        }
    }

    pub fn store(&self) -> &MockStore {
        &self.store
    }

    // --- feed ---

    pub async fn load_posts(&self, limit: u32, offset: u32) -> Source<Vec<FeedPost>> {
        match self.load_posts_remote(limit, offset).await {
            Ok(posts) => Source::Remote(posts),
            Err(err) => {
                warn!("posts fetch failed, serving local data: {err}");
                Source::Fallback(self.store.posts())
            }
        }
    }

    async fn load_posts_remote(&self, limit: u32, offset: u32) -> Result<Vec<FeedPost>, RemoteError> {
        let rows = self.remote.get_posts(limit, offset).await?;
        let rel = self.viewer_relations().await?;
        Ok(rows.into_iter().map(|r| feed_post(r, &rel)).collect())
    }

    pub async fn create_post(
        &self,
        caption: &str,
        image_url: &str,
        kind: PostKind,
    ) -> Source<FeedPost> {
        let new_post = NewPost {
            user_id: self.viewer,
            caption: caption.to_string(),
            image_url: image_url.to_string(),
            is_reel: kind == PostKind::Reel,
        };
        match self.remote.create_post(&new_post).await {
            Ok(row) => Source::Remote(feed_post(row, &ViewerRelations::empty())),
            Err(err) => {
                warn!("post create failed, storing locally: {err}");
                Source::Fallback(self.store.add_post(caption, image_url, kind))
            }
        }
    }

    /// Delete-if-exists-else-insert on the viewer's Like relation, then a
    /// refetch of the post. A racing duplicate insert is treated as already
    /// liked, not as a failure.
    pub async fn toggle_like(&self, post_id: Uuid) -> Source<Option<FeedPost>> {
        match self.toggle_like_remote(post_id).await {
            Ok(post) => Source::Remote(post),
            Err(err) => {
                warn!("like toggle failed, applying locally: {err}");
                Source::Fallback(self.store.toggle_like(post_id))
            }
        }
    }

    async fn toggle_like_remote(&self, post_id: Uuid) -> Result<Option<FeedPost>, RemoteError> {
        let liked = self.remote.liked_post_ids(self.viewer).await?;
        if liked.contains(&post_id) {
            self.remote.unlike_post(self.viewer, post_id).await?;
        } else {
            match self.remote.like_post(self.viewer, post_id).await {
                Ok(()) | Err(RemoteError::Constraint(_)) => {}
                Err(err) => return Err(err),
            }
        }
        let rel = self.viewer_relations().await?;
        Ok(self
            .remote
            .get_post(post_id)
            .await?
            .map(|row| feed_post(row, &rel)))
    }

    pub async fn toggle_save(&self, post_id: Uuid) -> Source<Option<FeedPost>> {
        match self.toggle_save_remote(post_id).await {
            Ok(post) => Source::Remote(post),
            Err(err) => {
                warn!("save toggle failed, applying locally: {err}");
                Source::Fallback(self.store.toggle_save(post_id))
            }
        }
    }

    async fn toggle_save_remote(&self, post_id: Uuid) -> Result<Option<FeedPost>, RemoteError> {
        let saved = self.remote.saved_post_ids(self.viewer).await?;
        if saved.contains(&post_id) {
            self.remote.unsave_post(self.viewer, post_id).await?;
        } else {
            match self.remote.save_post(self.viewer, post_id).await {
                Ok(()) | Err(RemoteError::Constraint(_)) => {}
                Err(err) => return Err(err),
            }
        }
        let rel = self.viewer_relations().await?;
        Ok(self
            .remote
            .get_post(post_id)
            .await?
            .map(|row| feed_post(row, &rel)))
    }

    // --- stories ---

    pub async fn load_stories(&self) -> Source<Vec<StoryCard>> {
        match self.remote.get_stories().await {
            Ok(rows) => Source::Remote(rows.into_iter().map(story_card).collect()),
            Err(err) => {
                warn!("stories fetch failed, serving local data: {err}");
                Source::Fallback(self.store.stories())
            }
        }
    }

    pub async fn add_story(&self, media: StoryMedia) -> Source<StoryCard> {
        let url = match &media {
            StoryMedia::Image { url } | StoryMedia::Video { url, .. } => url.clone(),
        };
        let new_story = NewStory {
            user_id: self.viewer,
            image_url: url,
            expires_at: OffsetDateTime::now_utc() + Duration::hours(24),
        };
        match self.remote.create_story(&new_story).await {
            Ok(row) => Source::Remote(story_card(row)),
            Err(err) => {
                warn!("story create failed, storing locally: {err}");
                Source::Fallback(self.store.add_story(media))
            }
        }
    }

    // --- comments ---

    /// The local layer keeps no comments, so the fallback is an empty thread.
    pub async fn load_comments(&self, post_id: Uuid) -> Source<Vec<CommentView>> {
        match self.remote.get_comments(post_id).await {
            Ok(rows) => Source::Remote(rows.into_iter().map(comment_view).collect()),
            Err(err) => {
                warn!("comments fetch failed: {err}");
                Source::Fallback(Vec::new())
            }
        }
    }

    // --- messaging ---

    pub async fn load_thread(&self, peer: Uuid) -> Source<Vec<ChatMessage>> {
        match self.remote.get_messages(self.viewer, peer).await {
            Ok(rows) => Source::Remote(rows.into_iter().map(chat_message).collect()),
            Err(err) => {
                warn!("thread fetch failed, serving local data: {err}");
                let thread = self
                    .store
                    .chat_with(peer)
                    .map(|c| c.messages)
                    .unwrap_or_default();
                Source::Fallback(thread)
            }
        }
    }

    pub async fn send_message(&self, peer: Uuid, content: &str) -> Source<Option<ChatMessage>> {
        let message = NewMessage {
            sender_id: self.viewer,
            receiver_id: peer,
            content: content.to_string(),
        };
        match self.remote.send_message(&message).await {
            Ok(row) => Source::Remote(Some(chat_message(row))),
            Err(err) => {
                warn!("message send failed, storing locally: {err}");
                let sent = self
                    .store
                    .chat_with(peer)
                    .and_then(|chat| self.store.send_message(chat.id, content));
                Source::Fallback(sent)
            }
        }
    }

    // --- profiles ---

    pub async fn load_profile(&self, user_id: Uuid) -> Source<Option<UserCard>> {
        match self.load_profile_remote(user_id).await {
            Ok(card) => Source::Remote(card),
            Err(err) => {
                warn!("profile fetch failed, serving local data: {err}");
                Source::Fallback(self.store.user(user_id))
            }
        }
    }

    async fn load_profile_remote(&self, user_id: Uuid) -> Result<Option<UserCard>, RemoteError> {
        let profile = self.remote.get_profile(user_id).await?;
        let following = self.remote.following_ids(self.viewer).await?;
        Ok(profile.map(|p| user_card_from_profile(p, &following)))
    }

    pub async fn update_profile(&self, patch: &ProfilePatch) -> Source<UserCard> {
        match self.remote.update_profile(self.viewer, patch).await {
            Ok(profile) => Source::Remote(user_card_from_profile(profile, &HashSet::new())),
            Err(err) => {
                warn!("profile update failed, applying locally: {err}");
                Source::Fallback(self.store.update_current_user(patch))
            }
        }
    }

    /// Delete-if-exists-else-insert on the viewer's Follow relation.
    pub async fn toggle_follow(&self, user_id: Uuid) -> Source<Option<UserCard>> {
        match self.toggle_follow_remote(user_id).await {
            Ok(card) => Source::Remote(card),
            Err(err) => {
                warn!("follow toggle failed, applying locally: {err}");
                Source::Fallback(self.store.toggle_follow(user_id))
            }
        }
    }

    async fn toggle_follow_remote(&self, user_id: Uuid) -> Result<Option<UserCard>, RemoteError> {
        let following = self.remote.following_ids(self.viewer).await?;
        if following.contains(&user_id) {
            self.remote.unfollow_user(self.viewer, user_id).await?;
        } else {
            match self.remote.follow_user(self.viewer, user_id).await {
                Ok(()) | Err(RemoteError::Constraint(_)) => {}
                Err(err) => return Err(err),
            }
        }
        let following = self.remote.following_ids(self.viewer).await?;
        Ok(self
            .remote
            .get_profile(user_id)
            .await?
            .map(|p| user_card_from_profile(p, &following)))
    }

    // --- search (local only; never wired to the remote store) ---

    pub fn search_users(&self, query: &str) -> Source<Vec<UserCard>> {
        Source::Fallback(self.store.search_users(query))
    }

    pub fn search_posts(&self, query: &str) -> Source<Vec<FeedPost>> {
        Source::Fallback(self.store.search_posts(query))
    }

    async fn viewer_relations(&self) -> Result<ViewerRelations, RemoteError> {
        Ok(ViewerRelations {
            liked: self.remote.liked_post_ids(self.viewer).await?,
            saved: self.remote.saved_post_ids(self.viewer).await?,
            following: self.remote.following_ids(self.viewer).await?,
        })
    }
}

impl ViewerRelations {
    fn empty() -> Self {
        Self {
            liked: HashSet::new(),
            saved: HashSet::new(),
            following: HashSet::new(),
        }
    }
}

// --- row-to-view mapping ---
//
// Remote rows carry only what their select asked for; missing pieces
// (author counters, viewer flags the schema cannot express) are defaulted.

fn author_card(author: Option<AuthorRef>, user_id: Uuid, following: &HashSet<Uuid>) -> UserCard {
    match author {
        Some(a) => UserCard {
            id: a.id,
            name: a.full_name,
            handle: format!("@{}", a.username),
            avatar_url: a.avatar_url,
            bio: String::new(),
            website: None,
            posts: 0,
            followers: 0,
            following: 0,
            verified: false,
            is_following: following.contains(&a.id),
        },
        None => UserCard {
            id: user_id,
            name: String::new(),
            handle: String::new(),
            avatar_url: None,
            bio: String::new(),
            website: None,
            posts: 0,
            followers: 0,
            following: 0,
            verified: false,
            is_following: following.contains(&user_id),
        },
    }
}

fn feed_post(row: PostRow, rel: &ViewerRelations) -> FeedPost {
    FeedPost {
        id: row.id,
        author: author_card(row.profiles, row.user_id, &rel.following),
        image_url: row.image_url,
        caption: row.caption,
        likes: row.likes_count,
        comments: row.comments_count,
        created_at: row.created_at,
        kind: if row.is_reel {
            PostKind::Reel
        } else {
            PostKind::Post
        },
        is_liked: rel.liked.contains(&row.id),
        is_saved: rel.saved.contains(&row.id),
    }
}

fn story_card(row: StoryRow) -> StoryCard {
    StoryCard {
        id: row.id,
        author: author_card(row.profiles, row.user_id, &HashSet::new()),
        media: StoryMedia::Image {
            url: row.image_url.clone(),
        },
        created_at: row.created_at,
        expires_at: Some(row.expires_at),
        // the remote schema keeps no per-viewer story views
        is_viewed: false,
    }
}

fn comment_view(row: CommentRow) -> CommentView {
    CommentView {
        id: row.id,
        author: author_card(row.profiles, row.user_id, &HashSet::new()),
        content: row.content,
        created_at: row.created_at,
    }
}

fn chat_message(row: MessageRow) -> ChatMessage {
    ChatMessage {
        id: row.id,
        sender: author_card(row.profiles, row.sender_id, &HashSet::new()),
        content: row.content,
        created_at: row.created_at,
        // read state is derived client-side; a row fresh off the wire is unread
        is_read: false,
    }
}

fn user_card_from_profile(p: Profile, following: &HashSet<Uuid>) -> UserCard {
    UserCard {
        id: p.id,
        name: p.full_name,
        handle: format!("@{}", p.username),
        avatar_url: p.avatar_url,
        bio: p.bio.unwrap_or_default(),
        website: p.website,
        posts: p.posts_count,
        followers: p.followers_count,
        following: p.following_count,
        verified: false,
        is_following: following.contains(&p.id),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    fn sample_row(id: Uuid, author: Uuid) -> PostRow {
        PostRow {
            id,
            user_id: author,
            caption: "caption".into(),
            image_url: "img".into(),
            is_reel: true,
            likes_count: 7,
            comments_count: 1,
            created_at: datetime!(2024-05-01 10:00 UTC),
            updated_at: datetime!(2024-05-01 10:00 UTC),
            profiles: Some(AuthorRef {
                id: author,
                username: "sarahc".into(),
                full_name: "Sarah Chen".into(),
                avatar_url: None,
            }),
        }
    }

    #[test]
    fn flags_come_from_relations_not_rows() {
        let post = Uuid::new_v4();
        let author = Uuid::new_v4();
        let mut rel = ViewerRelations::empty();
        let mapped = feed_post(sample_row(post, author), &rel);
        assert!(!mapped.is_liked && !mapped.is_saved && !mapped.author.is_following);
        assert_eq!(mapped.kind, PostKind::Reel);
        assert_eq!(mapped.author.handle, "@sarahc");

        rel.liked.insert(post);
        rel.saved.insert(post);
        rel.following.insert(author);
        let mapped = feed_post(sample_row(post, author), &rel);
        assert!(mapped.is_liked && mapped.is_saved && mapped.author.is_following);
    }

    #[test]
    fn missing_embed_falls_back_to_bare_author() {
        let author = Uuid::new_v4();
        let mut row = sample_row(Uuid::new_v4(), author);
        row.profiles = None;
        let mapped = feed_post(row, &ViewerRelations::empty());
        assert_eq!(mapped.author.id, author);
        assert!(mapped.author.name.is_empty());
    }

    #[test]
    fn source_accessors() {
        let remote = Source::Remote(1);
        let fallback = Source::Fallback(2);
        assert!(!remote.is_fallback());
        assert!(fallback.is_fallback());
        assert_eq!(*remote.data(), 1);
        assert_eq!(fallback.into_inner(), 2);
    }
}
