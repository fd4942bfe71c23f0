//! In-memory fallback store.
//!
//! An explicitly constructed, injected object — never a module-level
//! singleton — so tests can hold isolated instances. All methods are
//! synchronous and run to completion under one lock; the store is the sole
//! writer of its state.
//!
//! Per-viewer like/save/follow/viewed status lives in relation sets keyed by
//! (actor, target) and is resolved into view flags at read time; shared
//! entities only carry counters.

use std::collections::HashSet;

use ldhingram_model::{
    Chat, ChatMessage, FeedPost, PostKind, ProfilePatch, StoryCard, StoryMedia, UserCard,
};
use parking_lot::Mutex;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::seed;

#[derive(Debug, Clone)]
pub(crate) struct StoredUser {
    pub id: Uuid,
    pub name: String,
    pub handle: String,
    pub avatar_url: Option<String>,
    pub bio: String,
    pub website: Option<String>,
    pub posts: i64,
    pub followers: i64,
    pub following: i64,
    pub verified: bool,
}

#[derive(Debug, Clone)]
pub(crate) struct StoredPost {
    pub id: Uuid,
    pub author_id: Uuid,
    pub image_url: String,
    pub caption: String,
    pub likes: i64,
    pub comments: i64,
    pub created_at: OffsetDateTime,
    pub kind: PostKind,
}

#[derive(Debug, Clone)]
pub(crate) struct StoredStory {
    pub id: Uuid,
    pub author_id: Uuid,
    pub media: StoryMedia,
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone)]
pub(crate) struct StoredMessage {
    pub id: Uuid,
    pub sender_id: Uuid,
    pub content: String,
    pub created_at: OffsetDateTime,
    pub is_read: bool,
}

#[derive(Debug, Clone)]
pub(crate) struct StoredChat {
    pub id: Uuid,
    pub peer_id: Uuid,
    pub messages: Vec<StoredMessage>,
    pub unread_count: u32,
}

#[derive(Debug, Default)]
pub(crate) struct State {
    pub current_user_id: Uuid,
    pub users: Vec<StoredUser>,
    pub posts: Vec<StoredPost>,
    pub stories: Vec<StoredStory>,
    pub chats: Vec<StoredChat>,
    /// (viewer, post)
    pub likes: HashSet<(Uuid, Uuid)>,
    /// (viewer, post)
    pub saves: HashSet<(Uuid, Uuid)>,
    /// (follower, followed)
    pub follows: HashSet<(Uuid, Uuid)>,
    /// (viewer, story)
    pub story_views: HashSet<(Uuid, Uuid)>,
}

impl State {
    fn card(&self, user_id: Uuid) -> UserCard {
        let viewer = self.current_user_id;
        match self.users.iter().find(|u| u.id == user_id) {
            Some(u) => UserCard {
                id: u.id,
                name: u.name.clone(),
                handle: u.handle.clone(),
                avatar_url: u.avatar_url.clone(),
                bio: u.bio.clone(),
                website: u.website.clone(),
                posts: u.posts,
                followers: u.followers,
                following: u.following,
                verified: u.verified,
                is_following: self.follows.contains(&(viewer, u.id)),
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
                is_following: false,
            },
        }
    }

    fn post_view(&self, post: &StoredPost) -> FeedPost {
        let viewer = self.current_user_id;
        FeedPost {
            id: post.id,
            author: self.card(post.author_id),
            image_url: post.image_url.clone(),
            caption: post.caption.clone(),
            likes: post.likes,
            comments: post.comments,
            created_at: post.created_at,
            kind: post.kind,
            is_liked: self.likes.contains(&(viewer, post.id)),
            is_saved: self.saves.contains(&(viewer, post.id)),
        }
    }

    fn story_view(&self, story: &StoredStory) -> StoryCard {
        StoryCard {
            id: story.id,
            author: self.card(story.author_id),
            media: story.media.clone(),
            created_at: story.created_at,
            // no expiry enforcement in the local layer
            expires_at: None,
            is_viewed: self.story_views.contains(&(self.current_user_id, story.id)),
        }
    }

    fn message_view(&self, msg: &StoredMessage) -> ChatMessage {
        ChatMessage {
            id: msg.id,
            sender: self.card(msg.sender_id),
            content: msg.content.clone(),
            created_at: msg.created_at,
            is_read: msg.is_read,
        }
    }

    fn chat_view(&self, chat: &StoredChat) -> Chat {
        Chat {
            id: chat.id,
            peer: self.card(chat.peer_id),
            messages: chat.messages.iter().map(|m| self.message_view(m)).collect(),
            unread_count: chat.unread_count,
        }
    }
}

pub struct MockStore {
    inner: Mutex<State>,
}

impl MockStore {
    /// A store loaded with the demo dataset.
    pub fn seeded() -> Self {
        Self::from_state(seed::demo_state())
    }

    pub(crate) fn from_state(state: State) -> Self {
        Self {
            inner: Mutex::new(state),
        }
    }

    // --- posts ---

    /// All posts, insertion order, newest additions first.
    pub fn posts(&self) -> Vec<FeedPost> {
        let state = self.inner.lock();
        state.posts.iter().map(|p| state.post_view(p)).collect()
    }

    /// Store a new post with zeroed counters, prepended to the feed.
    pub fn add_post(&self, caption: &str, image_url: &str, kind: PostKind) -> FeedPost {
        let mut state = self.inner.lock();
        let post = StoredPost {
            id: Uuid::new_v4(),
            author_id: state.current_user_id,
            image_url: image_url.to_string(),
            caption: caption.to_string(),
            likes: 0,
            comments: 0,
            created_at: OffsetDateTime::now_utc(),
            kind,
        };
        state.posts.insert(0, post);
        let view = state.post_view(&state.posts[0]);
        view
    }

    /// Flip the viewer's like on a post; the counter moves with the relation.
    /// Toggling twice restores the original state.
    pub fn toggle_like(&self, post_id: Uuid) -> Option<FeedPost> {
        let mut state = self.inner.lock();
        let viewer = state.current_user_id;
        let idx = state.posts.iter().position(|p| p.id == post_id)?;
        if state.likes.remove(&(viewer, post_id)) {
            state.posts[idx].likes -= 1;
        } else {
            state.likes.insert((viewer, post_id));
            state.posts[idx].likes += 1;
        }
        Some(state.post_view(&state.posts[idx]))
    }

    /// Flip the viewer's save on a post. Saves carry no counter.
    pub fn toggle_save(&self, post_id: Uuid) -> Option<FeedPost> {
        let mut state = self.inner.lock();
        let viewer = state.current_user_id;
        let idx = state.posts.iter().position(|p| p.id == post_id)?;
        if !state.saves.remove(&(viewer, post_id)) {
            state.saves.insert((viewer, post_id));
        }
        Some(state.post_view(&state.posts[idx]))
    }

    // --- stories ---

    pub fn stories(&self) -> Vec<StoryCard> {
        let state = self.inner.lock();
        state.stories.iter().map(|s| state.story_view(s)).collect()
    }

    pub fn add_story(&self, media: StoryMedia) -> StoryCard {
        let mut state = self.inner.lock();
        let story = StoredStory {
            id: Uuid::new_v4(),
            author_id: state.current_user_id,
            media,
            created_at: OffsetDateTime::now_utc(),
        };
        state.stories.insert(0, story);
        let view = state.story_view(&state.stories[0]);
        view
    }

    pub fn mark_story_viewed(&self, story_id: Uuid) -> bool {
        let mut state = self.inner.lock();
        let viewer = state.current_user_id;
        if state.stories.iter().any(|s| s.id == story_id) {
            state.story_views.insert((viewer, story_id));
            true
        } else {
            false
        }
    }

    // --- chats ---

    pub fn chats(&self) -> Vec<Chat> {
        let state = self.inner.lock();
        state.chats.iter().map(|c| state.chat_view(c)).collect()
    }

    pub fn chat_with(&self, peer_id: Uuid) -> Option<Chat> {
        let state = self.inner.lock();
        state
            .chats
            .iter()
            .find(|c| c.peer_id == peer_id)
            .map(|c| state.chat_view(c))
    }

    /// Append one message from the viewer to a chat's thread and reset the
    /// unread counter to zero.
    pub fn send_message(&self, chat_id: Uuid, content: &str) -> Option<ChatMessage> {
        let mut state = self.inner.lock();
        let viewer = state.current_user_id;
        let idx = state.chats.iter().position(|c| c.id == chat_id)?;
        let msg = StoredMessage {
            id: Uuid::new_v4(),
            sender_id: viewer,
            content: content.to_string(),
            created_at: OffsetDateTime::now_utc(),
            is_read: false,
        };
        state.chats[idx].messages.push(msg);
        state.chats[idx].unread_count = 0;
        let view = state.message_view(state.chats[idx].messages.last()?);
        Some(view)
    }

    // --- users ---

    /// Flip the viewer's follow of a user; the target's follower count moves
    /// with the relation.
    pub fn toggle_follow(&self, user_id: Uuid) -> Option<UserCard> {
        let mut state = self.inner.lock();
        let viewer = state.current_user_id;
        let idx = state.users.iter().position(|u| u.id == user_id)?;
        if state.follows.remove(&(viewer, user_id)) {
            state.users[idx].followers -= 1;
        } else {
            state.follows.insert((viewer, user_id));
            state.users[idx].followers += 1;
        }
        Some(state.card(user_id))
    }

    pub fn current_user(&self) -> UserCard {
        let state = self.inner.lock();
        state.card(state.current_user_id)
    }

    pub fn user(&self, user_id: Uuid) -> Option<UserCard> {
        let state = self.inner.lock();
        state.users.iter().find(|u| u.id == user_id)?;
        Some(state.card(user_id))
    }

    pub fn update_current_user(&self, patch: &ProfilePatch) -> UserCard {
        let mut state = self.inner.lock();
        let current = state.current_user_id;
        if let Some(u) = state.users.iter_mut().find(|u| u.id == current) {
            if let Some(name) = &patch.full_name {
                u.name = name.clone();
            }
            if let Some(username) = &patch.username {
                u.handle = format!("@{}", username.trim_start_matches('@'));
            }
            if let Some(avatar) = &patch.avatar_url {
                u.avatar_url = Some(avatar.clone());
            }
            if let Some(bio) = &patch.bio {
                u.bio = bio.clone();
            }
            if let Some(website) = &patch.website {
                u.website = Some(website.clone());
            }
        }
        state.card(current)
    }

    // --- search ---

    /// Case-insensitive substring match over name and handle, original
    /// order preserved.
    pub fn search_users(&self, query: &str) -> Vec<UserCard> {
        let state = self.inner.lock();
        let q = query.to_lowercase();
        state
            .users
            .iter()
            .filter(|u| u.name.to_lowercase().contains(&q) || u.handle.to_lowercase().contains(&q))
            .map(|u| state.card(u.id))
            .collect()
    }

    /// Case-insensitive substring match over caption and author name.
    pub fn search_posts(&self, query: &str) -> Vec<FeedPost> {
        let state = self.inner.lock();
        let q = query.to_lowercase();
        state
            .posts
            .iter()
            .filter(|p| {
                p.caption.to_lowercase().contains(&q)
                    || state.card(p.author_id).name.to_lowercase().contains(&q)
            })
            .map(|p| state.post_view(p))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_user_state() -> State {
        let viewer = Uuid::new_v4();
        let other = Uuid::new_v4();
        let post = Uuid::new_v4();
        State {
            current_user_id: viewer,
            users: vec![
                StoredUser {
                    id: viewer,
                    name: "Viewer".into(),
                    handle: "@viewer".into(),
                    avatar_url: None,
                    bio: String::new(),
                    website: None,
                    posts: 1,
                    followers: 0,
                    following: 0,
                    verified: false,
                },
                StoredUser {
                    id: other,
                    name: "Sarah Chen".into(),
                    handle: "@sarahc".into(),
                    avatar_url: None,
                    bio: String::new(),
                    website: None,
                    posts: 0,
                    followers: 3400,
                    following: 456,
                    verified: false,
                },
            ],
            posts: vec![StoredPost {
                id: post,
                author_id: other,
                image_url: "img".into(),
                caption: "coffee morning".into(),
                likes: 10,
                comments: 2,
                created_at: OffsetDateTime::now_utc(),
                kind: PostKind::Post,
            }],
            chats: vec![StoredChat {
                id: Uuid::new_v4(),
                peer_id: other,
                messages: vec![StoredMessage {
                    id: Uuid::new_v4(),
                    sender_id: other,
                    content: "hey".into(),
                    created_at: OffsetDateTime::now_utc(),
                    is_read: false,
                }],
                unread_count: 2,
            }],
            ..Default::default()
        }
    }

    #[test]
    fn like_toggle_moves_counter_both_ways() {
        let store = MockStore::from_state(two_user_state());
        let post = store.posts().pop().unwrap();
        assert_eq!(post.likes, 10);
        assert!(!post.is_liked);
        let liked = store.toggle_like(post.id).unwrap();
        assert_eq!(liked.likes, 11);
        assert!(liked.is_liked);
        let back = store.toggle_like(post.id).unwrap();
        assert_eq!(back.likes, 10);
        assert!(!back.is_liked);
    }

    #[test]
    fn save_toggle_is_flag_only() {
        let store = MockStore::from_state(two_user_state());
        let post = store.posts().pop().unwrap();
        let saved = store.toggle_save(post.id).unwrap();
        assert!(saved.is_saved);
        assert_eq!(saved.likes, post.likes);
        assert!(!store.toggle_save(post.id).unwrap().is_saved);
    }

    #[test]
    fn follow_double_toggle_restores_count() {
        let store = MockStore::from_state(two_user_state());
        let sarah = store.search_users("sarah").pop().unwrap();
        assert_eq!(sarah.followers, 3400);
        let followed = store.toggle_follow(sarah.id).unwrap();
        assert_eq!(followed.followers, 3401);
        assert!(followed.is_following);
        let back = store.toggle_follow(sarah.id).unwrap();
        assert_eq!(back.followers, 3400);
        assert!(!back.is_following);
    }

    #[test]
    fn add_post_prepends_with_zeroed_counters() {
        let store = MockStore::from_state(two_user_state());
        let added = store.add_post("hello", "img2", PostKind::Post);
        let posts = store.posts();
        assert_eq!(posts.len(), 2);
        assert_eq!(posts[0].id, added.id);
        assert_eq!(posts[0].caption, "hello");
        assert_eq!(posts[0].likes, 0);
        assert_eq!(posts[0].comments, 0);
    }

    #[test]
    fn send_message_appends_and_clears_unread() {
        let store = MockStore::from_state(two_user_state());
        let chat = store.chats().pop().unwrap();
        assert_eq!(chat.unread_count, 2);
        assert_eq!(chat.messages.len(), 1);
        let sent = store.send_message(chat.id, "on my way").unwrap();
        let chat = store.chats().pop().unwrap();
        assert_eq!(chat.messages.len(), 2);
        assert_eq!(chat.unread_count, 0);
        assert_eq!(chat.last_message().unwrap().id, sent.id);
        assert_eq!(chat.last_message().unwrap().content, "on my way");
    }

    #[test]
    fn search_is_case_insensitive_and_matches_handles() {
        let store = MockStore::from_state(two_user_state());
        let upper = store.search_users("SARAH");
        let lower = store.search_users("sarah");
        assert_eq!(upper, lower);
        assert_eq!(upper.len(), 1);
        // handle substring absent from the display name still matches
        assert_eq!(store.search_users("sarahc").len(), 1);
        assert!(store.search_users("nobody").is_empty());
    }

    #[test]
    fn post_search_covers_caption_and_author() {
        let store = MockStore::from_state(two_user_state());
        assert_eq!(store.search_posts("COFFEE").len(), 1);
        assert_eq!(store.search_posts("sarah chen").len(), 1);
        assert!(store.search_posts("sunset").is_empty());
    }

    #[test]
    fn story_viewed_flag_is_per_viewer_relation() {
        let store = MockStore::seeded();
        let stories = store.stories();
        let unviewed = stories.iter().find(|s| !s.is_viewed).unwrap();
        assert!(store.mark_story_viewed(unviewed.id));
        let again = store.stories();
        assert!(again.iter().find(|s| s.id == unviewed.id).unwrap().is_viewed);
        assert!(!store.mark_story_viewed(Uuid::new_v4()));
    }

    #[test]
    fn profile_update_applies_partial_patch() {
        let store = MockStore::from_state(two_user_state());
        let updated = store.update_current_user(&ProfilePatch {
            bio: Some("new bio".into()),
            username: Some("viewer2".into()),
            ..Default::default()
        });
        assert_eq!(updated.bio, "new bio");
        assert_eq!(updated.handle, "@viewer2");
        assert_eq!(updated.name, "Viewer");
    }
}
