//! Shared data model for the LDhingram client: the row shapes of the hosted
//! relational store, the view shapes screens render, and the realtime
//! change-feed payloads.

pub mod events;
pub mod rows;
pub mod view;

pub use events::{ChangeEvent, EventType};
pub use rows::{
    AuthorRef, CommentRow, FollowRow, LikeRow, MessageRow, NewComment, NewMessage, NewPost,
    NewStory, PostRow, Profile, ProfilePatch, SaveRow, StoryRow,
};
pub use view::{Chat, ChatMessage, CommentView, FeedPost, PostKind, StoryCard, StoryMedia, UserCard};
