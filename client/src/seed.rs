//! Demo dataset the fallback store starts from. Ids are deterministic
//! (v5 UUIDs over a fixed namespace) so fixtures and tests can refer to the
//! same rows across runs.

use ldhingram_model::{PostKind, StoryMedia};
use time::{Duration, OffsetDateTime};
use uuid::Uuid;

use crate::store::{State, StoredChat, StoredMessage, StoredPost, StoredStory, StoredUser};

fn seed_id(name: &str) -> Uuid {
    Uuid::new_v5(&Uuid::NAMESPACE_OID, name.as_bytes())
}

pub(crate) fn user_id(handle: &str) -> Uuid {
    seed_id(&format!("user:{handle}"))
}

pub(crate) fn post_id(n: u32) -> Uuid {
    seed_id(&format!("post:{n}"))
}

pub(crate) fn story_id(n: u32) -> Uuid {
    seed_id(&format!("story:{n}"))
}

pub(crate) fn chat_id(n: u32) -> Uuid {
    seed_id(&format!("chat:{n}"))
}

#[allow(clippy::too_many_arguments)]
fn user(
    handle: &str,
    name: &str,
    bio: &str,
    website: Option<&str>,
    posts: i64,
    followers: i64,
    following: i64,
    verified: bool,
) -> StoredUser {
    StoredUser {
        id: user_id(handle),
        name: name.to_string(),
        handle: format!("@{handle}"),
        avatar_url: Some(format!("https://cdn.ldhingram.example/avatars/{handle}.jpg")),
        bio: bio.to_string(),
        website: website.map(str::to_string),
        posts,
        followers,
        following,
        verified,
    }
}

pub(crate) fn demo_state() -> State {
    let now = OffsetDateTime::now_utc();
    let official = user(
        "ldhingram",
        "LDhingram Official",
        "Welcome to LDhingram! Share your moments, connect with friends, and discover amazing content.",
        Some("ldhingram.com"),
        127,
        12_500,
        892,
        true,
    );
    let sarah = user(
        "sarahc",
        "Sarah Chen",
        "Digital creator & photographer. Living life one adventure at a time.",
        None,
        89,
        3_400,
        456,
        false,
    );
    let mike = user(
        "mikej",
        "Mike Johnson",
        "Coffee lover | Developer | Adventure seeker",
        None,
        156,
        2_100,
        789,
        false,
    );
    let priya = user(
        "priyasharma",
        "Priya Sharma",
        "Bollywood dancer | Mumbai | Spreading joy through dance",
        None,
        234,
        45_600,
        1_200,
        true,
    );
    let arjun = user(
        "arjunpatel",
        "Arjun Patel",
        "Tech entrepreneur | Bangalore | Building the future",
        None,
        189,
        23_400,
        567,
        true,
    );
    let kavya = user(
        "kavyareddy",
        "Kavya Reddy",
        "Food blogger | Hyderabad | Authentic Indian recipes",
        None,
        156,
        18_900,
        890,
        false,
    );

    let viewer = official.id;
    let posts = vec![
        StoredPost {
            id: post_id(1),
            author_id: official.id,
            image_url: "https://cdn.ldhingram.example/posts/welcome.jpg".into(),
            caption: "Welcome to LDhingram! Share your moments and tag us in your posts. #LDhingram #Community".into(),
            likes: 15_420,
            comments: 892,
            created_at: now - Duration::days(1),
            kind: PostKind::Post,
        },
        StoredPost {
            id: post_id(2),
            author_id: sarah.id,
            image_url: "https://cdn.ldhingram.example/posts/sunset.jpg".into(),
            caption: "Golden hour magic. Nothing beats a perfect sunset at the beach. #goldenhour #beachvibes".into(),
            likes: 2_847,
            comments: 156,
            created_at: now - Duration::hours(2),
            kind: PostKind::Post,
        },
        StoredPost {
            id: post_id(3),
            author_id: mike.id,
            image_url: "https://cdn.ldhingram.example/posts/coffee.jpg".into(),
            caption: "Perfect coffee morning. Fuel for creativity and good vibes. #coffeelover #morningvibes".into(),
            likes: 1_203,
            comments: 87,
            created_at: now - Duration::hours(4),
            kind: PostKind::Reel,
        },
    ];

    let stories = vec![
        StoredStory {
            id: story_id(1),
            author_id: official.id,
            media: StoryMedia::Video {
                url: "https://cdn.ldhingram.example/stories/launch.mp4".into(),
                duration_secs: 8,
            },
            created_at: now - Duration::hours(2),
        },
        StoredStory {
            id: story_id(2),
            author_id: sarah.id,
            media: StoryMedia::Image {
                url: "https://cdn.ldhingram.example/stories/hike.jpg".into(),
            },
            created_at: now - Duration::hours(4),
        },
    ];

    let chats = vec![
        StoredChat {
            id: chat_id(1),
            peer_id: sarah.id,
            messages: vec![
                StoredMessage {
                    id: seed_id("message:1"),
                    sender_id: viewer,
                    content: "Loved the sunset shot!".into(),
                    created_at: now - Duration::minutes(30),
                    is_read: true,
                },
                StoredMessage {
                    id: seed_id("message:2"),
                    sender_id: sarah.id,
                    content: "Hey! How are you doing?".into(),
                    created_at: now - Duration::minutes(2),
                    is_read: false,
                },
            ],
            unread_count: 2,
        },
        StoredChat {
            id: chat_id(2),
            peer_id: mike.id,
            messages: vec![StoredMessage {
                id: seed_id("message:3"),
                sender_id: mike.id,
                content: "Thanks for the follow!".into(),
                created_at: now - Duration::hours(1),
                is_read: true,
            }],
            unread_count: 0,
        },
    ];

    let mut state = State {
        current_user_id: viewer,
        users: vec![official, sarah, mike, priya, arjun, kavya],
        posts,
        stories,
        chats,
        ..Default::default()
    };
    // the demo account already follows two creators and has engaged with
    // the feed: one liked post, one saved, one viewed story
    state.follows.insert((viewer, user_id("sarahc")));
    state.follows.insert((viewer, user_id("arjunpatel")));
    state.likes.insert((viewer, post_id(2)));
    state.saves.insert((viewer, post_id(3)));
    state.story_views.insert((viewer, story_id(2)));
    state
}
