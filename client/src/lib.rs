//! LDhingram data layer: typed access to the hosted backend with a seeded
//! in-process fallback.
//!
//! Three pieces cooperate:
//! - [`remote::RemoteClient`] speaks the backend's REST conventions and the
//!   [`realtime::RealtimeClient`] its websocket change feed;
//! - [`store::MockStore`] is a self-contained local dataset with the same
//!   feature surface;
//! - [`sync::FeedService`] tries remote first and swaps in the local store on
//!   any failure, tagging every result with its [`sync::Source`].

pub mod config;
pub mod error;
pub mod realtime;
pub mod remote;
mod seed;
pub mod session;
pub mod store;
pub mod sync;
pub mod validate;

pub use config::Config;
pub use error::{RemoteError, SubscriptionError, ValidationError};
pub use realtime::{RealtimeClient, Subscription};
pub use remote::RemoteClient;
pub use session::{AuthSession, SessionStore};
pub use store::MockStore;
pub use sync::{FeedService, Source};
