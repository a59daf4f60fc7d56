pub mod client;
pub mod config;
pub mod counter;
pub mod engagement;
pub mod error;
pub mod feeds;
pub mod list;
pub mod notifications;
pub mod pending;
pub mod profile;
pub mod replies;
pub mod rest;
pub mod scroll;
pub mod session;
pub mod types;

// ---- Top-level re-exports for ergonomic usage ----

// Client + config
pub use client::Chirp;
pub use config::ChirpConfig;
pub use error::{ApiError, ChirpError, Result};

// REST client
pub use rest::ChirpHttpClient;

// Controllers
pub use list::{CursorList, ListOptions, ListState};
pub use pending::{ActionOutcome, PendingActions};
pub use replies::{Branch, ReplyThread, ReplyTree};

// Actions
pub use engagement::{BookmarkPolicy, EngagementApi, PostActions, PostSink};
pub use notifications::{NotificationFilter, NotificationTarget};
pub use profile::{apply_user_to_post, apply_user_to_posts, Relations};

// Scrolling + session cache
pub use scroll::{InfiniteScroll, RestoreState, ScrollRestore, ScrollTriggerOptions, Span, Viewport};
pub use session::{FeedScrollCache, MemoryStore, SessionStore};

// Feeds
pub use feeds::FeedQuery;

// Wire types
pub use types::{
    Bookmark, CursorPage, Notification, NotificationKind, PageQuery, Post, PostTimeRange,
    PostView, User, UserStats,
};
