use std::sync::Arc;

use tracing::{debug, info};

use crate::config::ChirpConfig;
use crate::engagement::{BookmarkPolicy, PostActions};
use crate::error::Result;
use crate::feeds::{author_pages, bookmark_pages, feed_pages, following_pages, FeedQuery};
use crate::list::{CursorList, ErrorFn, ListOptions, StartFn};
use crate::notifications::{notification_pages, NotificationFilter};
use crate::pending::PendingActions;
use crate::profile::Relations;
use crate::replies::ReplyThread;
use crate::rest::ChirpHttpClient;
use crate::types::*;

/// Main chirp client: one signed-in (or anonymous) session, handing out the
/// list controllers and action helpers the views are built from.
pub struct Chirp {
    pub config: ChirpConfig,
    /// HTTP client.
    pub http_client: ChirpHttpClient,
    /// Signed-in user, if any.
    pub user: Option<User>,
    pending: Arc<PendingActions>,
    on_error: Option<Arc<ErrorFn>>,
    on_start: Option<Arc<StartFn>>,
}

impl Chirp {
    /// Create a client, signing in when the config carries credentials.
    pub async fn new(config: ChirpConfig) -> Result<Self> {
        config.validate()?;
        let http_client = ChirpHttpClient::with_config(&config)?;

        let user = match config.credentials() {
            Some((identifier, password)) => {
                let user = http_client
                    .login(&LoginPayload {
                        identifier: identifier.to_string(),
                        password: password.to_string(),
                    })
                    .await?;
                info!(user_id = %user.id, username = %user.username, "signed in");
                Some(user)
            }
            None => {
                debug!("no credentials, browsing anonymously");
                None
            }
        };

        Ok(Self {
            config,
            http_client,
            user,
            pending: Arc::new(PendingActions::new()),
            on_error: None,
            on_start: None,
        })
    }

    /// Route every swallowed failure to `on_error` and every fetch or action
    /// start to `on_start`.
    pub fn with_callbacks(mut self, on_error: Option<Arc<ErrorFn>>, on_start: Option<Arc<StartFn>>) -> Self {
        self.pending = Arc::new(PendingActions::with_callbacks(on_error.clone(), on_start.clone()));
        self.on_error = on_error;
        self.on_start = on_start;
        self
    }

    pub fn is_authed(&self) -> bool {
        self.user.is_some()
    }

    pub fn user_id(&self) -> Option<&str> {
        self.user.as_ref().map(|u| u.id.as_str())
    }

    /// The session-wide pending action set.
    pub fn pending(&self) -> Arc<PendingActions> {
        Arc::clone(&self.pending)
    }

    fn options<Q>(&self, enabled: bool, query: Q) -> ListOptions<Q> {
        ListOptions {
            enabled,
            auto: true,
            query,
            on_error: self.on_error.clone(),
            on_start: self.on_start.clone(),
        }
    }

    /// Home feed; stays empty until signed in.
    pub fn feed(&self, time_range: Option<PostTimeRange>) -> CursorList<PostView, FeedQuery> {
        let query = FeedQuery {
            user_id: self.user_id().map(str::to_string),
            time_range,
        };
        CursorList::new(
            feed_pages(self.http_client.clone(), self.config.page_size),
            self.options(self.is_authed(), query),
        )
    }

    /// Posts written by `author_id`.
    pub fn author_posts(&self, author_id: &str) -> CursorList<PostView, String> {
        CursorList::new(
            author_pages(self.http_client.clone(), self.config.page_size, self.is_authed()),
            self.options(true, author_id.to_string()),
        )
    }

    pub fn bookmarks(&self) -> CursorList<PostView, Option<String>> {
        CursorList::new(
            bookmark_pages(self.http_client.clone(), self.config.page_size),
            self.options(self.is_authed(), self.user_id().map(str::to_string)),
        )
    }

    /// Users `user_id` follows. Not fetched until started or reset.
    pub fn following(&self, user_id: &str) -> CursorList<User, String> {
        CursorList::new(
            following_pages(self.http_client.clone(), self.config.page_size),
            ListOptions {
                auto: false,
                ..self.options(true, user_id.to_string())
            },
        )
    }

    pub fn notifications(&self, unread_only: bool) -> CursorList<Notification, NotificationFilter> {
        let filter = NotificationFilter {
            user_id: self.user_id().map(str::to_string),
            unread_only,
        };
        CursorList::new(
            notification_pages(self.http_client.clone(), self.config.notifications_page_size),
            self.options(self.is_authed(), filter),
        )
    }

    pub fn replies(&self) -> ReplyThread<ChirpHttpClient> {
        ReplyThread::new(self.http_client.clone(), self.is_authed(), self.config.page_size)
            .with_callbacks(self.on_error.clone(), self.on_start.clone())
    }

    pub fn post_actions(&self, bookmark_policy: BookmarkPolicy) -> PostActions<ChirpHttpClient> {
        PostActions::new(self.http_client.clone(), self.pending(), bookmark_policy)
    }

    pub fn relations(&self) -> Relations<ChirpHttpClient> {
        Relations::new(self.http_client.clone(), self.pending())
    }

    /// End the server session, if one was started.
    pub async fn logout(&mut self) -> Result<()> {
        if self.user.take().is_some() {
            self.http_client.logout().await?;
            info!("signed out");
        }
        Ok(())
    }
}
