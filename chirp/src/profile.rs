//! Signed-in user bookkeeping across cached posts, and follow relations.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use futures_util::future::join_all;
use parking_lot::Mutex;
use tracing::debug;

use crate::error::Result;
use crate::list::CursorList;
use crate::pending::{ActionOutcome, PendingActions};
use crate::rest::ChirpHttpClient;
use crate::types::{PostView, User, UserStats};

/// Overwrite author fields that differ from `user`. Returns whether any did.
fn sync_author(
    user: &User,
    username: &mut Option<String>,
    display_name: &mut Option<String>,
    avatar_url: &mut Option<String>,
) -> bool {
    let stale = username.as_deref() != Some(user.username.as_str())
        || display_name.as_deref() != Some(user.display_name.as_str())
        || *avatar_url != user.avatar_url;
    if stale {
        *username = Some(user.username.clone());
        *display_name = Some(user.display_name.clone());
        avatar_url.clone_from(&user.avatar_url);
    }
    stale
}

/// Bring a post (and its embedded repost) authored by `user` up to date
/// with their current profile.
pub fn apply_user_to_post(post: &mut PostView, user: &User) -> bool {
    let p = &mut post.post;
    let mut changed = false;
    if p.author_id == user.id {
        changed |= sync_author(
            user,
            &mut p.author_username,
            &mut p.author_display_name,
            &mut p.author_avatar_url,
        );
    }
    if let Some(repost) = p.repost.as_mut().filter(|r| r.author_id == user.id) {
        changed |= sync_author(
            user,
            &mut repost.author_username,
            &mut repost.author_display_name,
            &mut repost.author_avatar_url,
        );
    }
    changed
}

/// Apply [`apply_user_to_post`] across a list, notifying subscribers only
/// when something changed.
pub fn apply_user_to_posts<Q>(list: &CursorList<PostView, Q>, user: &User) -> bool
where
    Q: Clone + PartialEq + Send + 'static,
{
    let changed = list.update_items(|posts| {
        posts
            .iter_mut()
            .fold(false, |changed, post| apply_user_to_post(post, user) | changed)
    });
    if changed {
        debug!(user_id = %user.id, "synced session user onto cached posts");
    }
    changed
}

pub trait FollowApi: Send + Sync {
    fn follow(&self, user_id: &str) -> impl Future<Output = Result<()>> + Send;
    fn unfollow(&self, user_id: &str) -> impl Future<Output = Result<()>> + Send;
    fn follow_status(&self, user_id: &str) -> impl Future<Output = Result<bool>> + Send;
}

impl FollowApi for ChirpHttpClient {
    fn follow(&self, user_id: &str) -> impl Future<Output = Result<()>> + Send {
        self.follow_user(user_id)
    }

    fn unfollow(&self, user_id: &str) -> impl Future<Output = Result<()>> + Send {
        self.unfollow_user(user_id)
    }

    fn follow_status(&self, user_id: &str) -> impl Future<Output = Result<bool>> + Send {
        self.get_follow_status(user_id)
    }
}

/// The viewer's follow relations as seen from a profile page.
pub struct Relations<A> {
    api: A,
    pending: Arc<PendingActions>,
    status: Mutex<HashMap<String, bool>>,
    stats: Mutex<Option<UserStats>>,
}

impl<A: FollowApi> Relations<A> {
    pub fn new(api: A, pending: Arc<PendingActions>) -> Self {
        Self {
            api,
            pending,
            status: Mutex::new(HashMap::new()),
            stats: Mutex::new(None),
        }
    }

    /// `None` until the status has been loaded or toggled.
    pub fn is_following(&self, user_id: &str) -> Option<bool> {
        self.status.lock().get(user_id).copied()
    }

    pub fn stats(&self) -> Option<UserStats> {
        *self.stats.lock()
    }

    pub fn set_stats(&self, stats: Option<UserStats>) {
        *self.stats.lock() = stats;
    }

    /// Fetch follow status for every user not already known, concurrently.
    /// Failed lookups stay unknown.
    pub async fn load_statuses(&self, users: &[User], session_user_id: &str) {
        let targets: Vec<&str> = {
            let known = self.status.lock();
            users
                .iter()
                .map(|u| u.id.as_str())
                .filter(|id| *id != session_user_id && !known.contains_key(*id))
                .collect()
        };
        if targets.is_empty() {
            return;
        }

        let results = join_all(targets.iter().map(|id| self.api.follow_status(id))).await;
        let mut status = self.status.lock();
        for (id, result) in targets.into_iter().zip(results) {
            if let Ok(following) = result {
                status.insert(id.to_string(), following);
            }
        }
    }

    /// Follow or unfollow `target` under key `follow:<id>`. The viewer's
    /// following count and `following` list are kept in step; the list only
    /// gains the target when it has been loaded.
    pub async fn toggle_follow<Q>(&self, target: &User, following: &CursorList<User, Q>) -> ActionOutcome
    where
        Q: Clone + PartialEq + Send + 'static,
    {
        let id = target.id.as_str();
        self.pending
            .run_action(format!("follow:{id}"), async {
                let was_following = self.is_following(id).unwrap_or(false);
                if was_following {
                    self.api.unfollow(id).await?;
                    self.status.lock().insert(id.to_string(), false);
                    if let Some(stats) = self.stats.lock().as_mut() {
                        stats.following_count = stats.following_count.saturating_sub(1);
                    }
                    following.remove_items(|u| u.id == id);
                } else {
                    self.api.follow(id).await?;
                    self.status.lock().insert(id.to_string(), true);
                    if let Some(stats) = self.stats.lock().as_mut() {
                        stats.following_count += 1;
                    }
                    if following.is_loaded() {
                        following.update_items(|users| {
                            if users.iter().any(|u| u.id == id) {
                                return false;
                            }
                            users.insert(0, target.clone());
                            true
                        });
                    }
                }
                Ok(())
            })
            .await
    }
}
