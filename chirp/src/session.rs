//! Session-scoped key-value storage and the feed's cross-navigation cache.
//!
//! When the user opens a post from the feed, the feed stashes its scroll
//! offset, the loaded page and the opened post id. Coming back, the page is
//! restored from the cache instead of refetched, the offset is re-applied
//! (see [`crate::scroll::restore`]) and the opened post's view counter is
//! bumped locally.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::counter::bump_view_count;
use crate::list::CursorList;
use crate::types::{CursorPage, PostTimeRange, PostView};

const RESTORE_KEY: &str = "feed:restore";
const LOCK_KEY: &str = "feed:lock";
const SCROLL_KEY: &str = "feed:scrollY";
const VIEW_BUMP_KEY: &str = "feed:viewBumpId";
const CACHE_PREFIX: &str = "feed:cache:";

/// Injected string store, scoped to one browsing session.
pub trait SessionStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: String);
    fn remove(&self, key: &str);
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl SessionStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.lock().get(key).cloned()
    }

    fn set(&self, key: &str, value: String) {
        self.entries.lock().insert(key.to_string(), value);
    }

    fn remove(&self, key: &str) {
        self.entries.lock().remove(key);
    }
}

/// Serialized form of a feed page in the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CachedFeed {
    pub posts: Vec<PostView>,
    #[serde(default)]
    pub cursor: Option<String>,
    #[serde(default)]
    pub has_next: bool,
}

impl From<CachedFeed> for CursorPage<PostView> {
    fn from(cached: CachedFeed) -> Self {
        CursorPage {
            items: cached.posts,
            next_cursor: cached.cursor,
            has_next: cached.has_next,
        }
    }
}

/// What [`FeedScrollCache::hydrate`] found for the feed being mounted.
#[derive(Debug, Default)]
pub struct FeedHydration {
    /// Cached page to show instead of fetching page one.
    pub cached: Option<CachedFeed>,
    /// Offset to restore to.
    pub restore_target: Option<u32>,
}

pub struct FeedScrollCache {
    store: Arc<dyn SessionStore>,
}

impl FeedScrollCache {
    pub fn new(store: Arc<dyn SessionStore>) -> Self {
        Self { store }
    }

    fn cache_key(user_id: &str, time_range: Option<PostTimeRange>) -> String {
        let range = time_range.map_or("all", PostTimeRange::as_str);
        format!("{CACHE_PREFIX}{user_id}:{range}")
    }

    pub fn should_restore(&self) -> bool {
        self.store.get(RESTORE_KEY).as_deref() == Some("1")
    }

    /// Read back what the last visit left behind for this user and range.
    ///
    /// A cache entry that doesn't parse is deleted. When there is nothing to
    /// restore, a stale scroll lock is cleared; when there is, the lock is
    /// taken so the restore's own scrolling isn't recorded.
    pub fn hydrate(&self, user_id: &str, time_range: Option<PostTimeRange>) -> FeedHydration {
        let should_restore = self.should_restore();
        let mut hydration = FeedHydration::default();

        if should_restore {
            let key = Self::cache_key(user_id, time_range);
            if let Some(raw) = self.store.get(&key) {
                match serde_json::from_str::<CachedFeed>(&raw) {
                    Ok(cached) => hydration.cached = Some(cached),
                    Err(e) => {
                        warn!(key = %key, error = %e, "discarding corrupt feed cache");
                        self.store.remove(&key);
                    }
                }
            }
        }

        let stored = self
            .store
            .get(SCROLL_KEY)
            .and_then(|raw| raw.trim().parse::<f64>().ok())
            .filter(|offset| offset.is_finite() && *offset >= 0.0);
        match (should_restore, stored) {
            (true, Some(offset)) => {
                hydration.restore_target = Some(offset.round() as u32);
                self.store.set(LOCK_KEY, "1".to_string());
            }
            _ => self.store.remove(LOCK_KEY),
        }

        debug!(
            user_id,
            cached = hydration.cached.is_some(),
            restore_target = ?hydration.restore_target,
            "feed cache hydrated"
        );
        hydration
    }

    /// Hydrate straight into `list`. Returns the restore target; when no
    /// cached page exists the list is reset instead.
    pub async fn hydrate_list<Q>(
        &self,
        list: &CursorList<PostView, Q>,
        user_id: &str,
        time_range: Option<PostTimeRange>,
    ) -> Option<u32>
    where
        Q: Clone + PartialEq + Send + 'static,
    {
        let hydration = self.hydrate(user_id, time_range);
        match hydration.cached {
            Some(cached) => list.restore(cached.into()),
            None => list.reset().await,
        }
        hydration.restore_target
    }

    /// Leaving the feed: keep the offset unless a post click already saved it.
    pub fn save_on_leave(&self, offset: u32) {
        if self.should_restore() {
            return;
        }
        self.store.set(RESTORE_KEY, "1".to_string());
        self.store.set(SCROLL_KEY, offset.to_string());
    }

    /// A post card was opened from the feed.
    pub fn mark_open_post(&self, post_id: &str, offset: u32) {
        self.store.set(RESTORE_KEY, "1".to_string());
        self.store.set(SCROLL_KEY, offset.to_string());
        self.store.set(VIEW_BUMP_KEY, post_id.to_string());
    }

    /// Remember the live scroll offset. Ignored while locked.
    pub fn record_scroll(&self, offset: u32) -> bool {
        if self.store.get(LOCK_KEY).as_deref() == Some("1") {
            return false;
        }
        self.store.set(SCROLL_KEY, offset.to_string());
        true
    }

    /// Cache the current page for this user and range. Empty pages are
    /// not written.
    pub fn store_page(&self, user_id: &str, time_range: Option<PostTimeRange>, page: &CachedFeed) {
        if page.posts.is_empty() {
            return;
        }
        match serde_json::to_string(page) {
            Ok(raw) => self.store.set(&Self::cache_key(user_id, time_range), raw),
            Err(e) => warn!(error = %e, "failed to serialize feed cache"),
        }
    }

    /// Restoration reached a terminal state.
    pub fn finish_restore(&self) {
        self.store.remove(SCROLL_KEY);
        self.store.remove(RESTORE_KEY);
        self.store.remove(LOCK_KEY);
    }

    /// Take the pending view-bump post id, if any.
    pub fn take_view_bump(&self) -> Option<String> {
        let id = self.store.get(VIEW_BUMP_KEY)?;
        self.store.remove(VIEW_BUMP_KEY);
        Some(id)
    }

    /// Bump the opened post's view count in `list`. Waits (returns `false`
    /// without consuming the bump) while the list is still empty.
    pub fn apply_view_bump<Q>(&self, list: &CursorList<PostView, Q>) -> bool
    where
        Q: Clone + PartialEq + Send + 'static,
    {
        if list.is_empty() {
            return false;
        }
        let Some(post_id) = self.take_view_bump() else {
            return false;
        };
        list.update_item(
            |p| p.id() == post_id,
            |p| p.post.view_count = bump_view_count(&p.post.view_count),
        )
    }
}
