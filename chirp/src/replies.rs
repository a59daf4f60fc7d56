//! Nested reply threads under a post.
//!
//! Every loaded reply lives once in a flat arena keyed by post id. Branches
//! (one per parent that has been expanded) hold only child ids plus their
//! own paging state, so updating a post that is visible under several
//! branches touches a single slot.

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tracing::{debug, warn};

use crate::engagement::PostSink;
use crate::error::Result;
use crate::list::{ErrorFn, StartFn};
use crate::rest::ChirpHttpClient;
use crate::scroll::{InfiniteScroll, ScrollTriggerOptions};
use crate::types::{CursorPage, ListPostsParams, PostView};

/// Fetches one page of direct replies to a parent.
pub trait ReplySource: Send + Sync {
    fn list_replies(
        &self,
        params: &ListPostsParams,
        authed: bool,
    ) -> impl Future<Output = Result<CursorPage<PostView>>> + Send;
}

impl ReplySource for ChirpHttpClient {
    /// Signed-in viewers get their engagement flags from the feed endpoint;
    /// anonymous viewers read the public listing with every flag unset.
    async fn list_replies(&self, params: &ListPostsParams, authed: bool) -> Result<CursorPage<PostView>> {
        if authed {
            self.list_feed(params).await
        } else {
            Ok(self.list_posts(params).await?.map(PostView::from))
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Branch {
    pub children: Vec<String>,
    pub cursor: Option<String>,
    pub has_next: bool,
    pub loading: bool,
    pub collapsed: bool,
}

#[derive(Debug, Clone, Default)]
pub struct ReplyTree {
    posts: HashMap<String, PostView>,
    branches: HashMap<String, Branch>,
    /// child id -> parent id
    parents: HashMap<String, String>,
    /// Bumped on every change; usable as a sentinel dependency.
    revision: u64,
}

impl ReplyTree {
    pub fn post(&self, id: &str) -> Option<&PostView> {
        self.posts.get(id)
    }

    pub fn branch(&self, parent_id: &str) -> Option<&Branch> {
        self.branches.get(parent_id)
    }

    /// Children of `parent_id` in display order.
    pub fn children(&self, parent_id: &str) -> impl Iterator<Item = &PostView> {
        self.branches
            .get(parent_id)
            .into_iter()
            .flat_map(|b| b.children.iter())
            .filter_map(|id| self.posts.get(id))
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn len(&self) -> usize {
        self.posts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.posts.is_empty()
    }

    /// Drop `id` and every reply loaded beneath it.
    fn remove_subtree(&mut self, id: &str) {
        let mut stack = vec![id.to_string()];
        while let Some(id) = stack.pop() {
            self.posts.remove(&id);
            self.parents.remove(&id);
            if let Some(branch) = self.branches.remove(&id) {
                stack.extend(branch.children);
            }
        }
    }

    fn insert_child(&mut self, parent_id: &str, post: PostView) -> String {
        let id = post.id().to_string();
        self.parents.insert(id.clone(), parent_id.to_string());
        self.posts.insert(id.clone(), post);
        id
    }
}

pub struct ReplyThread<S> {
    source: S,
    authed: bool,
    page_size: u32,
    tree_tx: watch::Sender<ReplyTree>,
    generation: AtomicU64,
    on_error: Option<Arc<ErrorFn>>,
    on_start: Option<Arc<StartFn>>,
}

impl<S: ReplySource> ReplyThread<S> {
    pub fn new(source: S, authed: bool, page_size: u32) -> Self {
        let (tree_tx, _) = watch::channel(ReplyTree::default());
        Self {
            source,
            authed,
            page_size,
            tree_tx,
            generation: AtomicU64::new(0),
            on_error: None,
            on_start: None,
        }
    }

    pub fn with_callbacks(mut self, on_error: Option<Arc<ErrorFn>>, on_start: Option<Arc<StartFn>>) -> Self {
        self.on_error = on_error;
        self.on_start = on_start;
        self
    }

    /// Fetch a page of replies to `parent_id`. `reset` starts from the first
    /// page and replaces the branch; otherwise the branch cursor is used and
    /// the page appended. Failures go to `on_error`.
    pub async fn load_children(&self, parent_id: &str, reset: bool) {
        let generation = self.generation.load(Ordering::Acquire);
        let mut cursor = None;
        self.modify(|tree| {
            let branch = tree.branches.entry(parent_id.to_string()).or_default();
            branch.loading = true;
            if !reset {
                cursor = branch.cursor.clone();
            }
        });
        if let Some(on_start) = &self.on_start {
            on_start();
        }

        debug!(parent_id, reset, cursor = ?cursor, "loading replies");
        let params = ListPostsParams {
            reply_to_post_id: Some(parent_id.to_string()),
            limit: Some(self.page_size),
            cursor,
            ..Default::default()
        };
        let result = self.source.list_replies(&params, self.authed).await;

        if self.generation.load(Ordering::Acquire) != generation {
            debug!(parent_id, "discarding replies for a reset thread");
            return;
        }
        let failure = match result {
            Ok(page) => {
                self.modify(|tree| {
                    let ids: Vec<String> = page
                        .items
                        .into_iter()
                        .map(|post| tree.insert_child(parent_id, post))
                        .collect();
                    let branch = tree.branches.entry(parent_id.to_string()).or_default();
                    let dropped: Vec<String> = if reset {
                        let previous = std::mem::replace(&mut branch.children, ids);
                        previous
                            .into_iter()
                            .filter(|id| !branch.children.contains(id))
                            .collect()
                    } else {
                        branch.children.extend(ids);
                        Vec::new()
                    };
                    branch.cursor = page.next_cursor;
                    branch.has_next = page.has_next;
                    branch.loading = false;
                    for id in &dropped {
                        tree.remove_subtree(id);
                    }
                });
                None
            }
            Err(e) => {
                self.modify(|tree| {
                    if let Some(branch) = tree.branches.get_mut(parent_id) {
                        branch.loading = false;
                    }
                });
                Some(e)
            }
        };

        if let Some(e) = failure {
            warn!(parent_id, error = %e, "reply fetch failed");
            if let Some(on_error) = &self.on_error {
                on_error(&e);
            }
        }
    }

    /// Next page for a branch, unless it is exhausted or already loading.
    /// Returns whether a fetch was made.
    pub async fn load_more(&self, parent_id: &str) -> bool {
        let ready = self
            .tree_tx
            .borrow()
            .branch(parent_id)
            .is_some_and(|b| b.has_next && !b.loading);
        if ready {
            self.load_children(parent_id, false).await;
        }
        ready
    }

    /// A freshly posted reply goes first and expands its parent.
    pub fn add_reply(&self, parent_id: &str, reply: PostView) {
        self.modify(|tree| {
            let id = tree.insert_child(parent_id, reply);
            let branch = tree.branches.entry(parent_id.to_string()).or_default();
            branch.children.retain(|c| *c != id);
            branch.children.insert(0, id);
            branch.collapsed = false;
        });
    }

    pub fn set_collapsed(&self, parent_id: &str, collapsed: bool) {
        self.modify(|tree| {
            tree.branches.entry(parent_id.to_string()).or_default().collapsed = collapsed;
        });
    }

    /// Drop every branch; fetches still in flight are discarded on arrival.
    pub fn reset(&self) {
        self.generation.fetch_add(1, Ordering::AcqRel);
        self.tree_tx.send_modify(|tree| {
            let revision = tree.revision + 1;
            *tree = ReplyTree {
                revision,
                ..Default::default()
            };
        });
    }

    /// Load more for every parent id arriving on `sentinels` until the
    /// sending side is dropped.
    pub async fn follow_sentinels(&self, mut sentinels: mpsc::UnboundedReceiver<String>) {
        while let Some(parent_id) = sentinels.recv().await {
            self.load_more(&parent_id).await;
        }
    }

    pub fn with_tree<R>(&self, f: impl FnOnce(&ReplyTree) -> R) -> R {
        f(&self.tree_tx.borrow())
    }

    pub fn children(&self, parent_id: &str) -> Vec<PostView> {
        self.with_tree(|tree| tree.children(parent_id).cloned().collect())
    }

    pub fn branch(&self, parent_id: &str) -> Option<Branch> {
        self.with_tree(|tree| tree.branch(parent_id).cloned())
    }

    pub fn subscribe(&self) -> watch::Receiver<ReplyTree> {
        self.tree_tx.subscribe()
    }

    fn modify(&self, f: impl FnOnce(&mut ReplyTree)) {
        self.tree_tx.send_modify(|tree| {
            f(tree);
            tree.revision += 1;
        });
    }
}

impl<S: ReplySource> PostSink for ReplyThread<S> {
    fn update_post(&self, post_id: &str, f: &mut dyn FnMut(&mut PostView)) -> bool {
        self.tree_tx.send_if_modified(|tree| match tree.posts.get_mut(post_id) {
            Some(post) => {
                f(post);
                tree.revision += 1;
                true
            }
            None => false,
        })
    }

    fn remove_post(&self, post_id: &str) -> bool {
        self.tree_tx.send_if_modified(|tree| {
            if !tree.posts.contains_key(post_id) {
                return false;
            }
            if let Some(parent) = tree.parents.get(post_id) {
                if let Some(branch) = tree.branches.get_mut(parent) {
                    branch.children.retain(|c| c != post_id);
                }
            }
            tree.remove_subtree(post_id);
            tree.revision += 1;
            true
        })
    }
}

/// Sentinel trigger whose hits are forwarded, as parent ids, to
/// [`ReplyThread::follow_sentinels`].
pub fn reply_sentinels(options: ScrollTriggerOptions) -> (InfiniteScroll<String>, mpsc::UnboundedReceiver<String>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let trigger = InfiniteScroll::new(options, move |parent_id: &String| {
        let _ = tx.send(parent_id.clone());
    });
    (trigger, rx)
}
