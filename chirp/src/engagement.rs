//! Like, bookmark and repost toggles.
//!
//! Updates are confirmed-optimistic: nothing local changes until the remote
//! call succeeds, so a failure needs no rollback. The direction of a toggle
//! comes from the flags on the post the caller passed in; the counter change
//! is applied to whatever the sink holds at confirmation time.

use std::future::Future;
use std::sync::Arc;

use crate::error::Result;
use crate::list::CursorList;
use crate::pending::{ActionOutcome, PendingActions};
use crate::rest::ChirpHttpClient;
use crate::types::PostView;

/// Remote engagement mutations, one call per direction.
pub trait EngagementApi: Send + Sync {
    fn like(&self, post_id: &str) -> impl Future<Output = Result<()>> + Send;
    fn unlike(&self, post_id: &str) -> impl Future<Output = Result<()>> + Send;
    fn bookmark(&self, post_id: &str) -> impl Future<Output = Result<()>> + Send;
    fn unbookmark(&self, post_id: &str) -> impl Future<Output = Result<()>> + Send;
    fn repost(&self, post_id: &str) -> impl Future<Output = Result<()>> + Send;
    fn unrepost(&self, post_id: &str) -> impl Future<Output = Result<()>> + Send;
}

impl EngagementApi for ChirpHttpClient {
    fn like(&self, post_id: &str) -> impl Future<Output = Result<()>> + Send {
        self.like_post(post_id)
    }

    fn unlike(&self, post_id: &str) -> impl Future<Output = Result<()>> + Send {
        self.unlike_post(post_id)
    }

    fn bookmark(&self, post_id: &str) -> impl Future<Output = Result<()>> + Send {
        self.bookmark_post(post_id)
    }

    fn unbookmark(&self, post_id: &str) -> impl Future<Output = Result<()>> + Send {
        self.unbookmark_post(post_id)
    }

    fn repost(&self, post_id: &str) -> impl Future<Output = Result<()>> + Send {
        self.repost_post(post_id)
    }

    fn unrepost(&self, post_id: &str) -> impl Future<Output = Result<()>> + Send {
        self.unrepost_post(post_id)
    }
}

/// Wherever a post is displayed from: a list, a reply thread, ...
pub trait PostSink: Send + Sync {
    /// Apply `f` to the post with `post_id`. Returns whether it was found.
    fn update_post(&self, post_id: &str, f: &mut dyn FnMut(&mut PostView)) -> bool;
    fn remove_post(&self, post_id: &str) -> bool;
}

impl<Q> PostSink for CursorList<PostView, Q>
where
    Q: Clone + PartialEq + Send + 'static,
{
    fn update_post(&self, post_id: &str, f: &mut dyn FnMut(&mut PostView)) -> bool {
        self.update_item(|p| p.id() == post_id, f)
    }

    fn remove_post(&self, post_id: &str) -> bool {
        self.remove_items(|p| p.id() == post_id) > 0
    }
}

/// What unbookmarking does to the displayed post.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BookmarkPolicy {
    /// Clear the flag and keep the post.
    #[default]
    Flip,
    /// Drop the post from the sink (bookmarks view).
    RemoveOnUnbookmark,
}

pub struct PostActions<A> {
    api: A,
    pending: Arc<PendingActions>,
    bookmark_policy: BookmarkPolicy,
}

impl<A: EngagementApi> PostActions<A> {
    pub fn new(api: A, pending: Arc<PendingActions>, bookmark_policy: BookmarkPolicy) -> Self {
        Self {
            api,
            pending,
            bookmark_policy,
        }
    }

    pub fn pending(&self) -> &PendingActions {
        &self.pending
    }

    pub async fn toggle_like(&self, sink: &dyn PostSink, post: &PostView) -> ActionOutcome {
        let id = post.id();
        let liked = post.liked_by_me;
        self.pending
            .run_action(format!("like:{id}"), async {
                if liked {
                    self.api.unlike(id).await?;
                    sink.update_post(id, &mut |p| {
                        p.liked_by_me = false;
                        p.post.like_count = p.post.like_count.saturating_sub(1);
                    });
                } else {
                    self.api.like(id).await?;
                    sink.update_post(id, &mut |p| {
                        p.liked_by_me = true;
                        p.post.like_count += 1;
                    });
                }
                Ok(())
            })
            .await
    }

    pub async fn toggle_bookmark(&self, sink: &dyn PostSink, post: &PostView) -> ActionOutcome {
        let id = post.id();
        let bookmarked = post.bookmarked_by_me;
        let policy = self.bookmark_policy;
        self.pending
            .run_action(format!("bookmark:{id}"), async {
                if bookmarked {
                    self.api.unbookmark(id).await?;
                    match policy {
                        BookmarkPolicy::RemoveOnUnbookmark => {
                            sink.remove_post(id);
                        }
                        BookmarkPolicy::Flip => {
                            sink.update_post(id, &mut |p| p.bookmarked_by_me = false);
                        }
                    }
                } else {
                    self.api.bookmark(id).await?;
                    sink.update_post(id, &mut |p| p.bookmarked_by_me = true);
                }
                Ok(())
            })
            .await
    }

    pub async fn toggle_repost(&self, sink: &dyn PostSink, post: &PostView) -> ActionOutcome {
        let id = post.id();
        let reposted = post.reposted_by_me;
        self.pending
            .run_action(format!("repost:{id}"), async {
                if reposted {
                    self.api.unrepost(id).await?;
                    sink.update_post(id, &mut |p| {
                        p.reposted_by_me = false;
                        p.post.repost_count = p.post.repost_count.saturating_sub(1);
                    });
                } else {
                    self.api.repost(id).await?;
                    sink.update_post(id, &mut |p| {
                        p.reposted_by_me = true;
                        p.post.repost_count += 1;
                    });
                }
                Ok(())
            })
            .await
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use parking_lot::Mutex;

    use super::*;
    use crate::error::ApiError;
    use crate::list::tests::Script;
    use crate::list::ListOptions;
    use crate::types::fixtures;
    use crate::types::CursorPage;

    /// Records calls; fails every call for ids in `failing`.
    #[derive(Default)]
    pub(crate) struct FakeApi {
        pub calls: Mutex<Vec<String>>,
        pub failing: Vec<String>,
    }

    impl FakeApi {
        fn record(&self, verb: &str, post_id: &str) -> impl Future<Output = Result<()>> + Send {
            self.calls.lock().push(format!("{verb}:{post_id}"));
            let result = if self.failing.iter().any(|id| id == post_id) {
                Err(ApiError::new(500, serde_json::json!("Internal Server Error")).into())
            } else {
                Ok(())
            };
            std::future::ready(result)
        }
    }

    impl EngagementApi for FakeApi {
        fn like(&self, post_id: &str) -> impl Future<Output = Result<()>> + Send {
            self.record("like", post_id)
        }

        fn unlike(&self, post_id: &str) -> impl Future<Output = Result<()>> + Send {
            self.record("unlike", post_id)
        }

        fn bookmark(&self, post_id: &str) -> impl Future<Output = Result<()>> + Send {
            self.record("bookmark", post_id)
        }

        fn unbookmark(&self, post_id: &str) -> impl Future<Output = Result<()>> + Send {
            self.record("unbookmark", post_id)
        }

        fn repost(&self, post_id: &str) -> impl Future<Output = Result<()>> + Send {
            self.record("repost", post_id)
        }

        fn unrepost(&self, post_id: &str) -> impl Future<Output = Result<()>> + Send {
            self.record("unrepost", post_id)
        }
    }

    async fn list_of(posts: Vec<PostView>) -> CursorList<PostView> {
        let script = Script::new();
        script.push_ready(Ok(CursorPage::last(posts)));
        let list = CursorList::new(script.fetcher(), ListOptions::default());
        list.reset().await;
        list
    }

    fn actions(policy: BookmarkPolicy) -> PostActions<FakeApi> {
        PostActions::new(FakeApi::default(), Arc::new(PendingActions::new()), policy)
    }

    #[tokio::test]
    async fn test_like_increments_and_unlike_decrements() {
        let mut post = fixtures::view("p1");
        post.post.like_count = 4;
        let list = list_of(vec![post]).await;
        let actions = actions(BookmarkPolicy::Flip);

        let current = list.items()[0].clone();
        assert!(actions.toggle_like(&list, &current).await.is_completed());
        let liked = list.items()[0].clone();
        assert!(liked.liked_by_me);
        assert_eq!(liked.post.like_count, 5);

        actions.toggle_like(&list, &liked).await;
        let unliked = list.items()[0].clone();
        assert!(!unliked.liked_by_me);
        assert_eq!(unliked.post.like_count, 4);
        assert_eq!(*actions.api.calls.lock(), vec!["like:p1", "unlike:p1"]);
    }

    #[tokio::test]
    async fn test_unlike_clamps_at_zero() {
        let mut post = fixtures::view("p1");
        post.liked_by_me = true;
        post.post.like_count = 0;
        post.reposted_by_me = true;
        let list = list_of(vec![post.clone()]).await;
        let actions = actions(BookmarkPolicy::Flip);

        actions.toggle_like(&list, &post).await;
        actions.toggle_repost(&list, &post).await;

        let after = list.items()[0].clone();
        assert!(!after.liked_by_me);
        assert_eq!(after.post.like_count, 0);
        assert!(!after.reposted_by_me);
        assert_eq!(after.post.repost_count, 0);
    }

    #[tokio::test]
    async fn test_unbookmark_removes_exactly_one_item() {
        for position in 0..3 {
            let posts: Vec<PostView> = ["p0", "p1", "p2"]
                .iter()
                .map(|id| {
                    let mut p = fixtures::view(id);
                    p.bookmarked_by_me = true;
                    p
                })
                .collect();
            let target = posts[position].clone();
            let list = list_of(posts).await;
            let actions = actions(BookmarkPolicy::RemoveOnUnbookmark);

            actions.toggle_bookmark(&list, &target).await;

            let remaining = list.items();
            assert_eq!(remaining.len(), 2);
            assert!(remaining.iter().all(|p| p.id() != target.id()));
        }
    }

    #[tokio::test]
    async fn test_bookmark_flip_keeps_item() {
        let post = fixtures::view("p1");
        let list = list_of(vec![post.clone()]).await;
        let actions = actions(BookmarkPolicy::Flip);

        actions.toggle_bookmark(&list, &post).await;
        let bookmarked = list.items()[0].clone();
        assert!(bookmarked.bookmarked_by_me);

        actions.toggle_bookmark(&list, &bookmarked).await;
        assert_eq!(list.len(), 1);
        assert!(!list.items()[0].bookmarked_by_me);
    }

    #[tokio::test]
    async fn test_failed_call_leaves_post_untouched() {
        let mut post = fixtures::view("p1");
        post.post.repost_count = 2;
        let list = list_of(vec![post.clone()]).await;
        let actions = PostActions::new(
            FakeApi {
                failing: vec!["p1".into()],
                ..Default::default()
            },
            Arc::new(PendingActions::new()),
            BookmarkPolicy::RemoveOnUnbookmark,
        );

        assert_eq!(actions.toggle_repost(&list, &post).await, ActionOutcome::Failed);
        assert_eq!(list.items()[0], post);
        assert!(!actions.pending().is_pending("repost:p1"));
    }
}
