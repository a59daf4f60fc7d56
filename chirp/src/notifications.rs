//! Notification listing, presentation and mark-as-read.

use std::future::Future;

use futures_util::FutureExt;

use crate::error::Result;
use crate::list::{CursorList, PageFn};
use crate::pending::{ActionOutcome, PendingActions};
use crate::rest::ChirpHttpClient;
use crate::types::{Notification, NotificationKind, PageQuery};

impl NotificationKind {
    /// Sentence fragment following the actor's name.
    pub fn label(self) -> &'static str {
        match self {
            NotificationKind::Like => "liked your post",
            NotificationKind::Reply => "replied to your post",
            NotificationKind::Follow => "followed you",
            NotificationKind::Repost => "reposted your post",
            NotificationKind::Quote => "quoted your post",
            NotificationKind::Mention => "mentioned you",
        }
    }

    pub fn icon(self) -> &'static str {
        match self {
            NotificationKind::Like => "♥",
            NotificationKind::Reply => "💬",
            NotificationKind::Follow => "+",
            NotificationKind::Repost => "⟳",
            NotificationKind::Quote => "❝",
            NotificationKind::Mention => "@",
        }
    }
}

/// Where opening a notification leads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotificationTarget {
    Post(String),
    User(String),
}

impl Notification {
    fn short_actor_id(&self) -> &str {
        match self.actor_id.char_indices().nth(8) {
            Some((end, _)) => &self.actor_id[..end],
            None => &self.actor_id,
        }
    }

    /// Actor username, or a shortened actor id when the actor wasn't embedded.
    pub fn handle(&self) -> &str {
        match &self.actor {
            Some(actor) => &actor.username,
            None => self.short_actor_id(),
        }
    }

    pub fn actor_name(&self) -> &str {
        match &self.actor {
            Some(actor) => &actor.display_name,
            None => self.short_actor_id(),
        }
    }

    /// Two-letter avatar placeholder.
    pub fn avatar_label(&self) -> String {
        self.actor_name()
            .chars()
            .take(2)
            .flat_map(char::to_uppercase)
            .collect()
    }

    pub fn describe(&self) -> String {
        format!("{} (@{}) {}", self.actor_name(), self.handle(), self.kind.label())
    }

    pub fn target(&self) -> NotificationTarget {
        match &self.post_id {
            Some(post_id) => NotificationTarget::Post(post_id.clone()),
            None => NotificationTarget::User(self.actor_id.clone()),
        }
    }
}

/// Identity of a notifications listing: whose, and which filter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NotificationFilter {
    pub user_id: Option<String>,
    pub unread_only: bool,
}

pub trait NotificationApi: Send + Sync {
    fn mark_read(&self, id: &str) -> impl Future<Output = Result<Notification>> + Send;
}

impl NotificationApi for ChirpHttpClient {
    fn mark_read(&self, id: &str) -> impl Future<Output = Result<Notification>> + Send {
        self.mark_notification_read(id)
    }
}

/// Paging function for a notifications [`CursorList`].
pub fn notification_pages(client: ChirpHttpClient, page_size: u32) -> Box<PageFn<Notification, NotificationFilter>> {
    Box::new(move |filter: NotificationFilter, cursor| {
        let client = client.clone();
        async move {
            client
                .list_notifications(&PageQuery::new(cursor, page_size), filter.unread_only)
                .await
        }
        .boxed()
    })
}

/// Mark `notification` read, keyed by its id in `pending`. Already-read
/// notifications are skipped (`None`). The server's record replaces the
/// cached one, except that a missing actor keeps the cached actor.
pub async fn mark_read<A: NotificationApi>(
    api: &A,
    pending: &PendingActions,
    list: &CursorList<Notification, NotificationFilter>,
    notification: &Notification,
) -> Option<ActionOutcome> {
    if !notification.is_unread() {
        return None;
    }
    let outcome = pending
        .run_action(notification.id.clone(), async {
            let updated = api.mark_read(&notification.id).await?;
            let id = updated.id.clone();
            list.update_item(
                |item| item.id == id,
                |item| {
                    let actor = updated.actor.clone().or_else(|| item.actor.take());
                    *item = Notification { actor, ..updated };
                },
            );
            Ok(())
        })
        .await;
    Some(outcome)
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use chrono::{TimeZone, Utc};

    use super::*;
    use crate::list::tests::Script;
    use crate::list::ListOptions;
    use crate::types::{CursorPage, NotificationActor};

    fn notification(id: &str, kind: NotificationKind) -> Notification {
        Notification {
            id: id.to_string(),
            recipient_id: "me".to_string(),
            actor_id: "a1b2c3d4e5f6".to_string(),
            kind,
            post_id: None,
            read_at: None,
            created_at: Utc.with_ymd_and_hms(2024, 5, 1, 9, 30, 0).unwrap(),
            actor: Some(NotificationActor {
                id: "a1b2c3d4e5f6".to_string(),
                username: "ada".to_string(),
                display_name: "ada lovelace".to_string(),
                avatar_url: None,
            }),
        }
    }

    struct FakeApi {
        calls: AtomicUsize,
    }

    impl NotificationApi for FakeApi {
        async fn mark_read(&self, id: &str) -> Result<Notification> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let mut updated = notification(id, NotificationKind::Like);
            updated.read_at = Some(Utc.with_ymd_and_hms(2024, 5, 2, 0, 0, 0).unwrap());
            updated.actor = None;
            Ok(updated)
        }
    }

    #[test]
    fn test_every_kind_has_label_and_icon() {
        for kind in [
            NotificationKind::Like,
            NotificationKind::Reply,
            NotificationKind::Follow,
            NotificationKind::Repost,
            NotificationKind::Quote,
            NotificationKind::Mention,
        ] {
            assert!(!kind.label().is_empty());
            assert!(!kind.icon().is_empty());
        }
        assert_eq!(NotificationKind::Follow.label(), "followed you");
    }

    #[test]
    fn test_presentation_without_actor() {
        let mut n = notification("n1", NotificationKind::Reply);
        assert_eq!(n.describe(), "ada lovelace (@ada) replied to your post");
        assert_eq!(n.avatar_label(), "AD");
        assert_eq!(n.target(), NotificationTarget::User("a1b2c3d4e5f6".into()));

        n.actor = None;
        n.post_id = Some("p9".into());
        assert_eq!(n.handle(), "a1b2c3d4");
        assert_eq!(n.avatar_label(), "A1");
        assert_eq!(n.target(), NotificationTarget::Post("p9".into()));
    }

    #[tokio::test]
    async fn test_mark_read_merges_and_keeps_actor() {
        let script = Script::new();
        script.push_ready(Ok(CursorPage::last(vec![
            notification("n1", NotificationKind::Like),
            notification("n2", NotificationKind::Follow),
        ])));
        let list = CursorList::new(
            script.fetcher(),
            ListOptions {
                query: NotificationFilter {
                    user_id: Some("me".into()),
                    unread_only: false,
                },
                ..Default::default()
            },
        );
        list.reset().await;
        let api = FakeApi {
            calls: AtomicUsize::new(0),
        };
        let pending = PendingActions::new();

        let target = list.items()[0].clone();
        let outcome = mark_read(&api, &pending, &list, &target).await;
        assert_eq!(outcome, Some(ActionOutcome::Completed));

        let updated = list.items()[0].clone();
        assert!(!updated.is_unread());
        assert_eq!(updated.actor, target.actor);
        assert!(list.items()[1].is_unread());

        assert_eq!(mark_read(&api, &pending, &list, &updated).await, None);
        assert_eq!(api.calls.load(Ordering::SeqCst), 1);
    }
}
