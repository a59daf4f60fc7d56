//! Cursor-paginated list controller.
//!
//! A [`CursorList`] accumulates pages from an injected paging function and
//! publishes its [`ListState`] through a `watch` channel, so a render layer
//! can borrow the latest snapshot or await changes.
//!
//! `reset` and `load_more` never fail: fetch errors go to the `on_error`
//! callback and leave the items untouched. Every reset, query change and
//! disable bumps a request generation; a response that arrives for an older
//! generation is dropped instead of overwriting fresher state.

use std::sync::Arc;

use futures_util::future::BoxFuture;
use parking_lot::Mutex;
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::error::{ChirpError, Result};
use crate::types::CursorPage;

/// Paging function: identity query plus cursor (`None` = first page).
pub type PageFn<T, Q> = dyn Fn(Q, Option<String>) -> BoxFuture<'static, Result<CursorPage<T>>> + Send + Sync;

/// Error surface callback.
pub type ErrorFn = dyn Fn(&ChirpError) + Send + Sync;

/// Called whenever a fetch or action starts (e.g. to clear a stale error).
pub type StartFn = dyn Fn() + Send + Sync;

/// Observable state of a cursor list.
#[derive(Debug, Clone, PartialEq)]
pub struct ListState<T> {
    /// Concatenation of all applied pages since the last reset.
    pub items: Vec<T>,
    /// `next_cursor` of the most recently applied page.
    pub cursor: Option<String>,
    /// `has_next` of the most recently applied page.
    pub has_next: bool,
    /// A fetch is outstanding.
    pub loading: bool,
    /// At least one fetch finished since the last clear.
    pub loaded: bool,
}

impl<T> Default for ListState<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            cursor: None,
            has_next: false,
            loading: false,
            loaded: false,
        }
    }
}

impl<T> ListState<T> {
    fn clear(&mut self) {
        self.items.clear();
        self.cursor = None;
        self.has_next = false;
        self.loaded = false;
    }
}

/// Construction options for [`CursorList`].
pub struct ListOptions<Q> {
    /// When false the list stays empty and performs no fetches.
    pub enabled: bool,
    /// Fetch page one on `start`, re-enable and query change.
    pub auto: bool,
    /// Initial identity query handed to the paging function.
    pub query: Q,
    pub on_error: Option<Arc<ErrorFn>>,
    pub on_start: Option<Arc<StartFn>>,
}

impl<Q: Default> Default for ListOptions<Q> {
    fn default() -> Self {
        Self {
            enabled: true,
            auto: true,
            query: Q::default(),
            on_error: None,
            on_start: None,
        }
    }
}

struct Control<Q> {
    enabled: bool,
    query: Q,
    generation: u64,
    in_flight: usize,
}

/// Growable, resettable, paginated collection.
pub struct CursorList<T, Q = ()> {
    fetch_page: Box<PageFn<T, Q>>,
    state_tx: watch::Sender<ListState<T>>,
    control: Mutex<Control<Q>>,
    auto: bool,
    on_error: Option<Arc<ErrorFn>>,
    on_start: Option<Arc<StartFn>>,
}

impl<T, Q> CursorList<T, Q>
where
    T: Send + Sync + 'static,
    Q: Clone + PartialEq + Send + 'static,
{
    /// Create a list. Nothing is fetched until [`start`](Self::start),
    /// [`reset`](Self::reset) or [`load_more`](Self::load_more).
    pub fn new<F>(fetch_page: F, options: ListOptions<Q>) -> Self
    where
        F: Fn(Q, Option<String>) -> BoxFuture<'static, Result<CursorPage<T>>> + Send + Sync + 'static,
    {
        let (state_tx, _) = watch::channel(ListState::default());
        Self {
            fetch_page: Box::new(fetch_page),
            state_tx,
            control: Mutex::new(Control {
                enabled: options.enabled,
                query: options.query,
                generation: 0,
                in_flight: 0,
            }),
            auto: options.auto,
            on_error: options.on_error,
            on_start: options.on_start,
        }
    }

    /// Mount: fetch page one when `auto` and enabled.
    pub async fn start(&self) {
        if self.auto && self.is_enabled() {
            self.reset().await;
        }
    }

    /// Discard items and cursor, then fetch page one if enabled.
    ///
    /// Any fetch still in flight from before the reset is ignored when it
    /// resolves.
    pub async fn reset(&self) {
        let enabled = {
            let mut ctl = self.control.lock();
            ctl.generation += 1;
            self.state_tx.send_modify(ListState::clear);
            ctl.enabled
        };
        if enabled {
            self.load_page(true).await;
        }
    }

    /// Fetch the page after the current cursor and append it.
    ///
    /// Does not check `has_next`/`loading`; gate with
    /// [`can_load_more`](Self::can_load_more).
    pub async fn load_more(&self) {
        self.load_page(false).await;
    }

    /// Enable or disable the list. Disabling clears it and orphans in-flight
    /// fetches; enabling re-runs the reset effect when `auto`.
    pub async fn set_enabled(&self, enabled: bool) {
        {
            let mut ctl = self.control.lock();
            if ctl.enabled == enabled {
                return;
            }
            ctl.enabled = enabled;
            if !enabled {
                ctl.generation += 1;
                self.state_tx.send_modify(ListState::clear);
            }
        }
        debug!(enabled, "cursor list enabled changed");
        if enabled {
            self.start().await;
        }
    }

    /// Replace the identity query. A different value discards the current
    /// items and, when `auto` and enabled, fetches page one under the new
    /// query. Returns whether the query changed.
    pub async fn set_query(&self, query: Q) -> bool {
        {
            let mut ctl = self.control.lock();
            if ctl.query == query {
                return false;
            }
            ctl.query = query;
            ctl.generation += 1;
            self.state_tx.send_modify(ListState::clear);
        }
        if self.auto {
            self.reset().await;
        }
        true
    }

    async fn load_page(&self, reset: bool) {
        let (generation, query, cursor) = {
            let mut ctl = self.control.lock();
            if !ctl.enabled {
                return;
            }
            ctl.in_flight += 1;
            let cursor = if reset {
                None
            } else {
                self.state_tx.borrow().cursor.clone()
            };
            self.state_tx.send_modify(|s| s.loading = true);
            (ctl.generation, ctl.query.clone(), cursor)
        };

        if let Some(on_start) = &self.on_start {
            on_start();
        }
        debug!(reset, cursor = ?cursor, generation, "fetching page");

        let result = (self.fetch_page)(query, cursor).await;

        let failure = {
            let mut ctl = self.control.lock();
            ctl.in_flight -= 1;
            let current = ctl.enabled && ctl.generation == generation;
            let loading = ctl.in_flight > 0;
            match result {
                Ok(page) if current => {
                    debug!(
                        items = page.items.len(),
                        has_next = page.has_next,
                        "applying page"
                    );
                    self.state_tx.send_modify(|s| {
                        if reset {
                            s.items = page.items;
                        } else {
                            s.items.extend(page.items);
                        }
                        s.cursor = page.next_cursor;
                        s.has_next = page.has_next;
                        s.loading = loading;
                        s.loaded = true;
                    });
                    None
                }
                Ok(_) => {
                    debug!(generation, current = ctl.generation, "dropping stale page");
                    self.state_tx.send_modify(|s| s.loading = loading);
                    None
                }
                Err(e) => {
                    self.state_tx.send_modify(|s| {
                        s.loading = loading;
                        if current {
                            s.loaded = true;
                        }
                    });
                    Some(e)
                }
            }
        };

        if let Some(e) = failure {
            warn!(error = %e, reset, "page fetch failed");
            if let Some(on_error) = &self.on_error {
                on_error(&e);
            }
        }
    }

    /// Replace the contents with a previously cached page (scroll
    /// restoration). In-flight fetches are orphaned.
    pub fn restore(&self, page: CursorPage<T>) {
        let mut ctl = self.control.lock();
        ctl.generation += 1;
        self.state_tx.send_modify(|s| {
            s.items = page.items;
            s.cursor = page.next_cursor;
            s.has_next = page.has_next;
            s.loaded = true;
        });
    }

    /// Mutate the first item matching `pred` in place. Returns whether an
    /// item matched.
    pub fn update_item(&self, pred: impl Fn(&T) -> bool, f: impl FnOnce(&mut T)) -> bool {
        self.state_tx.send_if_modified(|s| match s.items.iter_mut().find(|item| pred(item)) {
            Some(item) => {
                f(item);
                true
            }
            None => false,
        })
    }

    /// Remove every item matching `pred`. Returns how many were removed.
    pub fn remove_items(&self, pred: impl Fn(&T) -> bool) -> usize {
        let mut removed = 0;
        self.state_tx.send_if_modified(|s| {
            let before = s.items.len();
            s.items.retain(|item| !pred(item));
            removed = before - s.items.len();
            removed > 0
        });
        removed
    }

    /// Arbitrary in-place edit of the item vector; `f` reports whether it
    /// changed anything, and subscribers are only woken if it did.
    pub fn update_items(&self, f: impl FnOnce(&mut Vec<T>) -> bool) -> bool {
        self.state_tx.send_if_modified(|s| f(&mut s.items))
    }

    /// Subscribe to state changes.
    pub fn subscribe(&self) -> watch::Receiver<ListState<T>> {
        self.state_tx.subscribe()
    }

    /// Borrow the current state without cloning.
    pub fn with_state<R>(&self, f: impl FnOnce(&ListState<T>) -> R) -> R {
        f(&self.state_tx.borrow())
    }

    /// Number of items loaded so far.
    pub fn len(&self) -> usize {
        self.state_tx.borrow().items.len()
    }

    /// True when no items are loaded.
    pub fn is_empty(&self) -> bool {
        self.state_tx.borrow().items.is_empty()
    }

    /// Cursor for the next page, if the server sent one.
    pub fn cursor(&self) -> Option<String> {
        self.state_tx.borrow().cursor.clone()
    }

    /// Whether the server reported more pages.
    pub fn has_next(&self) -> bool {
        self.state_tx.borrow().has_next
    }

    /// True while a page fetch is in flight.
    pub fn is_loading(&self) -> bool {
        self.state_tx.borrow().loading
    }

    /// True once the first page has landed.
    pub fn is_loaded(&self) -> bool {
        self.state_tx.borrow().loaded
    }

    /// Whether fetching is currently allowed.
    pub fn is_enabled(&self) -> bool {
        self.control.lock().enabled
    }

    /// The query the list is currently keyed on.
    pub fn query(&self) -> Q {
        self.control.lock().query.clone()
    }

    /// The gate call sites use before `load_more`.
    pub fn can_load_more(&self) -> bool {
        let enabled = self.is_enabled();
        let state = self.state_tx.borrow();
        enabled && state.has_next && !state.loading
    }
}

impl<T, Q> CursorList<T, Q>
where
    T: Clone + Send + Sync + 'static,
    Q: Clone + PartialEq + Send + 'static,
{
    /// Clone of the current state.
    pub fn snapshot(&self) -> ListState<T> {
        self.state_tx.borrow().clone()
    }

    /// Clone of the current items.
    pub fn items(&self) -> Vec<T> {
        self.state_tx.borrow().items.clone()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use tokio::sync::oneshot;

    use super::*;
    use crate::error::ApiError;

    type Reply<T> = Result<CursorPage<T>>;

    /// Paging function driven by the test: each call consumes the next
    /// queued reply, which may be released later through its sender.
    pub(crate) struct Script<T, Q> {
        pub calls: Mutex<Vec<(Q, Option<String>)>>,
        replies: Mutex<VecDeque<oneshot::Receiver<Reply<T>>>>,
    }

    impl<T: Send + 'static, Q: Send + 'static> Script<T, Q> {
        pub fn new() -> Arc<Self> {
            Arc::new(Self {
                calls: Mutex::new(Vec::new()),
                replies: Mutex::new(VecDeque::new()),
            })
        }

        pub fn push_ready(&self, reply: Reply<T>) {
            let (tx, rx) = oneshot::channel();
            let _ = tx.send(reply);
            self.replies.lock().push_back(rx);
        }

        pub fn push_gated(&self) -> oneshot::Sender<Reply<T>> {
            let (tx, rx) = oneshot::channel();
            self.replies.lock().push_back(rx);
            tx
        }

        pub fn call_count(&self) -> usize {
            self.calls.lock().len()
        }

        pub fn fetcher(
            self: &Arc<Self>,
        ) -> impl Fn(Q, Option<String>) -> BoxFuture<'static, Reply<T>> + Send + Sync + 'static {
            let script = Arc::clone(self);
            move |query, cursor| {
                let script = Arc::clone(&script);
                Box::pin(async move {
                    script.calls.lock().push((query, cursor));
                    let rx = script
                        .replies
                        .lock()
                        .pop_front()
                        .expect("unexpected fetch");
                    rx.await.expect("reply sender dropped")
                })
            }
        }
    }

    fn list_with(script: &Arc<Script<&'static str, ()>>) -> CursorList<&'static str> {
        CursorList::new(script.fetcher(), ListOptions::default())
    }

    #[tokio::test]
    async fn test_reset_then_load_more_concatenates() {
        let script = Script::new();
        script.push_ready(Ok(CursorPage::with_next(vec!["A", "B"], "c1")));
        script.push_ready(Ok(CursorPage::last(vec!["C"])));
        let list = list_with(&script);

        list.reset().await;
        assert!(list.can_load_more());
        list.load_more().await;

        let state = list.snapshot();
        assert_eq!(state.items, vec!["A", "B", "C"]);
        assert_eq!(state.cursor, None);
        assert!(!state.has_next);
        assert!(!state.loading);
        assert!(state.loaded);

        let calls = script.calls.lock();
        assert_eq!(calls[0].1, None);
        assert_eq!(calls[1].1.as_deref(), Some("c1"));
    }

    #[tokio::test]
    async fn test_many_pages_accumulate_in_call_order() {
        let script = Script::new();
        let pages: Vec<Vec<&'static str>> = vec![vec!["a"], vec!["b", "c"], vec![], vec!["d"], vec!["e", "f"]];
        for (i, items) in pages.iter().enumerate() {
            if i + 1 == pages.len() {
                script.push_ready(Ok(CursorPage::last(items.clone())));
            } else {
                script.push_ready(Ok(CursorPage::with_next(items.clone(), format!("c{i}"))));
            }
        }
        let list = list_with(&script);

        list.reset().await;
        while list.can_load_more() {
            list.load_more().await;
        }

        assert_eq!(list.items(), pages.concat());
        assert!(!list.has_next());
        assert_eq!(script.call_count(), pages.len());
    }

    #[tokio::test]
    async fn test_reset_discards_items_while_old_fetch_pending() {
        let script = Script::new();
        script.push_ready(Ok(CursorPage::with_next(vec!["old-1"], "c1")));
        let list = list_with(&script);
        list.reset().await;

        let stale = script.push_gated();
        let fresh = script.push_gated();
        tokio::join!(list.load_more(), list.reset(), async {
            assert!(list.is_empty(), "reset clears before its fetch resolves");
            let _ = fresh.send(Ok(CursorPage::last(vec!["new-1"])));
            tokio::task::yield_now().await;
            let _ = stale.send(Ok(CursorPage::with_next(vec!["old-2"], "c2")));
        });

        let state = list.snapshot();
        assert_eq!(state.items, vec!["new-1"]);
        assert!(!state.has_next);
        assert!(!state.loading);
    }

    #[tokio::test]
    async fn test_disable_mid_fetch_does_not_repopulate() {
        let script = Script::new();
        let gate = script.push_gated();
        let list = list_with(&script);

        tokio::join!(list.reset(), async {
            assert!(list.is_loading());
            list.set_enabled(false).await;
            let _ = gate.send(Ok(CursorPage::with_next(vec!["A"], "c1")));
        });

        let state = list.snapshot();
        assert!(state.items.is_empty());
        assert!(!state.has_next);
        assert!(!state.loading);
        assert!(!state.loaded);
    }

    #[tokio::test]
    async fn test_disabled_list_never_fetches() {
        let script: Arc<Script<&'static str, ()>> = Script::new();
        let list = CursorList::new(
            script.fetcher(),
            ListOptions {
                enabled: false,
                ..Default::default()
            },
        );

        list.start().await;
        list.reset().await;
        list.load_more().await;

        assert_eq!(script.call_count(), 0);
        assert!(list.is_empty());
        assert!(!list.is_loaded());
    }

    #[tokio::test]
    async fn test_enable_rearms_and_fetches() {
        let script: Arc<Script<&'static str, ()>> = Script::new();
        script.push_ready(Ok(CursorPage::last(vec!["A"])));
        let list = CursorList::new(
            script.fetcher(),
            ListOptions {
                enabled: false,
                ..Default::default()
            },
        );

        list.set_enabled(true).await;
        assert_eq!(list.items(), vec!["A"]);
    }

    #[tokio::test]
    async fn test_fetch_error_reported_and_items_kept() {
        let script: Arc<Script<&'static str, ()>> = Script::new();
        script.push_ready(Ok(CursorPage::with_next(vec!["A"], "c1")));
        script.push_ready(Err(ApiError::new(503, serde_json::Value::Null).into()));

        let errors = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&errors);
        let list = CursorList::new(
            script.fetcher(),
            ListOptions {
                on_error: Some(Arc::new(move |e: &ChirpError| {
                    assert_eq!(e.status(), Some(503));
                    seen.fetch_add(1, Ordering::SeqCst);
                })),
                ..Default::default()
            },
        );

        list.reset().await;
        list.load_more().await;

        assert_eq!(errors.load(Ordering::SeqCst), 1);
        let state = list.snapshot();
        assert_eq!(state.items, vec!["A"]);
        assert_eq!(state.cursor.as_deref(), Some("c1"));
        assert!(state.has_next);
        assert!(!state.loading);
    }

    #[tokio::test]
    async fn test_query_change_refetches_first_page() {
        let script: Arc<Script<&'static str, Option<&'static str>>> = Script::new();
        script.push_ready(Ok(CursorPage::with_next(vec!["all-1"], "c1")));
        script.push_ready(Ok(CursorPage::last(vec!["today-1"])));
        let list = CursorList::new(script.fetcher(), ListOptions::default());

        list.start().await;
        assert!(list.set_query(Some("TODAY")).await);
        assert!(!list.set_query(Some("TODAY")).await);

        assert_eq!(list.items(), vec!["today-1"]);
        let calls = script.calls.lock();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[1], (Some("TODAY"), None));
    }

    #[tokio::test]
    async fn test_slow_response_for_old_query_is_dropped() {
        let script: Arc<Script<&'static str, u32>> = Script::new();
        let old = script.push_gated();
        let new = script.push_gated();
        let list = CursorList::new(script.fetcher(), ListOptions::default());

        tokio::join!(list.start(), list.set_query(7), async {
            let _ = new.send(Ok(CursorPage::last(vec!["author-7"])));
            tokio::task::yield_now().await;
            let _ = old.send(Ok(CursorPage::last(vec!["author-0"])));
        });

        assert_eq!(list.items(), vec!["author-7"]);
    }

    #[tokio::test]
    async fn test_update_and_remove_in_place() {
        let script = Script::new();
        script.push_ready(Ok(CursorPage::last(vec!["a", "b", "c"])));
        let list = list_with(&script);
        list.reset().await;

        assert!(list.update_item(|s| *s == "b", |s| *s = "B"));
        assert!(!list.update_item(|s| *s == "zz", |s| *s = "ZZ"));
        assert_eq!(list.remove_items(|s| *s == "a"), 1);
        assert_eq!(list.items(), vec!["B", "c"]);
        assert_eq!(script.call_count(), 1);
    }

    #[tokio::test]
    async fn test_restore_replaces_contents() {
        let script: Arc<Script<&'static str, ()>> = Script::new();
        let list = list_with(&script);

        list.restore(CursorPage::with_next(vec!["x", "y"], "c9"));

        let state = list.snapshot();
        assert_eq!(state.items, vec!["x", "y"]);
        assert_eq!(state.cursor.as_deref(), Some("c9"));
        assert!(state.loaded);
        assert_eq!(script.call_count(), 0);
    }
}
