//! Infinite scroll trigger.
//!
//! Sentinels are registered by key. While enabled, every registered sentinel
//! is observed; the first [`InfiniteScroll::check`] that finds it inside the
//! viewport (grown by the root margin) stops observing it and fires the
//! callback with its key. It fires again only after being re-observed, by
//! a dependency change, a re-enable or a margin change.

use std::collections::hash_map::DefaultHasher;
use std::collections::{HashMap, HashSet};
use std::hash::{Hash, Hasher};

use tracing::{debug, trace};

use super::{Span, Viewport};

/// Where sentinels currently sit. `None` means the sentinel is no longer
/// part of the layout and should be forgotten.
pub trait SentinelLayout<K> {
    fn span(&self, key: &K) -> Option<Span>;
}

impl<K: Eq + Hash> SentinelLayout<K> for HashMap<K, Span> {
    fn span(&self, key: &K) -> Option<Span> {
        self.get(key).copied()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ScrollTriggerOptions {
    pub enabled: bool,
    /// Fetch-ahead distance added above and below the viewport.
    pub root_margin: u32,
}

impl Default for ScrollTriggerOptions {
    fn default() -> Self {
        Self {
            enabled: true,
            root_margin: 200,
        }
    }
}

pub struct InfiniteScroll<K> {
    /// Tracked sentinels in registration order.
    registered: Vec<K>,
    /// Sentinels armed on the live observer; `None` while disabled.
    observer: Option<HashSet<K>>,
    root_margin: u32,
    deps_hash: Option<u64>,
    on_intersect: Box<dyn FnMut(&K) + Send>,
}

impl<K> InfiniteScroll<K>
where
    K: Clone + Eq + Hash + std::fmt::Debug,
{
    pub fn new(options: ScrollTriggerOptions, on_intersect: impl FnMut(&K) + Send + 'static) -> Self {
        Self {
            registered: Vec::new(),
            observer: options.enabled.then(HashSet::new),
            root_margin: options.root_margin,
            deps_hash: None,
            on_intersect: Box::new(on_intersect),
        }
    }

    /// Track a sentinel and observe it right away when enabled. Registering
    /// a key twice keeps a single observation.
    pub fn register(&mut self, key: K) {
        if !self.registered.contains(&key) {
            self.registered.push(key.clone());
        }
        if let Some(observed) = &mut self.observer {
            observed.insert(key);
        }
    }

    /// Stop tracking a sentinel.
    pub fn unregister(&mut self, key: &K) {
        self.registered.retain(|k| k != key);
        if let Some(observed) = &mut self.observer {
            observed.remove(key);
        }
    }

    /// Disabling disconnects the observer; enabling builds a fresh one and
    /// re-observes every registered sentinel still in the layout.
    pub fn set_enabled(&mut self, enabled: bool, layout: &impl SentinelLayout<K>) {
        match (enabled, self.observer.is_some()) {
            (false, true) => {
                debug!("infinite scroll disconnected");
                self.observer = None;
            }
            (true, false) => {
                self.observer = Some(HashSet::new());
                self.observe_all(layout);
            }
            _ => {}
        }
    }

    /// Changing the margin replaces the observer, re-arming every sentinel.
    pub fn set_root_margin(&mut self, root_margin: u32, layout: &impl SentinelLayout<K>) {
        if self.root_margin == root_margin {
            return;
        }
        self.root_margin = root_margin;
        if self.observer.is_some() {
            self.observer = Some(HashSet::new());
            self.observe_all(layout);
        }
    }

    /// Re-observe all registered sentinels when `deps` differs from the last
    /// call (the first call always counts as a change). This is how a
    /// sentinel revealed by a freshly rendered page gets picked up.
    pub fn sync_dependencies<D: Hash>(&mut self, deps: &D, layout: &impl SentinelLayout<K>) -> bool {
        let mut hasher = DefaultHasher::new();
        deps.hash(&mut hasher);
        let hash = hasher.finish();
        if self.deps_hash == Some(hash) {
            return false;
        }
        self.deps_hash = Some(hash);
        self.observe_all(layout);
        true
    }

    /// Forget detached sentinels, then observe every remaining one.
    pub fn observe_all(&mut self, layout: &impl SentinelLayout<K>) {
        let Some(observed) = &mut self.observer else {
            return;
        };
        let before = self.registered.len();
        self.registered.retain(|key| layout.span(key).is_some());
        if self.registered.len() != before {
            trace!(pruned = before - self.registered.len(), "pruned detached sentinels");
        }
        observed.extend(self.registered.iter().cloned());
    }

    /// Fire the callback for every observed sentinel inside the viewport,
    /// unobserving each one first. Returns how many fired.
    pub fn check(&mut self, viewport: Viewport, layout: &impl SentinelLayout<K>) -> usize {
        let Some(observed) = &mut self.observer else {
            return 0;
        };
        let margin = self.root_margin;
        let hits: Vec<K> = self
            .registered
            .iter()
            .filter(|key| observed.contains(*key))
            .filter(|key| {
                layout
                    .span(key)
                    .is_some_and(|span| viewport.intersects(span, margin))
            })
            .cloned()
            .collect();

        for key in &hits {
            observed.remove(key);
            debug!(sentinel = ?key, "sentinel intersecting");
            (self.on_intersect)(key);
        }
        hits.len()
    }

    pub fn is_enabled(&self) -> bool {
        self.observer.is_some()
    }

    pub fn is_observing(&self, key: &K) -> bool {
        self.observer.as_ref().is_some_and(|o| o.contains(key))
    }

    pub fn registered(&self) -> &[K] {
        &self.registered
    }

    pub fn root_margin(&self) -> u32 {
        self.root_margin
    }
}
