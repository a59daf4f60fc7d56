//! Scroll-driven behaviour: infinite scroll sentinels and scroll position
//! restoration. Geometry is in abstract content units (pixels in a browser,
//! rows in a terminal).

pub mod restore;
pub mod trigger;

pub use restore::{drive_restore, RestoreState, ScrollRestore, ScrollSurface};
pub use trigger::{InfiniteScroll, ScrollTriggerOptions, SentinelLayout};

/// Vertical extent `[start, end]` of an element in content coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: u32,
    pub end: u32,
}

impl Span {
    pub fn new(start: u32, height: u32) -> Self {
        Self {
            start,
            end: start.saturating_add(height),
        }
    }
}

/// The visible window of a scroll container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    /// Scroll offset of the top edge.
    pub offset: u32,
    pub height: u32,
}

impl Viewport {
    pub fn new(offset: u32, height: u32) -> Self {
        Self { offset, height }
    }

    /// Whether `span` touches this viewport grown by `margin` on both edges.
    pub fn intersects(&self, span: Span, margin: u32) -> bool {
        let top = self.offset.saturating_sub(margin);
        let bottom = self
            .offset
            .saturating_add(self.height)
            .saturating_add(margin);
        span.start <= bottom && span.end >= top
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intersects_with_margin() {
        let vp = Viewport::new(1000, 500);
        assert!(vp.intersects(Span::new(1200, 10), 0));
        assert!(!vp.intersects(Span::new(1650, 1), 100));
        assert!(vp.intersects(Span::new(1650, 1), 200));
        assert!(vp.intersects(Span::new(850, 0), 200));
        assert!(!vp.intersects(Span::new(100, 50), 200));
    }
}
