//! Focus application
//!
//! A focus request often targets a block whose surface has not rendered yet
//! (it was created a moment ago). The applier polls the host with a bounded
//! number of attempts, yielding to the runtime between them, and only places
//! the caret once the surface exists and actually took focus.

use crate::models::{BlockId, FocusRequest};

/// Default number of readiness checks before giving up
pub const DEFAULT_FOCUS_ATTEMPTS: usize = 8;

/// Rendering surface the editor drives
///
/// Implemented by whatever owns the real editable elements (a DOM bridge,
/// a TUI, or a test double).
pub trait SurfaceHost {
    /// Whether the block's editable surface exists
    fn is_mounted(&self, block_id: &BlockId) -> bool;

    /// Give keyboard focus to the block; false if it did not take focus
    fn try_focus(&mut self, block_id: &BlockId) -> bool;

    /// Put a collapsed caret at a character offset of the block's plain text
    fn place_caret(&mut self, block_id: &BlockId, offset: usize);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusOutcome {
    Applied { offset: usize },
    /// The surface never became ready within the attempt budget
    TargetMissing { attempts: usize },
}

#[derive(Debug, Clone, Copy)]
pub struct FocusApplier {
    max_attempts: usize,
}

impl Default for FocusApplier {
    fn default() -> Self {
        Self::new(DEFAULT_FOCUS_ATTEMPTS)
    }
}

impl FocusApplier {
    pub fn new(max_attempts: usize) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
        }
    }

    /// Apply `request` to a block whose plain text is `text_len` characters long
    pub async fn apply<H: SurfaceHost + ?Sized>(
        &self,
        host: &mut H,
        request: &FocusRequest,
        text_len: usize,
    ) -> FocusOutcome {
        let block_id = &request.block_id;

        for attempt in 1..=self.max_attempts {
            if host.is_mounted(block_id) && host.try_focus(block_id) {
                let offset = request.placement.resolve(text_len);
                host.place_caret(block_id, offset);
                if attempt > 1 {
                    tracing::debug!("Focused block {} after {} attempts", block_id, attempt);
                }
                return FocusOutcome::Applied { offset };
            }
            tokio::task::yield_now().await;
        }

        tracing::debug!(
            "Dropping focus request for block {} after {} attempts",
            block_id,
            self.max_attempts
        );
        FocusOutcome::TargetMissing {
            attempts: self.max_attempts,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CaretPlacement;

    /// Surface that mounts after a number of readiness checks
    struct LateSurface {
        mounts_after: usize,
        checks: usize,
        caret: Option<(BlockId, usize)>,
    }

    impl LateSurface {
        fn new(mounts_after: usize) -> Self {
            Self {
                mounts_after,
                checks: 0,
                caret: None,
            }
        }
    }

    impl SurfaceHost for LateSurface {
        fn is_mounted(&self, _block_id: &BlockId) -> bool {
            self.checks >= self.mounts_after
        }

        fn try_focus(&mut self, _block_id: &BlockId) -> bool {
            true
        }

        fn place_caret(&mut self, block_id: &BlockId, offset: usize) {
            self.caret = Some((block_id.clone(), offset));
        }
    }

    #[tokio::test]
    async fn test_applies_immediately_when_mounted() {
        let mut surface = LateSurface::new(0);
        let request = FocusRequest::end(BlockId::new("b1"));

        let outcome = FocusApplier::default().apply(&mut surface, &request, 11).await;

        assert_eq!(outcome, FocusOutcome::Applied { offset: 11 });
        assert_eq!(surface.caret, Some((BlockId::new("b1"), 11)));
    }

    #[tokio::test]
    async fn test_offset_is_clamped_to_text() {
        let mut surface = LateSurface::new(0);
        let request = FocusRequest::new(BlockId::new("b1"), CaretPlacement::Offset(40));

        let outcome = FocusApplier::default().apply(&mut surface, &request, 5).await;
        assert_eq!(outcome, FocusOutcome::Applied { offset: 5 });
    }

    #[tokio::test]
    async fn test_gives_up_after_budget() {
        let mut surface = LateSurface::new(usize::MAX);
        let request = FocusRequest::start(BlockId::new("missing"));

        let outcome = FocusApplier::new(3).apply(&mut surface, &request, 0).await;

        assert_eq!(outcome, FocusOutcome::TargetMissing { attempts: 3 });
        assert!(surface.caret.is_none());
    }

    #[tokio::test]
    async fn test_waits_for_late_mount() {
        // Mounts on the third readiness check
        struct Rendering {
            checks: std::cell::Cell<usize>,
            caret: Option<usize>,
        }

        impl SurfaceHost for Rendering {
            fn is_mounted(&self, _block_id: &BlockId) -> bool {
                let seen = self.checks.get() + 1;
                self.checks.set(seen);
                seen >= 3
            }

            fn try_focus(&mut self, _block_id: &BlockId) -> bool {
                true
            }

            fn place_caret(&mut self, _block_id: &BlockId, offset: usize) {
                self.caret = Some(offset);
            }
        }

        let mut surface = Rendering {
            checks: std::cell::Cell::new(0),
            caret: None,
        };
        let request = FocusRequest::at(BlockId::new("new"), 2);

        let outcome = FocusApplier::new(8).apply(&mut surface, &request, 4).await;

        assert_eq!(outcome, FocusOutcome::Applied { offset: 2 });
        assert_eq!(surface.checks.get(), 3);
        assert_eq!(surface.caret, Some(2));
    }
}
