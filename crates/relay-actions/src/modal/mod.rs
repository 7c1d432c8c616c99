//! Modal stacking.
//!
//! Every modal and backdrop starts with the same flat z-index, so a third
//! dialog can end up behind the second one's backdrop. After each open the
//! newest pair is lifted just above the previous topmost modal:
//!
//! ```text
//! backdrop(new) = z(previous modal) + 1
//! modal(new)    = z(previous modal) + 2
//! ```
//!
//! Only the top pair is touched; the rest of the stack is never re-ranked.

mod layer;

pub use layer::{ModalEntry, ModalId, ModalLayer, ModalPart};

/// Read/write access to the currently visible modal surfaces.
///
/// Both lists are in open order, oldest first.
#[cfg_attr(test, mockall::automock(type Element = u32;))]
pub trait ModalSurface {
    type Element: Clone + std::fmt::Debug;

    fn visible_modals(&self) -> Vec<Self::Element>;

    fn visible_backdrops(&self) -> Vec<Self::Element>;

    /// Current z-index, or `None` when it cannot be read.
    fn z_index(&self, element: &Self::Element) -> Option<i32>;

    fn set_z_index(&mut self, element: &Self::Element, z_index: i32);
}

/// What a modal-open event did to the stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StackCorrection {
    /// Fewer than two modals open.
    Skipped,

    /// The previous modal's z-index could not be read; default layering kept.
    Unreadable,

    /// The newest pair was lifted.
    Raised { backdrop: Option<i32>, modal: i32 },
}

/// Recomputes the z-index of the newest modal and its backdrop.
#[derive(Debug, Clone, Copy, Default)]
pub struct ModalStackManager;

impl ModalStackManager {
    pub fn new() -> Self {
        Self
    }

    /// Call after a modal has been inserted and is the topmost entry.
    ///
    /// The surface is borrowed mutably for the whole correction, so nothing
    /// else can open a modal between the read and the writes.
    pub fn on_modal_opened<S>(&self, surface: &mut S) -> StackCorrection
    where
        S: ModalSurface + ?Sized,
    {
        let modals = surface.visible_modals();
        if modals.len() < 2 {
            return StackCorrection::Skipped;
        }

        let previous = &modals[modals.len() - 2];
        let Some(previous_z) = surface.z_index(previous) else {
            tracing::debug!("Cannot read z-index of {:?}, keeping default layering", previous);
            return StackCorrection::Unreadable;
        };

        let (Some(backdrop_z), Some(modal_z)) = (previous_z.checked_add(1), previous_z.checked_add(2))
        else {
            tracing::warn!("Z-index {} of {:?} leaves no room above it", previous_z, previous);
            return StackCorrection::Unreadable;
        };

        let backdrops = surface.visible_backdrops();
        let backdrop = backdrops.last().map(|el| {
            surface.set_z_index(el, backdrop_z);
            backdrop_z
        });

        if let Some(top) = modals.last() {
            surface.set_z_index(top, modal_z);
        }

        tracing::debug!(
            "Raised modal {} to z={} (backdrop {:?}) above {:?}",
            modals.len(),
            modal_z,
            backdrop,
            previous
        );
        StackCorrection::Raised {
            backdrop,
            modal: modal_z,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockall::predicate::eq;

    #[test]
    fn test_single_modal_never_reads() {
        let mut surface = MockModalSurface::new();
        surface.expect_visible_modals().return_const(vec![1u32]);
        surface.expect_visible_backdrops().never();
        surface.expect_z_index().never();
        surface.expect_set_z_index().never();

        let correction = ModalStackManager::new().on_modal_opened(&mut surface);
        assert_eq!(correction, StackCorrection::Skipped);
    }

    #[test]
    fn test_no_modals() {
        let mut surface = MockModalSurface::new();
        surface.expect_visible_modals().return_const(Vec::<u32>::new());
        surface.expect_z_index().never();

        assert_eq!(
            ModalStackManager::new().on_modal_opened(&mut surface),
            StackCorrection::Skipped
        );
    }

    #[test]
    fn test_raises_top_pair_above_previous() {
        let mut surface = MockModalSurface::new();
        surface.expect_visible_modals().return_const(vec![10u32, 20]);
        surface.expect_visible_backdrops().return_const(vec![11u32, 21]);
        surface
            .expect_z_index()
            .with(eq(10u32))
            .times(1)
            .return_const(Some(1050));
        surface
            .expect_set_z_index()
            .with(eq(21u32), eq(1051))
            .times(1)
            .return_const(());
        surface
            .expect_set_z_index()
            .with(eq(20u32), eq(1052))
            .times(1)
            .return_const(());

        let correction = ModalStackManager::new().on_modal_opened(&mut surface);
        assert_eq!(
            correction,
            StackCorrection::Raised {
                backdrop: Some(1051),
                modal: 1052
            }
        );
    }

    #[test]
    fn test_unreadable_z_index_is_skipped() {
        let mut surface = MockModalSurface::new();
        surface.expect_visible_modals().return_const(vec![1u32, 2]);
        surface.expect_visible_backdrops().return_const(vec![3u32, 4]);
        surface.expect_z_index().return_const(None);
        surface.expect_set_z_index().never();

        assert_eq!(
            ModalStackManager::new().on_modal_opened(&mut surface),
            StackCorrection::Unreadable
        );
    }

    #[test]
    fn test_missing_backdrop_still_raises_modal() {
        let mut surface = MockModalSurface::new();
        surface.expect_visible_modals().return_const(vec![1u32, 2]);
        surface.expect_visible_backdrops().return_const(Vec::<u32>::new());
        surface.expect_z_index().return_const(Some(7));
        surface
            .expect_set_z_index()
            .with(eq(2u32), eq(9))
            .times(1)
            .return_const(());

        assert_eq!(
            ModalStackManager::new().on_modal_opened(&mut surface),
            StackCorrection::Raised {
                backdrop: None,
                modal: 9
            }
        );
    }

    #[test]
    fn test_overflow_is_skipped() {
        let mut surface = MockModalSurface::new();
        surface.expect_visible_modals().return_const(vec![1u32, 2]);
        surface.expect_z_index().return_const(Some(i32::MAX - 1));
        surface.expect_set_z_index().never();

        assert_eq!(
            ModalStackManager::new().on_modal_opened(&mut surface),
            StackCorrection::Unreadable
        );
    }
}
