//! Positions that can be shared between model objects, and a follower that
//! keeps one position at a fixed offset from another.

use std::cell::Cell;
use std::rc::Rc;

use glam::DVec2;

/// A shared, resettable position.
///
/// Clones refer to the same underlying value; use [`PositionHandle::detached`]
/// for an independent copy. The engine is single-threaded, so plain
/// `Rc<Cell<_>>` sharing is enough.
#[derive(Debug, Clone)]
pub struct PositionHandle {
    value: Rc<Cell<DVec2>>,
    initial: DVec2,
}

impl PositionHandle {
    /// Create a new handle whose reset value is `initial`.
    pub fn new(initial: DVec2) -> Self {
        Self {
            value: Rc::new(Cell::new(initial)),
            initial,
        }
    }

    /// Current position.
    pub fn get(&self) -> DVec2 {
        self.value.get()
    }

    /// Move to `position`.
    pub fn set(&self, position: DVec2) {
        self.value.set(position);
    }

    /// Return to the initial position.
    pub fn reset(&self) {
        self.value.set(self.initial);
    }

    /// A new handle at the same position and reset value, sharing nothing.
    pub fn detached(&self) -> Self {
        Self {
            value: Rc::new(Cell::new(self.get())),
            initial: self.initial,
        }
    }

    /// Whether two handles share the same storage.
    pub fn same_as(&self, other: &PositionHandle) -> bool {
        Rc::ptr_eq(&self.value, &other.value)
    }
}

/// Keeps a position at a constant offset from a followed target.
///
/// The follower pulls the target position on [`ElementFollower::update`]
/// rather than subscribing to changes.
#[derive(Debug, Clone)]
pub struct ElementFollower {
    follower: PositionHandle,
    target: Option<PositionHandle>,
    offset: DVec2,
}

impl ElementFollower {
    /// A follower that moves `follower` and is not yet following anything.
    pub fn new(follower: PositionHandle) -> Self {
        Self {
            follower,
            target: None,
            offset: DVec2::ZERO,
        }
    }

    /// Begin tracking `target`, dropping any previous target.
    ///
    /// The offset is captured now and held until the next call.
    pub fn start_following(&mut self, target: PositionHandle) {
        self.offset = self.follower.get() - target.get();
        self.target = Some(target);
    }

    /// Stop tracking. No-op if not following.
    pub fn stop_following(&mut self) {
        self.target = None;
    }

    /// Whether a target is attached.
    pub fn is_following(&self) -> bool {
        self.target.is_some()
    }

    /// Whether `handle` is the current target.
    pub fn is_following_handle(&self, handle: &PositionHandle) -> bool {
        self.target.as_ref().is_some_and(|t| t.same_as(handle))
    }

    /// Snap the follower to `target + offset`.
    pub fn update(&self) {
        if let Some(target) = &self.target {
            self.follower.set(target.get() + self.offset);
        }
    }

    /// Reset the follower to its initial position, and the target too if one
    /// is attached.
    ///
    /// Safe to call while not following; only the follower is reset then.
    pub fn reset(&mut self) {
        self.follower.reset();
        if let Some(target) = &self.target {
            target.reset();
        }
    }

    /// Captured offset from the target.
    pub fn offset(&self) -> DVec2 {
        self.offset
    }

    /// The position this follower drives.
    pub fn position(&self) -> &PositionHandle {
        &self.follower
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detached_handle_shares_nothing() {
        let a = PositionHandle::new(DVec2::new(1.0, 1.0));
        a.set(DVec2::new(2.0, 2.0));
        let b = a.detached();
        assert!(!b.same_as(&a));
        assert_eq!(b.get(), DVec2::new(2.0, 2.0));
        b.set(DVec2::new(9.0, 9.0));
        assert_eq!(a.get(), DVec2::new(2.0, 2.0));
        b.reset();
        assert_eq!(b.get(), DVec2::new(1.0, 1.0));
    }

    #[test]
    fn follower_preserves_offset() {
        let follower = PositionHandle::new(DVec2::new(5.0, 5.0));
        let target = PositionHandle::new(DVec2::ZERO);
        let mut f = ElementFollower::new(follower.clone());
        f.start_following(target.clone());
        target.set(DVec2::new(3.0, 0.0));
        f.update();
        assert_eq!(follower.get(), DVec2::new(8.0, 5.0));
    }

    #[test]
    fn start_following_replaces_target() {
        let follower = PositionHandle::new(DVec2::new(1.0, 1.0));
        let a = PositionHandle::new(DVec2::ZERO);
        let b = PositionHandle::new(DVec2::new(10.0, 0.0));
        let mut f = ElementFollower::new(follower.clone());
        f.start_following(a.clone());
        f.start_following(b.clone());
        assert!(f.is_following_handle(&b));
        assert!(!f.is_following_handle(&a));
        assert_eq!(f.offset(), DVec2::new(-9.0, 1.0));

        a.set(DVec2::new(100.0, 100.0));
        f.update();
        assert_eq!(follower.get(), DVec2::new(1.0, 1.0));
    }

    #[test]
    fn stop_following_is_idempotent() {
        let follower = PositionHandle::new(DVec2::ZERO);
        let target = PositionHandle::new(DVec2::ONE);
        let mut f = ElementFollower::new(follower.clone());
        f.stop_following();
        assert!(!f.is_following());
        f.start_following(target.clone());
        f.stop_following();
        f.stop_following();
        assert!(!f.is_following());
        target.set(DVec2::new(4.0, 4.0));
        f.update();
        assert_eq!(follower.get(), DVec2::ZERO);
    }

    #[test]
    fn reset_restores_both_positions() {
        let follower = PositionHandle::new(DVec2::new(2.0, 0.0));
        let target = PositionHandle::new(DVec2::ZERO);
        let mut f = ElementFollower::new(follower.clone());
        f.start_following(target.clone());
        target.set(DVec2::new(7.0, 7.0));
        f.update();
        f.reset();
        assert_eq!(follower.get(), DVec2::new(2.0, 0.0));
        assert_eq!(target.get(), DVec2::ZERO);
    }

    #[test]
    fn reset_without_target_is_safe() {
        let follower = PositionHandle::new(DVec2::new(2.0, 3.0));
        let mut f = ElementFollower::new(follower.clone());
        follower.set(DVec2::new(9.0, 9.0));
        f.reset();
        assert_eq!(follower.get(), DVec2::new(2.0, 3.0));
    }

    #[test]
    fn clones_share_position() {
        let a = PositionHandle::new(DVec2::ZERO);
        let b = a.clone();
        b.set(DVec2::X);
        assert_eq!(a.get(), DVec2::X);
        assert!(a.same_as(&b));
        assert!(!a.same_as(&PositionHandle::new(DVec2::ZERO)));
    }
}
