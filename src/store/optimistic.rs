//! Speculative changes that are confirmed or reverted once the server answers.

/// Snapshot taken before a speculative change.
///
/// `begin` records the current value and applies the change. The caller then
/// settles it exactly once: `commit` reconciles with the server result,
/// `rollback` restores the snapshot verbatim and `undo` reverts only the
/// speculative part, leaving unrelated changes made in the meantime alone.
#[derive(Debug)]
#[must_use = "an optimistic update must be committed or reverted"]
pub struct Optimistic<T> {
  snapshot: T,
}

impl<T: Clone> Optimistic<T> {
  pub fn begin(target: &mut T, apply: impl FnOnce(&mut T)) -> Self {
    let snapshot = target.clone();
    apply(target);
    Self { snapshot }
  }

  pub fn commit(self, target: &mut T, reconcile: impl FnOnce(&mut T)) {
    reconcile(target);
  }

  pub fn rollback(self, target: &mut T) {
    *target = self.snapshot;
  }

  pub fn undo(self, target: &mut T, revert: impl FnOnce(&mut T)) {
    revert(target);
  }

  /// Value as it was before the change.
  pub fn snapshot(&self) -> &T {
    &self.snapshot
  }
}
