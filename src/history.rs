// ============================================================================
// CHANGE RECORDS — what painters hand to the external undo stack
// ============================================================================
//
// Painters never manage undo themselves. They produce either a fine-grained
// `PixelChangeResult` (strokes, fills) or a coarse `SnapshotDiff` (gradient
// fill), and the host's history stack stores them behind `HistoryItem`.

use crate::error::{PaintError, SurfaceError};
use crate::surface::{PixelSurface, SurfaceId};

// ============================================================================
// HISTORY ITEM TRAIT
// ============================================================================

/// Trait for undoable/redoable change records.
pub trait HistoryItem {
    fn undo(&self, surface: &mut PixelSurface) -> Result<(), PaintError>;
    fn redo(&self, surface: &mut PixelSurface) -> Result<(), PaintError>;
    fn description(&self) -> &str;
    fn memory_size(&self) -> usize;
}

fn check_target(expected: SurfaceId, surface: &PixelSurface) -> Result<(), PaintError> {
    if surface.id() != expected {
        return Err(PaintError::SurfaceMismatch {
            expected,
            actual: surface.id(),
        });
    }
    Ok(())
}

// ============================================================================
// PIXEL CHANGES
// ============================================================================

/// One pixel's before/after values at a byte index.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PixelChange {
    pub byte_index: usize,
    pub before: u32,
    pub after: u32,
}

impl PixelChange {
    pub fn new(byte_index: usize, before: u32, after: u32) -> Self {
        Self {
            byte_index,
            before,
            after,
        }
    }
}

pub const DEFAULT_DESCRIPTION: &str = "Brush Stroke";

/// Ordered, append-only list of pixel changes against one surface.
///
/// No-op changes are dropped at [`add`](Self::add); repeated indices are kept,
/// since overlapping passes legitimately touch the same pixel more than once.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PixelChangeResult {
    target: SurfaceId,
    changes: Vec<PixelChange>,
    description: String,
}

impl PixelChangeResult {
    pub fn new(target: SurfaceId) -> Self {
        Self::with_description(target, DEFAULT_DESCRIPTION)
    }

    pub fn with_description(target: SurfaceId, description: impl Into<String>) -> Self {
        Self {
            target,
            changes: Vec::new(),
            description: description.into(),
        }
    }

    pub fn target(&self) -> SurfaceId {
        self.target
    }

    pub fn set_description(&mut self, description: impl Into<String>) {
        self.description = description.into();
    }

    /// Append a change unless `before == after`.
    #[inline]
    pub fn add(&mut self, byte_index: usize, before: u32, after: u32) {
        if before != after {
            self.changes.push(PixelChange::new(byte_index, before, after));
        }
    }

    pub fn changes(&self) -> &[PixelChange] {
        &self.changes
    }

    pub fn has_changes(&self) -> bool {
        !self.changes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.changes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    fn check_fits(&self, surface: &PixelSurface) -> Result<(), PaintError> {
        check_target(self.target, surface)?;
        let len = surface.pixels().len();
        if let Some(c) = self.changes.iter().find(|c| c.byte_index + 4 > len) {
            return Err(SurfaceError::SizeMismatch {
                expected: c.byte_index + 4,
                actual: len,
            }
            .into());
        }
        Ok(())
    }

    /// Restore `before` values, newest change first.
    pub fn revert(&self, surface: &mut PixelSurface) -> Result<(), PaintError> {
        self.check_fits(surface)?;
        for change in self.changes.iter().rev() {
            surface.write_at(change.byte_index, change.before);
        }
        surface.notify_changed();
        Ok(())
    }

    /// Re-apply `after` values in recorded order.
    pub fn reapply(&self, surface: &mut PixelSurface) -> Result<(), PaintError> {
        self.check_fits(surface)?;
        for change in &self.changes {
            surface.write_at(change.byte_index, change.after);
        }
        surface.notify_changed();
        Ok(())
    }
}

impl HistoryItem for PixelChangeResult {
    fn undo(&self, surface: &mut PixelSurface) -> Result<(), PaintError> {
        self.revert(surface)
    }

    fn redo(&self, surface: &mut PixelSurface) -> Result<(), PaintError> {
        self.reapply(surface)
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn memory_size(&self) -> usize {
        self.changes.len() * std::mem::size_of::<PixelChange>() + self.description.len()
    }
}

// ============================================================================
// SNAPSHOT DIFF — full-buffer before/after for whole-canvas operations
// ============================================================================

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SnapshotDiff {
    target: SurfaceId,
    before: Vec<u8>,
    after: Vec<u8>,
    description: String,
}

impl SnapshotDiff {
    pub fn new(
        target: SurfaceId,
        before: Vec<u8>,
        after: Vec<u8>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            target,
            before,
            after,
            description: description.into(),
        }
    }

    pub fn target(&self) -> SurfaceId {
        self.target
    }

    pub fn before(&self) -> &[u8] {
        &self.before
    }

    pub fn after(&self) -> &[u8] {
        &self.after
    }

    pub fn has_changes(&self) -> bool {
        self.before != self.after
    }

    fn restore(&self, surface: &mut PixelSurface, bytes: &[u8]) -> Result<(), PaintError> {
        check_target(self.target, surface)?;
        let dst = surface.pixels_mut();
        if dst.len() != bytes.len() {
            return Err(SurfaceError::SizeMismatch {
                expected: dst.len(),
                actual: bytes.len(),
            }
            .into());
        }
        dst.copy_from_slice(bytes);
        surface.notify_changed();
        Ok(())
    }
}

impl HistoryItem for SnapshotDiff {
    fn undo(&self, surface: &mut PixelSurface) -> Result<(), PaintError> {
        self.restore(surface, &self.before)
    }

    fn redo(&self, surface: &mut PixelSurface) -> Result<(), PaintError> {
        self.restore(surface, &self.after)
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn memory_size(&self) -> usize {
        self.before.len() + self.after.len() + self.description.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_filters_no_op_changes() {
        let s = PixelSurface::new(1, 1).unwrap();
        let mut r = PixelChangeResult::new(s.id());
        r.add(0, 0xFF00_0000, 0xFF00_0000);
        assert!(!r.has_changes());

        r.add(0, 0xFF00_0000, 0xFFFF_0000);
        assert_eq!(r.changes(), &[PixelChange::new(0, 0xFF00_0000, 0xFFFF_0000)]);
        assert_eq!(r.description(), "Brush Stroke");
    }

    #[test]
    fn test_duplicate_indices_are_kept() {
        let s = PixelSurface::new(1, 1).unwrap();
        let mut r = PixelChangeResult::new(s.id());
        r.add(0, 1, 2);
        r.add(0, 2, 3);
        assert_eq!(r.len(), 2);
    }

    #[test]
    fn test_revert_and_reapply() {
        let mut s = PixelSurface::new(2, 1).unwrap();
        let mut r = PixelChangeResult::with_description(s.id(), "Test");
        // Two passes over pixel 0, one over pixel 1.
        r.add(0, 0, 0x1111_1111);
        r.add(0, 0x1111_1111, 0x2222_2222);
        r.add(4, 0, 0x3333_3333);
        r.reapply(&mut s).unwrap();
        assert_eq!(s.read_bgra(0, 0), 0x2222_2222);
        assert_eq!(s.read_bgra(1, 0), 0x3333_3333);

        r.undo(&mut s).unwrap();
        assert!(s.pixels().iter().all(|&b| b == 0));
    }

    #[test]
    fn test_replay_against_other_surface_fails() {
        let a = PixelSurface::new(1, 1).unwrap();
        let mut b = PixelSurface::new(1, 1).unwrap();
        let mut r = PixelChangeResult::new(a.id());
        r.add(0, 0, 1);
        assert!(matches!(
            r.reapply(&mut b),
            Err(PaintError::SurfaceMismatch { .. })
        ));
        assert_eq!(b.read_bgra(0, 0), 0);
    }

    #[test]
    fn test_snapshot_diff_round_trip() {
        let mut s = PixelSurface::new(1, 1).unwrap();
        let before = s.snapshot();
        s.write_bgra(0, 0, 0xFFFF_FFFF);
        let diff = SnapshotDiff::new(s.id(), before, s.snapshot(), "Gradient");
        assert!(diff.has_changes());
        diff.undo(&mut s).unwrap();
        assert_eq!(s.read_bgra(0, 0), 0);
        diff.redo(&mut s).unwrap();
        assert_eq!(s.read_bgra(0, 0), 0xFFFF_FFFF);
        assert_eq!(diff.memory_size(), 8 + "Gradient".len());
    }
}
