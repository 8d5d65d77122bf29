use image::RgbaImage;

use crate::mask::MaskStroke;
use crate::scene::EntityId;

/// A stroke lifted out of the live scene by a successful inpaint, together
/// with the stack slot its `Stroke` entry occupied.
#[derive(Clone, Debug)]
pub struct ConsumedStroke {
    pub position: usize,
    pub id: EntityId,
    /// Image space while parked here, so later layout changes do not apply.
    pub stroke: MaskStroke,
}

/// One committed, undoable action.
#[derive(Clone, Debug)]
pub enum HistoryEntry {
    Stroke(EntityId),
    SelectionRegion(u32),
    /// The overlay's paired cover lives inside the overlay entity and goes
    /// with it.
    Overlay(EntityId),
    ImageReplacement {
        previous: RgbaImage,
        previous_dimensions: (u32, u32),
        consumed: Vec<ConsumedStroke>,
    },
}

impl HistoryEntry {
    pub fn description(&self) -> String {
        match self {
            HistoryEntry::Stroke(_) => "Mask stroke".to_string(),
            HistoryEntry::SelectionRegion(id) => format!("Selection #{id}"),
            HistoryEntry::Overlay(_) => "Text overlay".to_string(),
            HistoryEntry::ImageReplacement { previous_dimensions: (w, h), .. } => {
                format!("Inpaint ({w}×{h})")
            }
        }
    }
}

/// Unbounded LIFO undo stack. There is no redo.
#[derive(Debug, Default)]
pub struct History {
    entries: Vec<HistoryEntry>,
}

impl History {
    pub fn push(&mut self, entry: HistoryEntry) {
        log::debug!("history push: {}", entry.description());
        self.entries.push(entry);
    }

    pub fn pop(&mut self) -> Option<HistoryEntry> {
        self.entries.pop()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn peek(&self) -> Option<&HistoryEntry> {
        self.entries.last()
    }

    /// Most recent first.
    pub fn descriptions(&self) -> Vec<String> {
        self.entries.iter().rev().map(HistoryEntry::description).collect()
    }

    /// Remove the `Stroke` entries for `ids`, returning their stack positions
    /// in ascending order.
    pub fn lift_strokes(&mut self, ids: &[EntityId]) -> Vec<(usize, EntityId)> {
        let mut lifted = Vec::new();
        let mut kept = Vec::with_capacity(self.entries.len());
        for (position, entry) in self.entries.drain(..).enumerate() {
            match entry {
                HistoryEntry::Stroke(id) if ids.contains(&id) => lifted.push((position, id)),
                other => kept.push(other),
            }
        }
        self.entries = kept;
        lifted
    }

    /// Drop every `SelectionRegion` entry, for when the regions themselves
    /// were cleared outside of undo.
    pub fn drop_regions(&mut self) -> usize {
        let before = self.entries.len();
        self.entries
            .retain(|e| !matches!(e, HistoryEntry::SelectionRegion(_)));
        before - self.entries.len()
    }

    /// Reinsert `Stroke` entries at the positions recorded by
    /// [`Self::lift_strokes`]. Valid as long as the stack is back to the
    /// state it was in right after lifting.
    pub fn reinstate_strokes(&mut self, consumed: &[ConsumedStroke]) {
        let mut sorted: Vec<&ConsumedStroke> = consumed.iter().collect();
        sorted.sort_by_key(|c| c.position);
        for c in sorted {
            let at = c.position.min(self.entries.len());
            self.entries.insert(at, HistoryEntry::Stroke(c.id));
        }
    }
}
