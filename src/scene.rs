//! Entity arena for everything drawn above the background layer.
//!
//! Entities are keyed by stable ids; rendering walks the maps in id order,
//! which is also creation order.

use std::collections::BTreeMap;

use egui::Rect;

use crate::mask::MaskStroke;
use crate::overlay::TextOverlay;
use crate::selection::{ImageSelection, SelectionRegion};
use crate::transform::BackgroundLayer;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EntityId(pub u64);

#[derive(Debug, Default)]
pub struct Scene {
    next_id: u64,
    /// Selection ids are user-visible (sent to OCR) and never reused.
    next_region_id: u32,
    strokes: BTreeMap<EntityId, MaskStroke>,
    regions: BTreeMap<u32, SelectionRegion>,
    overlays: BTreeMap<EntityId, TextOverlay>,
}

impl Scene {
    fn alloc(&mut self) -> EntityId {
        self.next_id += 1;
        EntityId(self.next_id)
    }

    /// Remove every entity. Id counters keep running.
    pub fn clear(&mut self) {
        self.strokes.clear();
        self.regions.clear();
        self.overlays.clear();
    }

    // -- strokes ----------------------------------------------------------

    pub fn add_stroke(&mut self, stroke: MaskStroke) -> EntityId {
        let id = self.alloc();
        self.strokes.insert(id, stroke);
        id
    }

    /// Put a previously removed stroke back under its old id.
    pub fn restore_stroke(&mut self, id: EntityId, stroke: MaskStroke) {
        self.strokes.insert(id, stroke);
    }

    pub fn remove_stroke(&mut self, id: EntityId) -> Option<MaskStroke> {
        self.strokes.remove(&id)
    }

    pub fn strokes(&self) -> impl Iterator<Item = (EntityId, &MaskStroke)> {
        self.strokes.iter().map(|(id, s)| (*id, s))
    }

    pub fn stroke_ids(&self) -> Vec<EntityId> {
        self.strokes.keys().copied().collect()
    }

    pub fn stroke_count(&self) -> usize {
        self.strokes.len()
    }

    // -- selection regions ------------------------------------------------

    pub fn add_region(&mut self, bounds: Rect) -> u32 {
        self.next_region_id += 1;
        let id = self.next_region_id;
        self.regions.insert(
            id,
            SelectionRegion {
                id,
                bounds,
                highlighted: false,
            },
        );
        id
    }

    pub fn remove_region(&mut self, id: u32) -> Option<SelectionRegion> {
        self.regions.remove(&id)
    }

    pub fn clear_regions(&mut self) {
        self.regions.clear();
    }

    pub fn regions(&self) -> impl Iterator<Item = &SelectionRegion> {
        self.regions.values()
    }

    pub fn region_count(&self) -> usize {
        self.regions.len()
    }

    /// Highlight at most one region; every other region is reset.
    pub fn highlight_region(&mut self, id: Option<u32>) {
        for region in self.regions.values_mut() {
            region.highlighted = Some(region.id) == id;
        }
    }

    pub fn project_regions(&self, layer: &BackgroundLayer) -> Vec<ImageSelection> {
        self.regions
            .values()
            .map(|r| ImageSelection::project(r, layer))
            .collect()
    }

    // -- overlays ---------------------------------------------------------

    pub fn add_overlay(&mut self, overlay: TextOverlay) -> EntityId {
        let id = self.alloc();
        self.overlays.insert(id, overlay);
        id
    }

    pub fn remove_overlay(&mut self, id: EntityId) -> Option<TextOverlay> {
        self.overlays.remove(&id)
    }

    pub fn overlay(&self, id: EntityId) -> Option<&TextOverlay> {
        self.overlays.get(&id)
    }

    pub fn overlay_mut(&mut self, id: EntityId) -> Option<&mut TextOverlay> {
        self.overlays.get_mut(&id)
    }

    pub fn overlays(&self) -> impl Iterator<Item = (EntityId, &TextOverlay)> + Clone {
        self.overlays.iter().map(|(id, o)| (*id, o))
    }

    pub fn overlay_count(&self) -> usize {
        self.overlays.len()
    }

    /// Topmost overlay under `p`, with handles considered only for `active`.
    pub fn overlay_at(
        &self,
        p: egui::Pos2,
        active: Option<EntityId>,
    ) -> Option<(EntityId, crate::overlay::OverlayHit)> {
        self.overlays
            .iter()
            .rev()
            .find_map(|(id, o)| o.hit(p, active == Some(*id)).map(|hit| (*id, hit)))
    }

    // -- layout -----------------------------------------------------------

    /// Move every entity from the placement of `old` to that of `new`.
    pub fn reanchor(&mut self, old: &BackgroundLayer, new: &BackgroundLayer) {
        let ratio = old.length_ratio(new);
        for stroke in self.strokes.values_mut() {
            stroke.map_points(|p| old.reproject(new, p));
            stroke.width *= ratio;
        }
        for region in self.regions.values_mut() {
            region.bounds = Rect::from_two_pos(
                old.reproject(new, region.bounds.min),
                old.reproject(new, region.bounds.max),
            );
        }
        for overlay in self.overlays.values_mut() {
            if let Some(cover) = &mut overlay.cover {
                cover.image_bounds = old.rescale_image_rect(new, cover.image_bounds);
            }
            overlay.reanchor(new);
        }
    }
}
