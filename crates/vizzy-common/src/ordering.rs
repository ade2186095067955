//! Working copy of an ordered collection (projects in the sidebar, images in
//! a project) under live drag-and-drop.
//!
//! Reordering happens on every drag-enter, not on drop: each hover over a
//! new target moves the dragged item to the target's index and hands back
//! the full sequence. Drop only clears the transient drag state.

use serde::{Deserialize, Serialize};

/// An item with a stable identity and a persisted rank.
pub trait Ordered {
    fn item_id(&self) -> i64;
}

impl Ordered for i64 {
    fn item_id(&self) -> i64 {
        *self
    }
}

/// One element of a reorder batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderEntry {
    pub id: i64,
}

#[derive(Debug, Clone)]
pub struct OrderedList<T> {
    items: Vec<T>,
    dragged: Option<i64>,
    hovered: Option<i64>,
    editing: Option<i64>,
}

impl<T: Ordered> OrderedList<T> {
    pub fn new(items: Vec<T>) -> Self {
        Self {
            items,
            dragged: None,
            hovered: None,
            editing: None,
        }
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn into_items(self) -> Vec<T> {
        self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn position(&self, id: i64) -> Option<usize> {
        self.items.iter().position(|item| item.item_id() == id)
    }

    pub fn dragged(&self) -> Option<i64> {
        self.dragged
    }

    pub fn hovered(&self) -> Option<i64> {
        self.hovered
    }

    pub fn is_dragging(&self) -> bool {
        self.dragged.is_some()
    }

    /// Mark an item as being renamed; it cannot be dragged until cleared.
    pub fn set_editing(&mut self, id: Option<i64>) {
        self.editing = id;
    }

    pub fn is_draggable(&self, id: i64) -> bool {
        self.editing != Some(id) && self.position(id).is_some()
    }

    /// Returns `false` when the item cannot be dragged.
    pub fn drag_start(&mut self, id: i64) -> bool {
        if !self.is_draggable(id) {
            return false;
        }
        self.dragged = Some(id);
        self.hovered = None;
        true
    }

    /// Move the dragged item to `target`'s index. Returns the new sequence
    /// when anything moved.
    pub fn drag_enter(&mut self, target: i64) -> Option<&[T]> {
        let dragged = self.dragged?;
        if dragged == target {
            return None;
        }
        let from = self.position(dragged)?;
        let to = self.position(target)?;
        self.hovered = Some(target);
        let item = self.items.remove(from);
        self.items.insert(to, item);
        Some(&self.items)
    }

    /// End the drag. The current sequence is the new working order.
    pub fn drop_item(&mut self) -> &[T] {
        self.clear_drag();
        &self.items
    }

    /// Drag cancelled or finished outside a target; same effect as a drop.
    pub fn drag_end(&mut self) {
        self.clear_drag();
    }

    /// Discard the working copy, e.g. after a reload or a confirmed sync.
    pub fn replace(&mut self, items: Vec<T>) {
        self.items = items;
        self.clear_drag();
        if let Some(id) = self.editing {
            if self.position(id).is_none() {
                self.editing = None;
            }
        }
    }

    /// Ids in current order: the payload of a reorder commit.
    pub fn ids(&self) -> Vec<i64> {
        self.items.iter().map(Ordered::item_id).collect()
    }

    pub fn entries(&self) -> Vec<OrderEntry> {
        self.items
            .iter()
            .map(|item| OrderEntry { id: item.item_id() })
            .collect()
    }

    fn clear_drag(&mut self) {
        self.dragged = None;
        self.hovered = None;
    }
}

/// Convenience for one complete drag gesture: pick up `id`, hover `target`,
/// drop.
pub fn move_onto<T: Ordered>(list: &mut OrderedList<T>, id: i64, target: i64) -> bool {
    if !list.drag_start(id) {
        return false;
    }
    let moved = list.drag_enter(target).is_some();
    list.drop_item();
    moved
}
