//! Ordered item stack: items by id plus an explicit z-order.

use crate::item::{CompositableItem, ItemId};
use kurbo::Point;
use std::collections::HashMap;

/// Entry of the layer list shown next to the canvas.
#[derive(Debug, Clone, PartialEq)]
pub struct LayerEntry {
    pub id: ItemId,
    /// Display handle of the item's source, if it still has one.
    pub handle: Option<crate::source::DisplayHandle>,
    /// `"Layer i"`, 1-based from the bottom.
    pub label: String,
    /// `"w×h"` in whole canvas units.
    pub size_label: String,
}

/// Items of the freeform canvas, bottom (index 0) to top.
#[derive(Debug, Clone, Default)]
pub struct ItemStack {
    items: HashMap<ItemId, CompositableItem>,
    z_order: Vec<ItemId>,
}

impl ItemStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an item on top of the stack.
    pub fn push(&mut self, item: CompositableItem) {
        let id = item.id();
        if self.items.insert(id, item).is_none() {
            self.z_order.push(id);
        }
    }

    /// Remove an item.
    pub fn remove(&mut self, id: ItemId) -> Option<CompositableItem> {
        self.z_order.retain(|&item_id| item_id != id);
        self.items.remove(&id)
    }

    /// Remove every item, returning them bottom to top.
    pub fn clear(&mut self) -> Vec<CompositableItem> {
        let order = std::mem::take(&mut self.z_order);
        order
            .into_iter()
            .filter_map(|id| self.items.remove(&id))
            .collect()
    }

    pub fn get(&self, id: ItemId) -> Option<&CompositableItem> {
        self.items.get(&id)
    }

    pub fn get_mut(&mut self, id: ItemId) -> Option<&mut CompositableItem> {
        self.items.get_mut(&id)
    }

    pub fn contains(&self, id: ItemId) -> bool {
        self.items.contains_key(&id)
    }

    /// Items in draw order (bottom first).
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &CompositableItem> {
        self.z_order.iter().filter_map(|id| self.items.get(id))
    }

    /// Item ids in draw order.
    pub fn order(&self) -> &[ItemId] {
        &self.z_order
    }

    pub fn index_of(&self, id: ItemId) -> Option<usize> {
        self.z_order.iter().position(|&item_id| item_id == id)
    }

    pub fn len(&self) -> usize {
        self.z_order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.z_order.is_empty()
    }

    /// Move an item to `to` (clamped to the stack). Returns whether it moved.
    pub fn reorder(&mut self, id: ItemId, to: usize) -> bool {
        let Some(from) = self.index_of(id) else {
            return false;
        };
        let to = to.min(self.z_order.len() - 1);
        if from == to {
            return false;
        }
        let id = self.z_order.remove(from);
        self.z_order.insert(to, id);
        true
    }

    /// Move an item to the top of the stack.
    pub fn bring_to_front(&mut self, id: ItemId) -> bool {
        self.reorder(id, usize::MAX)
    }

    /// Move an item to the bottom of the stack.
    pub fn send_to_back(&mut self, id: ItemId) -> bool {
        self.reorder(id, 0)
    }

    /// Move an item one step up.
    pub fn bring_forward(&mut self, id: ItemId) -> bool {
        if let Some(pos) = self.index_of(id) {
            if pos + 1 < self.z_order.len() {
                self.z_order.swap(pos, pos + 1);
                return true;
            }
        }
        false
    }

    /// Move an item one step down.
    pub fn send_backward(&mut self, id: ItemId) -> bool {
        if let Some(pos) = self.index_of(id) {
            if pos > 0 {
                self.z_order.swap(pos, pos - 1);
                return true;
            }
        }
        false
    }

    /// Topmost item containing `point`.
    pub fn topmost_at(&self, point: Point) -> Option<ItemId> {
        self.iter().rev().find(|item| item.hit_test(point)).map(|item| item.id())
    }

    /// Layer list entries, bottom to top.
    pub fn layer_entries(&self, sources: &crate::source::SourceRegistry) -> Vec<LayerEntry> {
        self.iter()
            .enumerate()
            .map(|(i, item)| LayerEntry {
                id: item.id(),
                handle: sources.get(item.source).and_then(|s| s.handle.clone()),
                label: format!("Layer {}", i + 1),
                size_label: format!("{}×{}", item.width.round(), item.height.round()),
            })
            .collect()
    }
}
