//! Editing sessions: the explicit state object the UI layer drives.
//!
//! [`Editor`] is the freeform canvas (items, view, selection, guides).
//! [`StitchSession`] is the strip/grid stitcher, an ordered image list whose
//! geometry is recomputed by the layout engine on every render.

use crate::document::{ItemStack, LayerEntry};
use crate::error::{CoreError, CoreResult, validate_natural_size};
use crate::interaction::{Effect, InputEvent, Interaction, InteractionContext, step};
use crate::item::{Appearance, CompositableItem, ItemId};
use crate::layout::{Layout, LayoutInput, LayoutMode, OutputBudget, auto_arrange, compute_layout};
use crate::settings::CanvasSettings;
use crate::snap::SnapSettings;
use crate::source::{DisplayHandle, HandleReleaser, ReleasePolicy, SourceId, SourceRegistry};
use crate::view::ViewState;
use crate::watermark::WatermarkConfig;
use kurbo::{Line, Size};

/// Freeform editor state.
#[derive(Debug, Clone)]
pub struct Editor {
    pub items: ItemStack,
    pub sources: SourceRegistry,
    pub view: ViewState,
    pub canvas: CanvasSettings,
    pub snap: SnapSettings,
    pub watermark: WatermarkConfig,
    selection: Option<ItemId>,
    guides: Vec<Line>,
    interaction: Interaction,
    next_item_id: u64,
}

impl Default for Editor {
    fn default() -> Self {
        Self::new(CanvasSettings::default())
    }
}

impl Editor {
    pub fn new(canvas: CanvasSettings) -> Self {
        Self {
            items: ItemStack::new(),
            sources: SourceRegistry::new(ReleasePolicy::OnClear),
            view: ViewState::new(),
            canvas: canvas.sanitized(),
            snap: SnapSettings::default(),
            watermark: WatermarkConfig::default(),
            selection: None,
            guides: Vec::new(),
            interaction: Interaction::default(),
            next_item_id: 1,
        }
    }

    /// Use a different handle release policy. Only valid before any import.
    pub fn with_release_policy(mut self, policy: ReleasePolicy) -> Self {
        if self.sources.is_empty() {
            self.sources = SourceRegistry::new(policy);
        }
        self
    }

    pub fn canvas_size(&self) -> Size {
        self.canvas.size()
    }

    pub fn selection(&self) -> Option<ItemId> {
        self.selection
    }

    pub fn selected_item(&self) -> Option<&CompositableItem> {
        self.selection.and_then(|id| self.items.get(id))
    }

    pub fn guides(&self) -> &[Line] {
        &self.guides
    }

    pub fn interaction(&self) -> &Interaction {
        &self.interaction
    }

    pub fn select(&mut self, id: Option<ItemId>) {
        self.selection = id.filter(|id| self.items.contains(*id));
    }

    fn next_id(&mut self) -> ItemId {
        let id = ItemId(self.next_item_id);
        self.next_item_id += 1;
        id
    }

    /// Import a decoded image: register its source and place a new item on top.
    ///
    /// The new item becomes the selection.
    pub fn import(
        &mut self,
        name: impl Into<String>,
        natural: Size,
        handle: Option<DisplayHandle>,
    ) -> CoreResult<(SourceId, ItemId)> {
        let natural = validate_natural_size(natural.width, natural.height)?;
        let name = name.into();
        let source = self.sources.register(name.clone(), natural, handle);
        let id = self.add_item(source)?;
        log::info!("Imported {} as {} ({}x{})", name, id, natural.width, natural.height);
        Ok((source, id))
    }

    /// Place another item for an already registered source.
    pub fn add_item(&mut self, source: SourceId) -> CoreResult<ItemId> {
        let natural = self
            .sources
            .get(source)
            .map(|s| s.natural)
            .ok_or(CoreError::UnknownSource(source.0))?;
        let id = self.next_id();
        let item = CompositableItem::new(id, source, natural, self.canvas_size());
        self.sources.retain(source);
        self.items.push(item);
        self.selection = Some(id);
        Ok(id)
    }

    /// Duplicate the selection on top of the stack and select the copy.
    pub fn duplicate_selected(&mut self) -> Option<ItemId> {
        let copy = {
            let item = self.selected_item()?.clone();
            item.duplicate(self.next_id())
        };
        let id = copy.id();
        self.sources.retain(copy.source);
        self.items.push(copy);
        self.selection = Some(id);
        Some(id)
    }

    /// Remove one item, releasing its source according to the policy.
    pub fn remove_item(&mut self, id: ItemId, releaser: &mut dyn HandleReleaser) -> bool {
        let Some(item) = self.items.remove(id) else {
            return false;
        };
        self.sources.release_ref(item.source, releaser);
        if self.selection == Some(id) {
            self.selection = None;
        }
        self.guides.clear();
        true
    }

    pub fn delete_selected(&mut self, releaser: &mut dyn HandleReleaser) -> bool {
        match self.selection {
            Some(id) => self.remove_item(id, releaser),
            None => false,
        }
    }

    /// Drop every item and release every display handle exactly once.
    pub fn clear(&mut self, releaser: &mut dyn HandleReleaser) -> Vec<SourceId> {
        let removed = self.items.clear();
        let sources = self.sources.clear(releaser);
        self.selection = None;
        self.guides.clear();
        self.interaction = Interaction::default();
        log::info!("Cleared session ({} items, {} sources)", removed.len(), sources.len());
        sources
    }

    /// Edit the selection's appearance (values are sanitized).
    pub fn set_selected_appearance(&mut self, appearance: Appearance) -> bool {
        let Some(item) = self.selection.and_then(|id| self.items.get_mut(id)) else {
            return false;
        };
        item.set_appearance(appearance);
        true
    }

    /// Move an item to `to` in the stack (layer list drag).
    pub fn reorder_item(&mut self, id: ItemId, to: usize) -> CoreResult<bool> {
        if !self.items.contains(id) {
            return Err(CoreError::UnknownItem(id.0));
        }
        Ok(self.items.reorder(id, to))
    }

    pub fn bring_selected_forward(&mut self) -> bool {
        self.selection.is_some_and(|id| self.items.bring_forward(id))
    }

    pub fn send_selected_backward(&mut self) -> bool {
        self.selection.is_some_and(|id| self.items.send_backward(id))
    }

    pub fn bring_selected_to_front(&mut self) -> bool {
        self.selection.is_some_and(|id| self.items.bring_to_front(id))
    }

    pub fn send_selected_to_back(&mut self) -> bool {
        self.selection.is_some_and(|id| self.items.send_to_back(id))
    }

    pub fn auto_arrange(&mut self) {
        let canvas = self.canvas_size();
        auto_arrange(&mut self.items, canvas);
        self.guides.clear();
    }

    /// Freeform placements: every item keeps its own rectangle, bottom to top.
    pub fn layout(&self) -> Layout {
        let inputs: Vec<LayoutInput> = self
            .items
            .iter()
            .map(|item| LayoutInput {
                natural: item.natural,
                rect: Some(item.rect()),
            })
            .collect();
        compute_layout(
            &LayoutMode::Freeform {
                canvas: self.canvas_size(),
            },
            &inputs,
        )
    }

    pub fn reset_view(&mut self) {
        self.view.reset();
    }

    /// Replace the canvas settings; guides are cleared.
    pub fn set_canvas(&mut self, canvas: CanvasSettings) {
        self.canvas = canvas.sanitized();
        self.guides.clear();
    }

    /// Replace the snap settings; guides are cleared.
    pub fn set_snap(&mut self, snap: SnapSettings) {
        self.snap = snap.sanitized();
        self.guides.clear();
    }

    /// Feed one input event through the interaction state machine.
    pub fn handle_event(&mut self, event: &InputEvent, releaser: &mut dyn HandleReleaser) {
        let transition = {
            let ctx = InteractionContext {
                stack: &self.items,
                view: &self.view,
                selection: self.selection,
                canvas: self.canvas_size(),
                snap: &self.snap,
            };
            step(&self.interaction, event, &ctx)
        };
        self.interaction = transition.next;
        for effect in transition.effects {
            self.apply(effect, releaser);
        }
    }

    fn apply(&mut self, effect: Effect, releaser: &mut dyn HandleReleaser) {
        match effect {
            Effect::Select(id) => self.select(id),
            Effect::SetItemRect { id, rect } => {
                if let Some(item) = self.items.get_mut(id) {
                    item.set_rect(rect);
                }
            }
            Effect::SetView(view) => self.view = view,
            Effect::SetGuides(guides) => self.guides = guides,
            Effect::DeleteSelected => {
                self.delete_selected(releaser);
            }
        }
    }

    /// Layer list entries, bottom to top.
    pub fn layers(&self) -> Vec<LayerEntry> {
        self.items.layer_entries(&self.sources)
    }

    /// `"Canvas: WxHpx | Layers: N | Zoom: S.SS"`.
    pub fn status(&self) -> String {
        format!(
            "Canvas: {}x{}px | Layers: {} | Zoom: {:.2}",
            self.canvas.width,
            self.canvas.height,
            self.items.len(),
            self.view.scale
        )
    }
}

/// One image of a stitch session.
#[derive(Debug, Clone, PartialEq)]
pub struct StitchItem {
    pub source: SourceId,
    pub natural: Size,
}

/// Strip/grid stitcher state.
#[derive(Debug, Clone)]
pub struct StitchSession {
    pub sources: SourceRegistry,
    pub mode: LayoutMode,
    pub budget: OutputBudget,
    pub background: crate::color::SerializableColor,
    pub watermark: WatermarkConfig,
    items: Vec<StitchItem>,
}

impl Default for StitchSession {
    fn default() -> Self {
        Self::new(LayoutMode::default())
    }
}

impl StitchSession {
    pub fn new(mode: LayoutMode) -> Self {
        Self {
            sources: SourceRegistry::new(ReleasePolicy::OnRemove),
            mode,
            budget: OutputBudget::unbounded(),
            background: crate::color::SerializableColor::white(),
            watermark: WatermarkConfig::default(),
            items: Vec::new(),
        }
    }

    pub fn items(&self) -> &[StitchItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Append a decoded image in import order.
    pub fn push(
        &mut self,
        name: impl Into<String>,
        natural: Size,
        handle: Option<DisplayHandle>,
    ) -> CoreResult<SourceId> {
        let natural = validate_natural_size(natural.width, natural.height)?;
        let source = self.sources.register(name, natural, handle);
        self.sources.retain(source);
        self.items.push(StitchItem { source, natural });
        Ok(source)
    }

    /// Move the image at `from` to `to` (remove, then insert).
    pub fn move_item(&mut self, from: usize, to: usize) -> CoreResult<()> {
        let len = self.items.len();
        if from >= len {
            return Err(CoreError::IndexOutOfRange { index: from, len });
        }
        let item = self.items.remove(from);
        self.items.insert(to.min(len - 1), item);
        Ok(())
    }

    /// Remove the image at `index`, releasing its handle.
    pub fn remove(&mut self, index: usize, releaser: &mut dyn HandleReleaser) -> CoreResult<StitchItem> {
        let len = self.items.len();
        if index >= len {
            return Err(CoreError::IndexOutOfRange { index, len });
        }
        let item = self.items.remove(index);
        self.sources.release_ref(item.source, releaser);
        Ok(item)
    }

    /// Remove everything and release every handle once.
    pub fn clear(&mut self, releaser: &mut dyn HandleReleaser) -> Vec<SourceId> {
        self.items.clear();
        self.sources.clear(releaser)
    }

    /// Recompute the layout from the current order and parameters.
    pub fn layout(&self) -> Layout {
        let inputs: Vec<LayoutInput> = self
            .items
            .iter()
            .map(|item| LayoutInput::natural(item.natural))
            .collect();
        compute_layout(&self.mode, &inputs)
    }

    /// Uniform output scale after the budget is applied.
    pub fn output_scale(&self, layout: &Layout) -> f64 {
        self.budget.scale_for(layout.size)
    }

    /// `"Output: WxHpx | Images: N | Scale: S.SS"`.
    pub fn status(&self) -> String {
        let layout = self.layout();
        let (w, h) = self.budget.output_size(layout.size);
        format!(
            "Output: {}x{}px | Images: {} | Scale: {:.2}",
            w,
            h,
            self.items.len(),
            self.output_scale(&layout)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interaction::Key;
    use crate::layout::{ReferencePolicy, StripParams};
    use crate::source::RecordingReleaser;
    use kurbo::Point;

    fn editor_with(n: usize) -> Editor {
        let mut editor = Editor::default();
        for i in 0..n {
            editor
                .import(
                    format!("{i}.png"),
                    Size::new(200.0, 100.0),
                    Some(DisplayHandle::new(format!("blob:{i}"))),
                )
                .unwrap();
        }
        editor
    }

    #[test]
    fn test_import_selects_new_item() {
        let editor = editor_with(2);
        assert_eq!(editor.items.len(), 2);
        assert_eq!(editor.selection(), Some(ItemId(2)));
        assert_eq!(editor.status(), "Canvas: 1200x800px | Layers: 2 | Zoom: 1.00");
    }

    #[test]
    fn test_import_rejects_degenerate() {
        let mut editor = Editor::default();
        assert!(editor.import("bad", Size::new(0.0, 10.0), None).is_err());
        assert!(editor.items.is_empty());
    }

    #[test]
    fn test_duplicate_and_delete() {
        let mut editor = editor_with(1);
        let mut releaser = RecordingReleaser::default();
        let copy = editor.duplicate_selected().unwrap();
        assert_eq!(copy, ItemId(2));
        assert_eq!(editor.items.order(), &[ItemId(1), ItemId(2)]);
        assert!(editor.delete_selected(&mut releaser));
        assert_eq!(editor.selection(), None);
        // freeform release is deferred to clear
        assert!(releaser.released.is_empty());
    }

    #[test]
    fn test_clear_releases_each_handle_once() {
        let mut editor = editor_with(3);
        editor.duplicate_selected();
        let mut releaser = RecordingReleaser::default();
        let removed_item = editor.items.order()[0];
        editor.remove_item(removed_item, &mut releaser);
        editor.clear(&mut releaser);
        assert!(editor.items.is_empty());
        assert_eq!(releaser.released.len(), 3);
        let mut unique = releaser.released.clone();
        unique.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        unique.dedup();
        assert_eq!(unique.len(), 3);
    }

    #[test]
    fn test_release_on_remove_policy() {
        let mut editor = Editor::default().with_release_policy(ReleasePolicy::OnRemove);
        let (_, id) = editor
            .import("a", Size::new(10.0, 10.0), Some(DisplayHandle::new("blob:a")))
            .unwrap();
        let mut releaser = RecordingReleaser::default();
        editor.remove_item(id, &mut releaser);
        assert_eq!(releaser.released, vec![DisplayHandle::new("blob:a")]);
    }

    #[test]
    fn test_handle_event_drag_and_delete_key() {
        let mut editor = editor_with(1);
        let mut releaser = RecordingReleaser::default();
        let start = editor.selected_item().unwrap().rect();
        let grab = start.center();
        editor.handle_event(&InputEvent::PointerDown(grab), &mut releaser);
        assert!(editor.interaction().is_dragging());
        editor.handle_event(&InputEvent::PointerMove(grab + kurbo::Vec2::new(-137.0, 41.0)), &mut releaser);
        let moved = editor.selected_item().unwrap().rect();
        assert_eq!(moved.origin(), Point::new(start.x0 - 137.0, start.y0 + 41.0));
        editor.handle_event(&InputEvent::PointerUp, &mut releaser);
        assert!(editor.guides().is_empty());

        editor.handle_event(
            &InputEvent::KeyDown {
                key: Key::Delete,
                shift: false,
            },
            &mut releaser,
        );
        assert!(editor.items.is_empty());
    }

    #[test]
    fn test_auto_arrange_tiles_and_clears_guides() {
        let mut editor = editor_with(3);
        let mut releaser = RecordingReleaser::default();
        let grab = editor.selected_item().unwrap().rect().center();
        editor.handle_event(&InputEvent::PointerDown(grab), &mut releaser);
        editor.handle_event(&InputEvent::PointerMove(grab + kurbo::Vec2::new(3.0, 0.0)), &mut releaser);
        editor.auto_arrange();
        assert!(editor.guides().is_empty());

        let rects: Vec<_> = editor.items.iter().map(|item| item.rect()).collect();
        for (i, a) in rects.iter().enumerate() {
            assert!(a.x0 >= 0.0 && a.y0 >= 0.0 && a.x1 <= 1200.0 && a.y1 <= 800.0, "{a:?}");
            for b in &rects[i + 1..] {
                assert!(a.intersect(*b).area() == 0.0, "{a:?} overlaps {b:?}");
            }
        }
    }

    #[test]
    fn test_thin_import_survives_a_move() {
        let mut editor = Editor::default();
        let mut releaser = RecordingReleaser::default();
        editor.import("thin", Size::new(10.0, 100.0), None).unwrap();
        let start = editor.selected_item().unwrap().rect();
        assert_eq!(start.size(), Size::new(10.0, 100.0));

        let grab = start.center();
        editor.handle_event(&InputEvent::PointerDown(grab), &mut releaser);
        editor.handle_event(&InputEvent::PointerMove(grab + kurbo::Vec2::new(-200.0, 90.0)), &mut releaser);
        editor.handle_event(&InputEvent::PointerUp, &mut releaser);
        let moved = editor.selected_item().unwrap().rect();
        assert_eq!(moved.size(), Size::new(10.0, 100.0));
        assert_eq!(moved.origin(), start.origin() + kurbo::Vec2::new(-200.0, 90.0));
    }

    #[test]
    fn test_freeform_layout_matches_items() {
        let mut editor = editor_with(2);
        editor.send_selected_to_back();
        let layout = editor.layout();
        assert_eq!(layout.size, Size::new(1200.0, 800.0));
        let rects: Vec<_> = editor.items.iter().map(|item| item.rect()).collect();
        let placed: Vec<_> = layout.placements.iter().map(|p| p.rect).collect();
        assert_eq!(placed, rects);
        assert!(layout.placements.iter().all(|p| p.clip.is_none()));
    }

    #[test]
    fn test_layers_and_z_order() {
        let mut editor = editor_with(2);
        editor.select(Some(ItemId(1)));
        assert!(editor.bring_selected_to_front());
        let layers = editor.layers();
        assert_eq!(layers[1].id, ItemId(1));
        assert_eq!(layers[1].label, "Layer 2");
        assert_eq!(layers[0].handle, Some(DisplayHandle::new("blob:1")));
    }

    #[test]
    fn test_layer_controls() {
        let mut editor = editor_with(3);
        editor.select(Some(ItemId(1)));
        assert!(editor.bring_selected_forward());
        assert_eq!(editor.items.order(), &[ItemId(2), ItemId(1), ItemId(3)]);
        assert!(editor.send_selected_backward());
        assert!(!editor.send_selected_backward());
        assert_eq!(editor.items.order(), &[ItemId(1), ItemId(2), ItemId(3)]);

        assert!(editor.reorder_item(ItemId(3), 0).unwrap());
        assert_eq!(editor.items.order(), &[ItemId(3), ItemId(1), ItemId(2)]);
        assert!(matches!(editor.reorder_item(ItemId(99), 0), Err(CoreError::UnknownItem(99))));
    }

    #[test]
    fn test_selected_appearance_is_sanitized() {
        let mut editor = editor_with(1);
        assert!(editor.set_selected_appearance(Appearance {
            radius: -3.0,
            opacity: 0.0,
            ..Appearance::default()
        }));
        let appearance = editor.selected_item().unwrap().appearance;
        assert_eq!(appearance.radius, 0.0);
        assert_eq!(appearance.opacity, 1.0);

        editor.select(None);
        assert!(!editor.set_selected_appearance(Appearance::default()));
    }

    #[test]
    fn test_settings_and_view_reset() {
        let mut editor = editor_with(1);
        editor.set_canvas(CanvasSettings {
            width: 10.0,
            height: 0.0,
            ..CanvasSettings::default()
        });
        assert_eq!(editor.canvas_size(), Size::new(64.0, 800.0));

        editor.set_snap(SnapSettings {
            enabled: true,
            tolerance: f64::NAN,
        });
        assert_eq!(editor.snap.tolerance, crate::snap::DEFAULT_SNAP_TOLERANCE);

        editor.view.pan(kurbo::Vec2::new(40.0, 40.0));
        editor.view.scale = 2.0;
        editor.reset_view();
        assert_eq!(editor.view.scale, 1.0);
        assert_eq!(editor.view.offset, kurbo::Vec2::ZERO);
        assert_eq!(editor.status(), "Canvas: 64x800px | Layers: 1 | Zoom: 1.00");
    }

    #[test]
    fn test_stitch_session() {
        let mut session = StitchSession::new(LayoutMode::HorizontalStrip(StripParams::seamless(
            ReferencePolicy::First,
        )));
        let mut releaser = RecordingReleaser::default();
        session.push("a", Size::new(100.0, 50.0), Some(DisplayHandle::new("a"))).unwrap();
        session.push("b", Size::new(200.0, 100.0), Some(DisplayHandle::new("b"))).unwrap();
        assert_eq!(session.status(), "Output: 200x50px | Images: 2 | Scale: 1.00");

        // first image now sets the reference height
        session.move_item(1, 0).unwrap();
        assert_eq!(session.items()[0].natural, Size::new(200.0, 100.0));
        assert_eq!(session.layout().size, Size::new(400.0, 100.0));

        session.budget = OutputBudget::new(100.0, 0.0);
        assert_eq!(session.status(), "Output: 100x25px | Images: 2 | Scale: 0.25");

        assert!(session.move_item(5, 0).is_err());
        session.remove(0, &mut releaser).unwrap();
        assert_eq!(releaser.released, vec![DisplayHandle::new("b")]);
        session.clear(&mut releaser);
        assert!(session.is_empty());
        assert_eq!(releaser.released.len(), 2);
    }
}
