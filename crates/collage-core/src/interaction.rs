//! Pointer interaction state machine for the freeform canvas.
//!
//! `step` is a pure transition function: it reads the current item stack,
//! view and selection, and returns the next state together with the effects
//! the editor has to apply. No item is mutated here.

use crate::document::ItemStack;
use crate::item::{ItemId, MIN_SIZE};
use crate::snap::{SnapSettings, SnapTargets, snap_rect};
use crate::view::ViewState;
use kurbo::{Line, Point, Rect, Size, Vec2};
use serde::{Deserialize, Serialize};

/// Handle size in screen pixels.
pub const HANDLE_SIZE: f64 = 8.0;
/// Extra hit tolerance around a handle in screen pixels.
pub const HANDLE_HIT_PAD: f64 = 6.0;
/// Arrow-key nudge distance.
pub const NUDGE_STEP: f64 = 1.0;
/// Arrow-key nudge distance with shift held.
pub const NUDGE_STEP_LARGE: f64 = 10.0;

/// Corner positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Corner {
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

/// Edge positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Edge {
    Top,
    Right,
    Bottom,
    Left,
}

/// Type of resize handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HandleKind {
    Corner(Corner),
    Edge(Edge),
}

impl HandleKind {
    /// All eight handles in hit-test order (nw, n, ne, e, se, s, sw, w).
    pub const ALL: [HandleKind; 8] = [
        HandleKind::Corner(Corner::TopLeft),
        HandleKind::Edge(Edge::Top),
        HandleKind::Corner(Corner::TopRight),
        HandleKind::Edge(Edge::Right),
        HandleKind::Corner(Corner::BottomRight),
        HandleKind::Edge(Edge::Bottom),
        HandleKind::Corner(Corner::BottomLeft),
        HandleKind::Edge(Edge::Left),
    ];

    pub fn moves_north(self) -> bool {
        matches!(
            self,
            HandleKind::Edge(Edge::Top) | HandleKind::Corner(Corner::TopLeft | Corner::TopRight)
        )
    }

    pub fn moves_south(self) -> bool {
        matches!(
            self,
            HandleKind::Edge(Edge::Bottom)
                | HandleKind::Corner(Corner::BottomLeft | Corner::BottomRight)
        )
    }

    pub fn moves_west(self) -> bool {
        matches!(
            self,
            HandleKind::Edge(Edge::Left) | HandleKind::Corner(Corner::TopLeft | Corner::BottomLeft)
        )
    }

    pub fn moves_east(self) -> bool {
        matches!(
            self,
            HandleKind::Edge(Edge::Right)
                | HandleKind::Corner(Corner::TopRight | Corner::BottomRight)
        )
    }

    /// Position of this handle on `rect`.
    pub fn position(self, rect: Rect) -> Point {
        let x = if self.moves_west() {
            rect.x0
        } else if self.moves_east() {
            rect.x1
        } else {
            rect.center().x
        };
        let y = if self.moves_north() {
            rect.y0
        } else if self.moves_south() {
            rect.y1
        } else {
            rect.center().y
        };
        Point::new(x, y)
    }
}

/// A resize handle with its position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Handle {
    /// Position in world coordinates.
    pub position: Point,
    pub kind: HandleKind,
}

impl Handle {
    /// Square hit test; `half_extent` is in world units.
    pub fn hit_test(&self, point: Point, half_extent: f64) -> bool {
        (point.x - self.position.x).abs() <= half_extent
            && (point.y - self.position.y).abs() <= half_extent
    }
}

/// The eight resize handles of `rect`.
pub fn handles(rect: Rect) -> [Handle; 8] {
    HandleKind::ALL.map(|kind| Handle {
        position: kind.position(rect),
        kind,
    })
}

/// First handle of `rect` under `point` at zoom `scale`.
pub fn hit_handle(rect: Rect, point: Point, scale: f64) -> Option<HandleKind> {
    let half_extent = (HANDLE_SIZE + HANDLE_HIT_PAD) / scale;
    handles(rect)
        .into_iter()
        .find(|handle| handle.hit_test(point, half_extent))
        .map(|handle| handle.kind)
}

/// Resize `start` by dragging `handle` by `delta`.
///
/// Only the edges named by the handle move. The result is rounded to whole
/// units and never smaller than [`MIN_SIZE`]; when the floor is hit while
/// dragging a north or west edge, the opposite edge stays where it was.
pub fn resize_rect(start: Rect, handle: HandleKind, delta: Vec2) -> Rect {
    let (mut x, mut y) = (start.x0, start.y0);
    let (mut w, mut h) = (start.width(), start.height());

    if handle.moves_east() {
        w = start.width() + delta.x;
    }
    if handle.moves_south() {
        h = start.height() + delta.y;
    }
    if handle.moves_west() {
        x = start.x0 + delta.x;
        w = start.width() - delta.x;
    }
    if handle.moves_north() {
        y = start.y0 + delta.y;
        h = start.height() - delta.y;
    }

    let mut w_out = w.round();
    let mut h_out = h.round();
    let mut x_out = x.round();
    let mut y_out = y.round();
    if w_out < MIN_SIZE || w_out.is_nan() {
        w_out = MIN_SIZE;
        if handle.moves_west() {
            x_out = (start.x1 - MIN_SIZE).round();
        }
    }
    if h_out < MIN_SIZE || h_out.is_nan() {
        h_out = MIN_SIZE;
        if handle.moves_north() {
            y_out = (start.y1 - MIN_SIZE).round();
        }
    }
    Rect::new(x_out, y_out, x_out + w_out, y_out + h_out)
}

/// Keys the canvas reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Key {
    Space,
    Delete,
    Backspace,
    ArrowLeft,
    ArrowRight,
    ArrowUp,
    ArrowDown,
    Other,
}

/// Input delivered to the interaction engine. Positions are in screen pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputEvent {
    PointerDown(Point),
    PointerMove(Point),
    PointerUp,
    Wheel { position: Point, delta_y: f64 },
    KeyDown { key: Key, shift: bool },
    KeyUp(Key),
}

/// Pointer drag state.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum InteractionState {
    #[default]
    Idle,
    /// Dragging the view with the pan modifier held.
    Panning { start_screen: Point, start_offset: Vec2 },
    /// Dragging an item.
    Moving {
        id: ItemId,
        start_world: Point,
        start_position: Point,
    },
    /// Dragging a resize handle.
    Resizing {
        id: ItemId,
        handle: HandleKind,
        start_world: Point,
        start_rect: Rect,
    },
}

/// Drag state plus the pan modifier (space bar).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Interaction {
    pub state: InteractionState,
    pub pan_modifier: bool,
}

impl Interaction {
    pub fn is_dragging(&self) -> bool {
        !matches!(self.state, InteractionState::Idle)
    }
}

/// Changes the editor applies after a transition.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Replace the selection.
    Select(Option<ItemId>),
    /// Replace an item's geometry.
    SetItemRect { id: ItemId, rect: Rect },
    /// Replace the view transform.
    SetView(ViewState),
    /// Replace the alignment guides (empty clears them).
    SetGuides(Vec<Line>),
    /// Delete the selected item.
    DeleteSelected,
}

/// Result of one transition.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Transition {
    pub next: Interaction,
    pub effects: Vec<Effect>,
}

impl Transition {
    fn stay(current: &Interaction) -> Self {
        Self {
            next: *current,
            effects: Vec::new(),
        }
    }
}

/// Read-only editor state the transition function looks at.
#[derive(Debug, Clone, Copy)]
pub struct InteractionContext<'a> {
    pub stack: &'a ItemStack,
    pub view: &'a ViewState,
    pub selection: Option<ItemId>,
    pub canvas: Size,
    pub snap: &'a SnapSettings,
}

impl InteractionContext<'_> {
    /// Snap `rect` of item `id`, returning the corrected rect and guides.
    fn snapped(&self, id: ItemId, rect: Rect) -> (Rect, Vec<Line>) {
        if !self.snap.enabled {
            return (rect, Vec::new());
        }
        let targets = SnapTargets::collect(self.canvas, self.stack, id);
        let tolerance = self.snap.world_tolerance(self.view.scale);
        let result = snap_rect(rect, &targets, tolerance, self.canvas);
        (rect + result.delta, result.guides)
    }
}

/// Advance the interaction by one input event.
pub fn step(current: &Interaction, event: &InputEvent, ctx: &InteractionContext<'_>) -> Transition {
    match *event {
        InputEvent::PointerDown(screen) => pointer_down(current, screen, ctx),
        InputEvent::PointerMove(screen) => pointer_move(current, screen, ctx),
        InputEvent::PointerUp => Transition {
            next: Interaction {
                state: InteractionState::Idle,
                ..*current
            },
            effects: vec![Effect::SetGuides(Vec::new())],
        },
        InputEvent::Wheel { position, delta_y } => {
            let mut view = *ctx.view;
            view.wheel(position, delta_y);
            Transition {
                next: *current,
                effects: vec![Effect::SetView(view)],
            }
        }
        InputEvent::KeyDown { key, shift } => key_down(current, key, shift, ctx),
        InputEvent::KeyUp(Key::Space) => Transition {
            next: Interaction {
                pan_modifier: false,
                ..*current
            },
            effects: Vec::new(),
        },
        InputEvent::KeyUp(_) => Transition::stay(current),
    }
}

fn pointer_down(current: &Interaction, screen: Point, ctx: &InteractionContext<'_>) -> Transition {
    if current.pan_modifier {
        return Transition {
            next: Interaction {
                state: InteractionState::Panning {
                    start_screen: screen,
                    start_offset: ctx.view.offset,
                },
                ..*current
            },
            effects: Vec::new(),
        };
    }

    let world = ctx.view.screen_to_world(screen);

    if let Some(selected) = ctx.selection.and_then(|id| ctx.stack.get(id)) {
        if let Some(handle) = hit_handle(selected.rect(), world, ctx.view.scale) {
            return Transition {
                next: Interaction {
                    state: InteractionState::Resizing {
                        id: selected.id(),
                        handle,
                        start_world: world,
                        start_rect: selected.rect(),
                    },
                    ..*current
                },
                effects: Vec::new(),
            };
        }
    }

    if let Some(id) = ctx.stack.topmost_at(world) {
        let start_position = ctx.stack.get(id).map(|item| item.position).unwrap_or(world);
        return Transition {
            next: Interaction {
                state: InteractionState::Moving {
                    id,
                    start_world: world,
                    start_position,
                },
                ..*current
            },
            effects: vec![Effect::Select(Some(id))],
        };
    }

    Transition {
        next: Interaction {
            state: InteractionState::Idle,
            ..*current
        },
        effects: vec![Effect::Select(None), Effect::SetGuides(Vec::new())],
    }
}

fn pointer_move(current: &Interaction, screen: Point, ctx: &InteractionContext<'_>) -> Transition {
    match current.state {
        InteractionState::Idle => Transition::stay(current),
        InteractionState::Panning {
            start_screen,
            start_offset,
        } => {
            let mut view = *ctx.view;
            view.offset = start_offset + (screen - start_screen);
            Transition {
                next: *current,
                effects: vec![Effect::SetView(view)],
            }
        }
        InteractionState::Moving {
            id,
            start_world,
            start_position,
        } => {
            let Some(item) = ctx.stack.get(id) else {
                return Transition::stay(current);
            };
            let world = ctx.view.screen_to_world(screen);
            let delta = world - start_world;
            let origin = Point::new(
                (start_position.x + delta.x).round(),
                (start_position.y + delta.y).round(),
            );
            let rect = Rect::from_origin_size(origin, item.rect().size());
            let (rect, guides) = ctx.snapped(id, rect);
            Transition {
                next: *current,
                effects: vec![Effect::SetItemRect { id, rect }, Effect::SetGuides(guides)],
            }
        }
        InteractionState::Resizing {
            id,
            handle,
            start_world,
            start_rect,
        } => {
            if !ctx.stack.contains(id) {
                return Transition::stay(current);
            }
            let world = ctx.view.screen_to_world(screen);
            let rect = resize_rect(start_rect, handle, world - start_world);
            let (rect, guides) = ctx.snapped(id, rect);
            Transition {
                next: *current,
                effects: vec![Effect::SetItemRect { id, rect }, Effect::SetGuides(guides)],
            }
        }
    }
}

fn key_down(current: &Interaction, key: Key, shift: bool, ctx: &InteractionContext<'_>) -> Transition {
    if key == Key::Space {
        return Transition {
            next: Interaction {
                pan_modifier: true,
                ..*current
            },
            effects: Vec::new(),
        };
    }

    let Some(item) = ctx.selection.and_then(|id| ctx.stack.get(id)) else {
        return Transition::stay(current);
    };

    let step = if shift { NUDGE_STEP_LARGE } else { NUDGE_STEP };
    let delta = match key {
        Key::Delete | Key::Backspace => {
            return Transition {
                next: *current,
                effects: vec![Effect::DeleteSelected],
            };
        }
        Key::ArrowLeft => Vec2::new(-step, 0.0),
        Key::ArrowRight => Vec2::new(step, 0.0),
        Key::ArrowUp => Vec2::new(0.0, -step),
        Key::ArrowDown => Vec2::new(0.0, step),
        Key::Space | Key::Other => return Transition::stay(current),
    };

    Transition {
        next: *current,
        effects: vec![
            Effect::SetItemRect {
                id: item.id(),
                rect: item.rect() + delta,
            },
            Effect::SetGuides(Vec::new()),
        ],
    }
}
