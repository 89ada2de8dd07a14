//! In-memory canvas state: managed windows, desktop icons, and the ephemeral
//! interaction sessions.

use std::rc::Rc;

use board_contract::{
    BoardId, GridCell, PointerPosition, WindowId, WindowKind, WindowPosition, WindowRecord,
    WindowSize,
};
use platform_remote::{RemoteConfig, ViewportProvider};

use crate::grid::GridAllocator;

/// Base of the session-local z-order counter. Focus assigns strictly
/// increasing values above this seed; the counter resets on board switch.
pub const Z_ORDER_SEED: u32 = 100;

/// A window of the active board together with its session-local render state.
///
/// The persisted part lives in `record` and is what every full-object remote
/// write sends; `z_index`, `minimized`, and `focused` are session-local and
/// never persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct CanvasWindow {
    /// Persisted window record.
    pub record: WindowRecord,
    /// Session-local stacking order; higher renders on top.
    pub z_index: u32,
    /// Session-local minimized flag, disjoint from `record.hidden`.
    pub minimized: bool,
    /// Whether this window currently holds focus.
    pub focused: bool,
}

impl CanvasWindow {
    /// Wraps a freshly loaded or created record with default session state.
    pub fn from_record(record: WindowRecord) -> Self {
        Self {
            record,
            z_index: Z_ORDER_SEED,
            minimized: false,
            focused: false,
        }
    }

    /// The window's identifier.
    pub fn id(&self) -> &WindowId {
        &self.record.id
    }
}

/// Derived presentation value shown on a desktop icon.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IconThumbnail {
    /// Kind glyph for windows without fetchable media.
    Emoji(&'static str),
    /// Fetchable media URL for uploaded image content.
    MediaUrl(String),
}

/// Desktop-icon representation of one window, derived 1:1 by the icon
/// synchronizer.
#[derive(Debug, Clone, PartialEq)]
pub struct DesktopIcon {
    /// Identifier of the backing window.
    pub window_id: WindowId,
    /// Label mirrored from the window title.
    pub title: String,
    /// Content kind mirrored from the window.
    pub kind: WindowKind,
    /// Rendered top-left pixel position, authoritative for display.
    pub position: WindowPosition,
    /// Occupied lattice cell, authoritative for collision avoidance.
    pub grid: GridCell,
    /// Derived thumbnail.
    pub thumbnail: IconThumbnail,
    /// Whether the backing window is closed to the tray.
    pub hidden: bool,
}

/// Authoritative in-memory state of the active board.
pub struct CanvasState {
    pub(crate) board_id: Option<BoardId>,
    /// Windows of the active board, in load/creation order.
    pub windows: Vec<CanvasWindow>,
    /// Desktop icons, one per window.
    pub icons: Vec<DesktopIcon>,
    /// Icon placement lattice occupancy.
    pub grid: GridAllocator,
    pub(crate) media: RemoteConfig,
    pub(crate) max_z: u32,
    pub(crate) icon_fingerprint: Vec<(WindowId, bool)>,
}

impl CanvasState {
    /// Creates empty state over the given viewport and media configuration.
    pub fn new(viewport: Rc<dyn ViewportProvider>, media: RemoteConfig) -> Self {
        Self {
            board_id: None,
            windows: Vec::new(),
            icons: Vec::new(),
            grid: GridAllocator::new(viewport),
            media,
            max_z: Z_ORDER_SEED,
            icon_fingerprint: Vec::new(),
        }
    }

    /// The active board, if one has been loaded.
    pub fn board_id(&self) -> Option<&BoardId> {
        self.board_id.as_ref()
    }

    /// Clears all per-board state and activates `board`.
    pub(crate) fn reset_for_board(&mut self, board: BoardId) {
        self.board_id = Some(board);
        self.windows.clear();
        self.icons.clear();
        self.grid.clear();
        self.max_z = Z_ORDER_SEED;
        self.icon_fingerprint.clear();
    }

    /// Looks up a window by id.
    pub fn window(&self, window_id: &WindowId) -> Option<&CanvasWindow> {
        self.windows.iter().find(|w| w.id() == window_id)
    }

    pub(crate) fn window_mut(&mut self, window_id: &WindowId) -> Option<&mut CanvasWindow> {
        self.windows.iter_mut().find(|w| w.id() == window_id)
    }

    /// Looks up a desktop icon by its window id.
    pub fn icon(&self, window_id: &WindowId) -> Option<&DesktopIcon> {
        self.icons.iter().find(|i| i.window_id == *window_id)
    }

    pub(crate) fn icon_mut(&mut self, window_id: &WindowId) -> Option<&mut DesktopIcon> {
        self.icons.iter_mut().find(|i| i.window_id == *window_id)
    }

    /// Identifier of the focused window, if any.
    pub fn focused_window_id(&self) -> Option<&WindowId> {
        self.windows.iter().find(|w| w.focused).map(CanvasWindow::id)
    }

    /// Current top of the session z-order counter.
    pub fn max_z(&self) -> u32 {
        self.max_z
    }

    pub(crate) fn next_z(&mut self) -> u32 {
        self.max_z += 1;
        self.max_z
    }
}

/// One window-drag gesture, from pointer-down on the header to release.
///
/// `original_position` is captured at session start and never touched again;
/// commit-time change detection compares against it rather than the live
/// position so a drag returned to its start issues no write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DragSession {
    /// Window being dragged.
    pub window_id: WindowId,
    /// Pointer position at pointer-down.
    pub pointer_origin: PointerPosition,
    /// Window position the live deltas are applied to.
    pub origin_position: WindowPosition,
    /// Pre-session position retained for change detection.
    pub original_position: WindowPosition,
    /// Last pointer position observed during the gesture, if any.
    pub last_pointer: Option<PointerPosition>,
}

/// One window-resize gesture from the corner affordance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResizeSession {
    /// Window being resized.
    pub window_id: WindowId,
    /// Pointer position at pointer-down.
    pub pointer_origin: PointerPosition,
    /// Size the live deltas are applied to.
    pub origin_size: WindowSize,
    /// Pre-session size retained for change detection.
    pub original_size: WindowSize,
    /// Last pointer position observed during the gesture, if any.
    pub last_pointer: Option<PointerPosition>,
}

/// One desktop-icon drag gesture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IconDragSession {
    /// Window whose icon is being dragged.
    pub window_id: WindowId,
    /// Pointer position at pointer-down.
    pub pointer_origin: PointerPosition,
    /// Icon pixel position at session start, restored on placement conflict.
    pub origin_position: WindowPosition,
    /// Lattice cell held before the drag.
    pub original_grid: GridCell,
    /// Last pointer position observed during the gesture, if any.
    pub last_pointer: Option<PointerPosition>,
}

/// The single global rename session shared by window titles and icon labels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TitleEditSession {
    /// Window being renamed.
    pub window_id: WindowId,
    /// Current editor value.
    pub value: String,
}

/// A destructive action staged until the user explicitly confirms it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingDelete {
    /// Window to delete.
    pub window_id: WindowId,
    /// Whether the delete bypasses the trash collaborator.
    pub permanent: bool,
}

/// Ephemeral pointer/edit state. None of this is persisted; a board switch
/// or unmount resets it wholesale.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct InteractionState {
    /// Active window drag, if any.
    pub drag: Option<DragSession>,
    /// Active window resize, if any.
    pub resize: Option<ResizeSession>,
    /// Active icon drag, if any.
    pub icon_drag: Option<IconDragSession>,
    /// Active rename session, if any.
    pub title_edit: Option<TitleEditSession>,
    /// Staged destructive action awaiting confirmation, if any.
    pub pending_delete: Option<PendingDelete>,
}
