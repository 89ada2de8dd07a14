//! Canvas window-manager core for per-board virtual desktops.
//!
//! The runtime keeps an authoritative in-memory model of the active board's
//! windows and desktop icons, runs the drag/resize/title-edit interaction
//! state machines through a reducer, and reconciles local optimistic state
//! with the remote board store: debounced geometry writes, immediate
//! visibility writes, in-flight-save suppression of external reloads, and a
//! flush-then-fetch board switch.
//!
//! Rendering, upload transport, and board CRUD are collaborator concerns;
//! they reach this crate only through the service traits in
//! `platform_remote`.

pub mod gateway;
pub mod grid;
pub mod model;
pub mod naming;
pub mod reducer;
pub mod runtime;

mod icons;
mod window_manager;

pub use model::{
    CanvasState, CanvasWindow, DesktopIcon, DragSession, IconDragSession, IconThumbnail,
    InteractionState, PendingDelete, ResizeSession, TitleEditSession, Z_ORDER_SEED,
};
pub use reducer::{CanvasAction, PersistChannel, ReducerError, RuntimeEffect};
pub use runtime::{CanvasRuntime, RemoteServices, SubscriptionId};
