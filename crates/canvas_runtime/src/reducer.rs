//! Reducer actions, side-effect intents, and transition logic for the canvas
//! window manager.
//!
//! Every pointer/keyboard gesture becomes a [`CanvasAction`]; the reducer
//! mutates [`CanvasState`]/[`InteractionState`] synchronously and returns the
//! [`RuntimeEffect`] intents the runtime schedules against the remote store.
//! No persistence happens inside the reducer.

use std::collections::{HashMap, HashSet};

use board_contract::{
    IconPlacement, PointerPosition, UploadOutcome, WindowId, WindowRecord,
};
use thiserror::Error;

use crate::grid::{GridAllocator, ICON_SIZE};
use crate::icons;
use crate::model::{
    CanvasState, CanvasWindow, DragSession, IconDragSession, InteractionState, PendingDelete,
    ResizeSession, TitleEditSession,
};
use crate::naming::unique_window_title;
use crate::window_manager;

#[derive(Debug, Clone, PartialEq)]
/// Actions accepted by [`reduce_canvas`].
pub enum CanvasAction {
    /// Replace the whole window set from a board load or external reload.
    ReplaceAll {
        /// Window records as returned by the remote store.
        windows: Vec<WindowRecord>,
        /// Saved icon placements keyed by window id.
        placements: HashMap<WindowId, IconPlacement>,
    },
    /// Insert (or overwrite) one window returned by a remote create.
    InsertWindow {
        /// Record with its remote-assigned id.
        record: WindowRecord,
    },
    /// Remove a window that no longer exists remotely.
    RemoveWindow {
        /// Window to remove.
        window_id: WindowId,
    },
    /// Focus (and raise) a window, restoring it from tray/taskbar first.
    FocusWindow {
        /// Window to focus.
        window_id: WindowId,
    },
    /// Close a window to the tray.
    CloseWindow {
        /// Window to hide.
        window_id: WindowId,
    },
    /// Restore a tray-hidden window and focus it.
    ShowWindow {
        /// Window to restore.
        window_id: WindowId,
    },
    /// Minimize a visible window or restore a minimized one.
    ToggleMinimize {
        /// Window to toggle.
        window_id: WindowId,
    },
    /// Desktop-icon double click: restore from tray or taskbar, else focus.
    OpenIcon {
        /// Window behind the icon.
        window_id: WindowId,
    },
    /// Replace the inline content of a window.
    SetContent {
        /// Window to update.
        window_id: WindowId,
        /// New inline content.
        content: String,
    },
    /// Apply the kind/title/content changes of a completed upload.
    ApplyUpload {
        /// Window the upload targeted.
        window_id: WindowId,
        /// Store-reported outcome.
        outcome: UploadOutcome,
    },
    /// Begin dragging a window by its header.
    BeginDrag {
        /// Window being dragged.
        window_id: WindowId,
        /// Pointer position at pointer-down.
        pointer: PointerPosition,
    },
    /// Update an in-progress window drag.
    UpdateDrag {
        /// Current pointer position.
        pointer: PointerPosition,
    },
    /// End the active window drag; pointer-leave recovery ends it the same
    /// way.
    EndDrag,
    /// Begin resizing a window from its corner affordance.
    BeginResize {
        /// Window being resized.
        window_id: WindowId,
        /// Pointer position at pointer-down.
        pointer: PointerPosition,
    },
    /// Update an in-progress resize.
    UpdateResize {
        /// Current pointer position.
        pointer: PointerPosition,
    },
    /// End the active resize.
    EndResize,
    /// Begin dragging a desktop icon.
    BeginIconDrag {
        /// Window behind the icon.
        window_id: WindowId,
        /// Pointer position at pointer-down.
        pointer: PointerPosition,
    },
    /// Update an in-progress icon drag.
    UpdateIconDrag {
        /// Current pointer position.
        pointer: PointerPosition,
    },
    /// Drop the dragged icon, snapping it to the lattice.
    EndIconDrag,
    /// Start renaming a window/icon; replaces any rename in progress.
    BeginTitleEdit {
        /// Window to rename.
        window_id: WindowId,
    },
    /// Update the rename editor value.
    UpdateTitleEdit {
        /// Current editor value.
        value: String,
    },
    /// Commit the rename session.
    CommitTitleEdit,
    /// Abandon the rename session.
    CancelTitleEdit,
    /// Stage a delete that must be confirmed before any request is issued.
    RequestDelete {
        /// Window to delete.
        window_id: WindowId,
        /// Whether to bypass the trash collaborator.
        permanent: bool,
    },
    /// Drop the staged delete.
    CancelDelete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
/// Field category of a debounced window write. Each category owns an
/// independent debounce timer.
pub enum PersistChannel {
    /// Position updates from drag commits.
    Position,
    /// Size updates from resize commits.
    Size,
    /// Inline-content updates from the editor.
    Content,
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Side-effect intents emitted by [`reduce_canvas`] for the runtime to
/// execute against the remote store.
pub enum RuntimeEffect {
    /// Persist a window through the debounced channel for `channel`.
    PersistWindow {
        /// Window to save.
        window_id: WindowId,
        /// Debounce category.
        channel: PersistChannel,
    },
    /// Persist a window immediately, bypassing debouncing.
    PersistWindowNow {
        /// Window to save.
        window_id: WindowId,
    },
    /// Persist the current icon placement map.
    PersistPlacements,
    /// Reload the board after a short delay to reconcile remote renames.
    ScheduleReload,
}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
/// Reducer errors for actions referencing state that is not present.
pub enum ReducerError {
    /// The target window id was not found on the active board.
    #[error("window not found")]
    WindowNotFound,
}

/// Applies a [`CanvasAction`] and collects the resulting side effects.
///
/// # Errors
///
/// Returns [`ReducerError::WindowNotFound`] when an action references a
/// window that is not present; callers treat this as a logged no-op.
pub fn reduce_canvas(
    state: &mut CanvasState,
    interaction: &mut InteractionState,
    action: CanvasAction,
) -> Result<Vec<RuntimeEffect>, ReducerError> {
    let mut effects = Vec::new();
    match action {
        CanvasAction::ReplaceAll {
            windows,
            placements,
        } => {
            replace_all(state, windows, placements);
        }
        CanvasAction::InsertWindow { record } => {
            if let Some(existing) = state.window_mut(&record.id) {
                tracing::warn!(window_id = %record.id, "insert of an existing window; overwriting record");
                existing.record = record;
            } else {
                state.windows.push(CanvasWindow::from_record(record.clone()));
                window_manager::focus_window(state, &record.id)?;
            }
        }
        CanvasAction::RemoveWindow { window_id } => {
            let index = state
                .windows
                .iter()
                .position(|w| w.id() == &window_id)
                .ok_or(ReducerError::WindowNotFound)?;
            state.windows.remove(index);
            if let Some(icon_index) = state
                .icons
                .iter()
                .position(|icon| icon.window_id == window_id)
            {
                let cell = state.icons[icon_index].grid;
                state.grid.release(cell);
                state.icons.remove(icon_index);
            }
            clear_sessions_for(interaction, &window_id);
        }
        CanvasAction::FocusWindow { window_id } => {
            if window_manager::focus_window(state, &window_id)? {
                effects.push(RuntimeEffect::PersistWindowNow { window_id });
            }
        }
        CanvasAction::CloseWindow { window_id } => {
            window_manager::hide_window(state, &window_id)?;
            effects.push(RuntimeEffect::PersistWindowNow { window_id });
        }
        CanvasAction::ShowWindow { window_id } => {
            let changed = window_manager::show_window(state, &window_id)?;
            window_manager::focus_window(state, &window_id)?;
            if changed {
                effects.push(RuntimeEffect::PersistWindowNow { window_id });
            }
        }
        CanvasAction::ToggleMinimize { window_id } => {
            window_manager::toggle_minimize(state, &window_id)?;
        }
        CanvasAction::OpenIcon { window_id } => {
            let (hidden, minimized) = {
                let window = state
                    .window(&window_id)
                    .ok_or(ReducerError::WindowNotFound)?;
                (window.record.hidden, window.minimized)
            };
            if hidden {
                window_manager::show_window(state, &window_id)?;
                window_manager::focus_window(state, &window_id)?;
                effects.push(RuntimeEffect::PersistWindowNow { window_id });
            } else if minimized {
                window_manager::toggle_minimize(state, &window_id)?;
            } else {
                window_manager::focus_window(state, &window_id)?;
            }
        }
        CanvasAction::SetContent { window_id, content } => {
            let window = state
                .window_mut(&window_id)
                .ok_or(ReducerError::WindowNotFound)?;
            window.record.content = content;
            effects.push(RuntimeEffect::PersistWindow {
                window_id,
                channel: PersistChannel::Content,
            });
        }
        CanvasAction::ApplyUpload { window_id, outcome } => {
            let unique = unique_window_title(&outcome.title, &state.windows, Some(&window_id));
            let renamed = unique != outcome.title;
            let record = {
                let window = state
                    .window_mut(&window_id)
                    .ok_or(ReducerError::WindowNotFound)?;
                window.record.kind = outcome.kind;
                window.record.title = unique;
                window.record.file_path = outcome.file_path;
                if let Some(content) = outcome.content {
                    window.record.content = content;
                }
                window.record.clone()
            };
            refresh_icon_presentation(state, &record);
            if renamed {
                effects.push(RuntimeEffect::PersistWindowNow { window_id });
            }
        }
        CanvasAction::BeginDrag { window_id, pointer } => {
            let position = state
                .window(&window_id)
                .ok_or(ReducerError::WindowNotFound)?
                .record
                .position;
            // One pointer session at a time: starting a drag tears down any
            // stale drag or resize left by a missed pointer-up.
            interaction.drag = None;
            interaction.resize = None;
            if window_manager::focus_window(state, &window_id)? {
                effects.push(RuntimeEffect::PersistWindowNow {
                    window_id: window_id.clone(),
                });
            }
            interaction.drag = Some(DragSession {
                window_id,
                pointer_origin: pointer,
                origin_position: position,
                original_position: position,
                last_pointer: None,
            });
        }
        CanvasAction::UpdateDrag { pointer } => {
            if let Some(session) = interaction.drag.as_mut() {
                session.last_pointer = Some(pointer);
                let next = session
                    .origin_position
                    .offset(
                        pointer.x - session.pointer_origin.x,
                        pointer.y - session.pointer_origin.y,
                    )
                    .clamped_origin();
                if let Some(window) = state.window_mut(&session.window_id) {
                    window.record.position = next;
                }
            }
        }
        CanvasAction::EndDrag => {
            if let Some(session) = interaction.drag.take() {
                let final_position = match session.last_pointer {
                    Some(last) => session
                        .origin_position
                        .offset(
                            last.x - session.pointer_origin.x,
                            last.y - session.pointer_origin.y,
                        )
                        .clamped_origin(),
                    None => session.original_position,
                };
                if let Some(window) = state.window_mut(&session.window_id) {
                    window.record.position = final_position;
                    if final_position != session.original_position {
                        effects.push(RuntimeEffect::PersistWindow {
                            window_id: session.window_id,
                            channel: PersistChannel::Position,
                        });
                    }
                }
            }
        }
        CanvasAction::BeginResize { window_id, pointer } => {
            let size = state
                .window(&window_id)
                .ok_or(ReducerError::WindowNotFound)?
                .record
                .size;
            interaction.drag = None;
            interaction.resize = None;
            if window_manager::focus_window(state, &window_id)? {
                effects.push(RuntimeEffect::PersistWindowNow {
                    window_id: window_id.clone(),
                });
            }
            interaction.resize = Some(ResizeSession {
                window_id,
                pointer_origin: pointer,
                origin_size: size,
                original_size: size,
                last_pointer: None,
            });
        }
        CanvasAction::UpdateResize { pointer } => {
            if let Some(session) = interaction.resize.as_mut() {
                session.last_pointer = Some(pointer);
                let next = board_contract::WindowSize {
                    width: session.origin_size.width + (pointer.x - session.pointer_origin.x),
                    height: session.origin_size.height + (pointer.y - session.pointer_origin.y),
                }
                .clamped_min();
                if let Some(window) = state.window_mut(&session.window_id) {
                    window.record.size = next;
                }
            }
        }
        CanvasAction::EndResize => {
            if let Some(session) = interaction.resize.take() {
                let final_size = match session.last_pointer {
                    Some(last) => board_contract::WindowSize {
                        width: session.origin_size.width + (last.x - session.pointer_origin.x),
                        height: session.origin_size.height + (last.y - session.pointer_origin.y),
                    }
                    .clamped_min(),
                    None => session.original_size,
                };
                if let Some(window) = state.window_mut(&session.window_id) {
                    window.record.size = final_size;
                    if final_size != session.original_size {
                        effects.push(RuntimeEffect::PersistWindow {
                            window_id: session.window_id,
                            channel: PersistChannel::Size,
                        });
                    }
                }
            }
        }
        CanvasAction::BeginIconDrag { window_id, pointer } => {
            let icon = state
                .icon(&window_id)
                .ok_or(ReducerError::WindowNotFound)?;
            interaction.icon_drag = Some(IconDragSession {
                window_id,
                pointer_origin: pointer,
                origin_position: icon.position,
                original_grid: icon.grid,
                last_pointer: None,
            });
        }
        CanvasAction::UpdateIconDrag { pointer } => {
            if let Some(session) = interaction.icon_drag.as_mut() {
                session.last_pointer = Some(pointer);
                let bounds = state.grid.bounds();
                let raw = session.origin_position.offset(
                    pointer.x - session.pointer_origin.x,
                    pointer.y - session.pointer_origin.y,
                );
                let clamped = board_contract::WindowPosition {
                    x: raw.x.clamp(0, (bounds.width - ICON_SIZE).max(0)),
                    y: raw.y.clamp(0, (bounds.height - ICON_SIZE).max(0)),
                };
                if let Some(icon) = state.icon_mut(&session.window_id) {
                    icon.position = clamped;
                }
            }
        }
        CanvasAction::EndIconDrag => {
            if let Some(session) = interaction.icon_drag.take() {
                if session.last_pointer.is_none() {
                    return Ok(effects);
                }
                let Some(index) = state
                    .icons
                    .iter()
                    .position(|icon| icon.window_id == session.window_id)
                else {
                    return Ok(effects);
                };
                let cell = GridAllocator::pixel_to_cell(state.icons[index].position);
                let same_cell = cell == session.original_grid;
                if state.grid.is_occupied(cell) && !same_cell {
                    // Placement conflict: revert to the pre-drag pixel
                    // position and leave the grid untouched.
                    state.icons[index].position = session.origin_position;
                } else {
                    state.grid.release(session.original_grid);
                    state.grid.claim(cell);
                    state.icons[index].position = GridAllocator::cell_to_pixel(cell);
                    state.icons[index].grid = cell;
                    effects.push(RuntimeEffect::PersistPlacements);
                }
            }
        }
        CanvasAction::BeginTitleEdit { window_id } => {
            let title = state
                .window(&window_id)
                .ok_or(ReducerError::WindowNotFound)?
                .record
                .title
                .clone();
            interaction.title_edit = Some(TitleEditSession {
                window_id,
                value: title,
            });
        }
        CanvasAction::UpdateTitleEdit { value } => {
            if let Some(session) = interaction.title_edit.as_mut() {
                session.value = value;
            }
        }
        CanvasAction::CommitTitleEdit => {
            if let Some(session) = interaction.title_edit.take() {
                let trimmed = session.value.trim().to_string();
                if trimmed.is_empty() {
                    return Ok(effects);
                }
                let Some(current) = state.window(&session.window_id) else {
                    return Ok(effects);
                };
                if current.record.title == trimmed {
                    return Ok(effects);
                }
                let unique =
                    unique_window_title(&trimmed, &state.windows, Some(&session.window_id));
                let record = {
                    let window = state
                        .window_mut(&session.window_id)
                        .ok_or(ReducerError::WindowNotFound)?;
                    window.record.title = unique;
                    window.record.clone()
                };
                refresh_icon_presentation(state, &record);
                effects.push(RuntimeEffect::PersistWindowNow {
                    window_id: session.window_id,
                });
                effects.push(RuntimeEffect::ScheduleReload);
            }
        }
        CanvasAction::CancelTitleEdit => {
            interaction.title_edit = None;
        }
        CanvasAction::RequestDelete {
            window_id,
            permanent,
        } => {
            if state.window(&window_id).is_none() {
                return Err(ReducerError::WindowNotFound);
            }
            interaction.pending_delete = Some(PendingDelete {
                window_id,
                permanent,
            });
        }
        CanvasAction::CancelDelete => {
            interaction.pending_delete = None;
        }
    }

    Ok(effects)
}

/// Replaces the window set wholesale, suppressing duplicate ids and carrying
/// session-local state across for ids that survive.
fn replace_all(
    state: &mut CanvasState,
    windows: Vec<WindowRecord>,
    placements: HashMap<WindowId, IconPlacement>,
) {
    let mut seen: HashSet<WindowId> = HashSet::new();
    let mut deduped = Vec::with_capacity(windows.len());
    for record in windows {
        if !seen.insert(record.id.clone()) {
            tracing::warn!(window_id = %record.id, "dropping duplicate window id from remote payload");
            continue;
        }
        deduped.push(record);
    }

    let carryover: HashMap<WindowId, (u32, bool, bool)> = state
        .windows
        .iter()
        .map(|w| (w.id().clone(), (w.z_index, w.minimized, w.focused)))
        .collect();

    state.windows = deduped
        .into_iter()
        .map(|record| {
            let mut window = CanvasWindow::from_record(record);
            if let Some((z_index, minimized, focused)) = carryover.get(window.id()) {
                window.z_index = *z_index;
                window.minimized = *minimized;
                window.focused = *focused && !window.record.hidden;
            }
            window
        })
        .collect();

    let board = state.board_id.clone();
    let media = state.media.clone();
    state.grid.clear();
    let mut icons = Vec::with_capacity(state.windows.len());
    for window in &state.windows {
        let (position, cell) = match placements.get(window.id()) {
            Some(placement) => {
                state.grid.claim(placement.grid);
                (placement.position, placement.grid)
            }
            None => {
                let cell = state.grid.next_free_cell();
                (GridAllocator::cell_to_pixel(cell), cell)
            }
        };
        icons.push(icons::make_icon(
            window,
            position,
            cell,
            board.as_ref(),
            &media,
        ));
    }
    state.icons = icons;
    state.icon_fingerprint = icons::fingerprint(&state.windows);
}

/// Mirrors a changed record into its icon without waiting for a structural
/// sync pass (the fingerprint does not cover titles or thumbnails).
fn refresh_icon_presentation(state: &mut CanvasState, record: &WindowRecord) {
    let board = state.board_id.clone();
    let media = state.media.clone();
    if let Some(icon) = state.icon_mut(&record.id) {
        icon.title = record.title.clone();
        icon.kind = record.kind;
        icon.thumbnail = icons::thumbnail_for(record, board.as_ref(), &media);
    }
}

fn clear_sessions_for(interaction: &mut InteractionState, window_id: &WindowId) {
    if interaction
        .drag
        .as_ref()
        .is_some_and(|s| &s.window_id == window_id)
    {
        interaction.drag = None;
    }
    if interaction
        .resize
        .as_ref()
        .is_some_and(|s| &s.window_id == window_id)
    {
        interaction.resize = None;
    }
    if interaction
        .icon_drag
        .as_ref()
        .is_some_and(|s| &s.window_id == window_id)
    {
        interaction.icon_drag = None;
    }
    if interaction
        .title_edit
        .as_ref()
        .is_some_and(|s| &s.window_id == window_id)
    {
        interaction.title_edit = None;
    }
    if interaction
        .pending_delete
        .as_ref()
        .is_some_and(|p| &p.window_id == window_id)
    {
        interaction.pending_delete = None;
    }
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use board_contract::{
        BoardId, GridCell, WindowKind, WindowPosition, WindowSize, MIN_WINDOW_HEIGHT,
        MIN_WINDOW_WIDTH,
    };
    use platform_remote::{FixedViewport, RemoteConfig, ViewportBounds};
    use pretty_assertions::assert_eq;

    use super::*;

    fn record(id: &str, title: &str) -> WindowRecord {
        WindowRecord {
            id: WindowId::new(id),
            kind: WindowKind::Text,
            title: title.to_string(),
            content: String::new(),
            file_path: None,
            position: WindowPosition { x: 120, y: 80 },
            size: WindowSize {
                width: 400,
                height: 300,
            },
            hidden: false,
            updated_at_unix_ms: 0,
        }
    }

    fn fixture(records: Vec<WindowRecord>) -> (CanvasState, InteractionState) {
        let viewport = Rc::new(FixedViewport(ViewportBounds {
            width: 820,
            height: 620,
        }));
        let mut state = CanvasState::new(viewport, RemoteConfig::default());
        state.board_id = Some(BoardId::trusted("board-1"));
        let mut interaction = InteractionState::default();
        reduce_canvas(
            &mut state,
            &mut interaction,
            CanvasAction::ReplaceAll {
                windows: records,
                placements: HashMap::new(),
            },
        )
        .expect("seed state");
        (state, interaction)
    }

    fn pointer(x: i32, y: i32) -> PointerPosition {
        PointerPosition { x, y }
    }

    #[test]
    fn drag_updates_position_live_and_commits_one_debounced_write() {
        let (mut state, mut interaction) = fixture(vec![record("window-1", "a")]);
        let id = WindowId::new("window-1");

        reduce_canvas(
            &mut state,
            &mut interaction,
            CanvasAction::BeginDrag {
                window_id: id.clone(),
                pointer: pointer(10, 10),
            },
        )
        .unwrap();
        reduce_canvas(
            &mut state,
            &mut interaction,
            CanvasAction::UpdateDrag {
                pointer: pointer(35, 50),
            },
        )
        .unwrap();

        assert_eq!(
            state.window(&id).unwrap().record.position,
            WindowPosition { x: 145, y: 120 }
        );

        let effects =
            reduce_canvas(&mut state, &mut interaction, CanvasAction::EndDrag).unwrap();
        assert_eq!(
            effects,
            vec![RuntimeEffect::PersistWindow {
                window_id: id,
                channel: PersistChannel::Position,
            }]
        );
        assert_eq!(interaction.drag, None);
    }

    #[test]
    fn drag_clamps_positions_to_the_canvas_origin() {
        let (mut state, mut interaction) = fixture(vec![record("window-1", "a")]);
        let id = WindowId::new("window-1");

        reduce_canvas(
            &mut state,
            &mut interaction,
            CanvasAction::BeginDrag {
                window_id: id.clone(),
                pointer: pointer(0, 0),
            },
        )
        .unwrap();
        reduce_canvas(
            &mut state,
            &mut interaction,
            CanvasAction::UpdateDrag {
                pointer: pointer(-500, -500),
            },
        )
        .unwrap();
        reduce_canvas(&mut state, &mut interaction, CanvasAction::EndDrag).unwrap();

        assert_eq!(
            state.window(&id).unwrap().record.position,
            WindowPosition { x: 0, y: 0 }
        );
    }

    #[test]
    fn a_click_without_movement_issues_no_write() {
        let (mut state, mut interaction) = fixture(vec![record("window-1", "a")]);

        reduce_canvas(
            &mut state,
            &mut interaction,
            CanvasAction::BeginDrag {
                window_id: WindowId::new("window-1"),
                pointer: pointer(10, 10),
            },
        )
        .unwrap();
        let effects =
            reduce_canvas(&mut state, &mut interaction, CanvasAction::EndDrag).unwrap();

        assert_eq!(effects, Vec::new());
        assert_eq!(
            state
                .window(&WindowId::new("window-1"))
                .unwrap()
                .record
                .position,
            WindowPosition { x: 120, y: 80 }
        );
    }

    #[test]
    fn dragging_back_to_the_original_position_issues_no_write() {
        let (mut state, mut interaction) = fixture(vec![record("window-1", "a")]);

        reduce_canvas(
            &mut state,
            &mut interaction,
            CanvasAction::BeginDrag {
                window_id: WindowId::new("window-1"),
                pointer: pointer(10, 10),
            },
        )
        .unwrap();
        reduce_canvas(
            &mut state,
            &mut interaction,
            CanvasAction::UpdateDrag {
                pointer: pointer(60, 60),
            },
        )
        .unwrap();
        reduce_canvas(
            &mut state,
            &mut interaction,
            CanvasAction::UpdateDrag {
                pointer: pointer(10, 10),
            },
        )
        .unwrap();
        let effects =
            reduce_canvas(&mut state, &mut interaction, CanvasAction::EndDrag).unwrap();

        assert_eq!(effects, Vec::new());
    }

    #[test]
    fn starting_a_new_drag_tears_down_a_stale_session() {
        let (mut state, mut interaction) =
            fixture(vec![record("window-1", "a"), record("window-2", "b")]);

        reduce_canvas(
            &mut state,
            &mut interaction,
            CanvasAction::BeginDrag {
                window_id: WindowId::new("window-1"),
                pointer: pointer(10, 10),
            },
        )
        .unwrap();
        reduce_canvas(
            &mut state,
            &mut interaction,
            CanvasAction::BeginDrag {
                window_id: WindowId::new("window-2"),
                pointer: pointer(20, 20),
            },
        )
        .unwrap();

        assert_eq!(
            interaction.drag.as_ref().map(|s| s.window_id.clone()),
            Some(WindowId::new("window-2"))
        );
    }

    #[test]
    fn resize_enforces_the_minimum_size_floor() {
        let (mut state, mut interaction) = fixture(vec![record("window-1", "a")]);
        let id = WindowId::new("window-1");

        reduce_canvas(
            &mut state,
            &mut interaction,
            CanvasAction::BeginResize {
                window_id: id.clone(),
                pointer: pointer(520, 380),
            },
        )
        .unwrap();
        reduce_canvas(
            &mut state,
            &mut interaction,
            CanvasAction::UpdateResize {
                pointer: pointer(0, 0),
            },
        )
        .unwrap();
        let effects =
            reduce_canvas(&mut state, &mut interaction, CanvasAction::EndResize).unwrap();

        let size = state.window(&id).unwrap().record.size;
        assert_eq!(size.width, MIN_WINDOW_WIDTH);
        assert_eq!(size.height, MIN_WINDOW_HEIGHT);
        assert_eq!(
            effects,
            vec![RuntimeEffect::PersistWindow {
                window_id: id,
                channel: PersistChannel::Size,
            }]
        );
    }

    #[test]
    fn close_persists_immediately_and_show_restores_focus() {
        let (mut state, mut interaction) = fixture(vec![record("window-1", "a")]);
        let id = WindowId::new("window-1");

        let effects = reduce_canvas(
            &mut state,
            &mut interaction,
            CanvasAction::CloseWindow {
                window_id: id.clone(),
            },
        )
        .unwrap();
        assert_eq!(
            effects,
            vec![RuntimeEffect::PersistWindowNow {
                window_id: id.clone(),
            }]
        );
        assert!(state.window(&id).unwrap().record.hidden);

        let effects = reduce_canvas(
            &mut state,
            &mut interaction,
            CanvasAction::ShowWindow {
                window_id: id.clone(),
            },
        )
        .unwrap();
        assert_eq!(
            effects,
            vec![RuntimeEffect::PersistWindowNow {
                window_id: id.clone(),
            }]
        );
        let window = state.window(&id).unwrap();
        assert!(!window.record.hidden);
        assert!(window.focused);
    }

    #[test]
    fn icon_drop_on_an_occupied_cell_reverts_and_writes_nothing() {
        let (mut state, mut interaction) =
            fixture(vec![record("window-1", "a"), record("window-2", "b")]);
        let dragged = WindowId::new("window-2");
        let origin = state.icon(&dragged).unwrap().position;
        let occupied_cells = state.grid.occupied_cells();

        // Drag icon 2 onto icon 1's cell at (0,0).
        reduce_canvas(
            &mut state,
            &mut interaction,
            CanvasAction::BeginIconDrag {
                window_id: dragged.clone(),
                pointer: pointer(0, 0),
            },
        )
        .unwrap();
        reduce_canvas(
            &mut state,
            &mut interaction,
            CanvasAction::UpdateIconDrag {
                pointer: pointer(-80, 0),
            },
        )
        .unwrap();
        let effects =
            reduce_canvas(&mut state, &mut interaction, CanvasAction::EndIconDrag).unwrap();

        assert_eq!(effects, Vec::new());
        let icon = state.icon(&dragged).unwrap();
        assert_eq!(icon.position, origin);
        assert_eq!(icon.grid, GridCell { grid_x: 1, grid_y: 0 });
        assert_eq!(state.grid.occupied_cells(), occupied_cells);
    }

    #[test]
    fn icon_drop_on_a_free_cell_snaps_and_persists_placements() {
        let (mut state, mut interaction) = fixture(vec![record("window-1", "a")]);
        let id = WindowId::new("window-1");

        reduce_canvas(
            &mut state,
            &mut interaction,
            CanvasAction::BeginIconDrag {
                window_id: id.clone(),
                pointer: pointer(0, 0),
            },
        )
        .unwrap();
        reduce_canvas(
            &mut state,
            &mut interaction,
            CanvasAction::UpdateIconDrag {
                pointer: pointer(165, 78),
            },
        )
        .unwrap();
        let effects =
            reduce_canvas(&mut state, &mut interaction, CanvasAction::EndIconDrag).unwrap();

        assert_eq!(effects, vec![RuntimeEffect::PersistPlacements]);
        let icon = state.icon(&id).unwrap();
        assert_eq!(icon.grid, GridCell { grid_x: 2, grid_y: 1 });
        assert_eq!(icon.position, WindowPosition { x: 180, y: 100 });
        assert!(!state.grid.is_occupied(GridCell::ORIGIN));
    }

    #[test]
    fn grid_uniqueness_holds_for_at_rest_icons() {
        let (state, _) = fixture(vec![
            record("window-1", "a"),
            record("window-2", "b"),
            record("window-3", "c"),
        ]);
        for (index, a) in state.icons.iter().enumerate() {
            for b in state.icons.iter().skip(index + 1) {
                assert_ne!(a.grid, b.grid, "icons {} and {} overlap", a.title, b.title);
            }
        }
    }

    #[test]
    fn replace_all_drops_duplicate_ids_first_occurrence_wins() {
        let mut duplicate = record("window-1", "impostor");
        duplicate.position = WindowPosition { x: 9, y: 9 };
        let (state, _) = fixture(vec![
            record("window-1", "original"),
            duplicate,
            record("window-2", "b"),
        ]);

        assert_eq!(state.windows.len(), 2);
        assert_eq!(
            state
                .window(&WindowId::new("window-1"))
                .unwrap()
                .record
                .title,
            "original"
        );
        assert_eq!(state.icons.len(), 2);
    }

    #[test]
    fn replace_all_applies_saved_placements_and_allocates_the_rest() {
        let viewport = Rc::new(FixedViewport(ViewportBounds {
            width: 820,
            height: 620,
        }));
        let mut state = CanvasState::new(viewport, RemoteConfig::default());
        state.board_id = Some(BoardId::trusted("board-1"));
        let mut interaction = InteractionState::default();

        let saved_cell = GridCell { grid_x: 4, grid_y: 2 };
        let mut placements = HashMap::new();
        placements.insert(
            WindowId::new("window-1"),
            IconPlacement {
                position: GridAllocator::cell_to_pixel(saved_cell),
                grid: saved_cell,
            },
        );

        reduce_canvas(
            &mut state,
            &mut interaction,
            CanvasAction::ReplaceAll {
                windows: vec![record("window-1", "a"), record("window-2", "b")],
                placements,
            },
        )
        .unwrap();

        assert_eq!(
            state.icon(&WindowId::new("window-1")).unwrap().grid,
            saved_cell
        );
        assert_eq!(
            state.icon(&WindowId::new("window-2")).unwrap().grid,
            GridCell::ORIGIN
        );
    }

    #[test]
    fn commit_title_edit_generates_a_unique_name_and_schedules_reconciliation() {
        let (mut state, mut interaction) =
            fixture(vec![record("window-1", "新建文本"), record("window-2", "b")]);
        let id = WindowId::new("window-2");

        reduce_canvas(
            &mut state,
            &mut interaction,
            CanvasAction::BeginTitleEdit {
                window_id: id.clone(),
            },
        )
        .unwrap();
        reduce_canvas(
            &mut state,
            &mut interaction,
            CanvasAction::UpdateTitleEdit {
                value: "  新建文本  ".to_string(),
            },
        )
        .unwrap();
        let effects =
            reduce_canvas(&mut state, &mut interaction, CanvasAction::CommitTitleEdit).unwrap();

        assert_eq!(
            state.window(&id).unwrap().record.title,
            "新建文本(1)"
        );
        assert_eq!(state.icon(&id).unwrap().title, "新建文本(1)");
        assert_eq!(
            effects,
            vec![
                RuntimeEffect::PersistWindowNow {
                    window_id: id.clone(),
                },
                RuntimeEffect::ScheduleReload,
            ]
        );
        assert_eq!(interaction.title_edit, None);
    }

    #[test]
    fn committing_an_empty_or_unchanged_title_is_a_cancel() {
        let (mut state, mut interaction) = fixture(vec![record("window-1", "笔记")]);
        let id = WindowId::new("window-1");

        reduce_canvas(
            &mut state,
            &mut interaction,
            CanvasAction::BeginTitleEdit {
                window_id: id.clone(),
            },
        )
        .unwrap();
        reduce_canvas(
            &mut state,
            &mut interaction,
            CanvasAction::UpdateTitleEdit {
                value: "   ".to_string(),
            },
        )
        .unwrap();
        let effects =
            reduce_canvas(&mut state, &mut interaction, CanvasAction::CommitTitleEdit).unwrap();
        assert_eq!(effects, Vec::new());
        assert_eq!(state.window(&id).unwrap().record.title, "笔记");

        reduce_canvas(
            &mut state,
            &mut interaction,
            CanvasAction::BeginTitleEdit {
                window_id: id.clone(),
            },
        )
        .unwrap();
        let effects =
            reduce_canvas(&mut state, &mut interaction, CanvasAction::CommitTitleEdit).unwrap();
        assert_eq!(effects, Vec::new());
    }

    #[test]
    fn only_one_rename_session_exists_at_a_time() {
        let (mut state, mut interaction) =
            fixture(vec![record("window-1", "a"), record("window-2", "b")]);

        reduce_canvas(
            &mut state,
            &mut interaction,
            CanvasAction::BeginTitleEdit {
                window_id: WindowId::new("window-1"),
            },
        )
        .unwrap();
        reduce_canvas(
            &mut state,
            &mut interaction,
            CanvasAction::BeginTitleEdit {
                window_id: WindowId::new("window-2"),
            },
        )
        .unwrap();

        assert_eq!(
            interaction.title_edit.as_ref().map(|s| s.window_id.clone()),
            Some(WindowId::new("window-2"))
        );
    }

    #[test]
    fn delete_requests_stage_until_confirmed() {
        let (mut state, mut interaction) = fixture(vec![record("window-1", "a")]);
        let id = WindowId::new("window-1");

        let effects = reduce_canvas(
            &mut state,
            &mut interaction,
            CanvasAction::RequestDelete {
                window_id: id.clone(),
                permanent: true,
            },
        )
        .unwrap();
        assert_eq!(effects, Vec::new());
        assert_eq!(
            interaction.pending_delete,
            Some(PendingDelete {
                window_id: id.clone(),
                permanent: true,
            })
        );
        assert!(state.window(&id).is_some());

        reduce_canvas(&mut state, &mut interaction, CanvasAction::CancelDelete).unwrap();
        assert_eq!(interaction.pending_delete, None);
    }

    #[test]
    fn remove_window_releases_its_grid_cell_and_sessions() {
        let (mut state, mut interaction) = fixture(vec![record("window-1", "a")]);
        let id = WindowId::new("window-1");
        reduce_canvas(
            &mut state,
            &mut interaction,
            CanvasAction::BeginDrag {
                window_id: id.clone(),
                pointer: pointer(0, 0),
            },
        )
        .unwrap();

        reduce_canvas(
            &mut state,
            &mut interaction,
            CanvasAction::RemoveWindow {
                window_id: id.clone(),
            },
        )
        .unwrap();

        assert!(state.window(&id).is_none());
        assert!(state.icon(&id).is_none());
        assert_eq!(state.grid.occupied_cells(), 0);
        assert_eq!(interaction.drag, None);
    }

    #[test]
    fn apply_upload_reclassifies_and_uniquifies_against_other_windows() {
        let (mut state, mut interaction) =
            fixture(vec![record("window-1", "lecture"), record("window-2", "b")]);
        let id = WindowId::new("window-2");

        let effects = reduce_canvas(
            &mut state,
            &mut interaction,
            CanvasAction::ApplyUpload {
                window_id: id.clone(),
                outcome: UploadOutcome {
                    kind: WindowKind::Pdf,
                    title: "lecture".to_string(),
                    file_path: Some("files/lecture.pdf".to_string()),
                    content: Some("/api/boards/board-1/files/serve?path=files/lecture.pdf"
                        .to_string()),
                },
            },
        )
        .unwrap();

        let window = state.window(&id).unwrap();
        assert_eq!(window.record.kind, WindowKind::Pdf);
        assert_eq!(window.record.title, "lecture(1)");
        assert_eq!(
            effects,
            vec![RuntimeEffect::PersistWindowNow { window_id: id }]
        );
    }

    #[test]
    fn actions_on_unknown_windows_are_rejected() {
        let (mut state, mut interaction) = fixture(vec![]);
        let err = reduce_canvas(
            &mut state,
            &mut interaction,
            CanvasAction::FocusWindow {
                window_id: WindowId::new("window-9"),
            },
        )
        .unwrap_err();
        assert_eq!(err, ReducerError::WindowNotFound);
    }
}
