//! Focus, z-order, and visibility transitions shared by the reducer.

use board_contract::WindowId;

use crate::model::CanvasState;
use crate::reducer::ReducerError;

/// Focuses `window_id`, restoring it from the tray or taskbar first.
///
/// Returns `true` when the hidden flag changed and the caller must persist
/// the window immediately.
pub(crate) fn focus_window(
    state: &mut CanvasState,
    window_id: &WindowId,
) -> Result<bool, ReducerError> {
    let index = state
        .windows
        .iter()
        .position(|w| w.id() == window_id)
        .ok_or(ReducerError::WindowNotFound)?;

    let mut unhidden = false;
    {
        let window = &mut state.windows[index];
        if window.record.hidden {
            window.record.hidden = false;
            unhidden = true;
        }
        window.minimized = false;
    }

    if !state.windows[index].focused {
        for window in &mut state.windows {
            window.focused = false;
        }
        let z = state.next_z();
        let window = &mut state.windows[index];
        window.focused = true;
        window.z_index = z;
    }

    Ok(unhidden)
}

/// Closes a window to the tray. Returns whether the hidden flag changed.
pub(crate) fn hide_window(
    state: &mut CanvasState,
    window_id: &WindowId,
) -> Result<bool, ReducerError> {
    let window = state
        .window_mut(window_id)
        .ok_or(ReducerError::WindowNotFound)?;
    let changed = !window.record.hidden;
    window.record.hidden = true;
    window.minimized = false;
    window.focused = false;
    Ok(changed)
}

/// Restores a window from the tray. Returns whether the hidden flag changed.
pub(crate) fn show_window(
    state: &mut CanvasState,
    window_id: &WindowId,
) -> Result<bool, ReducerError> {
    let window = state
        .window_mut(window_id)
        .ok_or(ReducerError::WindowNotFound)?;
    let changed = window.record.hidden;
    window.record.hidden = false;
    Ok(changed)
}

/// Minimizes a visible window or restores (and focuses) a minimized one.
///
/// Hidden windows are never minimized; the hidden and minimized sets stay
/// disjoint.
pub(crate) fn toggle_minimize(
    state: &mut CanvasState,
    window_id: &WindowId,
) -> Result<(), ReducerError> {
    let (hidden, minimized) = {
        let window = state
            .window(window_id)
            .ok_or(ReducerError::WindowNotFound)?;
        (window.record.hidden, window.minimized)
    };
    if hidden {
        return Ok(());
    }

    if minimized {
        focus_window(state, window_id)?;
    } else {
        let window = state
            .window_mut(window_id)
            .ok_or(ReducerError::WindowNotFound)?;
        window.minimized = true;
        window.focused = false;
    }
    Ok(())
}
