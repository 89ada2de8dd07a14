//! Persistence gateway: the conflict-aware bridge between the optimistic
//! local canvas state and the remote board store.
//!
//! Race-avoidance rules implemented here:
//! - geometry/content commits funnel through per-category debounce timers;
//! - every write sends the complete window record (the remote has no merge);
//! - a save in flight raises a suppression flag for a bounded grace period
//!   so the write's own watcher echo is not applied as an external change;
//! - a board switch flushes the outgoing board's windows before the incoming
//!   board is fetched.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;

use board_contract::{
    BoardEvent, BoardEventKind, BoardId, CreateWindowRequest, IconPlacement, PointerPosition,
    UploadRequest, WindowId, WindowKind, WindowPosition, WindowRecord, DEFAULT_WINDOW_SIZE,
    DROPPED_WINDOW_SIZE,
};
use platform_remote::{next_monotonic_timestamp_ms, BoardStore, TaskHandle, TaskScheduler};

use crate::naming::{default_window_title, unique_window_title};
use crate::reducer::{CanvasAction, PersistChannel};
use crate::runtime::CanvasRuntime;

/// Debounce applied to drag/resize/content commits.
pub const WINDOW_SAVE_DEBOUNCE_MS: u64 = 300;
/// Reload-suppression grace after a single-window save.
pub const SAVE_SUPPRESSION_MS: u64 = 2_000;
/// Reload-suppression grace after a bulk flush.
pub const FLUSH_SUPPRESSION_MS: u64 = 3_000;
/// Reload-suppression grace covering a board-switch flush.
pub const BOARD_SWITCH_SUPPRESSION_MS: u64 = 500;
/// Interval of the periodic save-everything pass.
pub const PERIODIC_FLUSH_INTERVAL_MS: u64 = 30_000;
/// Delay before the post-rename reload that reconciles remote file renames.
pub const RENAME_RELOAD_DELAY_MS: u64 = 500;
/// Delay before the post-upload reload that picks up converted content.
pub const UPLOAD_RELOAD_DELAY_MS: u64 = 500;

/// Cascade step applied to default creation positions so stacked new windows
/// stay distinguishable.
const CREATE_CASCADE_STEP: i32 = 20;
const CREATE_CASCADE_SLOTS: i32 = 8;
const CREATE_BASE_POSITION: WindowPosition = WindowPosition { x: 100, y: 100 };

#[derive(Default)]
pub(crate) struct DebounceChannel {
    timer: Cell<Option<TaskHandle>>,
    pending: RefCell<Vec<WindowId>>,
}

/// Timer handles and suppression bookkeeping owned by the runtime.
#[derive(Default)]
pub(crate) struct GatewayState {
    suppressed: Cell<bool>,
    suppression_clear: Cell<Option<TaskHandle>>,
    position: DebounceChannel,
    size: DebounceChannel,
    content: DebounceChannel,
    periodic: Cell<Option<TaskHandle>>,
}

impl GatewayState {
    fn channel(&self, channel: PersistChannel) -> &DebounceChannel {
        match channel {
            PersistChannel::Position => &self.position,
            PersistChannel::Size => &self.size,
            PersistChannel::Content => &self.content,
        }
    }
}

impl CanvasRuntime {
    /// Whether a locally triggered save is still inside its suppression
    /// grace period.
    pub fn is_save_suppressed(&self) -> bool {
        self.inner.gateway.suppressed.get()
    }

    /// Routes an inbound watcher notification.
    ///
    /// Events for other boards are ignored; all events are dropped while a
    /// local save is in flight so the write's own echo cannot clobber the
    /// just-written state.
    pub fn handle_event(&self, event: BoardEvent) {
        if self.current_board().as_ref() != Some(&event.board_id) {
            tracing::debug!(board_id = %event.board_id, "ignoring watcher event for inactive board");
            return;
        }
        if self.is_save_suppressed() {
            tracing::warn!(board_id = %event.board_id, "save in flight; ignoring watcher event");
            return;
        }
        match event.kind {
            BoardEventKind::ReloadWindows => self.schedule_reload(0),
            BoardEventKind::WindowDeleted { window_id } => {
                self.dispatch(CanvasAction::RemoveWindow { window_id });
            }
        }
    }

    /// Switches the active board: flushes every window of the outgoing board
    /// (awaited), then fetches and installs the incoming board's windows and
    /// icon placements.
    pub async fn switch_board(&self, board: BoardId) {
        let previous = self.current_board();
        if previous.as_ref() == Some(&board) {
            tracing::debug!(board_id = %board, "board already active; skipping switch");
            return;
        }

        self.cancel_pending_saves();
        if let Some(previous) = previous {
            let records = self.all_records();
            self.save_records(&previous, records, BOARD_SWITCH_SUPPRESSION_MS)
                .await;
        }

        {
            let mut state = self.inner.state.borrow_mut();
            state.reset_for_board(board.clone());
        }
        *self.inner.interaction.borrow_mut() = Default::default();
        self.notify_subscribers();

        self.fetch_and_replace(&board).await;
    }

    /// Re-fetches the active board's windows and placements and replaces the
    /// window store wholesale.
    pub async fn reload_windows(&self) {
        let Some(board) = self.current_board() else {
            tracing::warn!("no active board; skipping reload");
            return;
        };
        self.fetch_and_replace(&board).await;
    }

    /// Creates a window of `kind` with a unique default title at a cascaded
    /// position, inserts the stored record, and focuses it.
    ///
    /// Returns `None` (after logging) when no board is active or the remote
    /// rejects the create; local state is unchanged in that case.
    pub async fn create_window(&self, kind: WindowKind) -> Option<WindowId> {
        let Some(board) = self.current_board() else {
            tracing::warn!("no active board; skipping window create");
            return None;
        };
        let request = self.with_state(|state| {
            let slot = (state.windows.len() as i32) % CREATE_CASCADE_SLOTS;
            CreateWindowRequest {
                kind,
                title: default_window_title(kind, &state.windows),
                content: String::new(),
                position: CREATE_BASE_POSITION
                    .offset(slot * CREATE_CASCADE_STEP, slot * CREATE_CASCADE_STEP),
                size: DEFAULT_WINDOW_SIZE,
            }
        });

        match self.inner.store.create_window(&board, &request).await {
            Ok(record) => {
                let window_id = record.id.clone();
                self.dispatch(CanvasAction::InsertWindow { record });
                Some(window_id)
            }
            Err(error) => {
                tracing::warn!(%error, "window create failed");
                None
            }
        }
    }

    /// Creates a window for a file dropped onto the canvas and uploads its
    /// bytes into it. The window kind and title derive from the file name;
    /// the window lands at the drop position.
    pub async fn create_window_from_file(
        &self,
        file_name: &str,
        data: Vec<u8>,
        drop_position: PointerPosition,
    ) -> Option<WindowId> {
        let Some(board) = self.current_board() else {
            tracing::warn!("no active board; skipping file drop");
            return None;
        };
        let kind = WindowKind::for_file_name(file_name);
        let request = self.with_state(|state| CreateWindowRequest {
            kind,
            title: unique_window_title(
                board_contract::file_base_name(file_name),
                &state.windows,
                None,
            ),
            content: String::new(),
            position: WindowPosition {
                x: drop_position.x,
                y: drop_position.y,
            }
            .clamped_origin(),
            size: DROPPED_WINDOW_SIZE,
        });

        let record = match self.inner.store.create_window(&board, &request).await {
            Ok(record) => record,
            Err(error) => {
                tracing::warn!(%error, file_name, "file-drop window create failed");
                return None;
            }
        };
        let window_id = record.id.clone();
        self.dispatch(CanvasAction::InsertWindow { record });

        self.upload_to_window(
            &window_id,
            UploadRequest {
                file_name: file_name.to_string(),
                data,
            },
        )
        .await;
        Some(window_id)
    }

    /// Uploads a file into an existing window and applies the store-reported
    /// kind/title/content changes, then schedules a reconciliation reload.
    ///
    /// Returns whether the upload was applied.
    pub async fn upload_to_window(&self, window_id: &WindowId, request: UploadRequest) -> bool {
        let Some(board) = self.current_board() else {
            tracing::warn!("no active board; skipping upload");
            return false;
        };
        if self.with_state(|state| state.window(window_id).is_none()) {
            tracing::warn!(window_id = %window_id, "upload target missing locally; skipping");
            return false;
        }

        match self
            .inner
            .store
            .upload_window_file(&board, window_id, &request)
            .await
        {
            Ok(outcome) => {
                self.dispatch(CanvasAction::ApplyUpload {
                    window_id: window_id.clone(),
                    outcome,
                });
                self.schedule_reload(UPLOAD_RELOAD_DELAY_MS);
                true
            }
            Err(error) => {
                tracing::warn!(window_id = %window_id, %error, "upload failed");
                false
            }
        }
    }

    /// Executes the staged destructive action, if any.
    ///
    /// Only this confirmation path issues DELETE requests. On success the
    /// window is removed locally; on failure local state is unchanged.
    pub async fn confirm_pending_delete(&self) -> bool {
        let pending = self.inner.interaction.borrow_mut().pending_delete.take();
        let Some(pending) = pending else {
            return false;
        };
        let Some(board) = self.current_board() else {
            tracing::warn!("no active board; dropping staged delete");
            return false;
        };

        match self
            .inner
            .store
            .delete_window(&board, &pending.window_id, pending.permanent)
            .await
        {
            Ok(()) => {
                self.dispatch(CanvasAction::RemoveWindow {
                    window_id: pending.window_id,
                });
                true
            }
            Err(error) => {
                tracing::warn!(window_id = %pending.window_id, %error, "delete failed; keeping window");
                false
            }
        }
    }

    /// Saves every window of the active board immediately, with the bulk
    /// suppression grace.
    pub async fn flush_all(&self) {
        let Some(board) = self.current_board() else {
            return;
        };
        let records = self.all_records();
        self.save_records(&board, records, FLUSH_SUPPRESSION_MS).await;
    }

    /// Cancels every pending timer and flushes all windows; the canvas is
    /// unusable for remote work afterwards until a new board is switched in.
    pub async fn shutdown(&self) {
        if let Some(handle) = self.inner.gateway.periodic.take() {
            self.inner.scheduler.cancel(handle);
        }
        self.cancel_pending_saves();
        if let Some(handle) = self.inner.gateway.suppression_clear.take() {
            self.inner.scheduler.cancel(handle);
        }
        self.flush_all().await;
    }

    pub(crate) fn schedule_debounced_save(&self, channel: PersistChannel, window_id: WindowId) {
        let slot = self.inner.gateway.channel(channel);
        {
            let mut pending = slot.pending.borrow_mut();
            if !pending.contains(&window_id) {
                pending.push(window_id);
            }
        }
        if let Some(handle) = slot.timer.take() {
            self.inner.scheduler.cancel(handle);
        }
        let runtime = self.clone();
        let handle = self.inner.scheduler.schedule(
            WINDOW_SAVE_DEBOUNCE_MS,
            Box::new(move || {
                Box::pin(async move {
                    runtime.flush_channel(channel).await;
                })
            }),
        );
        slot.timer.set(Some(handle));
    }

    pub(crate) fn schedule_immediate_save(&self, window_id: WindowId) {
        let runtime = self.clone();
        self.inner.scheduler.schedule(
            0,
            Box::new(move || {
                Box::pin(async move {
                    let Some(board) = runtime.current_board() else {
                        tracing::warn!("no active board; dropping window save");
                        return;
                    };
                    let records = runtime.records_for(&[window_id]);
                    runtime
                        .save_records(&board, records, SAVE_SUPPRESSION_MS)
                        .await;
                })
            }),
        );
    }

    pub(crate) fn schedule_placement_save(&self) {
        let runtime = self.clone();
        self.inner.scheduler.schedule(
            0,
            Box::new(move || {
                Box::pin(async move {
                    runtime.save_placements().await;
                })
            }),
        );
    }

    pub(crate) fn schedule_reload(&self, delay_ms: u64) {
        let runtime = self.clone();
        self.inner.scheduler.schedule(
            delay_ms,
            Box::new(move || {
                Box::pin(async move {
                    runtime.reload_windows().await;
                })
            }),
        );
    }

    pub(crate) fn install_periodic_flush(&self) {
        let runtime = self.clone();
        let handle = self.inner.scheduler.schedule(
            PERIODIC_FLUSH_INTERVAL_MS,
            Box::new(move || {
                Box::pin(async move {
                    runtime.flush_all().await;
                    runtime.install_periodic_flush();
                })
            }),
        );
        self.inner.gateway.periodic.set(Some(handle));
    }

    async fn flush_channel(&self, channel: PersistChannel) {
        let slot = self.inner.gateway.channel(channel);
        slot.timer.set(None);
        let pending: Vec<WindowId> = slot.pending.borrow_mut().drain(..).collect();
        if pending.is_empty() {
            return;
        }
        let Some(board) = self.current_board() else {
            tracing::warn!("no active board; dropping debounced saves");
            return;
        };
        let records = self.records_for(&pending);
        self.save_records(&board, records, SAVE_SUPPRESSION_MS).await;
    }

    /// Writes full window records to `board` in order, raising the reload
    /// suppression flag for `grace_ms` past the last successful write.
    async fn save_records(&self, board: &BoardId, records: Vec<WindowRecord>, grace_ms: u64) {
        if records.is_empty() {
            return;
        }
        self.begin_suppression();
        let mut any_ok = false;
        for mut record in records {
            record.updated_at_unix_ms = next_monotonic_timestamp_ms();
            match self.inner.store.update_window(board, &record).await {
                Ok(()) => any_ok = true,
                Err(error) => {
                    tracing::warn!(window_id = %record.id, %error, "window save failed; keeping local state");
                }
            }
        }
        if any_ok {
            self.schedule_suppression_clear(grace_ms);
        } else {
            self.end_suppression();
        }
    }

    async fn save_placements(&self) {
        let Some(board) = self.current_board() else {
            tracing::warn!("no active board; dropping placement save");
            return;
        };
        let placements: HashMap<WindowId, IconPlacement> = self.with_state(|state| {
            state
                .icons
                .iter()
                .map(|icon| {
                    (
                        icon.window_id.clone(),
                        IconPlacement {
                            position: icon.position,
                            grid: icon.grid,
                        },
                    )
                })
                .collect()
        });
        if let Err(error) = self
            .inner
            .store
            .save_icon_placements(&board, &placements)
            .await
        {
            tracing::warn!(%error, "icon placement save failed");
        }
    }

    async fn fetch_and_replace(&self, board: &BoardId) {
        let (windows, placements) = futures::future::join(
            self.inner.store.list_windows(board),
            self.inner.store.icon_placements(board),
        )
        .await;

        let windows = match windows {
            Ok(windows) => windows,
            Err(error) => {
                tracing::warn!(board_id = %board, %error, "window fetch failed; keeping local state");
                return;
            }
        };
        let placements = match placements {
            Ok(placements) => placements,
            Err(error) => {
                tracing::warn!(board_id = %board, %error, "placement fetch failed; using defaults");
                HashMap::new()
            }
        };

        let windows = self.migrate_legacy_references(board, windows).await;

        // A later switch may have changed the active board while the fetch
        // was in flight; stale payloads must not replace the new board.
        if self.current_board().as_ref() != Some(board) {
            tracing::debug!(board_id = %board, "board changed during fetch; dropping stale payload");
            return;
        }
        self.dispatch(CanvasAction::ReplaceAll {
            windows,
            placements,
        });
    }

    /// One-time, best-effort normalization: rewrites relative `/api/` content
    /// references to absolute URLs and persists the fix.
    async fn migrate_legacy_references(
        &self,
        board: &BoardId,
        mut windows: Vec<WindowRecord>,
    ) -> Vec<WindowRecord> {
        for record in &mut windows {
            let Some(absolute) = self.inner.config.absolute_content_url(&record.content) else {
                continue;
            };
            record.content = absolute;
            record.updated_at_unix_ms = next_monotonic_timestamp_ms();
            if let Err(error) = self.inner.store.update_window(board, record).await {
                tracing::warn!(window_id = %record.id, %error, "legacy reference migration failed");
            }
        }
        windows
    }

    fn begin_suppression(&self) {
        self.inner.gateway.suppressed.set(true);
        if let Some(handle) = self.inner.gateway.suppression_clear.take() {
            self.inner.scheduler.cancel(handle);
        }
    }

    fn schedule_suppression_clear(&self, grace_ms: u64) {
        if let Some(handle) = self.inner.gateway.suppression_clear.take() {
            self.inner.scheduler.cancel(handle);
        }
        let runtime = self.clone();
        let handle = self.inner.scheduler.schedule(
            grace_ms,
            Box::new(move || {
                Box::pin(async move {
                    runtime.inner.gateway.suppressed.set(false);
                    runtime.inner.gateway.suppression_clear.set(None);
                })
            }),
        );
        self.inner.gateway.suppression_clear.set(Some(handle));
    }

    fn end_suppression(&self) {
        self.inner.gateway.suppressed.set(false);
        if let Some(handle) = self.inner.gateway.suppression_clear.take() {
            self.inner.scheduler.cancel(handle);
        }
    }

    fn cancel_pending_saves(&self) {
        for channel in [
            PersistChannel::Position,
            PersistChannel::Size,
            PersistChannel::Content,
        ] {
            let slot = self.inner.gateway.channel(channel);
            if let Some(handle) = slot.timer.take() {
                self.inner.scheduler.cancel(handle);
            }
            slot.pending.borrow_mut().clear();
        }
    }

    fn all_records(&self) -> Vec<WindowRecord> {
        self.with_state(|state| state.windows.iter().map(|w| w.record.clone()).collect())
    }

    fn records_for(&self, ids: &[WindowId]) -> Vec<WindowRecord> {
        self.with_state(|state| {
            ids.iter()
                .filter_map(|id| {
                    let record = state.window(id).map(|w| w.record.clone());
                    if record.is_none() {
                        tracing::warn!(window_id = %id, "window missing locally; skipping save");
                    }
                    record
                })
                .collect()
        })
    }
}
