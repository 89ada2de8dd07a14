//! Remote board-store contract and baseline adapters.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use board_contract::{
    file_base_name, BoardId, CreateWindowRequest, IconPlacement, UploadOutcome, UploadRequest,
    WindowId, WindowKind, WindowRecord,
};
use futures::future::LocalBoxFuture;
use thiserror::Error;

use crate::time::next_monotonic_timestamp_ms;

/// Errors surfaced by remote store operations.
///
/// Failures never crash the canvas: callers log them and keep the optimistic
/// local state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// The remote rejected the request with an HTTP-style status.
    #[error("remote request failed with status {status}")]
    Status {
        /// Status code returned by the remote.
        status: u16,
    },
    /// The request never completed (connection refused, aborted, timeout).
    #[error("remote transport error: {0}")]
    Transport(String),
    /// The response arrived but could not be decoded.
    #[error("remote payload decode error: {0}")]
    Decode(String),
}

/// Object-safe boxed future used by [`BoardStore`] methods.
pub type BoardStoreFuture<'a, T> = LocalBoxFuture<'a, Result<T, StoreError>>;

/// Remote persistence service for board windows and icon placements.
///
/// Updates are full-object overwrites; the remote store has no merge logic.
pub trait BoardStore {
    /// Lists the windows of a board.
    fn list_windows<'a>(&'a self, board: &'a BoardId) -> BoardStoreFuture<'a, Vec<WindowRecord>>;

    /// Loads the saved desktop-icon placements of a board.
    fn icon_placements<'a>(
        &'a self,
        board: &'a BoardId,
    ) -> BoardStoreFuture<'a, HashMap<WindowId, IconPlacement>>;

    /// Replaces the saved desktop-icon placements of a board.
    fn save_icon_placements<'a>(
        &'a self,
        board: &'a BoardId,
        placements: &'a HashMap<WindowId, IconPlacement>,
    ) -> BoardStoreFuture<'a, ()>;

    /// Creates a window and returns the stored record with its assigned id.
    fn create_window<'a>(
        &'a self,
        board: &'a BoardId,
        request: &'a CreateWindowRequest,
    ) -> BoardStoreFuture<'a, WindowRecord>;

    /// Overwrites a window with the complete record.
    fn update_window<'a>(
        &'a self,
        board: &'a BoardId,
        record: &'a WindowRecord,
    ) -> BoardStoreFuture<'a, ()>;

    /// Deletes a window; a soft delete moves it to the trash collaborator,
    /// `permanent` removes it and its content outright.
    fn delete_window<'a>(
        &'a self,
        board: &'a BoardId,
        window_id: &'a WindowId,
        permanent: bool,
    ) -> BoardStoreFuture<'a, ()>;

    /// Uploads a file into a window and returns the resulting
    /// kind/title/content changes.
    fn upload_window_file<'a>(
        &'a self,
        board: &'a BoardId,
        window_id: &'a WindowId,
        request: &'a UploadRequest,
    ) -> BoardStoreFuture<'a, UploadOutcome>;
}

/// Store that accepts every write and returns empty reads, for hosts without
/// a remote.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopBoardStore;

impl BoardStore for NoopBoardStore {
    fn list_windows<'a>(&'a self, _board: &'a BoardId) -> BoardStoreFuture<'a, Vec<WindowRecord>> {
        Box::pin(async { Ok(Vec::new()) })
    }

    fn icon_placements<'a>(
        &'a self,
        _board: &'a BoardId,
    ) -> BoardStoreFuture<'a, HashMap<WindowId, IconPlacement>> {
        Box::pin(async { Ok(HashMap::new()) })
    }

    fn save_icon_placements<'a>(
        &'a self,
        _board: &'a BoardId,
        _placements: &'a HashMap<WindowId, IconPlacement>,
    ) -> BoardStoreFuture<'a, ()> {
        Box::pin(async { Ok(()) })
    }

    fn create_window<'a>(
        &'a self,
        _board: &'a BoardId,
        request: &'a CreateWindowRequest,
    ) -> BoardStoreFuture<'a, WindowRecord> {
        Box::pin(async move {
            Ok(WindowRecord {
                id: WindowId::new("window-0"),
                kind: request.kind,
                title: request.title.clone(),
                content: request.content.clone(),
                file_path: None,
                position: request.position.clamped_origin(),
                size: request.size.clamped_min(),
                hidden: false,
                updated_at_unix_ms: next_monotonic_timestamp_ms(),
            })
        })
    }

    fn update_window<'a>(
        &'a self,
        _board: &'a BoardId,
        _record: &'a WindowRecord,
    ) -> BoardStoreFuture<'a, ()> {
        Box::pin(async { Ok(()) })
    }

    fn delete_window<'a>(
        &'a self,
        _board: &'a BoardId,
        _window_id: &'a WindowId,
        _permanent: bool,
    ) -> BoardStoreFuture<'a, ()> {
        Box::pin(async { Ok(()) })
    }

    fn upload_window_file<'a>(
        &'a self,
        _board: &'a BoardId,
        _window_id: &'a WindowId,
        request: &'a UploadRequest,
    ) -> BoardStoreFuture<'a, UploadOutcome> {
        Box::pin(async move {
            Ok(UploadOutcome {
                kind: WindowKind::for_file_name(&request.file_name),
                title: file_base_name(&request.file_name).to_string(),
                file_path: Some(format!("files/{}", request.file_name)),
                content: None,
            })
        })
    }
}

#[derive(Default)]
struct BoardBucket {
    windows: Vec<WindowRecord>,
    placements: HashMap<WindowId, IconPlacement>,
    trash: Vec<WindowRecord>,
}

#[derive(Default)]
struct MemoryInner {
    boards: HashMap<BoardId, BoardBucket>,
    next_id: u64,
    update_count: usize,
    placement_save_count: usize,
    fail_writes: bool,
}

/// In-memory board store used as the deterministic remote in tests.
///
/// Write counters and a failure toggle make debounce-coalescing and
/// degraded-network behavior observable.
#[derive(Clone, Default)]
pub struct MemoryBoardStore {
    inner: Rc<RefCell<MemoryInner>>,
}

impl MemoryBoardStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a board with window records.
    pub fn seed_windows(&self, board: &BoardId, windows: Vec<WindowRecord>) {
        self.inner
            .borrow_mut()
            .boards
            .entry(board.clone())
            .or_default()
            .windows = windows;
    }

    /// Seeds a board with saved icon placements.
    pub fn seed_placements(&self, board: &BoardId, placements: HashMap<WindowId, IconPlacement>) {
        self.inner
            .borrow_mut()
            .boards
            .entry(board.clone())
            .or_default()
            .placements = placements;
    }

    /// Returns the current window records of a board.
    pub fn windows(&self, board: &BoardId) -> Vec<WindowRecord> {
        self.inner
            .borrow()
            .boards
            .get(board)
            .map(|bucket| bucket.windows.clone())
            .unwrap_or_default()
    }

    /// Returns one window record of a board.
    pub fn window(&self, board: &BoardId, window_id: &WindowId) -> Option<WindowRecord> {
        self.inner
            .borrow()
            .boards
            .get(board)
            .and_then(|bucket| bucket.windows.iter().find(|w| &w.id == window_id).cloned())
    }

    /// Returns the saved placements of a board.
    pub fn placements(&self, board: &BoardId) -> HashMap<WindowId, IconPlacement> {
        self.inner
            .borrow()
            .boards
            .get(board)
            .map(|bucket| bucket.placements.clone())
            .unwrap_or_default()
    }

    /// Returns windows soft-deleted from a board.
    pub fn trashed(&self, board: &BoardId) -> Vec<WindowRecord> {
        self.inner
            .borrow()
            .boards
            .get(board)
            .map(|bucket| bucket.trash.clone())
            .unwrap_or_default()
    }

    /// Number of full-object window updates accepted so far.
    pub fn update_count(&self) -> usize {
        self.inner.borrow().update_count
    }

    /// Number of placement-map saves accepted so far.
    pub fn placement_save_count(&self) -> usize {
        self.inner.borrow().placement_save_count
    }

    /// Makes subsequent writes fail with a transport error.
    pub fn set_fail_writes(&self, fail: bool) {
        self.inner.borrow_mut().fail_writes = fail;
    }

    fn write_guard(&self) -> Result<(), StoreError> {
        if self.inner.borrow().fail_writes {
            Err(StoreError::Transport("injected write failure".to_string()))
        } else {
            Ok(())
        }
    }
}

impl BoardStore for MemoryBoardStore {
    fn list_windows<'a>(&'a self, board: &'a BoardId) -> BoardStoreFuture<'a, Vec<WindowRecord>> {
        Box::pin(async move { Ok(self.windows(board)) })
    }

    fn icon_placements<'a>(
        &'a self,
        board: &'a BoardId,
    ) -> BoardStoreFuture<'a, HashMap<WindowId, IconPlacement>> {
        Box::pin(async move { Ok(self.placements(board)) })
    }

    fn save_icon_placements<'a>(
        &'a self,
        board: &'a BoardId,
        placements: &'a HashMap<WindowId, IconPlacement>,
    ) -> BoardStoreFuture<'a, ()> {
        Box::pin(async move {
            self.write_guard()?;
            let mut inner = self.inner.borrow_mut();
            inner.placement_save_count += 1;
            inner.boards.entry(board.clone()).or_default().placements = placements.clone();
            Ok(())
        })
    }

    fn create_window<'a>(
        &'a self,
        board: &'a BoardId,
        request: &'a CreateWindowRequest,
    ) -> BoardStoreFuture<'a, WindowRecord> {
        Box::pin(async move {
            self.write_guard()?;
            let mut inner = self.inner.borrow_mut();
            inner.next_id += 1;
            let record = WindowRecord {
                id: WindowId::new(format!("window-{}", inner.next_id)),
                kind: request.kind,
                title: request.title.clone(),
                content: request.content.clone(),
                file_path: None,
                position: request.position.clamped_origin(),
                size: request.size.clamped_min(),
                hidden: false,
                updated_at_unix_ms: next_monotonic_timestamp_ms(),
            };
            inner
                .boards
                .entry(board.clone())
                .or_default()
                .windows
                .push(record.clone());
            Ok(record)
        })
    }

    fn update_window<'a>(
        &'a self,
        board: &'a BoardId,
        record: &'a WindowRecord,
    ) -> BoardStoreFuture<'a, ()> {
        Box::pin(async move {
            self.write_guard()?;
            let mut inner = self.inner.borrow_mut();
            let bucket = inner
                .boards
                .get_mut(board)
                .ok_or(StoreError::Status { status: 404 })?;
            let slot = bucket
                .windows
                .iter_mut()
                .find(|w| w.id == record.id)
                .ok_or(StoreError::Status { status: 404 })?;
            *slot = record.clone();
            inner.update_count += 1;
            Ok(())
        })
    }

    fn delete_window<'a>(
        &'a self,
        board: &'a BoardId,
        window_id: &'a WindowId,
        permanent: bool,
    ) -> BoardStoreFuture<'a, ()> {
        Box::pin(async move {
            self.write_guard()?;
            let mut inner = self.inner.borrow_mut();
            let bucket = inner
                .boards
                .get_mut(board)
                .ok_or(StoreError::Status { status: 404 })?;
            let index = bucket
                .windows
                .iter()
                .position(|w| &w.id == window_id)
                .ok_or(StoreError::Status { status: 404 })?;
            let removed = bucket.windows.remove(index);
            bucket.placements.remove(window_id);
            if !permanent {
                bucket.trash.push(removed);
            }
            Ok(())
        })
    }

    fn upload_window_file<'a>(
        &'a self,
        board: &'a BoardId,
        window_id: &'a WindowId,
        request: &'a UploadRequest,
    ) -> BoardStoreFuture<'a, UploadOutcome> {
        Box::pin(async move {
            self.write_guard()?;
            let mut inner = self.inner.borrow_mut();
            let bucket = inner
                .boards
                .get_mut(board)
                .ok_or(StoreError::Status { status: 404 })?;
            let slot = bucket
                .windows
                .iter_mut()
                .find(|w| &w.id == window_id)
                .ok_or(StoreError::Status { status: 404 })?;

            let outcome = UploadOutcome {
                kind: WindowKind::for_file_name(&request.file_name),
                title: file_base_name(&request.file_name).to_string(),
                file_path: Some(format!("files/{}", request.file_name)),
                content: Some(format!(
                    "/api/boards/{}/files/serve?path=files/{}",
                    board, request.file_name
                )),
            };
            slot.kind = outcome.kind;
            slot.title = outcome.title.clone();
            slot.file_path = outcome.file_path.clone();
            if let Some(content) = &outcome.content {
                slot.content = content.clone();
            }
            slot.updated_at_unix_ms = next_monotonic_timestamp_ms();
            Ok(outcome)
        })
    }
}
