//! Typed host-domain contracts for the canvas core's remote and scheduling
//! needs.
//!
//! This crate is the API-first boundary between `canvas_runtime` and its
//! environment: the remote board store, the cancellable task scheduler, and
//! the canvas viewport measurement. Concrete network transports live with the
//! embedding shell; the `Memory*`/`Noop*` adapters here back tests and
//! unsupported targets.

#![warn(missing_docs, rustdoc::broken_intra_doc_links)]

pub mod config;
pub mod scheduler;
pub mod store;
pub mod time;
pub mod viewport;

pub use config::RemoteConfig;
pub use scheduler::{ManualScheduler, NoopScheduler, ScheduledTask, TaskHandle, TaskScheduler};
pub use store::{BoardStore, BoardStoreFuture, MemoryBoardStore, NoopBoardStore, StoreError};
pub use time::{next_monotonic_timestamp_ms, unix_time_ms_now};
pub use viewport::{
    EstimatedViewport, FixedViewport, UnmeasuredViewport, ViewportBounds, ViewportProvider,
    HEADER_HEIGHT_PX, SIDEBAR_WIDTH_PX,
};
