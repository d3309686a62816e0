//! Durable offline write queue with replay from two execution contexts.
//!
//! Writes that fail while the device is offline are stored in a shared
//! SQLite queue and replayed, oldest first, when connectivity returns. The
//! page context replays directly on reconnect; the worker context replays on
//! an explicit message or a background-sync event. Both only coordinate
//! through the store, so a record is deleted strictly after the backend
//! accepts it and a delete of an already removed record is a no-op.
//!
//! # Examples
//!
//! Queue primitives with [`core::queue::MemoryQueue`]:
//! ```
//! use offline_sync::{
//!     core::queue::{IdPolicy, MemoryQueue},
//!     persist::QueueStore,
//!     record::QueueDraft,
//!     types::DeleteOutcome,
//! };
//!
//! let mut queue = MemoryQueue::with_policy(IdPolicy::Sequential);
//! let id = queue
//!     .add(QueueDraft::new("/register", serde_json::json!({ "name": "Test User" })))
//!     .expect("add");
//! assert_eq!(id, 1);
//! assert_eq!(queue.delete_by_id(id).expect("delete"), DeleteOutcome::Deleted);
//! assert_eq!(queue.delete_by_id(id).expect("delete"), DeleteOutcome::NotFound);
//! ```
//!
//! Wiring both contexts against one database file:
//! ```no_run
//! use std::sync::Arc;
//!
//! use offline_sync::{
//!     config::SyncConfig,
//!     connectivity::Connectivity,
//!     persist::StoreHandle,
//!     runtime::{
//!         notifier::BackgroundSync,
//!         page::{spawn_page_context, PageLinks},
//!         worker::spawn_worker_context,
//!     },
//!     transport::{ReqwestTransport, Transport},
//! };
//!
//! # #[tokio::main]
//! # async fn main() {
//! let config = SyncConfig::default();
//! let transport: Arc<dyn Transport> = Arc::new(ReqwestTransport::new(&config.api_base_url));
//! let connectivity = Connectivity::new(false);
//!
//! let worker_store = StoreHandle::open(&config.store_path, config.busy_timeout()).await.expect("open");
//! let worker = spawn_worker_context(worker_store, Arc::clone(&transport), &config);
//!
//! let background_sync = BackgroundSync::new();
//! background_sync.spawn_dispatcher(worker.clone(), &connectivity);
//!
//! let page_store = StoreHandle::open(&config.store_path, config.busy_timeout()).await.expect("open");
//! let page = spawn_page_context(
//!     page_store,
//!     transport,
//!     &connectivity,
//!     PageLinks { worker: Some(worker.clone()), background_sync: Some(background_sync) },
//!     &config,
//! );
//!
//! connectivity.set_online(true);
//! page.shutdown().await.expect("shutdown");
//! worker.shutdown().await.expect("shutdown");
//! # }
//! ```

#![deny(missing_docs)]

/// Typed backend endpoints.
pub mod api;
/// Request capture layer.
pub mod capture;
/// Runtime configuration.
pub mod config;
/// Observed connectivity flag.
pub mod connectivity;
/// In-memory queue store and index helpers.
pub mod core;
/// Queue store contract, SQLite implementation and session entry.
pub mod persist;
/// Queue record model.
pub mod record;
/// Replay engine.
pub mod replay;
/// Page and worker execution contexts.
pub mod runtime;
/// HTTP seam.
pub mod transport;
/// Shared primitive types and constants.
pub mod types;
