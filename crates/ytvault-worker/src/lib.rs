//! Download job lifecycle.
//!
//! A [`JobManager`] owns the store, the [`FileRegistry`], the [`JobRegistry`]
//! of live workers and the [`EventBus`]. Each job runs as one
//! [`DownloadWorker`] task driving a blocking [`DownloadEngine`]; completed
//! videos are turned into scrubbing previews by the [`ThumbnailIndexer`].
//!
//! [`FileRegistry`]: ytvault_store::FileRegistry
//! [`DownloadEngine`]: ytvault_media::DownloadEngine

pub mod bootstrap;
pub mod config;
pub mod error;
pub mod event_bus;
pub mod logging;
pub mod manager;
pub mod metrics;
pub mod registry;
pub mod thumbnail_index;
pub mod worker;

pub use bootstrap::Bootstrapper;
pub use config::WorkerConfig;
pub use error::{WorkerError, WorkerResult};
pub use event_bus::{ChannelTransport, EventBus, NotificationTransport, PushError, SubscriberId};
pub use logging::JobLogger;
pub use manager::JobManager;
pub use registry::{JobRegistry, WorkerHandle};
pub use thumbnail_index::{PreviewIndex, ThumbnailIndexer};
pub use worker::{DownloadWorker, FirstUpdate, WorkerDeps, WorkerState};
