//! # Sync Module
//!
//! Field-level synchronisation of the local library with remote catalogs.
//!
//! ## Overview
//!
//! Every book field under sync control carries a [`SyncAction`]: skip it,
//! copy remote data only into blank fields, append to lists, or overwrite.
//! The merge engine applies those actions to one book at a time:
//!
//! - **Actions and fields** (`action`, `field`): the policy enum and the
//!   per-field binding, persisted as ordinals in the settings store
//! - **Registry** (`registry`): builds the ordered field set from a
//!   declarative list, user visibility and stored actions
//! - **Merge engine** (`processor`): `filter` before fetching, `process`
//!   after, producing the minimal delta to persist
//! - **Sessions** (`config`, `helper`, `server`): run options and the
//!   per-site reader/writer factory
//! - **Runs** (`reader`, `writer`): generic loops over a remote catalog with
//!   cancellation and result summaries
//!
//! ## Usage
//!
//! ```ignore
//! use core_sync::{SyncReaderHelper, SyncServer, SyncServices};
//! use tokio_util::sync::CancellationToken;
//!
//! let services = SyncServices::from_config(&config, repository);
//! let helper = SyncReaderHelper::new("stripinfo".parse::<SyncServer>()?);
//! let reader = helper.create_reader(site_client, services).await?;
//!
//! let results = reader.read(&CancellationToken::new()).await?;
//! println!("{results}");
//! ```

pub mod action;
pub mod config;
pub mod error;
pub mod field;
pub mod helper;
pub mod processor;
pub mod reader;
pub mod registry;
pub mod remote;
pub mod results;
pub mod server;
pub mod services;
pub mod visibility;
pub mod writer;

pub use action::SyncAction;
pub use config::{RecordType, SyncReaderConfig, SyncWriterConfig, Updates};
pub use error::{Result, SyncError};
pub use field::SyncField;
pub use helper::{SyncReaderHelper, SyncWriterHelper};
pub use processor::{FieldsWanted, MergeContext, MergeOutcome, SyncReaderProcessor};
pub use reader::{CatalogReader, SyncReader};
pub use registry::SyncReaderProcessorBuilder;
pub use remote::{RemoteBook, RemoteBookState, RemoteCatalog, RemoteCatalogWriter};
pub use results::{ReaderResults, WriterResults};
pub use server::SyncServer;
pub use services::SyncServices;
pub use visibility::{AllFieldsVisible, FieldVisibility, HiddenFields};
pub use writer::{CatalogWriter, SyncWriter};
