//! Core library for the `dropsync` SSH configuration sync tool.
//!
//! The crate fetches compute-instance records from a remote provider,
//! derives a unique `Host` alias and identity key per instance, and
//! rewrites the managed region of an SSH configuration file. Content
//! outside the marker pair is never touched; content between the markers
//! is regenerated from scratch on every run.
//!
//! There is no file locking: a concurrent writer to the target file can
//! race a sync run and be overwritten.

pub mod backend;
pub mod config;
pub mod digitalocean;
pub mod record;
pub mod region;
pub mod resolver;
pub mod sync;
pub mod test_support;
pub mod util;

pub use backend::{InstanceSource, RawInstance, SourceFuture};
pub use config::{DEFAULT_SSH_USER, Profile, ProfileError, ProfileStore};
pub use digitalocean::{DigitalOceanError, DigitalOceanSource};
pub use record::{InstanceRecord, RecordError, normalize};
pub use region::{ManagedFile, RegionError};
pub use resolver::{IdentityKey, KeyTable, ResolveError, ResolvedInstance, resolve};
pub use sync::{SyncOrchestrator, SyncReport, SyncRunError};
pub use util::expand_tilde;
