//! `civicreport` - Citizen reporting of civic issues
//!
//! This library implements the issue submission workflow: a citizen fills in
//! an [`IssueForm`], attachments are uploaded to an object store one at a
//! time, and a single issue record is inserted into a record store. The
//! collaborators are traits ([`ObjectStore`], [`RecordStore`]) with a local
//! filesystem-and-SQLite backend and a hosted REST backend.

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

pub mod cli;
pub mod config;
pub mod error;
pub mod identity;
pub mod issue;
pub mod logging;
pub mod notice;
pub mod remote;
pub mod storage;
pub mod store;
pub mod submission;

pub use config::Config;
pub use error::{Error, Result};
pub use identity::{CurrentUser, Session};
pub use issue::{
    slugify, Attachment, Department, IssueForm, Location, PersistedIssue, PersistedIssueInput,
};
pub use logging::init_logging;
pub use notice::{NextView, Notice, NoticeVariant};
pub use remote::RestBackend;
pub use storage::{IssueDatabase, IssueStats, LocalObjectStore};
pub use store::{ObjectStore, RecordStore, StoreError, StoredObject};
pub use submission::{SubmissionCoordinator, SubmissionReceipt, SubmissionState, SubmitError};
