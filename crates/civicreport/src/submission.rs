//! The issue submission workflow.
//!
//! [`SubmissionCoordinator::submit`] validates a filled-in [`IssueForm`],
//! uploads its attachments one at a time, inserts a single issue record and,
//! on success, clears the form. Any failure leaves the form contents untouched
//! so the citizen does not have to type them again.
//!
//! ```text
//! Idle -> Validating -> Uploading -> Persisting -> Done
//!   ^________|______________|____________|   (any failure)
//! ```

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::identity::CurrentUser;
use crate::issue::{Attachment, IssueForm, PersistedIssueInput};
use crate::notice::NextView;
use crate::store::{ObjectStore, RecordStore, StoreError, ISSUES_TABLE};

/// Progress of a submission for one form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SubmissionState {
    /// Nothing in flight.
    #[default]
    Idle,
    /// Checking the user, location and required fields.
    Validating,
    /// Uploading attachments.
    Uploading,
    /// Inserting the issue record.
    Persisting,
    /// The last submission succeeded.
    Done,
}

impl SubmissionState {
    /// True while network calls are outstanding.
    #[must_use]
    pub fn is_in_flight(&self) -> bool {
        matches!(self, Self::Uploading | Self::Persisting)
    }
}

impl fmt::Display for SubmissionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Validating => write!(f, "validating"),
            Self::Uploading => write!(f, "uploading"),
            Self::Persisting => write!(f, "persisting"),
            Self::Done => write!(f, "done"),
        }
    }
}

/// A required text or choice field of the form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormField {
    /// The issue title.
    Title,
    /// The detailed description.
    Description,
    /// The department picker.
    Department,
}

impl fmt::Display for FormField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Title => write!(f, "title"),
            Self::Description => write!(f, "description"),
            Self::Department => write!(f, "department"),
        }
    }
}

/// Why a submission did not go through.
#[derive(Debug, Error)]
pub enum SubmitError {
    /// Nobody is signed in. The caller should send the user to sign-in.
    #[error("authentication required")]
    AuthRequired,

    /// No location was picked.
    #[error("location required")]
    LocationRequired,

    /// A required field is blank.
    #[error("{0} is required")]
    MissingField(FormField),

    /// Uploading an attachment failed; later attachments were not attempted
    /// and no record was created.
    #[error("failed to upload attachment {index} ({file_name}): {cause}")]
    UploadFailed {
        /// Position of the attachment in selection order.
        index: usize,
        /// Original file name.
        file_name: String,
        /// What the object store reported.
        #[source]
        cause: StoreError,
    },

    /// Every upload succeeded but the insert failed. The uploaded objects
    /// stay in the object store.
    #[error("failed to save issue: {cause}")]
    PersistFailed {
        /// Public URLs of the objects uploaded before the failure.
        orphaned_media: Vec<String>,
        /// What the record store reported.
        #[source]
        cause: StoreError,
    },
}

impl SubmitError {
    /// The collaborator error behind this failure, if any.
    #[must_use]
    pub fn cause(&self) -> Option<&StoreError> {
        match self {
            Self::UploadFailed { cause, .. } | Self::PersistFailed { cause, .. } => Some(cause),
            _ => None,
        }
    }

    /// Where the caller should navigate after this failure, if anywhere.
    #[must_use]
    pub fn redirect(&self) -> Option<NextView> {
        matches!(self, Self::AuthRequired).then_some(NextView::SignIn)
    }
}

/// What a successful submission produced.
#[derive(Debug, Clone, PartialEq)]
pub struct SubmissionReceipt {
    /// The record that was inserted.
    pub record: PersistedIssueInput,
    /// Where the caller should navigate next.
    pub next: NextView,
}

/// Clock used to scope upload paths.
pub type Clock = fn() -> DateTime<Utc>;

/// Runs submissions against an object store and a record store.
#[derive(Clone)]
pub struct SubmissionCoordinator {
    objects: Arc<dyn ObjectStore>,
    records: Arc<dyn RecordStore>,
    clock: Clock,
}

impl fmt::Debug for SubmissionCoordinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubmissionCoordinator")
            .field("objects", &self.objects.name())
            .field("records", &self.records.name())
            .finish_non_exhaustive()
    }
}

impl SubmissionCoordinator {
    /// Create a coordinator using the wall clock.
    #[must_use]
    pub fn new(objects: Arc<dyn ObjectStore>, records: Arc<dyn RecordStore>) -> Self {
        Self {
            objects,
            records,
            clock: Utc::now,
        }
    }

    /// Replace the clock used for upload paths.
    #[must_use]
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    /// Submit `form` on behalf of `user`.
    ///
    /// On success the form is cleared and left in [`SubmissionState::Done`].
    /// On failure it is left in [`SubmissionState::Idle`] with its contents
    /// intact. If the returned future is dropped before completion the form
    /// also returns to `Idle`; objects uploaded so far are not removed.
    ///
    /// Every transition is published to the form's
    /// [`watch_state`](IssueForm::watch_state) receivers as it happens.
    ///
    /// # Errors
    ///
    /// See [`SubmitError`]. Validation failures make no network calls.
    pub async fn submit(
        &self,
        form: &mut IssueForm,
        user: Option<&CurrentUser>,
    ) -> Result<SubmissionReceipt, SubmitError> {
        let flight = InFlight { form };
        let result = self.run(&mut *flight.form, user).await;
        match &result {
            Ok(receipt) => {
                info!(
                    "Issue '{}' submitted with {} attachment(s)",
                    receipt.record.title,
                    receipt.record.media_urls.len()
                );
                flight.form.reset();
                flight.form.set_state(SubmissionState::Done);
            }
            Err(err) => {
                warn!("Issue submission failed: {err}");
                flight.form.set_state(SubmissionState::Idle);
            }
        }
        result
    }

    async fn run(
        &self,
        form: &mut IssueForm,
        user: Option<&CurrentUser>,
    ) -> Result<SubmissionReceipt, SubmitError> {
        form.set_state(SubmissionState::Validating);

        let user = user.ok_or(SubmitError::AuthRequired)?;
        let location = form
            .location()
            .cloned()
            .ok_or(SubmitError::LocationRequired)?;
        if form.title().trim().is_empty() {
            return Err(SubmitError::MissingField(FormField::Title));
        }
        if form.description().trim().is_empty() {
            return Err(SubmitError::MissingField(FormField::Description));
        }
        let department = form
            .department()
            .ok_or(SubmitError::MissingField(FormField::Department))?;

        form.set_state(SubmissionState::Uploading);
        let stamp = (self.clock)().timestamp_millis();
        let media_urls = self.upload_all(&user.id, stamp, form.attachments()).await?;

        form.set_state(SubmissionState::Persisting);
        let record = PersistedIssueInput {
            user_id: user.id.clone(),
            title: form.title().to_string(),
            description: form.description().to_string(),
            department,
            location_name: location.address,
            latitude: location.latitude,
            longitude: location.longitude,
            media_urls,
        };
        debug!("Inserting issue via {}", self.records.name());
        if let Err(cause) = self.records.insert(ISSUES_TABLE, &record).await {
            return Err(SubmitError::PersistFailed {
                orphaned_media: record.media_urls,
                cause,
            });
        }

        Ok(SubmissionReceipt {
            record,
            next: NextView::IssueMap,
        })
    }

    /// Upload attachments in order, stopping at the first failure.
    async fn upload_all(
        &self,
        user_id: &str,
        stamp: i64,
        attachments: &[Attachment],
    ) -> Result<Vec<String>, SubmitError> {
        let mut urls = Vec::with_capacity(attachments.len());
        for (index, attachment) in attachments.iter().enumerate() {
            let path = object_path(user_id, stamp, index, attachment);
            debug!(
                "Uploading {} ({} bytes) to {} as {}",
                attachment.file_name(),
                attachment.len(),
                self.objects.name(),
                path
            );
            let stored = self
                .objects
                .upload(&path, attachment)
                .await
                .map_err(|cause| SubmitError::UploadFailed {
                    index,
                    file_name: attachment.file_name().to_string(),
                    cause,
                })?;
            urls.push(self.objects.public_url(&stored.path));
        }
        Ok(urls)
    }
}

/// Storage path for one attachment of a submission.
///
/// `{user_id}/{stamp}-{index}` plus the original extension when there is one.
/// The index keeps paths distinct when several files share a millisecond.
#[must_use]
pub fn object_path(user_id: &str, stamp: i64, index: usize, attachment: &Attachment) -> String {
    match attachment.extension() {
        Some(ext) => format!("{user_id}/{stamp}-{index}.{ext}"),
        None => format!("{user_id}/{stamp}-{index}"),
    }
}

/// Returns the form to `Idle` if a submission is dropped mid-flight.
struct InFlight<'a> {
    form: &'a mut IssueForm,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if matches!(
            self.form.state(),
            SubmissionState::Validating | SubmissionState::Uploading | SubmissionState::Persisting
        ) {
            self.form.set_state(SubmissionState::Idle);
        }
    }
}
