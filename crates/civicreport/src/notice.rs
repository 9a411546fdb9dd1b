//! User-facing notifications for submission outcomes.

use std::fmt;

use serde::Serialize;

use crate::submission::{SubmissionReceipt, SubmitError};

/// Visual weight of a notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeVariant {
    /// Informational.
    #[default]
    Default,
    /// Something went wrong.
    Destructive,
}

/// Where the UI should go after a submission attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NextView {
    /// The sign-in flow. Entered form state must be kept.
    SignIn,
    /// The map of reported issues, shown after a successful report.
    IssueMap,
}

/// A transient notification, shown once and dismissed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    /// Short headline.
    pub title: String,
    /// One-sentence explanation.
    pub description: String,
    /// Visual weight.
    pub variant: NoticeVariant,
}

impl Notice {
    fn destructive(title: &str, description: impl Into<String>) -> Self {
        Self {
            title: title.to_string(),
            description: description.into(),
            variant: NoticeVariant::Destructive,
        }
    }

    /// The notice for a completed submission.
    #[must_use]
    pub fn submitted() -> Self {
        Self {
            title: "Issue reported!".to_string(),
            description: "Your report has been submitted successfully.".to_string(),
            variant: NoticeVariant::Default,
        }
    }

    /// The notice for a failed submission.
    #[must_use]
    pub fn for_error(err: &SubmitError) -> Self {
        match err {
            SubmitError::AuthRequired => Self::destructive(
                "Authentication required",
                "Please sign in to report an issue.",
            ),
            SubmitError::LocationRequired => Self::destructive(
                "Location required",
                "Please select a location on the map.",
            ),
            SubmitError::MissingField(field) => Self::destructive(
                "Missing information",
                format!("Please fill in the {field}."),
            ),
            SubmitError::UploadFailed { cause, .. } | SubmitError::PersistFailed { cause, .. } => {
                Self::destructive("Error submitting report", cause.to_string())
            }
        }
    }

    /// The notice for either outcome.
    #[must_use]
    pub fn for_result(result: &Result<SubmissionReceipt, SubmitError>) -> Self {
        match result {
            Ok(_) => Self::submitted(),
            Err(err) => Self::for_error(err),
        }
    }

    /// Check if this notice reports a failure.
    #[must_use]
    pub fn is_error(&self) -> bool {
        self.variant == NoticeVariant::Destructive
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.title, self.description)
    }
}
