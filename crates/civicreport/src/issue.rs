//! Core issue types for civicreport.
//!
//! This module defines the transient form state a citizen fills in
//! ([`IssueForm`]), the record handed to the record store
//! ([`PersistedIssueInput`]) and the record read back from it
//! ([`PersistedIssue`]).

use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::sync::OnceLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use crate::error::{Error, Result};
use crate::submission::SubmissionState;

/// Government department an issue is routed to.
///
/// Serialized as its slug (see [`slugify`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Department {
    /// Roads & Transport.
    #[serde(rename = "roads-&-transport")]
    RoadsTransport,
    /// Water Supply.
    #[serde(rename = "water-supply")]
    WaterSupply,
    /// Electricity.
    #[serde(rename = "electricity")]
    Electricity,
    /// Sanitation.
    #[serde(rename = "sanitation")]
    Sanitation,
    /// Public Safety.
    #[serde(rename = "public-safety")]
    PublicSafety,
    /// Parks & Recreation.
    #[serde(rename = "parks-&-recreation")]
    ParksRecreation,
    /// Building & Construction.
    #[serde(rename = "building-&-construction")]
    BuildingConstruction,
    /// Anything that fits no other department.
    #[serde(rename = "other")]
    Other,
}

impl Department {
    /// Every department, in the order the form lists them.
    pub const ALL: [Self; 8] = [
        Self::RoadsTransport,
        Self::WaterSupply,
        Self::Electricity,
        Self::Sanitation,
        Self::PublicSafety,
        Self::ParksRecreation,
        Self::BuildingConstruction,
        Self::Other,
    ];

    /// The human-readable label shown in the department picker.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::RoadsTransport => "Roads & Transport",
            Self::WaterSupply => "Water Supply",
            Self::Electricity => "Electricity",
            Self::Sanitation => "Sanitation",
            Self::PublicSafety => "Public Safety",
            Self::ParksRecreation => "Parks & Recreation",
            Self::BuildingConstruction => "Building & Construction",
            Self::Other => "Other",
        }
    }

    /// The persisted identifier, `slugify(self.label())`.
    #[must_use]
    pub fn slug(&self) -> &'static str {
        match self {
            Self::RoadsTransport => "roads-&-transport",
            Self::WaterSupply => "water-supply",
            Self::Electricity => "electricity",
            Self::Sanitation => "sanitation",
            Self::PublicSafety => "public-safety",
            Self::ParksRecreation => "parks-&-recreation",
            Self::BuildingConstruction => "building-&-construction",
            Self::Other => "other",
        }
    }

    /// Look up a department by its slug.
    #[must_use]
    pub fn from_slug(slug: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|d| d.slug() == slug)
    }
}

impl fmt::Display for Department {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Department {
    type Err = Error;

    /// Accepts a label or a slug, in any letter case.
    fn from_str(s: &str) -> Result<Self> {
        Self::from_slug(&slugify(s.trim()))
            .ok_or_else(|| Error::UnknownDepartment(s.to_string()))
    }
}

/// Normalize a department label into its slug.
///
/// Lowercases and replaces every run of whitespace with a single hyphen.
/// Punctuation is kept, so `"Roads & Transport"` becomes `"roads-&-transport"`.
#[must_use]
pub fn slugify(label: &str) -> String {
    static WHITESPACE: OnceLock<Regex> = OnceLock::new();
    let re = WHITESPACE.get_or_init(|| Regex::new(r"\s+").expect("static regex is valid"));
    re.replace_all(&label.to_lowercase(), "-").into_owned()
}

/// A point picked on the map, with its reverse-geocoded address.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    /// Latitude in degrees.
    pub latitude: f64,
    /// Longitude in degrees.
    pub longitude: f64,
    /// Human-readable address.
    pub address: String,
}

impl Location {
    /// Create a location, checking the coordinate ranges.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidLocation`] if latitude is outside `[-90, 90]`
    /// or longitude is outside `[-180, 180]`.
    pub fn new(latitude: f64, longitude: f64, address: impl Into<String>) -> Result<Self> {
        if !(-90.0..=90.0).contains(&latitude) {
            return Err(Error::invalid_location(format!(
                "latitude {latitude} out of range"
            )));
        }
        if !(-180.0..=180.0).contains(&longitude) {
            return Err(Error::invalid_location(format!(
                "longitude {longitude} out of range"
            )));
        }
        Ok(Self {
            latitude,
            longitude,
            address: address.into(),
        })
    }
}

/// A file picked for upload.
#[derive(Clone, PartialEq, Eq)]
pub struct Attachment {
    file_name: String,
    bytes: Vec<u8>,
}

impl fmt::Debug for Attachment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Attachment")
            .field("file_name", &self.file_name)
            .field("len", &self.bytes.len())
            .finish()
    }
}

impl Attachment {
    /// Create an attachment from in-memory content.
    #[must_use]
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes,
        }
    }

    /// Read an attachment from disk, keeping only the file name.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AttachmentRead`] if the file cannot be read.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|source| Error::AttachmentRead {
            path: path.to_path_buf(),
            source,
        })?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(Self { file_name, bytes })
    }

    /// The original file name.
    #[must_use]
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// The file content.
    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Size of the content in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Check if the content is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// The extension of the original file name, without the dot.
    #[must_use]
    pub fn extension(&self) -> Option<&str> {
        Path::new(&self.file_name)
            .extension()
            .and_then(|ext| ext.to_str())
            .filter(|ext| !ext.is_empty())
    }
}

/// The issue report form, as the citizen is filling it in.
///
/// Lives until a successful submission resets it. The submission state is
/// published on a watch channel so a UI can follow it while the form is
/// borrowed by a running submission (see [`IssueForm::watch_state`]).
#[derive(Debug)]
pub struct IssueForm {
    title: String,
    description: String,
    department: Option<Department>,
    location: Option<Location>,
    attachments: Vec<Attachment>,
    state: watch::Sender<SubmissionState>,
}

impl Default for IssueForm {
    fn default() -> Self {
        Self {
            title: String::new(),
            description: String::new(),
            department: None,
            location: None,
            attachments: Vec::new(),
            state: watch::channel(SubmissionState::Idle).0,
        }
    }
}

/// A clone is a separate form: it starts with the same contents and state
/// but has its own state channel.
impl Clone for IssueForm {
    fn clone(&self) -> Self {
        Self {
            title: self.title.clone(),
            description: self.description.clone(),
            department: self.department,
            location: self.location.clone(),
            attachments: self.attachments.clone(),
            state: watch::channel(self.state()).0,
        }
    }
}

impl IssueForm {
    /// Create an empty form.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue title.
    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Set the issue title.
    pub fn set_title(&mut self, title: impl Into<String>) {
        self.title = title.into();
    }

    /// Detailed description.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Set the detailed description.
    pub fn set_description(&mut self, description: impl Into<String>) {
        self.description = description.into();
    }

    /// Selected department, if any.
    #[must_use]
    pub fn department(&self) -> Option<Department> {
        self.department
    }

    /// Select a department.
    pub fn set_department(&mut self, department: Department) {
        self.department = Some(department);
    }

    /// Selected location, if any.
    #[must_use]
    pub fn location(&self) -> Option<&Location> {
        self.location.as_ref()
    }

    /// Set the location picked on the map.
    pub fn set_location(&mut self, location: Location) {
        self.location = Some(location);
    }

    /// Clear the picked location.
    pub fn clear_location(&mut self) {
        self.location = None;
    }

    /// Attachments in selection order.
    #[must_use]
    pub fn attachments(&self) -> &[Attachment] {
        &self.attachments
    }

    /// Append an attachment.
    pub fn add_attachment(&mut self, attachment: Attachment) {
        self.attachments.push(attachment);
    }

    /// Remove the attachment at `index`, keeping the order of the rest.
    ///
    /// Returns `None` when the index is out of range.
    pub fn remove_attachment(&mut self, index: usize) -> Option<Attachment> {
        (index < self.attachments.len()).then(|| self.attachments.remove(index))
    }

    /// Where the submission workflow currently stands for this form.
    #[must_use]
    pub fn state(&self) -> SubmissionState {
        *self.state.borrow()
    }

    /// Follow the submission state from outside the form.
    ///
    /// The receiver sees every transition a running submission makes,
    /// including the ones that happen while the form is mutably borrowed.
    #[must_use]
    pub fn watch_state(&self) -> watch::Receiver<SubmissionState> {
        self.state.subscribe()
    }

    /// True while uploads or the insert are in flight.
    ///
    /// A UI should disable its submit control while this holds.
    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.state().is_in_flight()
    }

    /// Clear every field and return to [`SubmissionState::Idle`].
    ///
    /// Existing [`watch_state`](Self::watch_state) receivers stay attached.
    pub fn reset(&mut self) {
        self.title.clear();
        self.description.clear();
        self.department = None;
        self.location = None;
        self.attachments.clear();
        self.set_state(SubmissionState::Idle);
    }

    /// Check if every user-entered field is empty.
    #[must_use]
    pub fn is_blank(&self) -> bool {
        self.title.is_empty()
            && self.description.is_empty()
            && self.department.is_none()
            && self.location.is_none()
            && self.attachments.is_empty()
    }

    pub(crate) fn set_state(&mut self, state: SubmissionState) {
        self.state.send_replace(state);
    }
}

/// The record inserted into the `issues` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedIssueInput {
    /// Identifier of the submitting user.
    pub user_id: String,
    /// Issue title.
    pub title: String,
    /// Detailed description.
    pub description: String,
    /// Department, serialized as its slug.
    pub department: Department,
    /// Address of the picked location.
    pub location_name: String,
    /// Latitude of the picked location.
    pub latitude: f64,
    /// Longitude of the picked location.
    pub longitude: f64,
    /// Public URLs of the uploaded attachments, in selection order.
    pub media_urls: Vec<String>,
}

impl PersistedIssueInput {
    /// The location fields as a [`Location`].
    #[must_use]
    pub fn location(&self) -> Location {
        Location {
            latitude: self.latitude,
            longitude: self.longitude,
            address: self.location_name.clone(),
        }
    }
}

/// An issue as stored by the record store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedIssue {
    /// Identifier assigned by the record store.
    pub id: String,
    /// When the record store accepted the issue.
    pub created_at: DateTime<Utc>,
    /// The submitted fields.
    #[serde(flatten)]
    pub record: PersistedIssueInput,
}
