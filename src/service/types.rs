//! Request and response shapes exchanged with the generation service.

use serde::{Deserialize, Serialize};

use crate::models::{ExhibitKind, RemoteFileDescriptor};

/// Package-level settings sent as the `config` multipart field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionConfig {
    pub package_id: String,
    pub name: String,
    pub numbering_style: String,
    pub delivery_method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recipient_email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub visa_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub beneficiary_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub case_id: Option<String>,
}

/// One row of the `exhibits` multipart field, in package order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExhibitManifestEntry {
    /// Zero-based position in the package
    pub order: usize,
    /// Display number derived from the position ("A", "12", "IV")
    pub number: String,
    pub label: String,
    #[serde(rename = "type")]
    pub kind: ExhibitKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(rename = "importedFromDrive")]
    pub imported_from_drive: bool,
}

/// Binary content of a locally held exhibit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilePart {
    pub filename: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// Everything sent to `POST /api/pdf/generate`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    pub config: SubmissionConfig,
    pub exhibits: Vec<ExhibitManifestEntry>,
    pub files: Vec<FilePart>,
}

/// Response of `GET /api/drive/config`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriveConfig {
    pub available: bool,
    #[serde(default)]
    pub client_id: Option<String>,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub app_id: Option<String>,
    #[serde(default)]
    pub scope: Option<String>,
}

/// Body of `POST /api/drive/import`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriveImportRequest {
    pub access_token: String,
    pub files: Vec<RemoteFileDescriptor>,
}

/// Per-file outcome of a drive import
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriveFileResult {
    pub name: String,
    pub success: bool,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub size: Option<u64>,
    #[serde(default, rename = "type")]
    pub file_type: Option<String>,
    /// Name the file was stored under on the service
    #[serde(default)]
    pub local_filename: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

/// Response of `POST /api/drive/import`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriveImportResponse {
    #[serde(default)]
    pub files: Vec<DriveFileResult>,
}
