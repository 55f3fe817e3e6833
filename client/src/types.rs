//! Typed views of the JSON documents returned by the NameNode.
//!
//! The client hands back `serde_json::Value` untouched; these structs are for
//! callers who want fields instead, via `serde_json::from_value`.

use serde::Deserialize;

#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum FileType {
    File,
    Directory,
    Symlink,
}

/// A single entry of `GETFILESTATUS` / `LISTSTATUS`.
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FileStatus {
    #[serde(default)]
    pub access_time: u64,
    #[serde(default)]
    pub block_size: u64,
    #[serde(default)]
    pub group: String,
    pub length: u64,
    /// Milliseconds since the Unix epoch.
    pub modification_time: u64,
    #[serde(default)]
    pub owner: String,
    /// Name relative to the listed directory; empty for `GETFILESTATUS`.
    #[serde(default)]
    pub path_suffix: String,
    /// Octal permission string, e.g. `"755"`.
    pub permission: String,
    #[serde(default)]
    pub replication: u16,
    #[serde(rename = "type")]
    pub kind: FileType,
}

#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct FileStatusResponse {
    #[serde(rename = "FileStatus")]
    pub file_status: FileStatus,
}

#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct FileStatuses {
    #[serde(rename = "FileStatus")]
    pub file_status: Vec<FileStatus>,
}

#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ListStatusResponse {
    #[serde(rename = "FileStatuses")]
    pub file_statuses: FileStatuses,
}

#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ContentSummary {
    pub directory_count: u64,
    pub file_count: u64,
    pub length: u64,
    pub quota: i64,
    pub space_consumed: u64,
    pub space_quota: i64,
}

#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ContentSummaryResponse {
    #[serde(rename = "ContentSummary")]
    pub content_summary: ContentSummary,
}

#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct FileChecksum {
    pub algorithm: String,
    pub bytes: String,
    pub length: u64,
}

#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct FileChecksumResponse {
    #[serde(rename = "FileChecksum")]
    pub file_checksum: FileChecksum,
}
