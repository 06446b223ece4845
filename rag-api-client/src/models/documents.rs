//! DTOs for document upload and removal.

use serde::{Deserialize, Serialize};

/// A local file to upload: display name plus raw bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentUpload {
    pub name: String,
    pub content: Vec<u8>,
}

impl DocumentUpload {
    pub fn new(name: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
        }
    }
}

/// Request payload of `/upload` (raw texts).
#[derive(Debug, Clone, Serialize)]
pub struct UploadTextsRequest<'a> {
    pub texts: &'a [String],
}

/// Response payload of `/upload` and `/upload_files`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct UploadResponse {
    /// Number of documents the backend indexed (`0` when the field is absent).
    #[serde(default)]
    pub count: usize,
    #[serde(default)]
    pub status: Option<String>,
}

/// Response payload of `/remove_files`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RemoveResponse {
    #[serde(default)]
    pub status: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upload_response_without_count() {
        let r: UploadResponse =
            serde_json::from_str(r#"{"status":"No valid text extracted from uploaded files."}"#)
                .unwrap();
        assert_eq!(r.count, 0);

        let r: UploadResponse =
            serde_json::from_str(r#"{"status":"Files processed","count":2,"files":["a","b"]}"#)
                .unwrap();
        assert_eq!(r.count, 2);
    }
}
