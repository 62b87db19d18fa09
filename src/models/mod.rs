use serde::{Deserialize, Serialize};

/// History entry payload written by the fragment navigator.
///
/// The server-rendered layout writes the same `{ content }` shape, so entries
/// created before the wasm bundle loaded are read back the same way.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub(crate) struct NavHistoryState {
    pub content: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub(crate) struct InitUploadRequest {
    /// Omitted on the first batch; the backend then allocates a group.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group_id: Option<String>,
    pub ref_entity: Option<String>,
    pub ref_id: Option<String>,
    pub file_names: Vec<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub(crate) struct UploadInfo {
    pub file_id: String,
    pub presigned_url: String,
    pub s3_key: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub(crate) struct UploadSession {
    pub group_id: String,
    #[serde(default)]
    pub upload_infos: Vec<UploadInfo>,
}

/// Metadata reported to the completion endpoint for one stored object.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub(crate) struct FileMetadata {
    pub file_id: String,
    pub original_name: String,
    pub s3_key: String,
    pub content_type: String,
    pub size: u64,
    /// Lowercase hex SHA-256 of the uploaded bytes.
    pub checksum: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub(crate) struct FileItem {
    pub file_id: String,
    // Both nullable in the backend record.
    #[serde(default)]
    pub original_name: Option<String>,
    #[serde(default)]
    pub size: Option<u64>,
    // The Spring DTO calls it `mimeType`.
    #[serde(default, alias = "mimeType")]
    pub content_type: Option<String>,
}

impl FileItem {
    /// Name shown in the attachment list; falls back to the file id.
    pub fn display_name(&self) -> &str {
        self.original_name
            .as_deref()
            .filter(|n| !n.is_empty())
            .unwrap_or(&self.file_id)
    }
}

/// Group listing; only the items are read back, the rest of the record is ignored.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub(crate) struct FileGroup {
    #[serde(default)]
    pub items: Vec<FileItem>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_request_never_carries_company_id() {
        let req = InitUploadRequest {
            group_id: None,
            ref_entity: Some("plant".to_string()),
            ref_id: Some("P0001".to_string()),
            file_names: vec!["a.pdf".to_string()],
        };
        let v = serde_json::to_value(req).expect("should serialize");
        assert!(v.get("groupId").is_none());
        assert!(v.get("companyId").is_none());
        assert_eq!(v["refEntity"], "plant");
        assert_eq!(v["fileNames"][0], "a.pdf");
    }

    #[test]
    fn test_upload_session_contract_deserialize() {
        let json = r#"{
            "groupId": "F250119001",
            "uploadInfos": [
                {"fileId": "f1", "fileName": "a.png", "s3Key": "C0001/plant/F250119001/a.png", "presignedUrl": "https://s3.local/put?sig=1"}
            ]
        }"#;
        let parsed: UploadSession = serde_json::from_str(json).expect("session should parse");
        assert_eq!(parsed.group_id, "F250119001");
        assert_eq!(parsed.upload_infos.len(), 1);
        assert_eq!(parsed.upload_infos[0].presigned_url, "https://s3.local/put?sig=1");
    }

    #[test]
    fn test_file_group_accepts_backend_field_names() {
        // Contract based on FileGroupResponse / FileItemResponse records.
        let json = r#"{
            "fileGroupId": "F1",
            "refEntity": "plant",
            "refId": "P1",
            "items": [{"fileId": "x", "lineNo": 1, "originalName": "r.pdf", "size": 12, "mimeType": "application/pdf"}]
        }"#;
        let parsed: FileGroup = serde_json::from_str(json).expect("group should parse");
        assert_eq!(parsed.items.len(), 1);
        assert_eq!(parsed.items[0].content_type.as_deref(), Some("application/pdf"));
        assert_eq!(parsed.items[0].size, Some(12));
    }

    #[test]
    fn test_file_group_tolerates_null_fields() {
        let json = r#"{"items":[{"fileId":"f1","originalName":null,"size":null,"mimeType":null}]}"#;
        let parsed: FileGroup = serde_json::from_str(json).expect("null fields should parse");
        let item = &parsed.items[0];
        assert_eq!(item.size, None);
        assert_eq!(item.content_type, None);
        assert_eq!(item.display_name(), "f1");
    }

    #[test]
    fn test_file_group_items_only() {
        let parsed: FileGroup = serde_json::from_str(r#"{"items": []}"#).expect("should parse");
        assert!(parsed.items.is_empty());
    }

    #[test]
    fn test_file_metadata_serialization_is_camel_case() {
        let meta = FileMetadata {
            file_id: "f1".to_string(),
            original_name: "a.png".to_string(),
            s3_key: "k".to_string(),
            content_type: "image/png".to_string(),
            size: 3,
            checksum: "ab".to_string(),
        };
        let v = serde_json::to_value(meta).expect("should serialize");
        assert_eq!(v["originalName"], "a.png");
        assert_eq!(v["s3Key"], "k");
        assert_eq!(v["contentType"], "image/png");
    }
}
