//! Response envelopes shared by the API handlers.

use serde::Serialize;

use debtorbook_core::storage::{DeleteOutcome, FailedDeletion};
use debtorbook_core::trade_debtors::{DocumentDirectives, Pagination, UploadSummary};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DataResponse<T: Serialize> {
    pub success: bool,
    pub message: String,
    pub data: T,
}

impl<T: Serialize> DataResponse<T> {
    pub fn ok(message: impl Into<String>, data: T) -> Self {
        Self {
            success: true,
            message: message.into(),
            data,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListResponse<T: Serialize> {
    pub success: bool,
    pub message: String,
    pub data: Vec<T>,
    pub pagination: Pagination,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateResponse<T: Serialize> {
    pub success: bool,
    pub message: String,
    pub data: T,
    pub uploaded_files: UploadSummary,
}

/// Echo of the document merge directives the update request carried.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FilesManagement {
    pub replace_vat_documents: bool,
    pub replace_kyc_documents: bool,
    pub remove_vat_documents: Vec<String>,
    pub remove_kyc_documents: Vec<String>,
}

impl From<&DocumentDirectives> for FilesManagement {
    fn from(d: &DocumentDirectives) -> Self {
        Self {
            replace_vat_documents: d.replace_vat,
            replace_kyc_documents: d.replace_kyc,
            remove_vat_documents: d.remove_vat.clone(),
            remove_kyc_documents: d.remove_kyc.clone(),
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateResponse<T: Serialize> {
    pub success: bool,
    pub message: String,
    pub data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub files_uploaded: Option<UploadSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub files_management: Option<FilesManagement>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FilesDeleted {
    pub total: usize,
    pub successful: usize,
    pub failed: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<FailedDeletion>>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HardDeleteResponse {
    pub success: bool,
    pub message: String,
    pub files_deleted: FilesDeleted,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub s3_errors: Option<Vec<FailedDeletion>>,
}

impl HardDeleteResponse {
    pub fn from_outcome(outcome: DeleteOutcome) -> Self {
        let failed = outcome.failed.len();
        let has_failures = failed > 0;
        Self {
            success: true,
            message: "Trade debtor permanently deleted".to_string(),
            files_deleted: FilesDeleted {
                total: outcome.total(),
                successful: outcome.successful.len(),
                failed,
                details: has_failures.then(|| outcome.failed.clone()),
            },
            warning: has_failures
                .then(|| format!("{} file(s) could not be deleted from storage", failed)),
            s3_errors: has_failures.then_some(outcome.failed),
        }
    }
}

/// One entry in a bulk operation response; bulk endpoints always answer
/// 200 and report per-id outcomes.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkItemResult<T: Serialize> {
    pub id: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkResponse<T: Serialize> {
    pub success: bool,
    pub message: String,
    pub succeeded: usize,
    pub failed: usize,
    pub data: Vec<BulkItemResult<T>>,
}

impl<T: Serialize> BulkResponse<T> {
    pub fn new(message: impl Into<String>, results: Vec<BulkItemResult<T>>) -> Self {
        let succeeded = results.iter().filter(|r| r.success).count();
        Self {
            success: true,
            message: message.into(),
            succeeded,
            failed: results.len() - succeeded,
            data: results,
        }
    }
}
