//! Multipart intake: splits a form into text fields and stored files.

use axum::extract::Multipart;

use debtorbook_core::storage::FileStorage;
use debtorbook_core::trade_debtors::{FieldMap, UploadsByField};

use crate::error::{ApiError, ApiResult};

/// Everything a multipart request carried: text fields as raw JSON values
/// and uploaded files already persisted to storage, grouped by form field.
#[derive(Default)]
pub struct MultipartIntake {
    pub fields: FieldMap,
    pub files: UploadsByField,
}

impl MultipartIntake {
    /// Storage keys of every file persisted during intake. Used for
    /// best-effort cleanup when the request fails later on.
    pub fn stored_keys(&self) -> Vec<String> {
        self.files
            .values()
            .flatten()
            .filter_map(|f| f.storage_key.clone())
            .collect()
    }
}

/// Walks the multipart stream, storing file parts as they arrive.
///
/// Text parts land in `fields` as JSON strings; structured-field parsing
/// happens later in the payload layer. If the stream fails midway, files
/// already stored are deleted before the error is returned.
pub async fn read_multipart(
    mut multipart: Multipart,
    storage: &dyn FileStorage,
) -> ApiResult<MultipartIntake> {
    let mut intake = MultipartIntake::default();

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => {
                discard_stored(&intake, storage).await;
                return Err(ApiError::BadRequest(format!("Malformed multipart body: {e}")));
            }
        };

        let name = match field.name() {
            Some(name) => name.to_string(),
            None => continue,
        };

        if let Some(file_name) = field.file_name().map(str::to_string) {
            let content_type = field
                .content_type()
                .unwrap_or("application/octet-stream")
                .to_string();
            let data = match field.bytes().await {
                Ok(data) => data,
                Err(e) => {
                    discard_stored(&intake, storage).await;
                    return Err(ApiError::BadRequest(format!(
                        "Failed reading upload '{file_name}': {e}"
                    )));
                }
            };
            let stored = match storage.save(&name, &file_name, &content_type, &data).await {
                Ok(stored) => stored,
                Err(e) => {
                    discard_stored(&intake, storage).await;
                    return Err(e.into());
                }
            };
            intake.files.entry(name).or_default().push(stored);
        } else {
            let text = match field.text().await {
                Ok(text) => text,
                Err(e) => {
                    discard_stored(&intake, storage).await;
                    return Err(ApiError::BadRequest(format!(
                        "Failed reading field '{name}': {e}"
                    )));
                }
            };
            intake.fields.insert(name, serde_json::Value::String(text));
        }
    }

    Ok(intake)
}

async fn discard_stored(intake: &MultipartIntake, storage: &dyn FileStorage) {
    let keys = intake.stored_keys();
    if keys.is_empty() {
        return;
    }
    let outcome = storage.delete_many(&keys).await;
    if !outcome.failed.is_empty() {
        tracing::warn!(
            "Failed to clean up {} uploaded file(s) after aborted intake",
            outcome.failed.len()
        );
    }
}
