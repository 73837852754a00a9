//! Upload classification and the document merge policy.
//!
//! Uploaded files arrive grouped by multipart field name. Files under the
//! dotted document fields attach to their section; anything under the
//! uncategorized fields lands in generalDocuments on create but merges into
//! the VAT list on update. Replace/remove directives ride next to the other
//! form fields and are stripped before the payload is forwarded.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::trade_debtors_model::{
    Document, DocumentDirectives, KycEntry, NewTradeDebtor, TradeDebtorUpdate, VatGstDetails,
};
use super::trade_debtors_payload::FieldMap;
use crate::constants::{GENERAL_DOCUMENT_FIELDS, KYC_DOCUMENTS_FIELD, VAT_DOCUMENTS_FIELD};
use crate::storage::StoredUpload;

/// Uploads grouped by multipart field name.
pub type UploadsByField = HashMap<String, Vec<StoredUpload>>;

/// Which handler path the classification serves. Uncategorized uploads go
/// to generalDocuments on create but to the VAT list on update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadTarget {
    Create,
    Update,
}

/// Classified document records, ready to attach to a payload.
#[derive(Debug, Clone, Default)]
pub struct UploadBuckets {
    pub vat: Vec<Document>,
    pub kyc: Vec<Document>,
    pub general: Vec<Document>,
}

impl UploadBuckets {
    pub fn total(&self) -> usize {
        self.vat.len() + self.kyc.len() + self.general.len()
    }
}

/// Counts reported back to the client after attaching uploads.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadSummary {
    pub total: usize,
    pub vat_gst_documents: usize,
    pub kyc_documents: usize,
    pub general_documents: usize,
}

/// True when a multipart field name maps to one of the document buckets.
fn is_document_field(field: &str) -> bool {
    field == VAT_DOCUMENTS_FIELD
        || field == KYC_DOCUMENTS_FIELD
        || GENERAL_DOCUMENT_FIELDS.contains(&field)
}

/// Storage keys of uploads under fields no bucket accepts. These never
/// attach to the entity, so callers delete them instead of leaving
/// orphans in storage.
pub fn unclassified_upload_keys(files: &UploadsByField) -> Vec<String> {
    files
        .iter()
        .filter(|(field, _)| !is_document_field(field))
        .flat_map(|(_, uploads)| uploads.iter().filter_map(|u| u.storage_key.clone()))
        .collect()
}

/// Sorts stored uploads into vat/kyc/general buckets.
pub fn classify_uploads(files: &UploadsByField, target: UploadTarget) -> UploadBuckets {
    let mut buckets = UploadBuckets::default();
    for (field, uploads) in files {
        let docs = uploads.iter().map(Document::from_stored);
        if field == VAT_DOCUMENTS_FIELD {
            buckets.vat.extend(docs);
        } else if field == KYC_DOCUMENTS_FIELD {
            buckets.kyc.extend(docs);
        } else if GENERAL_DOCUMENT_FIELDS.contains(&field.as_str()) {
            match target {
                UploadTarget::Create => buckets.general.extend(docs),
                UploadTarget::Update => buckets.vat.extend(docs),
            }
        } else {
            // Stored but never attached; callers collect these via
            // unclassified_upload_keys and delete them.
            log::debug!("Ignoring {} upload(s) under unknown field '{}'", uploads.len(), field);
        }
    }
    buckets
}

fn take_flag(fields: &mut FieldMap, name: &str) -> bool {
    match fields.remove(name) {
        Some(Value::Bool(b)) => b,
        Some(Value::String(s)) => s == "true",
        _ => false,
    }
}

fn take_id_list(fields: &mut FieldMap, name: &str) -> Vec<String> {
    let collect = |items: Vec<Value>| {
        items
            .into_iter()
            .filter_map(|v| match v {
                Value::String(s) => Some(s),
                Value::Number(n) => Some(n.to_string()),
                _ => None,
            })
            .collect()
    };
    match fields.remove(name) {
        Some(Value::Array(items)) => collect(items),
        Some(Value::String(s)) => {
            // A multipart text field may carry a JSON list.
            match serde_json::from_str::<Value>(&s) {
                Ok(Value::Array(items)) => collect(items),
                _ => vec![s],
            }
        }
        Some(Value::Number(n)) => vec![n.to_string()],
        _ => Vec::new(),
    }
}

impl DocumentDirectives {
    /// Pulls the client-only directive fields out of the raw field map,
    /// normalizing scalars to lists. The map no longer contains them
    /// afterwards.
    pub fn extract(fields: &mut FieldMap) -> Self {
        Self {
            replace_vat: take_flag(fields, "replaceVatDocuments"),
            replace_kyc: take_flag(fields, "replaceKycDocuments"),
            remove_vat: take_id_list(fields, "removeVatDocuments"),
            remove_kyc: take_id_list(fields, "removeKycDocuments"),
        }
    }
}

/// Attaches KYC documents to the first entry, creating one if none exists.
fn push_kyc_documents(entries: &mut Vec<KycEntry>, docs: Vec<Document>) {
    if docs.is_empty() {
        return;
    }
    if entries.is_empty() {
        entries.push(KycEntry::default());
    }
    entries[0].documents.extend(docs);
}

/// Folds classified create-path uploads into the payload and reports counts.
pub fn attach_create_uploads(new: &mut NewTradeDebtor, buckets: UploadBuckets) -> UploadSummary {
    let summary = UploadSummary {
        total: buckets.total(),
        vat_gst_documents: buckets.vat.len(),
        kyc_documents: buckets.kyc.len(),
        general_documents: buckets.general.len(),
    };
    new.vat_gst_details.documents.extend(buckets.vat);
    push_kyc_documents(&mut new.kyc_details, buckets.kyc);
    new.general_documents.extend(buckets.general);
    summary
}

/// Folds classified update-path uploads into the partial payload. Sections
/// the client did not send are created when a batch targets them, so the
/// persistence service sees the new files inside the section they belong to.
pub fn attach_update_uploads(
    update: &mut TradeDebtorUpdate,
    buckets: UploadBuckets,
) -> UploadSummary {
    let summary = UploadSummary {
        total: buckets.total(),
        vat_gst_documents: buckets.vat.len(),
        kyc_documents: buckets.kyc.len(),
        general_documents: 0,
    };
    if !buckets.vat.is_empty() {
        update
            .vat_gst_details
            .get_or_insert_with(VatGstDetails::default)
            .documents
            .extend(buckets.vat);
    }
    if !buckets.kyc.is_empty() {
        let entries = update.kyc_details.get_or_insert_with(Vec::new);
        push_kyc_documents(entries, buckets.kyc);
    }
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn upload(name: &str) -> StoredUpload {
        StoredUpload {
            file_name: name.to_string(),
            file_path: format!("/uploads/{name}"),
            content_type: "application/pdf".to_string(),
            storage_key: Some(format!("key-{name}")),
        }
    }

    fn fields_from(value: serde_json::Value) -> FieldMap {
        match value {
            serde_json::Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn uploads_route_to_their_sections() {
        let mut files = UploadsByField::new();
        files.insert(VAT_DOCUMENTS_FIELD.into(), vec![upload("vat.pdf")]);
        files.insert(KYC_DOCUMENTS_FIELD.into(), vec![upload("kyc.pdf")]);
        files.insert("files".into(), vec![upload("misc.pdf")]);
        files.insert("avatar".into(), vec![upload("ignored.png")]);

        let buckets = classify_uploads(&files, UploadTarget::Create);
        assert_eq!(buckets.vat.len(), 1);
        assert_eq!(buckets.kyc.len(), 1);
        assert_eq!(buckets.general.len(), 1);
        assert_eq!(buckets.total(), 3);
    }

    #[test]
    fn unclassified_keys_cover_unknown_fields_only() {
        let mut files = UploadsByField::new();
        files.insert(VAT_DOCUMENTS_FIELD.into(), vec![upload("vat.pdf")]);
        files.insert("files".into(), vec![upload("misc.pdf")]);
        files.insert("avatar".into(), vec![upload("stray.png")]);

        let keys = unclassified_upload_keys(&files);
        assert_eq!(keys, vec!["key-stray.png"]);
    }

    #[test]
    fn uncategorized_uploads_merge_into_vat_on_update() {
        let mut files = UploadsByField::new();
        files.insert("documents".into(), vec![upload("misc.pdf")]);

        let buckets = classify_uploads(&files, UploadTarget::Update);
        assert_eq!(buckets.vat.len(), 1);
        assert!(buckets.general.is_empty());
    }

    #[test]
    fn kyc_uploads_create_a_single_entry_when_none_exists() {
        let mut files = UploadsByField::new();
        files.insert(
            KYC_DOCUMENTS_FIELD.into(),
            vec![upload("a.pdf"), upload("b.pdf"), upload("c.pdf")],
        );
        let buckets = classify_uploads(&files, UploadTarget::Create);

        let mut new = NewTradeDebtor::default();
        let summary = attach_create_uploads(&mut new, buckets);
        assert_eq!(new.kyc_details.len(), 1);
        assert_eq!(new.kyc_details[0].documents.len(), 3);
        assert_eq!(summary.kyc_documents, 3);
        assert_eq!(summary.total, 3);
    }

    #[test]
    fn kyc_uploads_append_to_the_first_existing_entry() {
        let mut files = UploadsByField::new();
        files.insert(KYC_DOCUMENTS_FIELD.into(), vec![upload("d.pdf")]);
        let buckets = classify_uploads(&files, UploadTarget::Create);

        let mut new = NewTradeDebtor {
            kyc_details: vec![KycEntry::default(), KycEntry::default()],
            ..Default::default()
        };
        attach_create_uploads(&mut new, buckets);
        assert_eq!(new.kyc_details[0].documents.len(), 1);
        assert!(new.kyc_details[1].documents.is_empty());
    }

    #[test]
    fn directives_accept_bool_or_literal_true() {
        let mut fields = fields_from(json!({
            "replaceVatDocuments": true,
            "replaceKycDocuments": "true",
            "title": "unchanged"
        }));
        let directives = DocumentDirectives::extract(&mut fields);
        assert!(directives.replace_vat);
        assert!(directives.replace_kyc);
        // Directive fields are stripped; other fields survive.
        assert!(!fields.contains_key("replaceVatDocuments"));
        assert!(fields.contains_key("title"));

        let mut fields = fields_from(json!({ "replaceVatDocuments": "yes" }));
        assert!(!DocumentDirectives::extract(&mut fields).replace_vat);
    }

    #[test]
    fn removal_directives_normalize_to_lists() {
        let mut fields = fields_from(json!({ "removeVatDocuments": "key-1" }));
        let d = DocumentDirectives::extract(&mut fields);
        assert_eq!(d.remove_vat, vec!["key-1"]);

        let mut fields = fields_from(json!({ "removeKycDocuments": ["key-1", "key-2"] }));
        let d = DocumentDirectives::extract(&mut fields);
        assert_eq!(d.remove_kyc, vec!["key-1", "key-2"]);

        // JSON list smuggled through a multipart text field.
        let mut fields = fields_from(json!({ "removeVatDocuments": "[\"key-3\",\"key-4\"]" }));
        let d = DocumentDirectives::extract(&mut fields);
        assert_eq!(d.remove_vat, vec!["key-3", "key-4"]);
    }

    #[test]
    fn update_uploads_create_missing_sections() {
        let mut files = UploadsByField::new();
        files.insert(VAT_DOCUMENTS_FIELD.into(), vec![upload("vat.pdf")]);
        files.insert(KYC_DOCUMENTS_FIELD.into(), vec![upload("kyc.pdf")]);
        let buckets = classify_uploads(&files, UploadTarget::Update);

        let mut update = TradeDebtorUpdate::default();
        let summary = attach_update_uploads(&mut update, buckets);
        assert_eq!(update.vat_gst_details.as_ref().unwrap().documents.len(), 1);
        assert_eq!(update.kyc_details.as_ref().unwrap()[0].documents.len(), 1);
        assert_eq!(summary.total, 2);
        assert_eq!(summary.general_documents, 0);
    }
}
