use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::{Error, Result, ValidationError};
use crate::storage::StoredUpload;

/// Lifecycle status of a trade debtor account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DebtorStatus {
    #[default]
    Active,
    Inactive,
    Suspended,
}

impl DebtorStatus {
    /// Parses a status from its wire form; anything outside the fixed
    /// enumeration is rejected.
    pub fn parse(raw: &str) -> Result<Self> {
        match raw {
            "active" => Ok(DebtorStatus::Active),
            "inactive" => Ok(DebtorStatus::Inactive),
            "suspended" => Ok(DebtorStatus::Suspended),
            _ => Err(Error::Validation(ValidationError::InvalidStatus)),
        }
    }

    /// Status after a toggle. Suspended accounts come back active.
    pub fn toggled(self) -> Self {
        match self {
            DebtorStatus::Active => DebtorStatus::Inactive,
            DebtorStatus::Inactive | DebtorStatus::Suspended => DebtorStatus::Active,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DebtorStatus::Active => "active",
            DebtorStatus::Inactive => "inactive",
            DebtorStatus::Suspended => "suspended",
        }
    }
}

/// Uniform document record attached wherever files live on the entity.
///
/// fileName/filePath/fileType are always present; s3Key is absent for
/// backends that do not key objects. uploadedAt is stamped at processing
/// time, not upload time.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub file_name: String,
    pub file_path: String,
    pub file_type: String,
    #[serde(default)]
    pub s3_key: Option<String>,
    pub uploaded_at: DateTime<Utc>,
}

impl Document {
    pub fn from_stored(upload: &StoredUpload) -> Self {
        Self {
            file_name: upload.file_name.clone(),
            file_path: upload.file_path.clone(),
            file_type: upload.content_type.clone(),
            s3_key: upload.storage_key.clone(),
            uploaded_at: Utc::now(),
        }
    }
}

/// Address record. All fields are optional at the type level; which ones
/// must be present depends on the path (create vs update), so validation
/// takes the required set as a parameter.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    pub street_address: Option<String>,
    pub city: Option<String>,
    pub country: Option<String>,
    pub zip_code: Option<String>,
    pub phone_number1: Option<String>,
    pub phone_number2: Option<String>,
    pub email: Option<String>,
    pub telephone: Option<String>,
    pub website: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

/// Required address fields on the create path.
pub const ADDRESS_REQUIRED_ON_CREATE: &[&str] = &[
    "streetAddress",
    "city",
    "country",
    "zipCode",
    "phoneNumber1",
    "phoneNumber2",
    "email",
    "telephone",
    "website",
];

/// Reduced required set applied on the update path.
pub const ADDRESS_REQUIRED_ON_UPDATE: &[&str] = &["streetAddress", "city", "country", "zipCode"];

impl Address {
    fn field(&self, name: &str) -> Option<&str> {
        let v = match name {
            "streetAddress" => &self.street_address,
            "city" => &self.city,
            "country" => &self.country,
            "zipCode" => &self.zip_code,
            "phoneNumber1" => &self.phone_number1,
            "phoneNumber2" => &self.phone_number2,
            "email" => &self.email,
            "telephone" => &self.telephone,
            "website" => &self.website,
            _ => return None,
        };
        v.as_deref()
    }

    pub fn validate(&self, index: usize, required: &[&str]) -> Result<()> {
        for &name in required {
            if self.field(name).map_or(true, |v| v.trim().is_empty()) {
                return Err(Error::Validation(ValidationError::InvalidAddressData {
                    index,
                    detail: format!("missing required field '{}'", name),
                }));
            }
        }
        Ok(())
    }
}

/// Employee record; name/designation/email/mobile are all required wherever
/// an employee list is supplied.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Employee {
    pub name: Option<String>,
    pub designation: Option<String>,
    pub email: Option<String>,
    pub mobile: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

pub const EMPLOYEE_REQUIRED: &[&str] = &["name", "designation", "email", "mobile"];

impl Employee {
    fn field(&self, name: &str) -> Option<&str> {
        let v = match name {
            "name" => &self.name,
            "designation" => &self.designation,
            "email" => &self.email,
            "mobile" => &self.mobile,
            _ => return None,
        };
        v.as_deref()
    }

    pub fn validate(&self, index: usize) -> Result<()> {
        for &name in EMPLOYEE_REQUIRED {
            if self.field(name).map_or(true, |v| v.trim().is_empty()) {
                return Err(Error::Validation(ValidationError::InvalidEmployeeData {
                    index,
                    detail: format!("missing required field '{}'", name),
                }));
            }
        }
        Ok(())
    }
}

/// VAT/GST details: a document list plus whatever structured data the
/// client supplies, passed through unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VatGstDetails {
    #[serde(default)]
    pub documents: Vec<Document>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

/// One KYC entry; the documents list is optional on the wire.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KycEntry {
    #[serde(default)]
    pub documents: Vec<Document>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

/// Persisted trade debtor entity, as produced by the persistence service.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TradeDebtor {
    pub id: String,
    /// Always stored trimmed and upper-cased.
    pub account_code: String,
    pub account_type: Option<String>,
    pub title: String,
    pub customer_name: String,
    pub classification: Option<String>,
    pub remarks: Option<String>,
    pub ac_definition: Option<Value>,
    pub limits_margins: Option<Value>,
    pub bank_details: Option<Value>,
    pub addresses: Vec<Address>,
    pub employees: Vec<Employee>,
    pub vat_gst_details: VatGstDetails,
    pub kyc_details: Vec<KycEntry>,
    pub general_documents: Vec<Document>,
    pub status: DebtorStatus,
    pub is_deleted: bool,
    pub deleted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub created_by: Option<String>,
    pub updated_by: Option<String>,
}

impl TradeDebtor {
    /// Storage keys of every document attached to this entity.
    pub fn all_storage_keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = Vec::new();
        let docs = self
            .vat_gst_details
            .documents
            .iter()
            .chain(self.kyc_details.iter().flat_map(|k| k.documents.iter()))
            .chain(self.general_documents.iter());
        for doc in docs {
            if let Some(key) = &doc.s3_key {
                keys.push(key.clone());
            }
        }
        keys
    }
}

/// Client merge directives for document lists, stripped from the payload
/// before it reaches the persistence service and forwarded out-of-band.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentDirectives {
    /// The uploaded VAT batch replaces the stored list instead of
    /// unioning with it.
    pub replace_vat: bool,
    pub replace_kyc: bool,
    /// Identifiers (storage key or file name) to remove from the stored
    /// VAT document list.
    pub remove_vat: Vec<String>,
    pub remove_kyc: Vec<String>,
}

impl DocumentDirectives {
    pub fn is_noop(&self) -> bool {
        !self.replace_vat
            && !self.replace_kyc
            && self.remove_vat.is_empty()
            && self.remove_kyc.is_empty()
    }
}

/// Validated input for creating a trade debtor.
#[derive(Debug, Clone, Default)]
pub struct NewTradeDebtor {
    pub account_code: String,
    pub account_type: Option<String>,
    pub title: String,
    pub customer_name: String,
    pub classification: Option<String>,
    pub remarks: Option<String>,
    pub ac_definition: Option<Value>,
    pub limits_margins: Option<Value>,
    pub bank_details: Option<Value>,
    pub addresses: Vec<Address>,
    pub employees: Vec<Employee>,
    pub vat_gst_details: VatGstDetails,
    pub kyc_details: Vec<KycEntry>,
    pub general_documents: Vec<Document>,
    pub directives: DocumentDirectives,
}

/// Validated partial input for updating a trade debtor. Only supplied
/// fields are touched by the persistence service.
#[derive(Debug, Clone, Default)]
pub struct TradeDebtorUpdate {
    pub account_code: Option<String>,
    pub account_type: Option<String>,
    pub title: Option<String>,
    pub customer_name: Option<String>,
    pub classification: Option<String>,
    pub remarks: Option<String>,
    pub ac_definition: Option<Value>,
    pub limits_margins: Option<Value>,
    pub bank_details: Option<Value>,
    pub addresses: Option<Vec<Address>>,
    pub employees: Option<Vec<Employee>>,
    pub vat_gst_details: Option<VatGstDetails>,
    pub kyc_details: Option<Vec<KycEntry>>,
    pub directives: DocumentDirectives,
}

/// Sort direction for listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

/// Pagination, filter and sort parameters for the list endpoint.
#[derive(Debug, Clone)]
pub struct ListFilters {
    pub page: i64,
    pub limit: i64,
    pub search: Option<String>,
    pub status: Option<DebtorStatus>,
    pub classification: Option<String>,
    pub sort_by: String,
    pub sort_order: SortOrder,
}

impl Default for ListFilters {
    fn default() -> Self {
        Self {
            page: 1,
            limit: crate::constants::DEFAULT_PAGE_SIZE,
            search: None,
            status: None,
            classification: None,
            sort_by: "createdAt".to_string(),
            sort_order: SortOrder::Desc,
        }
    }
}

/// Pagination envelope returned alongside listings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page: i64,
    pub limit: i64,
    pub total: i64,
    pub total_pages: i64,
}

/// One page of trade debtors.
#[derive(Debug, Clone)]
pub struct DebtorPage {
    pub items: Vec<TradeDebtor>,
    pub pagination: Pagination,
}

/// Aggregated counts produced by the statistics endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct DebtorStatistics {
    pub total: i64,
    pub active: i64,
    pub inactive: i64,
    pub suspended: i64,
    pub soft_deleted: i64,
    pub by_classification: BTreeMap<String, i64>,
}
