//! Trade debtors module - domain models, payload shaping, merge policy,
//! service trait and the in-memory reference service.

mod trade_debtors_documents;
mod trade_debtors_model;
mod trade_debtors_payload;
mod trade_debtors_service;
mod trade_debtors_traits;

// Re-export the public interface
pub use trade_debtors_documents::{
    attach_create_uploads, attach_update_uploads, classify_uploads, unclassified_upload_keys,
    UploadBuckets, UploadSummary, UploadTarget, UploadsByField,
};
pub use trade_debtors_model::{
    Address, DebtorPage, DebtorStatistics, DebtorStatus, Document, DocumentDirectives, Employee,
    KycEntry, ListFilters, NewTradeDebtor, Pagination, SortOrder, TradeDebtor, TradeDebtorUpdate,
    VatGstDetails, ADDRESS_REQUIRED_ON_CREATE, ADDRESS_REQUIRED_ON_UPDATE, EMPLOYEE_REQUIRED,
};
pub use trade_debtors_payload::{
    normalize_account_code, normalize_structured_fields, FieldMap, ParseMode, STRUCTURED_FIELDS,
};
pub use trade_debtors_service::InMemoryTradeDebtorService;
pub use trade_debtors_traits::TradeDebtorServiceTrait;
