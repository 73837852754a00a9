/// Multipart field carrying VAT/GST documents
pub const VAT_DOCUMENTS_FIELD: &str = "vatGstDetails.documents";

/// Multipart field carrying KYC documents
pub const KYC_DOCUMENTS_FIELD: &str = "kycDetails.documents";

/// Multipart fields treated as uncategorized uploads
pub const GENERAL_DOCUMENT_FIELDS: &[&str] = &["file", "files", "documents"];

/// Minimum length of a search term
pub const MIN_SEARCH_TERM_LEN: usize = 2;

/// Default page size for listings
pub const DEFAULT_PAGE_SIZE: i64 = 10;
