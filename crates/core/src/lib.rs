//! Debtorbook Core - Trade debtor domain entities, payload shaping, and traits.
//!
//! This crate contains the business logic of the trade debtor feature:
//! request payload normalization and validation, the document merge policy
//! for multipart uploads, the persistence-service contract, and an
//! in-memory reference implementation. It is storage-agnostic; durable
//! persistence and real object storage live behind the traits defined here.

pub mod constants;
pub mod errors;
pub mod storage;
pub mod trade_debtors;

// Re-export error types
pub use errors::Error;
pub use errors::Result;
