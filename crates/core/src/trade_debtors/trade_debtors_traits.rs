//! Trade debtor service trait.
//!
//! This trait is the persistence collaborator the HTTP layer delegates to.
//! It owns uniqueness checks, soft/hard delete semantics, status
//! transitions, document union/replace/remove resolution and statistics;
//! the handlers never read prior state themselves.

use async_trait::async_trait;

use super::trade_debtors_model::{
    DebtorPage, DebtorStatistics, DebtorStatus, ListFilters, NewTradeDebtor, TradeDebtor,
    TradeDebtorUpdate,
};
use crate::errors::Result;
use crate::storage::DeleteOutcome;

#[async_trait]
pub trait TradeDebtorServiceTrait: Send + Sync {
    /// Creates a trade debtor; fails on a duplicate account code.
    async fn create(&self, new_debtor: NewTradeDebtor, actor: &str) -> Result<TradeDebtor>;

    /// Applies a partial update, resolving document merge directives
    /// against the stored lists.
    async fn update(
        &self,
        id: &str,
        update: TradeDebtorUpdate,
        actor: &str,
    ) -> Result<TradeDebtor>;

    /// Fetches a live (not soft-deleted) debtor.
    fn get_by_id(&self, id: &str) -> Result<TradeDebtor>;

    /// Pages through live debtors with filters and sorting.
    fn list(&self, filters: &ListFilters) -> Result<DebtorPage>;

    /// Live debtors with active status.
    fn get_active(&self) -> Result<Vec<TradeDebtor>>;

    /// Marks a debtor deleted without touching stored files.
    async fn soft_delete(&self, id: &str, actor: &str) -> Result<TradeDebtor>;

    /// Removes a debtor permanently and deletes its stored files,
    /// reporting per-key successes and failures.
    async fn hard_delete(&self, id: &str) -> Result<DeleteOutcome>;

    /// Sets an explicit status.
    async fn set_status(&self, id: &str, status: DebtorStatus, actor: &str)
        -> Result<TradeDebtor>;

    /// Flips the status (suspended accounts come back active).
    async fn toggle_status(&self, id: &str, actor: &str) -> Result<TradeDebtor>;

    /// Case-insensitive search over account code, customer name and title.
    fn search(&self, term: &str) -> Result<Vec<TradeDebtor>>;

    /// Aggregated status and classification counts.
    fn statistics(&self) -> Result<DebtorStatistics>;
}
