//! In-memory reference implementation of the trade debtor service.
//!
//! This is the collaborator the dev server and router tests run against.
//! It implements the full service contract (uniqueness, soft/hard delete,
//! status transitions, document merge resolution, search and statistics)
//! over a process-local map; durable persistence is out of scope.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use chrono::Utc;
use log::{debug, warn};

use super::trade_debtors_model::{
    DebtorPage, DebtorStatistics, DebtorStatus, Document, ListFilters, NewTradeDebtor,
    Pagination, SortOrder, TradeDebtor, TradeDebtorUpdate,
};
use super::trade_debtors_traits::TradeDebtorServiceTrait;
use crate::errors::{Error, Result};
use crate::storage::{DeleteOutcome, FileStorage};

pub struct InMemoryTradeDebtorService {
    store: RwLock<HashMap<String, TradeDebtor>>,
    storage: Arc<dyn FileStorage>,
}

impl InMemoryTradeDebtorService {
    pub fn new(storage: Arc<dyn FileStorage>) -> Self {
        Self {
            store: RwLock::new(HashMap::new()),
            storage,
        }
    }

    fn assert_unique_code(&self, code: &str, exclude_id: Option<&str>) -> Result<()> {
        let store = self.store.read().unwrap();
        let clash = store
            .values()
            .any(|d| d.account_code == code && Some(d.id.as_str()) != exclude_id);
        if clash {
            return Err(Error::ConstraintViolation(format!(
                "accountCode '{}' already exists",
                code
            )));
        }
        Ok(())
    }

    fn live_debtors(&self) -> Vec<TradeDebtor> {
        let store = self.store.read().unwrap();
        store.values().filter(|d| !d.is_deleted).cloned().collect()
    }

    /// Best-effort deletion of stored files; failures are logged and never
    /// escalated.
    async fn discard_files(&self, keys: &[String]) {
        if keys.is_empty() {
            return;
        }
        let outcome = self.storage.delete_many(keys).await;
        for failure in &outcome.failed {
            warn!(
                "Failed to delete stored file '{}': {}",
                failure.key, failure.error
            );
        }
    }
}

/// True when a removal identifier addresses this document (storage key or
/// original file name).
fn matches_removal(doc: &Document, id: &str) -> bool {
    doc.s3_key.as_deref() == Some(id) || doc.file_name == id
}

/// Drops documents named by the removal list, returning the storage keys of
/// everything dropped.
fn apply_removals(docs: &mut Vec<Document>, remove: &[String]) -> Vec<String> {
    if remove.is_empty() {
        return Vec::new();
    }
    let mut removed_keys = Vec::new();
    docs.retain(|doc| {
        let hit = remove.iter().any(|id| matches_removal(doc, id));
        if hit {
            if let Some(key) = &doc.s3_key {
                removed_keys.push(key.clone());
            }
        }
        !hit
    });
    removed_keys
}

fn sort_debtors(items: &mut [TradeDebtor], sort_by: &str, order: SortOrder) {
    items.sort_by(|a, b| {
        let ord = match sort_by {
            "accountCode" => a.account_code.cmp(&b.account_code),
            "customerName" => a.customer_name.cmp(&b.customer_name),
            "title" => a.title.cmp(&b.title),
            "updatedAt" => a.updated_at.cmp(&b.updated_at),
            // Unknown keys fall back to creation time.
            _ => a.created_at.cmp(&b.created_at),
        };
        let ord = ord.then_with(|| a.id.cmp(&b.id));
        match order {
            SortOrder::Asc => ord,
            SortOrder::Desc => ord.reverse(),
        }
    });
}

fn matches_search(debtor: &TradeDebtor, needle: &str) -> bool {
    let needle = needle.to_lowercase();
    debtor.account_code.to_lowercase().contains(&needle)
        || debtor.customer_name.to_lowercase().contains(&needle)
        || debtor.title.to_lowercase().contains(&needle)
}

#[async_trait]
impl TradeDebtorServiceTrait for InMemoryTradeDebtorService {
    async fn create(&self, new_debtor: NewTradeDebtor, actor: &str) -> Result<TradeDebtor> {
        debug!(
            "Creating trade debtor {} for actor {}",
            new_debtor.account_code, actor
        );
        self.assert_unique_code(&new_debtor.account_code, None)?;

        let now = Utc::now();
        let debtor = TradeDebtor {
            id: uuid::Uuid::new_v4().to_string(),
            account_code: new_debtor.account_code,
            account_type: new_debtor.account_type,
            title: new_debtor.title,
            customer_name: new_debtor.customer_name,
            classification: new_debtor.classification,
            remarks: new_debtor.remarks,
            ac_definition: new_debtor.ac_definition,
            limits_margins: new_debtor.limits_margins,
            bank_details: new_debtor.bank_details,
            addresses: new_debtor.addresses,
            employees: new_debtor.employees,
            vat_gst_details: new_debtor.vat_gst_details,
            kyc_details: new_debtor.kyc_details,
            general_documents: new_debtor.general_documents,
            status: DebtorStatus::Active,
            is_deleted: false,
            deleted_at: None,
            created_at: now,
            updated_at: now,
            created_by: Some(actor.to_string()),
            updated_by: Some(actor.to_string()),
        };

        let mut store = self.store.write().unwrap();
        // Re-check under the write lock; readers may have raced us.
        if store.values().any(|d| d.account_code == debtor.account_code) {
            return Err(Error::ConstraintViolation(format!(
                "accountCode '{}' already exists",
                debtor.account_code
            )));
        }
        store.insert(debtor.id.clone(), debtor.clone());
        Ok(debtor)
    }

    async fn update(
        &self,
        id: &str,
        update: TradeDebtorUpdate,
        actor: &str,
    ) -> Result<TradeDebtor> {
        let mut debtor = self.get_by_id(id)?;

        if let Some(code) = &update.account_code {
            self.assert_unique_code(code, Some(id))?;
            debtor.account_code = code.clone();
        }
        if let Some(v) = update.account_type {
            debtor.account_type = Some(v);
        }
        if let Some(v) = update.title {
            debtor.title = v;
        }
        if let Some(v) = update.customer_name {
            debtor.customer_name = v;
        }
        if let Some(v) = update.classification {
            debtor.classification = Some(v);
        }
        if let Some(v) = update.remarks {
            debtor.remarks = Some(v);
        }
        if let Some(v) = update.ac_definition {
            debtor.ac_definition = Some(v);
        }
        if let Some(v) = update.limits_margins {
            debtor.limits_margins = Some(v);
        }
        if let Some(v) = update.bank_details {
            debtor.bank_details = Some(v);
        }
        if let Some(v) = update.addresses {
            debtor.addresses = v;
        }
        if let Some(v) = update.employees {
            debtor.employees = v;
        }

        let directives = update.directives;
        let mut discarded: Vec<String> = Vec::new();

        // VAT section: replace swaps the stored list for the incoming
        // batch (old files get deleted); otherwise the incoming batch
        // unions with what is stored.
        if let Some(incoming) = update.vat_gst_details {
            if directives.replace_vat {
                for doc in &debtor.vat_gst_details.documents {
                    if let Some(key) = &doc.s3_key {
                        discarded.push(key.clone());
                    }
                }
                debtor.vat_gst_details = incoming;
            } else {
                if !incoming.extra.is_empty() {
                    debtor.vat_gst_details.extra = incoming.extra;
                }
                debtor.vat_gst_details.documents.extend(incoming.documents);
            }
        }
        discarded.extend(apply_removals(
            &mut debtor.vat_gst_details.documents,
            &directives.remove_vat,
        ));

        // KYC section: replace swaps the whole entry list; union appends
        // the first incoming entry's documents to the first stored entry
        // and carries any additional entries over verbatim.
        if let Some(incoming) = update.kyc_details {
            if directives.replace_kyc {
                for entry in &debtor.kyc_details {
                    for doc in &entry.documents {
                        if let Some(key) = &doc.s3_key {
                            discarded.push(key.clone());
                        }
                    }
                }
                debtor.kyc_details = incoming;
            } else {
                let mut incoming = incoming.into_iter();
                if let Some(first) = incoming.next() {
                    if debtor.kyc_details.is_empty() {
                        debtor.kyc_details.push(first);
                    } else {
                        if !first.extra.is_empty() {
                            debtor.kyc_details[0].extra = first.extra;
                        }
                        debtor.kyc_details[0].documents.extend(first.documents);
                    }
                }
                debtor.kyc_details.extend(incoming);
            }
        }
        for entry in &mut debtor.kyc_details {
            discarded.extend(apply_removals(&mut entry.documents, &directives.remove_kyc));
        }

        debtor.updated_at = Utc::now();
        debtor.updated_by = Some(actor.to_string());

        self.discard_files(&discarded).await;

        let mut store = self.store.write().unwrap();
        store.insert(debtor.id.clone(), debtor.clone());
        Ok(debtor)
    }

    fn get_by_id(&self, id: &str) -> Result<TradeDebtor> {
        let store = self.store.read().unwrap();
        store
            .get(id)
            .filter(|d| !d.is_deleted)
            .cloned()
            .ok_or_else(|| Error::NotFound(id.to_string()))
    }

    fn list(&self, filters: &ListFilters) -> Result<DebtorPage> {
        let mut items: Vec<TradeDebtor> = self
            .live_debtors()
            .into_iter()
            .filter(|d| filters.status.map_or(true, |s| d.status == s))
            .filter(|d| {
                filters.classification.as_deref().map_or(true, |c| {
                    d.classification
                        .as_deref()
                        .map_or(false, |dc| dc.eq_ignore_ascii_case(c))
                })
            })
            .filter(|d| {
                filters
                    .search
                    .as_deref()
                    .map_or(true, |needle| matches_search(d, needle))
            })
            .collect();

        sort_debtors(&mut items, &filters.sort_by, filters.sort_order);

        let total = items.len() as i64;
        let limit = filters.limit.max(1);
        let page = filters.page.max(1);
        let total_pages = (total + limit - 1) / limit;
        let start = ((page - 1) * limit) as usize;
        let items: Vec<TradeDebtor> = items
            .into_iter()
            .skip(start)
            .take(limit as usize)
            .collect();

        Ok(DebtorPage {
            items,
            pagination: Pagination {
                page,
                limit,
                total,
                total_pages,
            },
        })
    }

    fn get_active(&self) -> Result<Vec<TradeDebtor>> {
        let mut items: Vec<TradeDebtor> = self
            .live_debtors()
            .into_iter()
            .filter(|d| d.status == DebtorStatus::Active)
            .collect();
        sort_debtors(&mut items, "createdAt", SortOrder::Desc);
        Ok(items)
    }

    async fn soft_delete(&self, id: &str, actor: &str) -> Result<TradeDebtor> {
        let mut store = self.store.write().unwrap();
        let debtor = store
            .get_mut(id)
            .filter(|d| !d.is_deleted)
            .ok_or_else(|| Error::NotFound(id.to_string()))?;
        debtor.is_deleted = true;
        debtor.deleted_at = Some(Utc::now());
        debtor.updated_at = Utc::now();
        debtor.updated_by = Some(actor.to_string());
        Ok(debtor.clone())
    }

    async fn hard_delete(&self, id: &str) -> Result<DeleteOutcome> {
        // Hard delete works on soft-deleted records too.
        let debtor = {
            let mut store = self.store.write().unwrap();
            store
                .remove(id)
                .ok_or_else(|| Error::NotFound(id.to_string()))?
        };
        let keys = debtor.all_storage_keys();
        debug!(
            "Hard-deleting trade debtor {} with {} stored file(s)",
            id,
            keys.len()
        );
        Ok(self.storage.delete_many(&keys).await)
    }

    async fn set_status(
        &self,
        id: &str,
        status: DebtorStatus,
        actor: &str,
    ) -> Result<TradeDebtor> {
        let mut store = self.store.write().unwrap();
        let debtor = store
            .get_mut(id)
            .filter(|d| !d.is_deleted)
            .ok_or_else(|| Error::NotFound(id.to_string()))?;
        debtor.status = status;
        debtor.updated_at = Utc::now();
        debtor.updated_by = Some(actor.to_string());
        Ok(debtor.clone())
    }

    async fn toggle_status(&self, id: &str, actor: &str) -> Result<TradeDebtor> {
        let next = self.get_by_id(id)?.status.toggled();
        self.set_status(id, next, actor).await
    }

    fn search(&self, term: &str) -> Result<Vec<TradeDebtor>> {
        let mut items: Vec<TradeDebtor> = self
            .live_debtors()
            .into_iter()
            .filter(|d| matches_search(d, term))
            .collect();
        sort_debtors(&mut items, "accountCode", SortOrder::Asc);
        Ok(items)
    }

    fn statistics(&self) -> Result<DebtorStatistics> {
        let store = self.store.read().unwrap();
        let mut stats = DebtorStatistics::default();
        for debtor in store.values() {
            if debtor.is_deleted {
                stats.soft_deleted += 1;
                continue;
            }
            stats.total += 1;
            match debtor.status {
                DebtorStatus::Active => stats.active += 1,
                DebtorStatus::Inactive => stats.inactive += 1,
                DebtorStatus::Suspended => stats.suspended += 1,
            }
            if let Some(classification) = &debtor.classification {
                *stats
                    .by_classification
                    .entry(classification.clone())
                    .or_insert(0) += 1;
            }
        }
        Ok(stats)
    }
}
