use std::sync::Arc;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use wardflow_core::{
    BillingCategory, BillingLineItem, CoreError, EpisodeId, Invoice, LineItemId, Result,
};

/// One episode's billing state. Everything behind the ledger lock.
#[derive(Debug, Default)]
struct Ledger {
    lines: Vec<BillingLineItem>,
    /// Σ amount × quantity over non-voided lines, maintained on every add
    /// and void. Adds that would push it past `u64::MAX` are rejected, so
    /// the final invoice total can never wrap.
    total: u64,
    /// Set exactly once, by `finalize`. Its presence is the "closed" marker:
    /// no line item may be added or voided afterwards.
    invoice: Option<Invoice>,
}

/// Accumulates chargeable line items per episode and finalizes them into an
/// invoice at discharge.
///
/// Each episode gets its own ledger behind a `RwLock`, so accumulation on
/// one episode never contends with reads or writes on another. `finalize`
/// and `add_line_item` both work under the ledger write lock and check the
/// closed marker there: a line item racing a finalize is either included
/// (it took the lock first) or rejected with `InvalidState` — never lost.
#[derive(Debug, Default)]
pub struct BillingAccumulator {
    ledgers: DashMap<EpisodeId, Arc<RwLock<Ledger>>>,
}

impl BillingAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a ledger for a freshly admitted episode.
    ///
    /// # Errors
    ///
    /// Returns `Conflict` if a ledger already exists for the episode.
    pub fn open(&self, episode: &EpisodeId) -> Result<()> {
        match self.ledgers.entry(episode.clone()) {
            Entry::Occupied(_) => Err(CoreError::conflict(format!(
                "billing ledger for episode {episode} already exists"
            ))),
            Entry::Vacant(entry) => {
                entry.insert(Arc::new(RwLock::new(Ledger::default())));
                debug!(episode = %episode, "Opened billing ledger");
                Ok(())
            }
        }
    }

    fn ledger(&self, episode: &EpisodeId) -> Result<Arc<RwLock<Ledger>>> {
        self.ledgers
            .get(episode)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| CoreError::not_found("Episode", episode.as_str()))
    }

    /// Record a chargeable line item against an episode.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` for a zero quantity, an empty description, an
    /// amount × quantity that overflows, or a line that would make the
    /// ledger total unrepresentable; `InvalidState` once the episode is
    /// finalized (no late charges); `NotFound` for an unknown episode.
    pub async fn add_line_item(
        &self,
        episode: &EpisodeId,
        category: BillingCategory,
        description: impl Into<String>,
        amount: u64,
        quantity: u32,
    ) -> Result<BillingLineItem> {
        let description = description.into();
        if quantity == 0 {
            return Err(CoreError::invalid_input("quantity must be at least 1"));
        }
        if description.trim().is_empty() {
            return Err(CoreError::invalid_input("description must not be empty"));
        }
        let line_total = amount
            .checked_mul(u64::from(quantity))
            .ok_or_else(|| CoreError::invalid_input("line total overflows"))?;

        let ledger = self.ledger(episode)?;
        let mut guard = ledger.write().await;
        if guard.invoice.is_some() {
            return Err(CoreError::invalid_state(format!(
                "episode {episode} is discharged; billing is finalized"
            )));
        }
        let total = guard.total.checked_add(line_total).ok_or_else(|| {
            CoreError::invalid_input("line item would make the ledger total overflow")
        })?;

        let line = BillingLineItem::new(episode.clone(), category, description, amount, quantity);
        guard.lines.push(line.clone());
        guard.total = total;
        debug!(
            episode = %episode,
            line_item = %line.id,
            category = %category,
            total = line.line_total(),
            "Recorded billing line item"
        );
        Ok(line)
    }

    /// Mark a line item excluded from totals without deleting it.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for an unknown episode or line item,
    /// `InvalidState` if the item is already voided or the ledger is
    /// finalized.
    pub async fn void_line_item(&self, episode: &EpisodeId, line_item: &LineItemId) -> Result<()> {
        let ledger = self.ledger(episode)?;
        let mut guard = ledger.write().await;
        if guard.invoice.is_some() {
            return Err(CoreError::invalid_state(format!(
                "episode {episode} is discharged; billing is finalized"
            )));
        }

        let line = guard
            .lines
            .iter_mut()
            .find(|line| &line.id == line_item)
            .ok_or_else(|| CoreError::not_found("BillingLineItem", line_item.as_str()))?;
        if line.voided {
            return Err(CoreError::invalid_state(format!(
                "line item {line_item} is already voided"
            )));
        }
        line.voided = true;
        let line_total = line.line_total();
        guard.total -= line_total;
        debug!(episode = %episode, line_item = %line_item, "Voided billing line item");
        Ok(())
    }

    /// Close accumulation and produce the episode's immutable invoice.
    ///
    /// Called at most once per episode; the guard is enforced, not assumed.
    ///
    /// # Errors
    ///
    /// Returns `Conflict` if an invoice already exists for the episode,
    /// `NotFound` for an unknown episode.
    pub async fn finalize(&self, episode: &EpisodeId) -> Result<Invoice> {
        let ledger = self.ledger(episode)?;
        let mut guard = ledger.write().await;
        if guard.invoice.is_some() {
            return Err(CoreError::conflict(format!(
                "invoice for episode {episode} already exists"
            )));
        }

        let invoice = Invoice::generate(episode.clone(), guard.lines.clone())?;
        guard.invoice = Some(invoice.clone());
        debug!(
            episode = %episode,
            invoice = %invoice.id,
            total = invoice.total,
            lines = invoice.lines.len(),
            "Finalized invoice"
        );
        Ok(invoice)
    }

    /// Rollback hook for a failed discharge: forget the invoice and reopen
    /// accumulation. Not part of the coordinator's public surface.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for an unknown episode, `InvalidState` if the
    /// ledger was never finalized.
    pub async fn reopen(&self, episode: &EpisodeId) -> Result<()> {
        let ledger = self.ledger(episode)?;
        let mut guard = ledger.write().await;
        if guard.invoice.take().is_none() {
            return Err(CoreError::invalid_state(format!(
                "ledger for episode {episode} is not finalized"
            )));
        }
        warn!(episode = %episode, "Reopened billing ledger after discharge rollback");
        Ok(())
    }

    /// The finalized invoice for an episode, if one exists.
    pub async fn invoice(&self, episode: &EpisodeId) -> Result<Option<Invoice>> {
        let ledger = self.ledger(episode)?;
        let guard = ledger.read().await;
        Ok(guard.invoice.clone())
    }

    /// All recorded line items, voided ones included.
    pub async fn line_items(&self, episode: &EpisodeId) -> Result<Vec<BillingLineItem>> {
        let ledger = self.ledger(episode)?;
        let guard = ledger.read().await;
        Ok(guard.lines.clone())
    }

    /// Σ amount × quantity over non-voided items recorded so far.
    pub async fn running_total(&self, episode: &EpisodeId) -> Result<u64> {
        let ledger = self.ledger(episode)?;
        let guard = ledger.read().await;
        Ok(guard.total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn episode() -> EpisodeId {
        EpisodeId::new("e1")
    }

    async fn opened() -> BillingAccumulator {
        let billing = BillingAccumulator::new();
        billing.open(&episode()).unwrap();
        billing
    }

    #[tokio::test]
    async fn test_open_twice_conflicts() {
        let billing = opened().await;
        assert_eq!(billing.open(&episode()).unwrap_err().code(), "conflict");
    }

    #[tokio::test]
    async fn test_add_line_item_to_unknown_episode() {
        let billing = BillingAccumulator::new();
        let err = billing
            .add_line_item(&episode(), BillingCategory::Meal, "Lunch", 500, 1)
            .await
            .unwrap_err();
        assert_eq!(err.code(), "not_found");
    }

    #[tokio::test]
    async fn test_add_line_item_validation() {
        let billing = opened().await;

        let err = billing
            .add_line_item(&episode(), BillingCategory::Meal, "Lunch", 500, 0)
            .await
            .unwrap_err();
        assert_eq!(err.code(), "invalid_input");

        let err = billing
            .add_line_item(&episode(), BillingCategory::Meal, "   ", 500, 1)
            .await
            .unwrap_err();
        assert_eq!(err.code(), "invalid_input");

        let err = billing
            .add_line_item(&episode(), BillingCategory::Misc, "overflow", u64::MAX, 2)
            .await
            .unwrap_err();
        assert_eq!(err.code(), "invalid_input");
    }

    #[tokio::test]
    async fn test_ledger_total_overflow_rejected_at_add() {
        let billing = opened().await;
        billing
            .add_line_item(&episode(), BillingCategory::Theatre, "Transplant", u64::MAX - 1, 1)
            .await
            .unwrap();

        // Individually fine, but the ledger total would wrap.
        let err = billing
            .add_line_item(&episode(), BillingCategory::Misc, "Sundries", 2, 1)
            .await
            .unwrap_err();
        assert_eq!(err.code(), "invalid_input");

        // The rejected line left no trace; finalize still succeeds.
        let invoice = billing.finalize(&episode()).await.unwrap();
        assert_eq!(invoice.total, u64::MAX - 1);
        assert_eq!(invoice.lines.len(), 1);
    }

    #[tokio::test]
    async fn test_voiding_restores_ledger_headroom() {
        let billing = opened().await;
        let big = billing
            .add_line_item(&episode(), BillingCategory::Theatre, "Transplant", u64::MAX - 1, 1)
            .await
            .unwrap();
        billing.void_line_item(&episode(), &big.id).await.unwrap();

        billing
            .add_line_item(&episode(), BillingCategory::Misc, "Sundries", u64::MAX - 1, 1)
            .await
            .unwrap();
        assert_eq!(
            billing.running_total(&episode()).await.unwrap(),
            u64::MAX - 1
        );
    }

    #[tokio::test]
    async fn test_running_total_excludes_voided() {
        let billing = opened().await;
        billing
            .add_line_item(&episode(), BillingCategory::Meal, "Lunch", 500, 1)
            .await
            .unwrap();
        let lab = billing
            .add_line_item(&episode(), BillingCategory::Lab, "CBC", 1200, 1)
            .await
            .unwrap();
        assert_eq!(billing.running_total(&episode()).await.unwrap(), 1700);

        billing.void_line_item(&episode(), &lab.id).await.unwrap();
        assert_eq!(billing.running_total(&episode()).await.unwrap(), 500);
        // Voided item retained for audit.
        assert_eq!(billing.line_items(&episode()).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_void_twice_invalid_state() {
        let billing = opened().await;
        let line = billing
            .add_line_item(&episode(), BillingCategory::Pharmacy, "Amoxicillin", 300, 2)
            .await
            .unwrap();
        billing.void_line_item(&episode(), &line.id).await.unwrap();

        let err = billing
            .void_line_item(&episode(), &line.id)
            .await
            .unwrap_err();
        assert_eq!(err.code(), "invalid_state");
    }

    #[tokio::test]
    async fn test_void_unknown_line_item() {
        let billing = opened().await;
        let err = billing
            .void_line_item(&episode(), &LineItemId::new("nope"))
            .await
            .unwrap_err();
        assert_eq!(err.code(), "not_found");
    }

    #[tokio::test]
    async fn test_finalize_totals_and_snapshots() {
        let billing = opened().await;
        billing
            .add_line_item(&episode(), BillingCategory::Meal, "Lunch", 500, 1)
            .await
            .unwrap();
        billing
            .add_line_item(&episode(), BillingCategory::Lab, "CBC", 1200, 1)
            .await
            .unwrap();

        let invoice = billing.finalize(&episode()).await.unwrap();
        assert_eq!(invoice.total, 1700);
        assert_eq!(invoice.lines.len(), 2);
        assert_eq!(
            billing.invoice(&episode()).await.unwrap().unwrap().id,
            invoice.id
        );
    }

    #[tokio::test]
    async fn test_finalize_twice_conflicts_and_invoice_unchanged() {
        let billing = opened().await;
        billing
            .add_line_item(&episode(), BillingCategory::Theatre, "Appendectomy", 90_000, 1)
            .await
            .unwrap();

        let invoice = billing.finalize(&episode()).await.unwrap();
        let err = billing.finalize(&episode()).await.unwrap_err();
        assert_eq!(err.code(), "conflict");
        assert_eq!(
            billing.invoice(&episode()).await.unwrap().unwrap(),
            invoice
        );
    }

    #[tokio::test]
    async fn test_no_late_charges_after_finalize() {
        let billing = opened().await;
        billing.finalize(&episode()).await.unwrap();

        let err = billing
            .add_line_item(&episode(), BillingCategory::Meal, "Dinner", 400, 1)
            .await
            .unwrap_err();
        assert_eq!(err.code(), "invalid_state");

        // Voiding is closed too.
        let err = billing
            .void_line_item(&episode(), &LineItemId::new("any"))
            .await
            .unwrap_err();
        assert_eq!(err.code(), "invalid_state");
    }

    #[tokio::test]
    async fn test_reopen_allows_further_charges() {
        let billing = opened().await;
        billing.finalize(&episode()).await.unwrap();
        billing.reopen(&episode()).await.unwrap();

        assert!(billing.invoice(&episode()).await.unwrap().is_none());
        billing
            .add_line_item(&episode(), BillingCategory::Meal, "Dinner", 400, 1)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_reopen_unfinalized_invalid_state() {
        let billing = opened().await;
        let err = billing.reopen(&episode()).await.unwrap_err();
        assert_eq!(err.code(), "invalid_state");
    }

    #[tokio::test]
    async fn test_finalize_vs_add_race_never_loses_items() {
        // A racing add is either on the invoice or rejected InvalidState.
        for _ in 0..32 {
            let billing = Arc::new(BillingAccumulator::new());
            let id = EpisodeId::new("race");
            billing.open(&id).unwrap();

            let adder = {
                let billing = Arc::clone(&billing);
                let id = id.clone();
                tokio::spawn(async move {
                    billing
                        .add_line_item(&id, BillingCategory::Misc, "Race", 100, 1)
                        .await
                })
            };
            let finalizer = {
                let billing = Arc::clone(&billing);
                let id = id.clone();
                tokio::spawn(async move { billing.finalize(&id).await })
            };

            let add_result = adder.await.unwrap();
            let invoice = finalizer.await.unwrap().unwrap();

            match add_result {
                Ok(line) => {
                    // Included iff the add won the lock; if the invoice does
                    // not carry it, the ledger still holds it un-invoiced,
                    // which would be a lost charge.
                    if !invoice.lines.iter().any(|l| l.id == line.id) {
                        panic!("line item recorded after finalize was silently lost");
                    }
                }
                Err(err) => assert_eq!(err.code(), "invalid_state"),
            }
        }
    }
}
