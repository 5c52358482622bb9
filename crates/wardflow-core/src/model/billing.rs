use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::error::{CoreError, Result};
use crate::id::{EpisodeId, InvoiceId, LineItemId};
use crate::time::now_utc;

/// Chargeable category of a billing line item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BillingCategory {
    Meal,
    Lab,
    Theatre,
    Pharmacy,
    Misc,
}

impl BillingCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            BillingCategory::Meal => "meal",
            BillingCategory::Lab => "lab",
            BillingCategory::Theatre => "theatre",
            BillingCategory::Pharmacy => "pharmacy",
            BillingCategory::Misc => "misc",
        }
    }
}

impl std::fmt::Display for BillingCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One chargeable entry accumulated against an episode before discharge.
///
/// Immutable once recorded, except for the `voided` flag: voiding excludes
/// the item from totals but never deletes it, preserving the audit trail.
/// Amounts are integer minor currency units; no floating point in money
/// paths.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BillingLineItem {
    pub id: LineItemId,
    pub episode: EpisodeId,
    pub category: BillingCategory,
    pub description: String,
    /// Unit price in minor currency units.
    pub amount: u64,
    /// Positive unit count.
    pub quantity: u32,
    #[serde(default)]
    pub voided: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub recorded_at: OffsetDateTime,
}

impl BillingLineItem {
    pub fn new(
        episode: EpisodeId,
        category: BillingCategory,
        description: impl Into<String>,
        amount: u64,
        quantity: u32,
    ) -> Self {
        Self {
            id: LineItemId::generate(),
            episode,
            category,
            description: description.into(),
            amount,
            quantity,
            voided: false,
            recorded_at: now_utc(),
        }
    }

    /// amount × quantity for this line.
    pub fn line_total(&self) -> u64 {
        self.amount * u64::from(self.quantity)
    }

    /// amount × quantity, `None` if the product is unrepresentable.
    pub fn checked_line_total(&self) -> Option<u64> {
        self.amount.checked_mul(u64::from(self.quantity))
    }
}

/// The immutable result of finalizing an episode's billing accumulation.
///
/// Holds a deep snapshot of the line items taken at generation time, so
/// later mutation of the live accumulator (there is none after finalize,
/// but the decoupling is structural) cannot reach it. Created exactly once
/// per episode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invoice {
    pub id: InvoiceId,
    pub episode: EpisodeId,
    /// Snapshot of every line item, voided ones included for audit.
    pub lines: Vec<BillingLineItem>,
    /// Σ amount × quantity over non-voided lines.
    pub total: u64,
    #[serde(with = "time::serde::rfc3339")]
    pub generated_at: OffsetDateTime,
}

impl Invoice {
    /// Snapshot the given lines into an invoice, totalling non-voided items.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` if any non-voided line total, or the sum of
    /// them, does not fit in `u64`. Money never wraps.
    pub fn generate(episode: EpisodeId, lines: Vec<BillingLineItem>) -> Result<Self> {
        let mut total: u64 = 0;
        for line in lines.iter().filter(|line| !line.voided) {
            let line_total = line.checked_line_total().ok_or_else(|| {
                CoreError::invalid_input(format!("line item {} total overflows", line.id))
            })?;
            total = total
                .checked_add(line_total)
                .ok_or_else(|| CoreError::invalid_input("invoice total overflows"))?;
        }
        Ok(Self {
            id: InvoiceId::generate(),
            episode,
            lines,
            total,
            generated_at: now_utc(),
        })
    }
}
