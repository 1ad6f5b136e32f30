use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type ParticipantId = String;

/// One of the two trip members, as stored on the trip document.
/// Totals live on [`ParticipantBalance`] and are recomputed on every
/// balance run, never persisted.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct Participant {
    pub id: ParticipantId,
    pub name: String,
}

/// Per-participant figures derived from the full expense list.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct ParticipantBalance {
    pub id: ParticipantId,
    pub name: String,
    pub total_paid: i64,
    pub total_owed: i64,
    pub net_balance: i64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Restaurants,
    Attractions,
    Transport,
    Lodging,
    Shopping,
    Other,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SplitType {
    Equal,
    Personal,
}

/// An immutable spending record. `amount_ils` is fixed at creation time
/// from the rate in effect at that moment and is never recomputed, even
/// if the rate table changes later.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct Expense {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub date: DateTime<Utc>,
    pub merchant: String,
    pub category: Category,
    pub amount_original: f64,
    pub currency_original: String,
    pub amount_ils: i64,
    pub payer: ParticipantId,
    pub split_type: SplitType,
    pub is_shared: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
}

/// Client-supplied fields for a new expense. Id, creation stamp, the
/// home-currency amount and the shared flag are all derived server-side.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct NewExpense {
    #[serde(default)]
    pub date: Option<DateTime<Utc>>,
    pub merchant: String,
    pub category: Category,
    pub amount_original: f64,
    pub currency_original: String,
    pub payer: ParticipantId,
    pub split_type: SplitType,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
}

impl Expense {
    /// Seals a client submission into an immutable record, with the
    /// already-normalized home-currency amount.
    pub fn seal(new: NewExpense, amount_ils: i64) -> Expense {
        let now = Utc::now();
        Expense {
            id: Uuid::new_v4().to_string(),
            created_at: now,
            date: new.date.unwrap_or(now),
            merchant: new.merchant,
            category: new.category,
            amount_original: new.amount_original,
            currency_original: new.currency_original.to_ascii_uppercase(),
            amount_ils,
            payer: new.payer,
            split_type: new.split_type,
            is_shared: new.split_type == SplitType::Equal,
            notes: new.notes,
            country: new.country,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct Trip {
    pub id: String,
    pub name: String,
    pub budget: i64,
    pub participants: Vec<Participant>,
    pub expenses: Vec<Expense>,
}

impl Trip {
    pub fn total_expenses(&self) -> i64 {
        self.expenses.iter().map(|e| e.amount_ils).sum()
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct ExchangeRate {
    pub currency: String,
    pub rate: f64,
    pub last_updated: DateTime<Utc>,
}
