//! Spending breakdowns for the analytics views: totals per category and
//! per calendar day, derived from the same expense snapshot the balance
//! engine consumes.

use std::collections::{BTreeMap, HashMap};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::schemas::{Category, Expense};

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct CategorySpend {
    pub category: Category,
    pub total_ils: i64,
    pub count: usize,
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct DailySpend {
    pub date: NaiveDate,
    pub total_ils: i64,
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct TripStats {
    pub by_category: Vec<CategorySpend>,
    pub by_day: Vec<DailySpend>,
}

/// Aggregates expenses by category (largest spend first) and by the
/// expense's spend date (chronological). Categories with no expenses are
/// omitted.
pub fn compute_stats(expenses: &[Expense]) -> TripStats {
    let mut categories: HashMap<Category, (i64, usize)> = HashMap::new();
    let mut days: BTreeMap<NaiveDate, i64> = BTreeMap::new();

    for expense in expenses {
        let entry = categories.entry(expense.category).or_insert((0, 0));
        entry.0 += expense.amount_ils;
        entry.1 += 1;
        *days.entry(expense.date.date_naive()).or_insert(0) += expense.amount_ils;
    }

    let mut by_category = categories
        .into_iter()
        .map(|(category, (total_ils, count))| CategorySpend {
            category,
            total_ils,
            count,
        })
        .collect::<Vec<_>>();
    by_category.sort_by(|a, b| b.total_ils.cmp(&a.total_ils));

    let by_day = days
        .into_iter()
        .map(|(date, total_ils)| DailySpend { date, total_ils })
        .collect();

    TripStats {
        by_category,
        by_day,
    }
}
