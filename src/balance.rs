//! The balance engine: turns the raw expense list into per-participant
//! totals, the settlement between the two trip members, and trip-level
//! budget figures.
//!
//! Every run recomputes from the full list. There is no incremental path,
//! so deletions and redundant reruns can never leave drift behind: the
//! output is a pure function of the current expenses.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::LedgerError;
use crate::schemas::{Expense, Participant, ParticipantBalance, ParticipantId};

/// The single transfer that zeroes out both net balances, or nothing
/// when the trip is already balanced.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct Settlement {
    pub creditor: ParticipantId,
    pub debtor: ParticipantId,
    pub amount: i64,
}

/// Recoverable per-record problems found during a run. The offending
/// expense is skipped for attribution but the rest of the snapshot is
/// still computed.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BalanceWarning {
    MissingPayerReference {
        expense_id: String,
        payer: ParticipantId,
    },
}

/// Complete derived state for one engine run. Replaces any previous
/// snapshot wholesale.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct BalanceSnapshot {
    pub participants: Vec<ParticipantBalance>,
    pub total_expenses: i64,
    pub remaining_budget: i64,
    pub settlement: Option<Settlement>,
    pub warnings: Vec<BalanceWarning>,
}

#[derive(Clone, Copy, Debug, Default)]
struct Totals {
    paid: i64,
    owed: i64,
}

/// Computes the full balance snapshot for a two-person trip.
///
/// `total_paid` sums everything a participant physically paid. `total_owed`
/// is their contribution toward shared costs: it accumulates the full
/// home-currency amount of each *shared* expense on its payer, and personal
/// expenses never touch it. `net_balance` is then
/// `max(0, own total_owed - other total_owed)`, the amount the other
/// participant still owes this one; at most one side is nonzero.
///
/// An expense whose payer matches neither participant still counts toward
/// `total_expenses` but is excluded from attribution, with a warning on
/// the snapshot. A participant set that is not exactly a pair is rejected:
/// the pairwise settlement rule has no meaning for it.
pub fn compute_balances(
    participants: &[Participant],
    expenses: &[Expense],
    budget: i64,
) -> Result<BalanceSnapshot, LedgerError> {
    if participants.len() != 2 {
        return Err(LedgerError::UnbalancedParticipantSet(participants.len()));
    }

    let mut totals: HashMap<&str, Totals> = participants
        .iter()
        .map(|p| (p.id.as_str(), Totals::default()))
        .collect();
    let mut warnings = Vec::new();
    let mut total_expenses = 0i64;

    for expense in expenses {
        total_expenses += expense.amount_ils;
        let Some(entry) = totals.get_mut(expense.payer.as_str()) else {
            warnings.push(BalanceWarning::MissingPayerReference {
                expense_id: expense.id.clone(),
                payer: expense.payer.clone(),
            });
            continue;
        };
        entry.paid += expense.amount_ils;
        if expense.is_shared {
            entry.owed += expense.amount_ils;
        }
    }

    let owed_of = |p: &Participant| totals[p.id.as_str()].owed;
    let balances = participants
        .iter()
        .enumerate()
        .map(|(i, p)| {
            let other = &participants[1 - i];
            let own = totals[p.id.as_str()];
            ParticipantBalance {
                id: p.id.clone(),
                name: p.name.clone(),
                total_paid: own.paid,
                total_owed: own.owed,
                net_balance: (own.owed - owed_of(other)).max(0),
            }
        })
        .collect::<Vec<_>>();

    Ok(BalanceSnapshot {
        settlement: resolve_settlement(&balances),
        participants: balances,
        total_expenses,
        remaining_budget: budget - total_expenses,
        warnings,
    })
}

/// Derives who owes whom from the two net balances. Exactly one side can
/// be positive; equal contributions produce no settlement at all.
fn resolve_settlement(balances: &[ParticipantBalance]) -> Option<Settlement> {
    let creditor = balances.iter().find(|b| b.net_balance > 0)?;
    let debtor = balances.iter().find(|b| b.id != creditor.id)?;
    Some(Settlement {
        creditor: creditor.id.clone(),
        debtor: debtor.id.clone(),
        amount: creditor.net_balance,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schemas::{Category, NewExpense, SplitType};

    fn pair() -> Vec<Participant> {
        vec![
            Participant {
                id: "omri".to_string(),
                name: "Omri".to_string(),
            },
            Participant {
                id: "noa".to_string(),
                name: "Noa".to_string(),
            },
        ]
    }

    fn expense(payer: &str, amount_ils: i64, split_type: SplitType) -> Expense {
        Expense::seal(
            NewExpense {
                date: None,
                merchant: "test".to_string(),
                category: Category::Other,
                amount_original: amount_ils as f64,
                currency_original: "ILS".to_string(),
                payer: payer.to_string(),
                split_type,
                notes: None,
                country: None,
            },
            amount_ils,
        )
    }

    fn balance_of<'a>(snapshot: &'a BalanceSnapshot, id: &str) -> &'a ParticipantBalance {
        snapshot
            .participants
            .iter()
            .find(|b| b.id == id)
            .unwrap()
    }

    #[test]
    fn empty_expense_list_yields_all_zeros() {
        let snapshot = compute_balances(&pair(), &[], 10_000).unwrap();
        assert_eq!(snapshot.total_expenses, 0);
        assert_eq!(snapshot.remaining_budget, 10_000);
        assert_eq!(snapshot.settlement, None);
        for b in &snapshot.participants {
            assert_eq!((b.total_paid, b.total_owed, b.net_balance), (0, 0, 0));
        }
    }

    #[test]
    fn single_shared_expense_credits_the_payer_in_full() {
        let expenses = vec![expense("omri", 1000, SplitType::Equal)];
        let snapshot = compute_balances(&pair(), &expenses, 10_000).unwrap();

        let omri = balance_of(&snapshot, "omri");
        assert_eq!(omri.total_paid, 1000);
        assert_eq!(omri.total_owed, 1000);
        assert_eq!(omri.net_balance, 1000);

        let noa = balance_of(&snapshot, "noa");
        assert_eq!(noa.total_owed, 0);
        assert_eq!(noa.net_balance, 0);

        assert_eq!(
            snapshot.settlement,
            Some(Settlement {
                creditor: "omri".to_string(),
                debtor: "noa".to_string(),
                amount: 1000,
            })
        );
    }

    #[test]
    fn matching_shared_expenses_balance_out() {
        let expenses = vec![
            expense("omri", 1000, SplitType::Equal),
            expense("noa", 1000, SplitType::Equal),
        ];
        let snapshot = compute_balances(&pair(), &expenses, 10_000).unwrap();
        assert_eq!(balance_of(&snapshot, "omri").total_owed, 1000);
        assert_eq!(balance_of(&snapshot, "noa").total_owed, 1000);
        assert_eq!(balance_of(&snapshot, "omri").net_balance, 0);
        assert_eq!(balance_of(&snapshot, "noa").net_balance, 0);
        assert_eq!(snapshot.settlement, None);
    }

    #[test]
    fn personal_expense_counts_as_paid_but_creates_no_shared_liability() {
        let expenses = vec![
            expense("omri", 1000, SplitType::Equal),
            expense("omri", 500, SplitType::Personal),
        ];
        let snapshot = compute_balances(&pair(), &expenses, 10_000).unwrap();
        let omri = balance_of(&snapshot, "omri");
        assert_eq!(omri.total_paid, 1500);
        assert_eq!(omri.total_owed, 1000);
        assert_eq!(snapshot.total_expenses, 1500);
    }

    #[test]
    fn deleting_an_expense_returns_totals_to_zero() {
        let participants = pair();
        let mut expenses = vec![expense("omri", 1000, SplitType::Equal)];
        expenses.clear();
        let snapshot = compute_balances(&participants, &expenses, 10_000).unwrap();
        assert_eq!(snapshot.total_expenses, 0);
        assert_eq!(snapshot.remaining_budget, 10_000);
        assert_eq!(balance_of(&snapshot, "omri").net_balance, 0);
    }

    #[test]
    fn recomputation_is_idempotent() {
        let participants = pair();
        let expenses = vec![
            expense("omri", 1000, SplitType::Equal),
            expense("noa", 300, SplitType::Personal),
            expense("noa", 450, SplitType::Equal),
        ];
        let first = compute_balances(&participants, &expenses, 5000).unwrap();
        let second = compute_balances(&participants, &expenses, 5000).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn paid_totals_conserve_the_expense_sum() {
        let expenses = vec![
            expense("omri", 820, SplitType::Equal),
            expense("noa", 115, SplitType::Personal),
            expense("omri", 60, SplitType::Personal),
            expense("noa", 1204, SplitType::Equal),
        ];
        let snapshot = compute_balances(&pair(), &expenses, 0).unwrap();
        let paid_sum: i64 = snapshot.participants.iter().map(|b| b.total_paid).sum();
        assert_eq!(paid_sum, snapshot.total_expenses);
        assert_eq!(snapshot.total_expenses, 820 + 115 + 60 + 1204);
    }

    #[test]
    fn at_most_one_side_has_a_positive_net_balance() {
        let expenses = vec![
            expense("omri", 700, SplitType::Equal),
            expense("noa", 300, SplitType::Equal),
        ];
        let snapshot = compute_balances(&pair(), &expenses, 0).unwrap();
        let positive = snapshot
            .participants
            .iter()
            .filter(|b| b.net_balance > 0)
            .count();
        assert_eq!(positive, 1);
        assert!(snapshot.participants.iter().all(|b| b.net_balance >= 0));
        assert_eq!(balance_of(&snapshot, "omri").net_balance, 400);
    }

    #[test]
    fn budget_overrun_goes_negative() {
        let expenses = vec![expense("omri", 1200, SplitType::Equal)];
        let snapshot = compute_balances(&pair(), &expenses, 1000).unwrap();
        assert_eq!(snapshot.remaining_budget, -200);
    }

    #[test]
    fn unknown_payer_is_warned_about_but_still_counted_in_totals() {
        let expenses = vec![
            expense("omri", 1000, SplitType::Equal),
            expense("ghost", 400, SplitType::Equal),
        ];
        let snapshot = compute_balances(&pair(), &expenses, 0).unwrap();
        assert_eq!(snapshot.total_expenses, 1400);
        assert_eq!(balance_of(&snapshot, "omri").total_paid, 1000);
        assert_eq!(balance_of(&snapshot, "noa").total_paid, 0);
        assert_eq!(snapshot.warnings.len(), 1);
        let BalanceWarning::MissingPayerReference { payer, .. } = &snapshot.warnings[0];
        assert_eq!(payer, "ghost");
    }

    #[test]
    fn non_dyadic_participant_sets_are_rejected() {
        let mut three = pair();
        three.push(Participant {
            id: "tamar".to_string(),
            name: "Tamar".to_string(),
        });
        assert_eq!(
            compute_balances(&three, &[], 0),
            Err(LedgerError::UnbalancedParticipantSet(3))
        );
        assert_eq!(
            compute_balances(&three[..1], &[], 0),
            Err(LedgerError::UnbalancedParticipantSet(1))
        );
    }
}
