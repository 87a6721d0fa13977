//! Prize calculator: pure mapping from aggregated totals to a payout
//! schedule.
//!
//! Amounts enter in major units; the minor→major conversion happened once
//! at the aggregation boundary. Nothing here rounds: rounding to 2 decimal
//! places is applied at storage/submission only.

use crate::domain::{Decimal, Identity, SenderTotal};

/// One scheduled payout, major units.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PayoutItem {
    pub recipient: Identity,
    pub amount: Decimal,
}

/// A draw's payout schedule. Payouts follow the aggregate input order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrizeSchedule {
    pub winner: Identity,
    pub payouts: Vec<PayoutItem>,
}

/// Compute the payout schedule for a draw.
///
/// The winner is the first aggregate reaching the maximum total (ties
/// break by first-seen order). Every non-winner receives
/// `(total / n) * individual_share`; the winner receives
/// `total * top_share` plus one individual share on top. The additive
/// stacking is deliberate and must not be re-derived.
///
/// Returns None when there are no participants — nothing to pay.
pub fn compute_schedule(
    totals: &[SenderTotal],
    total_amount: Decimal,
    top_share: Decimal,
    individual_share: Decimal,
) -> Option<PrizeSchedule> {
    if totals.is_empty() {
        return None;
    }

    let mut winner_idx = 0usize;
    for (i, entry) in totals.iter().enumerate() {
        if entry.total > totals[winner_idx].total {
            winner_idx = i;
        }
    }
    let winner = totals[winner_idx].sender.clone();

    let participant_count = Decimal::from(totals.len() as i64);
    let individual_prize = (total_amount / participant_count) * individual_share;
    let top_prize = total_amount * top_share + individual_prize;

    let payouts = totals
        .iter()
        .enumerate()
        .map(|(i, entry)| PayoutItem {
            recipient: entry.sender.clone(),
            amount: if i == winner_idx {
                top_prize
            } else {
                individual_prize
            },
        })
        .collect();

    Some(PrizeSchedule { winner, payouts })
}
