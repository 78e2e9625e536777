use tracing::{debug, warn};

use crate::models::{DraftRecord, Transaction};

/// Converts a draft into a transaction when every required field is present.
/// `expenses`/`income` are one-sided by construction and are not required.
pub fn complete(draft: DraftRecord) -> Option<Transaction> {
    Some(Transaction {
        date: draft.date?,
        kind: draft.kind?,
        description: draft.description?,
        amount: draft.amount?,
        currency: draft.currency?,
        account: draft.account,
        category: draft.category,
        sub_cat: draft.sub_cat,
        new_description: draft.new_description,
        expenses: draft.expenses,
        income: draft.income,
    })
}

/// Drops rows with a missing required field and logs how many went.
pub fn remove_incomplete(account: &str, drafts: Vec<DraftRecord>) -> Vec<Transaction> {
    let total = drafts.len();
    let kept: Vec<Transaction> = drafts.into_iter().filter_map(complete).collect();
    let dropped = total - kept.len();
    if dropped > 0 {
        warn!("{account}: {dropped} of {total} rows dropped for missing fields");
    } else {
        debug!("{account}: all {total} rows complete");
    }
    kept
}
