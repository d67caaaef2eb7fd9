//! Transaction checks that need no scripts: structure, input resolution and
//! the validity interval

use std::collections::HashSet;

use crate::error::{LedgerError, Result};
use crate::types::*;
use crate::utxo::UtxoStore;

/// CheckTransaction: structural rules, checked before anything is resolved
///
/// A transaction is well formed if and only if:
/// 1. it spends at least one input
/// 2. no input appears twice
/// 3. no output carries a negative asset quantity
pub fn check_transaction(tx: &Transaction) -> Result<()> {
    let body = &tx.body;

    // 1. Inputs are not empty
    if body.inputs.is_empty() {
        return Err(LedgerError::InvalidTransaction("Transaction has no inputs".to_string()));
    }

    // 2. Inputs are unique
    let mut seen = HashSet::with_capacity(body.inputs.len());
    for input in &body.inputs {
        if !seen.insert(input) {
            return Err(LedgerError::InvalidTransaction(format!("Duplicate input {}", input)));
        }
    }

    // 3. Output quantities are non-negative
    for (i, output) in body.outputs.iter().enumerate() {
        if output.amount.has_negative_quantity() {
            return Err(LedgerError::InvalidTransaction(format!(
                "Negative asset quantity in output {}",
                i
            )));
        }
    }

    Ok(())
}

/// Resolve output references against the store, preserving their order.
/// Any reference missing from the store fails with `UtxoNotFound`.
pub fn resolve_inputs(refs: &[OutputRef], store: &UtxoStore) -> Result<Vec<Utxo>> {
    refs.iter().map(|r| store.lookup(r)).collect()
}

/// Validity interval rule: `validity_start <= slot < ttl`, missing bounds
/// unbounded
pub fn check_validity_interval(body: &TransactionBody, slot: Slot) -> Result<()> {
    let after_start = body.validity_start.map_or(true, |start| start <= slot);
    let before_ttl = body.ttl.map_or(true, |ttl| slot < ttl);
    if after_start && before_ttl {
        Ok(())
    } else {
        Err(LedgerError::OutsideValidityInterval { slot })
    }
}

/// Apply a transaction's UTxO effects to `store`: spent inputs are removed
/// and each output is added at (transaction id, position)
pub fn apply_transaction(tx: &Transaction, mut store: UtxoStore) -> Result<UtxoStore> {
    let tx_id = tx.id();
    for input in &tx.body.inputs {
        store.remove(input)?;
    }
    for (i, output) in tx.body.outputs.iter().enumerate() {
        store.insert(Utxo::new(OutputRef::new(tx_id, i as u32), output.clone()))?;
    }
    Ok(store)
}
