//! UTxO store: output reference → output, with an address index over live outputs

use std::collections::{BTreeSet, HashMap};

use crate::error::{LedgerError, Result};
use crate::types::*;

/// Keyed mapping from output reference to output, plus an index from owning
/// address to its live references. Both indices are always updated together.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UtxoStore {
    outputs: HashMap<OutputRef, TransactionOutput>,
    by_address: HashMap<Address, BTreeSet<OutputRef>>,
}

impl UtxoStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a UTxO, failing with `UtxoExists` if the reference is taken
    pub fn insert(&mut self, utxo: Utxo) -> Result<()> {
        if self.outputs.contains_key(&utxo.input) {
            return Err(LedgerError::UtxoExists(utxo.input));
        }
        self.put(utxo);
        Ok(())
    }

    /// Insert a UTxO, replacing any output already stored under its reference
    pub fn put(&mut self, utxo: Utxo) {
        if let Some(previous) = self.outputs.insert(utxo.input, utxo.output.clone()) {
            self.unindex(&previous.address, &utxo.input);
        }
        self.by_address.entry(utxo.output.address).or_default().insert(utxo.input);
    }

    /// Remove a UTxO from both indices, returning its output
    pub fn remove(&mut self, input: &OutputRef) -> Result<TransactionOutput> {
        let output = self
            .outputs
            .remove(input)
            .ok_or(LedgerError::UtxoNotFound(*input))?;
        self.unindex(&output.address, input);
        Ok(output)
    }

    pub fn lookup(&self, input: &OutputRef) -> Result<Utxo> {
        self.get(input)
            .map(|output| Utxo::new(*input, output.clone()))
            .ok_or(LedgerError::UtxoNotFound(*input))
    }

    pub fn get(&self, input: &OutputRef) -> Option<&TransactionOutput> {
        self.outputs.get(input)
    }

    pub fn contains(&self, input: &OutputRef) -> bool {
        self.outputs.contains_key(input)
    }

    /// Live UTxOs at `address`, in output-reference order
    pub fn by_address(&self, address: &Address) -> Vec<Utxo> {
        self.by_address
            .get(address)
            .into_iter()
            .flatten()
            .filter_map(|input| self.outputs.get(input).map(|o| Utxo::new(*input, o.clone())))
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&OutputRef, &TransactionOutput)> {
        self.outputs.iter()
    }

    pub fn len(&self) -> usize {
        self.outputs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outputs.is_empty()
    }

    fn unindex(&mut self, address: &Address, input: &OutputRef) {
        if let Some(refs) = self.by_address.get_mut(address) {
            refs.remove(input);
            if refs.is_empty() {
                self.by_address.remove(address);
            }
        }
    }
}
