//! Execution budget accounting

use std::collections::BTreeMap;

use crate::config::ProtocolParameters;
use crate::types::{ExUnits, RedeemerKey};

/// Budget handed to the interpreter for one invocation.
///
/// A declared budget that is zero or negative in both dimensions means
/// "unset": the per-transaction maxima are used instead.
pub fn normalize_budget(declared: ExUnits, params: &ProtocolParameters) -> ExUnits {
    if declared.mem <= 0 && declared.steps <= 0 {
        params.max_tx_ex_units()
    } else {
        declared
    }
}

/// Consumed execution units per redeemer, keyed by (purpose tag, index)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EvaluationReport {
    consumed: BTreeMap<RedeemerKey, ExUnits>,
}

impl EvaluationReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, key: RedeemerKey, consumed: ExUnits) {
        self.consumed.insert(key, consumed);
    }

    pub fn get(&self, key: &RedeemerKey) -> Option<&ExUnits> {
        self.consumed.get(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&RedeemerKey, &ExUnits)> {
        self.consumed.iter()
    }

    pub fn len(&self) -> usize {
        self.consumed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.consumed.is_empty()
    }

    /// Sum over all invocations
    pub fn total(&self) -> ExUnits {
        self.consumed.values().fold(ExUnits::default(), |acc, u| {
            ExUnits::new(acc.mem.saturating_add(u.mem), acc.steps.saturating_add(u.steps))
        })
    }

    /// Report keyed the way the explorer's evaluation endpoint renders it:
    /// `"spend:0"`, `"mint:1"`, `"certificate:0"`, `"withdrawal:0"`
    pub fn to_keyed(&self) -> BTreeMap<String, ExUnits> {
        self.consumed.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }
}
