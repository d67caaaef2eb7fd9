//! Error types for ledger simulation

use thiserror::Error;

use crate::types::{
    Coin, DatumHash, ExUnits, Network, OutputRef, PoolId, RedeemerKey, RewardAddress, ScriptHash, Slot,
};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    // Resolution errors: static, reported before any script runs
    #[error("UTxO not found: {0}")]
    UtxoNotFound(OutputRef),

    #[error("Missing redeemer for {0} (index or tag set incorrectly or missing redeemer)")]
    MissingRedeemer(RedeemerKey),

    #[error("No witness or reference script with hash {}", hex::encode(.0))]
    MissingScript(ScriptHash),

    #[error("No datum with hash {} provided for transaction", hex::encode(.0))]
    MissingDatum(DatumHash),

    #[error("Spending input {0} has no attached datum and can not be spent")]
    NoDatum(OutputRef),

    #[error("Inline datum on {0} can not be represented in a Plutus V1 context")]
    InlineDatumInV1(String),

    #[error("Redeemer {0} does not point at any script purpose")]
    DanglingRedeemer(RedeemerKey),

    // Interpreter failures
    #[error("Script failed for {key}: {reason}")]
    ScriptFailure {
        key: RedeemerKey,
        reason: String,
        consumed: ExUnits,
        logs: Vec<String>,
    },

    // Ledger-rule violations
    #[error("Invalid transaction: {0}")]
    InvalidTransaction(String),

    #[error("Current slot {slot} outside validity interval")]
    OutsideValidityInterval { slot: Slot },

    #[error("Stake address already registered: {0}")]
    AlreadyRegistered(RewardAddress),

    #[error("Stake address not registered: {0}")]
    NotRegistered(RewardAddress),

    #[error("Unknown stake pool: {}", hex::encode(.0))]
    UnknownPool(PoolId),

    #[error("Withdrawal of {requested} from {address} must equal accrued rewards {available}")]
    PartialWithdrawal {
        address: RewardAddress,
        requested: Coin,
        available: Coin,
    },

    #[error("Stake action on {0} lacks a matching witness")]
    UnauthorizedStakeAction(RewardAddress),

    #[error("Stake address {0} still holds unwithdrawn rewards")]
    RewardsNotWithdrawn(RewardAddress),

    #[error("Withdrawal from {address} names a different network than the ledger's {expected:?}")]
    WrongNetwork {
        address: RewardAddress,
        expected: Network,
    },

    // Lookup errors
    #[error("UTxO already exists: {0}")]
    UtxoExists(OutputRef),

    #[error("Stake account not found: {0}")]
    AccountNotFound(RewardAddress),

    #[error("Script not found: {}", hex::encode(.0))]
    ScriptNotFound(ScriptHash),

    #[error("Session not found: {0}")]
    SessionNotFound(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl LedgerError {
    /// Static failure detected while building script contexts
    pub fn is_resolution_error(&self) -> bool {
        matches!(
            self,
            LedgerError::UtxoNotFound(_)
                | LedgerError::MissingRedeemer(_)
                | LedgerError::MissingScript(_)
                | LedgerError::MissingDatum(_)
                | LedgerError::NoDatum(_)
                | LedgerError::InlineDatumInV1(_)
                | LedgerError::DanglingRedeemer(_)
        )
    }

    pub fn is_script_failure(&self) -> bool {
        matches!(self, LedgerError::ScriptFailure { .. })
    }

    pub fn is_ledger_rule_violation(&self) -> bool {
        matches!(
            self,
            LedgerError::InvalidTransaction(_)
                | LedgerError::OutsideValidityInterval { .. }
                | LedgerError::AlreadyRegistered(_)
                | LedgerError::NotRegistered(_)
                | LedgerError::UnknownPool(_)
                | LedgerError::PartialWithdrawal { .. }
                | LedgerError::UnauthorizedStakeAction(_)
                | LedgerError::RewardsNotWithdrawn(_)
                | LedgerError::WrongNetwork { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, LedgerError>;
