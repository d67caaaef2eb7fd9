//! Test users and pools seeded from a ledger's random generator

use crate::constants::{HASH28_SIZE, MOCK_VKEY_SIZE};
use crate::ledger::MockLedger;
use crate::types::*;

/// Length of the placeholder signature in generated witnesses
const MOCK_SIGNATURE_SIZE: usize = 64;

/// A key holder with an enterprise address on the ledger's network
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockUser {
    vkey: ByteString,
    key_hash: KeyHash,
    pub address: Address,
}

impl MockUser {
    pub fn new(ledger: &mut MockLedger) -> Self {
        let vkey = ledger.random_bytes(MOCK_VKEY_SIZE);
        let key_hash = crate::hash::key_hash(&vkey);
        let address = Address::enterprise(ledger.network(), Credential::Key(key_hash));
        Self { vkey, key_hash, address }
    }

    pub fn key_hash(&self) -> KeyHash {
        self.key_hash
    }

    pub fn credential(&self) -> Credential {
        Credential::Key(self.key_hash)
    }

    /// Reward address keyed by this user's verification key
    pub fn reward_address(&self) -> RewardAddress {
        RewardAddress::new(self.address.network, self.credential())
    }

    /// Add a fresh output holding `amount` at the user's address
    pub fn fund(&self, ledger: &mut MockLedger, amount: Value) -> OutputRef {
        ledger.add_txout(TransactionOutput::new(self.address, amount))
    }

    pub fn utxos(&self, ledger: &MockLedger) -> Vec<Utxo> {
        ledger.utxos_at(&self.address)
    }

    pub fn balance(&self, ledger: &MockLedger) -> Value {
        self.utxos(ledger).iter().map(|u| &u.output.amount).sum()
    }

    /// Verification-key witness with a placeholder signature
    pub fn witness(&self) -> VKeyWitness {
        VKeyWitness {
            vkey: self.vkey.clone(),
            signature: vec![0; MOCK_SIGNATURE_SIZE],
        }
    }
}

/// A stake pool known to the ledger
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MockPool {
    pub pool_id: PoolId,
}

impl MockPool {
    pub fn new(ledger: &mut MockLedger) -> Self {
        let mut pool_id = [0u8; HASH28_SIZE];
        pool_id.copy_from_slice(&ledger.random_bytes(HASH28_SIZE));
        ledger.add_pool(pool_id);
        Self { pool_id }
    }
}
