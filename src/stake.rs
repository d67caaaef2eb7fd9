//! Stake account registry: registration, delegation and reward state per
//! reward address, mutated by certificates and withdrawals

use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

use crate::error::{LedgerError, Result};
use crate::types::*;

/// Per-reward-address stake state
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StakeAccount {
    pub registered: bool,
    pub delegated_pool: Option<PoolId>,
    pub accrued_rewards: Coin,
}

/// Credentials a transaction proves control over: the key hashes of its
/// verification-key witnesses and the hashes of the scripts it carries
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Authorization {
    key_hashes: BTreeSet<KeyHash>,
    script_hashes: BTreeSet<ScriptHash>,
    unrestricted: bool,
}

impl Authorization {
    pub fn new() -> Self {
        Self::default()
    }

    /// Authorization that accepts every credential (state seeding only)
    pub fn unrestricted() -> Self {
        Self { unrestricted: true, ..Self::default() }
    }

    /// Collect witnesses from `tx`; `reference_scripts` are the hashes of
    /// scripts attached to its resolved inputs and reference inputs
    pub fn from_transaction(
        tx: &Transaction,
        reference_scripts: impl IntoIterator<Item = ScriptHash>,
    ) -> Self {
        let witnesses = &tx.witness_set;
        let key_hashes = witnesses.vkey_witnesses.iter().map(VKeyWitness::key_hash).collect();
        let script_hashes = witnesses
            .plutus_v1_scripts
            .iter()
            .map(|s| crate::hash::script_hash(PlutusVersion::V1, s))
            .chain(
                witnesses
                    .plutus_v2_scripts
                    .iter()
                    .map(|s| crate::hash::script_hash(PlutusVersion::V2, s)),
            )
            .chain(reference_scripts)
            .collect();
        Self { key_hashes, script_hashes, unrestricted: false }
    }

    pub fn with_key(mut self, key_hash: KeyHash) -> Self {
        self.key_hashes.insert(key_hash);
        self
    }

    pub fn with_script(mut self, script_hash: ScriptHash) -> Self {
        self.script_hashes.insert(script_hash);
        self
    }

    pub fn authorizes(&self, credential: &Credential) -> bool {
        if self.unrestricted {
            return true;
        }
        match credential {
            Credential::Key(h) => self.key_hashes.contains(h),
            Credential::Script(h) => self.script_hashes.contains(h),
        }
    }
}

/// Stake accounts keyed by reward address, plus the set of known pools
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StakeRegistry {
    accounts: HashMap<RewardAddress, StakeAccount>,
    pools: BTreeSet<PoolId>,
}

impl StakeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_pool(&mut self, pool: PoolId) {
        debug!(target: "stake", "add_pool [pool={}]", hex::encode(pool));
        self.pools.insert(pool);
    }

    pub fn is_known_pool(&self, pool: &PoolId) -> bool {
        self.pools.contains(pool)
    }

    pub fn pools(&self) -> impl Iterator<Item = &PoolId> {
        self.pools.iter()
    }

    pub fn account(&self, address: &RewardAddress) -> Result<&StakeAccount> {
        self.accounts
            .get(address)
            .ok_or(LedgerError::AccountNotFound(*address))
    }

    pub fn is_registered(&self, address: &RewardAddress) -> bool {
        self.accounts.get(address).map_or(false, |a| a.registered)
    }

    /// Register a reward address; registering twice is rejected
    pub fn register(&mut self, address: RewardAddress) -> Result<()> {
        let account = self.accounts.entry(address).or_default();
        if account.registered {
            return Err(LedgerError::AlreadyRegistered(address));
        }
        account.registered = true;
        debug!(target: "stake", "register [address={}]", address);
        Ok(())
    }

    /// Deregister a reward address. Rewards must have been withdrawn first;
    /// the delegation is cleared.
    pub fn deregister(&mut self, address: RewardAddress, auth: &Authorization) -> Result<()> {
        let account = self.registered_mut(&address)?;
        if !auth.authorizes(&address.credential) {
            return Err(LedgerError::UnauthorizedStakeAction(address));
        }
        if account.accrued_rewards > 0 {
            return Err(LedgerError::RewardsNotWithdrawn(address));
        }
        account.registered = false;
        account.delegated_pool = None;
        debug!(target: "stake", "deregister [address={}]", address);
        Ok(())
    }

    /// Delegate a registered reward address to a known pool
    pub fn delegate(&mut self, address: RewardAddress, pool: PoolId, auth: &Authorization) -> Result<()> {
        if !self.is_registered(&address) {
            return Err(LedgerError::NotRegistered(address));
        }
        if !self.pools.contains(&pool) {
            return Err(LedgerError::UnknownPool(pool));
        }
        if !auth.authorizes(&address.credential) {
            return Err(LedgerError::UnauthorizedStakeAction(address));
        }
        self.registered_mut(&address)?.delegated_pool = Some(pool);
        debug!(target: "stake", "delegate [address={}, pool={}]", address, hex::encode(pool));
        Ok(())
    }

    /// Withdraw the full accrued balance. Any other amount is rejected.
    pub fn withdraw(&mut self, address: RewardAddress, amount: Coin, auth: &Authorization) -> Result<()> {
        let account = self.registered_mut(&address)?;
        if !auth.authorizes(&address.credential) {
            return Err(LedgerError::UnauthorizedStakeAction(address));
        }
        if amount != account.accrued_rewards {
            return Err(LedgerError::PartialWithdrawal {
                address,
                requested: amount,
                available: account.accrued_rewards,
            });
        }
        account.accrued_rewards = 0;
        debug!(target: "stake", "withdraw [address={}, amount={}]", address, amount);
        Ok(())
    }

    /// Credit `total` to every account that is registered and delegated.
    /// Flat per account, not stake-weighted. Returns the number credited.
    pub fn distribute(&mut self, total: Coin) -> usize {
        let mut credited = 0;
        for account in self.accounts.values_mut() {
            if account.registered && account.delegated_pool.is_some() {
                account.accrued_rewards = account.accrued_rewards.saturating_add(total);
                credited += 1;
            }
        }
        debug!(target: "stake", "distribute [total={}, accounts={}]", total, credited);
        credited
    }

    /// Apply one certificate on `network`
    pub fn apply_certificate(
        &mut self,
        certificate: &Certificate,
        network: Network,
        auth: &Authorization,
    ) -> Result<()> {
        let address = RewardAddress::new(network, *certificate.credential());
        match certificate {
            Certificate::StakeRegistration(_) => self.register(address),
            Certificate::StakeDeregistration(_) => self.deregister(address, auth),
            Certificate::StakeDelegation { pool, .. } => self.delegate(address, *pool, auth),
        }
    }

    fn registered_mut(&mut self, address: &RewardAddress) -> Result<&mut StakeAccount> {
        match self.accounts.get_mut(address) {
            Some(account) if account.registered => Ok(account),
            _ => Err(LedgerError::NotRegistered(*address)),
        }
    }
}
