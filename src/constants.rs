//! Protocol constants and preview-network defaults

/// Length of key hashes, script hashes and policy ids
pub const HASH28_SIZE: usize = 28;

/// Length of transaction ids and datum hashes
pub const HASH32_SIZE: usize = 32;

/// Prefix byte hashed in front of Plutus V1 script bytes
pub const PLUTUS_V1_SCRIPT_TAG: u8 = 0x01;

/// Prefix byte hashed in front of Plutus V2 script bytes
pub const PLUTUS_V2_SCRIPT_TAG: u8 = 0x02;

/// Per-transaction memory budget
pub const DEFAULT_MAX_TX_EX_MEM: i64 = 14_000_000;

/// Per-transaction CPU step budget
pub const DEFAULT_MAX_TX_EX_STEPS: i64 = 10_000_000_000;

/// Per-block memory budget
pub const DEFAULT_MAX_BLOCK_EX_MEM: i64 = 62_000_000;

/// Per-block CPU step budget
pub const DEFAULT_MAX_BLOCK_EX_STEPS: i64 = 20_000_000_000;

pub const DEFAULT_MIN_FEE_A: u64 = 44;
pub const DEFAULT_MIN_FEE_B: u64 = 155_381;
pub const DEFAULT_MAX_TX_SIZE: u64 = 16_384;
pub const DEFAULT_MAX_BLOCK_SIZE: u64 = 90_112;
pub const DEFAULT_MAX_VAL_SIZE: u64 = 5_000;

/// Stake key registration deposit
pub const DEFAULT_KEY_DEPOSIT: u64 = 2_000_000;

/// Stake pool registration deposit
pub const DEFAULT_POOL_DEPOSIT: u64 = 500_000_000;

pub const DEFAULT_COINS_PER_UTXO_BYTE: u64 = 4_310;
pub const DEFAULT_COLLATERAL_PERCENT: u64 = 150;
pub const DEFAULT_MAX_COLLATERAL_INPUTS: u64 = 3;
pub const DEFAULT_PRICE_MEM: f64 = 0.0577;
pub const DEFAULT_PRICE_STEP: f64 = 0.0000721;
pub const DEFAULT_PROTOCOL_MAJOR_VERSION: u64 = 8;
pub const DEFAULT_PROTOCOL_MINOR_VERSION: u64 = 0;

/// Preview network system start (POSIX seconds)
pub const DEFAULT_SYSTEM_START: i64 = 1_666_656_000;

/// Seconds per slot
pub const DEFAULT_SLOT_LENGTH: i64 = 1;

/// Slots per epoch
pub const DEFAULT_EPOCH_LENGTH: u64 = 86_400;

pub const DEFAULT_NETWORK_MAGIC: u64 = 2;
pub const DEFAULT_SECURITY_PARAM: u64 = 432;
pub const DEFAULT_ACTIVE_SLOTS_COEFFICIENT: f64 = 0.05;
pub const DEFAULT_MAX_LOVELACE_SUPPLY: u64 = 45_000_000_000_000_000;
pub const DEFAULT_SLOTS_PER_KES_PERIOD: u64 = 129_600;
pub const DEFAULT_MAX_KES_EVOLUTIONS: u64 = 62;
pub const DEFAULT_UPDATE_QUORUM: u64 = 5;

/// Nominal cost reported by a native validator when none is configured
pub const NATIVE_VALIDATOR_MEM: i64 = 10_000;
pub const NATIVE_VALIDATOR_STEPS: i64 = 10_000_000;

/// Length of generated verification keys for mock users
pub const MOCK_VKEY_SIZE: usize = 32;
