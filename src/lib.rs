//! # Plutus Bench
//!
//! In-memory ledger simulator for exercising Plutus validators without a node.
//!
//! The crate keeps a UTxO set and a stake account registry, turns every
//! script-triggering event of a transaction into a script invocation with a
//! version-correct script context, hands those invocations to a pluggable
//! interpreter and applies the transaction's effects only when every script
//! and every ledger rule passes.
//!
//! ## Architecture
//!
//! - `utxo` / `stake`: ledger state
//! - `context` / `resolver`: script contexts for Plutus V1 and V2
//! - `interpreter`: the boundary to script execution
//! - `budget`: execution-unit normalization and reporting
//! - `ledger`: the validation and submission pipeline
//! - `session`: independent ledgers keyed by session id
//!
//! ## Usage
//!
//! ```rust
//! use plutus_bench::*;
//! use plutus_bench::tool::address_from_script;
//!
//! let script = Script::new(PlutusVersion::V2, vec![0x01]);
//! let owner = [7u8; 28];
//! let validators = NativeValidators::new().with(&script, move |args| {
//!     if args.signed_by(&owner) {
//!         Ok(())
//!     } else {
//!         Err("owner did not sign".to_string())
//!     }
//! });
//! let mut ledger = MockLedger::with_interpreter(validators);
//!
//! let script_address = address_from_script(&script, ledger.network());
//! let locked = ledger.add_txout(
//!     TransactionOutput::new(script_address, Value::lovelace(100)).with_inline_datum(PlutusData::unit()),
//! );
//! let user = MockUser::new(&mut ledger);
//!
//! let tx = Transaction::new(
//!     TransactionBody {
//!         inputs: vec![locked],
//!         outputs: vec![TransactionOutput::new(user.address, Value::lovelace(100))],
//!         required_signers: vec![owner],
//!         ..Default::default()
//!     },
//!     WitnessSet {
//!         plutus_v2_scripts: vec![script.bytes.clone()],
//!         redeemers: vec![Redeemer::new(RedeemerTag::Spend, 0, PlutusData::unit())],
//!         ..Default::default()
//!     },
//! );
//! ledger.submit_tx(&tx).unwrap();
//! assert_eq!(user.balance(&ledger).coin, 100);
//! ```

pub mod types;
pub mod constants;
pub mod error;
pub mod hash;
pub mod plutus_data;
pub mod codec;
pub mod config;
pub mod utxo;
pub mod stake;
pub mod context;
pub mod resolver;
pub mod budget;
pub mod interpreter;
pub mod transaction;
pub mod ledger;
pub mod session;
pub mod tool;
pub mod user;

// Re-export commonly used types
pub use types::*;
pub use constants::*;
pub use error::{LedgerError, Result};

pub use budget::EvaluationReport;
pub use config::{GenesisParameters, LedgerConfig, ProtocolParameters};
pub use context::{ScriptContext, ScriptPurpose, TxInfo};
pub use interpreter::{EvalOutcome, EvalRequest, NativeValidators, ScriptInterpreter, ValidatorArgs};
pub use ledger::{MockLedger, SharedInterpreter, Tip};
pub use plutus_data::{PlutusData, ToPlutusData};
pub use resolver::ScriptInvocation;
pub use session::{SessionId, SessionStore};
pub use stake::{Authorization, StakeAccount, StakeRegistry};
pub use user::{MockPool, MockUser};
pub use utxo::UtxoStore;
