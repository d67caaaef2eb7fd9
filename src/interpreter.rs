//! Script interpreter boundary
//!
//! The simulator never executes compiled validator bytecode itself. It hands
//! every invocation, with its arguments already encoded as `PlutusData`, to a
//! `ScriptInterpreter`. `NativeValidators` is an interpreter whose validators
//! are Rust closures registered under script hashes, for driving the ledger
//! in tests without a bytecode evaluator.

use log::debug;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;

use crate::constants::{NATIVE_VALIDATOR_MEM, NATIVE_VALIDATOR_STEPS};
use crate::context::{ScriptContext, ScriptPurpose, TxInfo};
use crate::plutus_data::PlutusData;
use crate::resolver::ScriptInvocation;
use crate::types::*;

/// Everything the interpreter receives for one invocation
#[derive(Debug, Clone)]
pub struct EvalRequest<'a> {
    pub script: &'a Script,
    /// Datum (spending only), redeemer, script context
    pub arguments: Vec<PlutusData>,
    pub budget: ExUnits,
    pub invocation: &'a ScriptInvocation,
}

impl<'a> EvalRequest<'a> {
    pub fn new(invocation: &'a ScriptInvocation, budget: ExUnits) -> Self {
        Self {
            script: &invocation.script,
            arguments: invocation.arguments(),
            budget,
            invocation,
        }
    }
}

/// Result of one invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EvalOutcome {
    Success {
        consumed: ExUnits,
        logs: Vec<String>,
    },
    Failure {
        consumed: ExUnits,
        reason: String,
        logs: Vec<String>,
    },
}

impl EvalOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, EvalOutcome::Success { .. })
    }

    pub fn consumed(&self) -> ExUnits {
        match self {
            EvalOutcome::Success { consumed, .. } | EvalOutcome::Failure { consumed, .. } => *consumed,
        }
    }

    pub fn logs(&self) -> &[String] {
        match self {
            EvalOutcome::Success { logs, .. } | EvalOutcome::Failure { logs, .. } => logs,
        }
    }
}

/// Executes one script invocation against a budget. Calls are synchronous
/// and are not cancelled; enforcing the budget is the interpreter's job.
pub trait ScriptInterpreter {
    fn evaluate(&self, request: &EvalRequest<'_>) -> EvalOutcome;
}

impl<F> ScriptInterpreter for F
where
    F: Fn(&EvalRequest<'_>) -> EvalOutcome,
{
    fn evaluate(&self, request: &EvalRequest<'_>) -> EvalOutcome {
        self(request)
    }
}

/// Arguments seen by a native validator
pub struct ValidatorArgs<'a> {
    pub datum: Option<&'a PlutusData>,
    pub redeemer: &'a PlutusData,
    pub context: &'a ScriptContext,
    /// The encoded argument list, as a bytecode interpreter would receive it
    pub arguments: &'a [PlutusData],
    logs: RefCell<Vec<String>>,
}

impl<'a> ValidatorArgs<'a> {
    fn new(request: &'a EvalRequest<'a>) -> Self {
        let invocation = request.invocation;
        Self {
            datum: invocation.datum.as_ref(),
            redeemer: &invocation.redeemer.data,
            context: &invocation.context,
            arguments: &request.arguments,
            logs: RefCell::new(Vec::new()),
        }
    }

    /// Emit a log line, returned with the outcome
    pub fn trace(&self, message: impl Into<String>) {
        self.logs.borrow_mut().push(message.into());
    }

    pub fn tx_info(&self) -> &TxInfo {
        &self.context.tx_info
    }

    pub fn purpose(&self) -> &ScriptPurpose {
        &self.context.purpose
    }

    /// True when `key_hash` is among the required signers
    pub fn signed_by(&self, key_hash: &KeyHash) -> bool {
        self.tx_info().signatories().contains(key_hash)
    }

    fn into_logs(self) -> Vec<String> {
        self.logs.into_inner()
    }
}

pub type NativeValidator =
    Box<dyn Fn(&ValidatorArgs<'_>) -> std::result::Result<(), String> + Send + Sync>;

struct Registered {
    validator: NativeValidator,
    cost: ExUnits,
}

/// Interpreter dispatching on script hash to registered Rust closures.
///
/// Each validator reports a fixed nominal cost. A cost above the budget in
/// either dimension fails the invocation with "budget exhausted"; scripts
/// without a registered validator fail.
#[derive(Default)]
pub struct NativeValidators {
    validators: HashMap<ScriptHash, Registered>,
}

impl fmt::Debug for NativeValidators {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let hashes: Vec<String> = self.validators.keys().map(hex::encode).collect();
        f.debug_struct("NativeValidators").field("validators", &hashes).finish()
    }
}

impl NativeValidators {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `validator` for `script` at the default nominal cost
    pub fn register<F>(&mut self, script: &Script, validator: F) -> &mut Self
    where
        F: Fn(&ValidatorArgs<'_>) -> std::result::Result<(), String> + Send + Sync + 'static,
    {
        let cost = ExUnits::new(NATIVE_VALIDATOR_MEM, NATIVE_VALIDATOR_STEPS);
        self.register_with_cost(script, cost, validator)
    }

    pub fn register_with_cost<F>(&mut self, script: &Script, cost: ExUnits, validator: F) -> &mut Self
    where
        F: Fn(&ValidatorArgs<'_>) -> std::result::Result<(), String> + Send + Sync + 'static,
    {
        self.validators.insert(
            script.hash(),
            Registered {
                validator: Box::new(validator),
                cost,
            },
        );
        self
    }

    /// Builder form of `register`
    pub fn with<F>(mut self, script: &Script, validator: F) -> Self
    where
        F: Fn(&ValidatorArgs<'_>) -> std::result::Result<(), String> + Send + Sync + 'static,
    {
        self.register(script, validator);
        self
    }

    pub fn contains(&self, hash: &ScriptHash) -> bool {
        self.validators.contains_key(hash)
    }
}

impl ScriptInterpreter for NativeValidators {
    fn evaluate(&self, request: &EvalRequest<'_>) -> EvalOutcome {
        let hash = request.script.hash();
        let Some(registered) = self.validators.get(&hash) else {
            return EvalOutcome::Failure {
                consumed: ExUnits::default(),
                reason: format!("no validator registered for script {}", hex::encode(hash)),
                logs: Vec::new(),
            };
        };
        if registered.cost.exceeds(&request.budget) {
            debug!(
                target: "interpreter",
                "budget exhausted [script={}, budget={:?}, cost={:?}]",
                hex::encode(hash),
                request.budget,
                registered.cost
            );
            return EvalOutcome::Failure {
                consumed: request.budget,
                reason: "budget exhausted".to_string(),
                logs: Vec::new(),
            };
        }

        let args = ValidatorArgs::new(request);
        let result = (registered.validator)(&args);
        let logs = args.into_logs();
        debug!(
            target: "interpreter",
            "evaluated [script={}, success={}, logs={}]",
            hex::encode(hash),
            result.is_ok(),
            logs.len()
        );
        match result {
            Ok(()) => EvalOutcome::Success {
                consumed: registered.cost,
                logs,
            },
            Err(reason) => EvalOutcome::Failure {
                consumed: registered.cost,
                reason,
                logs,
            },
        }
    }
}
