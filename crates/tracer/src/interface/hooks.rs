use eyre::Result;
use revm::primitives::{Address, Bytes, U256};
use serde::{Deserialize, Serialize};
use statediff_common::state::StateReader;

use crate::CallType;

/// The outermost call of a transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallStart {
    /// The transaction sender
    pub from: Address,
    /// The callee, or the address of the contract being created
    pub to: Address,
    /// Whether the transaction creates a contract
    #[serde(default)]
    pub create: bool,
    /// Call data or init code
    #[serde(default)]
    pub input: Bytes,
    /// Gas available to the call
    #[serde(default)]
    pub gas: u64,
    /// Value sent with the transaction
    #[serde(default)]
    pub value: U256,
}

/// A nested call frame being entered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallEnter {
    /// The frame type
    #[serde(rename = "type")]
    pub typ: CallType,
    /// The caller, or the destroyed contract for a self-destruct
    pub from: Address,
    /// The callee, the created contract, or the self-destruct beneficiary
    pub to: Address,
    /// Call data or init code
    #[serde(default)]
    pub input: Bytes,
    /// Gas available to the frame
    #[serde(default)]
    pub gas: u64,
    /// Value carried by the frame. For a self-destruct, the balance being removed.
    #[serde(default)]
    pub value: Option<U256>,
}

/// The result of a frame, delivered when it completes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallResult {
    /// Return data, or runtime code for a successful creation
    #[serde(default)]
    pub output: Bytes,
    /// Gas consumed by the frame
    #[serde(default)]
    pub gas_used: u64,
    /// The error the frame failed with, if any
    #[serde(default)]
    pub error: Option<String>,
}

/// One interpreter step, observed before the opcode executes.
#[derive(Debug, Clone, Copy)]
pub struct OpcodeStep<'a> {
    /// Program counter
    pub pc: u64,
    /// The opcode about to execute
    pub op: u8,
    /// Gas left before the opcode
    pub gas: u64,
    /// Gas cost of the opcode
    pub cost: u64,
    /// Call depth
    pub depth: usize,
    /// The account whose storage the frame operates on
    pub contract: Address,
    /// The operand stack, top of stack last
    pub stack: &'a [U256],
}

/// The execution lifecycle events of one traced transaction, delivered strictly in the
/// order they occur.
///
/// Handlers that may need to capture a `before` value receive the committed-state reader
/// as it is at the time of the event. The reader must reflect every state change the engine
/// made before the event fired.
pub trait ExecutionTracer {
    /// The transaction starts with `gas_limit` gas.
    fn on_tx_start(&mut self, gas_limit: u64);

    /// The transaction ends with `rest_gas` gas left.
    fn on_tx_end(&mut self, rest_gas: u64) -> Result<()>;

    /// The outermost call starts.
    fn on_call_start<S: StateReader + ?Sized>(&mut self, state: &S, call: CallStart)
        -> Result<()>;

    /// The outermost call completes.
    fn on_call_end<S: StateReader + ?Sized>(&mut self, state: &S, result: CallResult)
        -> Result<()>;

    /// A nested frame is entered.
    fn on_call_enter<S: StateReader + ?Sized>(&mut self, state: &S, call: CallEnter)
        -> Result<()>;

    /// The innermost nested frame completes.
    fn on_call_exit<S: StateReader + ?Sized>(&mut self, state: &S, result: CallResult)
        -> Result<()>;

    /// An opcode is about to execute.
    fn on_opcode<S: StateReader + ?Sized>(&mut self, state: &S, step: &OpcodeStep<'_>)
        -> Result<()>;

    /// Execution faulted at `step`.
    fn on_fault(&mut self, step: &OpcodeStep<'_>, error: &str);
}
