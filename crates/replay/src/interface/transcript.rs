use alloy::eips::BlockNumberOrTag;
use revm::primitives::{Address, U256};
use serde::{Deserialize, Serialize};
use statediff_common::{AccountOverride, Prestate};
use statediff_tracer::{CallEnter, CallResult, CallStart, OpcodeStep, TraceResult};

/// A recorded execution: the state it started from and the events of each transaction, in
/// order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transcript {
    /// The block the transactions ran on top of
    #[serde(default)]
    pub block_number: BlockNumberOrTag,
    /// Accounts as they were before the first transaction
    #[serde(default)]
    pub prestate: Prestate,
    /// The transactions, in execution order
    #[serde(default)]
    pub transactions: Vec<TransactionTranscript>,
}

/// The events of a single transaction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionTranscript {
    /// Gas price the sender paid. Falls back to the tracer configuration.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gas_price: Option<U256>,
    /// Events, in the order the engine emitted them
    pub events: Vec<TraceEvent>,
}

/// A single recorded event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum TraceEvent {
    /// The transaction starts
    #[serde(rename_all = "camelCase")]
    TxStart {
        /// Gas limit of the transaction
        gas_limit: u64,
    },
    /// The outermost call starts
    CallStart(CallStart),
    /// A nested frame is entered
    CallEnter(CallEnter),
    /// An opcode is about to execute
    Opcode(OpcodeEvent),
    /// The innermost nested frame completes
    CallExit(CallResult),
    /// The outermost call completes
    CallEnd(CallResult),
    /// Execution faulted
    Fault(FaultEvent),
    /// The transaction ends
    #[serde(rename_all = "camelCase")]
    TxEnd {
        /// Gas left at the end of the transaction
        rest_gas: u64,
    },
    /// The engine changed committed state. Applied to the replay state only.
    StateWrite {
        /// The written account
        address: Address,
        /// The fields written
        account: AccountOverride,
    },
    /// The host moved value through the tracer's transfer hook.
    Transfer {
        /// The account debited
        from: Address,
        /// The account credited
        to: Address,
        /// The amount moved, in wei
        amount: U256,
    },
    /// The host aborted the trace.
    Abort {
        /// Why the trace was aborted
        reason: String,
    },
}

/// A recorded interpreter step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpcodeEvent {
    /// Program counter
    #[serde(default)]
    pub pc: u64,
    /// The opcode
    pub op: u8,
    /// Gas left before the opcode
    #[serde(default)]
    pub gas: u64,
    /// Gas cost of the opcode
    #[serde(default)]
    pub cost: u64,
    /// Call depth
    #[serde(default)]
    pub depth: usize,
    /// The account whose storage the frame operates on
    pub contract: Address,
    /// The operand stack, top of stack last
    #[serde(default)]
    pub stack: Vec<U256>,
}

impl OpcodeEvent {
    /// Borrows the event as an [`OpcodeStep`].
    pub fn step(&self) -> OpcodeStep<'_> {
        OpcodeStep {
            pc: self.pc,
            op: self.op,
            gas: self.gas,
            cost: self.cost,
            depth: self.depth,
            contract: self.contract,
            stack: &self.stack,
        }
    }
}

/// A recorded execution fault.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FaultEvent {
    /// The step that faulted
    #[serde(flatten)]
    pub step: OpcodeEvent,
    /// The fault
    pub error: String,
}

/// The result of replaying a transcript: one trace result per transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CallManyResult {
    /// The block the transactions ran on top of
    pub block_number: BlockNumberOrTag,
    /// Trace results, in transaction order
    pub trace_result: Vec<TraceResult>,
}

#[cfg(test)]
mod tests {
    use revm::primitives::Bytes;
    use serde_json::json;

    use super::*;

    #[test]
    fn parses_events() {
        let events: Vec<TraceEvent> = serde_json::from_value(json!([
            { "event": "txStart", "gasLimit": 21000 },
            {
                "event": "callStart",
                "from": "0x1111111111111111111111111111111111111111",
                "to": "0x2222222222222222222222222222222222222222",
                "value": "0x1e",
                "gas": 21000
            },
            {
                "event": "opcode",
                "op": 85,
                "contract": "0x2222222222222222222222222222222222222222",
                "stack": ["0x2a", "0x1"]
            },
            {
                "event": "stateWrite",
                "address": "0x2222222222222222222222222222222222222222",
                "account": { "balance": "0x1e" }
            },
            { "event": "callEnd", "output": "0x", "gasUsed": 21000 },
            { "event": "txEnd", "restGas": 0 }
        ]))
        .unwrap();

        assert_eq!(events.len(), 6);
        assert_eq!(events[0], TraceEvent::TxStart { gas_limit: 21_000 });
        let TraceEvent::CallStart(call) = &events[1] else { panic!("expected callStart") };
        assert!(!call.create);
        assert_eq!(call.value, U256::from(30));
        let TraceEvent::Opcode(step) = &events[2] else { panic!("expected opcode") };
        assert_eq!(step.step().stack, &[U256::from(42), U256::from(1)]);
        let TraceEvent::CallEnd(result) = &events[4] else { panic!("expected callEnd") };
        assert_eq!(result.output, Bytes::new());
        assert_eq!(events[5], TraceEvent::TxEnd { rest_gas: 0 });
    }

    #[test]
    fn block_number_defaults_to_latest() {
        let transcript: Transcript = serde_json::from_value(json!({ "transactions": [] })).unwrap();
        assert_eq!(transcript.block_number, BlockNumberOrTag::Latest);
        assert!(transcript.prestate.is_empty());
    }
}
