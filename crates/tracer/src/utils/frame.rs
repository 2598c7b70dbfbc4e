use revm::primitives::{Address, Bytes, U256};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

/// The kind of a call frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CallType {
    /// A regular message call
    Call,
    /// A call running the callee's code in the caller's context
    CallCode,
    /// A call running the callee's code with the caller's context and value
    DelegateCall,
    /// A read-only call
    StaticCall,
    /// Contract creation with a nonce-derived address
    Create,
    /// Contract creation with a salt-derived address
    Create2,
    /// Contract self-destruction
    SelfDestruct,
}

impl CallType {
    /// Returns `true` for both contract creation variants.
    pub fn is_create(&self) -> bool {
        matches!(self, CallType::Create | CallType::Create2)
    }
}

/// A single frame of the call tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallFrame {
    /// The frame type
    #[serde(rename = "type")]
    pub typ: CallType,
    /// The caller. For a self-destruct, the destroyed contract.
    pub from: Address,
    /// The callee. For a creation, the new contract. For a self-destruct, the beneficiary.
    pub to: Address,
    /// The value carried by the frame, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<U256>,
    /// Gas made available to the frame
    pub gas: u64,
    /// Gas consumed by the frame
    pub gas_used: u64,
    /// Call data, or init code for a creation
    pub input: Bytes,
    /// Return data, or runtime code for a successful creation
    #[serde(default)]
    pub output: Bytes,
    /// The error the frame failed with, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Nested frames, in execution order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub calls: Vec<CallFrame>,
}

impl CallFrame {
    /// Opens a new frame with no result yet.
    pub fn new(
        typ: CallType,
        from: Address,
        to: Address,
        input: Bytes,
        gas: u64,
        value: Option<U256>,
    ) -> Self {
        Self {
            typ,
            from,
            to,
            value,
            gas,
            gas_used: 0,
            input,
            output: Bytes::new(),
            error: None,
            calls: Vec::new(),
        }
    }

    fn complete(&mut self, output: Bytes, gas_used: u64, error: Option<String>) {
        self.output = output;
        self.gas_used = gas_used;
        self.error = error;
    }
}

/// Builds the nested call tree of a single transaction.
///
/// The root frame stays at the bottom of the stack for the whole transaction. Nested frames
/// are pushed on enter and popped on exit, and are attached to their parent unless only the
/// top call is requested.
#[derive(Debug, Clone, Default)]
pub struct CallTracer {
    only_top_call: bool,
    stack: Vec<CallFrame>,
}

impl CallTracer {
    /// Creates a new [`CallTracer`].
    pub fn new(only_top_call: bool) -> Self {
        Self { only_top_call, stack: Vec::new() }
    }

    /// Opens the root frame.
    pub fn start(&mut self, frame: CallFrame) {
        debug!(typ = ?frame.typ, from = ?frame.from, to = ?frame.to, "call start");
        self.stack.clear();
        self.stack.push(frame);
    }

    /// Completes the root frame and returns a copy of it.
    pub fn end(&mut self, output: Bytes, gas_used: u64, error: Option<String>) -> Option<CallFrame> {
        let Some(root) = self.stack.first_mut() else {
            warn!("call end without a root frame");
            return None;
        };
        root.complete(output, gas_used, error);
        debug!(gas_used, error = ?root.error, "call end");
        Some(root.clone())
    }

    /// Pushes a nested frame.
    pub fn enter(&mut self, frame: CallFrame) {
        debug!(
            depth = self.stack.len(),
            typ = ?frame.typ,
            from = ?frame.from,
            to = ?frame.to,
            "call enter"
        );
        self.stack.push(frame);
    }

    /// Pops the innermost nested frame, completes it and returns a copy of it. An exit with
    /// only the root frame open is ignored.
    pub fn exit(&mut self, output: Bytes, gas_used: u64, error: Option<String>) -> Option<CallFrame> {
        if self.stack.len() <= 1 {
            warn!(depth = self.stack.len(), "call exit without a nested frame");
            return None;
        }

        let mut frame = self.stack.pop()?;
        frame.complete(output, gas_used, error);
        debug!(depth = self.stack.len(), typ = ?frame.typ, gas_used, "call exit");

        if !self.only_top_call {
            if let Some(parent) = self.stack.last_mut() {
                parent.calls.push(frame.clone());
            }
        }

        Some(frame)
    }

    /// Settles the gas used by the whole transaction on the root frame.
    pub fn tx_end(&mut self, gas_limit: u64, rest_gas: u64) -> Option<&CallFrame> {
        let root = self.stack.first_mut()?;
        root.gas_used = gas_limit.saturating_sub(rest_gas);
        Some(root)
    }

    /// Notes an execution fault. The call tree is not modified.
    pub fn fault(&self, pc: u64, op: u8, depth: usize, error: &str) {
        trace!(pc, op, depth, error, "execution fault");
    }

    /// The root frame, once the transaction has started.
    pub fn root(&self) -> Option<&CallFrame> {
        self.stack.first()
    }

    /// The number of open frames, the root included.
    pub fn depth(&self) -> usize {
        self.stack.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(typ: CallType, from: u8, to: u8) -> CallFrame {
        CallFrame::new(
            typ,
            Address::with_last_byte(from),
            Address::with_last_byte(to),
            Bytes::new(),
            100_000,
            Some(U256::ZERO),
        )
    }

    #[test]
    fn builds_nested_tree() {
        let mut tracer = CallTracer::new(false);
        tracer.start(frame(CallType::Call, 1, 2));
        tracer.enter(frame(CallType::StaticCall, 2, 3));
        tracer.enter(frame(CallType::Call, 3, 4));

        let inner = tracer.exit(Bytes::from_static(&[1]), 10, None).unwrap();
        assert_eq!(inner.to, Address::with_last_byte(4));
        assert_eq!(inner.gas_used, 10);

        let middle = tracer.exit(Bytes::new(), 20, Some("reverted".to_string())).unwrap();
        assert_eq!(middle.calls.len(), 1);
        assert_eq!(middle.error.as_deref(), Some("reverted"));

        tracer.end(Bytes::new(), 50, None).unwrap();
        let root = tracer.tx_end(100_000, 70_000).unwrap();
        assert_eq!(root.gas_used, 30_000);
        assert_eq!(root.calls.len(), 1);
        assert_eq!(root.calls[0].calls.len(), 1);
    }

    #[test]
    fn only_top_call_still_returns_nested_frames() {
        let mut tracer = CallTracer::new(true);
        tracer.start(frame(CallType::Call, 1, 2));
        tracer.enter(frame(CallType::Create, 2, 3));

        let created = tracer.exit(Bytes::new(), 5, None).unwrap();
        assert_eq!(created.typ, CallType::Create);
        assert!(tracer.root().unwrap().calls.is_empty());
    }

    #[test]
    fn exit_without_nested_frame_is_ignored() {
        let mut tracer = CallTracer::new(false);
        assert!(tracer.exit(Bytes::new(), 0, None).is_none());

        tracer.start(frame(CallType::Call, 1, 2));
        assert!(tracer.exit(Bytes::new(), 0, None).is_none());
        assert_eq!(tracer.depth(), 1);
    }

    #[test]
    fn serializes_like_a_call_trace() {
        let frame = frame(CallType::DelegateCall, 1, 2);
        let json = serde_json::to_value(&frame).unwrap();

        assert_eq!(json["type"], "DELEGATECALL");
        assert_eq!(json["gasUsed"], 0);
        assert!(json.get("calls").is_none());
        assert!(json.get("error").is_none());
    }
}
