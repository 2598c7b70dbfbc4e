mod report;

pub use report::*;

use alloy::primitives::I256;
use eyre::{bail, eyre, OptionExt, Result};
use revm::{
    interpreter::opcode,
    primitives::{Address, Bytes, B256, U256},
};
use statediff_common::{db::TransferState, state::StateReader};
use tracing::{debug, trace, warn};

use crate::{
    AccountsDiff, CallEnter, CallFrame, CallResult, CallStart, CallTracer, CallType,
    ExecutionTracer, OpcodeStep, TraceResult, TracerConfig,
};

/// Records the minimal state diff of one traced transaction.
///
/// Every event is forwarded to an inner [`CallTracer`] first, and the completed frames it
/// hands back drive the balance, nonce and code rules. Gas is charged to the sender exactly
/// once, when the transaction ends, so that intrinsic gas is included and nested frames never
/// count the same gas twice.
#[derive(Debug, Clone)]
pub struct StateDiffTracer {
    accounts: AccountsDiff,
    calls: CallTracer,
    gas_limit: u64,
    gas_price: U256,
    interrupted: Option<String>,
}

impl StateDiffTracer {
    /// Creates a new [`StateDiffTracer`].
    pub fn new(config: TracerConfig) -> Self {
        Self {
            accounts: AccountsDiff::new(),
            calls: CallTracer::new(config.only_top_call),
            gas_limit: 0,
            gas_price: config.gas_price.unwrap_or_else(|| U256::from(1)),
            interrupted: None,
        }
    }

    /// Overrides the gas price the sender is charged at.
    pub fn set_gas_price(&mut self, gas_price: U256) {
        self.gas_price = gas_price;
    }

    /// The diff accumulated so far.
    pub fn accounts(&self) -> &AccountsDiff {
        &self.accounts
    }

    /// The call tree built so far.
    pub fn call_frames(&self) -> Option<&CallFrame> {
        self.calls.root()
    }

    /// Moves `amount` from `sender` to `recipient` through `state` and records both sides of
    /// the transfer. Hosts that route value transfers through this hook must not also report
    /// the value on their call frames, or it is counted twice.
    pub fn transfer<T: TransferState + ?Sized>(
        &mut self,
        state: &mut T,
        sender: Address,
        recipient: Address,
        amount: U256,
    ) -> Result<()> {
        state.transfer(sender, recipient, amount)?;
        let amount = signed(amount)?;
        self.accounts.add_balance(sender, -amount)?;
        self.accounts.add_balance(recipient, amount)
    }

    /// Marks the traced execution as aborted by the host. No report is produced afterwards.
    pub fn stop(&mut self, reason: impl Into<String>) {
        let reason = reason.into();
        warn!(reason = %reason, "trace interrupted");
        self.interrupted = Some(reason);
    }

    /// Consumes the tracer and produces the state diff, reading current balances and nonces
    /// from `state`.
    pub fn get_result<S: StateReader + ?Sized>(self, state: &S) -> Result<TraceResult> {
        if let Some(reason) = self.interrupted {
            bail!("trace aborted: {}", reason);
        }

        let state_diff = generate_report(&self.accounts, state)?;
        debug!(accounts = state_diff.len(), "generated state diff");

        Ok(TraceResult { state_diff })
    }

    /// Applies the code and balance rules of a completed frame.
    fn record_frame<S: StateReader + ?Sized>(&mut self, frame: &CallFrame, state: &S) -> Result<()> {
        match frame.typ {
            CallType::Create | CallType::Create2 => {
                // a failed creation deploys nothing
                let code = match frame.error {
                    None => frame.output.clone(),
                    Some(_) => Bytes::new(),
                };
                self.accounts.set_code(frame.to, code, state)?;
                self.record_value(frame)
            }
            CallType::Call => self.record_value(frame),
            CallType::SelfDestruct => {
                let (contract, beneficiary) = (frame.from, frame.to);
                self.accounts.set_code(contract, Bytes::new(), state)?;

                let balance = match frame.value {
                    Some(value) => value,
                    None => state.balance(contract)?,
                };
                let balance = signed(balance)?;
                self.accounts.add_balance(contract, -balance)?;
                if beneficiary != contract {
                    self.accounts.add_balance(beneficiary, balance)?;
                }
                Ok(())
            }
            CallType::CallCode | CallType::DelegateCall | CallType::StaticCall => Ok(()),
        }
    }

    fn record_value(&mut self, frame: &CallFrame) -> Result<()> {
        let Some(value) = frame.value else {
            return Ok(());
        };
        let value = signed(value)?;
        self.accounts.add_balance(frame.from, -value)?;
        self.accounts.add_balance(frame.to, value)
    }
}

impl ExecutionTracer for StateDiffTracer {
    fn on_tx_start(&mut self, gas_limit: u64) {
        debug!(gas_limit, "transaction start");
        self.gas_limit = gas_limit;
    }

    fn on_tx_end(&mut self, rest_gas: u64) -> Result<()> {
        let Some(root) = self.calls.tx_end(self.gas_limit, rest_gas) else {
            warn!(rest_gas, "transaction end without a top-level call, nothing charged");
            return Ok(());
        };
        let (caller, typ, gas_used) = (root.from, root.typ, root.gas_used);

        let cost = U256::from(gas_used).checked_mul(self.gas_price).ok_or_eyre("gas cost overflow")?;
        debug!(caller = ?caller, gas_used, cost = %cost, "charging gas");
        self.accounts.add_balance(caller, -signed(cost)?)?;

        // creations already counted the sender's nonce when the call started
        if !typ.is_create() {
            self.accounts.increment_nonce(caller);
        }
        Ok(())
    }

    fn on_call_start<S: StateReader + ?Sized>(&mut self, state: &S, call: CallStart) -> Result<()> {
        let typ = if call.create { CallType::Create } else { CallType::Call };
        self.calls.start(CallFrame::new(typ, call.from, call.to, call.input, call.gas, Some(call.value)));

        if call.create {
            self.accounts.increment_nonce(call.from);
            self.accounts.capture_code(call.to, state)?;
        }
        Ok(())
    }

    fn on_call_end<S: StateReader + ?Sized>(&mut self, state: &S, result: CallResult) -> Result<()> {
        let Some(frame) = self.calls.end(result.output, result.gas_used, result.error) else {
            return Ok(());
        };
        // gas is not charged here, see `on_tx_end`
        self.record_frame(&frame, state)
    }

    fn on_call_enter<S: StateReader + ?Sized>(&mut self, state: &S, call: CallEnter) -> Result<()> {
        let CallEnter { typ, from, to, input, gas, value } = call;
        self.calls.enter(CallFrame::new(typ, from, to, input, gas, value));

        match typ {
            CallType::Create | CallType::Create2 => {
                self.accounts.increment_nonce(from);
                self.accounts.capture_code(to, state)
            }
            // the engine may clear the code before the frame exits
            CallType::SelfDestruct => self.accounts.capture_code(from, state),
            _ => Ok(()),
        }
    }

    fn on_call_exit<S: StateReader + ?Sized>(&mut self, state: &S, result: CallResult) -> Result<()> {
        let Some(frame) = self.calls.exit(result.output, result.gas_used, result.error) else {
            return Ok(());
        };
        // gas is not charged here, see `on_tx_end`
        self.record_frame(&frame, state)
    }

    fn on_opcode<S: StateReader + ?Sized>(&mut self, state: &S, step: &OpcodeStep<'_>) -> Result<()> {
        if step.op != opcode::SSTORE {
            return Ok(());
        }

        let [.., value, key] = step.stack else {
            trace!(pc = step.pc, depth = step.stack.len(), "SSTORE with a short stack, skipped");
            return Ok(());
        };

        self.accounts.set_storage(
            step.contract,
            B256::from(key.to_be_bytes::<32>()),
            B256::from(value.to_be_bytes::<32>()),
            state,
        )
    }

    fn on_fault(&mut self, step: &OpcodeStep<'_>, error: &str) {
        self.calls.fault(step.pc, step.op, step.depth, error);
    }
}

fn signed(value: U256) -> Result<I256> {
    I256::try_from(value).map_err(|_| eyre!("value {} exceeds the signed 256-bit range", value))
}
