use std::path::{Path, PathBuf};

use eyre::{bail, Result, WrapErr};
use revm::db::InMemoryDB;
use statediff_common::db::apply_override;
use statediff_tracer::{ExecutionTracer, StateDiffTracer, TraceResult, TracerConfig};
use tracing::{debug, trace};

use crate::{TraceEvent, TransactionTranscript};

/// Replays the events of one transaction against `db` with a fresh tracer. State writes are
/// applied to `db` and persist for the transactions that follow.
pub(crate) fn replay_transaction(
    db: &mut InMemoryDB,
    transaction: &TransactionTranscript,
    config: &TracerConfig,
) -> Result<TraceResult> {
    let mut tracer = StateDiffTracer::new(config.clone());
    if let Some(gas_price) = transaction.gas_price {
        tracer.set_gas_price(gas_price);
    }

    for (index, event) in transaction.events.iter().enumerate() {
        apply_event(&mut tracer, db, event)
            .wrap_err_with(|| format!("failed to replay event {}", index))?;
    }

    tracer.get_result(&*db)
}

fn apply_event(tracer: &mut StateDiffTracer, db: &mut InMemoryDB, event: &TraceEvent) -> Result<()> {
    trace!(event = ?event, "replaying event");

    match event {
        TraceEvent::TxStart { gas_limit } => tracer.on_tx_start(*gas_limit),
        TraceEvent::CallStart(call) => tracer.on_call_start(&*db, call.clone())?,
        TraceEvent::CallEnter(call) => tracer.on_call_enter(&*db, call.clone())?,
        TraceEvent::Opcode(step) => tracer.on_opcode(&*db, &step.step())?,
        TraceEvent::CallExit(result) => tracer.on_call_exit(&*db, result.clone())?,
        TraceEvent::CallEnd(result) => tracer.on_call_end(&*db, result.clone())?,
        TraceEvent::Fault(fault) => tracer.on_fault(&fault.step.step(), &fault.error),
        TraceEvent::TxEnd { rest_gas } => tracer.on_tx_end(*rest_gas)?,
        TraceEvent::StateWrite { address, account } => apply_override(db, *address, account)?,
        TraceEvent::Transfer { from, to, amount } => tracer.transfer(db, *from, *to, *amount)?,
        TraceEvent::Abort { reason } => tracer.stop(reason.clone()),
    };

    Ok(())
}

/// Resolves `path` to the transcripts it names: the file itself, or every `*.json` file
/// below the directory, in file name order.
pub(crate) fn transcript_paths(path: &Path) -> Result<Vec<PathBuf>> {
    if path.is_file() {
        return Ok(vec![path.to_path_buf()]);
    }

    let paths = walkdir::WalkDir::new(path)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter(|e| e.path().extension().map(|ext| ext == "json").unwrap_or(false))
        .map(|e| e.into_path())
        .collect::<Vec<_>>();

    if paths.is_empty() {
        bail!("no transcripts found in {}", path.display());
    }
    debug!(count = paths.len(), "found transcripts in {}", path.display());

    Ok(paths)
}
