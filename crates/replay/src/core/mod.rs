use std::path::Path;

use eyre::{eyre, Result, WrapErr};
use statediff_common::db::prestate_db;
use statediff_tracer::TracerConfig;
use tracing::{info, info_span};

use crate::{
    utils::{replay_transaction, transcript_paths},
    CallManyResult, ReplayArgs, Transcript,
};

/// The `replay` subcommand. Traces every transaction of the given transcripts and prints one
/// result per transcript.
pub async fn replay(args: ReplayArgs) -> Result<()> {
    // ensure args are valid
    args.validate().map_err(|e| eyre!("Invalid arguments: {}", e))?;
    let config = args.tracer_config()?;

    for path in transcript_paths(&args.path)? {
        let transcript = load_transcript(&path).await?;

        info!("replaying {} transaction(s) from {}", transcript.transactions.len(), path.display());
        let start_time = std::time::Instant::now();
        let result = replay_transcript(&transcript, &config)
            .wrap_err_with(|| format!("failed to replay {}", path.display()))?;
        info!("replayed {} in {:?}", path.display(), start_time.elapsed());

        let output = if args.pretty() {
            serde_json::to_string_pretty(&result)?
        } else {
            serde_json::to_string(&result)?
        };
        println!("{}", output);
    }

    Ok(())
}

/// Reads and parses the transcript at `path`.
pub async fn load_transcript(path: &Path) -> Result<Transcript> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .wrap_err_with(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&raw).wrap_err_with(|| format!("invalid transcript {}", path.display()))
}

/// Replays the transactions of `transcript` in order, each against the state the previous
/// one left behind. Every transaction is traced by its own tracer, so the results are never
/// merged.
pub fn replay_transcript(transcript: &Transcript, config: &TracerConfig) -> Result<CallManyResult> {
    let mut db = prestate_db(&transcript.prestate)?;

    let trace_result = transcript
        .transactions
        .iter()
        .enumerate()
        .map(|(index, transaction)| {
            let _span = info_span!("transaction", index).entered();
            replay_transaction(&mut db, transaction, config)
                .wrap_err_with(|| format!("transaction {} failed", index))
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(CallManyResult { block_number: transcript.block_number, trace_result })
}
