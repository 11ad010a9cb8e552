//! Queue-driven batch entry point.
//!
//! The queue transport itself lives outside this crate; a consumer hands
//! decoded records to [`process_batch`]. Each record is an independent
//! unit of work: a record that fails to parse or to process never stops
//! its siblings. Fatal initialization failures (configuration, database)
//! happen in the binary before a batch is ever accepted, so the hosting
//! consumer can fail the whole delivery and let the queue retry.

use serde::Deserialize;

use crate::services::recommendations::RecommendationPipeline;

/// One delivered queue record. `body` is expected to be JSON:
/// `{"email": "..."}` (legacy `{"userId": "..."}` also accepted).
#[derive(Debug, Clone, Deserialize)]
pub struct QueueRecord {
    pub body: String,
}

#[derive(Debug, Deserialize)]
struct TriggerMessage {
    #[serde(alias = "userId")]
    email: Option<String>,
}

/// Per-batch accounting returned to the hosting consumer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    /// Records whose pipeline run finished with an outcome.
    pub succeeded: usize,
    /// Records whose pipeline run returned an error.
    pub failed: usize,
    /// Records dropped before the pipeline ran (bad JSON, missing email).
    pub skipped: usize,
}

/// Processes one batch of queue records, isolating failures per record.
pub async fn process_batch(
    pipeline: &RecommendationPipeline,
    records: &[QueueRecord],
) -> BatchReport {
    let mut report = BatchReport::default();

    for queue_record in records {
        let message: TriggerMessage = match serde_json::from_str(&queue_record.body) {
            Ok(message) => message,
            Err(e) => {
                tracing::error!(error = %e, "Could not decode queue record body");
                report.skipped += 1;
                continue;
            }
        };

        let Some(email) = message.email.filter(|email| !email.trim().is_empty()) else {
            tracing::warn!("Queue record missing 'email' field");
            report.skipped += 1;
            continue;
        };

        match pipeline.refresh_for_user(email.trim()).await {
            Ok(outcome) => {
                tracing::info!(user_key = %email, outcome = outcome.message(), "Queue record processed");
                report.succeeded += 1;
            }
            Err(e) => {
                tracing::error!(user_key = %email, error = %e, "Queue record failed");
                report.failed += 1;
            }
        }
    }

    tracing::info!(
        succeeded = report.succeeded,
        failed = report.failed,
        skipped = report.skipped,
        "Batch processing complete"
    );
    report
}
