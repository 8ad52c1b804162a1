//! Draft answer synthesis
//!
//! Builds the grounded prompt pair and calls the completion provider under
//! a bounded timeout. Failures are absorbed here: the pipeline receives an
//! empty draft and the quality gate decides what the user sees.

use rfpdesk_common::completion::ChatCompleter;
use std::time::Duration;

/// System instruction constraining the model to the retrieved context
pub const SYSTEM_PROMPT: &str = "You answer ONLY using the provided context (Q/A pairs from the RFP dataset). \
     Be concise (1-3 sentences). \
     If the answer is not in the context, reply exactly: NO MATCH.";

/// User message embedding the context block and the question
pub fn user_prompt(query: &str, context: &str) -> String {
    format!("CONTEXT:\n{}\n\nQUESTION: {}\n\nANSWER:", context, query)
}

/// Ask the completion provider for a draft answer
///
/// Returns the empty string on any provider failure or timeout, never an
/// error. "(no context)" contexts are sent as-is; the model is told to
/// reply `NO MATCH` when it cannot answer.
pub async fn draft_answer(
    completer: &dyn ChatCompleter,
    query: &str,
    context: &str,
    timeout: Duration,
) -> String {
    let user = user_prompt(query, context);

    match tokio::time::timeout(timeout, completer.complete(SYSTEM_PROMPT, &user)).await {
        Ok(Ok(text)) => text,
        Ok(Err(e)) => {
            tracing::warn!(error = %e, "Completion failed, proceeding without draft");
            String::new()
        }
        Err(_) => {
            tracing::warn!(
                timeout_ms = timeout.as_millis() as u64,
                "Completion timed out, proceeding without draft"
            );
            String::new()
        }
    }
}
