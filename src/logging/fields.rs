//! Field helpers for structured logging

use crate::dispatch::Outcome;
use crate::request::Payload;

const PREVIEW_CHARS: usize = 100;

/// Truncate a prompt for logging preview (privacy-safe)
///
/// Returns None if content logging is disabled or the prompt is empty.
/// When enabled, returns the first ~100 characters of the prompt.
///
/// # Examples
///
/// ```
/// use tether::logging::truncate_prompt;
/// use tether::request::Payload;
///
/// let payload = Payload::new("Rene Descartes was");
/// assert_eq!(truncate_prompt(&payload, false), None);
/// assert_eq!(truncate_prompt(&payload, true).as_deref(), Some("Rene Descartes was"));
/// ```
pub fn truncate_prompt(payload: &Payload, enable_content_logging: bool) -> Option<String> {
    if !enable_content_logging || payload.prompt.is_empty() {
        return None;
    }
    Some(truncate_string(&payload.prompt, PREVIEW_CHARS))
}

/// Short label for a dispatch outcome: "delivered", "transient" or "permanent"
pub fn outcome_label(outcome: &Outcome) -> &'static str {
    match outcome {
        Outcome::Delivered(_) => "delivered",
        Outcome::Failed { kind, .. } => kind.as_str(),
    }
}

/// Truncate on a character boundary
fn truncate_string(s: &str, max_chars: usize) -> String {
    match s.char_indices().nth(max_chars) {
        None => s.to_string(),
        Some((idx, _)) => format!("{}...", &s[..idx]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::{ExecutionResult, ExecutorError};

    #[test]
    fn test_truncate_long_prompt() {
        let payload = Payload::new("x".repeat(250));
        let preview = truncate_prompt(&payload, true).unwrap();
        assert_eq!(preview.len(), 103);
        assert!(preview.ends_with("..."));
    }

    #[test]
    fn test_truncate_respects_char_boundaries() {
        let payload = Payload::new("é".repeat(150));
        let preview = truncate_prompt(&payload, true).unwrap();
        assert_eq!(preview.chars().count(), 103);
    }

    #[test]
    fn test_outcome_labels() {
        let delivered = Outcome::Delivered(ExecutionResult {
            result: String::new(),
        });
        assert_eq!(outcome_label(&delivered), "delivered");
        assert_eq!(
            outcome_label(&Outcome::failed(ExecutorError::Timeout(1))),
            "transient"
        );
    }
}
