//! RECEIVE stage - validate the trigger event.
//!
//! Deterministic disqualification only: no collaborator is called here. An
//! event that fails these checks moves the job straight to SKIPPED with no
//! retry.

use crate::event::{TriggerEvent, TRIGGER_LABEL};
use crate::pipeline::error::Disqualified;
use crate::pipeline::PipelineConfig;
use tracing::debug;

/// Validates the event, returning the disqualification reason if it cannot
/// produce useful output.
pub fn receive_stage(event: &TriggerEvent, config: &PipelineConfig) -> Result<(), Disqualified> {
    if !event.has_trigger_label() {
        return Err(Disqualified(format!(
            "issue {} does not carry the '{}' label",
            event.natural_key, TRIGGER_LABEL
        )));
    }

    let body_len = event.body.trim().chars().count();
    if body_len < config.min_body_len {
        return Err(Disqualified(format!(
            "issue body has {body_len} chars, below the {} char floor",
            config.min_body_len
        )));
    }

    debug!(
        natural_key = %event.natural_key,
        body_len,
        truncated = event.body_truncated,
        "Event accepted for processing"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{EventKind, NaturalKey};

    fn event(body: &str, labels: Vec<&str>) -> TriggerEvent {
        TriggerEvent::new(
            EventKind::Tagged,
            NaturalKey::new("acme/widgets", 42),
            "Add login tests",
            body,
            labels.into_iter().map(String::from).collect(),
            "sha256=abc",
        )
    }

    fn config() -> PipelineConfig {
        PipelineConfig::default()
    }

    #[test]
    fn test_sufficient_event_is_accepted() {
        let body = "When logging in with a valid account the dashboard should load correctly.";
        assert!(receive_stage(&event(body, vec![TRIGGER_LABEL]), &config()).is_ok());
    }

    #[test]
    fn test_short_body_is_disqualified() {
        // 40 chars: below the default 50-char floor.
        let body = "a".repeat(40);
        let err = receive_stage(&event(&body, vec![TRIGGER_LABEL]), &config()).unwrap_err();
        assert!(err.0.contains("below the 50 char floor"));
    }

    #[test]
    fn test_whitespace_padding_does_not_satisfy_floor() {
        let body = format!("{}{}", "a".repeat(10), " ".repeat(100));
        assert!(receive_stage(&event(&body, vec![TRIGGER_LABEL]), &config()).is_err());
    }

    #[test]
    fn test_missing_trigger_label_is_disqualified() {
        let body = "long enough body that would otherwise pass the configured length floor";
        let err = receive_stage(&event(body, vec!["bug"]), &config()).unwrap_err();
        assert!(err.0.contains("generate-tests"));
    }
}
