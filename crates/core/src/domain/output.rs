// Connector Job Output Domain Model

use serde::{Deserialize, Serialize};

/// What kind of output a connector operation produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OutputType {
    Spec,
    CheckConnection,
    DiscoverCatalogId,
    ReplicationSummary,
}

/// Failure classification carried back to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FailureType {
    ConfigError,
    SystemError,
    TransientError,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureReason {
    pub failure_type: FailureType,
    pub internal_message: String,
    pub external_message: String,
}

impl FailureReason {
    pub fn new(
        failure_type: FailureType,
        internal_message: impl Into<String>,
        external_message: impl Into<String>,
    ) -> Self {
        Self {
            failure_type,
            internal_message: internal_message.into(),
            external_message: external_message.into(),
        }
    }
}

/// Result of a successful connector operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputPayload {
    /// Connector specification document.
    Spec(serde_json::Value),
    /// Connection check verdict.
    Check(CheckConnectionResult),
    /// Discovered catalog (or its id in the remote store).
    Catalog(serde_json::Value),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckConnectionResult {
    pub succeeded: bool,
    pub message: Option<String>,
}

/// Either a payload or a failure reason. The two-variant enum makes the
/// "exactly one of payload/failure populated" invariant structural.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputResult {
    Payload(OutputPayload),
    Failure(FailureReason),
}

/// The uniform output of every execution path. Created once at the end of
/// an activity invocation and returned to the caller unmodified.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectorJobOutput {
    pub output_type: OutputType,
    pub result: OutputResult,
}

impl ConnectorJobOutput {
    pub fn succeeded(output_type: OutputType, payload: OutputPayload) -> Self {
        Self {
            output_type,
            result: OutputResult::Payload(payload),
        }
    }

    pub fn failed(output_type: OutputType, reason: FailureReason) -> Self {
        Self {
            output_type,
            result: OutputResult::Failure(reason),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self.result, OutputResult::Payload(_))
    }

    pub fn payload(&self) -> Option<&OutputPayload> {
        match &self.result {
            OutputResult::Payload(p) => Some(p),
            OutputResult::Failure(_) => None,
        }
    }

    pub fn failure_reason(&self) -> Option<&FailureReason> {
        match &self.result {
            OutputResult::Payload(_) => None,
            OutputResult::Failure(r) => Some(r),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_output_has_payload_and_no_failure() {
        let output = ConnectorJobOutput::succeeded(
            OutputType::Spec,
            OutputPayload::Spec(serde_json::json!({"connectionSpecification": {}})),
        );

        assert!(output.is_success());
        assert!(output.payload().is_some());
        assert!(output.failure_reason().is_none());
    }

    #[test]
    fn failure_output_has_reason_and_no_payload() {
        let output = ConnectorJobOutput::failed(
            OutputType::CheckConnection,
            FailureReason::new(FailureType::SystemError, "boom", "Something went wrong"),
        );

        assert!(!output.is_success());
        assert!(output.payload().is_none());
        let reason = output.failure_reason().unwrap();
        assert_eq!(reason.failure_type, FailureType::SystemError);
    }

    #[test]
    fn output_round_trips_through_json() {
        let output = ConnectorJobOutput::succeeded(
            OutputType::CheckConnection,
            OutputPayload::Check(CheckConnectionResult {
                succeeded: true,
                message: None,
            }),
        );

        let json = serde_json::to_string(&output).unwrap();
        let parsed: ConnectorJobOutput = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, output);
    }
}
