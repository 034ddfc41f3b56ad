//! JSON output formatting

use mergesweep_core::{Config, SweepError, SweepSummary};
use serde::Serialize;

const SCHEMA_VERSION: &str = "1";

/// JSON response envelope
#[derive(Debug, Clone, Serialize)]
pub struct JsonResponse<T> {
    /// Schema version for forward compatibility
    pub schema_version: String,
    /// Command that generated this response
    pub command: String,
    /// Status: "ok" or "error"
    pub status: String,
    /// Command-specific payload
    pub data: T,
    /// Errors and warnings
    pub issues: Vec<JsonIssue>,
}

impl<T> JsonResponse<T> {
    /// Create a successful response
    pub fn ok(command: &str, data: T) -> Self {
        Self::ok_with_issues(command, data, vec![])
    }

    /// Create a successful response with issues
    pub fn ok_with_issues(command: &str, data: T, issues: Vec<JsonIssue>) -> Self {
        Self {
            schema_version: SCHEMA_VERSION.to_string(),
            command: command.to_string(),
            status: "ok".to_string(),
            data,
            issues,
        }
    }

    /// Create an error response
    pub fn error(command: &str, data: T, issues: Vec<JsonIssue>) -> Self {
        Self {
            schema_version: SCHEMA_VERSION.to_string(),
            command: command.to_string(),
            status: "error".to_string(),
            data,
            issues,
        }
    }
}

/// Issue object structure
#[derive(Debug, Clone, Serialize)]
pub struct JsonIssue {
    /// Error code (e.g., "E004")
    pub code: String,
    /// Severity level
    pub severity: String,
    /// Human-readable message
    pub message: String,
    /// Which phase of a combined run produced it
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phase: Option<String>,
}

impl From<&SweepError> for JsonIssue {
    fn from(err: &SweepError) -> Self {
        Self {
            code: err.code().to_string(),
            severity: "error".to_string(),
            message: err.to_string(),
            phase: None,
        }
    }
}

impl JsonIssue {
    pub fn in_phase(mut self, phase: &str) -> Self {
        self.phase = Some(phase.to_string());
        self
    }
}

/// Data payload for remote/local/all
#[derive(Debug, Clone, Serialize)]
pub struct SweepData {
    pub repository: Option<String>,
    pub runs: Vec<SweepSummary>,
}

/// Data payload for config show/init
#[derive(Debug, Clone, Serialize)]
pub struct ConfigData {
    /// File the config came from (or was written to)
    pub path: Option<String>,
    pub effective_protected_branches: Vec<String>,
    pub config: Config,
}

/// Print a response as pretty JSON on stdout
pub fn print_json<T: Serialize>(response: &JsonResponse<T>) -> Result<(), SweepError> {
    println!("{}", serde_json::to_string_pretty(response)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_envelope_shape() {
        let response = JsonResponse::ok(
            "local",
            SweepData {
                repository: Some("octo/widgets".to_string()),
                runs: vec![],
            },
        );
        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value["schema_version"], "1");
        assert_eq!(value["status"], "ok");
        assert_eq!(value["data"]["repository"], "octo/widgets");
        assert!(value["issues"].as_array().unwrap().is_empty());
    }

    #[test]
    fn test_issue_from_error() {
        let err = SweepError::RepositoryNotFound;
        let issue = JsonIssue::from(&err).in_phase("local");
        assert_eq!(issue.code, "E001");
        assert_eq!(issue.phase.as_deref(), Some("local"));

        let value = serde_json::to_value(JsonIssue::from(&err)).unwrap();
        assert!(value.get("phase").is_none());
    }
}
