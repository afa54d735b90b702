use serde::{Deserialize, Serialize};
use std::fmt;

/// Normalized outcome of a single submission run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExecutionStatus {
    #[serde(rename = "Accepted")]
    Accepted,
    #[serde(rename = "Compilation Error")]
    CompilationError,
    #[serde(rename = "Runtime Error")]
    RuntimeError,
    #[serde(rename = "Time Limit Exceeded")]
    TimeLimitExceeded,
}

impl fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ExecutionStatus::Accepted => "Accepted",
            ExecutionStatus::CompilationError => "Compilation Error",
            ExecutionStatus::RuntimeError => "Runtime Error",
            ExecutionStatus::TimeLimitExceeded => "Time Limit Exceeded",
        };
        write!(f, "{}", s)
    }
}

/// The fields of a remote execution report that decide the status
#[derive(Debug, Default, Clone, Copy)]
pub struct PhaseReport<'a> {
    /// Error text from the compile phase
    pub compile_stderr: &'a str,
    /// Signal that terminated the run phase (e.g. "SIGKILL")
    pub run_signal: Option<&'a str>,
    /// Error text from the run phase
    pub run_stderr: &'a str,
}

type Predicate = fn(&PhaseReport<'_>) -> bool;

fn compile_failed(r: &PhaseReport<'_>) -> bool {
    !r.compile_stderr.is_empty()
}

fn killed_by_signal(r: &PhaseReport<'_>) -> bool {
    r.run_signal.is_some_and(|s| !s.is_empty())
}

fn wrote_run_stderr(r: &PhaseReport<'_>) -> bool {
    !r.run_stderr.is_empty()
}

/// Status rules, evaluated top to bottom; the first matching rule wins.
///
/// A compile failure is never reported as a runtime failure, and a killed
/// process is a timeout even if it wrote partial stderr.
const STATUS_RULES: &[(Predicate, ExecutionStatus)] = &[
    (compile_failed, ExecutionStatus::CompilationError),
    (killed_by_signal, ExecutionStatus::TimeLimitExceeded),
    (wrote_run_stderr, ExecutionStatus::RuntimeError),
];

/// Resolve the execution status of a remote report
pub fn resolve_status(report: &PhaseReport<'_>) -> ExecutionStatus {
    STATUS_RULES
        .iter()
        .find(|(applies, _)| applies(report))
        .map(|(_, status)| *status)
        .unwrap_or(ExecutionStatus::Accepted)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_run_is_accepted() {
        let report = PhaseReport::default();
        assert_eq!(resolve_status(&report), ExecutionStatus::Accepted);
    }

    #[test]
    fn test_compile_error_wins_over_runtime_error() {
        let report = PhaseReport {
            compile_stderr: "main.c:1: error: expected ';'",
            run_signal: None,
            run_stderr: "segfault",
        };
        assert_eq!(resolve_status(&report), ExecutionStatus::CompilationError);
    }

    #[test]
    fn test_signal_wins_over_partial_stderr() {
        let report = PhaseReport {
            compile_stderr: "",
            run_signal: Some("SIGKILL"),
            run_stderr: "partial trace",
        };
        assert_eq!(resolve_status(&report), ExecutionStatus::TimeLimitExceeded);
    }

    #[test]
    fn test_stderr_is_runtime_error() {
        let report = PhaseReport {
            run_stderr: "Traceback (most recent call last):",
            ..Default::default()
        };
        assert_eq!(resolve_status(&report), ExecutionStatus::RuntimeError);
    }

    #[test]
    fn test_whitespace_only_stderr_still_counts() {
        let run = PhaseReport {
            run_stderr: "\n",
            ..Default::default()
        };
        assert_eq!(resolve_status(&run), ExecutionStatus::RuntimeError);

        let compile = PhaseReport {
            compile_stderr: " ",
            ..Default::default()
        };
        assert_eq!(resolve_status(&compile), ExecutionStatus::CompilationError);
    }

    #[test]
    fn test_empty_signal_name_is_not_a_kill() {
        let report = PhaseReport {
            run_signal: Some(""),
            ..Default::default()
        };
        assert_eq!(resolve_status(&report), ExecutionStatus::Accepted);
    }

    #[test]
    fn test_status_display() {
        assert_eq!(ExecutionStatus::TimeLimitExceeded.to_string(), "Time Limit Exceeded");
        assert_eq!(
            serde_json::to_string(&ExecutionStatus::CompilationError).unwrap(),
            "\"Compilation Error\""
        );
    }
}
