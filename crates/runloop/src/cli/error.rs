//! Helpful error types for CLI commands
//!
//! Every error includes:
//! - What went wrong
//! - Context about the situation
//! - Suggestions for how to fix it

use runloop::{ClassifierError, ConfigError, RunError};
use runloop_drift::DriftError;
use runloop_ledger::LedgerError;
use std::fmt;
use std::path::Path;

/// An error with helpful context and suggestions
#[derive(Debug)]
pub struct HelpfulError {
    /// The main error message
    pub message: String,
    /// Additional context about what was happening
    pub context: Option<String>,
    /// Suggestions for how to fix the error
    pub suggestions: Vec<String>,
}

impl HelpfulError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            context: None,
            suggestions: Vec::new(),
        }
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestions.push(suggestion.into());
        self
    }

    pub fn with_suggestions(
        mut self,
        suggestions: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        self.suggestions.extend(suggestions.into_iter().map(|s| s.into()));
        self
    }

    // === Common error constructors ===

    /// File does not exist
    pub fn file_not_found(path: &Path) -> Self {
        Self::new(format!("File not found: {}", path.display()))
            .with_context("The specified file does not exist")
            .with_suggestions([
                format!("TRY: Check if the file exists: ls -la {}", path.display()),
                format!(
                    "TRY: Look for similar files: ls {}",
                    path.parent()
                        .map(|p| p.display().to_string())
                        .unwrap_or_else(|| ".".to_string())
                ),
            ])
    }

    /// Path does not exist
    pub fn path_not_found(path: &Path) -> Self {
        Self::new(format!("Path not found: {}", path.display()))
            .with_context("The specified path does not exist on the filesystem")
            .with_suggestions([
                format!("TRY: Check that the path exists: ls -la {}", path.display()),
                "TRY: Check for typos in the path".to_string(),
            ])
    }

    /// File cannot be read
    pub fn cannot_read_file(path: &Path, reason: &str) -> Self {
        Self::new(format!("Cannot read file: {}", path.display()))
            .with_context(reason.to_string())
            .with_suggestion(format!(
                "TRY: Check file permissions: ls -la {}",
                path.display()
            ))
    }

    /// JSON parsing error
    pub fn json_parse_error(path: &Path, details: &str) -> Self {
        Self::new(format!("JSON parse error: {}", details))
            .with_context(format!("Failed to parse JSON file: {}", path.display()))
            .with_suggestions([
                format!("TRY: Validate the JSON: jq . {}", path.display()),
                "TRY: For line-delimited JSON, each line must be valid JSON".to_string(),
            ])
    }

    /// Identifier contains characters the ledger cannot use as a directory name
    pub fn invalid_identifier(kind: &str, value: &str, details: &str) -> Self {
        Self::new(format!("Invalid {}: '{}'", kind, value))
            .with_context(details.to_string())
            .with_suggestion("TRY: Use letters, digits, '-', '_' or '.' (not leading '.')")
    }

    /// Neither a classifier command nor a replay file was given
    pub fn no_classifier() -> Self {
        Self::new("No classifier configured")
            .with_context("A run needs a classifier to produce candidates")
            .with_suggestions([
                "TRY: Pass an external program: --classifier-cmd <PROGRAM>",
                "TRY: Replay recorded candidates: --replay <FILE>",
                "TRY: Set [classifier] command = \"...\" in $RUNLOOP_HOME/config.toml",
            ])
    }

    pub fn config(err: &ConfigError) -> Self {
        Self::new(format!("Configuration error: {}", err)).with_suggestions([
            "TRY: Check $RUNLOOP_HOME/config.toml (default ~/.runloop/config.toml)",
            "TRY: Remove the file to fall back to defaults",
        ])
    }

    pub fn ledger(err: &LedgerError) -> Self {
        match err {
            LedgerError::RunExists(dir) => {
                Self::new(format!("Run already exists: {}", dir.display()))
                    .with_context("Run directories are never shared between runs")
                    .with_suggestion("TRY: Choose a new --run-id")
            }
            LedgerError::RunNotFound(dir) => {
                Self::new(format!("Run not found: {}", dir.display())).with_suggestions([
                    "TRY: Check --run-id and --log-dir".to_string(),
                    format!(
                        "TRY: List runs: ls {}",
                        dir.parent()
                            .map(|p| p.display().to_string())
                            .unwrap_or_else(|| ".".to_string())
                    ),
                ])
            }
            LedgerError::MissingArtifact(path) => {
                Self::new(format!("Missing: {}", path.display()))
                    .with_context("The run has not passed the human gate yet")
                    .with_suggestion("TRY: Complete the run with 'runloop run' first")
            }
            other => Self::new(other.to_string()),
        }
    }

    pub fn run(err: &RunError) -> Self {
        match err {
            RunError::SchemaViolation(details) => {
                Self::new("Classifier output violates the candidate schema")
                    .with_context(details.clone())
                    .with_suggestions([
                        "TRY: abstain=true requires category=null",
                        "TRY: abstain=false requires a non-blank category",
                        "TRY: confidence must be in [0.0, 1.0] and rationale non-empty",
                    ])
            }
            RunError::Configuration(details) => Self::new("Invalid run configuration")
                .with_context(details.clone())
                .with_suggestions([
                    "TRY: --swarm must be at least 1",
                    "TRY: The taxonomy file must be a JSON list of strings",
                ]),
            RunError::Classifier(ClassifierError::Launch { program, .. }) => {
                Self::new(format!("Cannot launch classifier: {}", program))
                    .with_context(err.to_string())
                    .with_suggestion(format!("TRY: Check the program is on PATH: which {}", program))
            }
            RunError::Classifier(inner) => Self::new("Classifier call failed")
                .with_context(inner.to_string())
                .with_suggestion("TRY: No artifacts were written; fix the classifier and rerun"),
            RunError::Ledger(inner) => Self::ledger(inner),
            RunError::Gate(inner) => Self::new(format!("Human gate did not complete: {}", inner))
                .with_context("The proposal was recorded but no decision was made")
                .with_suggestion("TRY: Run interactively and answer y, o or n"),
        }
    }

    pub fn drift(err: &DriftError) -> Self {
        match err {
            DriftError::PackNotFound(path) => Self::path_not_found(Path::new(path))
                .with_context("The pack directory must contain tasks.json"),
            DriftError::TaskNotFound { pack, task } => {
                Self::new(format!("Task not found: {}", task))
                    .with_context(format!("Pack '{}' has no task with that id", pack))
                    .with_suggestion("TRY: Check task_id values in the pack's tasks.json")
            }
            DriftError::PackMismatch {
                field,
                expected,
                found,
            } => Self::new("run input pack_id/task_id does not match --pack/--task")
                .with_context(format!("{}: input has '{}', requested '{}'", field, found, expected))
                .with_suggestion("TRY: Point --input at the input.json for this pack and task"),
            DriftError::InvalidPolicy(details) => Self::new("Invalid drift policy")
                .with_context(details.clone())
                .with_suggestion(
                    "TRY: drift_policy needs min_windows, task_success_drop_pct and override_increase_pct",
                ),
            DriftError::MalformedInput { key, source } => {
                Self::new(format!("Malformed input '{}'", key)).with_context(source.to_string())
            }
            other => Self::new(other.to_string()),
        }
    }
}

impl fmt::Display for HelpfulError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "ERROR: {}", self.message)?;

        if let Some(ctx) = &self.context {
            writeln!(f, "CONTEXT: {}", ctx)?;
        }

        if !self.suggestions.is_empty() {
            writeln!(f)?;
            for suggestion in &self.suggestions {
                writeln!(f, "  {}", suggestion)?;
            }
        }

        Ok(())
    }
}

impl std::error::Error for HelpfulError {}
