//! Classifier collaborators.
//!
//! The model call itself lives outside this crate. A [`CommandClassifier`]
//! hands the request to an external program; a [`ReplayClassifier`] serves
//! candidates recorded earlier.

use runloop_schema::Candidate;
use serde::Serialize;
use serde_json::Value;
use std::fs;
use std::io::Write;
use std::path::Path;
use std::process::{Command, Stdio};
use std::sync::Mutex;
use std::thread;
use thiserror::Error;
use tracing::debug;

pub const SYSTEM_INSTRUCTIONS: &str = "You are a bounded classifier. You must follow the provided schema exactly. \
You must either select exactly one taxonomy category or abstain. \
If you abstain, set abstain=true and category=null. \
Your rationale must be brief and grounded only in the artifact text.";

#[derive(Debug, Error)]
pub enum ClassifierError {
    #[error("failed to launch classifier '{program}': {source}")]
    Launch {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("classifier exited with {status}: {stderr}")]
    Failed { status: String, stderr: String },

    #[error("classifier returned invalid JSON: {0}")]
    InvalidResponse(String),

    #[error("classifier output violates the candidate schema: {0}")]
    Schema(String),

    #[error("replay exhausted after {0} candidate(s)")]
    ReplayExhausted(usize),

    #[error("cannot load replay file {path}: {message}")]
    Replay { path: String, message: String },

    #[error("Failed to acquire lock")]
    LockError,
}

/// One bounded classification call.
///
/// Implementations must be shareable across threads: swarm members are
/// classified concurrently.
pub trait Classifier: Sync {
    /// Model label recorded in `final.json`.
    fn model(&self) -> &str;

    fn classify(
        &self,
        system_instructions: &str,
        user_content: &str,
        schema: &Value,
    ) -> Result<Candidate, ClassifierError>;

    /// Call for swarm member `index`. Defaults to [`Classifier::classify`].
    fn classify_at(
        &self,
        _index: usize,
        system_instructions: &str,
        user_content: &str,
        schema: &Value,
    ) -> Result<Candidate, ClassifierError> {
        self.classify(system_instructions, user_content, schema)
    }
}

/// Render the user message for one artifact.
pub fn build_user_payload(artifact: &str, taxonomy: &[String]) -> String {
    let tax = taxonomy
        .iter()
        .map(|t| format!("- {}", t))
        .collect::<Vec<_>>()
        .join("\n");
    format!(
        "You are given an operational artifact and a taxonomy. \
         Classify the artifact into exactly one taxonomy category, or abstain.\n\n\
         TAXONOMY (choose one):\n{}\n\nARTIFACT:\n{}\n",
        tax, artifact
    )
}

fn parse_candidate(value: Value) -> Result<Candidate, ClassifierError> {
    serde_json::from_value(value).map_err(|e| ClassifierError::Schema(e.to_string()))
}

#[derive(Serialize)]
struct CommandRequest<'a> {
    system_instructions: &'a str,
    user_content: &'a str,
    schema: &'a Value,
    model: &'a str,
}

/// Runs an external program per call: JSON request on stdin, one candidate
/// object on stdout.
#[derive(Debug, Clone)]
pub struct CommandClassifier {
    program: String,
    args: Vec<String>,
    model: String,
}

impl CommandClassifier {
    pub fn new(program: impl Into<String>, args: Vec<String>, model: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args,
            model: model.into(),
        }
    }
}

impl Classifier for CommandClassifier {
    fn model(&self) -> &str {
        &self.model
    }

    fn classify(
        &self,
        system_instructions: &str,
        user_content: &str,
        schema: &Value,
    ) -> Result<Candidate, ClassifierError> {
        let request = serde_json::to_vec(&CommandRequest {
            system_instructions,
            user_content,
            schema,
            model: &self.model,
        })
        .map_err(|e| ClassifierError::InvalidResponse(e.to_string()))?;

        let launch = |source: std::io::Error| ClassifierError::Launch {
            program: self.program.clone(),
            source,
        };
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(launch)?;

        // stdin is fed from its own thread so a classifier that writes before
        // it finishes reading cannot fill the stdout pipe and stall.
        let stdin = child.stdin.take();
        let output = thread::scope(|scope| {
            let writer = scope.spawn(|| match stdin {
                Some(mut stdin) => stdin.write_all(&request),
                None => Ok(()),
            });
            let output = child.wait_with_output();
            let written = writer.join().unwrap_or_else(|_| {
                Err(std::io::Error::new(
                    std::io::ErrorKind::Other,
                    "stdin writer panicked",
                ))
            });
            output.and_then(|output| {
                // A classifier may answer without reading the whole request.
                match written {
                    Err(e) if e.kind() != std::io::ErrorKind::BrokenPipe => Err(e),
                    _ => Ok(output),
                }
            })
        })
        .map_err(launch)?;

        if !output.status.success() {
            return Err(ClassifierError::Failed {
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        debug!(program = %self.program, bytes = stdout.len(), "classifier responded");
        let value: Value = serde_json::from_str(stdout.trim())
            .map_err(|e| ClassifierError::InvalidResponse(e.to_string()))?;
        parse_candidate(value)
    }
}

/// Serves recorded candidates by swarm index.
///
/// Accepts a JSON array of candidates, or a `candidates.jsonl` from an
/// earlier run (records of the form `{"i": .., "candidate": {..}}`).
/// Swarm member `i` always receives record `i`, so a replayed run pairs
/// candidates with indices exactly as the recorded run did. Plain
/// [`Classifier::classify`] calls walk the records with a cursor.
pub struct ReplayClassifier {
    recorded: Vec<Value>,
    cursor: Mutex<usize>,
    model: String,
}

impl ReplayClassifier {
    pub fn new(recorded: Vec<Value>) -> Self {
        let mut indexed: Vec<(Option<u64>, Value)> = recorded
            .into_iter()
            .map(|v| match v {
                Value::Object(mut map) if map.contains_key("candidate") => {
                    let i = map.get("i").and_then(Value::as_u64);
                    (i, map.remove("candidate").unwrap_or(Value::Null))
                }
                other => (None, other),
            })
            .collect();
        // Ledger records carry their swarm index; honour it over file order.
        if indexed.iter().all(|(i, _)| i.is_some()) {
            indexed.sort_by_key(|(i, _)| *i);
        }
        Self {
            recorded: indexed.into_iter().map(|(_, v)| v).collect(),
            cursor: Mutex::new(0),
            model: "replay".to_string(),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn from_file(path: &Path) -> Result<Self, ClassifierError> {
        let replay_err = |message: String| ClassifierError::Replay {
            path: path.display().to_string(),
            message,
        };
        let content = fs::read_to_string(path).map_err(|e| replay_err(e.to_string()))?;
        let trimmed = content.trim_start();

        let recorded = if trimmed.starts_with('[') {
            serde_json::from_str::<Vec<Value>>(trimmed).map_err(|e| replay_err(e.to_string()))?
        } else {
            content
                .lines()
                .filter(|line| !line.trim().is_empty())
                .map(serde_json::from_str::<Value>)
                .collect::<Result<Vec<_>, _>>()
                .map_err(|e| replay_err(e.to_string()))?
        };
        Ok(Self::new(recorded))
    }

    /// Records not yet reached by the sequential cursor.
    pub fn remaining(&self) -> usize {
        self.cursor
            .lock()
            .map(|c| self.recorded.len().saturating_sub(*c))
            .unwrap_or(0)
    }

    fn serve(&self, index: usize) -> Result<Candidate, ClassifierError> {
        match self.recorded.get(index) {
            Some(value) => parse_candidate(value.clone()),
            None => Err(ClassifierError::ReplayExhausted(self.recorded.len())),
        }
    }
}

impl Classifier for ReplayClassifier {
    fn model(&self) -> &str {
        &self.model
    }

    fn classify(
        &self,
        _system_instructions: &str,
        _user_content: &str,
        _schema: &Value,
    ) -> Result<Candidate, ClassifierError> {
        let mut cursor = self.cursor.lock().map_err(|_| ClassifierError::LockError)?;
        let index = *cursor;
        if index < self.recorded.len() {
            *cursor += 1;
        }
        self.serve(index)
    }

    fn classify_at(
        &self,
        index: usize,
        _system_instructions: &str,
        _user_content: &str,
        _schema: &Value,
    ) -> Result<Candidate, ClassifierError> {
        self.serve(index)
    }
}
