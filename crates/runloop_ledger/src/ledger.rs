//! Per-run artifact files.

use crate::stamped::Stamped;
use crate::{
    LedgerError, Result, CANDIDATES_FILE, FINAL_FILE, HUMAN_GATE_FILE, PROPOSED_FILE,
    RUN_ARTIFACTS,
};
use runloop_gate::GateTransition;
use runloop_ids::RunId;
use runloop_schema::{Candidate, FinalOutcome, HumanDecision, Proposal};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::io::{self, BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// One line of `candidates.jsonl`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateRecord {
    pub i: usize,
    pub candidate: Candidate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProposedRecord {
    pub proposed: Proposal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HumanGateRecord {
    pub human: HumanDecision,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub transitions: Vec<GateTransition>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinalRecord {
    pub run_id: RunId,
    pub model: String,
    pub swarm: usize,
    pub proposed: Proposal,
    #[serde(rename = "final")]
    pub outcome: FinalOutcome,
}

/// Writer and reader for one run directory.
///
/// The directory is created by the first write, not by [`RunLedger::open`].
#[derive(Debug, Clone)]
pub struct RunLedger {
    run_id: RunId,
    dir: PathBuf,
}

impl RunLedger {
    /// Prepare a fresh run. Fails if the directory already holds artifacts.
    pub fn open(log_root: &Path, run_id: &RunId) -> Result<Self> {
        let dir = log_root.join(run_id.as_str());
        if RUN_ARTIFACTS.iter().any(|name| dir.join(name).exists()) {
            return Err(LedgerError::RunExists(dir));
        }
        debug!(run_id = %run_id, dir = %dir.display(), "run ledger opened");
        Ok(Self {
            run_id: run_id.clone(),
            dir,
        })
    }

    /// Attach to a run that already exists, for reading.
    pub fn existing(log_root: &Path, run_id: &RunId) -> Result<Self> {
        let dir = log_root.join(run_id.as_str());
        if !dir.is_dir() {
            return Err(LedgerError::RunNotFound(dir));
        }
        Ok(Self {
            run_id: run_id.clone(),
            dir,
        })
    }

    pub fn run_id(&self) -> &RunId {
        &self.run_id
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.join(name)
    }

    pub fn append_candidate(&self, i: usize, candidate: &Candidate) -> Result<PathBuf> {
        let path = self.path(CANDIDATES_FILE);
        let record = Stamped::now(CandidateRecord {
            i,
            candidate: candidate.clone(),
        });
        // Round-trip through Value for sorted keys.
        let line = serde_json::to_string(&serde_json::to_value(&record)?)?;

        fs::create_dir_all(&self.dir)?;
        let mut file = OpenOptions::new().create(true).append(true).open(&path)?;
        writeln!(file, "{}", line)?;
        file.flush()?;

        debug!(run_id = %self.run_id, i, "candidate appended");
        Ok(path)
    }

    pub fn write_proposed(&self, proposed: &Proposal) -> Result<PathBuf> {
        self.write_once(
            PROPOSED_FILE,
            &ProposedRecord {
                proposed: proposed.clone(),
            },
        )
    }

    pub fn write_human_gate(
        &self,
        human: &HumanDecision,
        transitions: &[GateTransition],
    ) -> Result<PathBuf> {
        self.write_once(
            HUMAN_GATE_FILE,
            &HumanGateRecord {
                human: human.clone(),
                transitions: transitions.to_vec(),
            },
        )
    }

    pub fn write_final(&self, record: &FinalRecord) -> Result<PathBuf> {
        self.write_once(FINAL_FILE, record)
    }

    pub fn read_candidates(&self) -> Result<Vec<Stamped<CandidateRecord>>> {
        let path = self.path(CANDIDATES_FILE);
        let file = fs::File::open(&path).map_err(|e| missing_or_io(e, &path))?;
        let mut records = Vec::new();
        for line in BufReader::new(file).lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let record = serde_json::from_str(&line).map_err(|source| LedgerError::Malformed {
                path: path.clone(),
                source,
            })?;
            records.push(record);
        }
        Ok(records)
    }

    pub fn read_proposed(&self) -> Result<Stamped<ProposedRecord>> {
        read_record(&self.path(PROPOSED_FILE))
    }

    pub fn read_human_gate(&self) -> Result<Stamped<HumanGateRecord>> {
        read_record(&self.path(HUMAN_GATE_FILE))
    }

    pub fn read_final(&self) -> Result<Stamped<FinalRecord>> {
        read_record(&self.path(FINAL_FILE))
    }

    fn write_once<T: Serialize>(&self, name: &str, body: &T) -> Result<PathBuf> {
        let path = self.path(name);
        let value = serde_json::to_value(Stamped::now(body))?;
        let content = serde_json::to_string_pretty(&value)?;

        fs::create_dir_all(&self.dir)?;
        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .map_err(|e| match e.kind() {
                io::ErrorKind::AlreadyExists => LedgerError::AlreadyWritten(path.clone()),
                _ => LedgerError::Io(e),
            })?;
        file.write_all(content.as_bytes())?;
        file.flush()?;

        info!(run_id = %self.run_id, artifact = name, "artifact persisted");
        Ok(path)
    }
}

pub(crate) fn read_record<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = fs::read_to_string(path).map_err(|e| missing_or_io(e, path))?;
    serde_json::from_str(&content).map_err(|source| LedgerError::Malformed {
        path: path.to_path_buf(),
        source,
    })
}

fn missing_or_io(err: io::Error, path: &Path) -> LedgerError {
    match err.kind() {
        io::ErrorKind::NotFound => LedgerError::MissingArtifact(path.to_path_buf()),
        _ => LedgerError::Io(err),
    }
}
