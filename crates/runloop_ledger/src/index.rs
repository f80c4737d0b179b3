//! Decision Index: a markdown listing of every summarised run.

use crate::{LedgerError, Result, SUMMARY_FILE};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub const INDEX_UNKNOWN: &str = "UNKNOWN";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexEntry {
    pub decision_id: String,
    pub run_id: String,
    pub path: PathBuf,
    pub outcome: String,
}

fn string_at<'a>(value: &'a Value, pointer: &str) -> Option<&'a str> {
    value.pointer(pointer).and_then(Value::as_str)
}

/// Scan run directories in lexical order. Runs without a summary are skipped.
pub fn collect_index(log_root: &Path) -> Result<Vec<IndexEntry>> {
    let mut dirs: Vec<PathBuf> = fs::read_dir(log_root)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.is_dir())
        .collect();
    dirs.sort();

    let mut entries = Vec::new();
    for dir in dirs {
        let path = dir.join(SUMMARY_FILE);
        if !path.is_file() {
            debug!(dir = %dir.display(), "no decision summary, skipping");
            continue;
        }
        let content = fs::read_to_string(&path)?;
        let summary: Value = serde_json::from_str(&content).map_err(|source| {
            LedgerError::Malformed {
                path: path.clone(),
                source,
            }
        })?;

        let dir_name = dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| INDEX_UNKNOWN.to_string());

        entries.push(IndexEntry {
            decision_id: string_at(&summary, "/decision_id")
                .unwrap_or(INDEX_UNKNOWN)
                .to_string(),
            run_id: string_at(&summary, "/run_id")
                .map(str::to_string)
                .unwrap_or(dir_name),
            outcome: string_at(&summary, "/section_9_decision_outcome/decision")
                .unwrap_or(INDEX_UNKNOWN)
                .to_string(),
            path,
        });
    }
    Ok(entries)
}

pub fn render_index(entries: &[IndexEntry]) -> String {
    let mut lines = vec!["# Decision Index\n".to_string()];
    let mut heading: Option<&str> = None;
    for entry in entries {
        // Consecutive runs of the same decision share one heading.
        if heading != Some(entry.decision_id.as_str()) {
            lines.push(format!("## {}", entry.decision_id));
            heading = Some(entry.decision_id.as_str());
        }
        lines.push(format!("- Run: `{}`", entry.run_id));
        lines.push(format!("- Artifact: `{}`", entry.path.display()));
        lines.push(format!("- Outcome: `{}`\n", entry.outcome));
    }
    lines.join("\n")
}

/// Render the index for `log_root` into `out`. Returns the number of entries.
pub fn write_index(log_root: &Path, out: &Path) -> Result<usize> {
    let entries = collect_index(log_root)?;
    fs::write(out, render_index(&entries))?;
    info!(entries = entries.len(), out = %out.display(), "decision index written");
    Ok(entries.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_render_format() {
        let entries = vec![IndexEntry {
            decision_id: "t_c04".to_string(),
            run_id: "run_1".to_string(),
            path: PathBuf::from("logs/run_1/decision_summary.json"),
            outcome: "reject".to_string(),
        }];
        assert_eq!(
            render_index(&entries),
            "# Decision Index\n\n## t_c04\n- Run: `run_1`\n- Artifact: `logs/run_1/decision_summary.json`\n- Outcome: `reject`\n"
        );
    }

    #[test]
    fn test_runs_of_one_decision_share_a_heading() {
        let entry = |decision_id: &str, run_id: &str| IndexEntry {
            decision_id: decision_id.to_string(),
            run_id: run_id.to_string(),
            path: PathBuf::from(format!("logs/{}/decision_summary.json", run_id)),
            outcome: "override".to_string(),
        };
        let rendered = render_index(&[
            entry("t_c04", "run_1"),
            entry("t_c04", "run_2"),
            entry(INDEX_UNKNOWN, "run_3"),
        ]);
        assert_eq!(rendered.matches("## t_c04").count(), 1);
        assert_eq!(rendered.matches(&format!("## {}", INDEX_UNKNOWN)).count(), 1);
        assert!(rendered.contains("## t_c04\n- Run: `run_1`"));
        assert!(rendered.contains("- Outcome: `override`\n\n- Run: `run_2`"));
    }

    #[test]
    fn test_empty_index_is_heading_only() {
        assert_eq!(render_index(&[]), "# Decision Index\n");
    }

    #[test]
    fn test_collect_order_and_fallbacks() {
        let tmp = tempdir().unwrap();
        for name in ["run_b", "run_a", "run_c"] {
            fs::create_dir(tmp.path().join(name)).unwrap();
        }
        fs::write(
            tmp.path().join("run_b").join(SUMMARY_FILE),
            r#"{"decision_id":"t_c04","run_id":"run_b","section_9_decision_outcome":{"decision":"override"}}"#,
        )
        .unwrap();
        fs::write(tmp.path().join("run_a").join(SUMMARY_FILE), "{}").unwrap();
        fs::write(tmp.path().join("stray.json"), "{}").unwrap();

        let entries = collect_index(tmp.path()).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].run_id, "run_a");
        assert_eq!(entries[0].decision_id, INDEX_UNKNOWN);
        assert_eq!(entries[0].outcome, INDEX_UNKNOWN);
        assert_eq!(entries[1].run_id, "run_b");
        assert_eq!(entries[1].outcome, "override");
    }

    #[test]
    fn test_malformed_summary_is_reported() {
        let tmp = tempdir().unwrap();
        fs::create_dir(tmp.path().join("run_x")).unwrap();
        fs::write(tmp.path().join("run_x").join(SUMMARY_FILE), "not json").unwrap();
        assert!(matches!(
            collect_index(tmp.path()),
            Err(LedgerError::Malformed { .. })
        ));
    }
}
