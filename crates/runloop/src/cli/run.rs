//! `runloop run`: one gated classification run.

use super::error::HelpfulError;
use super::read_input;
use anyhow::Result;
use clap::Args;
use runloop::{
    load_taxonomy, run_pipeline, Classifier, CommandClassifier, ReplayClassifier, RunRequest,
    RunloopConfig,
};
use runloop_ids::RunId;
use std::io;
use std::path::PathBuf;

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Artifact text file to classify
    #[arg(long)]
    pub artifact: PathBuf,

    /// Taxonomy JSON file (list of category names)
    #[arg(long)]
    pub taxonomy: PathBuf,

    /// Number of independent classifier calls (1 = no swarm)
    #[arg(long)]
    pub swarm: Option<usize>,

    /// Run identifier; becomes the run directory name
    #[arg(long)]
    pub run_id: String,

    /// Root directory for run artifacts
    #[arg(long)]
    pub log_dir: Option<PathBuf>,

    /// Model label passed to the classifier
    #[arg(long)]
    pub model: Option<String>,

    /// External classifier program
    #[arg(long, conflicts_with = "replay")]
    pub classifier_cmd: Option<String>,

    /// Replay recorded candidates (JSON array or candidates.jsonl)
    #[arg(long)]
    pub replay: Option<PathBuf>,

    /// Reviewer name recorded on gate transitions
    #[arg(long, env = "RUNLOOP_REVIEWER")]
    pub reviewer: Option<String>,
}

pub fn run(args: RunArgs, config: &RunloopConfig) -> Result<()> {
    let run_id = RunId::parse(&args.run_id)
        .map_err(|e| HelpfulError::invalid_identifier("run id", &args.run_id, &e.to_string()))?;
    let artifact = read_input(&args.artifact)?;
    if !args.taxonomy.exists() {
        return Err(HelpfulError::file_not_found(&args.taxonomy).into());
    }
    let taxonomy = load_taxonomy(&args.taxonomy).map_err(|e| HelpfulError::run(&e))?;

    let swarm = args.swarm.unwrap_or(config.pipeline.swarm);
    let model = args.model.unwrap_or_else(|| config.pipeline.model.clone());
    let log_root = args.log_dir.unwrap_or_else(|| config.pipeline.log_dir.clone());

    let classifier: Box<dyn Classifier> = if let Some(path) = &args.replay {
        if !path.exists() {
            return Err(HelpfulError::file_not_found(path).into());
        }
        Box::new(ReplayClassifier::from_file(path).map_err(|e| {
            HelpfulError::json_parse_error(path, &e.to_string())
        })?)
    } else if let Some(program) = args
        .classifier_cmd
        .or_else(|| config.classifier.command.clone())
    {
        Box::new(CommandClassifier::new(
            program,
            config.classifier.args.clone(),
            model,
        ))
    } else {
        return Err(HelpfulError::no_classifier().into());
    };

    let request = RunRequest {
        run_id,
        artifact,
        taxonomy,
        swarm,
        log_root,
        reviewer: args.reviewer,
    };

    let stdin = io::stdin();
    let mut input = stdin.lock();
    let mut out = io::stdout();
    let report = run_pipeline(classifier.as_ref(), &request, &mut input, &mut out)
        .map_err(|e| HelpfulError::run(&e))?;

    println!("\n--- RUN COMPLETE ---");
    println!("Run ID: {}", report.run_id);
    println!(
        "Final category: {}",
        report.outcome.category.as_deref().unwrap_or("None")
    );
    println!(
        "Logs: {}",
        std::fs::canonicalize(&report.run_dir)
            .unwrap_or(report.run_dir)
            .display()
    );
    Ok(())
}
