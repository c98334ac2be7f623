mod input;
mod logging;
mod model;
mod pipeline;
mod report;

use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use tracing::{error, info, warn};

use crate::input::{FrameIdParser, load_folds, load_sequence_entries};
use crate::model::params::{EnsembleParams, ParamsFile, SelectorParams};
use crate::pipeline::PipelineError;
use crate::pipeline::stage1_ensemble::run_stage1;
use crate::pipeline::stage2_select::run_stage2;
use crate::pipeline::stage3_report::{
    FUSED_FILE, REPORT_FILE, SUMMARY_FILE, ensemble_summary, selection_summary, write_fused,
    write_selection, write_summary,
};
use crate::report::RunSummary;

#[derive(Parser, Debug)]
#[command(
    name = "seqfuse",
    version,
    about = "Fuse per-fold detections and keep the best frame range per subject"
)]
struct Cli {
    /// Debug-level logging
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Only warnings and errors
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Fuse fold detection files into one record stream
    Ensemble(EnsembleCmd),
    /// Keep the best tolerant frame range per subject
    Select(SelectCmd),
    /// Ensemble, then select on the fused records
    Run(RunCmd),
}

#[derive(Args, Debug, Clone, Default)]
struct EnsembleFlags {
    /// Minimum IoU for a detection to join a cluster
    #[arg(long)]
    iou_threshold: Option<f64>,

    /// Distinct folds a cluster needs to be kept
    #[arg(long)]
    min_folds: Option<usize>,

    /// Detections below this confidence are ignored
    #[arg(long)]
    min_conf_join: Option<f64>,
}

impl EnsembleFlags {
    fn apply(&self, mut params: EnsembleParams) -> EnsembleParams {
        if let Some(v) = self.iou_threshold {
            params.iou_threshold = v;
        }
        if let Some(v) = self.min_folds {
            params.min_folds = v;
        }
        if let Some(v) = self.min_conf_join {
            params.min_conf_join = v;
        }
        params
    }
}

#[derive(Args, Debug, Clone, Default)]
struct SelectorFlags {
    /// Missing frame indices allowed inside the kept range
    #[arg(long)]
    tolerance: Option<u64>,

    /// Subject identifier prefix, followed by digits
    #[arg(long)]
    subject_prefix: Option<String>,
}

impl SelectorFlags {
    fn apply(&self, mut params: SelectorParams) -> SelectorParams {
        if let Some(v) = self.tolerance {
            params.tolerance = v;
        }
        if let Some(v) = &self.subject_prefix {
            params.subject_prefix = v.clone();
        }
        params
    }
}

#[derive(Args, Debug)]
struct EnsembleCmd {
    /// Fold detection file; repeat in fold order
    #[arg(long = "fold", required = true)]
    folds: Vec<PathBuf>,

    /// Fused record output file
    #[arg(long)]
    out: PathBuf,

    /// TOML parameter file
    #[arg(long)]
    config: Option<PathBuf>,

    #[command(flatten)]
    ensemble: EnsembleFlags,
}

#[derive(Args, Debug)]
struct SelectCmd {
    /// Record file to select from
    #[arg(long)]
    input: PathBuf,

    #[arg(long)]
    out_dir: PathBuf,

    /// TOML parameter file
    #[arg(long)]
    config: Option<PathBuf>,

    #[command(flatten)]
    selector: SelectorFlags,
}

#[derive(Args, Debug)]
struct RunCmd {
    /// Fold detection file; repeat in fold order
    #[arg(long = "fold", required = true)]
    folds: Vec<PathBuf>,

    #[arg(long)]
    out_dir: PathBuf,

    /// TOML parameter file
    #[arg(long)]
    config: Option<PathBuf>,

    #[command(flatten)]
    ensemble: EnsembleFlags,

    #[command(flatten)]
    selector: SelectorFlags,
}

fn main() {
    let cli = Cli::parse();
    logging::init_logging(cli.verbose, cli.quiet);
    if let Err(err) = run(&cli.command) {
        error!("{err}");
        std::process::exit(1);
    }
}

fn run(command: &Commands) -> Result<(), PipelineError> {
    match command {
        Commands::Ensemble(cmd) => {
            let file = ParamsFile::load_or_default(cmd.config.as_deref())?;
            let params = resolve_ensemble(&file, &cmd.ensemble)?;
            run_ensemble(&cmd.folds, &cmd.out, &params)?;
            Ok(())
        }
        Commands::Select(cmd) => {
            let file = ParamsFile::load_or_default(cmd.config.as_deref())?;
            let params = resolve_selector(&file, &cmd.selector)?;
            let mut summary = RunSummary::new();
            run_select(&cmd.input, &cmd.out_dir, &params, &mut summary)
        }
        Commands::Run(cmd) => {
            let file = ParamsFile::load_or_default(cmd.config.as_deref())?;
            let ens_params = resolve_ensemble(&file, &cmd.ensemble)?;
            let sel_params = resolve_selector(&file, &cmd.selector)?;

            let fused_path = cmd.out_dir.join(FUSED_FILE);
            let mut summary = RunSummary::new();
            summary.ensemble = Some(run_ensemble(&cmd.folds, &fused_path, &ens_params)?);
            summary.outputs.push(fused_path.clone());
            run_select(&fused_path, &cmd.out_dir, &sel_params, &mut summary)
        }
    }
}

fn resolve_ensemble(
    file: &ParamsFile,
    flags: &EnsembleFlags,
) -> Result<EnsembleParams, PipelineError> {
    let params = flags.apply(file.ensemble.clone());
    params.validate()?;
    Ok(params)
}

fn resolve_selector(
    file: &ParamsFile,
    flags: &SelectorFlags,
) -> Result<SelectorParams, PipelineError> {
    let params = flags.apply(file.selector.clone());
    params.validate()?;
    Ok(params)
}

fn run_ensemble(
    fold_paths: &[PathBuf],
    out: &Path,
    params: &EnsembleParams,
) -> Result<report::EnsembleSummary, PipelineError> {
    info!(
        "ensemble: {} folds, iou_threshold={}, min_folds={}, min_conf_join={}",
        fold_paths.len(),
        params.iou_threshold,
        params.min_folds,
        params.min_conf_join
    );
    let folds = load_folds(fold_paths)?;
    let missing = folds.missing_folds();
    if !missing.is_empty() {
        warn!(
            "{} of {} fold files missing; clusters can collect at most {} fold votes",
            missing.len(),
            fold_paths.len(),
            folds.n_folds_loaded()
        );
    }
    if folds.n_folds_loaded() < params.min_folds {
        warn!(
            "only {} folds loaded but min_folds is {}; no detection can be kept",
            folds.n_folds_loaded(),
            params.min_folds
        );
    }
    let stage1 = run_stage1(&folds, params);
    write_fused(out, &stage1.fused).map_err(PipelineError::output(out))?;
    Ok(ensemble_summary(&folds, &stage1, params))
}

fn run_select(
    input: &Path,
    out_dir: &Path,
    params: &SelectorParams,
    summary: &mut RunSummary,
) -> Result<(), PipelineError> {
    info!(
        "select: tolerance={}, subject_prefix={}",
        params.tolerance, params.subject_prefix
    );
    let parser = FrameIdParser::new(&params.subject_prefix)?;
    let seq = load_sequence_entries(input, &parser)?;
    let stage2 = run_stage2(seq, params);

    let written = write_selection(out_dir, &stage2).map_err(PipelineError::output(out_dir))?;
    summary.outputs.extend(written);
    summary.outputs.push(out_dir.join(SUMMARY_FILE));
    summary.outputs.push(out_dir.join(REPORT_FILE));
    summary.selection = Some(selection_summary(&stage2, params));
    write_summary(out_dir, summary).map_err(PipelineError::output(out_dir))?;

    for path in &summary.outputs {
        info!("output: {}", path.display());
    }
    Ok(())
}

#[cfg(test)]
#[path = "../tests/src_inline/main_inline.rs"]
mod tests;
