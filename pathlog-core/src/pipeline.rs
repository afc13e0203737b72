//! Staged batch processing of agent log folders.
//!
//! Agent folders advance `.pass0` (raw) → `.pass1` (graphed) → `.pass2`
//! (summarized). Planning a stage is pure: it maps a folder listing to the
//! outputs it will produce and the folder's next location. Executing jobs and
//! moving folders are separate steps, and a folder only moves once every file
//! in it has been processed.
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::error::LogError;
use crate::health::health_curve;
use crate::layout::LogLayout;
use crate::plot::{PlotStyle, render_health_plot};
use crate::record::read_log;
use crate::summary::{AgentSummary, summarize, write_summary};

/// How far an agent folder has progressed through the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PassStage {
    /// Raw logs, not yet graphed
    Raw,
    /// Graphed, awaiting summaries
    Graphed,
    /// Graphed and summarized; archived
    Summarized,
}

impl PassStage {
    pub const ALL: [Self; 3] = [Self::Raw, Self::Graphed, Self::Summarized];

    #[must_use]
    pub const fn dir_name(self) -> &'static str {
        match self {
            Self::Raw => ".pass0",
            Self::Graphed => ".pass1",
            Self::Summarized => ".pass2",
        }
    }

    #[must_use]
    pub const fn next(self) -> Option<Self> {
        match self {
            Self::Raw => Some(Self::Graphed),
            Self::Graphed => Some(Self::Summarized),
            Self::Summarized => None,
        }
    }
}

/// Work performed on every file of a folder before it advances a stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageWork {
    Graph,
    Summarize,
}

impl StageWork {
    #[must_use]
    pub const fn source(self) -> PassStage {
        match self {
            Self::Graph => PassStage::Raw,
            Self::Summarize => PassStage::Graphed,
        }
    }

    #[must_use]
    pub const fn target(self) -> PassStage {
        match self {
            Self::Graph => PassStage::Graphed,
            Self::Summarize => PassStage::Summarized,
        }
    }

    #[must_use]
    pub fn output_path(self, layout: &LogLayout, agent_dir: &str, file_name: &str) -> PathBuf {
        match self {
            Self::Graph => layout.batch_graph_path(agent_dir, file_name),
            Self::Summarize => layout.batch_summary_path(agent_dir, file_name),
        }
    }

    /// Plan this stage for one folder without touching the filesystem.
    #[must_use]
    pub fn plan(self, layout: &LogLayout, folder: &AgentFolder) -> StagePlan {
        let source_dir = stage_destination(layout, self.source(), &folder.name);
        let jobs = folder
            .files
            .iter()
            .map(|file| OutputJob {
                input: source_dir.join(file),
                output: self.output_path(layout, &folder.name, file),
            })
            .collect();
        StagePlan {
            work: self,
            folder: folder.name.clone(),
            jobs,
            relocation: StageMove {
                to: stage_destination(layout, self.target(), &folder.name),
                from: source_dir,
            },
        }
    }
}

/// An agent folder and its regular files, both sorted by name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentFolder {
    pub name: String,
    pub files: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputJob {
    pub input: PathBuf,
    pub output: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageMove {
    pub from: PathBuf,
    pub to: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagePlan {
    pub work: StageWork,
    pub folder: String,
    pub jobs: Vec<OutputJob>,
    pub relocation: StageMove,
}

/// Graph-stage plan for one folder.
#[must_use]
pub fn plan_graph_stage(layout: &LogLayout, folder: &AgentFolder) -> StagePlan {
    StageWork::Graph.plan(layout, folder)
}

/// Summary-stage plan for one folder.
#[must_use]
pub fn plan_summary_stage(layout: &LogLayout, folder: &AgentFolder) -> StagePlan {
    StageWork::Summarize.plan(layout, folder)
}

/// Location of an agent folder while it sits in `stage`.
#[must_use]
pub fn stage_destination(layout: &LogLayout, stage: PassStage, folder_name: &str) -> PathBuf {
    layout.pass_dir(stage).join(folder_name)
}

/// List agent folders under a stage directory.
///
/// Loose files beside the folders and nested directories inside them are
/// skipped.
///
/// # Errors
///
/// Returns [`LogError::Io`] if a directory cannot be read.
pub fn list_agent_folders(stage_dir: &Path) -> Result<Vec<AgentFolder>, LogError> {
    let mut folders = Vec::new();
    for (name, path, is_dir) in sorted_entries(stage_dir)? {
        if !is_dir {
            warn!("skipping loose file {} in stage folder", path.display());
            continue;
        }
        let mut files = Vec::new();
        for (file, file_path, nested) in sorted_entries(&path)? {
            if nested {
                warn!("skipping nested directory {}", file_path.display());
            } else {
                files.push(file);
            }
        }
        folders.push(AgentFolder { name, files });
    }
    Ok(folders)
}

fn sorted_entries(dir: &Path) -> Result<Vec<(String, PathBuf, bool)>, LogError> {
    let read = fs::read_dir(dir).map_err(|source| LogError::io(dir, source))?;
    let mut entries = Vec::new();
    for entry in read {
        let entry = entry.map_err(|source| LogError::io(dir, source))?;
        let path = entry.path();
        let file_type = entry
            .file_type()
            .map_err(|source| LogError::io(&path, source))?;
        match entry.file_name().into_string() {
            Ok(name) => entries.push((name, path, file_type.is_dir())),
            Err(_) => warn!("skipping non UTF-8 entry {}", path.display()),
        }
    }
    entries.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(entries)
}

/// Read a log and render its health curve to the job's output.
///
/// # Errors
///
/// Propagates read, parse and render failures.
pub fn execute_graph_job(job: &OutputJob, style: PlotStyle) -> Result<usize, LogError> {
    let records = read_log(&job.input)?;
    let curve = health_curve(&records);
    render_health_plot(&curve, &job.output, style)?;
    debug!(
        "graphed {} points from {} to {}",
        curve.len(),
        job.input.display(),
        job.output.display()
    );
    Ok(curve.len())
}

/// Read a log and write its summary to the job's output.
///
/// # Errors
///
/// Propagates read, parse and write failures.
pub fn execute_summary_job(job: &OutputJob) -> Result<AgentSummary, LogError> {
    let records = read_log(&job.input)?;
    let summary = summarize(&records);
    write_summary(&job.output, &summary)?;
    debug!(
        "summarized {} into {}",
        job.input.display(),
        job.output.display()
    );
    Ok(summary)
}

/// Move an agent folder to its next stage.
///
/// # Errors
///
/// Returns [`LogError::DestinationExists`] rather than merging into an
/// existing folder, or [`LogError::Io`] if the rename fails.
pub fn move_agent_dir(relocation: &StageMove) -> Result<(), LogError> {
    if relocation.to.exists() {
        return Err(LogError::DestinationExists {
            path: relocation.to.clone(),
        });
    }
    fs::rename(&relocation.from, &relocation.to)
        .map_err(|source| LogError::io(&relocation.from, source))
}

/// Result of advancing one folder a stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FolderOutcome {
    pub folder: String,
    pub stage: PassStage,
    pub location: PathBuf,
    pub outputs: Vec<PathBuf>,
}

impl From<StagePlan> for FolderOutcome {
    fn from(plan: StagePlan) -> Self {
        Self {
            folder: plan.folder,
            stage: plan.work.target(),
            location: plan.relocation.to,
            outputs: plan.jobs.into_iter().map(|job| job.output).collect(),
        }
    }
}

/// Everything a batch run produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub graphed: Vec<FolderOutcome>,
    pub summarized: Vec<FolderOutcome>,
}

impl BatchReport {
    #[must_use]
    pub fn images_written(&self) -> usize {
        self.graphed.iter().map(|outcome| outcome.outputs.len()).sum()
    }

    #[must_use]
    pub fn summaries_written(&self) -> usize {
        self.summarized
            .iter()
            .map(|outcome| outcome.outputs.len())
            .sum()
    }
}

/// Drives every folder through the graph and summary stages.
pub struct BatchProcessor<'a> {
    layout: &'a LogLayout,
}

impl<'a> BatchProcessor<'a> {
    #[must_use]
    pub const fn new(layout: &'a LogLayout) -> Self {
        Self { layout }
    }

    /// Graph everything in `.pass0`, then summarize everything in `.pass1`.
    ///
    /// Folders left in `.pass1` by an earlier interrupted run are summarized
    /// too. The first failure aborts the run; folders already moved stay
    /// where they are.
    ///
    /// # Errors
    ///
    /// Returns the first directory, parse, render, write or move failure.
    pub fn run(&self) -> Result<BatchReport, LogError> {
        let started_at = Utc::now();
        self.layout.ensure_dirs()?;
        let graphed = self.run_stage(StageWork::Graph)?;
        let summarized = self.run_stage(StageWork::Summarize)?;
        Ok(BatchReport {
            started_at,
            finished_at: Utc::now(),
            graphed,
            summarized,
        })
    }

    /// Process and advance every folder currently waiting for `work`.
    ///
    /// # Errors
    ///
    /// Returns the first failure; the failing folder is not moved.
    pub fn run_stage(&self, work: StageWork) -> Result<Vec<FolderOutcome>, LogError> {
        let folders = list_agent_folders(&self.layout.pass_dir(work.source()))?;
        let mut outcomes = Vec::with_capacity(folders.len());
        for folder in &folders {
            let plan = work.plan(self.layout, folder);
            for job in &plan.jobs {
                match work {
                    StageWork::Graph => {
                        execute_graph_job(job, self.layout.plot)?;
                    }
                    StageWork::Summarize => {
                        execute_summary_job(job)?;
                    }
                }
            }
            move_agent_dir(&plan.relocation)?;
            info!(
                "{} ({} files) moved to {}",
                plan.folder,
                plan.jobs.len(),
                work.target().dir_name()
            );
            outcomes.push(FolderOutcome::from(plan));
        }
        Ok(outcomes)
    }
}
