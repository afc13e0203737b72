//! Where logs are read from and where derived outputs land.
use std::fs;
use std::path::{Path, PathBuf};

use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::LogError;
use crate::pipeline::PassStage;
use crate::plot::PlotStyle;

/// Directory and file naming for a log root.
///
/// Every field has a default, so a config file only needs the values it
/// changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogLayout {
    #[serde(default = "LogLayout::default_root")]
    pub root: PathBuf,
    #[serde(default = "LogLayout::default_staging_dir")]
    pub staging_dir: String,
    #[serde(default = "LogLayout::default_graphs_dir")]
    pub graphs_dir: String,
    #[serde(default = "LogLayout::default_summaries_dir")]
    pub summaries_dir: String,
    #[serde(default = "LogLayout::default_single_log")]
    pub single_log: String,
    #[serde(default = "LogLayout::default_single_graph")]
    pub single_graph: String,
    #[serde(default = "LogLayout::default_single_summary")]
    pub single_summary: String,
    #[serde(default = "LogLayout::default_batch_image_extension")]
    pub batch_image_extension: String,
    #[serde(default)]
    pub plot: PlotStyle,
}

impl Default for LogLayout {
    fn default() -> Self {
        Self {
            root: Self::default_root(),
            staging_dir: Self::default_staging_dir(),
            graphs_dir: Self::default_graphs_dir(),
            summaries_dir: Self::default_summaries_dir(),
            single_log: Self::default_single_log(),
            single_graph: Self::default_single_graph(),
            single_summary: Self::default_single_summary(),
            batch_image_extension: Self::default_batch_image_extension(),
            plot: PlotStyle::default(),
        }
    }
}

impl LogLayout {
    fn default_root() -> PathBuf {
        PathBuf::from("Logs")
    }

    fn default_staging_dir() -> String {
        ".logs".to_string()
    }

    fn default_graphs_dir() -> String {
        "graphs".to_string()
    }

    fn default_summaries_dir() -> String {
        "summaries".to_string()
    }

    fn default_single_log() -> String {
        "agent-0.csv".to_string()
    }

    fn default_single_graph() -> String {
        "agent-0.png".to_string()
    }

    fn default_single_summary() -> String {
        "agent-0-summary.csv".to_string()
    }

    fn default_batch_image_extension() -> String {
        "jpg".to_string()
    }

    /// # Errors
    ///
    /// Returns an error if the JSON cannot be parsed into a layout.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Load a layout from a JSON config file.
    ///
    /// # Errors
    ///
    /// Returns [`LogError::Io`] if the file cannot be read and
    /// [`LogError::Config`] if it is not a valid layout.
    pub fn load(path: &Path) -> Result<Self, LogError> {
        let json = fs::read_to_string(path).map_err(|source| LogError::io(path, source))?;
        Self::from_json(&json).map_err(|source| LogError::Config {
            path: path.to_path_buf(),
            source,
        })
    }

    #[must_use]
    pub fn with_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = root.into();
        self
    }

    #[must_use]
    pub fn staging_root(&self) -> PathBuf {
        self.root.join(&self.staging_dir)
    }

    #[must_use]
    pub fn pass_dir(&self, stage: PassStage) -> PathBuf {
        self.staging_root().join(stage.dir_name())
    }

    #[must_use]
    pub fn graphs_dir(&self) -> PathBuf {
        self.root.join(&self.graphs_dir)
    }

    #[must_use]
    pub fn summaries_dir(&self) -> PathBuf {
        self.root.join(&self.summaries_dir)
    }

    #[must_use]
    pub fn single_log_path(&self) -> PathBuf {
        self.root.join(&self.single_log)
    }

    #[must_use]
    pub fn single_graph_path(&self) -> PathBuf {
        self.graphs_dir().join(&self.single_graph)
    }

    #[must_use]
    pub fn single_summary_path(&self) -> PathBuf {
        self.summaries_dir().join(&self.single_summary)
    }

    /// `graphs/<agent-dir><file>` with a `.csv` suffix swapped for the batch
    /// image extension.
    #[must_use]
    pub fn batch_graph_path(&self, agent_dir: &str, file_name: &str) -> PathBuf {
        let stem = strip_csv_suffix(file_name);
        self.graphs_dir().join(format!(
            "{agent_dir}{stem}.{}",
            self.batch_image_extension
        ))
    }

    /// `summaries/<agent-dir>summary<file>`.
    #[must_use]
    pub fn batch_summary_path(&self, agent_dir: &str, file_name: &str) -> PathBuf {
        self.summaries_dir()
            .join(format!("{agent_dir}summary{file_name}"))
    }

    /// Every directory the tools write into, staging folders first.
    #[must_use]
    pub fn output_dirs(&self) -> Vec<PathBuf> {
        let mut dirs: Vec<PathBuf> = PassStage::ALL
            .into_iter()
            .map(|stage| self.pass_dir(stage))
            .collect();
        dirs.push(self.graphs_dir());
        dirs.push(self.summaries_dir());
        dirs
    }

    /// Create any missing output directories. Safe to call repeatedly.
    ///
    /// # Errors
    ///
    /// Returns [`LogError::Io`] if a directory cannot be created.
    pub fn ensure_dirs(&self) -> Result<(), LogError> {
        for dir in self.output_dirs() {
            if !dir.is_dir() {
                debug!("creating {}", dir.display());
            }
            fs::create_dir_all(&dir).map_err(|source| LogError::io(&dir, source))?;
        }
        Ok(())
    }
}

fn strip_csv_suffix(file_name: &str) -> &str {
    let split = file_name.len().saturating_sub(4);
    match file_name.get(split..) {
        Some(suffix) if split > 0 && suffix.eq_ignore_ascii_case(".csv") => &file_name[..split],
        _ => file_name,
    }
}
