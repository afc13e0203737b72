//! PathOS agent log processing
//!
//! Parses the CSV logs written for each simulated agent, derives health curves
//! and per-agent summaries, and moves agent folders through the staged batch
//! pipeline. This crate holds all processing logic; the `pathlog` binary is a
//! thin command-line front end.

pub mod error;
pub mod health;
pub mod layout;
pub mod pipeline;
pub mod plot;
pub mod record;
pub mod summary;

// Re-export commonly used types
pub use error::{LogError, RecordError};
pub use health::{HealthPoint, INITIAL_HEALTH, health_curve};
pub use layout::LogLayout;
pub use pipeline::{
    AgentFolder, BatchProcessor, BatchReport, FolderOutcome, OutputJob, PassStage, StageMove,
    StagePlan, StageWork, execute_graph_job, execute_summary_job, list_agent_folders,
    move_agent_dir, plan_graph_stage, plan_summary_stage, stage_destination,
};
pub use plot::{ImageFormat, PlotStyle, render_health_plot};
pub use record::{
    CombatRecord, HeaderRecord, InteractionEventRecord, LogRecord, RecordTag, parse_records,
    read_log,
};
pub use summary::{
    AgentSummary, SummaryRow, float_value, summarize, write_summary, write_summary_to,
};
