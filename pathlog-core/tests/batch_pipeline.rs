use std::fs;
use std::path::Path;

use pathlog_core::{BatchProcessor, LogError, LogLayout, PassStage, StageWork};

const AGENT_LOG: &str = "\
HEADER,SAMPLE,2
HEADER,EVENTVALUES,x,0.8,y,0.2
POSITION,0.5,1,0,1
INTERACTION,1.5,a,b,c,d,80,ET_HAZARD
COMBAT,2,a,1,b,c,d,e,4
POSITION,6,1,0,2
INTERACTION,6.5,a,b,c,d,60,ET_GOAL_COMPLETION
";

fn scratch_layout(root: &Path) -> LogLayout {
    LogLayout::default().with_root(root.join("Logs"))
}

fn seed_folder(layout: &LogLayout, stage: PassStage, name: &str, files: &[(&str, &str)]) {
    let dir = layout.pass_dir(stage).join(name);
    fs::create_dir_all(&dir).unwrap();
    for (file, body) in files {
        fs::write(dir.join(file), body).unwrap();
    }
}

fn file_names(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .unwrap()
        .map(|entry| entry.unwrap().file_name().into_string().unwrap())
        .collect();
    names.sort();
    names
}

#[test]
fn batch_run_graphs_summarizes_and_archives() {
    let scratch = tempfile::tempdir().unwrap();
    let layout = scratch_layout(scratch.path());
    seed_folder(
        &layout,
        PassStage::Raw,
        "run1",
        &[("agent-0.csv", AGENT_LOG), ("agent-1.csv", AGENT_LOG)],
    );

    let report = BatchProcessor::new(&layout).run().unwrap();

    assert_eq!(report.images_written(), 2);
    assert_eq!(report.summaries_written(), 2);
    assert_eq!(
        file_names(&layout.graphs_dir()),
        vec!["run1agent-0.jpg", "run1agent-1.jpg"]
    );
    assert_eq!(
        file_names(&layout.summaries_dir()),
        vec!["run1summaryagent-0.csv", "run1summaryagent-1.csv"]
    );
    assert!(!layout.pass_dir(PassStage::Raw).join("run1").exists());
    assert!(!layout.pass_dir(PassStage::Graphed).join("run1").exists());
    assert_eq!(
        file_names(&layout.pass_dir(PassStage::Summarized).join("run1")),
        vec!["agent-0.csv", "agent-1.csv"]
    );

    let summary = fs::read_to_string(layout.summaries_dir().join("run1summaryagent-0.csv")).unwrap();
    assert!(summary.contains("True Accuracy,0.5\n"));
    assert!(summary.contains("AgentTime,8.0\n"));
    assert!(summary.contains("FinalGoalAchieved,True\n"));
}

#[test]
fn batch_run_creates_missing_directories() {
    let scratch = tempfile::tempdir().unwrap();
    let layout = scratch_layout(scratch.path());

    let report = BatchProcessor::new(&layout).run().unwrap();

    assert!(report.graphed.is_empty());
    assert!(report.summarized.is_empty());
    for dir in layout.output_dirs() {
        assert!(dir.is_dir(), "{} not created", dir.display());
    }
}

#[test]
fn batch_run_resumes_graphed_folders() {
    let scratch = tempfile::tempdir().unwrap();
    let layout = scratch_layout(scratch.path());
    seed_folder(&layout, PassStage::Graphed, "left-over", &[("agent-3.csv", AGENT_LOG)]);

    let report = BatchProcessor::new(&layout).run().unwrap();

    assert!(report.graphed.is_empty());
    assert_eq!(report.summarized.len(), 1);
    assert_eq!(report.summarized[0].stage, PassStage::Summarized);
    assert!(
        layout
            .summaries_dir()
            .join("left-oversummaryagent-3.csv")
            .is_file()
    );
    assert!(layout.pass_dir(PassStage::Summarized).join("left-over").is_dir());
}

#[test]
fn malformed_file_keeps_folder_in_place() {
    let scratch = tempfile::tempdir().unwrap();
    let layout = scratch_layout(scratch.path());
    seed_folder(
        &layout,
        PassStage::Raw,
        "broken",
        &[
            ("agent-0.csv", AGENT_LOG),
            ("agent-1.csv", "POSITION,1\nINTERACTION,2,a,b,c,d,dead,ET_X\n"),
        ],
    );

    let err = BatchProcessor::new(&layout).run().unwrap_err();

    assert!(matches!(err, LogError::MalformedRecord { .. }));
    assert!(layout.pass_dir(PassStage::Raw).join("broken").is_dir());
    assert!(!layout.pass_dir(PassStage::Graphed).join("broken").exists());
}

#[test]
fn graph_stage_alone_leaves_folders_graphed() {
    let scratch = tempfile::tempdir().unwrap();
    let layout = scratch_layout(scratch.path());
    layout.ensure_dirs().unwrap();
    seed_folder(&layout, PassStage::Raw, "a", &[("agent-0.csv", AGENT_LOG)]);
    seed_folder(&layout, PassStage::Raw, "b", &[("agent-0.csv", AGENT_LOG)]);

    let outcomes = BatchProcessor::new(&layout)
        .run_stage(StageWork::Graph)
        .unwrap();

    let folders: Vec<&str> = outcomes.iter().map(|o| o.folder.as_str()).collect();
    assert_eq!(folders, vec!["a", "b"]);
    assert_eq!(
        file_names(&layout.pass_dir(PassStage::Graphed)),
        vec!["a", "b"]
    );
    assert!(file_names(&layout.summaries_dir()).is_empty());
}

#[test]
fn summaries_are_identical_across_runs() {
    let scratch = tempfile::tempdir().unwrap();
    let layout = scratch_layout(scratch.path());
    seed_folder(&layout, PassStage::Raw, "first", &[("agent-0.csv", AGENT_LOG)]);
    BatchProcessor::new(&layout).run().unwrap();
    seed_folder(&layout, PassStage::Raw, "second", &[("agent-0.csv", AGENT_LOG)]);
    BatchProcessor::new(&layout).run().unwrap();

    let first = fs::read(layout.summaries_dir().join("firstsummaryagent-0.csv")).unwrap();
    let second = fs::read(layout.summaries_dir().join("secondsummaryagent-0.csv")).unwrap();
    assert_eq!(first, second);
}
