use std::fs;
use std::path::Path;
use std::process::Command;

const AGENT_LOG: &str = "\
HEADER,EVENTVALUES,x,0.75,y,0.5
POSITION,1,0,0,0
INTERACTION,1.5,a,b,c,d,90,ET_HAZARD
INTERACTIONEVENT,2,a,b,0.5,1,1.5,3,c,5
POSITION,9,0,0,0
INTERACTION,9.5,a,b,c,d,0,ET_HAZARD
";

fn pathlog(root: &Path) -> Command {
    let mut command = Command::new(env!("CARGO_BIN_EXE_pathlog"));
    command.arg("--log-root").arg(root);
    command
}

#[test]
fn cli_summarize_writes_default_summary() {
    let scratch = tempfile::tempdir().unwrap();
    let root = scratch.path().join("Logs");
    fs::create_dir_all(&root).unwrap();
    fs::write(root.join("agent-0.csv"), AGENT_LOG).unwrap();

    let output = pathlog(&root)
        .args(["summarize", "--print"])
        .output()
        .expect("run cli");
    assert!(output.status.success());

    let summary = fs::read_to_string(root.join("summaries/agent-0-summary.csv")).unwrap();
    assert!(summary.contains("InteractionEvents,1\n"));
    assert!(summary.contains("TimeLoss,3.0\n"));
    assert!(summary.contains("AgentTime,12.0\n"));
    assert!(summary.contains("PlayerDied,True\n"));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("FinalGoalAchieved"));
}

#[test]
fn cli_graph_writes_default_image() {
    let scratch = tempfile::tempdir().unwrap();
    let root = scratch.path().join("Logs");
    fs::create_dir_all(&root).unwrap();
    fs::write(root.join("agent-0.csv"), AGENT_LOG).unwrap();

    let status = pathlog(&root).arg("graph").status().expect("run cli");
    assert!(status.success());
    assert!(root.join("graphs/agent-0.png").is_file());
}

#[test]
fn cli_batch_emits_json_report() {
    let scratch = tempfile::tempdir().unwrap();
    let root = scratch.path().join("Logs");
    let agent_dir = root.join(".logs/.pass0/session-1");
    fs::create_dir_all(&agent_dir).unwrap();
    fs::write(agent_dir.join("agent-0.csv"), AGENT_LOG).unwrap();
    fs::write(agent_dir.join("agent-1.csv"), AGENT_LOG).unwrap();
    let report_path = scratch.path().join("report.json");

    let status = pathlog(&root)
        .args(["batch", "--report", "json", "--output"])
        .arg(&report_path)
        .status()
        .expect("run cli");
    assert!(status.success());

    let report: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&report_path).unwrap()).unwrap();
    assert_eq!(report["graphed"][0]["folder"], "session-1");
    assert_eq!(report["summarized"][0]["stage"], "summarized");
    assert_eq!(
        report["summarized"][0]["outputs"].as_array().map(Vec::len),
        Some(2)
    );
    assert!(root.join("graphs/session-1agent-1.jpg").is_file());
    assert!(root.join("summaries/session-1summaryagent-1.csv").is_file());
    assert!(root.join(".logs/.pass2/session-1").is_dir());
}

#[test]
fn cli_reports_malformed_logs() {
    let scratch = tempfile::tempdir().unwrap();
    let root = scratch.path().join("Logs");
    fs::create_dir_all(&root).unwrap();
    fs::write(root.join("agent-0.csv"), "COMBAT,1,2\n").unwrap();

    let output = pathlog(&root).arg("summarize").output().expect("run cli");
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("COMBAT record needs field 8"));
    assert!(!root.join("summaries/agent-0-summary.csv").exists());
}
