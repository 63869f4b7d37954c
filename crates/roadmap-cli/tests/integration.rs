use assert_cmd::Command;
use predicates::prelude::*;
use std::path::Path;
use tempfile::TempDir;

const CONFIG: &str = r#"
version: 1
teams:
  CDK:
    scrum_board: Scrum
    team_board: CDK Team
    backlog_board: Backlog
    sizing_board: Sizing
roadmap:
  key: roadmap
  org: Kubernetes
bugs:
  project_group: charmed
"#;

const WORKSPACE: &str = r#"
boards:
  - id: scrum
    name: Scrum
    lanes:
      - { id: ip, name: In Progress, pos: 2048 }
      - { id: done, name: Done, pos: 4096 }
    labels:
      - { id: stale, name: Stale, color: purple }
    cards:
      - id: c1
        name: Old work
        url: local://cards/c1
        lane_id: ip
        last_activity: 2020-01-01T00:00:00Z
  - id: backlog
    name: Backlog
    lanes:
      - { id: bl, name: Backlog, pos: 1024 }
  - id: team
    name: CDK Team
    lanes:
      - { id: todo, name: Todo, pos: 1024 }
    cards:
      - id: t1
        name: Ingress
        url: local://cards/t1
        description: Route external traffic
        lane_id: todo
        last_activity: 2024-03-01T00:00:00Z
  - id: sizing
    name: Sizing
sheets:
  - key: roadmap
    worksheet: Kubernetes
    rows:
      - ["", "", "CDK"]
      - ["1.29", "", ""]
      - ["", "", "Networking"]
      - ["", "", "Ingress"]
      - ["", "", "Gateway API"]
      - ["1.30", "", ""]
      - ["", "", "Mesh"]
bugs:
  groups:
    - { name: charmed, projects: [charm-a, charm-b] }
  tasks:
    - { bug_id: 1, project: charm-a, status: New, subscribers: [field-high] }
    - { bug_id: 2, project: charm-b, status: Triaged, subscribers: [field-high] }
    - { bug_id: 3, project: charm-b, status: Fix Released, subscribers: [field-high] }
"#;

fn roadmap(root: &Path) -> Command {
    let mut cmd = Command::cargo_bin("roadmap").unwrap();
    cmd.env("ROADMAP_ROOT", root)
        .env("HOME", root)
        .env_remove("RUST_LOG");
    cmd
}

fn fixture() -> TempDir {
    let dir = TempDir::new().unwrap();
    std::fs::create_dir_all(dir.path().join(".roadmap")).unwrap();
    std::fs::write(dir.path().join(".roadmap/config.yaml"), CONFIG).unwrap();
    std::fs::write(dir.path().join(".roadmap/workspace.yaml"), WORKSPACE).unwrap();
    dir
}

fn workspace(root: &Path) -> serde_yaml::Value {
    let data = std::fs::read_to_string(root.join(".roadmap/workspace.yaml")).unwrap();
    serde_yaml::from_str(&data).unwrap()
}

fn board_cards(root: &Path, board: &str) -> Vec<String> {
    let ws = workspace(root);
    let boards = ws["boards"].as_sequence().unwrap();
    let board = boards
        .iter()
        .find(|b| b["name"].as_str() == Some(board))
        .unwrap();
    board["cards"]
        .as_sequence()
        .map(|cards| {
            cards
                .iter()
                .map(|c| c["name"].as_str().unwrap().to_string())
                .collect()
        })
        .unwrap_or_default()
}

#[test]
fn init_is_idempotent() {
    let dir = TempDir::new().unwrap();
    roadmap(dir.path())
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("created: .roadmap/config.yaml"));
    assert!(dir.path().join(".roadmap/workspace.yaml").exists());

    roadmap(dir.path())
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("exists:  .roadmap/config.yaml"));
}

#[test]
fn commands_fail_before_init() {
    let dir = TempDir::new().unwrap();
    roadmap(dir.path())
        .arg("stale")
        .assert()
        .failure()
        .stderr(predicate::str::contains("not initialized"));
}

#[test]
fn config_validate_accepts_fixture() {
    let dir = fixture();
    roadmap(dir.path())
        .args(["config", "validate"])
        .assert()
        .success();
}

#[test]
fn unknown_team_is_an_error() {
    let dir = fixture();
    roadmap(dir.path())
        .args(["release", "tag", "1.29", "--team", "nope"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("team not configured: nope"));
}

#[test]
fn release_create_files_roadmap_features() {
    let dir = fixture();
    roadmap(dir.path())
        .args(["release", "create", "1.29", "--team", "CDK"])
        .assert()
        .success()
        .stdout(predicate::str::contains("created lane: 1.29"))
        .stdout(predicate::str::contains("created: Ingress"))
        .stdout(predicate::str::contains("created: Gateway API"));

    let cards = board_cards(dir.path(), "Scrum");
    assert!(cards.contains(&"Ingress".to_string()));
    assert!(cards.contains(&"Gateway API".to_string()));
    assert!(!cards.contains(&"Mesh".to_string()));

    // second run creates nothing new
    roadmap(dir.path())
        .args(["release", "create", "1.29", "--team", "CDK"])
        .assert()
        .success()
        .stdout(predicate::str::contains("created: Ingress").not());
    assert_eq!(board_cards(dir.path(), "Scrum").len(), cards.len());
}

#[test]
fn release_create_json_output() {
    let dir = fixture();
    let output = roadmap(dir.path())
        .args(["--json", "release", "create", "1.29"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value[0]["team"], "CDK");
    assert_eq!(value[0]["sync"]["created"].as_array().unwrap().len(), 2);
}

#[test]
fn sizing_gather_after_setup() {
    let dir = fixture();
    roadmap(dir.path())
        .args(["board", "setup", "CDK", "sizing"])
        .assert()
        .success()
        .stdout(predicate::str::contains("created lane: Unsized"));

    roadmap(dir.path())
        .args(["sizing", "gather", "--team", "CDK"])
        .assert()
        .success()
        .stdout(predicate::str::contains("created: Ingress"));
    assert_eq!(board_cards(dir.path(), "Sizing"), vec!["Ingress".to_string()]);
}

#[test]
fn stale_cards_are_labeled_and_moved() {
    let dir = fixture();
    roadmap(dir.path())
        .arg("stale")
        .assert()
        .success()
        .stdout(predicate::str::contains("labeled stale: Old work"))
        .stdout(predicate::str::contains("moved to backlog: Old work"));

    let ws = workspace(dir.path());
    let scrum = &ws["boards"][0];
    assert!(scrum["cards"].as_sequence().is_none_or(|c| c.is_empty()));
    assert_eq!(board_cards(dir.path(), "Backlog"), vec!["Old work".to_string()]);
}

#[test]
fn board_clear_requires_confirmation() {
    let dir = fixture();
    roadmap(dir.path())
        .args(["board", "clear", "CDK", "team"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--yes"));
    assert_eq!(board_cards(dir.path(), "CDK Team").len(), 1);

    roadmap(dir.path())
        .args(["board", "clear", "CDK", "team", "--yes"])
        .assert()
        .success()
        .stdout(predicate::str::contains("1 cards deleted"));
    assert!(board_cards(dir.path(), "CDK Team").is_empty());
}

#[test]
fn milestone_sla_prints_line_protocol() {
    let dir = fixture();
    roadmap(dir.path())
        .args(["milestone", "sla"])
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "field_sla_bugs,subscriber=field-high,severity=high total_bugs=2i",
        ))
        .stdout(predicate::str::contains(
            "field_sla_bugs,subscriber=field-critical,severity=critical total_bugs=0i",
        ));
}

#[test]
fn unknown_board_kind_is_rejected() {
    let dir = fixture();
    roadmap(dir.path())
        .args(["board", "list", "CDK", "kanban"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown board kind"));
}

#[test]
fn missing_board_prints_config_hint() {
    let dir = fixture();
    let config = CONFIG.replace("sizing_board: Sizing", "sizing_board: Nowhere");
    std::fs::write(dir.path().join(".roadmap/config.yaml"), config).unwrap();
    roadmap(dir.path())
        .args(["sizing", "update", "--team", "CDK"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("board not found: Nowhere"))
        .stderr(predicate::str::contains("hint: check .roadmap/config.yaml"));
}
