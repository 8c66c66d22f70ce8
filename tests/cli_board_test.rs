use assert_cmd::Command;
use predicates::prelude::*;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

struct Board {
    dir: TempDir,
}

impl Board {
    fn new() -> Self {
        let board = Board { dir: TempDir::new().unwrap() };
        board.cf().arg("init").assert().success().stdout(predicate::str::contains("Created board"));
        board
    }

    fn db(&self) -> PathBuf {
        self.dir.path().join("board.json")
    }

    fn config(&self) -> PathBuf {
        self.dir.path().join("config.toml")
    }

    fn cf(&self) -> Command {
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_cf"));
        cmd.env("HOME", self.dir.path())
            .env_remove("CF_LOG")
            .arg("--db")
            .arg(self.db())
            .arg("--config")
            .arg(self.config());
        cmd
    }

    fn add(&self, title: &str) {
        self.cf().args(["add", title, "--due", "in 3d"]).assert().success();
    }

    fn json(&self) -> serde_json::Value {
        read_json(&self.db())
    }
}

fn read_json(path: &Path) -> serde_json::Value {
    serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap()
}

#[test]
fn test_init_refuses_to_overwrite() {
    let board = Board::new();
    board.cf().arg("init").assert().failure().stderr(predicate::str::contains("Board already exists"));
    board.cf().args(["init", "--force"]).assert().success();
}

#[test]
fn test_add_list_and_view() {
    let board = Board::new();
    board
        .cf()
        .args(["add", "Implement login", "--priority", "high", "--tag", "feature", "--due", "2030-01-15"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Added task 1"));
    board.add("Write docs");

    board
        .cf()
        .args(["list", "--priority", "high"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Implement login").and(predicate::str::contains("Write docs").not()));

    board
        .cf()
        .args(["view", "implement login"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Deadline:     2030-01-15"))
        .stdout(predicate::str::contains("Created"));

    let json = board.json();
    assert_eq!(json["tasks"].as_array().unwrap().len(), 2);
}

#[test]
fn test_move_respects_wip_limit_until_forced() {
    let board = Board::new();
    board.cf().args(["columns", "in-progress", "--wip", "1"]).assert().success();
    board.add("first");
    board.add("second");

    board
        .cf()
        .args(["move", "1", "in-progress", "--comment", "starting"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Moved 1 from Backlog to In Progress"));

    board
        .cf()
        .args(["move", "2", "in-progress"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("WIP limit reached"))
        .stderr(predicate::str::contains("--force"));
    assert_eq!(board.json()["tasks"][1]["status"], "backlog");

    board
        .cf()
        .args(["move", "2", "in-progress", "--force"])
        .assert()
        .success()
        .stdout(predicate::str::contains("over its WIP limit"));

    board
        .cf()
        .arg("columns")
        .assert()
        .success()
        .stdout(predicate::str::contains("over limit"));

    board
        .cf()
        .args(["move", "2", "in-progress"])
        .assert()
        .success()
        .stdout(predicate::str::contains("already in"));
}

#[test]
fn test_comments_and_replies_show_in_view() {
    let board = Board::new();
    board.add("Review API");
    let out = board
        .cf()
        .args(["comment", "1", "Needs another pass"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let out = String::from_utf8(out).unwrap();
    let comment_id = out.split_whitespace().nth(2).unwrap().to_string();

    board.cf().args(["reply", "1", &comment_id, "On it"]).assert().success();
    board.cf().args(["note", "1", "halfway there"]).assert().success();

    board
        .cf()
        .args(["view", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Needs another pass"))
        .stdout(predicate::str::contains("On it"))
        .stdout(predicate::str::contains("halfway there"));
}

#[test]
fn test_energy_json_on_empty_board() {
    let board = Board::new();
    let out = board.cf().args(["energy", "--json"]).assert().success().get_output().stdout.clone();
    let snap: serde_json::Value = serde_json::from_slice(&out).unwrap();
    assert_eq!(snap["level"], "low");
    assert_eq!(snap["score"], 0.0);
    assert_eq!(snap["factors"]["taskLoad"], 0);
}

#[test]
fn test_users_and_acting_user() {
    let board = Board::new();
    board
        .cf()
        .args(["user", "add", "Alex Johnson", "--email", "alex@example.com"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Added user alex-johnson"));
    board
        .cf()
        .args(["user", "add", "Alex Again", "--email", "ALEX@example.com"])
        .assert()
        .failure();

    board
        .cf()
        .args(["--as", "alex@example.com", "add", "Pair on auth", "--assignee", "Alex Johnson"])
        .assert()
        .success();
    let json = board.json();
    assert_eq!(json["tasks"][0]["assignee"], "alex-johnson");
    assert_eq!(json["tasks"][0]["activity_log"][0]["user"], "alex-johnson");

    board.cf().args(["--as", "nobody", "list"]).assert().failure();
    board
        .cf()
        .args(["view", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Alex Johnson (AJ)"));
}

#[test]
fn test_shared_timeline_password() {
    let board = Board::new();
    board.add("Public milestone");
    board.add("Secret milestone");
    let out = board
        .cf()
        .args(["timeline", "share", "Roadmap", "--hide", "2", "--password", "hunter2"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let out = String::from_utf8(out).unwrap();
    let key = out.trim().rsplit(' ').next().unwrap().to_string();

    board.cf().args(["timeline", "open", &key]).assert().failure();
    board.cf().args(["timeline", "open", &key, "--password", "wrong"]).assert().failure();
    board
        .cf()
        .args(["timeline", "open", &key, "--password", "hunter2"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Public milestone").and(predicate::str::contains("Secret milestone").not()));

    board
        .cf()
        .args(["timeline", "open", &key, "--password", "hunter2", "--search", "public"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("does not allow filtering"));

    board.cf().args(["timeline", "revoke", &key]).assert().success();
    board
        .cf()
        .args(["timeline", "open", &key, "--password", "hunter2"])
        .assert()
        .failure();
}

#[test]
fn test_config_file_sets_wip_limits() {
    let board = Board::new();
    std::fs::write(board.config(), "[wip]\nreview = 1\n").unwrap();
    board.add("one");
    board.add("two");
    board.cf().args(["move", "1", "review"]).assert().success();
    board
        .cf()
        .args(["move", "2", "review"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("WIP limit reached"));

    std::fs::write(board.config(), "[wip\n").unwrap();
    board
        .cf()
        .arg("list")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to read config"));
}

#[test]
fn test_retro_and_alerts() {
    let board = Board::new();
    board.add("Ship beta");
    board
        .cf()
        .args(["retro", "add", "Sprint 14", "--win", "beta shipped", "--task", "1"])
        .assert()
        .success();
    board
        .cf()
        .args(["retro", "add", "   "])
        .assert()
        .failure();
    board
        .cf()
        .args(["retro", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Sprint 14").and(predicate::str::contains("beta shipped")));

    // Due in three days: inside the default deadline window.
    board
        .cf()
        .arg("alerts")
        .assert()
        .success()
        .stdout(predicate::str::contains("#1"));
    board.cf().args(["alerts", "--ack", "1"]).assert().success().stdout(predicate::str::contains("No alerts."));
}
