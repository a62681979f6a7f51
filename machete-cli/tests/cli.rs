use std::str;

use anyhow::Result;
use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use machete_test_utils::{
  GitRepoTestGuard, checkout_branch, create_branch, create_commit, head_commit, read_layout, write_layout,
};
use predicates::prelude::*;
use tempfile::TempDir;

/// Command isolated from the user's config and terminal colors.
fn machete(guard: &GitRepoTestGuard, config_home: &TempDir) -> Command {
  let mut cmd = cargo_bin_cmd!("machete");
  cmd
    .env("NO_COLOR", "1")
    .env("XDG_CONFIG_HOME", config_home.path())
    .current_dir(guard.path());
  cmd
}

/// main: base ── main-2
///          └── topic-1 (topic) ── child-1 (child)
fn stacked_repo() -> Result<GitRepoTestGuard> {
  let guard = GitRepoTestGuard::new();
  create_commit(&guard.repo, "base.txt", "base", "base")?;
  create_branch(&guard.repo, "topic", None)?;
  checkout_branch(&guard.repo, "topic")?;
  create_commit(&guard.repo, "topic.txt", "topic", "topic-1")?;
  create_branch(&guard.repo, "child", None)?;
  checkout_branch(&guard.repo, "child")?;
  create_commit(&guard.repo, "child.txt", "child", "child-1")?;
  checkout_branch(&guard.repo, "main")?;
  Ok(guard)
}

#[test]
fn status_renders_layout_and_warns_about_skipped_branches() -> Result<()> {
  let guard = stacked_repo()?;
  let config_home = TempDir::new()?;
  write_layout(&guard.repo, "main\n  topic PR #1\n    child\n  ghost\n")?;

  let assert = machete(&guard, &config_home).arg("status").assert().success();
  let stdout = str::from_utf8(&assert.get_output().stdout)?;

  assert!(stdout.contains("main * (untracked)"));
  assert!(stdout.contains("o-topic  PR #1 (untracked)"));
  assert!(stdout.contains("  o-child (untracked)"));
  assert!(stdout.contains("Skipping ghost"));
  Ok(())
}

#[test]
fn status_lists_commits_since_fork_point() -> Result<()> {
  let guard = stacked_repo()?;
  let config_home = TempDir::new()?;
  write_layout(&guard.repo, "main\n  topic\n")?;

  machete(&guard, &config_home)
    .args(["status", "--list-commits"])
    .assert()
    .success()
    .stdout(predicate::str::contains("topic-1"));
  Ok(())
}

#[test]
fn status_outside_a_repository_is_empty() -> Result<()> {
  let outside = TempDir::new()?;
  let config_home = TempDir::new()?;

  cargo_bin_cmd!("machete")
    .env("NO_COLOR", "1")
    .env("XDG_CONFIG_HOME", config_home.path())
    .current_dir(outside.path())
    .arg("status")
    .assert()
    .success()
    .stdout(predicate::str::contains("Not in a git repository"));
  Ok(())
}

#[test]
fn status_json_exposes_statuses() -> Result<()> {
  let guard = stacked_repo()?;
  let config_home = TempDir::new()?;
  write_layout(&guard.repo, "main\n  topic\n")?;
  checkout_branch(&guard.repo, "main")?;
  create_commit(&guard.repo, "main.txt", "main", "main-2")?;

  let assert = machete(&guard, &config_home)
    .args(["status", "--format", "json"])
    .assert()
    .success();
  let document: serde_json::Value = serde_json::from_slice(&assert.get_output().stdout)?;

  let branches = document["snapshot"]["branches"].as_array().cloned().unwrap_or_default();
  assert_eq!(branches.len(), 2);
  assert_eq!(branches[0]["name"], "main");
  assert_eq!(branches[0]["kind"], "root");
  assert_eq!(branches[1]["name"], "topic");
  assert_eq!(branches[1]["sync_to_parent_status"], "out-of-sync");
  assert_eq!(branches[1]["sync_to_origin_status"], "untracked");
  Ok(())
}

#[test]
fn fork_point_prints_commit() -> Result<()> {
  let guard = stacked_repo()?;
  let config_home = TempDir::new()?;
  let base = head_commit(&guard.repo, "main")?;

  machete(&guard, &config_home)
    .args(["fork-point", "topic"])
    .assert()
    .success()
    .stdout(predicate::str::contains(base));
  Ok(())
}

#[test]
fn rebase_params_describe_restack() -> Result<()> {
  let guard = stacked_repo()?;
  let config_home = TempDir::new()?;
  write_layout(&guard.repo, "main\n  topic\n")?;
  let base = head_commit(&guard.repo, "main")?;
  create_commit(&guard.repo, "main.txt", "main", "main-2")?;

  machete(&guard, &config_home)
    .args(["rebase-params", "topic"])
    .assert()
    .success()
    .stdout(predicate::str::contains(format!("git rebase --onto main {base} topic")))
    .stdout(predicate::str::contains(format!("machete-pre-rebase main {base} topic")));
  Ok(())
}

#[test]
fn rebase_params_of_root_fails() -> Result<()> {
  let guard = stacked_repo()?;
  let config_home = TempDir::new()?;
  write_layout(&guard.repo, "main\n  topic\n")?;

  machete(&guard, &config_home)
    .args(["rebase-params", "main"])
    .assert()
    .failure()
    .stderr(predicate::str::contains("has no upstream branch"));
  Ok(())
}

#[test]
fn traverse_plans_cascading_rebase() -> Result<()> {
  let guard = stacked_repo()?;
  let config_home = TempDir::new()?;
  write_layout(&guard.repo, "main\n  topic\n    child\n")?;
  create_commit(&guard.repo, "main.txt", "main", "main-2")?;

  machete(&guard, &config_home)
    .args(["traverse", "--no-push"])
    .assert()
    .success()
    .stdout(predicate::str::contains("rebase onto main"))
    .stdout(predicate::str::contains("rebase onto topic"));
  Ok(())
}

#[test]
fn traverse_respects_configured_defaults() -> Result<()> {
  let guard = stacked_repo()?;
  let config_home = TempDir::new()?;
  let config_dir = config_home.path().join("machete");
  std::fs::create_dir_all(&config_dir)?;
  std::fs::write(config_dir.join("config.toml"), "[traverse]\npush = false\n")?;
  write_layout(&guard.repo, "main\n  topic\n")?;

  machete(&guard, &config_home)
    .arg("traverse")
    .assert()
    .success()
    .stdout(predicate::str::contains("All branches are in sync"));
  Ok(())
}

#[test]
fn slide_out_moves_children_up() -> Result<()> {
  let guard = stacked_repo()?;
  let config_home = TempDir::new()?;
  write_layout(&guard.repo, "main\n  topic\n    child\n")?;

  machete(&guard, &config_home)
    .args(["slide-out", "topic"])
    .assert()
    .success()
    .stdout(predicate::str::contains("Slid out topic"));

  assert_eq!(read_layout(&guard.repo)?, "main\n  child\n");
  Ok(())
}

#[test]
fn slide_out_refuses_root() -> Result<()> {
  let guard = stacked_repo()?;
  let config_home = TempDir::new()?;
  write_layout(&guard.repo, "main\n  topic\n")?;

  machete(&guard, &config_home)
    .args(["slide-out", "main"])
    .assert()
    .failure()
    .stderr(predicate::str::contains("is a root branch"));

  assert_eq!(read_layout(&guard.repo)?, "main\n  topic\n");
  Ok(())
}

#[test]
fn add_and_annotate_edit_the_layout() -> Result<()> {
  let guard = stacked_repo()?;
  let config_home = TempDir::new()?;

  machete(&guard, &config_home)
    .args(["add", "main"])
    .assert()
    .success()
    .stdout(predicate::str::contains("as a root branch"));
  machete(&guard, &config_home).args(["add", "topic"]).assert().success();
  machete(&guard, &config_home)
    .args(["add", "child", "--onto", "topic"])
    .assert()
    .success();
  machete(&guard, &config_home)
    .args(["annotate", "topic", "PR", "#9", "push=no"])
    .assert()
    .success();

  assert_eq!(read_layout(&guard.repo)?, "main\n  topic PR #9 push=no\n    child\n");

  machete(&guard, &config_home)
    .args(["add", "ghost"])
    .assert()
    .failure()
    .stderr(predicate::str::contains("does not exist"));
  Ok(())
}

#[test]
fn layout_flag_overrides_default_location() -> Result<()> {
  let guard = stacked_repo()?;
  let config_home = TempDir::new()?;
  let elsewhere = TempDir::new()?;
  let layout = elsewhere.path().join("layout");
  std::fs::write(&layout, "main\n  child\n")?;

  machete(&guard, &config_home)
    .arg("status")
    .arg("--layout")
    .arg(&layout)
    .assert()
    .success()
    .stdout(predicate::str::contains("?-child"));
  Ok(())
}

#[test]
fn add_onto_branch_missing_from_layout_fails() -> Result<()> {
  let guard = stacked_repo()?;
  let config_home = TempDir::new()?;

  machete(&guard, &config_home)
    .args(["add", "child", "--onto", "topic"])
    .assert()
    .failure()
    .stderr(predicate::str::contains("Branch 'topic' is not in the layout"));

  assert_eq!(read_layout(&guard.repo)?, "");
  Ok(())
}

#[test]
fn annotate_refuses_multiline_text() -> Result<()> {
  let guard = stacked_repo()?;
  let config_home = TempDir::new()?;
  write_layout(&guard.repo, "main\n  topic\n")?;

  machete(&guard, &config_home)
    .args(["annotate", "topic", "PR\nghost"])
    .assert()
    .failure()
    .stderr(predicate::str::contains("must fit on a single line"));

  assert_eq!(read_layout(&guard.repo)?, "main\n  topic\n");
  Ok(())
}
