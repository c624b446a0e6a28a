use anyhow::Result;
use savesync::backup::BackupOutcome;
use savesync::config::Config;
use savesync::orchestrator::{
    self, BackupDecision, RunOptions, STATES_NOT_FOUND, STATES_SHARED, run_with_locator,
};
use std::fs;
use std::path::{Path, PathBuf};

mod common;
use common::{TestTrees, file_list, mtime, snapshot, write, write_with_mtime};

fn options(trees: &TestTrees) -> RunOptions {
    RunOptions::new(&trees.mac, &trees.handheld)
}

fn archives_in(dir: &Path) -> Result<usize> {
    if !dir.exists() {
        return Ok(0);
    }
    Ok(fs::read_dir(dir)?
        .filter_map(Result::ok)
        .filter(|e| e.path().extension().is_some_and(|ext| ext == "zip"))
        .count())
}

#[test]
fn test_end_to_end_populates_empty_handheld() -> Result<()> {
    let trees = TestTrees::new()?;
    let save1 = write_with_mtime(&trees.mac, "save1.srm", &[7u8; 10], 1_650_000_000)?;
    let save2 = write_with_mtime(&trees.mac, "sub/save2.srm", &[9u8; 20], 1_650_000_500)?;
    let mac_before = snapshot(&trees.mac)?;

    let summary = orchestrator::run(&options(&trees), &Config::default())?;
    assert_eq!(summary.saves.backup, BackupDecision::Disabled);
    assert_eq!(summary.saves.a_to_b.copied.len(), 2);
    assert!(summary.saves.b_to_a.copied.is_empty());
    assert!(summary.states.is_none());

    assert_eq!(snapshot(&trees.handheld)?, mac_before);
    assert_eq!(snapshot(&trees.mac)?, mac_before);
    assert_eq!(mtime(&trees.handheld.join("save1.srm"))?, mtime(&save1)?);
    assert_eq!(mtime(&trees.handheld.join("sub/save2.srm"))?, mtime(&save2)?);
    Ok(())
}

#[test]
fn test_handheld_only_file_flows_back() -> Result<()> {
    let trees = TestTrees::new()?;
    write(&trees.mac, "save1.srm", b"identical")?;
    write(&trees.handheld, "save1.srm", b"identical")?;
    write(&trees.handheld, "save3.srm", b"from handheld")?;

    let summary = orchestrator::run(&options(&trees), &Config::default())?;
    assert!(summary.saves.a_to_b.copied.is_empty());
    assert_eq!(summary.saves.b_to_a.copied, vec![PathBuf::from("save3.srm")]);
    assert_eq!(file_list(&trees.mac)?, vec!["save1.srm", "save3.srm"]);
    assert_eq!(file_list(&trees.handheld)?, vec!["save1.srm", "save3.srm"]);
    Ok(())
}

#[test]
fn test_repeat_run_is_idle() -> Result<()> {
    let trees = TestTrees::new()?;
    write(&trees.mac, "a.srm", b"a")?;
    write(&trees.handheld, "b.srm", b"b")?;
    let mut opts = options(&trees);
    opts.backup = true;

    let first = orchestrator::run(&opts, &Config::default())?;
    assert!(matches!(first.saves.backup, BackupDecision::Taken(_)));
    assert_eq!(first.total_copied(), 2);

    let second = orchestrator::run(&opts, &Config::default())?;
    assert_eq!(second.saves.backup, BackupDecision::NoChanges);
    assert_eq!(second.total_copied(), 0);
    assert_eq!(archives_in(&trees.mac.join("backups"))?, 1);
    assert_eq!(archives_in(&trees.handheld.join("backups"))?, 1);
    Ok(())
}

#[test]
fn test_backups_are_not_synced_across() -> Result<()> {
    let trees = TestTrees::new()?;
    write(&trees.mac, "a.srm", b"a")?;
    let mut opts = options(&trees);
    opts.backup = true;

    orchestrator::run(&opts, &Config::default())?;
    assert_eq!(file_list(&trees.handheld)?.len(), 2); // a.srm + its own snapshot
    assert!(file_list(&trees.handheld)?.contains(&"a.srm".to_string()));
    assert_eq!(archives_in(&trees.handheld.join("backups"))?, 1);
    Ok(())
}

#[test]
fn test_unconditional_backup_variant() -> Result<()> {
    let trees = TestTrees::new()?;
    write(&trees.mac, "a.srm", b"a")?;
    write(&trees.handheld, "a.srm", b"a")?;
    let mut opts = options(&trees);
    opts.backup = true;
    let mut config = Config::default();
    config.backup.require_changes = false;

    let summary = orchestrator::run(&opts, &config)?;
    let BackupDecision::Taken(ref outcomes) = summary.saves.backup else {
        panic!("expected backups to be taken");
    };
    assert_eq!(outcomes.len(), 2);
    assert!(outcomes.iter().all(|o| matches!(o, BackupOutcome::Created { .. })));
    assert_eq!(summary.total_copied(), 0);
    Ok(())
}

#[test]
fn test_backup_directory_overrides() -> Result<()> {
    let trees = TestTrees::new()?;
    write(&trees.mac, "a.srm", b"a")?;
    let mac_bk = trees.path().join("elsewhere/mac");
    let hh_bk = trees.path().join("elsewhere/handheld");
    let mut opts = options(&trees);
    opts.backup = true;
    opts.mac_backup = Some(mac_bk.clone());
    opts.handheld_backup = Some(hh_bk.clone());

    orchestrator::run(&opts, &Config::default())?;
    assert_eq!(archives_in(&mac_bk)?, 1);
    assert_eq!(archives_in(&hh_bk)?, 1);
    assert!(!trees.mac.join("backups").exists());
    Ok(())
}

#[test]
fn test_dry_run_changes_nothing_anywhere() -> Result<()> {
    let trees = TestTrees::new()?.with_states()?;
    write(&trees.mac, "a.srm", b"a")?;
    write(&trees.handheld, "b.srm", b"b")?;
    write(&trees.mac_states(), "a.state", b"state")?;
    let before = snapshot(trees.path())?;

    let mut opts = options(&trees);
    opts.backup = true;
    opts.dry_run = true;
    opts.transfer_states = true;
    let planned = orchestrator::run(&opts, &Config::default())?;
    assert_eq!(snapshot(trees.path())?, before);

    opts.dry_run = false;
    let real = orchestrator::run(&opts, &Config::default())?;
    assert_eq!(planned.saves.a_to_b.copied, real.saves.a_to_b.copied);
    assert_eq!(planned.saves.b_to_a.copied, real.saves.b_to_a.copied);
    assert_eq!(
        planned.states.as_ref().map(|s| s.a_to_b.copied.clone()),
        real.states.as_ref().map(|s| s.a_to_b.copied.clone())
    );
    Ok(())
}

#[test]
fn test_states_synced_with_their_own_backups() -> Result<()> {
    let trees = TestTrees::new()?.with_states()?;
    write(&trees.mac_states(), "zelda.state1", b"slot1")?;
    write(&trees.handheld_states(), "metroid.state", b"slot0")?;
    let mut opts = options(&trees);
    opts.transfer_states = true;
    opts.backup = true;

    let summary = orchestrator::run(&opts, &Config::default())?;
    let states = summary.states.expect("states should be synced");
    assert!(matches!(states.backup, BackupDecision::Taken(_)));
    assert_eq!(states.copied(), 2);

    assert!(trees.handheld_states().join("zelda.state1").exists());
    assert!(trees.mac_states().join("metroid.state").exists());
    assert_eq!(archives_in(&trees.mac_states().join("backups"))?, 1);
    assert_eq!(archives_in(&trees.handheld_states().join("backups"))?, 1);
    // Saves had nothing to do, so no saves snapshot was taken.
    assert_eq!(summary.saves.backup, BackupDecision::NoChanges);
    Ok(())
}

#[test]
fn test_states_skipped_when_one_side_missing() -> Result<()> {
    let trees = TestTrees::new()?;
    fs::create_dir_all(trees.mac_states())?;
    write(&trees.mac_states(), "a.state", b"x")?;
    let mut opts = options(&trees);
    opts.transfer_states = true;

    let summary = orchestrator::run(&opts, &Config::default())?;
    assert!(summary.states.is_none());
    assert_eq!(summary.states_skipped_reason.as_deref(), Some(STATES_NOT_FOUND));
    assert!(!trees.handheld_states().exists());
    Ok(())
}

#[test]
fn test_capitalized_states_directory_found() -> Result<()> {
    let trees = TestTrees::new()?;
    fs::create_dir_all(trees.path().join("mac/States"))?;
    fs::create_dir_all(trees.handheld_states())?;
    write(&trees.path().join("mac/States"), "a.state", b"x")?;
    let mut opts = options(&trees);
    opts.transfer_states = true;

    let summary = orchestrator::run(&opts, &Config::default())?;
    assert!(summary.states.is_some());
    assert!(trees.handheld_states().join("a.state").exists());
    Ok(())
}

#[test]
fn test_custom_states_locator() -> Result<()> {
    let trees = TestTrees::new()?;
    let mac_snaps = trees.path().join("mac/savestates");
    let hh_snaps = trees.path().join("handheld/savestates");
    write(&mac_snaps, "a.state", b"x")?;
    fs::create_dir_all(&hh_snaps)?;
    let mut opts = options(&trees);
    opts.transfer_states = true;

    let locator = |root: &Path| {
        let candidate = root.parent()?.join("savestates");
        candidate.is_dir().then_some(candidate)
    };
    let summary = run_with_locator(&opts, &Config::default(), &locator)?;
    assert!(summary.states.is_some());
    assert!(hh_snaps.join("a.state").exists());
    Ok(())
}

#[test]
fn test_dry_run_conflict_plans_one_direction_only() -> Result<()> {
    let trees = TestTrees::new()?;
    write(&trees.mac, "a.srm", b"MAC!")?;
    write(&trees.handheld, "a.srm", b"HH!!")?;
    let mut opts = options(&trees);
    opts.dry_run = true;

    let planned = orchestrator::run(&opts, &Config::default())?;
    assert_eq!(planned.saves.a_to_b.copied, vec![PathBuf::from("a.srm")]);
    assert!(planned.saves.b_to_a.copied.is_empty());

    opts.dry_run = false;
    let real = orchestrator::run(&opts, &Config::default())?;
    assert_eq!(planned.saves.a_to_b.copied, real.saves.a_to_b.copied);
    assert_eq!(planned.saves.b_to_a.copied, real.saves.b_to_a.copied);
    assert_eq!(fs::read(trees.handheld.join("a.srm"))?, b"MAC!");
    Ok(())
}

#[test]
fn test_renamed_backup_dir_stays_on_its_own_side() -> Result<()> {
    let trees = TestTrees::new()?;
    write(&trees.mac, "a.srm", b"a")?;
    write(&trees.handheld, "b.srm", b"b")?;
    let mut opts = options(&trees);
    opts.backup = true;
    let mut config = Config::default();
    config.backup.dir_name = "snapshots".to_string();

    orchestrator::run(&opts, &config)?;
    write(&trees.mac, "c.srm", b"c")?;
    orchestrator::run(&opts, &config)?;

    assert_eq!(archives_in(&trees.mac.join("snapshots"))?, 2);
    assert_eq!(archives_in(&trees.handheld.join("snapshots"))?, 2);
    let mac_files = file_list(&trees.mac)?;
    let synced: Vec<_> = mac_files.iter().filter(|f| !f.starts_with("snapshots/")).collect();
    assert_eq!(synced, vec!["a.srm", "b.srm", "c.srm"]);
    Ok(())
}

#[test]
fn test_shared_backup_override_keeps_both_snapshots() -> Result<()> {
    let trees = TestTrees::new()?;
    write(&trees.mac, "a.srm", b"a")?;
    let shared = trees.path().join("shared-backups");
    let mut opts = options(&trees);
    opts.backup = true;
    opts.mac_backup = Some(shared.clone());
    opts.handheld_backup = Some(shared.clone());

    let summary = orchestrator::run(&opts, &Config::default())?;
    let BackupDecision::Taken(outcomes) = summary.saves.backup else {
        panic!("expected backups to be taken");
    };
    assert_ne!(outcomes[0].archive(), outcomes[1].archive());
    assert_eq!(archives_in(&shared)?, 2);
    Ok(())
}

#[test]
fn test_shared_states_directory_skipped() -> Result<()> {
    let trees = TestTrees::new()?;
    let lib = trees.path().join("library");
    let saves_a = lib.join("saves_a");
    let saves_b = lib.join("saves_b");
    fs::create_dir_all(&saves_a)?;
    fs::create_dir_all(&saves_b)?;
    write(&lib.join("states"), "a.state", b"x")?;
    let mut opts = RunOptions::new(&saves_a, &saves_b);
    opts.transfer_states = true;
    opts.backup = true;

    let summary = orchestrator::run(&opts, &Config::default())?;
    assert!(summary.states.is_none());
    assert_eq!(summary.states_skipped_reason.as_deref(), Some(STATES_SHARED));
    assert_eq!(file_list(&lib.join("states"))?, vec!["a.state"]);
    Ok(())
}
