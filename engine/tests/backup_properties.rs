//! End-to-end behavior of backup runs against real temporary directories.

use std::fs;
use std::path::{Path, PathBuf};

use backup_engine::{
    create_job, empty_directory, run_job, EngineError, EntryOutcome, JobConfig,
    OverwriteCondition, SourceEntry,
};
use tempfile::TempDir;

struct Dirs {
    _root: TempDir,
    src: PathBuf,
    dst: PathBuf,
}

fn setup() -> Dirs {
    let root = tempfile::tempdir().expect("Failed to create temp dir");
    let src = root.path().join("Test_Source");
    let dst = root.path().join("Test_Target");
    fs::create_dir(&src).expect("Failed to create source");
    fs::create_dir(&dst).expect("Failed to create target");
    Dirs {
        _root: root,
        src,
        dst,
    }
}

fn sample_tree(src: &Path) {
    fs::create_dir_all(src.join("docs/drafts")).unwrap();
    fs::create_dir(src.join("photos")).unwrap();
    fs::write(src.join("readme.md"), "readme").unwrap();
    fs::write(src.join("docs/report.txt"), "report").unwrap();
    fs::write(src.join("docs/drafts/v1.txt"), "v1").unwrap();
    fs::write(src.join("photos/cat.jpg"), "meow").unwrap();
}

/// Relative path and contents of every entry, directories as `None`.
fn snapshot(dir: &Path) -> Vec<(PathBuf, Option<String>)> {
    let mut out: Vec<_> = walkdir::WalkDir::new(dir)
        .min_depth(1)
        .into_iter()
        .map(|e| {
            let e = e.expect("entry");
            let rel = e.path().strip_prefix(dir).unwrap().to_path_buf();
            let contents = if e.file_type().is_dir() {
                None
            } else {
                Some(fs::read_to_string(e.path()).unwrap())
            };
            (rel, contents)
        })
        .collect();
    out.sort();
    out
}

fn run(dirs: &Dirs, configure: impl FnOnce(&mut JobConfig)) -> Result<backup_engine::TransferResult, EngineError> {
    let mut config = JobConfig::new(&dirs.src, &dirs.dst);
    configure(&mut config);
    let job = create_job(config)?;
    run_job(&job, None, None)
}

#[test]
fn plain_run_mirrors_the_tree() {
    let d = setup();
    sample_tree(&d.src);

    let result = run(&d, |_| {}).expect("run");

    assert_eq!(result.files_transferred, 4);
    assert_eq!(result.directories_created, 3);
    assert_eq!(snapshot(&d.dst), snapshot(&d.src));
}

#[test]
fn dry_run_never_touches_target() {
    for (overwrite, condition) in [
        (false, OverwriteCondition::TargetEmpty),
        (true, OverwriteCondition::TargetEmpty),
        (false, OverwriteCondition::Duplicate),
        (true, OverwriteCondition::RecentlyModified),
    ] {
        let d = setup();
        sample_tree(&d.src);
        if overwrite || condition == OverwriteCondition::Duplicate {
            fs::write(d.dst.join("readme.md"), "existing").unwrap();
        }
        let before = snapshot(&d.dst);

        let result = run(&d, |c| {
            c.dry_run = true;
            c.overwrite = overwrite;
            c.overwrite_condition = condition;
        })
        .expect("dry run");

        assert_eq!(result.files_transferred, 0);
        assert!(result.dry_run);
        assert_eq!(snapshot(&d.dst), before, "{} / {}", overwrite, condition);
    }
}

#[test]
fn ignore_condition_is_idempotent() {
    let d = setup();
    sample_tree(&d.src);

    let first = run(&d, |c| c.overwrite_condition = OverwriteCondition::Ignore).expect("first");
    let after_first = snapshot(&d.dst);
    let second = run(&d, |c| c.overwrite_condition = OverwriteCondition::Ignore).expect("second");

    assert_eq!(first.files_transferred, 4);
    assert_eq!(second.files_transferred, 0);
    assert_eq!(snapshot(&d.dst), after_first);
}

#[test]
fn duplicate_condition_never_overwrites() {
    let d = setup();
    fs::write(d.src.join("name.txt"), "one").unwrap();
    run(&d, |c| c.overwrite_condition = OverwriteCondition::Duplicate).expect("first");

    fs::write(d.src.join("name.txt"), "two").unwrap();
    run(&d, |c| c.overwrite_condition = OverwriteCondition::Duplicate).expect("second");

    fs::write(d.src.join("name.txt"), "three").unwrap();
    let third = run(&d, |c| c.overwrite_condition = OverwriteCondition::Duplicate).expect("third");

    assert_eq!(third.files_transferred, 1);
    assert_eq!(
        snapshot(&d.dst),
        vec![
            (PathBuf::from("name (1).txt"), Some("two".to_string())),
            (PathBuf::from("name (2).txt"), Some("three".to_string())),
            (PathBuf::from("name.txt"), Some("one".to_string())),
        ]
    );
}

#[test]
fn readiness_gate_leaves_target_unchanged() {
    let d = setup();
    sample_tree(&d.src);
    fs::write(d.dst.join("keep.txt"), "keep").unwrap();
    let before = snapshot(&d.dst);

    let err = run(&d, |_| {}).unwrap_err();

    assert!(matches!(err, EngineError::Precondition { .. }));
    assert!(err.to_string().contains("target not empty and overwrite disabled"));
    assert_eq!(snapshot(&d.dst), before);
}

#[test]
fn ignored_directory_is_left_out() {
    let d = setup();
    fs::create_dir(d.src.join("IgnoredDir")).unwrap();
    fs::write(d.src.join("a.txt"), "a").unwrap();
    fs::write(d.src.join("IgnoredDir/b.txt"), "b").unwrap();

    let result = run(&d, |c| c.ignored_directories = vec![PathBuf::from("IgnoredDir")]).expect("run");

    assert_eq!(result.files_transferred, 1);
    assert_eq!(result.ignored_directories, vec![PathBuf::from("IgnoredDir")]);
    assert_eq!(snapshot(&d.dst), vec![(PathBuf::from("a.txt"), Some("a".to_string()))]);
}

#[test]
fn ignored_directory_given_as_source_path() {
    let d = setup();
    fs::create_dir_all(d.src.join("IgnoredDirectory/nested")).unwrap();
    fs::write(d.src.join("a.txt"), "a").unwrap();
    fs::write(d.src.join("IgnoredDirectory/nested/b.txt"), "b").unwrap();
    let ignored = d.src.join("IgnoredDirectory");

    let result = run(&d, |c| c.ignored_directories = vec![ignored.clone()]).expect("run");

    assert_eq!(result.files_transferred, 1);
    assert_eq!(result.ignored_directories, vec![ignored]);
    assert!(!d.dst.join("IgnoredDirectory").exists());
}

#[test]
fn ignored_files_and_extensions() {
    let d = setup();
    sample_tree(&d.src);

    let result = run(&d, |c| {
        c.ignored_files = vec![PathBuf::from("docs/report.txt")];
        c.ignored_ext = vec![".jpg".to_string()];
    })
    .expect("run");

    assert_eq!(result.files_transferred, 2);
    assert_eq!(result.ignored_ext, vec![".jpg".to_string()]);
    assert!(d.dst.join("readme.md").exists());
    assert!(d.dst.join("docs/drafts/v1.txt").exists());
    assert!(!d.dst.join("docs/report.txt").exists());
    assert!(!d.dst.join("photos/cat.jpg").exists());
}

#[test]
fn progress_is_reported_once_per_entry() {
    let d = setup();
    sample_tree(&d.src);

    let seen = std::sync::Mutex::new(Vec::new());
    let record = |index: usize, entry: &SourceEntry, _: &EntryOutcome| {
        seen.lock().unwrap().push((index, entry.relative_path.clone()));
    };

    let job = create_job(JobConfig::new(&d.src, &d.dst)).unwrap();
    run_job(&job, Some(&record), None).expect("run");

    let seen = seen.into_inner().unwrap();
    assert_eq!(seen.len(), 7);
    assert!(seen.iter().enumerate().all(|(i, (index, _))| i == *index));
}

#[test]
fn non_path_source_is_a_configuration_error() {
    let d = setup();
    let toml = format!("source = 123\ntarget = {:?}\n", d.dst.display().to_string());

    let err = JobConfig::from_toml_str(&toml).unwrap_err();
    assert!(matches!(err, EngineError::Configuration { .. }));
}

#[test]
fn pruning_resets_target_between_runs() {
    let d = setup();
    sample_tree(&d.src);
    run(&d, |_| {}).expect("first");

    empty_directory(&d.dst).expect("prune");
    assert!(d.dst.is_dir());

    let again = run(&d, |_| {}).expect("second");
    assert_eq!(again.files_transferred, 4);
}
