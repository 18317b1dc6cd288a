use ck_core::CkError;
use ck_data::{
    data_path, metadata_path, DataContainer, FixedPrompt, OverwritePolicy, WriteOptions,
    WriteOutcome,
};


fn seed_existing(dir: &std::path::Path) -> (Vec<u8>, Vec<u8>) {
    std::fs::write(data_path(dir, "grid"), b"stale table").unwrap();
    std::fs::write(metadata_path(dir, "grid"), b"{}").unwrap();
    (b"stale table".to_vec(), b"{}".to_vec())
}

#[test]
fn raise_leaves_existing_files_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let (table, metadata) = seed_existing(dir.path());
    let err = fixtures::grid_container()
        .write_with_prompt(
            dir.path(),
            "grid",
            WriteOptions::with_policy(OverwritePolicy::Raise),
            &FixedPrompt(true),
        )
        .unwrap_err();
    assert!(matches!(err, CkError::OverwriteConflict(_)));
    assert_eq!(std::fs::read(data_path(dir.path(), "grid")).unwrap(), table);
    assert_eq!(
        std::fs::read(metadata_path(dir.path(), "grid")).unwrap(),
        metadata
    );
}

#[test]
fn declined_prompt_writes_nothing() -> Result<(), CkError> {
    let dir = tempfile::tempdir().unwrap();
    let (table, _) = seed_existing(dir.path());
    let outcome = fixtures::grid_container().write_with_prompt(
        dir.path(),
        "grid",
        WriteOptions::with_policy(OverwritePolicy::Ask),
        &FixedPrompt(false),
    )?;
    assert_eq!(outcome, WriteOutcome::Declined);
    assert_eq!(std::fs::read(data_path(dir.path(), "grid")).unwrap(), table);
    Ok(())
}

#[test]
fn accepted_prompt_and_overwrite_replace_both_files() -> Result<(), CkError> {
    for (policy, answer) in [
        (OverwritePolicy::Ask, true),
        (OverwritePolicy::Overwrite, false),
    ] {
        let dir = tempfile::tempdir().unwrap();
        seed_existing(dir.path());
        let data = fixtures::grid_container();
        data.write_with_prompt(
            dir.path(),
            "grid",
            WriteOptions::with_policy(policy),
            &FixedPrompt(answer),
        )?;
        assert_eq!(DataContainer::from_path_and_name(dir.path(), "grid")?, data);
    }
    Ok(())
}

#[test]
fn a_single_existing_file_is_a_conflict() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(metadata_path(dir.path(), "grid"), b"{}").unwrap();
    let err = fixtures::grid_container()
        .write_with_prompt(
            dir.path(),
            "grid",
            WriteOptions::with_policy(OverwritePolicy::Raise),
            &FixedPrompt(true),
        )
        .unwrap_err();
    assert!(matches!(err, CkError::OverwriteConflict(_)));
    assert!(!data_path(dir.path(), "grid").exists());
}
