// Engine command dispatch over local files and the SQLite registry

use filechain_core::{ExErrorKind, Value};
use filechain_engine::config::{FilechainConfig, StoreSection};
use filechain_engine::{apply_engine_command, EngineCommand, EngineCommandResult, Session};
use std::fs;
use tempfile::TempDir;

fn setup() -> (TempDir, Session) {
    let work = TempDir::new().unwrap();
    let data = work.path().join("notes");
    fs::create_dir_all(data.join("2024")).unwrap();
    fs::write(data.join("alpha.txt"), "first para\n\nsecond para").unwrap();
    fs::write(data.join("2024/beta.txt"), "only para").unwrap();
    fs::write(data.join("image.png"), [0u8, 1, 2]).unwrap();

    let config = FilechainConfig {
        store: StoreSection {
            db_path: work.path().join("registry.db"),
            cas_path: work.path().join("cas"),
        },
        ..FilechainConfig::default()
    };
    let session = Session::open(&config).unwrap();
    (work, session)
}

fn notes(work: &TempDir) -> String {
    work.path().join("notes").to_str().unwrap().to_string()
}

#[test]
fn test_list_files_with_glob() {
    let (work, session) = setup();
    let result = apply_engine_command(
        EngineCommand::ListFiles {
            location: notes(&work),
            glob: Some("*.txt".to_string()),
        },
        &session,
    )
    .unwrap();

    let EngineCommandResult::Files(files) = result else {
        panic!("expected Files");
    };
    let paths: Vec<_> = files.iter().map(|f| f.path.as_str()).collect();
    assert_eq!(paths, vec!["2024/beta.txt", "alpha.txt"]);
}

#[test]
fn test_ingest_then_show() {
    let (work, session) = setup();
    let result = apply_engine_command(
        EngineCommand::Ingest {
            location: notes(&work),
            glob: Some("*.txt".to_string()),
            dataset: "notes".to_string(),
            chunk_size: 12,
        },
        &session,
    )
    .unwrap();

    let EngineCommandResult::Saved(info) = result else {
        panic!("expected Saved");
    };
    assert_eq!(info.version, 1);
    // alpha: "first para" / "second para" do not fit together in 12 chars.
    assert_eq!(info.row_count, 3);

    let EngineCommandResult::Loaded(entry) = apply_engine_command(
        EngineCommand::Load {
            dataset: "notes".to_string(),
            version: None,
        },
        &session,
    )
    .unwrap() else {
        panic!("expected Loaded");
    };
    let alpha: Vec<_> = entry
        .snapshot
        .rows()
        .iter()
        .filter(|r| r.get("key") == Some(&Value::from("alpha")))
        .map(|r| r.get("text").and_then(Value::as_str).unwrap().to_string())
        .collect();
    assert_eq!(alpha, vec!["first para", "second para"]);

    let EngineCommandResult::Table(table) = apply_engine_command(
        EngineCommand::Show {
            dataset: "notes".to_string(),
            version: Some(1),
            limit: 10,
        },
        &session,
    )
    .unwrap() else {
        panic!("expected Table");
    };
    assert!(table.contains("| key | chunk_index | text | source_path |"));
}

#[test]
fn test_list_files_error_carries_request_id() {
    let (_work, session) = setup();
    let err = apply_engine_command(
        EngineCommand::ListFiles {
            location: "mem://notes".to_string(),
            glob: None,
        },
        &session,
    )
    .unwrap_err();
    assert_eq!(err.kind(), ExErrorKind::InvalidInput);
    assert!(err.request_id().is_some());
}

#[test]
fn test_listing_commands() {
    let (work, session) = setup();
    for _ in 0..2 {
        apply_engine_command(
            EngineCommand::Ingest {
                location: notes(&work),
                glob: None,
                dataset: "all".to_string(),
                chunk_size: 1000,
            },
            &session,
        )
        .unwrap();
    }

    let EngineCommandResult::Datasets(datasets) =
        apply_engine_command(EngineCommand::ListDatasets, &session).unwrap()
    else {
        panic!("expected Datasets");
    };
    assert_eq!(datasets.len(), 1);
    assert_eq!(datasets[0].latest_version, 2);

    let EngineCommandResult::Versions(versions) = apply_engine_command(
        EngineCommand::ListVersions {
            dataset: "all".to_string(),
        },
        &session,
    )
    .unwrap() else {
        panic!("expected Versions");
    };
    assert_eq!(versions.iter().map(|v| v.version).collect::<Vec<_>>(), vec![1, 2]);
}

#[test]
fn test_missing_version_is_classified() {
    let (_work, session) = setup();
    let err = apply_engine_command(
        EngineCommand::Show {
            dataset: "ghost".to_string(),
            version: Some(3),
            limit: 5,
        },
        &session,
    )
    .unwrap_err();
    assert_eq!(err.kind(), ExErrorKind::DatasetNotFound);
}
