use tempfile::TempDir;

use super::*;
use crate::config::Config;
use crate::recovery::{RecoveryManager, TxnState};

fn setup_test_env() -> (TempDir, Config, Session) {
    let temp_dir = TempDir::new().unwrap();
    let config = Config {
        data_dir: temp_dir.path().to_path_buf(),
        ..Config::default()
    };
    let session = open_session(&config);
    (temp_dir, config, session)
}

fn open_session(config: &Config) -> Session {
    let storage = config.open_storage().unwrap();
    let recovery = RecoveryManager::new(config.open_log().unwrap()).unwrap();
    Session::new(storage, recovery)
}

fn run_all(session: &mut Session, lines: &[&str]) {
    for line in lines {
        session.run(line).unwrap();
    }
}

fn rows(output: Output) -> Vec<Vec<String>> {
    match output {
        Output::Table { rows, .. } => rows,
        other => panic!("expected a table, got {:?}", other),
    }
}

fn seed(session: &mut Session) {
    run_all(
        session,
        &[
            "column hoge int",
            "column fuga int",
            "column piyo int",
            "insert 2, -13, 89",
            "insert 10000, 4, 44",
            "insert 500, 5, 90",
            "insert 10, 45, -999",
            "flush",
        ],
    );
}

#[test]
fn test_select_in_key_order() {
    let (_temp_dir, _config, mut session) = setup_test_env();
    seed(&mut session);

    let output = session.run("select hoge, piyo").unwrap();
    assert_eq!(
        rows(output),
        vec![
            vec!["2", "89"],
            vec!["10", "-999"],
            vec!["500", "90"],
            vec!["10000", "44"],
        ]
    );

    let output = session.run("select *").unwrap();
    match output {
        Output::Table { header, rows } => {
            assert_eq!(header, vec!["hoge", "fuga", "piyo"]);
            assert_eq!(rows.len(), 4);
        }
        other => panic!("expected a table, got {:?}", other),
    }
}

#[test]
fn test_find() {
    let (_temp_dir, _config, mut session) = setup_test_env();
    seed(&mut session);

    assert_eq!(
        rows(session.run("find 500").unwrap()),
        vec![vec!["500", "5", "90"]]
    );
    assert!(rows(session.run("find 7").unwrap()).is_empty());
}

#[test]
fn test_insert_errors() {
    let (_temp_dir, _config, mut session) = setup_test_env();
    assert!(matches!(
        session.run("insert 1"),
        Err(CommandError::EmptySchema)
    ));

    seed(&mut session);
    assert!(matches!(
        session.run("insert 1, 2"),
        Err(CommandError::ArityMismatch {
            expected: 3,
            actual: 2
        })
    ));
    assert!(matches!(
        session.run("insert 1, two, 3"),
        Err(CommandError::Record(_))
    ));
    assert!(matches!(
        session.run("insert 2, 0, 0"),
        Err(CommandError::Storage(_))
    ));
    assert!(matches!(
        session.run("column late int"),
        Err(CommandError::Storage(_))
    ));
}

#[test]
fn test_autocommit_update_is_logged() {
    let (_temp_dir, _config, mut session) = setup_test_env();
    seed(&mut session);

    session.run("update 500 set fuga = 33").unwrap();
    assert!(session.current_transaction().is_none());
    assert_eq!(session.recovery().log_manager().flushed_lsn(), 3);

    let output = session.run("recover").unwrap();
    assert!(matches!(output, Output::Message(_)));
    assert_eq!(
        rows(session.run("find 500").unwrap()),
        vec![vec!["500", "33", "90"]]
    );
}

#[test]
fn test_transaction_commands() {
    let (_temp_dir, _config, mut session) = setup_test_env();
    seed(&mut session);

    assert!(matches!(
        session.run("commit"),
        Err(CommandError::NoTransaction)
    ));

    session.run("begin").unwrap();
    let txn = session.current_transaction().unwrap();
    assert!(matches!(
        session.run("begin"),
        Err(CommandError::TransactionActive(_))
    ));
    assert!(matches!(
        session.run("recover"),
        Err(CommandError::TransactionActive(_))
    ));

    run_all(
        &mut session,
        &["update 2 set fuga = 3337", "update 10 set piyo = 1"],
    );
    session.run("commit").unwrap();
    assert_eq!(
        session.recovery().state(&txn),
        Some(TxnState::Committed)
    );

    session.run("begin").unwrap();
    session.run("update 2 set fuga = 99").unwrap();
    session.run("abort").unwrap();

    // Aborted changes linger in memory until the pages are dropped
    assert_eq!(
        rows(session.run("find 2").unwrap()),
        vec![vec!["2", "99", "89"]]
    );
    session.run("recover").unwrap();
    assert_eq!(
        rows(session.run("select hoge, fuga, piyo").unwrap())[..2],
        [vec!["2", "3337", "89"], vec!["10", "45", "1"]]
    );
}

#[test]
fn test_update_errors() {
    let (_temp_dir, _config, mut session) = setup_test_env();
    seed(&mut session);

    assert!(matches!(
        session.run("update 500 set hoge = 1"),
        Err(CommandError::Recovery(_))
    ));
    assert!(matches!(
        session.run("update 500 set nope = 1"),
        Err(CommandError::Record(_))
    ));
    assert!(matches!(
        session.run("update 7 set fuga = 1"),
        Err(CommandError::Recovery(_))
    ));
    assert!(session.current_transaction().is_none());
}

#[test]
fn test_reopen_and_recover() {
    let (_temp_dir, config, mut session) = setup_test_env();
    seed(&mut session);

    run_all(
        &mut session,
        &["begin", "update 10000 set piyo = 4447", "commit"],
    );
    run_all(&mut session, &["begin", "update 10000 set piyo = 66"]);
    drop(session);

    let mut session = open_session(&config);
    assert_eq!(
        rows(session.run("find 10000").unwrap()),
        vec![vec!["10000", "4", "44"]]
    );
    session.run("recover").unwrap();
    assert_eq!(
        rows(session.run("find 10000").unwrap()),
        vec![vec!["10000", "4", "4447"]]
    );
}

#[test]
fn test_load_csv() {
    let (temp_dir, _config, mut session) = setup_test_env();
    run_all(
        &mut session,
        &["column country char(16)", "column population int"],
    );

    let path = temp_dir.path().join("countries.csv");
    std::fs::write(&path, "Japan, 125\nBrazil, 214\nNigeria, 213\n").unwrap();
    let output = session
        .run(&format!("load '{}'", path.display()))
        .unwrap();
    assert_eq!(output, Output::Message("3 row(s) loaded".to_string()));

    assert_eq!(
        rows(session.run("select country").unwrap()),
        vec![vec!["Brazil"], vec!["Japan"], vec!["Nigeria"]]
    );
    assert_eq!(
        rows(session.run("find Japan").unwrap()),
        vec![vec!["Japan", "125"]]
    );

    assert!(matches!(
        session.run("load 'missing.csv'"),
        Err(CommandError::Csv(_))
    ));
}

#[test]
fn test_schema_and_display() {
    let (_temp_dir, _config, mut session) = setup_test_env();
    seed(&mut session);

    let output = session.run("schema").unwrap();
    assert_eq!(
        rows(output.clone()),
        vec![
            vec!["hoge", "INT"],
            vec!["fuga", "INT"],
            vec!["piyo", "INT"],
        ]
    );
    let rendered = output.to_string();
    assert!(rendered.contains("hoge"));
    assert!(rendered.ends_with("3 row(s)"));

    assert_eq!(session.run("exit").unwrap(), Output::Exit);
}
