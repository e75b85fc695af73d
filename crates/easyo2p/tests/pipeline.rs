//! End-to-end pipeline tests driven from canned catalog result sets.
//!
//! The pipeline runs file-only against a scripted catalog; assertions read
//! the staged script files back from a temporary output directory.

use std::cell::RefCell;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use easyo2p::dispatch::{Dispatcher, Stage};
use easyo2p::{
    Catalog, Config, MigrateError, Orchestrator, Rows, Selection, SqlValue, TargetExec,
};

// =============================================================================
// Scripted catalog
// =============================================================================

struct Route {
    patterns: Vec<&'static str>,
    result: std::result::Result<Rows, String>,
}

/// Catalog stub routing each query to a canned result set by substring match.
/// Unmatched queries return an empty result set.
#[derive(Default)]
struct MockCatalog {
    routes: Vec<Route>,
}

impl MockCatalog {
    fn route(mut self, patterns: &[&'static str], rows: Rows) -> Self {
        self.routes.push(Route {
            patterns: patterns.to_vec(),
            result: Ok(rows),
        });
        self
    }

    fn failing(mut self, patterns: &[&'static str], message: &str) -> Self {
        self.routes.push(Route {
            patterns: patterns.to_vec(),
            result: Err(message.to_string()),
        });
        self
    }
}

impl Catalog for MockCatalog {
    fn query(&mut self, sql: &str) -> easyo2p::Result<Rows> {
        for route in &self.routes {
            if route.patterns.iter().all(|p| sql.contains(p)) {
                return match &route.result {
                    Ok(rows) => Ok(rows.clone()),
                    Err(message) => Err(MigrateError::Catalog(message.clone())),
                };
            }
        }
        Ok(Rows::default())
    }
}

fn text(value: &str) -> SqlValue {
    SqlValue::text(value)
}

fn int(value: i64) -> SqlValue {
    SqlValue::int(value)
}

// =============================================================================
// Fixture: a two-table schema with a sequence, keys, an index and a trigger
// =============================================================================

fn fixture() -> MockCatalog {
    MockCatalog::default()
        .route(
            &["FROM user_tables"],
            Rows::with_columns(
                &["table_name", "tablespace_name"],
                vec![
                    vec![text("DEPT"), text("USERS")],
                    vec![text("EMP"), text("USERS")],
                ],
            ),
        )
        .route(
            &["user_tab_identity_cols"],
            Rows::with_columns(
                &["table_name", "column_name", "sequence_name"],
                vec![vec![text("EMP"), text("ID"), text("ISEQ$$_4711")]],
            ),
        )
        .route(
            &["increment_by"],
            Rows::with_columns(
                &["sequence_name", "increment_by", "last_number"],
                vec![vec![text("EMP_SEQ"), int(1), int(180)]],
            ),
        )
        .route(
            &["user_tab_columns", "table_name = 'DEPT'"],
            Rows::with_columns(
                &[
                    "column_name",
                    "data_type",
                    "data_length",
                    "data_precision",
                    "data_scale",
                    "nullable",
                ],
                vec![
                    vec![
                        text("DEPTNO"),
                        text("NUMBER"),
                        int(22),
                        int(2),
                        SqlValue::Null,
                        text("N"),
                    ],
                    vec![
                        text("DNAME"),
                        text("VARCHAR2"),
                        int(14),
                        SqlValue::Null,
                        SqlValue::Null,
                        text("Y"),
                    ],
                ],
            ),
        )
        .route(
            &["user_tab_columns", "table_name = 'EMP'"],
            Rows::with_columns(
                &[
                    "column_name",
                    "data_type",
                    "data_length",
                    "data_precision",
                    "data_scale",
                    "nullable",
                ],
                vec![
                    vec![
                        text("ID"),
                        text("NUMBER"),
                        int(22),
                        int(4),
                        SqlValue::Null,
                        text("Y"),
                    ],
                    vec![
                        text("NAME"),
                        text("VARCHAR2"),
                        int(30),
                        SqlValue::Null,
                        SqlValue::Null,
                        text("N"),
                    ],
                    vec![
                        text("DEPTNO"),
                        text("NUMBER"),
                        int(22),
                        int(2),
                        SqlValue::Null,
                        text("Y"),
                    ],
                ],
            ),
        )
        .route(
            &["IN ('P','U')", "table_name = 'EMP'"],
            Rows::with_columns(
                &[
                    "constraint_name",
                    "constraint_type",
                    "column_name",
                    "tablespace_name",
                ],
                vec![vec![text("PK_EMP"), text("P"), text("ID"), text("USERS")]],
            ),
        )
        .route(
            &["r_constraint_name", "table_name = 'EMP'"],
            Rows::with_columns(
                &[
                    "constraint_name",
                    "r_table_name",
                    "column_name",
                    "r_column_name",
                    "delete_rule",
                ],
                vec![
                    vec![
                        text("EMP_DEPT_FK"),
                        text("DEPT"),
                        text("DEPTNO"),
                        text("DEPTNO"),
                        text("CASCADE"),
                    ],
                    vec![
                        text("EMP_PROJ_FK"),
                        text("PROJ"),
                        text("PROJNO"),
                        text("PROJNO"),
                        text("NO ACTION"),
                    ],
                ],
            ),
        )
        .route(
            &["user_ind_columns", "table_name = 'EMP'"],
            Rows::with_columns(
                &["index_name", "column_name", "tablespace_name"],
                vec![vec![text("EMP_NAME_IDX"), text("NAME"), text("USERS")]],
            ),
        )
        .route(
            &["FROM EMP"],
            Rows::with_columns(
                &["id", "name", "deptno"],
                vec![
                    vec![int(1), text("King"), int(10)],
                    vec![int(2), text("O'Brien"), SqlValue::Null],
                ],
            ),
        )
        .route(
            &["FROM DEPT"],
            Rows::with_columns(
                &["deptno", "dname"],
                vec![vec![int(10), text("ACCOUNTING")]],
            ),
        )
        .route(
            &["user_triggers"],
            Rows::with_columns(
                &[
                    "table_name",
                    "trigger_name",
                    "trigger_type",
                    "triggering_event",
                    "when_clause",
                ],
                vec![vec![
                    text("EMP"),
                    text("EMP_AUDIT"),
                    text("BEFORE EACH ROW"),
                    text("INSERT OR UPDATE"),
                    SqlValue::Null,
                ]],
            ),
        )
        .route(
            &["user_source", "'EMP_AUDIT'"],
            Rows::with_columns(
                &["text"],
                [
                    "TRIGGER EMP_AUDIT",
                    "BEFORE INSERT OR UPDATE ON EMP",
                    "FOR EACH ROW",
                    "BEGIN",
                    "  IF INSERTING THEN",
                    "    :NEW.NAME := UPPER(:NEW.NAME);",
                    "  END IF;",
                    "END;",
                ]
                .iter()
                .map(|line| vec![text(line)])
                .collect(),
            ),
        )
}

fn base_config(out: &Path) -> Config {
    let mut config = Config::default();
    config.source.username = "scott".to_string();
    config.source.password = "tiger".to_string();
    config.source.connect = "//localhost:1521/XEPDB1".to_string();
    config.target.schema = "HR".to_string();
    config.migration.migrate = false;
    config.migration.sequences = Selection::Explicit(vec!["EMP_SEQ EMP.ID".to_string()]);
    config.output.path = Some(out.to_path_buf());
    config
}

fn run_pipeline(config: Config, catalog: MockCatalog) -> Orchestrator {
    let mut orchestrator = Orchestrator::with_catalog(config, Box::new(catalog)).unwrap();
    orchestrator.run().unwrap();
    orchestrator.create_run_script().unwrap();
    orchestrator
}

fn read(out: &Path, name: &str) -> String {
    std::fs::read_to_string(out.join(name))
        .unwrap_or_else(|e| panic!("missing staged file {}: {}", name, e))
}

// =============================================================================
// End-to-end scenarios
// =============================================================================

#[test]
fn emp_schema_end_to_end() {
    let tmp = tempfile::tempdir().unwrap();
    let out = tmp.path().join("out");
    run_pipeline(base_config(&out), fixture());

    let sequences = read(&out, "sequences.2.sql");
    assert!(sequences.contains("\\echo Creating Sequences"));
    assert!(sequences.contains("CREATE SEQUENCE HR.EMP_SEQ INCREMENT 1 START 181;"));

    let table = read(&out, "EMP.3.sql");
    assert!(table.contains("CREATE TABLE HR.EMP"));
    assert!(table.contains("SMALLINT CHECK (ID < 10000)"));
    assert!(table.contains("DEFAULT NEXTVAL('HR.EMP_SEQ')"));
    assert!(table.contains("VARCHAR(30) NOT NULL"));
    assert!(table.contains("ALTER TABLE HR.EMP ADD CONSTRAINT PK_EMP PRIMARY KEY (ID)"));

    let data = read(&out, "EMP.4.sql");
    assert!(data.contains("INSERT INTO HR.EMP(ID,NAME,DEPTNO) VALUES"));
    assert!(data.contains("(1,'King',10)"));
    assert!(data.contains("(2,'O''Brien',NULL)"));

    let post = read(&out, "EMP.5.sql");
    assert!(post.contains(
        "ALTER TABLE HR.EMP ADD CONSTRAINT EMP_DEPT_FK FOREIGN KEY (DEPTNO) \
         REFERENCES HR.DEPT (DEPTNO) ON DELETE CASCADE;"
    ));
    assert!(post.contains("CREATE INDEX EMP_NAME_IDX ON HR.EMP(NAME)"));
    // The referenced table of the second constraint is out of scope.
    assert!(!post.contains("EMP_PROJ_FK"));
}

#[test]
fn run_script_sources_stages_in_order() {
    let tmp = tempfile::tempdir().unwrap();
    let out = tmp.path().join("out");
    run_pipeline(base_config(&out), fixture());

    let script = read(&out, "_run_.sql");
    let sequences = script.find("\\ir sequences.2.sql").unwrap();
    let dept_table = script.find("\\ir DEPT.3.sql").unwrap();
    let emp_table = script.find("\\ir EMP.3.sql").unwrap();
    let emp_data = script.find("\\ir EMP.4.sql").unwrap();
    let emp_post = script.find("\\ir EMP.5.sql").unwrap();

    assert!(sequences < dept_table);
    assert!(dept_table < emp_table);
    assert!(emp_table < emp_data);
    assert!(emp_data < emp_post);
    assert!(script.contains("DROP SCHEMA IF EXISTS HR CASCADE"));
}

#[test]
fn dry_run_is_byte_identical() {
    let tmp = tempfile::tempdir().unwrap();
    let out1 = tmp.path().join("out1");
    let out2 = tmp.path().join("out2");
    run_pipeline(base_config(&out1), fixture());
    run_pipeline(base_config(&out2), fixture());

    let mut names: Vec<String> = std::fs::read_dir(&out1)
        .unwrap()
        .map(|e| e.unwrap().file_name().into_string().unwrap())
        .filter(|n| n.ends_with(".sql") && n != "_run_.sql")
        .collect();
    names.sort();
    assert!(!names.is_empty());

    for name in names {
        assert_eq!(
            std::fs::read(out1.join(&name)).unwrap(),
            std::fs::read(out2.join(&name)).unwrap(),
            "file {} differs between runs",
            name
        );
    }
}

// =============================================================================
// Identifier policy properties
// =============================================================================

#[test]
fn renamed_identifiers_replace_source_names() {
    let tmp = tempfile::tempdir().unwrap();
    let out = tmp.path().join("out");
    let mut config = base_config(&out);
    config.migration.rename = vec![
        "TABLE EMP STAFF".to_string(),
        "COLUMN EMP.NAME LAST_NAME".to_string(),
        "SEQUENCE EMP_SEQ STAFF_SEQ".to_string(),
        "CONSTRAINT PK_EMP PK_STAFF".to_string(),
        "INDEX EMP_NAME_IDX STAFF_NAME_IDX".to_string(),
    ];
    run_pipeline(config, fixture());

    let sequences = read(&out, "sequences.2.sql");
    assert!(sequences.contains("CREATE SEQUENCE HR.STAFF_SEQ"));
    assert!(!sequences.contains("EMP_SEQ"));

    let table = read(&out, "STAFF.3.sql");
    assert!(table.contains("CREATE TABLE HR.STAFF"));
    assert!(table.contains("LAST_NAME"));
    assert!(table.contains("DEFAULT NEXTVAL('HR.STAFF_SEQ')"));
    assert!(table.contains("ADD CONSTRAINT PK_STAFF PRIMARY KEY"));
    assert!(!table.contains("HR.EMP"));
    assert!(!table.contains(" NAME "));

    let data = read(&out, "STAFF.4.sql");
    assert!(data.contains("INSERT INTO HR.STAFF(ID,LAST_NAME,DEPTNO)"));

    let post = read(&out, "STAFF.5.sql");
    assert!(post.contains("CREATE INDEX STAFF_NAME_IDX ON HR.STAFF(LAST_NAME)"));
    assert!(!post.contains("EMP_NAME_IDX"));
}

#[test]
fn excluded_objects_never_appear() {
    let tmp = tempfile::tempdir().unwrap();
    let out = tmp.path().join("out");
    let mut config = base_config(&out);
    config.migration.exclude = vec![
        "COLUMN EMP.DEPTNO".to_string(),
        "INDEX EMP_NAME_IDX".to_string(),
    ];
    run_pipeline(config, fixture());

    let table = read(&out, "EMP.3.sql");
    assert!(!table.contains("DEPTNO"));

    let data = read(&out, "EMP.4.sql");
    assert!(data.contains("INSERT INTO HR.EMP(ID,NAME) VALUES"));
    assert!(!data.contains("DEPTNO"));

    let post = read(&out, "EMP.5.sql");
    // The foreign key references the excluded column, so it vanishes too.
    assert!(!post.contains("EMP_DEPT_FK"));
    assert!(!post.contains("EMP_NAME_IDX"));
}

#[test]
fn excluded_sequence_leaves_no_trace() {
    let tmp = tempfile::tempdir().unwrap();
    let out = tmp.path().join("out");
    let mut config = base_config(&out);
    config.migration.exclude = vec![
        "SEQUENCE EMP_SEQ".to_string(),
        "SEQUENCE ISEQ$$_4711".to_string(),
    ];
    run_pipeline(config, fixture());

    // Nothing in scope, so the sequence stage never opens a file, and the
    // column default that would have referenced the sequence is gone too.
    assert!(!out.join("sequences.2.sql").exists());
    let table = read(&out, "EMP.3.sql");
    assert!(!table.contains("EMP_SEQ"));
    assert!(!table.contains("NEXTVAL"));
}

#[test]
fn excluded_table_is_skipped_entirely() {
    let tmp = tempfile::tempdir().unwrap();
    let out = tmp.path().join("out");
    let mut config = base_config(&out);
    config.migration.exclude = vec!["TABLE DEPT".to_string()];
    run_pipeline(config, fixture());

    assert!(!out.join("DEPT.3.sql").exists());
    // DEPT is no longer in scope, so the foreign key toward it is dropped.
    let post = read(&out, "EMP.5.sql");
    assert!(!post.contains("EMP_DEPT_FK"));
}

// =============================================================================
// Grouping and sequence-binding rules
// =============================================================================

#[test]
fn single_row_groups_still_emit_one_statement() {
    let tmp = tempfile::tempdir().unwrap();
    let out = tmp.path().join("out");
    run_pipeline(base_config(&out), fixture());

    // Both result sets hold exactly one row; the trailing group must flush.
    let table = read(&out, "EMP.3.sql");
    assert_eq!(table.matches("ADD CONSTRAINT PK_EMP").count(), 1);
    let post = read(&out, "EMP.5.sql");
    assert_eq!(post.matches("CREATE INDEX EMP_NAME_IDX").count(), 1);
}

#[test]
fn identity_binding_never_overrides_explicit_one() {
    let tmp = tempfile::tempdir().unwrap();
    let out = tmp.path().join("out");
    // The identity view binds EMP.ID to ISEQ$$_4711, but the explicit
    // configuration binding to EMP_SEQ must win.
    run_pipeline(base_config(&out), fixture());

    let table = read(&out, "EMP.3.sql");
    assert!(table.contains("DEFAULT NEXTVAL('HR.EMP_SEQ')"));
    assert!(!table.contains("ISEQ$$_4711"));
}

#[test]
fn missing_identity_view_is_tolerated() {
    let tmp = tempfile::tempdir().unwrap();
    let out = tmp.path().join("out");
    let catalog = MockCatalog::default()
        .failing(&["user_tab_identity_cols"], "ORA-00942: table or view does not exist")
        .route(
            &["FROM user_tables"],
            Rows::with_columns(
                &["table_name", "tablespace_name"],
                vec![vec![text("EMP"), text("USERS")]],
            ),
        )
        .route(
            &["increment_by"],
            Rows::with_columns(
                &["sequence_name", "increment_by", "last_number"],
                vec![vec![text("EMP_SEQ"), int(1), int(180)]],
            ),
        )
        .route(
            &["user_tab_columns", "table_name = 'EMP'"],
            Rows::with_columns(
                &[
                    "column_name",
                    "data_type",
                    "data_length",
                    "data_precision",
                    "data_scale",
                    "nullable",
                ],
                vec![vec![
                    text("ID"),
                    text("NUMBER"),
                    int(22),
                    int(4),
                    SqlValue::Null,
                    text("Y"),
                ]],
            ),
        );

    run_pipeline(base_config(&out), catalog);
    assert!(read(&out, "EMP.3.sql").contains("CREATE TABLE HR.EMP"));
}

// =============================================================================
// Triggers
// =============================================================================

#[test]
fn trigger_function_precedes_binding() {
    let tmp = tempfile::tempdir().unwrap();
    let out = tmp.path().join("out");
    let mut config = base_config(&out);
    config.migration.triggers = Selection::All;
    run_pipeline(config, fixture());

    let post = read(&out, "EMP.5.sql");
    let function = post.find("CREATE FUNCTION HR.EMP_AUDIT_TF()").unwrap();
    let binding = post.find("CREATE TRIGGER EMP_AUDIT").unwrap();
    assert!(function < binding);

    assert!(post.contains("IF TG_OP = 'INSERT' THEN"));
    assert!(post.contains("NEW.NAME := UPPER(NEW.NAME);"));
    assert!(post.contains("  RETURN NEW; \nEND;"));
    assert!(post.contains("BEFORE INSERT OR UPDATE"));
    assert!(post.contains("ON HR.EMP FOR EACH ROW"));
    assert!(post.contains("EXECUTE PROCEDURE HR.EMP_AUDIT_TF();"));
}

#[test]
fn triggers_are_absent_unless_enabled() {
    let tmp = tempfile::tempdir().unwrap();
    let out = tmp.path().join("out");
    run_pipeline(base_config(&out), fixture());
    assert!(!read(&out, "EMP.5.sql").contains("CREATE TRIGGER"));
}

// =============================================================================
// Dispatcher fan-out
// =============================================================================

struct FailingTarget {
    executed: Rc<RefCell<Vec<String>>>,
}

impl TargetExec for FailingTarget {
    fn execute(&mut self, statement: &str) -> easyo2p::Result<()> {
        self.executed.borrow_mut().push(statement.to_string());
        Err(MigrateError::Catalog("connection lost".to_string()))
    }
}

#[test]
fn file_write_precedes_live_execution_failure() {
    let tmp = tempfile::tempdir().unwrap();
    let out = tmp.path().join("out");
    let config = base_config(&out);

    let executed = Rc::new(RefCell::new(Vec::new()));
    let mut dispatcher = Dispatcher::new(&config).unwrap();
    dispatcher.advance(Stage::Etl).unwrap();
    dispatcher.attach_targets(Box::new(FailingTarget {
        executed: executed.clone(),
    }));

    dispatcher.set_file("emp.3.sql", "EMP Table").unwrap();
    let err = dispatcher
        .dispatch("CREATE TABLE %%schema%%.EMP (ID SMALLINT);")
        .unwrap_err();
    assert!(matches!(err, MigrateError::Catalog(_)));
    dispatcher.close_file().unwrap();

    // The statement reached the file before the live failure aborted the run.
    let staged = read(&out, "emp.3.sql");
    assert!(staged.contains("CREATE TABLE HR.EMP (ID SMALLINT);"));
    assert_eq!(executed.borrow().len(), 1);
    assert!(executed.borrow()[0].contains("HR.EMP"));
}

// =============================================================================
// Output directory ownership
// =============================================================================

#[test]
fn existing_output_directory_is_refused() {
    let tmp = tempfile::tempdir().unwrap();
    let out: PathBuf = tmp.path().join("out");
    std::fs::create_dir_all(&out).unwrap();

    let err = Orchestrator::with_catalog(base_config(&out), Box::new(fixture()))
        .err()
        .expect("reused output directory must be refused");
    assert!(matches!(err, MigrateError::Config(_)));
    assert!(err.to_string().contains("Target path exists"));
}

#[test]
fn run_script_requires_completed_etl() {
    let tmp = tempfile::tempdir().unwrap();
    let out = tmp.path().join("out");
    let mut orchestrator =
        Orchestrator::with_catalog(base_config(&out), Box::new(fixture())).unwrap();
    let err = orchestrator.create_run_script().unwrap_err();
    assert!(matches!(err, MigrateError::Stage(_)));
}
