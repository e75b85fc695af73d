//! Migration orchestrator: sequences the generators through the staged
//! pipeline and owns all mutable run state.

mod plan;
mod run_script;

pub use plan::{Plan, TriggerDescriptor};
pub use run_script::RUN_SCRIPT;

use std::path::{Path, PathBuf};

use encoding_rs::Encoding;

use crate::config::Config;
use crate::dispatch::{
    Dispatcher, Stage, STAGE_DATA, STAGE_POST_TABLE, STAGE_SEQUENCES, STAGE_TABLES,
};
use crate::error::{MigrateError, Result};
use crate::generators;
use crate::plsql::SubstitutionTable;
use crate::policy::{IdentifierPolicy, ObjectKind};
use crate::source::{Catalog, OracleCatalog};
use crate::target::PgSessions;

/// Coordinates one migration run.
///
/// Construction is the PRE stage: configuration is validated and the output
/// directory claimed, but nothing is read from the source. `run()` performs
/// the ETL stage and leaves the orchestrator in POST, where the run script
/// can be assembled and further ad-hoc statements dispatched.
pub struct Orchestrator {
    config: Config,
    policy: IdentifierPolicy,
    substitutions: SubstitutionTable,
    encoding: &'static Encoding,
    dispatcher: Dispatcher,
    catalog: Option<Box<dyn Catalog>>,
    plan: Option<Plan>,
}

impl Orchestrator {
    /// Create an orchestrator that connects to Oracle when the ETL starts.
    pub fn new(config: Config) -> Result<Self> {
        Self::init(config, None)
    }

    /// Create an orchestrator over a caller-supplied catalog.
    ///
    /// Used for driving the pipeline from canned result sets, or any other
    /// [`Catalog`] implementation.
    pub fn with_catalog(config: Config, catalog: Box<dyn Catalog>) -> Result<Self> {
        Self::init(config, Some(catalog))
    }

    fn init(config: Config, catalog: Option<Box<dyn Catalog>>) -> Result<Self> {
        config.validate()?;
        let policy = IdentifierPolicy::from_config(&config)?;
        let substitutions =
            SubstitutionTable::with_overrides(&config.migration.plsql_substitutions);
        let encoding = Encoding::for_label(config.output.encoding.as_bytes())
            .ok_or_else(|| {
                MigrateError::config(format!(
                    "unknown output encoding '{}'",
                    config.output.encoding
                ))
            })?;
        let dispatcher = Dispatcher::new(&config)?;

        Ok(Self {
            config,
            policy,
            substitutions,
            encoding,
            dispatcher,
            catalog,
            plan: None,
        })
    }

    /// The configuration this run operates under.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The output directory, when file output is enabled.
    pub fn target_path(&self) -> Option<&Path> {
        self.dispatcher.target_path()
    }

    /// The resolved migration plan; available once the ETL has run.
    pub fn plan(&self) -> Option<&Plan> {
        self.plan.as_ref()
    }

    /// Run the ETL: freeze the plan, establish connections and drive every
    /// generator in dependency order.
    pub fn run(&mut self) -> Result<()> {
        if self.dispatcher.stage() != Stage::Pre {
            return Err(MigrateError::Stage(
                "the ETL has already been performed".to_string(),
            ));
        }
        self.dispatcher.advance(Stage::Etl)?;

        let mut catalog: Box<dyn Catalog> = match self.catalog.take() {
            Some(catalog) => catalog,
            None => Box::new(OracleCatalog::connect(&self.config.source)?),
        };

        if self.config.migration.migrate {
            let sessions =
                PgSessions::connect(&self.config.target, self.config.migration.drop_schema)?;
            self.dispatcher.attach_targets(Box::new(sessions));
        }

        let plan = plan::build(catalog.as_mut(), &self.config, &self.policy)?;

        let result = self.run_stages(catalog.as_mut(), &plan);

        self.catalog = Some(catalog);
        self.plan = Some(plan);
        result?;

        self.dispatcher.advance(Stage::Post)?;
        Ok(())
    }

    fn run_stages(&mut self, catalog: &mut dyn Catalog, plan: &Plan) -> Result<()> {
        // Sequences first: table column defaults reference them.
        if !plan.sequences.is_empty() {
            self.dispatcher
                .set_file(&format!("sequences.{}.sql", STAGE_SEQUENCES), "Creating Sequences")?;
            generators::sequences::generate(catalog, &self.policy, plan, &mut self.dispatcher)?;
            self.dispatcher.close_file()?;
        }

        // Tables and their data, before anything that references them.
        for table in &plan.tables {
            let target_table = self.policy.resolve(ObjectKind::Table, table);

            self.dispatcher.set_file(
                &format!("{}.{}.sql", target_table, STAGE_TABLES),
                &format!("{} Table", target_table),
            )?;
            let columns = generators::tables::generate(
                catalog,
                &self.config,
                &self.policy,
                plan,
                &mut self.dispatcher,
                table,
            )?;

            if self.config.migration.data {
                self.dispatcher.set_file(
                    &format!("{}.{}.sql", target_table, STAGE_DATA),
                    &format!("{} Data", target_table),
                )?;
                generators::data::generate(
                    catalog,
                    &self.config,
                    &self.policy,
                    &mut self.dispatcher,
                    table,
                    &columns,
                )?;
            }
        }

        // Foreign keys, indexes, triggers: everything they reference exists.
        for table in &plan.tables {
            let target_table = self.policy.resolve(ObjectKind::Table, table);
            let file = format!("{}.{}.sql", target_table, STAGE_POST_TABLE);

            if self.config.migration.constraints {
                self.dispatcher
                    .set_file(&file, &format!("{} Foreign Keys", target_table))?;
                generators::foreign_keys::generate(
                    catalog,
                    &self.policy,
                    plan,
                    &mut self.dispatcher,
                    table,
                )?;

                self.dispatcher
                    .set_file(&file, &format!("{} Indexes", target_table))?;
                generators::indexes::generate(catalog, &self.policy, &mut self.dispatcher, table)?;
            }

            if plan.triggers_enabled {
                self.dispatcher
                    .set_file(&file, &format!("{} Triggers", target_table))?;
                generators::triggers::generate(
                    catalog,
                    &self.policy,
                    &self.substitutions,
                    plan,
                    &mut self.dispatcher,
                    table,
                )?;
            }
        }

        self.dispatcher.close_file()
    }

    /// Assemble `_run_.sql` from the staged files. Only available once the
    /// ETL has completed.
    pub fn create_run_script(&mut self) -> Result<Option<PathBuf>> {
        if self.dispatcher.stage() != Stage::Post {
            return Err(MigrateError::Stage(
                "unable to create run script until the ETL has been performed".to_string(),
            ));
        }

        let Some(target_path) = self.dispatcher.target_path().map(Path::to_path_buf) else {
            return Ok(None);
        };

        let path = run_script::assemble(&self.config, &target_path, self.encoding)?;
        self.dispatcher
            .log(&format!("Run: \\i '{}'", path.display().to_string().replace('\\', "/")));
        Ok(Some(path))
    }

    /// Dispatch an ad-hoc statement around the ETL phase.
    ///
    /// Outside the ETL the statement lands in its own numbered staged file
    /// named after `label`, ordered before (PRE) or after (POST) the
    /// generated artifacts.
    pub fn execute_sql(&mut self, statement: &str, label: &str) -> Result<()> {
        if self.dispatcher.stage() != Stage::Etl {
            let label = if label.is_empty() { "postgresql_cmd" } else { label };
            let name = Path::new(label)
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or(label)
                .to_string();
            self.dispatcher
                .set_file(label, &format!("PostgreSQL Cmd: {}", name))?;
        }
        self.dispatcher.dispatch(statement)
    }

    /// Read a SQL file and dispatch its content as one command.
    ///
    /// Lines starting with `REM ` are dropped and `%%key%%` markers are
    /// replaced from `params` (the schema placeholder is handled by the
    /// dispatcher as usual).
    pub fn execute_sql_file(&mut self, path: &Path, params: &[(&str, &str)]) -> Result<()> {
        let statement = self.read_sql_file(path, params)?;
        self.execute_sql(&statement, &path.display().to_string())
    }

    /// Read a SQL file in the configured encoding, stripping `REM ` comment
    /// lines and substituting `%%key%%` parameters.
    pub fn read_sql_file(&self, path: &Path, params: &[(&str, &str)]) -> Result<String> {
        let bytes = std::fs::read(path)?;
        let (content, _, _) = self.encoding.decode(&bytes);

        let mut text = content
            .lines()
            .filter(|line| !line.to_uppercase().starts_with("REM "))
            .map(str::trim_end)
            .collect::<Vec<_>>()
            .join("\n");

        for (key, value) in params {
            text = text.replace(&format!("%%{}%%", key), value);
        }

        Ok(text)
    }
}
