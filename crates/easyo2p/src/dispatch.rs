//! Command dispatcher: fans generated statements out to staged script files
//! and live target sessions.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use encoding_rs::Encoding;
use tracing::info;

use crate::config::Config;
use crate::error::{MigrateError, Result};
use crate::target::TargetExec;

/// Literal placeholder generators embed instead of the target schema name,
/// substituted on dispatch so the generators stay schema-agnostic.
pub const SCHEMA_PLACEHOLDER: &str = "%%schema%%";

/// Run log artifact written alongside the staged files.
pub const LOG_FILE: &str = "_easyo2p_.log";

/// Staged-file suffix for the sequence scripts.
pub const STAGE_SEQUENCES: u8 = 2;

/// Staged-file suffix for table-definition scripts.
pub const STAGE_TABLES: u8 = 3;

/// Staged-file suffix for data scripts.
pub const STAGE_DATA: u8 = 4;

/// Staged-file suffix for foreign keys, indexes and triggers.
pub const STAGE_POST_TABLE: u8 = 5;

/// Pipeline stage. Advances strictly forward; the suffix orders artifacts
/// produced outside the ETL phase around the numbered ETL stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Pre,
    Etl,
    Post,
}

impl Stage {
    /// File-name suffix for artifacts written in this stage.
    pub fn suffix(&self) -> &'static str {
        match self {
            Stage::Pre => "1",
            Stage::Etl => "ETL",
            Stage::Post => "6",
        }
    }
}

struct StagedFile {
    name: String,
    file: File,
}

/// Dual-sink statement dispatcher.
///
/// Owns the currently open staged file and the live target sessions. The file
/// write always happens before live execution, so an execution failure still
/// leaves a complete script on disk.
pub struct Dispatcher {
    emit_files: bool,
    target_path: Option<PathBuf>,
    encoding: &'static Encoding,
    schema: String,
    stage: Stage,
    file_number: u32,
    current: Option<StagedFile>,
    run_log: Option<File>,
    live: Option<Box<dyn TargetExec>>,
}

impl Dispatcher {
    /// Create the dispatcher, claiming a fresh output directory.
    ///
    /// An already-existing output directory is refused outright so two runs
    /// can never mix their artifacts.
    pub fn new(config: &Config) -> Result<Self> {
        let encoding = Encoding::for_label(config.output.encoding.as_bytes())
            .ok_or_else(|| {
                MigrateError::config(format!(
                    "unknown output encoding '{}'",
                    config.output.encoding
                ))
            })?;

        let mut target_path = None;
        let mut run_log = None;
        if config.output.files {
            let path = config
                .output
                .path
                .as_ref()
                .ok_or_else(|| MigrateError::config("output path not set"))?;
            if path.exists() {
                return Err(MigrateError::config(format!(
                    "Target path exists: \"{}\"",
                    path.display()
                )));
            }
            std::fs::create_dir_all(path)?;
            run_log = Some(
                OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(path.join(LOG_FILE))?,
            );
            target_path = Some(path.clone());
        }

        Ok(Self {
            emit_files: config.output.files,
            target_path,
            encoding,
            schema: config.target.schema.clone(),
            stage: Stage::Pre,
            file_number: 0,
            current: None,
            run_log,
            live: None,
        })
    }

    /// The claimed output directory, when file output is enabled.
    pub fn target_path(&self) -> Option<&Path> {
        self.target_path.as_deref()
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    /// Advance the pipeline stage. Entering POST permanently closes the
    /// active staged file.
    pub fn advance(&mut self, stage: Stage) -> Result<()> {
        if stage == Stage::Post {
            self.close_file()?;
        }
        self.stage = stage;
        Ok(())
    }

    /// Attach the live target sessions (lazily created by the caller).
    pub fn attach_targets(&mut self, targets: Box<dyn TargetExec>) {
        self.live = Some(targets);
    }

    /// Record a progress message in the run log and the tracing output.
    pub fn log(&mut self, message: &str) {
        info!("{}", message);
        if let Some(file) = &mut self.run_log {
            let _ = writeln!(file, "{}", message);
        }
    }

    /// Switch statement output to the staged file `requested`, closing the
    /// previously open file when the name changes.
    ///
    /// During ETL the requested name is used verbatim; outside ETL a global
    /// file number and the current stage suffix are applied, so every command
    /// issued around the ETL phase lands in its own lexically ordered file.
    /// A non-empty message is logged and echoed into the file.
    pub fn set_file(&mut self, requested: &str, message: &str) -> Result<()> {
        if !message.is_empty() {
            self.log(message);
        }

        if !self.emit_files {
            return Ok(());
        }

        let switch = self
            .current
            .as_ref()
            .map(|f| f.name != requested)
            .unwrap_or(true);

        if switch {
            self.close_file()?;

            let name = if self.stage == Stage::Etl {
                requested.to_string()
            } else {
                self.file_number += 1;
                let stem = Path::new(requested)
                    .file_stem()
                    .and_then(|s| s.to_str())
                    .unwrap_or(requested);
                format!(
                    "{:06}.{}.{}.sql",
                    self.file_number,
                    stem,
                    self.stage.suffix()
                )
            };

            let dir = self
                .target_path
                .as_ref()
                .ok_or_else(|| MigrateError::config("output path not set"))?;
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(dir.join(&name))?;
            self.current = Some(StagedFile { name, file });
        }

        if !message.is_empty() {
            self.write(&format!("\n\\echo {}\n\n", message))?;
        }

        Ok(())
    }

    /// Close the currently open staged file, if any.
    pub fn close_file(&mut self) -> Result<()> {
        if let Some(staged) = self.current.take() {
            drop(staged);
        }
        Ok(())
    }

    /// Dispatch one statement: substitute the schema placeholder, append it
    /// to the open staged file, then execute it on every live session.
    pub fn dispatch(&mut self, statement: &str) -> Result<()> {
        let statement = statement.replace(SCHEMA_PLACEHOLDER, &self.schema);

        self.write(&format!("{}\n", statement))?;

        if let Some(live) = &mut self.live {
            live.execute(&statement)?;
        }

        Ok(())
    }

    /// Write raw text to the open staged file, if one is open.
    fn write(&mut self, text: &str) -> Result<()> {
        if let Some(staged) = &mut self.current {
            write_encoded(&mut staged.file, self.encoding, text)?;
        }
        Ok(())
    }
}

/// Write text in the configured encoding.
pub(crate) fn write_encoded(file: &mut File, encoding: &'static Encoding, text: &str) -> Result<()> {
    if encoding == encoding_rs::UTF_8 {
        file.write_all(text.as_bytes())?;
    } else {
        let (bytes, _, _) = encoding.encode(text);
        file.write_all(&bytes)?;
    }
    Ok(())
}

/// Create a file and write the whole content in the configured encoding.
pub(crate) fn write_file(path: &Path, encoding: &'static Encoding, content: &str) -> Result<()> {
    let mut file = File::create(path)?;
    write_encoded(&mut file, encoding, content)
}
