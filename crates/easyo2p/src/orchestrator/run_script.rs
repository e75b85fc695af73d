//! Run-script assembly: one aggregate `_run_.sql` that replays every staged
//! file in stage order.

use std::path::{Path, PathBuf};

use encoding_rs::Encoding;

use crate::config::Config;
use crate::dispatch::write_file;
use crate::error::Result;

/// Name of the aggregate script.
pub const RUN_SCRIPT: &str = "_run_.sql";

/// Scan the output directory, bucket the staged files by their stage-number
/// suffix and write the aggregate script.
///
/// Files are sourced in ascending stage order and lexically within a stage;
/// the orchestrator pre-numbered the filenames, so this yields a stable
/// global order regardless of directory listing order.
pub(crate) fn assemble(
    config: &Config,
    target_path: &Path,
    encoding: &'static Encoding,
) -> Result<PathBuf> {
    let schema = &config.target.schema;
    let path = target_path.join(RUN_SCRIPT);
    let run_file_name = path.display().to_string().replace('\\', "/");

    let mut script = vec![format!("-- \\i '{}' \n", run_file_name)];
    if config.migration.drop_schema {
        script.push(format!("DROP SCHEMA IF EXISTS {} CASCADE; \n", schema));
    }

    script.push(format!(
        "CREATE SCHEMA IF NOT EXISTS {}; \nSET search_path TO {}; \n",
        schema, schema
    ));
    script.push(format!(
        "SET client_encoding = '{}'; \n",
        client_encoding(&config.output.encoding)
    ));
    script.push("\\set AUTOCOMMIT on \n".to_string());

    let mut files: Vec<String> = std::fs::read_dir(target_path)?
        .filter_map(|entry| entry.ok())
        .filter_map(|entry| entry.file_name().into_string().ok())
        .collect();
    files.sort();

    for stage in 1..=6 {
        let suffix = format!(".{}.sql", stage);
        script.push(format!("\n\\echo Processing \"{}\" files...\n", suffix));
        for file in files.iter().filter(|f| f.ends_with(&suffix)) {
            script.push(format!("\\ir {}", file));
        }
    }

    script.push("\n".to_string());

    write_file(&path, encoding, &script.join("\n"))?;
    Ok(path)
}

/// psql wants the canonical UTF8 spelling; other encodings pass through.
fn client_encoding(encoding: &str) -> String {
    let upper = encoding.to_uppercase().replace('-', "");
    if upper.starts_with("UTF8") {
        "UTF8".to_string()
    } else {
        encoding.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    #[test]
    fn stages_are_sourced_in_order() {
        let tmp = tempfile::tempdir().unwrap();
        // Deliberately created out of order.
        for name in ["zz.2.sql", "b.3.sql", "x.5.sql", "aa.2.sql", "notes.txt"] {
            std::fs::write(tmp.path().join(name), "SELECT 1;\n").unwrap();
        }

        let mut config = Config::default();
        config.target.schema = "HR".to_string();
        let path = assemble(&config, tmp.path(), encoding_rs::UTF_8).unwrap();
        let script = std::fs::read_to_string(path).unwrap();

        let aa = script.find("\\ir aa.2.sql").unwrap();
        let zz = script.find("\\ir zz.2.sql").unwrap();
        let b3 = script.find("\\ir b.3.sql").unwrap();
        let x5 = script.find("\\ir x.5.sql").unwrap();
        assert!(aa < zz && zz < b3 && b3 < x5);
        assert!(!script.contains("notes.txt"));
        assert!(script.contains("DROP SCHEMA IF EXISTS HR CASCADE"));
        assert!(script.contains("SET search_path TO HR"));
        assert!(script.contains("SET client_encoding = 'UTF8'"));
        assert!(script.contains("\\set AUTOCOMMIT on"));
    }

    #[test]
    fn drop_schema_can_be_disabled() {
        let tmp = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.migration.drop_schema = false;
        let path = assemble(&config, tmp.path(), encoding_rs::UTF_8).unwrap();
        let script = std::fs::read_to_string(path).unwrap();
        assert!(!script.contains("DROP SCHEMA"));
        assert!(script.contains("CREATE SCHEMA IF NOT EXISTS"));
    }

    #[test]
    fn client_encoding_normalises_utf8() {
        assert_eq!(client_encoding("utf-8"), "UTF8");
        assert_eq!(client_encoding("UTF8"), "UTF8");
        assert_eq!(client_encoding("windows-1252"), "windows-1252");
    }
}
