use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use mimic_logging::mimic_info;
use tempfile::NamedTempFile;
use thiserror::Error;

use crate::filename::script_filename;
use crate::orchestrator::GeneratedScript;

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("output directory missing or not writable: {0}")]
    OutputDir(String),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

/// Ensure output directory exists; create if missing.
pub fn ensure_output_dir(dir: &Path) -> Result<(), PersistError> {
    if dir.exists() {
        let meta = fs::metadata(dir).map_err(|e| PersistError::OutputDir(e.to_string()))?;
        if !meta.is_dir() {
            return Err(PersistError::OutputDir(format!(
                "{} is not a directory",
                dir.display()
            )));
        }
    } else {
        fs::create_dir_all(dir).map_err(|e| PersistError::OutputDir(e.to_string()))?;
    }
    NamedTempFile::new_in(dir).map_err(|e| PersistError::OutputDir(e.to_string()))?;
    Ok(())
}

/// Writes generated scripts into one directory, atomically.
#[derive(Debug, Clone)]
pub struct ScriptWriter {
    dir: PathBuf,
}

impl ScriptWriter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Writes `script` under its deterministic name, replacing an older copy.
    pub fn write(&self, script: &GeneratedScript) -> Result<PathBuf, PersistError> {
        let filename = script_filename(script.file_name.as_deref(), &script.artifact_id);
        let target = self.write_named(&filename, &script.source)?;
        mimic_info!("wrote script to {}", target.display());
        Ok(target)
    }

    fn write_named(&self, filename: &str, content: &str) -> Result<PathBuf, PersistError> {
        ensure_output_dir(&self.dir)?;

        let target = self.dir.join(filename);
        let mut tmp = NamedTempFile::new_in(&self.dir)?;
        tmp.write_all(content.as_bytes())?;
        tmp.flush()?;
        tmp.as_file_mut().sync_all()?;

        tmp.persist(&target).map_err(|e| PersistError::Io(e.error))?;
        Ok(target)
    }
}
