//! JSON and JSON-lines files for candidates, decisions, snapshots and reports.
//!
//! Writes go to a sibling `*.tmp` file which is renamed over the target, so a
//! reader never sees a half-written document.
use std::{
    fs::{self, File},
    io::{BufRead, BufReader, BufWriter, Write},
    path::{Path, PathBuf},
};

use serde::{Serialize, de::DeserializeOwned};
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("I/O error on {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("JSON error on {path}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl PersistError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    fn json(path: &Path, source: serde_json::Error) -> Self {
        Self::Json {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Records read from a JSON-lines file, with the line numbers that failed to parse.
#[derive(Debug, Clone)]
pub struct JsonLines<T> {
    pub records: Vec<T>,
    pub malformed: Vec<usize>,
}

/// Writes `value` as pretty JSON.
///
/// # Errors
/// Returns [`PersistError`] when serialization or any file operation fails.
pub fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), PersistError> {
    write_atomic(path, |writer| {
        serde_json::to_writer_pretty(&mut *writer, value).map_err(|e| PersistError::json(path, e))?;
        writer.write_all(b"\n").map_err(|e| PersistError::io(path, e))
    })
}

/// Writes one compact JSON document per line.
///
/// # Errors
/// Returns [`PersistError`] when serialization or any file operation fails.
pub fn write_json_lines<'a, T, I>(path: &Path, records: I) -> Result<(), PersistError>
where
    T: Serialize + 'a,
    I: IntoIterator<Item = &'a T>,
{
    write_atomic(path, |writer| {
        for record in records {
            serde_json::to_writer(&mut *writer, record).map_err(|e| PersistError::json(path, e))?;
            writer.write_all(b"\n").map_err(|e| PersistError::io(path, e))?;
        }
        Ok(())
    })
}

/// Writes a plain text document, e.g. a Prometheus exposition.
///
/// # Errors
/// Returns [`PersistError::Io`] when any file operation fails.
pub fn write_text(path: &Path, text: &str) -> Result<(), PersistError> {
    write_atomic(path, |writer| {
        writer
            .write_all(text.as_bytes())
            .map_err(|e| PersistError::io(path, e))
    })
}

/// # Errors
/// Returns [`PersistError`] when the file cannot be read or parsed.
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, PersistError> {
    let file = File::open(path).map_err(|e| PersistError::io(path, e))?;
    serde_json::from_reader(BufReader::new(file)).map_err(|e| PersistError::json(path, e))
}

/// Reads a JSON-lines file. Blank lines are ignored; lines that fail to parse
/// are logged and reported by number instead of aborting the read.
///
/// # Errors
/// Returns [`PersistError::Io`] when the file cannot be opened or read.
pub fn read_json_lines<T: DeserializeOwned>(path: &Path) -> Result<JsonLines<T>, PersistError> {
    let file = File::open(path).map_err(|e| PersistError::io(path, e))?;
    let mut lines = JsonLines {
        records: Vec::new(),
        malformed: Vec::new(),
    };
    for (idx, line) in BufReader::new(file).lines().enumerate() {
        let line = line.map_err(|e| PersistError::io(path, e))?;
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str(&line) {
            Ok(record) => lines.records.push(record),
            Err(error) => {
                warn!(path = %path.display(), line = idx + 1, error = %error, "skipping malformed line");
                lines.malformed.push(idx + 1);
            }
        }
    }
    debug!(
        path = %path.display(),
        records = lines.records.len(),
        malformed = lines.malformed.len(),
        "read json lines"
    );
    Ok(lines)
}

fn write_atomic<F>(path: &Path, write: F) -> Result<(), PersistError>
where
    F: FnOnce(&mut BufWriter<File>) -> Result<(), PersistError>,
{
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| PersistError::io(parent, e))?;
    }
    let tmp = temp_path(path);
    let file = File::create(&tmp).map_err(|e| PersistError::io(&tmp, e))?;
    let mut writer = BufWriter::new(file);

    let written = write(&mut writer).and_then(|()| {
        let file = writer
            .into_inner()
            .map_err(|e| PersistError::io(&tmp, e.into_error()))?;
        file.sync_all().map_err(|e| PersistError::io(&tmp, e))
    });
    if let Err(error) = written {
        let _ = fs::remove_file(&tmp);
        return Err(error);
    }

    fs::rename(&tmp, path).map_err(|e| PersistError::io(path, e))?;
    debug!(path = %path.display(), "file written");
    Ok(())
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}
