//! Durable artifact helpers: atomic JSON writes and validated reads.
//!
//! Both durable artifacts (index snapshot, model bundle) go through
//! write-to-temp-then-rename so a crash mid-write can never leave a
//! partial file that a later load would accept.

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::{PipelineError, Result};

/// Serialize `value` as JSON to `path` atomically.
///
/// The temp file is created in the destination directory so the final
/// rename stays on one filesystem.
pub fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(dir)?;

    let tmp = tempfile::NamedTempFile::new_in(dir)?;
    {
        let mut writer = BufWriter::new(tmp.as_file());
        serde_json::to_writer(&mut writer, value)
            .map_err(|e| PipelineError::Other(format!("serializing {path:?}: {e}")))?;
        writer.flush()?;
    }
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

/// Read and deserialize a JSON artifact.
///
/// Structural failures (truncation, wrong shape) surface as
/// [`PipelineError::CorruptArtifact`], never as a silent default.
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let file = File::open(path)?;
    serde_json::from_reader(BufReader::new(file))
        .map_err(|e| PipelineError::CorruptArtifact(format!("{}: {e}", path.display())))
}
