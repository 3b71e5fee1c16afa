// src/history/mod.rs
//! JSON stores kept next to the published data, plus their change logs.

pub mod rce;
pub mod rcem;

use anyhow::{Context, Result};
use serde::{de::DeserializeOwned, Serialize};
use std::{
    fs,
    io::{self, Write},
    path::Path,
};
use tracing::warn;

pub use rce::{MergeOutcome, RceStore};
pub use rcem::{diff, Change, RcemStore, UpdateOutcome};

/// Load `path` as JSON, treating a missing, unreadable or corrupt file as empty.
pub fn read_json_or_default<T: DeserializeOwned + Default>(path: &Path) -> T {
    let file = match fs::File::open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return T::default(),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "unreadable store; starting empty");
            return T::default();
        }
    };
    match serde_json::from_reader(io::BufReader::new(file)) {
        Ok(v) => v,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "corrupt store; starting empty");
            T::default()
        }
    }
}

/// Pretty-print `value` to `path` atomically: tmp file in the same directory, then rename.
pub fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;

    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .context("store path has no file name")?;
    let tmp_path = dir.join(format!(".{}.tmp", file_name));
    {
        let mut tmp = fs::File::create(&tmp_path)
            .with_context(|| format!("creating {}", tmp_path.display()))?;
        // pretty-print with a trailing newline
        serde_json::to_writer_pretty(&mut tmp, value).context("serializing JSON")?;
        tmp.write_all(b"\n")?;
        tmp.sync_all()?;
    }
    fs::rename(&tmp_path, path)
        .with_context(|| format!("renaming {} -> {}", tmp_path.display(), path.display()))?;
    Ok(())
}

/// Replace the contents of a text log.
pub fn write_log(path: &Path, lines: &[String]) -> Result<()> {
    let mut f = fs::File::create(path).with_context(|| format!("creating {}", path.display()))?;
    for line in lines {
        writeln!(f, "{}", line)?;
    }
    Ok(())
}
