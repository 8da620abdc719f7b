use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{Error, Result};

/// Directory next to the input table that receives every artifact.
pub const GRAPHS_DIR: &str = "graphs";

/// `<input_dir>/graphs/<input_stem>-<descriptor>.<extension>`
pub fn output_path(input: &Path, descriptor: &str, extension: &str) -> PathBuf {
    let dir = input.parent().unwrap_or_else(|| Path::new(""));
    let stem = input
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default();
    dir.join(GRAPHS_DIR)
        .join(format!("{stem}-{descriptor}.{extension}"))
}

/// Write a finished artifact, creating its directory when needed.
///
/// Only ever called with fully rendered bytes, so a failed render leaves
/// nothing behind.
pub fn write_artifact(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|source| Error::io(parent, source))?;
    }
    fs::write(path, bytes).map_err(|source| Error::io(path, source))?;
    debug!(path = %path.display(), bytes = bytes.len(), "artifact written");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_sits_beside_input() {
        let path = output_path(Path::new("results/run.csv"), "client-throughput", "svg");
        assert_eq!(path, Path::new("results/graphs/run-client-throughput.svg"));
    }

    #[test]
    fn bare_file_name_uses_relative_graphs_dir() {
        let path = output_path(Path::new("run.csv"), "alignment", "tex");
        assert_eq!(path, Path::new("graphs/run-alignment.tex"));
    }
}
