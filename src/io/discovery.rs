use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::{Error, Result};

/// List files in `dir` matching the glob `pattern` (e.g. `*.tif`), sorted.
pub fn discover_inputs(dir: &Path, pattern: &str) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(Error::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("input directory {:?} does not exist", dir),
        )));
    }
    // only `pattern` is a glob; the directory is matched literally
    let dir_str = dir.to_str().ok_or_else(|| Error::InvalidArgument {
        arg: "input_dir",
        value: dir.to_string_lossy().into_owned(),
    })?;
    let joined = Path::new(&glob::Pattern::escape(dir_str)).join(pattern);
    let full = joined.to_str().ok_or_else(|| Error::InvalidArgument {
        arg: "pattern",
        value: joined.to_string_lossy().into_owned(),
    })?;

    let mut files = Vec::new();
    for entry in glob::glob(full)? {
        match entry {
            Ok(path) if path.is_file() => files.push(path),
            Ok(path) => debug!("Skipping non-file match: {:?}", path),
            Err(e) => warn!("Unreadable glob match: {}", e),
        }
    }
    files.sort();
    Ok(files)
}

/// Sample identifier: the file stem with `prefix` removed when present.
/// `RGB-PanSharpen_AOI_2_Vegas_img12.tif` -> `AOI_2_Vegas_img12`.
pub fn sample_id(path: &Path, prefix: &str) -> String {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    match stem.strip_prefix(prefix) {
        Some(rest) if !prefix.is_empty() && !rest.is_empty() => rest.to_string(),
        _ => stem,
    }
}
