use std::path::{Path, PathBuf};

use anyhow::{ensure, Context as _};
use glob::glob;
use itertools::Itertools;
use log::info;

/// Candidate XML files of a directory tree, one bucket per recognized
/// suffix, barcode-scoped subset files already excluded.
#[derive(Debug, Clone, Default)]
pub struct RunFiles {
    pub consensus: Vec<PathBuf>,
    pub subread: Vec<PathBuf>,
    pub sts: Vec<PathBuf>,
}

impl RunFiles {
    pub fn total(&self) -> usize {
        self.consensus.len() + self.subread.len() + self.sts.len()
    }
}

/// Whether a file describes the whole physical cell rather than a
/// barcode-scoped (multiplexed sub-library) subset.
///
/// Barcode subsets live in directories like `bc2011--bc2011/` or carry
/// the pattern in their filename (`.bc2011--bc2011.`); `unbarcoded`
/// files are the complementary subset and equally not run-wide.
pub fn is_cell_scope(path: &Path) -> bool {
    let path_str = path.to_string_lossy();
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    if path_str.contains("/bc") && path_str.contains("--bc") {
        return false;
    }
    if file_name.contains(".bc") && file_name.contains("--bc") {
        return false;
    }
    if file_name.to_lowercase().contains("unbarcoded") {
        return false;
    }
    true
}

/// Recursively enumerates the root directory for the three recognized
/// dataset suffixes, dropping barcode-scoped files.
pub fn find_run_files(root: &Path) -> anyhow::Result<RunFiles> {
    ensure!(root.exists(), "root path {} does not exist", root.display());
    ensure!(
        root.is_dir(),
        "root path {} is not a directory",
        root.display()
    );

    let mut files = RunFiles::default();
    for (suffix, bucket) in [
        ("consensusreadset", &mut files.consensus),
        ("subreadset", &mut files.subread),
        ("sts", &mut files.sts),
    ] {
        let pattern = root
            .join(format!("**/*.{}.xml", suffix))
            .to_string_lossy()
            .into_owned();
        let matches = glob(&pattern)
            .with_context(|| format!("invalid glob pattern {:?}", pattern))?;

        let all = matches.filter_map(Result::ok).collect_vec();
        let total = all.len();
        bucket.extend(all.into_iter().filter(|p| is_cell_scope(p)).sorted());

        info!(
            "Found {} total {}.xml files, {} whole-cell files",
            total,
            suffix,
            bucket.len()
        );
    }
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cell_scope_predicate() {
        assert!(is_cell_scope(Path::new(
            "/data/r64241e_20240314_114036/3_C01/m64241e_240316_184724.consensusreadset.xml"
        )));
        // Barcode subdirectory.
        assert!(!is_cell_scope(Path::new(
            "/data/run/bc2011--bc2011/m64241e.consensusreadset.xml"
        )));
        // Barcode pattern in the filename.
        assert!(!is_cell_scope(Path::new(
            "/data/run/m64241e.bc2011--bc2011.consensusreadset.xml"
        )));
        // Unbarcoded leftovers are subsets too.
        assert!(!is_cell_scope(Path::new(
            "/data/run/m64241e.unbarcoded.consensusreadset.xml"
        )));
    }

    #[test]
    fn missing_root_is_fatal() {
        assert!(find_run_files(Path::new("/definitely/not/here")).is_err());
    }
}
