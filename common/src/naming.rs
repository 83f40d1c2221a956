//! Names of the files a run leaves behind

use std::path::Path;

/// File names derived from a run id and the base name of the scanned directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunNames {
    pub run_id: String,
    pub base: String,
}

impl RunNames {
    pub fn new(run_id: &str, source_dir: &Path) -> Self {
        let base = source_dir
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            // `/` has no file name
            .unwrap_or_else(|| "root".to_string());
        Self {
            run_id: run_id.to_string(),
            base,
        }
    }

    fn stem(&self) -> String {
        format!("{}_{}", self.run_id, self.base)
    }

    /// Log listing the uncompressed files, e.g. `darsync_reads.uncompressed_files.log`
    pub fn uncompressed_log(&self) -> String {
        format!("{}.uncompressed_files.log", self.stem())
    }

    /// Transfer script, e.g. `darsync_reads.sh`
    pub fn script(&self) -> String {
        format!("{}.sh", self.stem())
    }

    /// Log the script tees rsync output to, e.g. `darsync_reads.rsync_log`
    pub fn rsync_log(&self) -> String {
        format!("{}.rsync_log", self.stem())
    }
}
