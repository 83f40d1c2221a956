//! Configuration types for auditing, script synthesis and output settings

/// Extensions of formats that are commonly stored uncompressed
pub const DEFAULT_EXTENSIONS: [&str; 7] = [".sam", ".vcf", ".fq", ".fastq", ".fasta", ".txt", ".fa"];

/// Files larger than this trigger a per-file warning (1 GiB)
pub const DEFAULT_FILE_SIZE_THRESHOLD: u64 = 1024 * 1024 * 1024;

/// A total above this triggers the aggregate warning (100 GiB)
pub const DEFAULT_TOTAL_SIZE_THRESHOLD: u64 = 100 * 1024 * 1024 * 1024;

/// Subdirectories with more entries than this are packaged before the transfer
pub const DEFAULT_MAX_FILES_PER_DIR: u64 = 100_000;

/// Host that data is moved to unless told otherwise
pub const DEFAULT_TARGET_HOST: &str = "dardel.pdc.kth.se";

/// Placeholder written into the script when no project id is known
pub const DEFAULT_PROJECT_ID: &str = "UPPMAX_PROJECT_ID";

/// Prefix used for every file a run produces
pub const DEFAULT_RUN_ID: &str = "darsync";

/// Number of parallel rsync connections unless told otherwise
pub const DEFAULT_CONNECTIONS: u32 = 10;

/// How file extensions are compared against the tracked set
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ExtensionMatch {
    /// Byte-for-byte comparison, `.TXT` does not match `.txt`
    #[default]
    Exact,
    /// ASCII case-insensitive comparison
    IgnoreAsciiCase,
}

/// Settings for a single directory audit
#[derive(Debug, Clone)]
pub struct AuditSettings {
    /// Tracked extensions, each including the leading dot (e.g. ".fastq")
    pub extensions: Vec<String>,
    pub extension_match: ExtensionMatch,
    /// Strict per-file threshold in bytes
    pub file_size_threshold: u64,
    /// Strict aggregate threshold in bytes
    pub total_size_threshold: u64,
}

impl Default for AuditSettings {
    fn default() -> Self {
        Self {
            extensions: DEFAULT_EXTENSIONS.iter().map(|ext| ext.to_string()).collect(),
            extension_match: ExtensionMatch::default(),
            file_size_threshold: DEFAULT_FILE_SIZE_THRESHOLD,
            total_size_threshold: DEFAULT_TOTAL_SIZE_THRESHOLD,
        }
    }
}

/// SLURM resource request written at the top of the transfer script
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlurmDirectives {
    /// Partition (`-p`)
    pub partition: String,
    /// Number of tasks (`-n`)
    pub tasks: u32,
    /// Time limit (`-t`) in SLURM's `days-hours:minutes:seconds` form
    pub time_limit: String,
}

impl Default for SlurmDirectives {
    fn default() -> Self {
        Self {
            partition: "core".to_string(),
            tasks: 1,
            time_limit: "7-00:00:00".to_string(),
        }
    }
}

/// Output and logging configuration
#[derive(Debug, Clone, Copy, Default)]
pub struct OutputConfig {
    /// Suppress error output
    pub quiet: bool,
    /// Verbosity level: 0=ERROR, 1=INFO, 2=DEBUG, 3=TRACE
    pub verbose: u8,
}

impl OutputConfig {
    /// Filter directive matching the verbosity level
    pub fn level_directive(&self) -> &'static str {
        if self.quiet {
            return "off";
        }
        match self.verbose {
            0 => "error",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_audit_settings() {
        let settings = AuditSettings::default();
        assert_eq!(settings.extensions.len(), 7);
        assert!(settings.extensions.iter().any(|ext| ext == ".fastq"));
        assert_eq!(settings.extension_match, ExtensionMatch::Exact);
        assert_eq!(settings.file_size_threshold, 1 << 30);
        assert_eq!(settings.total_size_threshold, 100 << 30);
    }

    #[test]
    fn verbosity_levels() {
        let level = |quiet, verbose| OutputConfig { quiet, verbose }.level_directive();
        assert_eq!(level(false, 0), "error");
        assert_eq!(level(false, 1), "info");
        assert_eq!(level(false, 2), "debug");
        assert_eq!(level(false, 7), "trace");
        assert_eq!(level(true, 3), "off");
    }
}
