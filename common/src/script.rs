//! Rendering of the SLURM batch script that performs the transfer
//!
//! Rendering is pure: the same inputs always produce the same text. Nothing is validated here,
//! callers pass values that went through [`crate::validate`].

use std::path::{Path, PathBuf};

use crate::config::SlurmDirectives;

/// File the script uses to record which subdirectories were packaged
pub const LARGE_DIRECTORIES_LIST: &str = "large_directories.txt";

/// Where and as whom the data is sent
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferParameters {
    pub user: String,
    pub host: String,
    pub target_dir: String,
    /// ssh identity passed to rsync with `-e 'ssh -i <key>'`
    pub private_key: Option<PathBuf>,
    /// Number of parallel rsync connections
    pub connections: Option<u32>,
}

/// Packaging of subdirectories holding too many entries to transfer one by one
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LargeDirPolicy {
    /// Directories with a link count above this are archived
    pub max_files_per_dir: u64,
    /// Remove the original directories once archived
    pub discard_originals: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptOptions {
    /// Job name (`-J`), usually the script file name
    pub job_name: String,
    /// Project to account the job to (`-A`)
    pub project_id: String,
    pub directives: SlurmDirectives,
    pub large_dirs: Option<LargeDirPolicy>,
    /// File the rsync output is tee'd to
    pub rsync_log: String,
}

/// Render the full script text
pub fn render(source_dir: &Path, parameters: &TransferParameters, options: &ScriptOptions) -> String {
    let source = source_dir.display();
    let directives = &options.directives;
    let mut script = format!(
        "#!/bin/bash\n\
        #SBATCH -p {}\n\
        #SBATCH -n {}\n\
        #SBATCH -J {}\n\
        #SBATCH -A {}\n\
        #SBATCH -t {}\n\n",
        directives.partition, directives.tasks, options.job_name, options.project_id, directives.time_limit
    );
    if let Some(policy) = &options.large_dirs {
        script.push_str(&format!(
            "find {source} -mindepth 1 -maxdepth 2 -not -path '*/.*' -type d -links +{} > {LARGE_DIRECTORIES_LIST}\n\n",
            policy.max_files_per_dir
        ));
        script.push_str(&format!(
            "xargs -a {LARGE_DIRECTORIES_LIST} -I {{}} tar -czvf {{}}.tar.gz {{}}\n\n"
        ));
        if policy.discard_originals {
            script.push_str(&format!(
                "xargs -a {LARGE_DIRECTORIES_LIST} -I {{}} rm -rf {{}}\n\n"
            ));
        }
    }
    script.push_str(&rsync_command(source_dir, parameters, options));
    script
}

fn rsync_command(source_dir: &Path, parameters: &TransferParameters, options: &ScriptOptions) -> String {
    let mut command = String::from("rsync -cavz");
    if let Some(key) = &parameters.private_key {
        command.push_str(&format!(" -e 'ssh -i {}'", key.display()));
    }
    command.push_str(" --progress");
    if let Some(connections) = parameters.connections {
        command.push_str(&format!(" --parallel={connections}"));
    }
    if options.large_dirs.is_some() {
        command.push_str(&format!(" --exclude-from={LARGE_DIRECTORIES_LIST}"));
    }
    command.push_str(&format!(
        " {} {}@{}:{} | tee {}\n",
        source_dir.display(),
        parameters.user,
        parameters.host,
        parameters.target_dir,
        options.rsync_log
    ));
    command
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parameters() -> TransferParameters {
        TransferParameters {
            user: "alice".to_string(),
            host: "dardel.pdc.kth.se".to_string(),
            target_dir: "/cfs/klemming/projects/snic/alice".to_string(),
            private_key: None,
            connections: Some(10),
        }
    }

    fn options(large_dirs: Option<LargeDirPolicy>) -> ScriptOptions {
        ScriptOptions {
            job_name: "darsync_reads.sh".to_string(),
            project_id: "naiss2023-22-999".to_string(),
            directives: SlurmDirectives::default(),
            large_dirs,
            rsync_log: "darsync_reads.rsync_log".to_string(),
        }
    }

    const HEADER: &str = "#!/bin/bash\n\
        #SBATCH -p core\n\
        #SBATCH -n 1\n\
        #SBATCH -J darsync_reads.sh\n\
        #SBATCH -A naiss2023-22-999\n\
        #SBATCH -t 7-00:00:00\n\n";

    #[test]
    fn plain_transfer() {
        let script = render(Path::new("/proj/reads"), &parameters(), &options(None));
        let expected = format!(
            "{HEADER}rsync -cavz --progress --parallel=10 /proj/reads \
            alice@dardel.pdc.kth.se:/cfs/klemming/projects/snic/alice | tee darsync_reads.rsync_log\n"
        );
        assert_eq!(script, expected);
    }

    #[test]
    fn private_key_transfer() {
        let parameters = TransferParameters {
            private_key: Some(PathBuf::from("/home/alice/.ssh/id_rsa")),
            connections: None,
            ..parameters()
        };
        let script = render(Path::new("/proj/reads"), &parameters, &options(None));
        assert!(script.ends_with(
            "rsync -cavz -e 'ssh -i /home/alice/.ssh/id_rsa' --progress /proj/reads \
            alice@dardel.pdc.kth.se:/cfs/klemming/projects/snic/alice | tee darsync_reads.rsync_log\n"
        ));
    }

    #[test]
    fn packaging_keeps_originals() {
        let policy = LargeDirPolicy {
            max_files_per_dir: 100_000,
            discard_originals: false,
        };
        let script = render(Path::new("/proj/reads"), &parameters(), &options(Some(policy)));
        let expected = format!(
            "{HEADER}\
            find /proj/reads -mindepth 1 -maxdepth 2 -not -path '*/.*' -type d -links +100000 > large_directories.txt\n\n\
            xargs -a large_directories.txt -I {{}} tar -czvf {{}}.tar.gz {{}}\n\n\
            rsync -cavz --progress --parallel=10 --exclude-from=large_directories.txt /proj/reads \
            alice@dardel.pdc.kth.se:/cfs/klemming/projects/snic/alice | tee darsync_reads.rsync_log\n"
        );
        assert_eq!(script, expected);
    }

    #[test]
    fn packaging_discards_originals() {
        let policy = LargeDirPolicy {
            max_files_per_dir: 500,
            discard_originals: true,
        };
        let script = render(Path::new("/proj/reads"), &parameters(), &options(Some(policy)));
        let tar = script.find("tar -czvf").unwrap();
        let rm = script
            .find("xargs -a large_directories.txt -I {} rm -rf {}\n\n")
            .unwrap();
        let rsync = script.find("rsync -cavz").unwrap();
        assert!(tar < rm && rm < rsync);
        assert!(script.contains("-links +500 "));
    }

    #[test]
    fn custom_directives() {
        let options = ScriptOptions {
            directives: SlurmDirectives {
                partition: "shared".to_string(),
                tasks: 4,
                time_limit: "1-12:00:00".to_string(),
            },
            ..options(None)
        };
        let script = render(Path::new("/proj/reads"), &parameters(), &options);
        assert!(script.starts_with("#!/bin/bash\n#SBATCH -p shared\n#SBATCH -n 4\n"));
        assert!(script.contains("#SBATCH -t 1-12:00:00\n\n"));
    }

    #[test]
    fn rendering_is_deterministic() {
        let policy = Some(LargeDirPolicy {
            max_files_per_dir: 100_000,
            discard_originals: true,
        });
        let first = render(Path::new("/proj/reads"), &parameters(), &options(policy));
        let second = render(Path::new("/proj/reads"), &parameters(), &options(policy));
        assert_eq!(first, second);
    }
}
