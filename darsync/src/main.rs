use std::io::BufRead;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use clap::Parser;
use common::config::{
    DEFAULT_CONNECTIONS, DEFAULT_EXTENSIONS, DEFAULT_MAX_FILES_PER_DIR, DEFAULT_PROJECT_ID,
    DEFAULT_RUN_ID, DEFAULT_TARGET_HOST,
};
use common::naming::RunNames;
use common::validate;
use prompt::Prompter;
use tracing::instrument;

mod prompt;

#[derive(Parser, Debug, Clone)]
#[command(
    name = "darsync",
    version,
    about = "Prepare a directory for migration: audit it for uncompressed files and generate a transfer script",
    long_about = "`darsync` prepares a local directory for moving to a remote cluster.

`check` looks for large uncompressed files (by extension) and writes a list of them,
largest first, when a file or the total is above the size thresholds.

`gen` asks for the transfer parameters and writes a SLURM batch script that moves the
directory with rsync. The script is never run by darsync, edit it and submit it with sbatch.

EXAMPLES:
    # Audit the current directory
    darsync check

    # Audit with custom thresholds and extensions
    darsync check /proj/reads --extension .bam --extension .sam --file-size-threshold 500MiB

    # Generate a script without any questions
    darsync gen /proj/reads --no-prompt --target-dir /cfs/klemming/projects/alice --user alice"
)]
struct Args {
    /// Verbose level: -v INFO / -vv DEBUG / -vvv TRACE (default: ERROR)
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count, global = true, help_heading = "Progress & output")]
    verbose: u8,

    /// Quiet mode, don't report errors
    #[arg(short = 'q', long = "quiet", global = true, help_heading = "Progress & output")]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Subcommand, Debug, Clone)]
enum Command {
    /// Audit a directory for large uncompressed files, nothing is transferred
    Check(CheckArgs),
    /// Generate a SLURM script that transfers a directory with rsync
    Gen(GenArgs),
}

#[derive(clap::Args, Debug, Clone)]
struct AuditArgs {
    /// Extension to look for, including the leading dot (can be specified multiple times)
    ///
    /// Defaults to: .sam .vcf .fq .fastq .fasta .txt .fa
    #[arg(long = "extension", value_name = "EXT", action = clap::ArgAction::Append, help_heading = "Audit options")]
    extensions: Vec<String>,

    /// Compare extensions ignoring ASCII case, so ".FASTQ" counts as ".fastq"
    #[arg(long, help_heading = "Audit options")]
    ignore_case: bool,

    /// Warn about files larger than this
    ///
    /// Accepts human readable sizes, e.g. "1GiB", "500MiB" or "2GB" (decimal).
    #[arg(
        long,
        default_value = "1GiB",
        value_name = "SIZE",
        value_parser = parse_size,
        help_heading = "Audit options"
    )]
    file_size_threshold: u64,

    /// Warn when all tracked files together are larger than this
    #[arg(
        long,
        default_value = "100GiB",
        value_name = "SIZE",
        value_parser = parse_size,
        help_heading = "Audit options"
    )]
    total_size_threshold: u64,
}

impl AuditArgs {
    fn settings(&self) -> common::AuditSettings {
        let extensions = if self.extensions.is_empty() {
            DEFAULT_EXTENSIONS.iter().map(|ext| ext.to_string()).collect()
        } else {
            self.extensions.clone()
        };
        common::AuditSettings {
            extensions,
            extension_match: if self.ignore_case {
                common::ExtensionMatch::IgnoreAsciiCase
            } else {
                common::ExtensionMatch::Exact
            },
            file_size_threshold: self.file_size_threshold,
            total_size_threshold: self.total_size_threshold,
        }
    }
}

#[derive(clap::Args, Debug, Clone)]
struct RunArgs {
    /// Prefix of the files this run writes, e.g. "<RUN_ID>_<dir>.sh"
    #[arg(long, default_value = DEFAULT_RUN_ID, value_name = "NAME", help_heading = "Run options")]
    run_id: String,

    /// Directory the log and the script are written to
    #[arg(long, default_value = ".", value_name = "PATH", help_heading = "Run options")]
    output_dir: PathBuf,

    /// Don't ask questions: use defaults for values not given as options
    ///
    /// Fails if a value without a default (e.g. --target-dir) is missing.
    #[arg(long, help_heading = "Run options")]
    no_prompt: bool,
}

#[derive(clap::Args, Debug, Clone)]
struct CheckArgs {
    #[command(flatten)]
    audit: AuditArgs,

    #[command(flatten)]
    run: RunArgs,

    /// Print the audit result as JSON on stdout (messages go to stderr)
    #[arg(long, help_heading = "Progress & output")]
    json: bool,

    /// Directory to check (asked for if missing, defaults to the current directory)
    #[arg()]
    dir: Option<String>,
}

#[derive(clap::Args, Debug, Clone)]
struct GenArgs {
    #[command(flatten)]
    audit: AuditArgs,

    #[command(flatten)]
    run: RunArgs,

    /// Don't audit the directory before generating the script
    #[arg(long, help_heading = "Audit options")]
    skip_check: bool,

    // Transfer
    /// System the data is moved to
    #[arg(long, value_name = "HOST", help_heading = "Transfer")]
    host: Option<String>,

    /// Absolute path on the target system the data is moved to
    #[arg(long, value_name = "PATH", help_heading = "Transfer")]
    target_dir: Option<String>,

    /// User name on the target system (defaults to $USER)
    #[arg(long, value_name = "NAME", help_heading = "Transfer")]
    user: Option<String>,

    /// Private key rsync passes to ssh, empty for the ssh default
    #[arg(long, value_name = "PATH", help_heading = "Transfer")]
    private_key: Option<String>,

    /// Number of parallel rsync connections
    #[arg(long, value_name = "N", help_heading = "Transfer")]
    connections: Option<String>,

    // Packaging
    /// Don't package large subdirectories before the transfer
    #[arg(long, conflicts_with_all = ["discard_large_dirs", "keep_large_dirs"], help_heading = "Packaging")]
    no_package: bool,

    /// Subdirectories with more entries than this are packaged with tar
    #[arg(long, default_value_t = DEFAULT_MAX_FILES_PER_DIR, value_name = "N", help_heading = "Packaging")]
    max_files_per_dir: u64,

    /// Remove large subdirectories once they are packaged
    #[arg(long, conflicts_with = "keep_large_dirs", help_heading = "Packaging")]
    discard_large_dirs: bool,

    /// Keep large subdirectories once they are packaged
    #[arg(long, help_heading = "Packaging")]
    keep_large_dirs: bool,

    // SLURM
    /// Project the transfer job is accounted to
    #[arg(long, value_name = "ID", help_heading = "SLURM")]
    project_id: Option<String>,

    /// Partition the job runs in
    #[arg(long, default_value = "core", value_name = "NAME", help_heading = "SLURM")]
    partition: String,

    /// Number of tasks
    #[arg(long, default_value_t = 1, value_name = "N", help_heading = "SLURM")]
    tasks: u32,

    /// Time limit in days-hours:minutes:seconds
    #[arg(long, default_value = "7-00:00:00", value_name = "TIME", help_heading = "SLURM")]
    time_limit: String,

    /// Directory to transfer (asked for if missing, defaults to the current directory)
    #[arg()]
    dir: Option<String>,
}

fn parse_size(value: &str) -> Result<u64, String> {
    value
        .parse::<bytesize::ByteSize>()
        .map(|size| size.as_u64())
}

/// Takes values from the command line, or asks for them unless prompting is disabled
struct Collector<R> {
    prompter: Option<Prompter<R>>,
}

impl<R: BufRead> Collector<R> {
    fn value<T, E, F>(
        &mut self,
        given: Option<&str>,
        flag: &str,
        question: &str,
        default: Option<&str>,
        mut validate: F,
    ) -> Result<T>
    where
        F: FnMut(&str) -> Result<T, E>,
        E: std::fmt::Display,
    {
        if let Some(given) = given {
            return validate(given).map_err(|error| anyhow!("{flag}: {error}"));
        }
        match (&mut self.prompter, default) {
            (Some(prompter), _) => prompter.input(question, default, validate),
            (None, Some(default)) => validate(default).map_err(|error| anyhow!("{flag}: {error}")),
            (None, None) => Err(anyhow!("{flag} is required with --no-prompt")),
        }
    }

    fn source_dir(&mut self, given: Option<&str>, cwd: &Path) -> Result<PathBuf> {
        let default = cwd.to_string_lossy().into_owned();
        self.value(
            given,
            "DIR",
            "Which directory should be transferred?",
            Some(default.as_str()),
            |dir: &str| validate::absolute_directory(Path::new(dir), cwd),
        )
    }

    fn confirm(&mut self, flag: &str, question: &str, default: bool) -> Result<bool> {
        match &mut self.prompter {
            Some(prompter) => prompter.confirm(question, default),
            None => {
                tracing::debug!("{flag} not given, using {default}");
                Ok(default)
            }
        }
    }
}

fn collector_for(no_prompt: bool) -> Collector<std::io::StdinLock<'static>> {
    Collector {
        prompter: (!no_prompt).then(Prompter::for_stdin),
    }
}

fn current_dir() -> Result<PathBuf> {
    std::env::current_dir().context("failed getting the working directory")
}

/// Where user facing messages go: stdout, or stderr when stdout carries JSON
#[derive(Debug, Clone, Copy)]
struct Console {
    json: bool,
}

impl Console {
    fn say(&self, message: &str) {
        if self.json {
            eprintln!("{message}");
        } else {
            println!("{message}");
        }
    }
}

#[instrument(skip(settings, run))]
fn audit_and_report(
    dir: &Path,
    settings: &common::AuditSettings,
    run: &RunArgs,
    console: Console,
) -> Result<common::AuditResult> {
    let result = common::audit_with(dir, settings, |event| match event {
        common::AuditEvent::LargeFile(record) => console.say(&format!(
            "WARNING: {} is {}. This may take a while to transfer.",
            record.path.display(),
            common::format_bytes(record.size_bytes)
        )),
        common::AuditEvent::TotalExceeded { files, total_bytes } => console.say(&format!(
            "WARNING: The total size of the {files} uncompressed files to be transferred is {}. \
            You might want to compress them before.",
            common::format_bytes(total_bytes)
        )),
    })
    .with_context(|| format!("aborting: audit of {dir:?} failed, no size report was produced"))?;
    if result.needs_report() {
        let log = run
            .output_dir
            .join(RunNames::new(&run.run_id, dir).uncompressed_log());
        common::write_report(&result.records, &log)
            .context("the audit succeeded but its list of uncompressed files is missing")?;
        console.say(&format!(
            "A list of uncompressed files has been created in {}.",
            log.display()
        ));
    } else if result.records.is_empty() {
        console.say("No uncompressed files found.");
    } else {
        console.say(&format!(
            "Found {} uncompressed files ({}), none above the size thresholds.",
            result.file_count(),
            common::format_bytes(result.total_bytes)
        ));
    }
    Ok(result)
}

fn check(args: CheckArgs) -> Result<()> {
    let console = Console { json: args.json };
    let cwd = current_dir()?;
    let dir = collector_for(args.run.no_prompt).source_dir(args.dir.as_deref(), &cwd)?;
    console.say(&format!("Checking {}, data will NOT be transferred.\n", dir.display()));
    let result = audit_and_report(&dir, &args.audit.settings(), &args.run, console)?;
    if args.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&result).context("failed serializing the audit result")?
        );
    } else {
        tracing::info!("audit summary:\n{}", result);
    }
    Ok(())
}

fn generate(args: GenArgs) -> Result<()> {
    let console = Console { json: false };
    let cwd = current_dir()?;
    let mut collector = collector_for(args.run.no_prompt);
    console.say("This tool generates a SLURM script that transfers a directory with rsync.");
    let dir = collector.source_dir(args.dir.as_deref(), &cwd)?;
    console.say(&format!("Moving {}\n", dir.display()));
    if !args.skip_check {
        audit_and_report(&dir, &args.audit.settings(), &args.run, console)?;
    }
    let large_dirs = if args.no_package {
        None
    } else {
        console.say(&format!(
            "Subdirectories with more than {} entries will be packaged (tar) before moving.",
            args.max_files_per_dir
        ));
        let discard_originals = if args.discard_large_dirs || args.keep_large_dirs {
            args.discard_large_dirs
        } else {
            collector.confirm(
                "--discard-large-dirs",
                "Should we discard the large subdirectories after packaging?",
                false,
            )?
        };
        console.say(if discard_originals {
            "We will discard the large subdirectories after packaging."
        } else {
            "We will keep the large subdirectories."
        });
        Some(common::LargeDirPolicy {
            max_files_per_dir: args.max_files_per_dir,
            discard_originals,
        })
    };
    let host = collector.value(
        args.host.as_deref(),
        "--host",
        "Which system should data be moved to?",
        Some(DEFAULT_TARGET_HOST),
        |host: &str| Ok::<_, std::convert::Infallible>(host.to_string()),
    )?;
    let target_dir = collector.value(
        args.target_dir.as_deref(),
        "--target-dir",
        &format!("Where on {host} should data be moved to?"),
        None,
        validate::absolute_target_dir,
    )?;
    let default_user = std::env::var("USER").ok();
    let user = collector.value(
        args.user.as_deref(),
        "--user",
        &format!("What is your user name on {host}?"),
        default_user.as_deref(),
        validate::username,
    )?;
    let private_key = collector.value(
        args.private_key.as_deref(),
        "--private-key",
        "Which private key should ssh use? (empty for the ssh default)",
        Some(""),
        |key: &str| {
            if key.is_empty() {
                Ok(None)
            } else {
                validate::private_key(Path::new(key), &cwd).map(Some)
            }
        },
    )?;
    let default_connections = DEFAULT_CONNECTIONS.to_string();
    let connections = collector.value(
        args.connections.as_deref(),
        "--connections",
        "How many parallel rsync connections?",
        Some(default_connections.as_str()),
        validate::connections,
    )?;
    let project_id = collector.value(
        args.project_id.as_deref(),
        "--project-id",
        "Which project should the transfer job be accounted to? (ex. naiss2023-22-999)",
        Some(DEFAULT_PROJECT_ID),
        |id: &str| Ok::<_, std::convert::Infallible>(id.to_string()),
    )?;
    let names = RunNames::new(&args.run.run_id, &dir);
    let script_name = names.script();
    let parameters = common::TransferParameters {
        user,
        host,
        target_dir,
        private_key,
        connections: Some(connections),
    };
    let options = common::ScriptOptions {
        job_name: script_name.clone(),
        project_id,
        directives: common::SlurmDirectives {
            partition: args.partition,
            tasks: args.tasks,
            time_limit: args.time_limit,
        },
        large_dirs,
        rsync_log: names.rsync_log(),
    };
    tracing::debug!("transfer parameters: {:?}, options: {:?}", parameters, options);
    let script = common::render(&dir, &parameters, &options);
    let script_path = args.run.output_dir.join(&script_name);
    common::write_script(&script, &script_path).context("failed writing the transfer script")?;
    console.say(&format!(
        "\nWhen you are ready, edit {} to check the project ID and run \"sbatch {}\".",
        script_path.display(),
        script_name
    ));
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();
    let output = common::OutputConfig {
        quiet: args.quiet,
        verbose: args.verbose,
    };
    let res = common::run(output, || match args.command {
        Command::Check(args) => check(args),
        Command::Gen(args) => generate(args),
    });
    if res.is_none() {
        std::process::exit(1);
    }
    Ok(())
}
