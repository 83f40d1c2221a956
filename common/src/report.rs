//! Persisting audit findings and generated scripts

use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::instrument;

use crate::audit::FileRecord;
use crate::size::format_bytes;

/// Failure to persist a report or script
///
/// Kept separate from [`crate::audit::AuditError`]: the audit itself succeeded, only its durable
/// record is missing.
#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("failed creating {path:?}")]
    Create {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed writing {path:?}, the file is incomplete or missing")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed setting permissions on {path:?}")]
    Permissions {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Write one `<path>\t<size>` line per record, in the given order
///
/// The destination is created or truncated. If writing fails the partial file is removed.
#[instrument(skip(records))]
pub fn write_report(records: &[FileRecord], destination: &Path) -> Result<(), ReportError> {
    write_scoped(destination, |writer| {
        for record in records {
            writeln!(
                writer,
                "{}\t{}",
                record.path.display(),
                format_bytes(record.size_bytes)
            )?;
        }
        Ok(())
    })?;
    tracing::info!("wrote {} records to {:?}", records.len(), destination);
    Ok(())
}

/// Write the transfer script and make it executable
#[instrument(skip(contents))]
pub fn write_script(contents: &str, destination: &Path) -> Result<(), ReportError> {
    write_scoped(destination, |writer| writer.write_all(contents.as_bytes()))?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(destination, std::fs::Permissions::from_mode(0o755)).map_err(
            |source| ReportError::Permissions {
                path: destination.to_path_buf(),
                source,
            },
        )?;
    }
    tracing::info!("wrote script {:?}", destination);
    Ok(())
}

fn write_scoped<F>(destination: &Path, write: F) -> Result<(), ReportError>
where
    F: FnOnce(&mut std::io::BufWriter<std::fs::File>) -> std::io::Result<()>,
{
    let file = std::fs::File::create(destination).map_err(|source| ReportError::Create {
        path: destination.to_path_buf(),
        source,
    })?;
    let mut writer = std::io::BufWriter::new(file);
    // close the handle before a failed file is removed
    let res = write(&mut writer).and_then(|()| writer.flush());
    drop(writer);
    if let Err(source) = res {
        if let Err(error) = std::fs::remove_file(destination) {
            tracing::error!("failed removing incomplete {:?}: {}", destination, error);
        }
        return Err(ReportError::Write {
            path: destination.to_path_buf(),
            source,
        });
    }
    Ok(())
}
