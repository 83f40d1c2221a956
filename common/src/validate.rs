//! Validation of user supplied transfer parameters

use std::path::{Path, PathBuf};

/// Longest user name accepted on the target system
pub const MAX_USERNAME_LEN: usize = 25;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("path does not exist: {0:?}")]
    Missing(PathBuf),
    #[error("path is not a directory: {0:?}")]
    NotADirectory(PathBuf),
    #[error("path is not absolute: {0}")]
    NotAbsolute(String),
    #[error("user name must be between 1 and {MAX_USERNAME_LEN} characters")]
    Username,
    #[error("private key does not exist: {0:?}")]
    MissingKey(PathBuf),
    #[error("not a positive number: {0}")]
    NotANumber(String),
    #[error("please enter either 'Y' or 'N'")]
    YesNo,
}

fn absolute(path: &Path, cwd: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        cwd.join(path)
    }
}

/// Resolve `path` against `cwd` and require an existing directory
pub fn absolute_directory(path: &Path, cwd: &Path) -> Result<PathBuf, ValidationError> {
    let path = absolute(path, cwd);
    match std::fs::metadata(&path) {
        Ok(metadata) if metadata.is_dir() => Ok(path),
        Ok(_) => Err(ValidationError::NotADirectory(path)),
        Err(_) => Err(ValidationError::Missing(path)),
    }
}

/// Target directories live on the remote host and can only be checked for being absolute
pub fn absolute_target_dir(target_dir: &str) -> Result<String, ValidationError> {
    if Path::new(target_dir).is_absolute() {
        Ok(target_dir.to_string())
    } else {
        Err(ValidationError::NotAbsolute(target_dir.to_string()))
    }
}

pub fn username(name: &str) -> Result<String, ValidationError> {
    if name.is_empty() || name.chars().count() > MAX_USERNAME_LEN {
        return Err(ValidationError::Username);
    }
    Ok(name.to_string())
}

/// Require an existing private key, returned as an absolute path
pub fn private_key(path: &Path, cwd: &Path) -> Result<PathBuf, ValidationError> {
    let path = absolute(path, cwd);
    if path.exists() {
        Ok(path)
    } else {
        Err(ValidationError::MissingKey(path))
    }
}

pub fn connections(value: &str) -> Result<u32, ValidationError> {
    match value.trim().parse::<u32>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(ValidationError::NotANumber(value.to_string())),
    }
}

/// Accepts y/n in either case
pub fn yes_no(value: &str) -> Result<bool, ValidationError> {
    match value.trim().to_ascii_uppercase().as_str() {
        "Y" => Ok(true),
        "N" => Ok(false),
        _ => Err(ValidationError::YesNo),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn directory_resolution() -> anyhow::Result<()> {
        let tmp_dir = tempfile::tempdir()?;
        std::fs::create_dir(tmp_dir.path().join("reads"))?;
        std::fs::write(tmp_dir.path().join("notes.txt"), "x")?;
        let cwd = tmp_dir.path();
        assert_eq!(
            absolute_directory(Path::new("reads"), cwd)?,
            cwd.join("reads")
        );
        assert_eq!(absolute_directory(cwd, Path::new("/elsewhere"))?, cwd);
        assert_eq!(
            absolute_directory(Path::new("notes.txt"), cwd),
            Err(ValidationError::NotADirectory(cwd.join("notes.txt")))
        );
        assert_eq!(
            absolute_directory(Path::new("/test/dir/bad"), cwd),
            Err(ValidationError::Missing(PathBuf::from("/test/dir/bad")))
        );
        Ok(())
    }

    #[test]
    fn target_dir_must_be_absolute() {
        assert_eq!(
            absolute_target_dir("/good/target_dir"),
            Ok("/good/target_dir".to_string())
        );
        assert_eq!(
            absolute_target_dir("bad_target_dir"),
            Err(ValidationError::NotAbsolute("bad_target_dir".to_string()))
        );
    }

    #[test]
    fn username_length() {
        assert_eq!(username("good_username"), Ok("good_username".to_string()));
        assert_eq!(username(&"a".repeat(25)), Ok("a".repeat(25)));
        assert_eq!(
            username("this_is_a_really_long_username_that_is_not_allowed"),
            Err(ValidationError::Username)
        );
        assert_eq!(username(""), Err(ValidationError::Username));
    }

    #[test]
    fn private_key_must_exist() -> anyhow::Result<()> {
        let tmp_dir = tempfile::tempdir()?;
        std::fs::write(tmp_dir.path().join("id_rsa"), "key")?;
        assert_eq!(
            private_key(Path::new("id_rsa"), tmp_dir.path())?,
            tmp_dir.path().join("id_rsa")
        );
        assert!(matches!(
            private_key(Path::new("missing_key"), tmp_dir.path()),
            Err(ValidationError::MissingKey(_))
        ));
        Ok(())
    }

    #[test]
    fn connection_count() {
        assert_eq!(connections("10"), Ok(10));
        assert_eq!(connections(" 4 "), Ok(4));
        assert!(connections("0").is_err());
        assert!(connections("-1").is_err());
        assert!(connections("many").is_err());
    }

    #[test]
    fn yes_no_answers() {
        assert_eq!(yes_no("y"), Ok(true));
        assert_eq!(yes_no("N"), Ok(false));
        assert_eq!(yes_no("maybe"), Err(ValidationError::YesNo));
    }
}
