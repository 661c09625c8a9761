//! Loading the shared password out of an authfile.
//!
//! An authfile is a plain text file. Its first line (the bytes before the
//! first `\n`, or the whole file if it has no newline) is the password. An
//! empty file means "no password required". A file with more than one
//! non-empty line is malformed.

use std::path::Path;

#[derive(Debug, thiserror::Error)]
pub enum AuthfileError {
    #[error("could not read authfile: {0}")]
    Io(#[from] std::io::Error),
    #[error("authfile has more than one non-empty line")]
    TooManyLines,
}

/// Returns `None` when the file is empty (no password required), or the
/// password otherwise. The password is the literal first line, blank or
/// not; only the lines after it are scanned for a second non-empty line.
pub fn load_password(path: &Path) -> Result<Option<String>, AuthfileError> {
    let contents = std::fs::read_to_string(path)?;
    let mut lines = contents.lines();
    let password = match lines.next() {
        None => return Ok(None),
        Some(first) => first.to_string(),
    };
    if lines.any(|l| !l.is_empty()) {
        return Err(AuthfileError::TooManyLines);
    }
    Ok(Some(password))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_tmp(contents: &str) -> tempfile::NamedTempFile {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(contents.as_bytes()).unwrap();
        f
    }

    #[test]
    fn empty_file_means_no_password() {
        let f = write_tmp("");
        assert_eq!(load_password(f.path()).unwrap(), None);
    }

    #[test]
    fn single_line_is_the_password() {
        let f = write_tmp("hunter2\n");
        assert_eq!(load_password(f.path()).unwrap(), Some("hunter2".to_string()));
    }

    #[test]
    fn single_line_without_trailing_newline() {
        let f = write_tmp("hunter2");
        assert_eq!(load_password(f.path()).unwrap(), Some("hunter2".to_string()));
    }

    #[test]
    fn leading_blank_line_is_the_empty_password_not_skipped() {
        let f = write_tmp("\nhunter2\n");
        assert!(matches!(load_password(f.path()), Err(AuthfileError::TooManyLines)));
    }

    #[test]
    fn trailing_blank_lines_after_the_password_are_ignored() {
        let f = write_tmp("hunter2\n\n\n");
        assert_eq!(load_password(f.path()).unwrap(), Some("hunter2".to_string()));
    }

    #[test]
    fn two_non_empty_lines_is_an_error() {
        let f = write_tmp("hunter2\nextra\n");
        assert!(matches!(load_password(f.path()), Err(AuthfileError::TooManyLines)));
    }

    #[test]
    fn missing_file_is_io_error() {
        let result = load_password(Path::new("/nonexistent/path/to/authfile"));
        assert!(matches!(result, Err(AuthfileError::Io(_))));
    }
}
