//! Environment variable interpolation for configuration text
//!
//! Configuration files may embed `%ENV[NAME]` tokens anywhere in their text.
//! Before the TOML parser sees the file, each token is replaced with the
//! value of the named environment variable (the empty string when unset).
//!
//! Substitution is a single left-to-right pass: a substituted value is never
//! re-scanned, so an environment variable whose value itself contains
//! `%ENV[...]` comes through literally.

use std::env;
use std::fs;
use std::path::Path;

use crate::error::{ConfigError, Result};

/// Characters that may not appear in an interpolated variable name
const INVALID_NAME_CHARS: [char; 4] = ['\n', '\r', '\t', ' '];

/// The opening token for an environment reference
const OPEN_DELIM: &str = "ENV[";

/// Expand `%ENV[NAME]` tokens in `input`
///
/// A bare `%` not followed by `ENV[` is copied literally, as is a trailing
/// partial token at end of input. An opened reference with no closing `]`
/// fails with [`ConfigError::MissingCloseDelim`]; a name containing
/// whitespace or a nested `%ENV[` fails with [`ConfigError::InvalidEnvChars`].
pub fn expand(input: &str) -> Result<String> {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(pos) = rest.find('%') {
        out.push_str(&rest[..pos]);
        let after = &rest[pos + 1..];

        let Some(tail) = after.strip_prefix(OPEN_DELIM) else {
            // Just a stray '%', keep it and continue scanning.
            out.push('%');
            rest = after;
            continue;
        };

        let Some(end) = tail.find(']') else {
            return Err(ConfigError::MissingCloseDelim);
        };

        let name = &tail[..end];
        if name.contains(INVALID_NAME_CHARS) || name.contains("%ENV[") {
            return Err(ConfigError::InvalidEnvChars);
        }

        out.push_str(&env::var(name).unwrap_or_default());
        rest = &tail[end + 1..];
    }

    out.push_str(rest);
    Ok(out)
}

/// Read a file and expand `%ENV[NAME]` tokens in its contents
pub fn expand_file<P: AsRef<Path>>(path: P) -> Result<String> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)
        .map_err(|e| ConfigError::io(path.display().to_string(), e))?;
    expand(&contents)
}

#[cfg(test)]
mod tests {
    use super::*;

    // Env mutation is process-wide, so every test uses its own variable name.

    #[test]
    fn test_plain_text_unchanged() {
        let text = "addr = \"127.0.0.1:5565\"\n";
        assert_eq!(expand(text).unwrap(), text);
    }

    #[test]
    fn test_substitutes_host_and_port() {
        unsafe {
            env::set_var("RILL_TEST_HOST", "localhost");
            env::set_var("RILL_TEST_PORT", "9000");
        }
        let out = expand("addr = \"%ENV[RILL_TEST_HOST]:%ENV[RILL_TEST_PORT]\"").unwrap();
        assert_eq!(out, "addr = \"localhost:9000\"");
    }

    #[test]
    fn test_unset_variable_becomes_empty() {
        let out = expand("x = \"%ENV[RILL_TEST_DEFINITELY_UNSET]\"").unwrap();
        assert_eq!(out, "x = \"\"");
    }

    #[test]
    fn test_stray_percent_copied_literally() {
        assert_eq!(expand("load = 100%").unwrap(), "load = 100%");
        assert_eq!(expand("%").unwrap(), "%");
        assert_eq!(expand("a%%b").unwrap(), "a%%b");
    }

    #[test]
    fn test_trailing_partial_token_copied_literally() {
        assert_eq!(expand("tail %EN").unwrap(), "tail %EN");
        assert_eq!(expand("tail %ENV").unwrap(), "tail %ENV");
    }

    #[test]
    fn test_missing_close_delim() {
        let err = expand("x = \"%ENV[NO_CLOSE\"").unwrap_err();
        assert!(matches!(err, ConfigError::MissingCloseDelim));
    }

    #[test]
    fn test_whitespace_in_name_rejected() {
        let err = expand("%ENV[A B]").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvChars));
        let err = expand("%ENV[A\tB]").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvChars));
        let err = expand("%ENV[A\nB]").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvChars));
    }

    #[test]
    fn test_nested_reference_rejected() {
        let err = expand("%ENV[%ENV[INNER]]").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvChars));
    }

    #[test]
    fn test_double_percent_then_reference() {
        unsafe { env::set_var("RILL_TEST_DOUBLE", "v") }
        assert_eq!(expand("%%ENV[RILL_TEST_DOUBLE]").unwrap(), "%v");
    }

    #[test]
    fn test_substituted_value_not_rescanned() {
        unsafe {
            env::set_var("RILL_TEST_OUTER", "%ENV[RILL_TEST_INNER]");
            env::set_var("RILL_TEST_INNER", "surprise");
        }
        let out = expand("x = \"%ENV[RILL_TEST_OUTER]\"").unwrap();
        assert_eq!(out, "x = \"%ENV[RILL_TEST_INNER]\"");
    }

    #[test]
    fn test_expand_file() {
        use std::io::Write;

        unsafe { env::set_var("RILL_TEST_FILE_VAR", "from-file") }
        let mut f = tempfile::NamedTempFile::new().unwrap();
        write!(f, "name = \"%ENV[RILL_TEST_FILE_VAR]\"").unwrap();
        let out = expand_file(f.path()).unwrap();
        assert_eq!(out, "name = \"from-file\"");
    }

    #[test]
    fn test_expand_file_missing() {
        let err = expand_file("/nonexistent/rill.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
