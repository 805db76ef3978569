//! Optional TOML file with credentials.
//!
//! The file holds the same keys as the environment, for example:
//!
//! ```toml
//! ACCESS_TOKEN = "oauth:..."
//! SPOTIFY_CLIENT_SECRET = "..."
//! USER_ID = 123456
//! ```
//!
//! Keep this file secure: it grants access to both the Twitch and Spotify
//! accounts.

use std::{collections::HashMap, fs, path::Path};

use crate::error::{Error, Result};

/// Upper bound on the secrets file size. A handful of keys never come near
/// it, and it keeps a wrong path from reading a huge file into memory.
const MAX_FILE_SIZE: u64 = 16 * 1024;

/// Loads key/value pairs from a TOML secrets file.
///
/// String, integer and boolean values are accepted and stored in their
/// string form. Tables and arrays are rejected.
///
/// # Errors
///
/// Returns an error if the file cannot be read, is larger than 16 KiB, is
/// not valid TOML or contains values that are not scalars.
pub fn load<P: AsRef<Path>>(path: P) -> Result<HashMap<String, String>> {
    let path = path.as_ref();

    let file_size = fs::metadata(path)?.len();
    if file_size > MAX_FILE_SIZE {
        return Err(Error::out_of_range(format!(
            "{} is too large ({file_size} bytes)",
            path.display()
        )));
    }

    let contents = fs::read_to_string(path)?;
    parse(&contents)
}

/// Parses the contents of a secrets file.
///
/// # Errors
///
/// Returns an error if `contents` is not valid TOML or contains values that
/// are not scalars.
pub fn parse(contents: &str) -> Result<HashMap<String, String>> {
    let table = contents.parse::<toml::Table>()?;

    table
        .into_iter()
        .map(|(key, value)| {
            let value = match value {
                toml::Value::String(s) => s,
                toml::Value::Integer(i) => i.to_string(),
                toml::Value::Boolean(b) => b.to_string(),
                other => {
                    return Err(Error::invalid_argument(format!(
                        "{key} must be a string, not {}",
                        other.type_str()
                    )))
                }
            };
            Ok((key, value))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalars_become_strings() {
        let secrets = parse(
            r#"
            ACCESS_TOKEN = "oauth:abc"
            USER_ID = 123456
            "#,
        )
        .unwrap();

        assert_eq!(secrets["ACCESS_TOKEN"], "oauth:abc");
        assert_eq!(secrets["USER_ID"], "123456");
    }

    #[test]
    fn tables_are_rejected() {
        let result = parse("[spotify]\nclient_id = \"x\"\n");
        assert!(result.is_err());
    }

    #[test]
    fn missing_file_is_not_found() {
        let err = load("/nonexistent/pointify/secrets.toml").unwrap_err();
        assert_eq!(err.kind, crate::error::ErrorKind::NotFound);
    }
}
