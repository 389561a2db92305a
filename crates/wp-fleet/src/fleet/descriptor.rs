//! Reads and rewrites the debug flag inside a server's `docker-compose.yml`.
//!
//! The descriptor is handled as opaque bytes. Only the literal tokens
//! `WORDPRESS_DEBUG=<bool>` and `WORDPRESS_DEBUG_LOG=<bool>` are looked at; nothing else in
//! the file is parsed or touched.

use std::{
    fs::{self, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
};

use tracing::debug;

use crate::error::CoreError;

/// File name of the deployment descriptor inside a server directory.
pub const DESCRIPTOR_FILE: &str = "docker-compose.yml";

const DEBUG_KEY: &str = "WORDPRESS_DEBUG=";
const DEBUG_LOG_KEY: &str = "WORDPRESS_DEBUG_LOG=";

#[cfg(unix)]
const DESCRIPTOR_MODE: u32 = 0o644;

/// Location of the descriptor for a server directory: `<server_path>/docker-compose.yml`.
///
/// The separator is always appended, so an empty server path points at
/// `/docker-compose.yml` rather than a file in the working directory.
pub fn descriptor_path(server_path: &Path) -> PathBuf {
    let mut path = server_path.as_os_str().to_os_string();
    path.push("/");
    path.push(DESCRIPTOR_FILE);
    PathBuf::from(path)
}

/// Whether the descriptor contains `WORDPRESS_DEBUG=true` anywhere.
///
/// The search is an unanchored substring match, so a commented-out line counts too.
pub fn is_debug_enabled(server_path: &Path) -> Result<bool, CoreError> {
    let path = descriptor_path(server_path);
    let content = read_descriptor(&path)?;
    Ok(contains(&content, format!("{DEBUG_KEY}true").as_bytes()))
}

/// Rewrite the descriptor so both debug tokens read `enable`.
///
/// Each token is replaced at its first occurrence only. A token that is not currently set to
/// the opposite value is left alone and the call still succeeds, which can leave
/// `WORDPRESS_DEBUG` and `WORDPRESS_DEBUG_LOG` out of step.
pub fn toggle_debug(server_path: &Path, enable: bool) -> Result<(), CoreError> {
    let path = descriptor_path(server_path);
    let content = read_descriptor(&path)?;
    let updated = rewrite_debug_tokens(&content, enable);
    if updated == content {
        debug!(path = %path.display(), enable, "descriptor already in requested state");
    }
    write_descriptor(&path, &updated)
}

/// Apply the token swap of [`toggle_debug`] to an in-memory buffer.
pub fn rewrite_debug_tokens(content: &[u8], enable: bool) -> Vec<u8> {
    let (old, new) = if enable { ("false", "true") } else { ("true", "false") };
    let content = replace_first(
        content,
        format!("{DEBUG_KEY}{old}").as_bytes(),
        format!("{DEBUG_KEY}{new}").as_bytes(),
    );
    replace_first(
        &content,
        format!("{DEBUG_LOG_KEY}{old}").as_bytes(),
        format!("{DEBUG_LOG_KEY}{new}").as_bytes(),
    )
}

fn read_descriptor(path: &Path) -> Result<Vec<u8>, CoreError> {
    fs::read(path).map_err(|source| CoreError::ReadDescriptor { path: path.to_path_buf(), source })
}

fn write_descriptor(path: &Path, content: &[u8]) -> Result<(), CoreError> {
    let mut options = OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt as _;
        options.mode(DESCRIPTOR_MODE);
    }
    options
        .open(path)
        .and_then(|mut file| file.write_all(content))
        .map_err(|source| CoreError::WriteDescriptor { path: path.to_path_buf(), source })
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || needle.len() > haystack.len() {
        return None;
    }
    haystack.windows(needle.len()).position(|window| window == needle)
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    find(haystack, needle).is_some()
}

fn replace_first(haystack: &[u8], from: &[u8], to: &[u8]) -> Vec<u8> {
    match find(haystack, from) {
        Some(start) => {
            let mut out = Vec::with_capacity(haystack.len() - from.len() + to.len());
            out.extend_from_slice(&haystack[..start]);
            out.extend_from_slice(to);
            out.extend_from_slice(&haystack[start + from.len()..]);
            out
        }
        None => haystack.to_vec(),
    }
}

#[cfg(test)]
mod tests {
    use tempfile::{TempDir, tempdir};

    use super::*;

    const COMPOSE_DISABLED: &str = r#"services:
  wordpress:
    image: wordpress:6
    environment:
      - WORDPRESS_DB_HOST=db
      - WORDPRESS_DEBUG=false
      - WORDPRESS_DEBUG_LOG=false
"#;

    fn server_dir(content: &str) -> TempDir {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join(DESCRIPTOR_FILE), content).unwrap();
        dir
    }

    fn read(dir: &TempDir) -> String {
        fs::read_to_string(dir.path().join(DESCRIPTOR_FILE)).unwrap()
    }

    #[test]
    fn reports_disabled_and_enabled() {
        let dir = server_dir(COMPOSE_DISABLED);
        assert!(!is_debug_enabled(dir.path()).unwrap());

        let enabled = server_dir(&COMPOSE_DISABLED.replace("DEBUG=false", "DEBUG=true"));
        assert!(is_debug_enabled(enabled.path()).unwrap());
    }

    #[test]
    fn absent_token_reads_as_disabled() {
        let dir = server_dir("services: {}\n");
        assert!(!is_debug_enabled(dir.path()).unwrap());
    }

    #[test]
    fn commented_token_still_counts_as_enabled() {
        let dir = server_dir("# WORDPRESS_DEBUG=true (disabled below)\nWORDPRESS_DEBUG=false\n");
        assert!(is_debug_enabled(dir.path()).unwrap());
    }

    #[test]
    fn descriptor_path_appends_file_name() {
        assert_eq!(
            descriptor_path(Path::new("/srv/blog")),
            Path::new("/srv/blog/docker-compose.yml")
        );
        assert_eq!(descriptor_path(Path::new("")), Path::new("/docker-compose.yml"));
        assert_eq!(descriptor_path(Path::new("blog")), Path::new("blog/docker-compose.yml"));
    }

    #[test]
    fn missing_descriptor_is_a_read_error() {
        let dir = tempdir().unwrap();
        let err = is_debug_enabled(dir.path()).unwrap_err();
        assert!(matches!(err, CoreError::ReadDescriptor { .. }), "unexpected error: {err:?}");
        assert_eq!(err.path(), Some(descriptor_path(dir.path()).as_path()));
    }

    #[test]
    fn enable_then_disable_restores_original_bytes() {
        let dir = server_dir(COMPOSE_DISABLED);

        toggle_debug(dir.path(), true).unwrap();
        let enabled = read(&dir);
        assert!(enabled.contains("WORDPRESS_DEBUG=true"));
        assert!(enabled.contains("WORDPRESS_DEBUG_LOG=true"));
        assert_eq!(enabled.len(), COMPOSE_DISABLED.len() - 2);
        assert!(is_debug_enabled(dir.path()).unwrap());

        toggle_debug(dir.path(), false).unwrap();
        assert_eq!(read(&dir), COMPOSE_DISABLED);
    }

    #[test]
    fn only_first_occurrence_is_replaced() {
        let original = "WORDPRESS_DEBUG=true\nWORDPRESS_DEBUG=true\n";
        let rewritten = rewrite_debug_tokens(original.as_bytes(), false);
        assert_eq!(rewritten, b"WORDPRESS_DEBUG=false\nWORDPRESS_DEBUG=true\n");
    }

    // Known risk: with the _LOG token absent the two flags drift apart and the call
    // still reports success.
    #[test]
    fn known_risk_missing_log_token_is_silently_skipped() {
        let dir = server_dir("env:\n  - WORDPRESS_DEBUG=true\n");
        toggle_debug(dir.path(), false).unwrap();
        assert_eq!(read(&dir), "env:\n  - WORDPRESS_DEBUG=false\n");
    }

    // Known risk: asking for the state the file is already in changes nothing and succeeds.
    #[test]
    fn known_risk_toggle_to_current_state_is_a_no_op() {
        let dir = server_dir(COMPOSE_DISABLED);
        toggle_debug(dir.path(), false).unwrap();
        assert_eq!(read(&dir), COMPOSE_DISABLED);
    }

    #[test]
    fn toggle_without_descriptor_fails_before_writing() {
        let dir = tempdir().unwrap();
        let err = toggle_debug(dir.path(), true).unwrap_err();
        assert!(matches!(err, CoreError::ReadDescriptor { .. }), "unexpected error: {err:?}");
        assert!(!descriptor_path(dir.path()).exists());
    }

    #[test]
    fn non_utf8_content_is_preserved() {
        let mut original = b"\xff\xfe header\n".to_vec();
        original.extend_from_slice(b"WORDPRESS_DEBUG=false\nWORDPRESS_DEBUG_LOG=false\n");
        let rewritten = rewrite_debug_tokens(&original, true);
        assert!(rewritten.starts_with(b"\xff\xfe header\n"));
        assert_eq!(rewrite_debug_tokens(&rewritten, false), original);
    }
}
