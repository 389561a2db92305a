use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::debug;

const ENTRY_SEPARATOR: char = ',';
const FIELD_SEPARATOR: char = ':';

/// A deployed instance: display name plus the directory holding its descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Server {
    /// Name used by operators to address the server. Not required to be unique.
    pub name: String,
    /// Deployment directory containing `docker-compose.yml`.
    pub path: PathBuf,
}

/// Ordered, read-only list of known servers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServerRegistry {
    servers: Vec<Server>,
}

impl ServerRegistry {
    /// Parse `name:path,name:path,...`.
    ///
    /// Entries with fewer than two colon-separated fields are skipped. Fields past the
    /// second are ignored, so `a:/srv/a:extra` registers `a` at `/srv/a`.
    pub fn load(spec: &str) -> Self {
        let servers = spec
            .split(ENTRY_SEPARATOR)
            .filter_map(|entry| {
                let mut fields = entry.split(FIELD_SEPARATOR);
                match (fields.next(), fields.next()) {
                    (Some(name), Some(path)) => {
                        Some(Server { name: name.to_string(), path: PathBuf::from(path) })
                    }
                    _ => {
                        if !entry.is_empty() {
                            debug!(entry, "skipping malformed server entry");
                        }
                        None
                    }
                }
            })
            .collect();
        Self { servers }
    }

    /// Path of the first server registered under `name`.
    ///
    /// Matching is exact and case-sensitive. A server registered with an empty path is
    /// reported as missing.
    pub fn lookup(&self, name: &str) -> Option<&Path> {
        self.servers
            .iter()
            .find(|server| server.name == name)
            .map(|server| server.path.as_path())
            .filter(|path| !path.as_os_str().is_empty())
    }

    pub fn servers(&self) -> &[Server] {
        &self.servers
    }

    pub fn len(&self) -> usize {
        self.servers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.servers.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Server> {
        self.servers.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(registry: &ServerRegistry) -> Vec<&str> {
        registry.iter().map(|server| server.name.as_str()).collect()
    }

    #[test]
    fn skips_entries_without_path() {
        let registry = ServerRegistry::load("a:/p1,b:/p2,bad,c:/p3");
        assert_eq!(names(&registry), vec!["a", "b", "c"]);
        assert_eq!(registry.lookup("a"), Some(Path::new("/p1")));
        assert_eq!(registry.lookup("c"), Some(Path::new("/p3")));
        assert_eq!(registry.lookup("z"), None);
    }

    #[test]
    fn empty_spec_yields_empty_registry() {
        let registry = ServerRegistry::load("");
        assert!(registry.is_empty());
        assert_eq!(registry.lookup(""), None);
    }

    #[test]
    fn duplicate_names_resolve_to_first_entry() {
        let registry = ServerRegistry::load("blog:/srv/one,blog:/srv/two");
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.lookup("blog"), Some(Path::new("/srv/one")));
    }

    #[test]
    fn lookup_is_exact_and_case_sensitive() {
        let registry = ServerRegistry::load("Blog:/srv/blog, shop:/srv/shop");
        assert_eq!(registry.lookup("blog"), None);
        assert_eq!(registry.lookup("shop"), None);
        assert_eq!(registry.lookup(" shop"), Some(Path::new("/srv/shop")));
    }

    #[test]
    fn empty_path_is_reported_as_missing() {
        let registry = ServerRegistry::load("ghost:,live:/srv/live");
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.lookup("ghost"), None);
        assert_eq!(registry.lookup("live"), Some(Path::new("/srv/live")));
    }

    #[test]
    fn extra_fields_are_ignored() {
        let registry = ServerRegistry::load("a:/srv/a:unused");
        assert_eq!(registry.lookup("a"), Some(Path::new("/srv/a")));
    }
}
