//! Server settings and the optional `dream.toml` project manifest.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

/// Client settings, as sent via `workspace/didChangeConfiguration`.
/// Unknown fields are ignored; a payload that does not deserialize leaves
/// the defaults in place.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Settings {
    /// Explicit path to the parse executable, overriding discovery.
    pub compiler_path: Option<PathBuf>,
    /// Cap on diagnostics published per document.
    pub max_problems: Option<usize>,
}

/// Extract [`Settings`] from a configuration payload. Clients commonly nest
/// server settings under a `"dream"` key; accept both shapes.
pub fn settings_from_value(value: &serde_json::Value) -> Settings {
    let scoped = value.get("dream").unwrap_or(value);
    serde_json::from_value(scoped.clone()).unwrap_or_default()
}

#[derive(Debug, Default, Deserialize)]
pub struct DreamToml {
    #[serde(default)]
    pub compiler: CompilerSection,
}

#[derive(Debug, Default, Deserialize)]
pub struct CompilerSection {
    pub path: Option<PathBuf>,
}

/// Walk up from `start` looking for a `dream.toml`.
pub fn find_manifest(start: &Path) -> Option<PathBuf> {
    let mut cur = if start.is_file() {
        start.parent()?.to_path_buf()
    } else {
        start.to_path_buf()
    };

    loop {
        let candidate = cur.join("dream.toml");
        if candidate.exists() {
            return Some(candidate);
        }
        cur = cur.parent()?.to_path_buf();
    }
}

/// Best-effort manifest load; missing or malformed files are ignored.
pub fn load_manifest(path: &Path) -> Option<DreamToml> {
    let raw = fs::read_to_string(path).ok()?;
    toml::from_str(&raw).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn settings_read_from_dream_scope() {
        let v = json!({ "dream": { "compilerPath": "/opt/parse", "maxProblems": 25 } });
        let s = settings_from_value(&v);
        assert_eq!(s.compiler_path.as_deref(), Some(Path::new("/opt/parse")));
        assert_eq!(s.max_problems, Some(25));
    }

    #[test]
    fn settings_accept_unscoped_payload_and_unknown_fields() {
        let v = json!({ "compilerPath": "/usr/bin/parse", "telemetry": true });
        let s = settings_from_value(&v);
        assert_eq!(s.compiler_path.as_deref(), Some(Path::new("/usr/bin/parse")));
        assert_eq!(s.max_problems, None);
    }

    #[test]
    fn bad_settings_payload_keeps_defaults() {
        let s = settings_from_value(&json!("not an object"));
        assert!(s.compiler_path.is_none());
        assert!(s.max_problems.is_none());
    }

    #[test]
    fn manifest_is_found_in_parent_directory() {
        let root = tempfile::tempdir().unwrap();
        fs::write(root.path().join("dream.toml"), "[compiler]\npath = \"bin/parse\"\n").unwrap();
        let nested = root.path().join("src").join("deep");
        fs::create_dir_all(&nested).unwrap();

        let manifest = find_manifest(&nested).unwrap();
        assert_eq!(manifest, root.path().join("dream.toml"));

        let loaded = load_manifest(&manifest).unwrap();
        assert_eq!(loaded.compiler.path.as_deref(), Some(Path::new("bin/parse")));
    }

    #[test]
    fn malformed_manifest_is_ignored() {
        let root = tempfile::tempdir().unwrap();
        let path = root.path().join("dream.toml");
        fs::write(&path, "not [valid toml").unwrap();
        assert!(load_manifest(&path).is_none());
    }
}
