//! Sandboxed loading of foreign configuration sources.
//!
//! A configuration can come from an arbitrary user-supplied file. Each
//! `ConfigLoader` owns a fresh temporary directory into which every source
//! is first copied under a synthesized, globally-unique unit name, and
//! registers that directory on the process-wide search path for its
//! lifetime. A staged unit therefore stays resolvable by name (see
//! [`resolve_unit`]) until its loader is released, which is what lets
//! artifacts derived from it be referenced again later, e.g. when handing
//! configuration to worker processes.
//!
//! Two unit flavors are supported: *data units* (`.yaml`, `.yml`,
//! `.json`) are parsed directly, and any other file is treated as an
//! executable generator, run as a subprocess whose stdout must be a
//! serialized raw configuration mapping.

use crate::error::Result;
use crate::overrides::apply_overrides;
use crate::schema::GraphConfig;
use crate::validate::parse_config;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::{Mutex, MutexGuard};
use tempfile::TempDir;
use thiserror::Error;
use uuid::Uuid;

/// Failure while turning a foreign source file into a raw configuration.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("cannot create the load-unit directory: {source}")]
    Setup {
        #[source]
        source: std::io::Error,
    },

    #[error("config source `{}` cannot be staged: {source}", path.display())]
    Stage {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("config source `{}` is not valid YAML or JSON: {reason}", path.display())]
    Parse { path: PathBuf, reason: String },

    #[error("config generator `{}` failed: {reason}", path.display())]
    Generator { path: PathBuf, reason: String },

    #[error("config source `{}` did not produce a mapping", path.display())]
    NotAMapping { path: PathBuf },

    #[error("loader already released")]
    Closed,
}

/// Process-wide list of directories holding active load units. Loaders
/// append exactly one entry on acquisition and remove exactly that entry,
/// by value, on release.
static SEARCH_PATH: Mutex<Vec<PathBuf>> = Mutex::new(Vec::new());

fn search_path() -> MutexGuard<'static, Vec<PathBuf>> {
    SEARCH_PATH.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// The directories currently registered by live loaders.
pub fn search_path_snapshot() -> Vec<PathBuf> {
    search_path().clone()
}

/// Register an extra directory on the process-wide search path, outside
/// any loader's lifetime management. Units already present in it become
/// resolvable by name; the entry stays until process exit.
pub fn register_search_path(dir: &Path) {
    search_path().push(dir.to_path_buf());
}

/// Resolve a staged unit name to its on-disk path, looking through every
/// active loader's directory.
pub fn resolve_unit(name: &str) -> Option<PathBuf> {
    for dir in search_path_snapshot() {
        let Ok(entries) = fs::read_dir(&dir) else { continue };
        for entry in entries.flatten() {
            let path = entry.path();
            if path.file_stem().and_then(|stem| stem.to_str()) == Some(name) {
                return Some(path);
            }
        }
    }
    None
}

/// Stages foreign configuration sources as uniquely-named load units and
/// turns them into raw (and, on request, validated) configurations.
///
/// Loaders may coexist, also across threads: every instance owns its own
/// directory and every staged unit gets a fresh random name, so no lock
/// beyond the search-path registry itself is involved.
#[derive(Debug)]
pub struct ConfigLoader {
    unit_dir: Option<TempDir>,
}

impl ConfigLoader {
    /// Create a loader with a fresh unit directory, registered on the
    /// process-wide search path.
    pub fn new() -> Result<Self> {
        let unit_dir = tempfile::Builder::new()
            .prefix("grafo_config_")
            .tempdir()
            .map_err(|source| LoadError::Setup { source })?;
        search_path().push(unit_dir.path().to_path_buf());
        Ok(Self { unit_dir: Some(unit_dir) })
    }

    /// Stage `path` as a new load unit, produce its raw configuration, and
    /// apply `overrides` to it.
    pub fn load_raw(&self, path: &Path, overrides: &[String]) -> Result<Value> {
        let dir = self.unit_dir.as_ref().ok_or(LoadError::Closed)?;
        let unit = format!("graph_config_{}", Uuid::new_v4().simple());
        let mut file_name = unit.clone();
        if let Some(extension) = path.extension().and_then(|ext| ext.to_str()) {
            file_name.push('.');
            file_name.push_str(extension);
        }
        let staged = dir.path().join(file_name);
        fs::copy(path, &staged).map_err(|source| LoadError::Stage {
            path: path.to_path_buf(),
            source,
        })?;
        let raw = produce_raw(path, &staged)?;
        if !raw.is_object() {
            return Err(LoadError::NotAMapping { path: path.to_path_buf() }.into());
        }
        Ok(apply_overrides(&raw, overrides)?)
    }

    /// [`load_raw`](Self::load_raw) followed by validation into the typed
    /// configuration.
    pub fn load_config(&self, path: &Path, overrides: &[String]) -> Result<GraphConfig> {
        let raw = self.load_raw(path, overrides)?;
        Ok(parse_config(&raw)?)
    }

    /// Release the loader: drop its search-path entry and delete its unit
    /// directory. Safe to call more than once; also runs on drop, and
    /// tolerates the directory having disappeared underneath it.
    pub fn close(&mut self) {
        if let Some(dir) = self.unit_dir.take() {
            let mut entries = search_path();
            if let Some(position) = entries.iter().position(|entry| entry == dir.path()) {
                entries.remove(position);
            }
            drop(entries);
            if let Err(err) = dir.close() {
                tracing::debug!("load-unit directory cleanup failed: {err}");
            }
        }
    }
}

impl Drop for ConfigLoader {
    fn drop(&mut self) {
        self.close();
    }
}

fn is_data_unit(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|ext| ext.to_str()),
        Some("yaml" | "yml" | "json")
    )
}

fn produce_raw(origin: &Path, staged: &Path) -> std::result::Result<Value, LoadError> {
    if is_data_unit(origin) {
        let text = fs::read_to_string(staged).map_err(|source| LoadError::Stage {
            path: origin.to_path_buf(),
            source,
        })?;
        serde_yaml::from_str(&text).map_err(|err| LoadError::Parse {
            path: origin.to_path_buf(),
            reason: err.to_string(),
        })
    } else {
        let output = Command::new(staged).output().map_err(|err| LoadError::Generator {
            path: origin.to_path_buf(),
            reason: err.to_string(),
        })?;
        if !output.status.success() {
            return Err(LoadError::Generator {
                path: origin.to_path_buf(),
                reason: format!("exit status {}", output.status),
            });
        }
        let text = String::from_utf8(output.stdout).map_err(|_| LoadError::Generator {
            path: origin.to_path_buf(),
            reason: "stdout is not valid UTF-8".to_string(),
        })?;
        serde_yaml::from_str(&text).map_err(|err| LoadError::Parse {
            path: origin.to_path_buf(),
            reason: err.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const MINIMAL_YAML: &str = r#"
entities:
  user:
    num_partitions: 1
relations:
  - name: follows
    lhs: user
    rhs: user
dimension: 100
entity_path: /e
edge_paths: [/p]
checkpoint_path: /c
"#;

    fn write_config_file(dir: &Path, name: &str, contents: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_load_raw_data_unit() {
        let source_dir = tempfile::tempdir().unwrap();
        let source = write_config_file(source_dir.path(), "config.yaml", MINIMAL_YAML);

        let loader = ConfigLoader::new().unwrap();
        let raw = loader.load_raw(&source, &[]).unwrap();
        assert_eq!(raw["dimension"], json!(100));
        assert_eq!(raw["entities"]["user"]["num_partitions"], json!(1));
    }

    #[test]
    fn test_load_raw_applies_overrides() {
        let source_dir = tempfile::tempdir().unwrap();
        let source = write_config_file(source_dir.path(), "config.yaml", MINIMAL_YAML);

        let loader = ConfigLoader::new().unwrap();
        let raw = loader
            .load_raw(&source, &["dimension=400".to_string(), "edge_paths=/a,/b".to_string()])
            .unwrap();
        assert_eq!(raw["dimension"], json!(400));
        assert_eq!(raw["edge_paths"], json!(["/a", "/b"]));
    }

    #[test]
    fn test_load_config_end_to_end() {
        let source_dir = tempfile::tempdir().unwrap();
        let source = write_config_file(source_dir.path(), "config.yml", MINIMAL_YAML);

        let loader = ConfigLoader::new().unwrap();
        let config = loader
            .load_config(&source, &["relations.0.weight=2.5".to_string()])
            .unwrap();
        assert_eq!(config.relations[0].weight, 2.5);
        assert_eq!(config.batch_size, 1000);
    }

    #[test]
    fn test_missing_source() {
        let loader = ConfigLoader::new().unwrap();
        let err = loader.load_raw(Path::new("/no/such/config.yaml"), &[]).unwrap_err();
        assert!(err.to_string().contains("cannot be staged"), "{err}");
    }

    #[test]
    fn test_malformed_source() {
        let source_dir = tempfile::tempdir().unwrap();
        let source = write_config_file(source_dir.path(), "config.yaml", "a: [}");

        let loader = ConfigLoader::new().unwrap();
        let err = loader.load_raw(&source, &[]).unwrap_err();
        assert!(err.to_string().contains("not valid YAML or JSON"), "{err}");
    }

    #[test]
    fn test_non_mapping_source() {
        let source_dir = tempfile::tempdir().unwrap();
        let source = write_config_file(source_dir.path(), "config.yaml", "- just\n- a\n- list\n");

        let loader = ConfigLoader::new().unwrap();
        let err = loader.load_raw(&source, &[]).unwrap_err();
        assert!(err.to_string().contains("did not produce a mapping"), "{err}");
    }

    #[cfg(unix)]
    #[test]
    fn test_generator_unit() {
        use std::io::Write;
        use std::os::unix::fs::PermissionsExt;

        let source_dir = tempfile::tempdir().unwrap();
        let script = source_dir.path().join("make_config.sh");
        {
            let mut file = fs::File::create(&script).unwrap();
            writeln!(file, "#!/bin/sh").unwrap();
            writeln!(file, "cat <<'EOF'").unwrap();
            writeln!(file, "{}", MINIMAL_YAML.trim()).unwrap();
            writeln!(file, "EOF").unwrap();
        }
        fs::set_permissions(&script, fs::Permissions::from_mode(0o755)).unwrap();

        let loader = ConfigLoader::new().unwrap();
        let config = loader.load_config(&script, &[]).unwrap();
        assert_eq!(config.dimension, 100);
    }

    #[test]
    fn test_staged_unit_is_resolvable_until_release() {
        let source_dir = tempfile::tempdir().unwrap();
        let source = write_config_file(source_dir.path(), "config.yaml", MINIMAL_YAML);

        let mut loader = ConfigLoader::new().unwrap();
        loader.load_raw(&source, &[]).unwrap();
        let unit_dir = loader.unit_dir.as_ref().unwrap().path().to_path_buf();

        let staged: Vec<_> = fs::read_dir(&unit_dir).unwrap().flatten().collect();
        assert_eq!(staged.len(), 1);
        let name = staged[0].path();
        let name = name.file_stem().unwrap().to_str().unwrap().to_string();
        assert!(name.starts_with("graph_config_"));
        assert_eq!(resolve_unit(&name), Some(staged[0].path()));

        loader.close();
        assert_eq!(resolve_unit(&name), None);
    }

    #[test]
    fn test_externally_registered_directory_is_searched() {
        let extra = tempfile::tempdir().unwrap();
        write_config_file(extra.path(), "graph_config_pinned.yaml", MINIMAL_YAML);

        assert_eq!(resolve_unit("graph_config_pinned"), None);
        register_search_path(extra.path());
        assert_eq!(
            resolve_unit("graph_config_pinned"),
            Some(extra.path().join("graph_config_pinned.yaml"))
        );
        // Manual entries are not lifetime-managed; drop ours to keep the
        // registry clean for the other tests.
        let mut entries = search_path();
        if let Some(position) = entries.iter().position(|entry| entry == extra.path()) {
            entries.remove(position);
        }
    }

    #[test]
    fn test_release_is_idempotent() {
        let mut loader = ConfigLoader::new().unwrap();
        let unit_dir = loader.unit_dir.as_ref().unwrap().path().to_path_buf();
        assert!(search_path_snapshot().contains(&unit_dir));

        loader.close();
        assert!(!search_path_snapshot().contains(&unit_dir));
        assert!(!unit_dir.exists());

        loader.close();
        drop(loader);
        assert!(!search_path_snapshot().contains(&unit_dir));
    }

    #[test]
    fn test_closed_loader_refuses_to_load() {
        let source_dir = tempfile::tempdir().unwrap();
        let source = write_config_file(source_dir.path(), "config.yaml", MINIMAL_YAML);

        let mut loader = ConfigLoader::new().unwrap();
        loader.close();
        let err = loader.load_raw(&source, &[]).unwrap_err();
        assert!(err.to_string().contains("already released"), "{err}");
    }

    #[test]
    fn test_concurrent_loaders_do_not_interfere() {
        let handles: Vec<_> = (0..4)
            .map(|index| {
                std::thread::spawn(move || {
                    let source_dir = tempfile::tempdir().unwrap();
                    let source =
                        write_config_file(source_dir.path(), "config.yaml", MINIMAL_YAML);
                    let loader = ConfigLoader::new().unwrap();
                    let unit_dir = loader.unit_dir.as_ref().unwrap().path().to_path_buf();
                    let raw = loader
                        .load_raw(&source, &[format!("dimension={}", 100 + index)])
                        .unwrap();
                    assert_eq!(raw["dimension"], json!(100 + index));
                    assert!(search_path_snapshot().contains(&unit_dir));
                    drop(loader);
                    unit_dir
                })
            })
            .collect();

        for handle in handles {
            let unit_dir = handle.join().unwrap();
            // After release nothing of the loader remains, in the registry
            // or on disk.
            assert!(!search_path_snapshot().contains(&unit_dir));
            assert!(!unit_dir.exists());
        }
    }
}
