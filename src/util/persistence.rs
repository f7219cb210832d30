use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use directories::ProjectDirs;
use serde::Serialize;
use serde_json::Error as SerdeError;
use tokio::fs;
use tokio::io::AsyncWriteExt;

static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

const APP_QUALIFIER: &str = "com";
const APP_ORG: &str = "HalMarket";
const APP_NAME: &str = "HalMarket";

/// Default location of the preference file.
pub fn preferences_file() -> Option<PathBuf> {
    ProjectDirs::from(APP_QUALIFIER, APP_ORG, APP_NAME)
        .map(|dirs| dirs.config_dir().join("preferences.json"))
}

/// Serializes `value` as pretty JSON and replaces `path` via a sibling temp file,
/// so readers never observe a half-written document.
pub async fn write_json_atomic<T: Serialize + ?Sized>(
    path: &Path,
    value: &T,
) -> Result<(), PersistenceError> {
    let json = serde_json::to_string_pretty(value)?;
    write_atomic(path, json.as_bytes()).await
}

/// Writes `contents` to a uniquely named sibling, syncs it to disk, then renames
/// it over `path`. Concurrent writers each get their own temp file; the last
/// rename wins.
pub async fn write_atomic(path: &Path, contents: &[u8]) -> Result<(), PersistenceError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).await?;
    }

    let temp_path = temp_sibling(path);
    let result = async {
        let mut file = fs::File::create(&temp_path).await?;
        file.write_all(contents).await?;
        file.sync_all().await?;
        drop(file);
        fs::rename(&temp_path, path).await
    }
    .await;

    if let Err(err) = result {
        let _ = fs::remove_file(&temp_path).await;
        return Err(err.into());
    }
    Ok(())
}

/// `<name>.<pid>-<n>.tmp` next to `path`, unique within and across processes.
fn temp_sibling(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    let n = TEMP_COUNTER.fetch_add(1, Ordering::Relaxed);
    name.push(format!(".{}-{n}.tmp", std::process::id()));
    path.with_file_name(name)
}

#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    #[error("storage directory unavailable")]
    StorageUnavailable,
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Serde(#[from] SerdeError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn atomic_write_creates_parents_and_replaces() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("marketData.json");

        write_json_atomic(&path, &vec!["a"]).await.unwrap();
        write_json_atomic(&path, &vec!["b", "c"]).await.unwrap();

        let data = std::fs::read_to_string(&path).unwrap();
        let parsed: Vec<String> = serde_json::from_str(&data).unwrap();
        assert_eq!(parsed, vec!["b", "c"]);
        assert_eq!(std::fs::read_dir(path.parent().unwrap()).unwrap().count(), 1);
    }

    #[test]
    fn temp_sibling_is_unique_and_keeps_directory() {
        let path = Path::new("/data/marketData.json");
        let first = temp_sibling(path);
        let second = temp_sibling(path);

        assert_ne!(first, second);
        for temp in [&first, &second] {
            assert_eq!(temp.parent(), Some(Path::new("/data")));
            let name = temp.file_name().unwrap().to_string_lossy();
            assert!(name.starts_with("marketData.json."));
            assert!(name.ends_with(".tmp"));
        }
    }

    #[tokio::test]
    async fn concurrent_writers_do_not_collide() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("marketData.json");
        let first = vec!["first"; 512];
        let second = vec!["second"; 512];

        let (a, b) = tokio::join!(
            write_json_atomic(&path, &first),
            write_json_atomic(&path, &second)
        );
        a.unwrap();
        b.unwrap();

        let parsed: Vec<String> =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert!(parsed == first || parsed == second);
        let leftovers: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .filter_map(Result::ok)
            .filter(|entry| entry.file_name().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }
}
