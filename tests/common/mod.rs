#![allow(dead_code)]

use anyhow::Result;
use filetime::FileTime;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use walkdir::WalkDir;

/// Two sibling trees, `mac/saves` and `handheld/saves`, in a temp dir.
pub struct TestTrees {
    pub temp_dir: TempDir,
    pub mac: PathBuf,
    pub handheld: PathBuf,
}

impl TestTrees {
    pub fn new() -> Result<Self> {
        let temp_dir = TempDir::new()?;
        let mac = temp_dir.path().join("mac/saves");
        let handheld = temp_dir.path().join("handheld/saves");
        fs::create_dir_all(&mac)?;
        fs::create_dir_all(&handheld)?;
        Ok(Self {
            temp_dir,
            mac,
            handheld,
        })
    }

    /// Creates `states` next to both saves directories.
    pub fn with_states(self) -> Result<Self> {
        fs::create_dir_all(self.mac_states())?;
        fs::create_dir_all(self.handheld_states())?;
        Ok(self)
    }

    pub fn mac_states(&self) -> PathBuf {
        self.temp_dir.path().join("mac/states")
    }

    pub fn handheld_states(&self) -> PathBuf {
        self.temp_dir.path().join("handheld/states")
    }

    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }
}

pub fn write(root: &Path, rel: &str, content: &[u8]) -> Result<PathBuf> {
    let path = root.join(rel);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(&path, content)?;
    Ok(path)
}

pub fn write_with_mtime(root: &Path, rel: &str, content: &[u8], secs: i64) -> Result<PathBuf> {
    let path = write(root, rel, content)?;
    filetime::set_file_mtime(&path, FileTime::from_unix_time(secs, 0))?;
    Ok(path)
}

pub fn mtime(path: &Path) -> Result<FileTime> {
    Ok(FileTime::from_last_modification_time(&fs::metadata(path)?))
}

/// Every regular file under `root` mapped to (content, mtime).
pub fn snapshot(root: &Path) -> Result<BTreeMap<PathBuf, (Vec<u8>, FileTime)>> {
    let mut files = BTreeMap::new();
    for entry in WalkDir::new(root) {
        let entry = entry?;
        if entry.file_type().is_file() {
            let rel = entry.path().strip_prefix(root)?.to_path_buf();
            files.insert(rel, (fs::read(entry.path())?, mtime(entry.path())?));
        }
    }
    Ok(files)
}

/// Relative paths of every regular file under `root`, sorted.
pub fn file_list(root: &Path) -> Result<Vec<String>> {
    Ok(snapshot(root)?
        .into_keys()
        .map(|p| p.to_string_lossy().replace('\\', "/"))
        .collect())
}
