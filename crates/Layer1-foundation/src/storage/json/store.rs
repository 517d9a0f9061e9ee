//! JSON 파일 저장소

use crate::{Error, Result};
use serde::{de::DeserializeOwned, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// 글로벌/프로젝트 설정 디렉토리 이름
const APP_DIR: &str = "pdbp";

/// JSON 파일 저장소
///
/// 기본 디렉토리 아래 파일 단위로 로드/저장합니다.
#[derive(Debug, Clone)]
pub struct JsonStore {
    base_dir: PathBuf,
}

impl JsonStore {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    /// 글로벌 설정 (~/.config/pdbp/)
    pub fn global() -> Result<Self> {
        let dir = dirs::config_dir()
            .ok_or_else(|| Error::Config("Cannot find config directory".to_string()))?
            .join(APP_DIR);
        Ok(Self::new(dir))
    }

    /// 프로젝트 설정 (.pdbp/)
    pub fn project(root: impl Into<PathBuf>) -> Self {
        Self::new(root.into().join(format!(".{}", APP_DIR)))
    }

    /// 현재 디렉토리 프로젝트 설정
    pub fn current_project() -> Result<Self> {
        let cwd = std::env::current_dir()
            .map_err(|e| Error::Config(format!("Cannot get current directory: {}", e)))?;
        Ok(Self::project(cwd))
    }

    /// 파일 경로로부터 저장소 + 파일명 분리
    pub fn for_file(path: &Path) -> Result<(Self, String)> {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| Error::Config(format!("Not a file path: {}", path.display())))?;
        let base_dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        Ok((Self::new(base_dir), file_name))
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn file_path(&self, filename: &str) -> PathBuf {
        self.base_dir.join(filename)
    }

    fn ensure_dir(&self) -> Result<()> {
        if !self.base_dir.exists() {
            std::fs::create_dir_all(&self.base_dir)
                .map_err(|e| Error::Config(format!("Failed to create directory: {}", e)))?;
        }
        Ok(())
    }

    /// JSON 로드
    pub fn load<T: DeserializeOwned>(&self, filename: &str) -> Result<T> {
        let path = self.file_path(filename);
        let content = std::fs::read_to_string(&path)
            .map_err(|e| Error::Config(format!("Failed to read {}: {}", path.display(), e)))?;
        serde_json::from_str(&content)
            .map_err(|e| Error::Config(format!("Failed to parse {}: {}", path.display(), e)))
    }

    /// JSON 로드 (Optional)
    pub fn load_optional<T: DeserializeOwned>(&self, filename: &str) -> Result<Option<T>> {
        let path = self.file_path(filename);
        if !path.exists() {
            return Ok(None);
        }
        self.load(filename).map(Some)
    }

    /// JSON 저장
    ///
    /// 임시 파일에 쓴 뒤 rename 하므로 중간에 실패해도 기존 파일은 남습니다.
    pub fn save<T: Serialize>(&self, filename: &str, data: &T) -> Result<()> {
        self.ensure_dir()?;
        let path = self.file_path(filename);
        let tmp_path = self.file_path(&format!("{}.tmp", filename));
        let content = serde_json::to_string_pretty(data)
            .map_err(|e| Error::Config(format!("Failed to serialize: {}", e)))?;
        std::fs::write(&tmp_path, content)
            .map_err(|e| Error::Config(format!("Failed to write {}: {}", tmp_path.display(), e)))?;
        std::fs::rename(&tmp_path, &path)
            .map_err(|e| Error::Config(format!("Failed to write {}: {}", path.display(), e)))?;
        debug!("Saved {}", path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use tempfile::TempDir;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Sample {
        name: String,
        count: u32,
    }

    #[test]
    fn test_save_and_load() {
        let temp = TempDir::new().unwrap();
        let store = JsonStore::new(temp.path().join("nested"));

        let sample = Sample {
            name: "echo".into(),
            count: 3,
        };
        store.save("sample.json", &sample).unwrap();

        assert!(store.file_path("sample.json").exists());
        assert!(!store.file_path("sample.json.tmp").exists());
        let loaded: Sample = store.load("sample.json").unwrap();
        assert_eq!(loaded, sample);
    }

    #[test]
    fn test_load_optional_missing() {
        let temp = TempDir::new().unwrap();
        let store = JsonStore::new(temp.path());

        let loaded: Option<Sample> = store.load_optional("missing.json").unwrap();
        assert!(loaded.is_none());
    }

    #[test]
    fn test_load_invalid_json_is_config_error() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("bad.json"), "{ not json").unwrap();
        let store = JsonStore::new(temp.path());

        let result: Result<Sample> = store.load("bad.json");
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_for_file() {
        let (store, name) = JsonStore::for_file(Path::new("state/plugins.json")).unwrap();
        assert_eq!(store.base_dir(), Path::new("state"));
        assert_eq!(name, "plugins.json");

        let (store, _) = JsonStore::for_file(Path::new("plugins.json")).unwrap();
        assert_eq!(store.base_dir(), Path::new("."));
    }
}
