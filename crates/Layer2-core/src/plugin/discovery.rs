//! Plugin Discovery - 플러그인 아티팩트 발견
//!
//! 설정된 디렉토리를 스캔해서 설치 후보(`PluginDescriptor`)를 보고합니다.
//! 레지스트리는 건드리지 않으며 캐시도 없습니다. 호출할 때마다 다시 스캔합니다.
//!
//! 아티팩트 옆에 `<stem>.plugin.json` 매니페스트가 있으면 이름/버전/엔트리 포인트를 읽습니다:
//!
//! ```json
//! { "name": "echo", "version": "1.0.0", "entryPoint": "com.example.Echo" }
//! ```

use super::record::PluginDescriptor;
use glob::Pattern;
use pdbp_foundation::{Error, Result};
use serde::Deserialize;
use std::fs::{self, ReadDir};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// 사이드카 매니페스트 접미사
pub const MANIFEST_SUFFIX: &str = ".plugin.json";

/// 사이드카 매니페스트
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ArtifactManifest {
    name: Option<String>,
    version: Option<String>,
    entry_point: Option<String>,
}

// ============================================================================
// DiscoveryScanner
// ============================================================================

/// 디렉토리 스캐너
#[derive(Debug, Clone)]
pub struct DiscoveryScanner {
    directory: PathBuf,
    patterns: Arc<[Pattern]>,
}

impl DiscoveryScanner {
    /// 디렉토리 + 아티팩트 glob 패턴으로 생성
    pub fn new(directory: impl Into<PathBuf>, patterns: &[String]) -> Result<Self> {
        let patterns = patterns
            .iter()
            .map(|p| {
                Pattern::new(p)
                    .map_err(|e| Error::Config(format!("Invalid artifact pattern {}: {}", p, e)))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            directory: directory.into(),
            patterns: patterns.into(),
        })
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// 기본 디렉토리 스캔 (지연 평가)
    pub fn scan(&self) -> DiscoveryScan {
        self.scan_dir(&self.directory)
    }

    /// 임의 디렉토리 스캔 (지연 평가)
    pub fn scan_dir(&self, directory: &Path) -> DiscoveryScan {
        let entries = match fs::read_dir(directory) {
            Ok(entries) => Some(entries),
            Err(e) => {
                warn!("Cannot read plugin directory {}: {}", directory.display(), e);
                None
            }
        };

        DiscoveryScan {
            entries,
            patterns: Arc::clone(&self.patterns),
            skipped: 0,
        }
    }

    /// 전체 스캔 후 이름순 보고서 생성
    pub fn discover(&self) -> DiscoveryReport {
        self.discover_in(&self.directory)
    }

    pub fn discover_in(&self, directory: &Path) -> DiscoveryReport {
        let mut scan = self.scan_dir(directory);
        let mut descriptors: Vec<PluginDescriptor> = scan.by_ref().collect();
        descriptors.sort_by(|a, b| a.name.cmp(&b.name).then(a.artifact_path.cmp(&b.artifact_path)));

        info!(
            "Discovered {} plugins in {} ({} skipped)",
            descriptors.len(),
            directory.display(),
            scan.skipped()
        );

        DiscoveryReport {
            descriptors,
            skipped: scan.skipped(),
        }
    }
}

/// 스캔 결과
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DiscoveryReport {
    pub descriptors: Vec<PluginDescriptor>,
    /// 손상되었거나 읽을 수 없어서 건너뛴 아티팩트 수
    pub skipped: usize,
}

// ============================================================================
// DiscoveryScan - 지연 평가 이터레이터
// ============================================================================

/// 디렉토리 엔트리를 하나씩 읽는 스캔
pub struct DiscoveryScan {
    entries: Option<ReadDir>,
    patterns: Arc<[Pattern]>,
    skipped: usize,
}

impl DiscoveryScan {
    /// 지금까지 건너뛴 아티팩트 수
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    fn matches(&self, file_name: &str) -> bool {
        !file_name.ends_with(MANIFEST_SUFFIX) && self.patterns.iter().any(|p| p.matches(file_name))
    }

    fn describe(path: &Path, file_name: &str, size_bytes: u64) -> Result<PluginDescriptor> {
        if size_bytes == 0 {
            return Err(Error::InvalidInput(format!("Empty artifact: {}", path.display())));
        }

        let stem = Path::new(file_name)
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| file_name.to_string());

        let manifest_path = path.with_file_name(format!("{}{}", stem, MANIFEST_SUFFIX));
        let manifest = if manifest_path.is_file() {
            let content = fs::read_to_string(&manifest_path)?;
            serde_json::from_str::<ArtifactManifest>(&content)?
        } else {
            ArtifactManifest::default()
        };

        Ok(PluginDescriptor {
            name: manifest.name.filter(|n| !n.is_empty()).unwrap_or(stem),
            artifact_path: path.to_path_buf(),
            entry_point: manifest.entry_point,
            size_bytes,
            version: manifest.version,
        })
    }
}

impl Iterator for DiscoveryScan {
    type Item = PluginDescriptor;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let entry = match self.entries.as_mut()?.next()? {
                Ok(entry) => entry,
                Err(e) => {
                    warn!("Skipping unreadable directory entry: {}", e);
                    self.skipped += 1;
                    continue;
                }
            };

            let file_name = entry.file_name().to_string_lossy().into_owned();
            if !self.matches(&file_name) {
                continue;
            }

            let path = entry.path();
            let metadata = match fs::metadata(&path) {
                Ok(metadata) if metadata.is_file() => metadata,
                Ok(_) => continue,
                Err(e) => {
                    warn!("Skipping unreadable artifact {}: {}", path.display(), e);
                    self.skipped += 1;
                    continue;
                }
            };

            match Self::describe(&path, &file_name, metadata.len()) {
                Ok(descriptor) => {
                    debug!("Found plugin artifact: {} at {}", descriptor.name, path.display());
                    return Some(descriptor);
                }
                Err(e) => {
                    warn!("Skipping malformed artifact {}: {}", path.display(), e);
                    self.skipped += 1;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use tempfile::TempDir;

    fn scanner(dir: &Path) -> DiscoveryScanner {
        let patterns = vec!["*.so".to_string(), "*.jar".to_string()];
        DiscoveryScanner::new(dir, &patterns).unwrap()
    }

    fn names(report: &DiscoveryReport) -> HashSet<String> {
        report.descriptors.iter().map(|d| d.name.clone()).collect()
    }

    #[test]
    fn test_discover_matching_artifacts() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("echo.jar"), b"artifact").unwrap();
        fs::write(temp.path().join("libmetrics.so"), b"elf").unwrap();
        fs::write(temp.path().join("README.md"), b"docs").unwrap();

        let report = scanner(temp.path()).discover();

        assert_eq!(report.skipped, 0);
        assert_eq!(
            names(&report),
            ["echo", "libmetrics"].iter().map(|s| s.to_string()).collect()
        );
        let echo = report.descriptors.iter().find(|d| d.name == "echo").unwrap();
        assert_eq!(echo.size_bytes, 8);
        assert!(echo.entry_point.is_none());
    }

    #[test]
    fn test_discover_is_repeatable_and_grows() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("a.jar"), b"a").unwrap();
        let scanner = scanner(temp.path());

        let first = scanner.discover();
        let second = scanner.discover();
        assert_eq!(first, second);

        fs::write(temp.path().join("b.jar"), b"b").unwrap();
        let third = scanner.discover();
        assert!(names(&third).is_superset(&names(&first)));
        assert_eq!(third.descriptors.len(), 2);
    }

    #[test]
    fn test_sidecar_manifest() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("echo.jar"), b"artifact").unwrap();
        fs::write(
            temp.path().join("echo.plugin.json"),
            r#"{"name":"echo-plugin","version":"2.1.0","entryPoint":"com.example.Echo"}"#,
        )
        .unwrap();

        let report = scanner(temp.path()).discover();

        assert_eq!(report.descriptors.len(), 1);
        let descriptor = &report.descriptors[0];
        assert_eq!(descriptor.name, "echo-plugin");
        assert_eq!(descriptor.entry_point.as_deref(), Some("com.example.Echo"));
        assert_eq!(descriptor.version.as_deref(), Some("2.1.0"));
    }

    #[test]
    fn test_malformed_artifacts_are_counted() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("good.jar"), b"ok").unwrap();
        fs::write(temp.path().join("empty.jar"), b"").unwrap();
        fs::write(temp.path().join("broken.jar"), b"ok").unwrap();
        fs::write(temp.path().join("broken.plugin.json"), b"{ not json").unwrap();

        let mut scan = scanner(temp.path()).scan();
        let found: Vec<_> = scan.by_ref().collect();

        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "good");
        assert_eq!(scan.skipped(), 2);
    }

    #[test]
    fn test_missing_directory() {
        let temp = TempDir::new().unwrap();
        let report = scanner(&temp.path().join("nope")).discover();
        assert!(report.descriptors.is_empty());
        assert_eq!(report.skipped, 0);
    }

    #[test]
    fn test_invalid_pattern() {
        let err = DiscoveryScanner::new("plugins", &["[".to_string()]).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
