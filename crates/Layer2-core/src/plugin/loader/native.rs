//! Native Loader - 동적 라이브러리 플러그인
//!
//! 플러그인 라이브러리는 다음 심볼을 export 해야 합니다:
//!
//! - `pdbp_plugin_abi_version`: `extern "C" fn() -> u32`
//! - 엔트리 포인트 생성자 (`a.b.Echo` / `a::b::Echo` → `a_b_Echo`): `fn() -> *mut dyn Plugin`
//! - (선택) `pdbp_plugin_version`: `extern "C" fn() -> *const c_char`
//!
//! 로드할 때마다 라이브러리를 새로 열고, 모듈 해제 시 닫습니다.

use super::module::{LoadedModule, ModuleHandle, ModuleScope};
use super::{ArtifactInfo, PluginLoader, PLUGIN_ABI_VERSION};
use crate::plugin::traits::Plugin;
use libloading::{Library, Symbol};
use pdbp_foundation::{Error, Result};
use std::ffi::{c_char, CStr};
use std::path::Path;
use tracing::{debug, info};

/// ABI 버전 심볼
pub const ABI_VERSION_SYMBOL: &str = "pdbp_plugin_abi_version";

/// 버전 문자열 심볼
pub const VERSION_SYMBOL: &str = "pdbp_plugin_version";

/// 엔트리 포인트 생성자 시그니처
pub type PluginCreate = unsafe fn() -> *mut dyn Plugin;

type AbiVersionFn = unsafe extern "C" fn() -> u32;
type VersionFn = unsafe extern "C" fn() -> *const c_char;

/// 엔트리 포인트 식별자 → export 심볼 이름
pub fn entry_symbol(entry_point: &str) -> String {
    entry_point.replace("::", "_").replace('.', "_")
}

/// 동적 라이브러리 로더
#[derive(Debug, Clone)]
pub struct NativeLoader {
    extensions: Vec<String>,
}

impl Default for NativeLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl NativeLoader {
    pub fn new() -> Self {
        Self {
            extensions: vec!["so".into(), "dylib".into(), "dll".into()],
        }
    }

    /// 라이브러리 열기 + ABI 확인
    fn open(&self, artifact: &Path) -> Result<Library> {
        if !artifact.is_file() {
            return Err(Error::ArtifactNotFound(artifact.display().to_string()));
        }

        // Safety: 라이브러리 초기화 코드가 실행됨. 플러그인 디렉토리는 신뢰된 경로로 간주
        let library = unsafe { Library::new(artifact) }.map_err(|e| {
            Error::IncompatibleInterface(format!(
                "Failed to open library {}: {}",
                artifact.display(),
                e
            ))
        })?;

        let abi_version = unsafe {
            let symbol: Symbol<AbiVersionFn> =
                library.get(ABI_VERSION_SYMBOL.as_bytes()).map_err(|_| {
                    Error::IncompatibleInterface(format!(
                        "{} does not export {}",
                        artifact.display(),
                        ABI_VERSION_SYMBOL
                    ))
                })?;
            symbol()
        };

        if abi_version != PLUGIN_ABI_VERSION {
            return Err(Error::IncompatibleInterface(format!(
                "{} targets plugin ABI {} (host expects {})",
                artifact.display(),
                abi_version,
                PLUGIN_ABI_VERSION
            )));
        }

        Ok(library)
    }

    fn constructor<'lib>(
        library: &'lib Library,
        artifact: &Path,
        entry_point: &str,
    ) -> Result<Symbol<'lib, PluginCreate>> {
        let symbol = entry_symbol(entry_point);
        unsafe { library.get::<PluginCreate>(symbol.as_bytes()) }
            .map_err(|_| Error::entry_point_not_found(artifact.display().to_string(), entry_point))
    }

    fn declared_version(library: &Library) -> Option<String> {
        unsafe {
            let symbol: Symbol<VersionFn> = library.get(VERSION_SYMBOL.as_bytes()).ok()?;
            let ptr = symbol();
            if ptr.is_null() {
                return None;
            }
            Some(CStr::from_ptr(ptr).to_string_lossy().into_owned())
        }
    }
}

impl PluginLoader for NativeLoader {
    fn name(&self) -> &str {
        "native"
    }

    fn accepts(&self, artifact: &Path) -> bool {
        artifact
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| self.extensions.iter().any(|e| e.eq_ignore_ascii_case(ext)))
            .unwrap_or(false)
    }

    fn validate(&self, artifact: &Path, entry_point: &str) -> Result<ArtifactInfo> {
        let library = self.open(artifact)?;
        Self::constructor(&library, artifact, entry_point)?;
        let version = Self::declared_version(&library);
        debug!("Validated native artifact {} ({})", artifact.display(), entry_point);
        Ok(ArtifactInfo { version })
    }

    fn load(&self, artifact: &Path, entry_point: &str) -> Result<LoadedModule> {
        let library = self.open(artifact)?;

        let plugin_ptr = {
            let constructor = Self::constructor(&library, artifact, entry_point)?;
            unsafe { constructor() }
        };

        if plugin_ptr.is_null() {
            return Err(Error::IncompatibleInterface(format!(
                "Constructor {} returned null",
                entry_point
            )));
        }

        // Safety: 생성자가 Box::into_raw로 넘긴 포인터. 소유권은 LoadedModule로 이동하며
        // 라이브러리보다 먼저 해제됨
        let instance: Box<dyn Plugin> = unsafe { Box::from_raw(plugin_ptr) };
        let handle = ModuleHandle::new(artifact, entry_point);

        info!("Loaded native plugin {} from {}", entry_point, artifact.display());
        Ok(LoadedModule::new(handle, instance, ModuleScope::Library(library)))
    }
}
