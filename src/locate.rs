use crate::config::SdkTools;
use miette::Diagnostic;
use std::{
    env,
    ffi::OsString,
    path::{Path, PathBuf},
};
use thiserror::Error;
use walkdir::WalkDir;

#[derive(Error, Debug, Diagnostic)]
pub enum LocateError {
    #[error("Could not find {} under any '{prefix}*' directory of '{}'", .tool.display(), .bin_path.display())]
    #[diagnostic(
        code(sxspack::locate::resource_editor),
        help("Install the Windows 10 SDK or point `sdk.bin_path` at its bin directory")
    )]
    ResourceEditorNotFound {
        bin_path: PathBuf,
        prefix: String,
        tool: PathBuf,
    },

    #[error("Could not find a Qt directory in PATH")]
    #[diagnostic(
        code(sxspack::locate::qt_unresolved),
        help("Add the Qt bin directory to PATH, or pass --qt-bin / set `qt_bin_path`")
    )]
    QtDirUnresolved,

    #[error("Could not find Qt folder: {}", .path.display())]
    #[diagnostic(code(sxspack::locate::qt_missing), help("Check the configured Qt bin path"))]
    QtDirNotFound { path: PathBuf },
}

/// Finds the resource editor in the highest versioned SDK directory that ships it.
///
/// Immediate subdirectories of `bin_path` whose names start with `version_prefix` are tried
/// in descending lexical order; the first one containing `tool` wins. A missing `bin_path`
/// yields `None`.
pub fn find_resource_editor(bin_path: &Path, version_prefix: &str, tool: &Path) -> Option<PathBuf> {
    let mut versions: Vec<String> = WalkDir::new(bin_path)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.path().is_dir())
        .filter_map(|entry| entry.file_name().to_str().map(str::to_owned))
        .filter(|name| name.starts_with(version_prefix))
        .collect();

    versions.sort_unstable_by(|a, b| b.cmp(a));

    log::debug!("sdk versions under {}: {:?}", bin_path.display(), versions);

    versions
        .into_iter()
        .map(|version| bin_path.join(version).join(tool))
        .find(|candidate| candidate.exists())
}

pub fn locate_resource_editor(sdk: &SdkTools) -> Result<PathBuf, LocateError> {
    find_resource_editor(&sdk.bin_path, &sdk.version_prefix, &sdk.tool).ok_or_else(|| {
        LocateError::ResourceEditorNotFound {
            bin_path: sdk.bin_path.clone(),
            prefix: sdk.version_prefix.clone(),
            tool: sdk.tool.clone(),
        }
    })
}

/// Resolves the toolkit's bin directory when no override is configured.
pub trait QtBinLookup {
    fn qt_bin_path(&self) -> Option<PathBuf>;
}

/// Looks for the first `PATH` entry containing `probe`.
#[derive(Debug, Clone)]
pub struct PathEnvLookup {
    probe: String,
    search_path: Option<OsString>,
}
impl PathEnvLookup {
    pub fn new(probe: &str, search_path: Option<OsString>) -> Self {
        Self {
            probe: probe.to_string(),
            search_path,
        }
    }

    pub fn from_env(probe: &str) -> Self {
        Self::new(probe, env::var_os("PATH"))
    }
}
impl QtBinLookup for PathEnvLookup {
    fn qt_bin_path(&self) -> Option<PathBuf> {
        let search_path = self.search_path.as_ref()?;

        env::split_paths(search_path).find(|dir| dir.join(&self.probe).is_file())
    }
}

/// Returns the override when set, otherwise asks `lookup`. The result must exist on disk.
pub fn resolve_source_dir(
    override_path: Option<&Path>,
    lookup: &dyn QtBinLookup,
) -> Result<PathBuf, LocateError> {
    let path = match override_path {
        Some(path) => path.to_path_buf(),
        None => lookup
            .qt_bin_path()
            .ok_or(LocateError::QtDirUnresolved)?,
    };

    if !path.exists() {
        return Err(LocateError::QtDirNotFound { path });
    }

    log::info!("Found Qt directory at: {}", path.display());

    Ok(path)
}
