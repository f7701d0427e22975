use crate::errors::{FileOperation, IoError};
use miette::Diagnostic;
use serde::Deserialize;
use std::{
    fs,
    path::{Path, PathBuf},
};
use thiserror::Error;

/// Name of the config file picked up from the working directory when `--config` is absent.
pub const DEFAULT_CONFIG_FILE: &str = "sxspack.toml";

#[derive(Error, Debug, Diagnostic)]
pub enum ConfigError {
    #[error("I/O error within config domain")]
    #[diagnostic(code(sxspack::config::io))]
    Io(#[from] IoError),

    #[error("Unable to parse toml file at '{path}': {source}")]
    #[diagnostic(code(sxspack::config::parse_toml), help("Review toml file"))]
    ParseToml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("dll entry '{path}' does not name a file")]
    #[diagnostic(
        code(sxspack::config::invalid_entry),
        help("Each [[dlls]] path must end with a file name, e.g. \"Qt5Core.dll\"")
    )]
    InvalidEntry { path: String },
}

/// One library to ship inside the private assembly.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct DllEntry {
    /// Path relative to the toolkit's bin directory.
    pub path: String,
    /// Emit a `<file>` element for this library in the assembly manifest.
    #[serde(default)]
    pub add_in_assembly: bool,
    /// Embed the override manifest into the copied library.
    #[serde(default)]
    pub patch_with_manifest: bool,
}
impl DllEntry {
    pub fn new(path: &str, add_in_assembly: bool, patch_with_manifest: bool) -> Self {
        Self {
            path: path.to_string(),
            add_in_assembly,
            patch_with_manifest,
        }
    }
}

/// Identity block written at the top of the assembly manifest.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct AssemblyIdentity {
    pub name: String,
    pub version: String,
    pub architecture: String,
}
impl Default for AssemblyIdentity {
    fn default() -> Self {
        Self {
            name: "popcornfx.qt".to_string(),
            version: "1.0.0.0".to_string(),
            architecture: "amd64".to_string(),
        }
    }
}

/// Where to look for the resource editor inside the Windows SDK.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SdkTools {
    pub bin_path: PathBuf,
    pub version_prefix: String,
    pub tool: PathBuf,
}
impl Default for SdkTools {
    fn default() -> Self {
        Self {
            bin_path: PathBuf::from(r"C:\Program Files (x86)\Windows Kits\10\bin"),
            version_prefix: "10.".to_string(),
            tool: ["x64", "mt.exe"].iter().collect(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    pub assembly_folder: PathBuf,
    pub assembly: AssemblyIdentity,
    pub override_manifest: PathBuf,
    pub debug_dlls: bool,
    pub qt_bin_path: Option<PathBuf>,
    pub qt_probe: String,
    pub sdk: SdkTools,
    pub dlls: Vec<DllEntry>,
}
impl Default for Config {
    fn default() -> Self {
        Self {
            assembly_folder: ["External", "popcornfx.qt"].iter().collect(),
            assembly: AssemblyIdentity::default(),
            override_manifest: PathBuf::from("qtoverride.dll.manifest"),
            debug_dlls: false,
            qt_bin_path: None,
            qt_probe: "Qt5Core.dll".to_string(),
            sdk: SdkTools::default(),
            // Qt5Core must stay first
            dlls: vec![
                DllEntry::new("Qt5Core.dll", true, false),
                DllEntry::new("Qt5Gui.dll", true, true),
                DllEntry::new("Qt5Widgets.dll", true, true),
                DllEntry::new("../plugins/platforms/qwindows.dll", false, true),
            ],
        }
    }
}
impl Config {
    /// Loads the configuration.
    ///
    /// An explicit `path` must exist. Without one, [`DEFAULT_CONFIG_FILE`] is read from the
    /// working directory when present, and the built-in defaults are used otherwise.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config = match path {
            Some(path) => Self::from_file(path)?,
            None => {
                let fallback = Path::new(DEFAULT_CONFIG_FILE);
                if fallback.is_file() {
                    Self::from_file(fallback)?
                } else {
                    log::debug!("no {} found, using built-in defaults", DEFAULT_CONFIG_FILE);
                    Self::default()
                }
            }
        };

        config.validate()?;

        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        log::debug!("reading config from: {}", path.display());

        let content = fs::read_to_string(path)
            .map_err(|error| IoError::new(FileOperation::Read, path.to_path_buf(), error))?;

        toml::from_str(&content).map_err(|err| ConfigError::ParseToml {
            path: path.to_path_buf(),
            source: err,
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for entry in &self.dlls {
            if Path::new(&entry.path).file_name().is_none() {
                return Err(ConfigError::InvalidEntry {
                    path: entry.path.clone(),
                });
            }
        }

        Ok(())
    }

    /// Path of the generated assembly manifest, `<assembly folder>/<name>.manifest`.
    pub fn manifest_path(&self) -> PathBuf {
        self.assembly_folder
            .join(format!("{}.manifest", self.assembly.name))
    }
}
