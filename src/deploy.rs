use crate::{
    config::{Config, ConfigError, DllEntry},
    errors::{FileOperation, IoError},
    locate::{self, LocateError, QtBinLookup},
    manifest::ManifestWriter,
    patch::{PatchError, ResourcePatcher},
};
use colored::Colorize;
use miette::Diagnostic;
use std::{
    fs::{self, File},
    io::{BufWriter, Write},
    path::{Path, PathBuf},
};
use thiserror::Error;

/// Inserted before the extension of a library's debug build.
pub const DEBUG_SUFFIX: &str = "d";

#[derive(Debug, Error, Diagnostic)]
pub enum DeployError {
    #[error("Could not find override manifest: {}", .path.display())]
    #[diagnostic(
        code(sxspack::deploy::override_manifest),
        help("The override manifest is embedded into patched libraries; run from the directory that holds it or set `override_manifest`")
    )]
    OverrideManifestNotFound { path: PathBuf },

    #[error(transparent)]
    #[diagnostic(transparent)]
    Locate(#[from] LocateError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(#[from] ConfigError),

    #[error("I/O error within deploy domain")]
    #[diagnostic(code(sxspack::deploy::io))]
    Io(#[from] IoError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Patch(#[from] PatchError),
}

/// Everything that must hold before the assembly folder is touched.
#[derive(Debug, Clone)]
pub struct Preflight {
    pub resource_editor: PathBuf,
    pub source_dir: PathBuf,
}

/// A single file copy the run will perform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedCopy {
    pub source: PathBuf,
    pub destination: PathBuf,
    pub file_name: String,
    pub add_in_assembly: bool,
    pub patch_with_manifest: bool,
}

#[derive(Debug, Default)]
pub struct DeployReport {
    pub copied: Vec<PathBuf>,
    pub patched: usize,
    pub manifest: PathBuf,
}

/// Returns the debug build's name for `path`: `Qt5Core.dll` becomes `Qt5Cored.dll`.
///
/// A path without an extension gets the suffix appended.
pub fn debug_variant(path: &Path) -> PathBuf {
    let Some(stem) = path.file_stem() else {
        return path.to_path_buf();
    };

    let mut name = stem.to_os_string();
    name.push(DEBUG_SUFFIX);
    if let Some(extension) = path.extension() {
        name.push(".");
        name.push(extension);
    }

    path.with_file_name(name)
}

fn plan_entry(
    entry: &DllEntry,
    debug: bool,
    source_dir: &Path,
    assembly_folder: &Path,
) -> Result<PlannedCopy, ConfigError> {
    let relative = if debug {
        debug_variant(Path::new(&entry.path))
    } else {
        PathBuf::from(&entry.path)
    };

    let file_name = relative
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .ok_or_else(|| ConfigError::InvalidEntry {
            path: entry.path.clone(),
        })?;

    Ok(PlannedCopy {
        source: source_dir.join(&relative),
        destination: assembly_folder.join(&file_name),
        file_name,
        add_in_assembly: entry.add_in_assembly,
        patch_with_manifest: entry.patch_with_manifest,
    })
}

/// Lists every copy in run order: each entry, followed by its debug build when enabled.
pub fn plan_copies(config: &Config, source_dir: &Path) -> Result<Vec<PlannedCopy>, ConfigError> {
    let mut plan = Vec::with_capacity(config.dlls.len() * 2);

    for entry in &config.dlls {
        plan.push(plan_entry(entry, false, source_dir, &config.assembly_folder)?);
        if config.debug_dlls {
            plan.push(plan_entry(entry, true, source_dir, &config.assembly_folder)?);
        }
    }

    Ok(plan)
}

/// Locates the resource editor, checks the override manifest and resolves the source directory.
///
/// Nothing on disk is modified.
pub fn preflight(config: &Config, lookup: &dyn QtBinLookup) -> Result<Preflight, DeployError> {
    let resource_editor = locate::locate_resource_editor(&config.sdk)?;

    log::debug!("resource editor: {}", resource_editor.display());

    if !config.override_manifest.exists() {
        return Err(DeployError::OverrideManifestNotFound {
            path: config.override_manifest.clone(),
        });
    }

    let source_dir = locate::resolve_source_dir(config.qt_bin_path.as_deref(), lookup)?;

    Ok(Preflight {
        resource_editor,
        source_dir,
    })
}

fn recreate_dir(path: &Path) -> Result<(), IoError> {
    if path.is_dir() {
        log::debug!("removing previous assembly folder: {}", path.display());
        fs::remove_dir_all(path)
            .map_err(|error| IoError::new(FileOperation::Rmdir, path.to_path_buf(), error))?;
    }

    fs::create_dir_all(path)
        .map_err(|error| IoError::new(FileOperation::Mkdir, path.to_path_buf(), error))
}

fn copy_and_patch<W: Write>(
    copy: &PlannedCopy,
    override_manifest: &Path,
    manifest_path: &Path,
    manifest: &mut ManifestWriter<W>,
    patcher: &mut dyn ResourcePatcher,
) -> Result<bool, DeployError> {
    println!("{} {}", "copy".green(), copy.file_name);

    fs::copy(&copy.source, &copy.destination)
        .map_err(|error| IoError::new(FileOperation::Copy, copy.source.clone(), error))?;

    if copy.add_in_assembly {
        manifest
            .file(&copy.file_name)
            .map_err(|error| IoError::new(FileOperation::Write, manifest_path.into(), error))?;
    }

    if copy.patch_with_manifest {
        println!("{} {}", "patch".cyan(), copy.file_name);
        patcher.embed_manifest(override_manifest, &copy.destination)?;
    }

    Ok(copy.patch_with_manifest)
}

/// Rebuilds the assembly folder from scratch.
///
/// The first failure aborts the run; files already copied stay where they are, and the
/// manifest is left without its closing `</assembly>` tag.
pub fn run(
    config: &Config,
    preflight: &Preflight,
    patcher: &mut dyn ResourcePatcher,
) -> Result<DeployReport, DeployError> {
    let plan = plan_copies(config, &preflight.source_dir)?;

    recreate_dir(&config.assembly_folder)?;

    let manifest_path = config.manifest_path();
    let write_error =
        |error: std::io::Error| IoError::new(FileOperation::Write, manifest_path.clone(), error);

    let file = File::create(&manifest_path).map_err(write_error)?;
    let mut manifest =
        ManifestWriter::begin(BufWriter::new(file), &config.assembly).map_err(write_error)?;

    let mut report = DeployReport::default();

    for copy in &plan {
        let patched = copy_and_patch(
            copy,
            &config.override_manifest,
            &manifest_path,
            &mut manifest,
            patcher,
        )
        .inspect_err(|_| {
            log::debug!(
                "aborting on {}, {} left unterminated",
                copy.file_name,
                manifest_path.display()
            )
        })?;
        if patched {
            report.patched += 1;
        }
        report.copied.push(copy.destination.clone());
    }

    manifest.finish().map_err(write_error)?;

    println!("{} {}", "create".green(), manifest_path.display());

    report.manifest = manifest_path;

    Ok(report)
}
