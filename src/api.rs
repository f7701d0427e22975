use crate::{
    config::{self, Config},
    deploy::{self, DeployReport, PlannedCopy, Preflight},
    locate::{self, PathEnvLookup},
    patch::MtExe,
};
use colored::Colorize;
use std::path::PathBuf;

#[derive(Debug, thiserror::Error, miette::Diagnostic)]
pub enum SxsError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(#[from] config::ConfigError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Locate(#[from] locate::LocateError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Deploy(#[from] deploy::DeployError),
}

/// Command line values that take precedence over the config file.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub config: Option<PathBuf>,
    pub qt_bin: Option<PathBuf>,
    pub output: Option<PathBuf>,
    pub debug_dlls: bool,
}

/// Loads the config file and applies `overrides` on top of it.
pub fn load_config(overrides: &Overrides) -> Result<Config, SxsError> {
    let mut config = Config::load(overrides.config.as_deref())?;

    if let Some(qt_bin) = &overrides.qt_bin {
        config.qt_bin_path = Some(qt_bin.clone());
    }
    if let Some(output) = &overrides.output {
        config.assembly_folder = output.clone();
    }
    config.debug_dlls |= overrides.debug_dlls;

    log::debug!("effective config: {:?}", config);

    Ok(config)
}

/// Copies the configured libraries into a freshly created private assembly folder.
///
/// # Errors
///
/// Returns a [`SxsError`] if:
///
/// - The config file cannot be read, parsed or validated.
/// - The resource editor, the override manifest or the Qt bin directory is missing.
/// - A library cannot be copied, or the assembly manifest cannot be written.
/// - The resource editor fails on a patched library.
pub fn deploy(overrides: &Overrides) -> Result<DeployReport, SxsError> {
    let config = load_config(overrides)?;

    let lookup = PathEnvLookup::from_env(&config.qt_probe);

    let checks = deploy::preflight(&config, &lookup)?;

    let mut patcher = MtExe::new(checks.resource_editor.clone());

    let report = deploy::run(&config, &checks, &mut patcher)?;

    log::info!(
        "{} files copied, {} patched, manifest at {}",
        report.copied.len(),
        report.patched,
        report.manifest.display()
    );

    Ok(report)
}

/// Prints the copies `deploy` would make without touching the filesystem.
///
/// # Errors
///
/// Returns a [`SxsError`] if the config is invalid or the Qt bin directory cannot be resolved.
pub fn plan(overrides: &Overrides) -> Result<Vec<PlannedCopy>, SxsError> {
    let config = load_config(overrides)?;

    let lookup = PathEnvLookup::from_env(&config.qt_probe);

    let source_dir = locate::resolve_source_dir(config.qt_bin_path.as_deref(), &lookup)?;

    let copies = deploy::plan_copies(&config, &source_dir)?;

    for copy in &copies {
        let mut flags = Vec::new();
        if copy.add_in_assembly {
            flags.push("manifest");
        }
        if copy.patch_with_manifest {
            flags.push("patch");
        }

        println!(
            "{} {} -> {} [{}]",
            "copy".green(),
            copy.source.display(),
            copy.destination.display(),
            flags.join(", ")
        );
    }
    println!("{} {}", "create".green(), config.manifest_path().display());

    Ok(copies)
}

/// Prints where the resource editor and the Qt bin directory were found.
///
/// # Errors
///
/// Returns a [`SxsError`] if either cannot be located.
pub fn locate(overrides: &Overrides) -> Result<Preflight, SxsError> {
    let config = load_config(overrides)?;

    let resource_editor = locate::locate_resource_editor(&config.sdk)?;
    println!("{} {}", "resource editor".cyan(), resource_editor.display());

    let lookup = PathEnvLookup::from_env(&config.qt_probe);
    let source_dir = locate::resolve_source_dir(config.qt_bin_path.as_deref(), &lookup)?;
    println!("{} {}", "qt bin".cyan(), source_dir.display());

    Ok(Preflight {
        resource_editor,
        source_dir,
    })
}
