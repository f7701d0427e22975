use miette::Diagnostic;
use std::{
    ffi::OsString,
    path::{Path, PathBuf},
    process::{Command, ExitStatus, Stdio},
};
use thiserror::Error;

/// Resource id the loader reads an isolation-aware DLL manifest from.
pub const MANIFEST_RESOURCE_ID: &str = "#2";

#[derive(Error, Debug, Diagnostic)]
pub enum PatchError {
    #[error("unable to run resource editor '{}'", .tool.display())]
    #[diagnostic(code(sxspack::patch::spawn))]
    Spawn {
        tool: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("resource editor failed on '{}' ({status})", .target.display())]
    #[diagnostic(
        code(sxspack::patch::failed),
        help("Run the command by hand to see the resource editor's output")
    )]
    Failed { target: PathBuf, status: ExitStatus },
}

/// Embeds a manifest resource into a binary that was just copied.
pub trait ResourcePatcher {
    fn embed_manifest(&mut self, manifest: &Path, target: &Path) -> Result<(), PatchError>;
}

/// Drives the Windows SDK `mt.exe`.
#[derive(Debug, Clone)]
pub struct MtExe {
    tool: PathBuf,
}
impl MtExe {
    pub fn new(tool: PathBuf) -> Self {
        Self { tool }
    }

    /// `-manifest <manifest> -outputresource:<target>;#2`
    pub fn command(&self, manifest: &Path, target: &Path) -> Command {
        let mut output_resource = OsString::from("-outputresource:");
        output_resource.push(target);
        output_resource.push(";");
        output_resource.push(MANIFEST_RESOURCE_ID);

        let mut command = Command::new(&self.tool);
        command
            .arg("-manifest")
            .arg(manifest)
            .arg(output_resource)
            .stdout(Stdio::null());

        command
    }
}
impl ResourcePatcher for MtExe {
    fn embed_manifest(&mut self, manifest: &Path, target: &Path) -> Result<(), PatchError> {
        log::debug!(
            "{} -manifest {} -outputresource:{};{}",
            self.tool.display(),
            manifest.display(),
            target.display(),
            MANIFEST_RESOURCE_ID
        );

        let status = self
            .command(manifest, target)
            .status()
            .map_err(|error| PatchError::Spawn {
                tool: self.tool.clone(),
                source: error,
            })?;

        if !status.success() {
            return Err(PatchError::Failed {
                target: target.to_path_buf(),
                status,
            });
        }

        Ok(())
    }
}
