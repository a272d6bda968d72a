use std::path::Path;
use std::process::Command;

use crate::config::schema::RendererConfig;
use crate::error::ProcessError;
use crate::processor::Renderer;

/// GhostPCL (`gpcl6`) writing a PDF through a non-interactive device.
pub struct GhostPcl {
    program: String,
    device: String,
    extra_args: Vec<String>,
}

impl GhostPcl {
    pub fn new(config: &RendererConfig) -> Self {
        Self {
            program: config.program.clone(),
            device: config.device.clone(),
            extra_args: config.extra_args.clone(),
        }
    }

    fn args(&self, source: &Path, output: &Path) -> Vec<String> {
        let mut args = vec![
            "-dNOPAUSE".to_string(),
            "-dBATCH".to_string(),
            format!("-sDEVICE={}", self.device),
            format!("-sOutputFile={}", output.display()),
        ];
        args.extend(self.extra_args.iter().cloned());
        args.push(source.display().to_string());
        args
    }
}

impl Renderer for GhostPcl {
    fn render(&self, source: &Path, output: &Path) -> Result<(), ProcessError> {
        let _span = tracing::info_span!("processor.render").entered();

        let output_status = Command::new(&self.program)
            .args(self.args(source, output))
            .output()
            .map_err(|e| ProcessError::Render {
                path: source.to_path_buf(),
                status: format!(
                    "failed to run {}: {}. Make sure GhostPCL is installed.",
                    self.program, e
                ),
            })?;

        if !output_status.status.success() {
            return Err(ProcessError::Render {
                path: source.to_path_buf(),
                status: format!(
                    "{} exited with {}: {}",
                    self.program,
                    output_status.status,
                    String::from_utf8_lossy(&output_status.stderr).trim()
                ),
            });
        }

        verify_output(source, output)?;
        log::debug!("Rendered {} -> {}", source.display(), output.display());
        Ok(())
    }
}

/// A zero exit status only counts when a non-empty file was written.
fn verify_output(source: &Path, output: &Path) -> Result<(), ProcessError> {
    match std::fs::metadata(output) {
        Ok(meta) if meta.len() > 0 => Ok(()),
        Ok(_) => Err(ProcessError::Render {
            path: source.to_path_buf(),
            status: format!("renderer produced an empty file at {}", output.display()),
        }),
        Err(_) => Err(ProcessError::Render {
            path: source.to_path_buf(),
            status: format!("renderer produced no file at {}", output.display()),
        }),
    }
}
