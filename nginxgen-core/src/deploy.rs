//! Installing a rendered configuration and reloading nginx

use crate::error::{Error, Result};
use std::path::{Path, PathBuf};
use std::process::Command;

/// Writes rendered configuration to disk and triggers a reload
#[derive(Debug, Clone)]
pub struct Deployer {
    output: PathBuf,
    reload_command: Option<String>,
}

impl Deployer {
    /// Create a deployer writing to `output` and running `reload_command` afterwards
    pub fn new(output: impl Into<PathBuf>, reload_command: Option<String>) -> Self {
        Self {
            output: output.into(),
            reload_command,
        }
    }

    /// Install path
    pub fn output(&self) -> &Path {
        &self.output
    }

    /// Write the configuration and reload
    pub fn deploy(&self, rendered: &str) -> Result<()> {
        self.install(rendered)?;
        self.reload()
    }

    /// Write the configuration, creating missing parent directories
    pub fn install(&self, rendered: &str) -> Result<()> {
        if let Some(parent) = self.output.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(&self.output, rendered)?;
        tracing::info!("Wrote {} bytes to {}", rendered.len(), self.output.display());
        Ok(())
    }

    /// Run the reload command, if any
    pub fn reload(&self) -> Result<()> {
        let Some(command) = &self.reload_command else {
            tracing::info!("Reload skipped");
            return Ok(());
        };

        tracing::info!("Reloading: {}", command);
        let status = Command::new("sh")
            .arg("-c")
            .arg(command)
            .status()
            .map_err(|e| Error::Deploy(format!("Failed to execute '{}': {}", command, e)))?;

        if status.success() {
            Ok(())
        } else {
            Err(Error::Deploy(format!("'{}' failed ({})", command, status)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_install_creates_parents() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("config").join("nginx.conf");
        let deployer = Deployer::new(&output, None);

        deployer.deploy("events {\n}\n").unwrap();
        assert_eq!(std::fs::read_to_string(&output).unwrap(), "events {\n}\n");
    }

    #[cfg(unix)]
    #[test]
    fn test_reload_runs_command() {
        let dir = tempfile::tempdir().unwrap();
        let marker = dir.path().join("reloaded");
        let deployer = Deployer::new(
            dir.path().join("nginx.conf"),
            Some(format!("touch {}", marker.display())),
        );

        deployer.deploy("").unwrap();
        assert!(marker.exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_reload_failure() {
        let dir = tempfile::tempdir().unwrap();
        let deployer = Deployer::new(dir.path().join("nginx.conf"), Some("exit 3".to_string()));

        let err = deployer.deploy("").unwrap_err();
        assert!(matches!(err, Error::Deploy(_)));
        // the file is still installed
        assert!(deployer.output().exists());
    }
}
