//! Host implementation for running next to a dedicated game server.
//!
//! Worlds are subdirectories of a world container, broadcasts are written to
//! the log, and the save action is an optional external command (for example
//! an RCON client issuing `save-all`).

use super::{Host, WorldResolver};
use crate::utils::color::strip_color;
use anyhow::Context;
use std::path::{Component, Path, PathBuf};
use std::process::Command;

pub struct ProcessHost {
    save_command: Option<Vec<String>>,
}

impl ProcessHost {
    pub fn new(save_command: Option<Vec<String>>) -> Self {
        Self { save_command }
    }
}

impl Host for ProcessHost {
    fn broadcast(&mut self, message: &str) {
        tracing::info!("[Broadcast] {}", strip_color(message));
    }

    fn save_all(&mut self) -> anyhow::Result<()> {
        let Some(command) = &self.save_command else {
            tracing::debug!("No save command configured, nothing to run");
            return Ok(());
        };

        let (program, args) = command
            .split_first()
            .context("save_command must name a program")?;

        let status = Command::new(program)
            .args(args)
            .status()
            .with_context(|| format!("failed to run save command {}", program))?;

        anyhow::ensure!(status.success(), "save command exited with {}", status);
        Ok(())
    }
}

/// Resolves world names to subdirectories of one container directory.
#[derive(Debug, Clone)]
pub struct WorldContainer {
    root: PathBuf,
}

impl WorldContainer {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl WorldResolver for WorldContainer {
    fn world_folder(&self, name: &str) -> Option<PathBuf> {
        // A world name is a single path component, never a path
        let mut components = Path::new(name).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(_)), None) => {}
            _ => return None,
        }

        let folder = self.root.join(name);
        folder.is_dir().then_some(folder)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_world_container_resolves_directories_only() {
        let temp = TempDir::new().unwrap();
        std::fs::create_dir(temp.path().join("world")).unwrap();
        std::fs::write(temp.path().join("server.properties"), b"").unwrap();

        let container = WorldContainer::new(temp.path());
        assert_eq!(container.world_folder("world"), Some(temp.path().join("world")));
        assert_eq!(container.world_folder("world_nether"), None);
        assert_eq!(container.world_folder("server.properties"), None);
    }

    #[test]
    fn test_world_container_rejects_paths() {
        let temp = TempDir::new().unwrap();
        std::fs::create_dir_all(temp.path().join("inner/world")).unwrap();

        let container = WorldContainer::new(temp.path().join("inner"));
        assert_eq!(container.world_folder(".."), None);
        assert_eq!(container.world_folder("../inner"), None);
        assert_eq!(container.world_folder("world/../world"), None);
        assert_eq!(container.world_folder(""), None);
    }

    #[test]
    fn test_save_without_command_is_noop() {
        let mut host = ProcessHost::new(None);
        assert!(host.save_all().is_ok());
    }

    #[test]
    fn test_empty_save_command_is_error() {
        let mut host = ProcessHost::new(Some(Vec::new()));
        assert!(host.save_all().is_err());
    }

    #[cfg(unix)]
    #[test]
    fn test_save_command_exit_status() {
        let mut ok = ProcessHost::new(Some(vec!["true".to_string()]));
        assert!(ok.save_all().is_ok());

        let mut failing = ProcessHost::new(Some(vec!["false".to_string()]));
        assert!(failing.save_all().is_err());
    }
}
