//! Operator role preference
//!
//! Persisted as a one-key TOML file in the local data directory. A missing
//! or unreadable file means EMPLOYEE, and the default is written back.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use whs_common::api::UserRole;
use whs_common::config::CompiledDefaults;
use whs_common::Result;

const ROLE_FILE: &str = "role.toml";

#[derive(Debug, Serialize, Deserialize)]
struct RoleFile {
    role: UserRole,
}

#[derive(Debug, Clone)]
pub struct RolePreference {
    path: PathBuf,
}

impl RolePreference {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `<data dir>/whs/role.toml`
    pub fn default_path() -> PathBuf {
        CompiledDefaults::for_current_platform()
            .data_dir
            .join(ROLE_FILE)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Stored role, falling back to (and persisting) EMPLOYEE
    pub fn load(&self) -> UserRole {
        match self.read() {
            Ok(role) => role,
            Err(e) => {
                debug!(path = %self.path.display(), error = %e, "No usable role preference");
                let role = UserRole::default();
                if let Err(e) = self.save(role) {
                    warn!(path = %self.path.display(), error = %e, "Failed to persist default role");
                }
                role
            }
        }
    }

    pub fn save(&self, role: UserRole) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string(&RoleFile { role })?;
        std::fs::write(&self.path, content)?;
        Ok(())
    }

    fn read(&self) -> Result<UserRole> {
        let content = std::fs::read_to_string(&self.path)?;
        let file: RoleFile = toml::from_str(&content)?;
        Ok(file.role)
    }
}
