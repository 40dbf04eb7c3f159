//! Tiered configuration.
//!
//! Tiers, lowest priority first, merged field by field:
//! 1. **Defaults** - compiled in
//! 2. **Project** - `$CWD/taskboard/config.yaml`
//! 3. **User** - `~/.taskboard/config.yaml`
//! 4. **Environment** - `TASKBOARD_DB_PATH`, `TASKBOARD_PORT`, `TASKBOARD_OWNER`
//!
//! `TASKBOARD_CONFIG_PATH` names a single file that replaces the file tiers.
//! `TASKBOARD_PROJECT_DIR` and `TASKBOARD_USER_DIR` relocate the tier directories.

mod loader;
mod merge;
mod types;

pub use loader::{ConfigLoader, ConfigPaths, ConfigTier};
pub use merge::deep_merge;
pub use types::*;
