//! Configuration schema types for Lectern.
//!
//! All structs use `serde(default)` so partial configs work correctly.

mod logging;
mod server;
mod storage;
mod viewer;

pub use logging::*;
pub use server::*;
pub use storage::*;
pub use viewer::*;

use serde::{Deserialize, Serialize};

/// Current config schema version.
pub const CONFIG_SCHEMA_VERSION: u32 = 1;

/// Root configuration shared by the server and viewer binaries.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LecternConfig {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub viewer: ViewerConfig,
    pub logging: LoggingConfig,
}
