mod commands;
mod info;
mod init;
pub mod pickers;
mod sweep;
mod user;

pub use commands::{AdminCommands, UserCommands};
pub use info::run_info;
pub use init::run_init;
pub use sweep::run_sweep;
pub use user::{run_user_add, run_user_remove};

use std::path::PathBuf;
use std::sync::Arc;

use crate::config::DB_FILE_NAME;
use crate::store::SqliteStore;

/// Open the store in an existing data directory
pub fn init_store(data_dir: &str) -> anyhow::Result<Arc<SqliteStore>> {
    let data_path: PathBuf = data_dir.into();
    let db_path = data_path.join(DB_FILE_NAME);

    if !db_path.exists() {
        anyhow::bail!(
            "Database not found at {}. Run 'revlo admin init' first.",
            db_path.display()
        );
    }

    Ok(Arc::new(SqliteStore::new(&db_path)?))
}
