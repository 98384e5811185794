use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::bail;

use crate::clock::SystemClock;
use crate::config::{ADMIN_TOKEN_FILE_NAME, DB_FILE_NAME};
use crate::service::Directory;
use crate::store::{SqliteStore, Store};

use super::user::prompt_username;

#[cfg(unix)]
fn set_restrictive_permissions(path: &Path) {
    use std::os::unix::fs::PermissionsExt;
    if let Err(e) = fs::set_permissions(path, fs::Permissions::from_mode(0o600)) {
        tracing::warn!("Failed to set permissions on {}: {e}", path.display());
    }
}

pub fn run_init(data_dir: String, non_interactive: bool) -> anyhow::Result<()> {
    let data_path: PathBuf = data_dir.into();
    fs::create_dir_all(&data_path)?;

    let store = Arc::new(SqliteStore::new(data_path.join(DB_FILE_NAME))?);
    store.initialize()?;

    let token_file = data_path.join(ADMIN_TOKEN_FILE_NAME);

    if store.has_admin_token()? {
        bail!(
            "Server already initialized. Admin token exists at: {}",
            token_file.display()
        );
    }

    let directory = Directory::new(store, Arc::new(SystemClock));
    let issued = directory.create_admin_token()?;

    fs::write(&token_file, &issued.raw)?;

    #[cfg(unix)]
    set_restrictive_permissions(&token_file);

    println!();
    println!("========================================");
    println!("Admin token (save this, it won't be shown again):");
    println!();
    println!("  {}", issued.raw);
    println!();
    println!("Token also written to: {}", token_file.display());
    println!("========================================");
    println!();

    if !non_interactive {
        create_default_user_prompt(&directory)?;
    }

    Ok(())
}

fn create_default_user_prompt(directory: &Directory) -> anyhow::Result<()> {
    let create_user = inquire::Confirm::new("Would you like to create a default user?")
        .with_default(false)
        .prompt()?;

    if !create_user {
        return Ok(());
    }

    let username = prompt_username()?;
    let user = directory.create_user(&username)?;
    let issued = directory.issue_session_token(user.id, None)?;

    println!();
    println!("========================================");
    println!("Created user '{}' with token:", user.username);
    println!();
    println!("  {}", issued.raw);
    println!();
    println!("========================================");
    println!();

    Ok(())
}
