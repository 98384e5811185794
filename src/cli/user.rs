use std::sync::Arc;

use inquire::{Confirm, Text};
use inquire::validator::Validation;

use crate::clock::SystemClock;
use crate::service::Directory;
use crate::service::validation::validate_username;

use super::init_store;
use super::pickers::{confirm_action, get_or_pick_user, pick_expiration};

/// Prompt for a username, validating as the user types.
pub(super) fn prompt_username() -> anyhow::Result<String> {
    Ok(Text::new("Username:")
        .with_validator(|input: &str| {
            Ok(validate_username(input)
                .map(|()| Validation::Valid)
                .unwrap_or_else(|e| Validation::Invalid(e.to_string().into())))
        })
        .prompt()?)
}

pub fn run_user_add(
    data_dir: String,
    username: Option<String>,
    create_token_flag: bool,
    non_interactive: bool,
) -> anyhow::Result<()> {
    let store = init_store(&data_dir)?;
    let directory = Directory::new(store, Arc::new(SystemClock));

    let username = if let Some(name) = username {
        name
    } else if non_interactive {
        anyhow::bail!("--username is required in non-interactive mode");
    } else {
        prompt_username()?
    };

    let user = directory.create_user(&username)?;

    println!();
    println!("Created user \"{}\" (id {})", user.username, user.id);

    let should_create_token = if create_token_flag {
        true
    } else if non_interactive {
        false
    } else {
        Confirm::new("Create session token?")
            .with_default(true)
            .prompt()?
    };

    if should_create_token {
        let expires_in = if non_interactive {
            None
        } else {
            match pick_expiration()? {
                Some(exp) => exp,
                None => {
                    println!("Token creation cancelled.");
                    return Ok(());
                }
            }
        };

        let issued = directory.issue_session_token(user.id, expires_in)?;

        println!();
        println!("Token created: {}", issued.raw);
        println!("  Save this now - it cannot be retrieved later.");
    }

    println!();

    Ok(())
}

pub fn run_user_remove(
    data_dir: String,
    user_id: Option<i64>,
    non_interactive: bool,
    yes: bool,
) -> anyhow::Result<()> {
    let store = init_store(&data_dir)?;
    let directory = Directory::new(store, Arc::new(SystemClock));

    let Some(user) = get_or_pick_user(&directory, user_id, non_interactive)? else {
        return Ok(());
    };

    let confirmed = confirm_action(
        &format!(
            "Delete user '{}'? Their session tokens and API keys stop working immediately.",
            user.username
        ),
        yes,
        non_interactive,
    )?;

    if !confirmed {
        println!("Cancelled.");
        return Ok(());
    }

    directory.soft_delete_user(user.id)?;

    println!();
    println!("Deleted user '{}'", user.username);
    println!();

    Ok(())
}
