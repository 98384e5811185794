use std::fmt;

use chrono::{DateTime, Duration, Utc};
use inquire::{InquireError, Select};

use crate::service::Directory;
use crate::types::{Token, User};

const PICKER_LIMIT: i32 = 1000;

pub struct UserDisplay {
    pub user: User,
}

impl fmt::Display for UserDisplay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (#{})  joined {}",
            self.user.username,
            self.user.id,
            format_relative_time(&self.user.created_at)
        )
    }
}

/// Token with resolved username for display
pub struct TokenDisplay {
    pub token: Token,
    pub username: Option<String>,
}

impl fmt::Display for TokenDisplay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let user = self.username.as_deref().unwrap_or("admin");
        let created = format_relative_time(&self.token.created_at);
        let last_used = match &self.token.last_used_at {
            Some(dt) => format_relative_time(dt),
            None => "never used".to_string(),
        };
        write!(
            f,
            "revlo_{}...  {}  created {}  {}",
            &self.token.token_lookup, user, created, last_used
        )
    }
}

#[derive(Clone)]
pub struct ExpirationOption {
    pub label: &'static str,
    pub days: Option<i64>,
}

impl fmt::Display for ExpirationOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label)
    }
}

/// Format a datetime as relative time (e.g., "2 days ago")
#[must_use]
pub fn format_relative_time(dt: &DateTime<Utc>) -> String {
    let diff = Utc::now().signed_duration_since(*dt);

    if diff.num_seconds() < 0 {
        return "in the future".to_string();
    }
    if diff.num_seconds() < 60 {
        return "just now".to_string();
    }

    let (n, unit) = if diff.num_minutes() < 60 {
        (diff.num_minutes(), "minute")
    } else if diff.num_hours() < 24 {
        (diff.num_hours(), "hour")
    } else if diff.num_days() < 30 {
        (diff.num_days(), "day")
    } else if diff.num_days() < 365 {
        (diff.num_days() / 30, "month")
    } else {
        (diff.num_days() / 365, "year")
    };

    if n == 1 {
        format!("1 {unit} ago")
    } else {
        format!("{n} {unit}s ago")
    }
}

/// All active users, oldest first.
pub fn list_users(directory: &Directory) -> anyhow::Result<Vec<UserDisplay>> {
    Ok(directory
        .list_users(0, PICKER_LIMIT)?
        .into_iter()
        .map(|user| UserDisplay { user })
        .collect())
}

/// All session tokens with the owning username resolved.
pub fn list_tokens(directory: &Directory) -> anyhow::Result<Vec<TokenDisplay>> {
    let tokens = directory.list_tokens("", PICKER_LIMIT)?;
    let mut displays = Vec::with_capacity(tokens.len());

    for token in tokens {
        let username = match token.user_id {
            Some(user_id) => directory.get_user(user_id).ok().map(|u| u.username),
            None => None,
        };
        displays.push(TokenDisplay { token, username });
    }

    Ok(displays)
}

pub fn pick_user(directory: &Directory) -> anyhow::Result<Option<User>> {
    let users = list_users(directory)?;

    if users.is_empty() {
        println!("No users found.");
        return Ok(None);
    }

    let selection = Select::new("Select user:", users)
        .with_page_size(15)
        .with_help_message("Type to filter, Enter to select")
        .with_vim_mode(true)
        .prompt();

    match selection {
        Ok(display) => Ok(Some(display.user)),
        Err(InquireError::OperationCanceled | InquireError::OperationInterrupted) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Pick a session token lifetime. The outer `None` means the prompt was cancelled.
pub fn pick_expiration() -> anyhow::Result<Option<Option<Duration>>> {
    let options = vec![
        ExpirationOption {
            label: "30 days",
            days: Some(30),
        },
        ExpirationOption {
            label: "90 days",
            days: Some(90),
        },
        ExpirationOption {
            label: "1 year",
            days: Some(365),
        },
        ExpirationOption {
            label: "Never",
            days: None,
        },
    ];

    let selection = Select::new("Token expiration:", options)
        .with_page_size(4)
        .with_vim_mode(true)
        .prompt();

    match selection {
        Ok(opt) => Ok(Some(opt.days.map(Duration::days))),
        Err(InquireError::OperationCanceled | InquireError::OperationInterrupted) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Get a user by ID or interactively pick one
pub fn get_or_pick_user(
    directory: &Directory,
    user_id: Option<i64>,
    non_interactive: bool,
) -> anyhow::Result<Option<User>> {
    if let Some(id) = user_id {
        Ok(Some(directory.get_user(id)?))
    } else if non_interactive {
        anyhow::bail!("--user-id is required in non-interactive mode");
    } else {
        pick_user(directory)
    }
}

/// Request confirmation for a destructive operation
pub fn confirm_action(message: &str, yes: bool, non_interactive: bool) -> anyhow::Result<bool> {
    if yes {
        Ok(true)
    } else if non_interactive {
        anyhow::bail!("--yes is required for destructive operations in non-interactive mode");
    } else {
        Ok(inquire::Confirm::new(message)
            .with_default(false)
            .prompt()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_relative_time() {
        let now = Utc::now();
        assert_eq!(format_relative_time(&(now + Duration::hours(1))), "in the future");
        assert_eq!(format_relative_time(&now), "just now");
        assert_eq!(
            format_relative_time(&(now - Duration::minutes(5))),
            "5 minutes ago"
        );
        assert_eq!(format_relative_time(&(now - Duration::hours(1))), "1 hour ago");
        assert_eq!(format_relative_time(&(now - Duration::days(3))), "3 days ago");
        assert_eq!(
            format_relative_time(&(now - Duration::days(400))),
            "1 year ago"
        );
    }

    #[test]
    fn test_confirm_action_flags() {
        assert!(confirm_action("Delete?", true, true).unwrap());
        assert!(confirm_action("Delete?", false, true).is_err());
    }
}
