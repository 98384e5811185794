use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;

use crate::clock::SystemClock;
use crate::service::Directory;
use crate::store::Store;
use crate::types::{RetentionCounts, StoreStats};

use super::init_store;
use super::pickers::{list_tokens, list_users};

#[derive(Serialize)]
struct UserOutput {
    id: i64,
    username: String,
    created_at: String,
}

#[derive(Serialize)]
struct TokenOutput {
    id: String,
    lookup: String,
    user_id: Option<i64>,
    username: Option<String>,
    is_admin: bool,
    created_at: String,
    expires_at: Option<String>,
    last_used_at: Option<String>,
}

#[derive(Serialize)]
struct DetailedServerInfo {
    #[serde(flatten)]
    stats: StoreStats,
    pending_purge: RetentionCounts,
    user_list: Vec<UserOutput>,
    token_list: Vec<TokenOutput>,
}

pub fn run_info(data_dir: String, json: bool) -> anyhow::Result<()> {
    let store = init_store(&data_dir)?;
    let stats = store.stats()?;
    let pending = store.retention_counts(Utc::now())?;

    if json {
        let directory = Directory::new(store, Arc::new(SystemClock));

        let user_list = list_users(&directory)?
            .into_iter()
            .map(|d| UserOutput {
                id: d.user.id,
                username: d.user.username,
                created_at: d.user.created_at.to_rfc3339(),
            })
            .collect();

        let token_list = list_tokens(&directory)?
            .into_iter()
            .map(|d| TokenOutput {
                id: d.token.id,
                lookup: d.token.token_lookup,
                user_id: d.token.user_id,
                username: d.username,
                is_admin: d.token.is_admin,
                created_at: d.token.created_at.to_rfc3339(),
                expires_at: d.token.expires_at.map(|dt| dt.to_rfc3339()),
                last_used_at: d.token.last_used_at.map(|dt| dt.to_rfc3339()),
            })
            .collect();

        let info = DetailedServerInfo {
            stats,
            pending_purge: pending,
            user_list,
            token_list,
        };

        println!("{}", serde_json::to_string_pretty(&info)?);
    } else {
        println!();
        println!("Revlo Server Status");
        println!("{}", "─".repeat(19));
        println!("Users:        {}", stats.users);
        println!("Namespaces:   {}", stats.namespaces);
        println!(
            "Keys:         {} ({} revisions)",
            stats.keys, stats.revisions
        );
        println!("API keys:     {}", stats.credentials);
        println!("Tokens:       {}", stats.tokens);
        if !pending.is_empty() {
            println!(
                "Pending purge: {} keys, {} namespaces, {} users, {} API keys ({} expired)",
                pending.keys,
                pending.namespaces,
                pending.users,
                pending.credentials,
                pending.expired_credentials
            );
        }
        println!();
    }

    Ok(())
}
