mod account;
mod credentials;
mod keys;
mod members;
mod namespace;
mod namespaces;

use std::sync::Arc;

use axum::{
    Router, middleware,
    routing::{delete, get, post, put},
};

use crate::server::gate::{RoleGate, require_role};
use crate::server::AppState;
use crate::types::Role;

/// Routes for signed-in users. Namespace-scoped groups each carry the
/// minimum role their routes require.
pub fn user_router(state: &Arc<AppState>) -> Router<Arc<AppState>> {
    let read_only = Router::new()
        .route("/namespace", get(namespace::get_namespace))
        .route("/namespace/access", get(namespace::check_access))
        .route("/keys", get(keys::list_keys))
        .route("/keys/{name}", get(keys::get_key))
        .route("/keys/{name}/value", get(keys::get_value))
        .route("/keys/{name}/history", get(keys::get_history))
        .route(
            "/keys/{name}/revisions/{revision}",
            get(keys::get_revision),
        )
        .route("/credentials", post(credentials::create_credential))
        .route_layer(middleware::from_fn_with_state(
            RoleGate::new(state, Role::ReadOnly),
            require_role,
        ));

    let editor = Router::new()
        .route("/keys", post(keys::create_key))
        .route("/keys/{name}", put(keys::update_key))
        .route("/keys/{name}", delete(keys::delete_key))
        .route("/keys/{name}/restore", post(keys::restore_key))
        .route(
            "/keys/{name}/revert/{revision}",
            post(keys::revert_key),
        )
        .route_layer(middleware::from_fn_with_state(
            RoleGate::new(state, Role::Editor),
            require_role,
        ));

    let admin = Router::new()
        .route("/namespace", put(namespace::update_namespace))
        .route("/namespace", delete(namespace::delete_namespace))
        .route("/namespace/members", get(members::list_members))
        .route("/namespace/members", post(members::add_member))
        .route(
            "/namespace/members/{user_id}",
            delete(members::remove_member),
        )
        .route_layer(middleware::from_fn_with_state(
            RoleGate::new(state, Role::Admin),
            require_role,
        ));

    Router::new()
        // Account
        .route("/user", get(account::get_current_user))
        .route("/user", delete(account::delete_current_user))
        // Namespaces the caller belongs to
        .route("/namespaces", get(namespaces::list_namespaces))
        .route("/namespaces", post(namespaces::create_namespace))
        // API keys
        .route("/credentials", get(credentials::list_credentials))
        .route(
            "/credentials/{id}",
            delete(credentials::revoke_credential),
        )
        .merge(read_only)
        .merge(editor)
        .merge(admin)
}
