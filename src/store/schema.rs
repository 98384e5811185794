pub const SCHEMA: &str = r#"
-- Users are provisioned by an operator; soft-deleted users cannot authenticate
CREATE TABLE IF NOT EXISTS users (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    username TEXT NOT NULL,
    deleted INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL
);

-- Namespaces isolate keys; the creator is granted Admin on creation
CREATE TABLE IF NOT EXISTS namespaces (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    description TEXT,
    created_by INTEGER REFERENCES users(id) ON DELETE SET NULL,
    deleted INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL
);

-- Role a user holds in a namespace (1 = ReadOnly, 2 = Editor, 3 = Admin)
CREATE TABLE IF NOT EXISTS memberships (
    user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    namespace_id INTEGER NOT NULL REFERENCES namespaces(id) ON DELETE CASCADE,
    role INTEGER NOT NULL CHECK (role BETWEEN 1 AND 3),
    granted_at TEXT NOT NULL,
    PRIMARY KEY (user_id, namespace_id)
);

-- Keys point at their current revision; revisions are never updated
CREATE TABLE IF NOT EXISTS keys (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    namespace_id INTEGER NOT NULL REFERENCES namespaces(id) ON DELETE CASCADE,
    name TEXT NOT NULL,
    current_revision_id INTEGER REFERENCES revisions(id) ON DELETE SET NULL,
    deleted INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS revisions (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    key_id INTEGER NOT NULL REFERENCES keys(id) ON DELETE CASCADE,
    value TEXT NOT NULL,
    revision_number INTEGER NOT NULL CHECK (revision_number > 0),
    created_at TEXT NOT NULL,
    UNIQUE(key_id, revision_number)
);

-- Namespace-and-role scoped API keys; only a SHA-256 digest of the secret is kept
CREATE TABLE IF NOT EXISTS credentials (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    namespace_id INTEGER NOT NULL REFERENCES namespaces(id) ON DELETE CASCADE,
    secret_hash TEXT NOT NULL,
    secret_preview TEXT NOT NULL,
    role INTEGER NOT NULL CHECK (role BETWEEN 1 AND 3),
    description TEXT,
    created_at TEXT NOT NULL,
    expires_at TEXT,
    deleted INTEGER NOT NULL DEFAULT 0
);

-- Session tokens; non-admin tokens must belong to a user
CREATE TABLE IF NOT EXISTS tokens (
    id TEXT PRIMARY KEY,
    token_hash TEXT NOT NULL,          -- argon2id hash with embedded salt
    token_lookup TEXT NOT NULL,        -- lookup segment of the token
    is_admin INTEGER NOT NULL DEFAULT 0,
    user_id INTEGER REFERENCES users(id) ON DELETE CASCADE,
    created_at TEXT NOT NULL,
    expires_at TEXT,                   -- NULL = never
    last_used_at TEXT
);

-- Uniqueness only applies to rows that have not been soft-deleted
CREATE UNIQUE INDEX IF NOT EXISTS idx_users_username_active ON users(username) WHERE deleted = 0;
CREATE UNIQUE INDEX IF NOT EXISTS idx_namespaces_creator_name_active ON namespaces(created_by, name) WHERE deleted = 0;
CREATE UNIQUE INDEX IF NOT EXISTS idx_keys_namespace_name_active ON keys(namespace_id, name) WHERE deleted = 0;
CREATE UNIQUE INDEX IF NOT EXISTS idx_credentials_secret_hash ON credentials(secret_hash);
CREATE UNIQUE INDEX IF NOT EXISTS idx_tokens_lookup ON tokens(token_lookup);

CREATE INDEX IF NOT EXISTS idx_keys_namespace ON keys(namespace_id);
CREATE INDEX IF NOT EXISTS idx_keys_current_revision ON keys(current_revision_id);
CREATE INDEX IF NOT EXISTS idx_memberships_namespace ON memberships(namespace_id);
CREATE INDEX IF NOT EXISTS idx_credentials_user ON credentials(user_id);
CREATE INDEX IF NOT EXISTS idx_credentials_namespace ON credentials(namespace_id);
CREATE INDEX IF NOT EXISTS idx_namespaces_created_by ON namespaces(created_by);
CREATE INDEX IF NOT EXISTS idx_tokens_user ON tokens(user_id);
"#;
