use std::fmt;
use std::str::FromStr;

use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Serialize, Serializer};

use crate::error::Error;

/// A subject's role within a namespace.
///
/// Roles are totally ordered: `ReadOnly < Editor < Admin`. The discriminant is
/// the rank stored in the database.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Role {
    ReadOnly = 1,
    Editor = 2,
    Admin = 3,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::ReadOnly, Role::Editor, Role::Admin];

    /// Returns true if `assigned` satisfies `required`.
    #[must_use]
    pub const fn sufficient(assigned: Role, required: Role) -> bool {
        assigned.rank() >= required.rank()
    }

    #[must_use]
    pub const fn rank(self) -> i64 {
        self as i64
    }

    #[must_use]
    pub const fn from_rank(rank: i64) -> Option<Role> {
        match rank {
            1 => Some(Role::ReadOnly),
            2 => Some(Role::Editor),
            3 => Some(Role::Admin),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Role::ReadOnly => "ReadOnly",
            Role::Editor => "Editor",
            Role::Admin => "Admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "readonly" | "read-only" | "read_only" | "read" => Ok(Role::ReadOnly),
            "editor" | "write" => Ok(Role::Editor),
            "admin" => Ok(Role::Admin),
            _ => Err(Error::bad_input(format!(
                "Invalid role '{s}'. Valid roles are: ReadOnly, Editor, Admin"
            ))),
        }
    }
}

impl Serialize for Role {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl ToSql for Role {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.rank()))
    }
}

impl FromSql for Role {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let rank = value.as_i64()?;
        Role::from_rank(rank).ok_or(FromSqlError::OutOfRange(rank))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_admin_satisfies_everything() {
        for required in Role::ALL {
            assert!(Role::sufficient(Role::Admin, required));
        }
    }

    #[test]
    fn test_read_only_cannot_edit() {
        assert!(!Role::sufficient(Role::ReadOnly, Role::Editor));
        assert!(!Role::sufficient(Role::ReadOnly, Role::Admin));
        assert!(!Role::sufficient(Role::Editor, Role::Admin));
    }

    #[test]
    fn test_role_satisfies_itself() {
        for role in Role::ALL {
            assert!(Role::sufficient(role, role));
        }
    }

    #[test]
    fn test_parse_role() {
        assert_eq!("ReadOnly".parse::<Role>().unwrap(), Role::ReadOnly);
        assert_eq!("read".parse::<Role>().unwrap(), Role::ReadOnly);
        assert_eq!("EDITOR".parse::<Role>().unwrap(), Role::Editor);
        assert_eq!(" admin ".parse::<Role>().unwrap(), Role::Admin);
        assert!(matches!("owner".parse::<Role>(), Err(Error::BadInput(_))));
    }

    #[test]
    fn test_rank_round_trip() {
        for role in Role::ALL {
            assert_eq!(Role::from_rank(role.rank()), Some(role));
        }
        assert_eq!(Role::from_rank(0), None);
        assert_eq!(Role::from_rank(4), None);
    }
}
