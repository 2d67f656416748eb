//! Locally cached signed-in user.

use crate::db::db::Db;
use crate::db::error::StorageResult;
use crate::db::repository::{Patch, Record, Repository};
use rusqlite::types::Value;
use rusqlite::Row;
use serde::{Deserialize, Serialize};

pub const TABLE_USERS: &str = "users";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: Option<i64>,
    pub remote_id: String,
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub employee_id: Option<String>,
    pub tenant_id: Option<String>,
    pub organization_id: Option<String>,
}

impl User {
    pub fn new(remote_id: impl Into<String>) -> Self {
        User {
            id: None,
            remote_id: remote_id.into(),
            email: None,
            first_name: None,
            last_name: None,
            employee_id: None,
            tenant_id: None,
            organization_id: None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct UserPatch {
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub employee_id: Option<String>,
}

impl Patch for UserPatch {
    fn assignments(&self) -> Vec<(&'static str, Value)> {
        [
            ("email", &self.email),
            ("first_name", &self.first_name),
            ("last_name", &self.last_name),
            ("employee_id", &self.employee_id),
        ]
        .into_iter()
        .filter_map(|(column, value)| value.clone().map(|v| (column, Value::Text(v))))
        .collect()
    }
}

impl Record for User {
    const COLUMNS: &'static [&'static str] = &[
        "remote_id",
        "email",
        "first_name",
        "last_name",
        "employee_id",
        "tenant_id",
        "organization_id",
    ];

    type Patch = UserPatch;

    fn id(&self) -> Option<i64> {
        self.id
    }

    fn values(&self) -> Vec<Value> {
        vec![
            Value::Text(self.remote_id.clone()),
            Value::from(self.email.clone()),
            Value::from(self.first_name.clone()),
            Value::from(self.last_name.clone()),
            Value::from(self.employee_id.clone()),
            Value::from(self.tenant_id.clone()),
            Value::from(self.organization_id.clone()),
        ]
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(User {
            id: Some(row.get("id")?),
            remote_id: row.get("remote_id")?,
            email: row.get("email")?,
            first_name: row.get("first_name")?,
            last_name: row.get("last_name")?,
            employee_id: row.get("employee_id")?,
            tenant_id: row.get("tenant_id")?,
            organization_id: row.get("organization_id")?,
        })
    }

    fn natural_key(&self) -> Option<(&'static str, Value)> {
        Some(("remote_id", Value::Text(self.remote_id.clone())))
    }
}

pub type Users = Repository<User>;

impl Repository<User> {
    pub fn new(db: &Db) -> Self {
        Self::with_table(db, TABLE_USERS)
    }

    /// The client keeps a single signed-in user.
    pub fn retrieve(&self) -> StorageResult<Option<User>> {
        Ok(self.select("ORDER BY id DESC LIMIT 1", Vec::new())?.pop())
    }
}
