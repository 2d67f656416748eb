use crate::db::db::Db;
use crate::db::repository::{Patch, Record, Repository};
use rusqlite::types::Value;
use rusqlite::Row;
use serde::{Deserialize, Serialize};

pub const TABLE_CLIENTS: &str = "clients";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Client {
    pub id: Option<i64>,
    pub remote_id: String,
    pub name: String,
    pub tenant_id: Option<String>,
    pub organization_id: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct ClientPatch {
    pub name: Option<String>,
}

impl Patch for ClientPatch {
    fn assignments(&self) -> Vec<(&'static str, Value)> {
        self.name.iter().map(|name| ("name", Value::Text(name.clone()))).collect()
    }
}

impl Record for Client {
    const COLUMNS: &'static [&'static str] = &["remote_id", "name", "tenant_id", "organization_id"];

    type Patch = ClientPatch;

    fn id(&self) -> Option<i64> {
        self.id
    }

    fn values(&self) -> Vec<Value> {
        vec![
            Value::Text(self.remote_id.clone()),
            Value::Text(self.name.clone()),
            Value::from(self.tenant_id.clone()),
            Value::from(self.organization_id.clone()),
        ]
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Client {
            id: Some(row.get("id")?),
            remote_id: row.get("remote_id")?,
            name: row.get("name")?,
            tenant_id: row.get("tenant_id")?,
            organization_id: row.get("organization_id")?,
        })
    }

    fn natural_key(&self) -> Option<(&'static str, Value)> {
        Some(("remote_id", Value::Text(self.remote_id.clone())))
    }
}

pub type Clients = Repository<Client>;

impl Repository<Client> {
    pub fn new(db: &Db) -> Self {
        Self::with_table(db, TABLE_CLIENTS)
    }
}
