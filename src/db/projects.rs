use crate::db::db::Db;
use crate::db::error::StorageResult;
use crate::db::repository::{Criteria, Patch, Record, Repository};
use rusqlite::types::Value;
use rusqlite::Row;
use serde::{Deserialize, Serialize};

pub const TABLE_PROJECTS: &str = "projects";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: Option<i64>,
    pub remote_id: String,
    pub name: String,
    /// Remote id of the owning client, if any.
    pub client_id: Option<String>,
    pub tenant_id: Option<String>,
    pub organization_id: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct ProjectPatch {
    pub name: Option<String>,
    pub client_id: Option<String>,
}

impl Patch for ProjectPatch {
    fn assignments(&self) -> Vec<(&'static str, Value)> {
        let mut set = Vec::new();
        if let Some(name) = &self.name {
            set.push(("name", Value::Text(name.clone())));
        }
        if let Some(client_id) = &self.client_id {
            set.push(("client_id", Value::Text(client_id.clone())));
        }
        set
    }
}

impl Record for Project {
    const COLUMNS: &'static [&'static str] = &["remote_id", "name", "client_id", "tenant_id", "organization_id"];

    type Patch = ProjectPatch;

    fn id(&self) -> Option<i64> {
        self.id
    }

    fn values(&self) -> Vec<Value> {
        vec![
            Value::Text(self.remote_id.clone()),
            Value::Text(self.name.clone()),
            Value::from(self.client_id.clone()),
            Value::from(self.tenant_id.clone()),
            Value::from(self.organization_id.clone()),
        ]
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Project {
            id: Some(row.get("id")?),
            remote_id: row.get("remote_id")?,
            name: row.get("name")?,
            client_id: row.get("client_id")?,
            tenant_id: row.get("tenant_id")?,
            organization_id: row.get("organization_id")?,
        })
    }

    fn natural_key(&self) -> Option<(&'static str, Value)> {
        Some(("remote_id", Value::Text(self.remote_id.clone())))
    }
}

pub type Projects = Repository<Project>;

impl Repository<Project> {
    pub fn new(db: &Db) -> Self {
        Self::with_table(db, TABLE_PROJECTS)
    }

    /// Projects visible to one organization of a tenant.
    pub fn find_for_organization(&self, tenant_id: &str, organization_id: &str) -> StorageResult<Vec<Project>> {
        self.find_by(&Criteria::eq("tenant_id", tenant_id.to_string()).and("organization_id", organization_id.to_string()))
    }
}
