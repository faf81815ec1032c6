//! Faculty CRUD

use crate::client::HttpClient;
use crate::error::Result;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Faculty {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Faculty {
    pub fn new(name: impl Into<String>) -> Self {
        Faculty {
            id: None,
            name: name.into(),
            code: None,
            description: None,
        }
    }
}

#[derive(Clone)]
pub struct FacultyService {
    client: HttpClient,
}

impl FacultyService {
    pub fn new(client: HttpClient) -> Self {
        FacultyService { client }
    }

    pub async fn list(&self) -> Result<Vec<Faculty>> {
        self.client.get("faculties").await
    }

    pub async fn get(&self, id: i64) -> Result<Faculty> {
        self.client.get(&format!("faculties/{}", id)).await
    }

    pub async fn create(&self, faculty: &Faculty) -> Result<Faculty> {
        self.client.post("faculties", faculty).await
    }

    pub async fn update(&self, id: i64, faculty: &Faculty) -> Result<Faculty> {
        self.client.put(&format!("faculties/{}", id), faculty).await
    }

    pub async fn delete(&self, id: i64) -> Result<()> {
        self.client.delete(&format!("faculties/{}", id)).await
    }
}
