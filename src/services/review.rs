//! Course and teacher reviews
//!
//! Review listings and rating summaries are public on the backend. When an
//! authenticated read comes back 401 (stale token), the read is repeated
//! once without credentials.

use crate::client::HttpClient;
use crate::error::{ClientError, Result};
use crate::models::RequestDescriptor;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub content: String,
    pub rating: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub course_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub teacher_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default)]
    pub anonymous: bool,
    #[serde(default)]
    pub pinned: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

impl Review {
    pub fn for_course(course_id: i64, rating: u8, content: impl Into<String>) -> Self {
        Review {
            id: None,
            content: content.into(),
            rating,
            course_id: Some(course_id),
            teacher_id: None,
            user_id: None,
            username: None,
            anonymous: false,
            pinned: false,
            created_at: None,
        }
    }
}

/// Aggregated ratings as returned by the backend (average, count, breakdown)
pub type RatingSummary = serde_json::Map<String, serde_json::Value>;

#[derive(Clone)]
pub struct ReviewService {
    client: HttpClient,
}

impl ReviewService {
    pub fn new(client: HttpClient) -> Self {
        ReviewService { client }
    }

    async fn get_public<T: DeserializeOwned>(&self, path: String) -> Result<T> {
        match self.client.get(&path).await {
            Err(e) if e.is_unauthorized() => {
                info!("{} rejected credentials, retrying as public request", path);
                self.client
                    .send_json(RequestDescriptor::get(path).skip_auth())
                    .await
            }
            other => other,
        }
    }

    /// All reviews, filtered by backend query parameters (admin)
    pub async fn all(&self, params: &[(&str, &str)]) -> Result<Vec<Review>> {
        let descriptor = params
            .iter()
            .fold(RequestDescriptor::get("reviews"), |desc, (k, v)| desc.query(*k, v));
        self.client.send_json(descriptor).await
    }

    pub async fn by_course(&self, course_id: i64) -> Result<Vec<Review>> {
        self.get_public(format!("reviews/course/{}", course_id)).await
    }

    pub async fn by_teacher(&self, teacher_id: i64) -> Result<Vec<Review>> {
        self.get_public(format!("reviews/teacher/{}", teacher_id)).await
    }

    pub async fn by_user(&self, user_id: i64) -> Result<Vec<Review>> {
        self.client.get(&format!("reviews/user/{}", user_id)).await
    }

    /// Post a review; a 403 here means the author is muted
    pub async fn create(&self, review: &Review) -> Result<Review> {
        match self.client.post("reviews", review).await {
            Err(e) if e.status() == Some(403) => Err(ClientError::banned()),
            other => other,
        }
    }

    /// Update a review; the owner id is taken from the session when present
    pub async fn update(&self, id: i64, review: &Review) -> Result<Review> {
        let mut descriptor = RequestDescriptor::put(format!("reviews/{}", id)).json(review)?;
        if let Some(owner) = self.client.session().user_id() {
            descriptor = descriptor.query("reviewOwnerId", owner);
        }
        self.client.send_json(descriptor).await
    }

    /// Delete one of the current user's reviews
    ///
    /// Fails with `NotAuthenticated` before any request when nobody is logged in.
    pub async fn delete(&self, id: i64) -> Result<()> {
        let owner = self.client.session().require_user_id()?;
        let descriptor = RequestDescriptor::delete(format!("reviews/{}", id)).query("reviewOwnerId", owner);
        self.client.send(descriptor).await.map(|_| ())
    }

    pub async fn pin(&self, id: i64) -> Result<Review> {
        self.client.patch(&format!("reviews/{}/pin", id)).await
    }

    pub async fn unpin(&self, id: i64) -> Result<Review> {
        self.client.patch(&format!("reviews/{}/unpin", id)).await
    }

    pub async fn course_ratings(&self, course_id: i64) -> Result<RatingSummary> {
        self.get_public(format!("reviews/course/{}/ratings", course_id)).await
    }

    pub async fn teacher_ratings(&self, teacher_id: i64) -> Result<RatingSummary> {
        self.get_public(format!("reviews/teacher/{}/ratings", teacher_id)).await
    }

    /// Delete any review (admin)
    pub async fn admin_delete(&self, id: i64) -> Result<()> {
        self.client.delete(&format!("reviews/{}/admin", id)).await
    }

    /// Delete several reviews at once (admin)
    pub async fn batch_delete(&self, ids: &[i64]) -> Result<()> {
        let descriptor = RequestDescriptor::post("reviews/batch-delete").json(&json!({ "ids": ids }))?;
        self.client.send(descriptor).await.map(|_| ())
    }
}
