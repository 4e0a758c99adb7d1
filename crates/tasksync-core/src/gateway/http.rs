//! HTTP gateway over a generic document store.
//!
//! The store exposes an object API per collection: `find` (GET), `insertOne`
//! (POST), `updateOne` (PATCH), `deleteOne` (DELETE). A `find` against an
//! empty collection answers 404, which this gateway converts to an empty
//! snapshot rather than an error.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::json;

use crate::error::SyncError;
use crate::gateway::{CollectionGateway, FetchFilter};
use crate::models::{Entity, EntityDraft, EntityId, EntityPatch};

pub struct HttpGateway {
    base_url: String,
    collection: String,
    api_token: Option<String>,
    client: reqwest::Client,
}

/// Wire shape of one stored object.
#[derive(Debug, Deserialize)]
struct StoreRecord {
    id: String,
    title: String,
    #[serde(default)]
    done: bool,
    #[serde(default)]
    list: Option<String>,
    #[serde(default)]
    position: Option<i64>,
    #[serde(default)]
    modified_at: i64,
}

impl StoreRecord {
    fn into_entity(self) -> Entity {
        Entity {
            id: EntityId::Durable(self.id),
            title: self.title,
            done: self.done,
            list_id: self.list,
            position: self.position,
            modified_at: self.modified_at,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ObjectsResponse {
    #[serde(default)]
    objects: Vec<StoreRecord>,
}

#[derive(Debug, Deserialize)]
struct ObjectResponse {
    object: StoreRecord,
}

impl HttpGateway {
    pub fn new(base_url: impl Into<String>, collection: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            collection: collection.into(),
            api_token: None,
            client: reqwest::Client::new(),
        }
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.api_token = Some(token.into());
        self
    }

    fn objects_url(&self) -> String {
        format!("{}/objects", self.base_url)
    }

    fn object_url(&self, id: &str) -> String {
        format!("{}/objects/{}", self.base_url, id)
    }

    fn authorize(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_token {
            Some(token) => req.header("Authorization", format!("Bearer {}", token)),
            None => req,
        }
    }
}

/// Map an HTTP status class onto the error taxonomy.
fn status_error(status: StatusCode, id: Option<&str>, body: String) -> SyncError {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => SyncError::auth(body),
        StatusCode::NOT_FOUND => SyncError::not_found(id.unwrap_or("<unknown>")),
        StatusCode::CONFLICT => SyncError::Conflict {
            id: id.unwrap_or("<unknown>").to_string(),
        },
        s if s.is_client_error() => SyncError::validation(body),
        _ => SyncError::transient(format!("store answered {}: {}", status, body)),
    }
}

#[async_trait]
impl CollectionGateway for HttpGateway {
    async fn fetch_all(&self, filter: &FetchFilter) -> Result<Vec<Entity>, SyncError> {
        let mut query: Vec<(&str, String)> = vec![("type", self.collection.clone())];
        if let Some(owner) = &filter.owner_id {
            query.push(("owner", owner.clone()));
        }
        if let Some(list) = &filter.list_id {
            query.push(("list", list.clone()));
        }

        let response = self
            .authorize(self.client.get(self.objects_url()).query(&query))
            .send()
            .await?;

        // Empty collection answers 404; that is a valid empty snapshot.
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(Vec::new());
        }
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(status_error(status, None, body));
        }

        let parsed: ObjectsResponse = response.json().await?;
        Ok(parsed
            .objects
            .into_iter()
            .map(StoreRecord::into_entity)
            .collect())
    }

    async fn create(&self, draft: &EntityDraft) -> Result<Entity, SyncError> {
        let body = json!({
            "type": self.collection,
            "title": draft.title,
            "done": false,
            "list": draft.list_id,
            "position": draft.position,
        });

        let response = self
            .authorize(self.client.post(self.objects_url()).json(&body))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(status_error(status, None, text));
        }

        let parsed: ObjectResponse = response.json().await?;
        Ok(parsed.object.into_entity())
    }

    async fn update(&self, id: &str, patch: &EntityPatch) -> Result<Entity, SyncError> {
        let mut body = serde_json::Map::new();
        if let Some(title) = &patch.title {
            body.insert("title".into(), json!(title));
        }
        if let Some(done) = patch.done {
            body.insert("done".into(), json!(done));
        }
        if let Some(list) = &patch.list_id {
            body.insert("list".into(), json!(list));
        }
        if let Some(position) = patch.position {
            body.insert("position".into(), json!(position));
        }

        let response = self
            .authorize(self.client.patch(self.object_url(id)).json(&body))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(status_error(status, Some(id), text));
        }

        let parsed: ObjectResponse = response.json().await?;
        Ok(parsed.object.into_entity())
    }

    async fn delete(&self, id: &str) -> Result<(), SyncError> {
        let response = self
            .authorize(self.client.delete(self.object_url(id)))
            .send()
            .await?;

        // Already deleted is fine.
        if response.status() == StatusCode::NOT_FOUND || response.status().is_success() {
            return Ok(());
        }

        let status = response.status();
        let text = response.text().await.unwrap_or_default();
        Err(status_error(status, Some(id), text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert!(matches!(
            status_error(StatusCode::UNAUTHORIZED, None, String::new()),
            SyncError::Auth { .. }
        ));
        assert!(matches!(
            status_error(StatusCode::FORBIDDEN, None, String::new()),
            SyncError::Auth { .. }
        ));
        assert_eq!(
            status_error(StatusCode::NOT_FOUND, Some("abc"), String::new()),
            SyncError::not_found("abc")
        );
        assert!(matches!(
            status_error(StatusCode::CONFLICT, Some("abc"), String::new()),
            SyncError::Conflict { .. }
        ));
        assert!(matches!(
            status_error(StatusCode::UNPROCESSABLE_ENTITY, None, String::new()),
            SyncError::Validation { .. }
        ));
        assert!(status_error(StatusCode::INTERNAL_SERVER_ERROR, None, String::new()).is_transient());
        assert!(status_error(StatusCode::BAD_GATEWAY, None, String::new()).is_transient());
    }

    #[test]
    fn test_record_defaults() {
        let record: StoreRecord =
            serde_json::from_str(r#"{"id":"srv-1","title":"milk"}"#).unwrap();
        let entity = record.into_entity();
        assert_eq!(entity.id, EntityId::durable("srv-1"));
        assert!(!entity.done);
        assert_eq!(entity.list_id, None);
        assert_eq!(entity.modified_at, 0);
    }

    #[test]
    fn test_base_url_trailing_slash() {
        let gateway = HttpGateway::new("http://store.local/", "tasks");
        assert_eq!(gateway.objects_url(), "http://store.local/objects");
        assert_eq!(gateway.object_url("x"), "http://store.local/objects/x");
    }
}
