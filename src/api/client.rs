use crate::api::store::{Direction, Fields, RawRecord, RemoteStore, StoreError, StoreResult};
use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use reqwest::{RequestBuilder, Response, StatusCode, Url};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// HTTP client for a JSON REST document store
///
/// Documents live under `{endpoint}/v1/collections/{collection}/documents`.
/// Collection names and ids are percent-encoded as single path segments.
/// No request timeout is set: a call fails only when the transport or the
/// store rejects it.
pub struct HttpStore {
    client: reqwest::Client,
    endpoint: Url,
    api_key: String,
}

#[derive(Debug, Deserialize)]
struct ListResponse {
    #[serde(default)]
    documents: Vec<RawRecord>,
}

#[derive(Debug, Deserialize)]
struct InsertResponse {
    id: String,
}

#[derive(Debug, Serialize)]
struct RangeQueryRequest<'a> {
    field: &'a str,
    lower: &'a str,
    upper: &'a str,
    limit: usize,
}

impl HttpStore {
    pub fn new(endpoint: String, api_key: String) -> Result<Self> {
        let endpoint = Url::parse(&endpoint)
            .context(format!("Invalid store endpoint: {}", endpoint))?;
        if endpoint.cannot_be_a_base() {
            bail!("Store endpoint cannot be used as a base URL: {}", endpoint);
        }

        let client = reqwest::Client::builder()
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            endpoint,
            api_key,
        })
    }

    /// Append `segments` to the endpoint path, each one percent-encoded
    fn url(&self, segments: &[&str]) -> StoreResult<Url> {
        for segment in segments {
            check_segment(segment)?;
        }

        let mut url = self.endpoint.clone();
        url.path_segments_mut()
            .map_err(|_| StoreError::InvalidPath(self.endpoint.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn documents_url(&self, collection: &str) -> StoreResult<Url> {
        self.url(&["v1", "collections", collection, "documents"])
    }

    fn document_url(&self, collection: &str, id: &str) -> StoreResult<Url> {
        self.url(&["v1", "collections", collection, "documents", id])
    }

    fn range_query_url(&self, collection: &str) -> StoreResult<Url> {
        check_segment(collection)?;
        let segment = format!("{}:rangeQuery", collection);
        self.url(&["v1", "collections", segment.as_str()])
    }

    async fn send(&self, request: RequestBuilder) -> StoreResult<Response> {
        request
            .bearer_auth(&self.api_key)
            .send()
            .await
            .map_err(|e| StoreError::Unreachable(e.to_string()))
    }
}

/// Empty and dot segments would be dropped or resolved by URL handling
fn check_segment(segment: &str) -> StoreResult<()> {
    if segment.is_empty() || segment == "." || segment == ".." {
        return Err(StoreError::InvalidPath(segment.to_string()));
    }
    Ok(())
}

/// Turn a non-success response into a `StoreError`
async fn check_status(response: Response, id: Option<&str>) -> StoreResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    if status == StatusCode::NOT_FOUND {
        if let Some(id) = id {
            return Err(StoreError::NotFound(id.to_string()));
        }
    }

    let message = response.text().await.unwrap_or_default();
    Err(StoreError::Rejected {
        status: status.as_u16(),
        message,
    })
}

async fn decode<T: serde::de::DeserializeOwned>(response: Response) -> StoreResult<T> {
    response
        .json::<T>()
        .await
        .map_err(|e| StoreError::Decode(e.to_string()))
}

#[async_trait]
impl RemoteStore for HttpStore {
    async fn list_all(
        &self,
        collection: &str,
        order_by: &str,
        direction: Direction,
    ) -> StoreResult<Vec<RawRecord>> {
        let url = self.documents_url(collection)?;
        debug!(url = %url, order_by = order_by, direction = direction.as_str(), "Listing documents");

        let request = self
            .client
            .get(url)
            .query(&[("orderBy", order_by), ("direction", direction.as_str())]);
        let response = check_status(self.send(request).await?, None).await?;

        Ok(decode::<ListResponse>(response).await?.documents)
    }

    async fn get_one(&self, collection: &str, id: &str) -> StoreResult<Option<RawRecord>> {
        let url = match self.document_url(collection, id) {
            Ok(url) => url,
            // No stored document can carry such an id
            Err(StoreError::InvalidPath(_)) if check_segment(collection).is_ok() => return Ok(None),
            Err(e) => return Err(e),
        };
        debug!(url = %url, "Fetching document");

        let response = self.send(self.client.get(url)).await?;
        match check_status(response, Some(id)).await {
            Ok(response) => Ok(Some(decode(response).await?)),
            Err(StoreError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn insert(&self, collection: &str, fields: Fields) -> StoreResult<String> {
        let url = self.documents_url(collection)?;
        debug!(url = %url, "Inserting document");

        let response = self.send(self.client.post(url).json(&fields)).await?;
        let response = check_status(response, None).await?;

        Ok(decode::<InsertResponse>(response).await?.id)
    }

    async fn update_fields(&self, collection: &str, id: &str, fields: Fields) -> StoreResult<()> {
        let url = self.document_url(collection, id)?;
        debug!(url = %url, fields = fields.len(), "Updating document");

        let response = self.send(self.client.patch(url).json(&fields)).await?;
        check_status(response, Some(id)).await?;

        Ok(())
    }

    async fn remove(&self, collection: &str, id: &str) -> StoreResult<()> {
        let url = self.document_url(collection, id)?;
        debug!(url = %url, "Removing document");

        let response = self.send(self.client.delete(url)).await?;
        match check_status(response, Some(id)).await {
            Ok(_) | Err(StoreError::NotFound(_)) => Ok(()),
            Err(e) => Err(e),
        }
    }

    async fn range_query(
        &self,
        collection: &str,
        field: &str,
        lower: &str,
        upper: &str,
        limit: usize,
    ) -> StoreResult<Vec<RawRecord>> {
        let url = self.range_query_url(collection)?;
        debug!(url = %url, field = field, limit = limit, "Running range query");

        let body = RangeQueryRequest {
            field,
            lower,
            upper,
            limit,
        };
        let response = self.send(self.client.post(url).json(&body)).await?;
        let response = check_status(response, None).await?;

        Ok(decode::<ListResponse>(response).await?.documents)
    }
}
