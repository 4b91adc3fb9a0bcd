//! Cancellable client for the todos resource.
//!
//! Every call builds its URL from the shared [`ResourceDescriptor`], runs
//! the request under the union of the client's own cancellation token and
//! an optional per-call token, validates the body and only then emits
//! [`TodoEvent`]s. Failed or cancelled calls emit nothing.

use api::{
    resource::{Action, Params, ResourceDescriptor},
    routes,
    v1::{
        format_timestamp, CreateTodoForm, PaginationInfo, Schema, Todo, UpdateTodoForm,
        ValidationError, DEFAULT_PAGE, DEFAULT_PER_PAGE, NULL_SENTINEL, TOTAL_COUNT_HEADER,
        TOTAL_PAGES_HEADER,
    },
};
use chrono::{DateTime, Utc};
use reqwest::{header::HeaderMap, Response};
use serde_json::Value;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use url::Url;
use uuid::Uuid;

use crate::{
    cancel::AnyOf,
    events::{EventBus, TodoEvent},
    ClientError,
};

/// Arguments of [`TodosClient::list`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ListQuery {
    pub text: Option<String>,
    pub page: u32,
    pub per_page: u32,
}

impl Default for ListQuery {
    fn default() -> Self {
        Self {
            text: None,
            page: DEFAULT_PAGE,
            per_page: DEFAULT_PER_PAGE,
        }
    }
}

impl ListQuery {
    pub fn search(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Self::default()
        }
    }

    pub fn page(mut self, page: u32, per_page: u32) -> Self {
        self.page = page;
        self.per_page = per_page;
        self
    }
}

/// A partial update. `completed_at: Some(None)` clears the completion,
/// `None` leaves it alone.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TodoPatch {
    pub title: Option<String>,
    pub completed_at: Option<Option<DateTime<Utc>>>,
}

impl TodoPatch {
    pub fn title(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            ..Self::default()
        }
    }

    pub fn completed_at(at: Option<DateTime<Utc>>) -> Self {
        Self {
            completed_at: Some(at),
            ..Self::default()
        }
    }

    /// An empty title is dropped like an absent one; `completedAt` is kept
    /// whenever it was given, even to clear it.
    pub fn to_form(&self) -> UpdateTodoForm {
        UpdateTodoForm {
            title: self.title.clone().filter(|title| !title.is_empty()),
            completed_at: self.completed_at.map(|at| match at {
                Some(at) => format_timestamp(at),
                None => NULL_SENTINEL.to_string(),
            }),
        }
    }
}

pub struct TodosClient {
    http: reqwest::Client,
    base_url: String,
    resource: ResourceDescriptor,
    token: CancellationToken,
    events: EventBus,
}

impl TodosClient {
    /// A client for the todos resource at `base_url`, alive until `token`
    /// is cancelled.
    pub fn new(base_url: &str, token: CancellationToken) -> Self {
        Self::with_resource(base_url, routes::todos(), token)
    }

    pub fn with_resource(
        base_url: &str,
        resource: ResourceDescriptor,
        token: CancellationToken,
    ) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            resource,
            token,
            events: EventBus::new(),
        }
    }

    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<TodoEvent> {
        self.events.subscribe()
    }

    /// Show `id` when given, otherwise list with `query` as the filter.
    pub async fn fetch(
        &self,
        id: Option<Uuid>,
        query: Option<&str>,
        token: Option<&CancellationToken>,
    ) -> Result<(), ClientError> {
        match id {
            Some(id) => self.show(id, token).await,
            None => {
                let query = ListQuery {
                    text: query.map(str::to_string),
                    ..ListQuery::default()
                };
                self.list(&query, token).await
            }
        }
    }

    pub async fn list(
        &self,
        query: &ListQuery,
        token: Option<&CancellationToken>,
    ) -> Result<(), ClientError> {
        let mut url = self.url(Action::Index, &Params::new())?;
        {
            let mut pairs = url.query_pairs_mut();
            let text = query.text.as_deref().map(str::trim).unwrap_or_default();
            if !text.is_empty() {
                pairs.append_pair("q", text);
            }
            pairs.append_pair("page", &query.page.max(1).to_string());
            pairs.append_pair("per_page", &query.per_page.max(1).to_string());
        }

        let (headers, body) = self
            .scope(token)
            .run(async {
                debug!(%url, "GET");
                let response = self.http.get(url.clone()).send().await?;
                let response = check_status(response).await?;
                let headers = response.headers().clone();
                let bytes = response.bytes().await?;
                Ok((headers, serde_json::from_slice::<Value>(&bytes)?))
            })
            .await?;

        let todos = Todo::parse_array(&body)?;
        let info = PaginationInfo {
            count: header_count(&headers, TOTAL_COUNT_HEADER),
            pages: header_count(&headers, TOTAL_PAGES_HEADER),
        };

        self.events.emit(TodoEvent::ListFetched { todos });
        self.events.emit(TodoEvent::PaginationInfo(info));
        Ok(())
    }

    pub async fn show(
        &self,
        id: Uuid,
        token: Option<&CancellationToken>,
    ) -> Result<(), ClientError> {
        let url = self.url(Action::Show, &id_param(id))?;

        let body = self
            .scope(token)
            .run(async {
                debug!(%url, "GET");
                let response = self.http.get(url.clone()).send().await?;
                read_json(response).await
            })
            .await?;

        let todo = Todo::parse(&body)?;
        self.events.emit(TodoEvent::ItemFetched { todo });
        Ok(())
    }

    pub async fn create(
        &self,
        title: &str,
        token: Option<&CancellationToken>,
    ) -> Result<(), ClientError> {
        let url = self.url(Action::Create, &Params::new())?;
        let form = CreateTodoForm {
            title: title.to_string(),
        };

        let body = self
            .scope(token)
            .run(async {
                debug!(%url, "POST");
                let response = self.http.post(url.clone()).form(&form).send().await?;
                read_json(response).await
            })
            .await?;

        let data = (body.get("data"))
            .ok_or_else(|| ValidationError::new("$.data", "required"))?;
        let todo = Todo::parse_at(data, "$.data")?;
        self.events.emit(TodoEvent::ItemCreated { todo });
        Ok(())
    }

    pub async fn update(
        &self,
        id: Uuid,
        patch: &TodoPatch,
        token: Option<&CancellationToken>,
    ) -> Result<(), ClientError> {
        let url = self.url(Action::Update, &id_param(id))?;
        let form = patch.to_form();

        let body = self
            .scope(token)
            .run(async {
                debug!(%url, "PUT");
                let response = self.http.put(url.clone()).form(&form).send().await?;
                read_json(response).await
            })
            .await?;

        let todo = Todo::parse(&body)?;
        self.events.emit(TodoEvent::ItemUpdated { todo });
        Ok(())
    }

    pub async fn complete(
        &self,
        id: Uuid,
        token: Option<&CancellationToken>,
    ) -> Result<(), ClientError> {
        let patch = TodoPatch::completed_at(Some(Utc::now()));
        self.update(id, &patch, token).await
    }

    pub async fn uncomplete(
        &self,
        id: Uuid,
        token: Option<&CancellationToken>,
    ) -> Result<(), ClientError> {
        self.update(id, &TodoPatch::completed_at(None), token).await
    }

    pub async fn destroy(
        &self,
        id: Uuid,
        token: Option<&CancellationToken>,
    ) -> Result<(), ClientError> {
        let url = self.url(Action::Destroy, &id_param(id))?;

        self.scope(token)
            .run(async {
                debug!(%url, "DELETE");
                let response = self.http.delete(url.clone()).send().await?;
                check_status(response).await?;
                Ok(())
            })
            .await?;

        self.events.emit(TodoEvent::ItemDeleted { id });
        Ok(())
    }

    fn scope<'a>(&'a self, token: Option<&'a CancellationToken>) -> AnyOf<'a> {
        AnyOf::new(&self.token, token)
    }

    fn url(&self, action: Action, params: &Params) -> Result<Url, ClientError> {
        let path = self.resource.href(action, params)?;
        Ok(Url::parse(&format!("{}{path}", self.base_url))?)
    }
}

fn id_param(id: Uuid) -> Params {
    Params::new().with("id", id.to_string())
}

async fn check_status(response: Response) -> Result<Response, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    debug!(%status, "request failed");
    Err(ClientError::Status {
        status: status.as_u16(),
        body,
    })
}

async fn read_json(response: Response) -> Result<Value, ClientError> {
    let response = check_status(response).await?;
    let bytes = response.bytes().await?;
    Ok(serde_json::from_slice(&bytes)?)
}

/// Missing or non-numeric headers count as zero.
fn header_count(headers: &HeaderMap, name: &str) -> u64 {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse().ok())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use reqwest::header::HeaderValue;

    use super::*;

    #[test]
    fn patch_keeps_explicit_null_and_drops_empty_title() {
        let form = TodoPatch::completed_at(None).to_form();
        assert_eq!(form.completed_at.as_deref(), Some("null"));
        assert_eq!(form.title, None);

        let form = TodoPatch::title("").to_form();
        assert_eq!(form, UpdateTodoForm::default());

        let at = api::v1::parse_timestamp("2024-05-01T10:00:00Z").unwrap();
        let form = TodoPatch::completed_at(Some(at)).to_form();
        assert_eq!(form.completed_at.as_deref(), Some("2024-05-01T10:00:00.000Z"));
    }

    #[test]
    fn header_counts_default_to_zero() {
        let mut headers = HeaderMap::new();
        headers.insert("x-total-count", HeaderValue::from_static("12"));
        headers.insert("x-total-pages", HeaderValue::from_static("lots"));

        assert_eq!(header_count(&headers, TOTAL_COUNT_HEADER), 12);
        assert_eq!(header_count(&headers, TOTAL_PAGES_HEADER), 0);
        assert_eq!(header_count(&HeaderMap::new(), TOTAL_COUNT_HEADER), 0);
    }

    #[test]
    fn disabled_action_fails_before_any_request() {
        let resource = routes::todos().only(&[Action::Index]);
        let client =
            TodosClient::with_resource("http://localhost:1", resource, CancellationToken::new());

        let err = client.url(Action::Show, &id_param(Uuid::nil())).unwrap_err();
        assert!(matches!(err, ClientError::Resource(_)));
    }
}
