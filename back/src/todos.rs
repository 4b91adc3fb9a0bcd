use std::{future::Future, sync::Arc};

use api::{
    resource::{Action, Params},
    v1::{
        parse_timestamp, validate_title, CreateTodoForm, Created, ErrorBody, ListParams,
        PaginationInfo, Todo, UpdateTodoForm, ValidationError, DEFAULT_PAGE, DEFAULT_PER_PAGE,
        NULL_SENTINEL, TOTAL_COUNT_HEADER, TOTAL_PAGES_HEADER,
    },
};
use axum::{
    extract::{FromRequest, Query, Request},
    http::StatusCode,
    response::{IntoResponse, Response},
    Form, Json,
};
use tracing::info;
use uuid::Uuid;

use crate::{
    router::{not_found, HandlerSet},
    AppState,
};

pub fn handlers(state: Arc<AppState>) -> HandlerSet {
    HandlerSet::new()
        .on(Action::Index, bind(&state, index))
        .on(Action::Show, bind(&state, show))
        .on(Action::Create, bind(&state, create))
        .on(Action::Update, bind(&state, update))
        .on(Action::Destroy, bind(&state, destroy))
}

fn bind<F, Fut>(
    state: &Arc<AppState>,
    f: F,
) -> impl Fn(Request, Params) -> Fut + Send + Sync + 'static
where
    F: Fn(Arc<AppState>, Request, Params) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Response> + Send + 'static,
{
    let state = state.clone();
    move |request, params| f(state.clone(), request, params)
}

async fn index(state: Arc<AppState>, request: Request, _: Params) -> Response {
    let Query(query) = match Query::<ListParams>::try_from_uri(request.uri()) {
        Ok(query) => query,
        Err(rejection) => return rejection.into_response(),
    };

    let page = query.page.unwrap_or(DEFAULT_PAGE).max(1);
    let per_page = query.per_page.unwrap_or(DEFAULT_PER_PAGE).max(1);
    let needle = (query.q.as_deref())
        .map(str::trim)
        .filter(|q| !q.is_empty())
        .map(str::to_lowercase);

    let mut todos: Vec<Todo> = {
        let todos = state.todos.lock().await;
        (todos.values())
            .filter(|todo| match &needle {
                Some(needle) => todo.title.to_lowercase().contains(needle),
                None => true,
            })
            .cloned()
            .collect()
    };
    todos.sort_unstable_by(|a, b| {
        (a.created_at.cmp(&b.created_at).reverse()).then_with(|| a.id.cmp(&b.id))
    });

    let info = PaginationInfo::new(todos.len() as u64, per_page);
    let skip = (page as usize - 1).saturating_mul(per_page as usize);
    let todos: Vec<Todo> = todos.into_iter().skip(skip).take(per_page as usize).collect();

    let headers = [
        (TOTAL_COUNT_HEADER, info.count.to_string()),
        (TOTAL_PAGES_HEADER, info.pages.to_string()),
    ];

    (headers, Json(todos)).into_response()
}

async fn show(state: Arc<AppState>, _: Request, params: Params) -> Response {
    let Some(id) = todo_id(&params) else {
        return bad_id();
    };

    let todos = state.todos.lock().await;
    match todos.get(&id) {
        Some(todo) => Json(todo.clone()).into_response(),
        None => not_found(),
    }
}

async fn create(state: Arc<AppState>, request: Request, _: Params) -> Response {
    let Form(form) = match Form::<CreateTodoForm>::from_request(request, &()).await {
        Ok(form) => form,
        Err(rejection) => return rejection.into_response(),
    };

    if let Err(err) = validate_title(&form.title) {
        return unprocessable(err);
    }

    let todo = Todo::new(form.title);
    state.todos.lock().await.insert(todo.id, todo.clone());

    info!(
        id = %todo.id,
        title = %todo.title,
        "created todo"
    );

    (StatusCode::CREATED, Json(Created { data: todo })).into_response()
}

async fn update(state: Arc<AppState>, request: Request, params: Params) -> Response {
    let Some(id) = todo_id(&params) else {
        return bad_id();
    };

    let Form(form) = match Form::<UpdateTodoForm>::from_request(request, &()).await {
        Ok(form) => form,
        Err(rejection) => return rejection.into_response(),
    };

    if let Some(title) = &form.title {
        if let Err(err) = validate_title(title) {
            return unprocessable(err);
        }
    }

    let completed_at = match form.completed_at.as_deref() {
        None => None,
        Some(NULL_SENTINEL) => Some(None),
        Some(raw) => match parse_timestamp(raw) {
            Some(at) => Some(Some(at)),
            None => {
                return unprocessable(ValidationError::new(
                    "completedAt",
                    "expected ISO 8601 datetime or \"null\"",
                ))
            }
        },
    };

    let mut todos = state.todos.lock().await;
    let Some(todo) = todos.get_mut(&id) else {
        return not_found();
    };

    if let Some(title) = form.title {
        todo.title = title;
    }
    if let Some(completed_at) = completed_at {
        todo.completed_at = completed_at;
    }
    todo.touch();

    info!(
        id = %todo.id,
        title = ?todo.title,
        completed_at = ?todo.completed_at,
        "updated todo"
    );

    Json(todo.clone()).into_response()
}

async fn destroy(state: Arc<AppState>, _: Request, params: Params) -> Response {
    let Some(id) = todo_id(&params) else {
        return bad_id();
    };

    match state.todos.lock().await.remove(&id) {
        Some(todo) => {
            info!(id = %todo.id, "deleted todo");
            StatusCode::NO_CONTENT.into_response()
        }
        None => not_found(),
    }
}

fn todo_id(params: &Params) -> Option<Uuid> {
    params.get("id").and_then(|id| Uuid::parse_str(id).ok())
}

fn bad_id() -> Response {
    (StatusCode::BAD_REQUEST, Json(ErrorBody::new("invalid id"))).into_response()
}

fn unprocessable(err: ValidationError) -> Response {
    let body = ErrorBody::new(err.to_string());
    (StatusCode::UNPROCESSABLE_ENTITY, Json(body)).into_response()
}
