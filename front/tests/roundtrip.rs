//! Full lifecycle against the real server on an ephemeral port.

use std::sync::Arc;

use api::v1::{PaginationInfo, Todo};
use todo_back::AppState;
use todo_front::{ClientError, ListQuery, TodoEvent, TodosClient};
use tokio::{net::TcpListener, sync::mpsc::UnboundedReceiver};
use tokio_util::sync::CancellationToken;

async fn spawn_server() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(todo_back::run(listener, Arc::new(AppState::default())));
    format!("http://{addr}")
}

fn expect_todo(events: &mut UnboundedReceiver<TodoEvent>) -> Todo {
    match events.try_recv().unwrap() {
        TodoEvent::ItemFetched { todo }
        | TodoEvent::ItemCreated { todo }
        | TodoEvent::ItemUpdated { todo } => todo,
        other => panic!("expected a single todo, got {other:?}"),
    }
}

#[tokio::test]
async fn crud_lifecycle() {
    let client = TodosClient::new(&spawn_server().await, CancellationToken::new());
    let mut events = client.subscribe();

    client.create("Buy milk", None).await.unwrap();
    let created = expect_todo(&mut events);
    assert_eq!(created.title, "Buy milk");
    assert!(created.completed_at.is_none());

    client.show(created.id, None).await.unwrap();
    let shown = expect_todo(&mut events);
    assert_eq!(shown.title, created.title);
    assert_eq!(shown.completed_at, created.completed_at);

    client.complete(created.id, None).await.unwrap();
    let completed = expect_todo(&mut events);
    assert!(completed.is_completed());
    assert!(completed.updated_at >= completed.created_at);

    client.uncomplete(created.id, None).await.unwrap();
    assert!(expect_todo(&mut events).completed_at.is_none());

    client.create("Walk dog", None).await.unwrap();
    expect_todo(&mut events);

    client
        .list(&ListQuery::search("  MILK "), None)
        .await
        .unwrap();
    match events.try_recv().unwrap() {
        TodoEvent::ListFetched { todos } => {
            assert_eq!(todos.len(), 1);
            assert_eq!(todos[0].id, created.id);
        }
        other => panic!("expected ListFetched, got {other:?}"),
    }
    assert_eq!(
        events.try_recv().unwrap(),
        TodoEvent::PaginationInfo(PaginationInfo { count: 1, pages: 1 })
    );

    client.destroy(created.id, None).await.unwrap();
    assert_eq!(
        events.try_recv().unwrap(),
        TodoEvent::ItemDeleted { id: created.id }
    );

    let err = client.show(created.id, None).await.unwrap_err();
    assert!(matches!(err, ClientError::Status { status: 404, .. }));
    assert!(events.try_recv().is_err());
}

#[tokio::test]
async fn fetch_picks_show_or_list() {
    let client = TodosClient::new(&spawn_server().await, CancellationToken::new());
    let mut events = client.subscribe();

    client.create("Buy milk", None).await.unwrap();
    let created = expect_todo(&mut events);

    client.fetch(Some(created.id), None, None).await.unwrap();
    assert_eq!(expect_todo(&mut events).id, created.id);

    client.fetch(None, Some("bread"), None).await.unwrap();
    assert_eq!(
        events.try_recv().unwrap(),
        TodoEvent::ListFetched { todos: vec![] }
    );
    assert_eq!(
        events.try_recv().unwrap(),
        TodoEvent::PaginationInfo(PaginationInfo { count: 0, pages: 0 })
    );
}

#[tokio::test]
async fn server_rejects_blank_title() {
    let client = TodosClient::new(&spawn_server().await, CancellationToken::new());
    let mut events = client.subscribe();

    let err = client.create("", None).await.unwrap_err();
    assert!(matches!(err, ClientError::Status { status: 422, .. }));
    assert!(events.try_recv().is_err());
}
