use std::sync::{Arc, Mutex, PoisonError};

use api::v1::{PaginationInfo, Todo};
use tokio::sync::mpsc;
use uuid::Uuid;

/// A state transition observed by a successful client call.
#[derive(Clone, Debug, PartialEq)]
pub enum TodoEvent {
    ListFetched { todos: Vec<Todo> },
    ItemFetched { todo: Todo },
    ItemCreated { todo: Todo },
    ItemUpdated { todo: Todo },
    ItemDeleted { id: Uuid },
    PaginationInfo(PaginationInfo),
}

/// Fan-out of [`TodoEvent`]s to any number of subscribers.
#[derive(Clone, Default, Debug)]
pub struct EventBus {
    subscribers: Arc<Mutex<Vec<mpsc::UnboundedSender<TodoEvent>>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<TodoEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.lock().push(tx);
        rx
    }

    /// Deliver `event` to every live subscriber, dropping closed ones.
    pub fn emit(&self, event: TodoEvent) {
        self.lock().retain(|tx| tx.send(event.clone()).is_ok());
    }

    pub fn subscriber_count(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<mpsc::UnboundedSender<TodoEvent>>> {
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}
