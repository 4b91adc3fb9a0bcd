//! Todo server: a resource router in front of an in-memory todo store.

pub mod router;
pub mod state;
pub mod todos;

use std::sync::Arc;

use api::routes;
use tokio::net::TcpListener;

pub use router::{HandlerSet, Router, RouterError};
pub use state::AppState;

pub fn app(state: Arc<AppState>) -> Result<axum::Router, RouterError> {
    let mut router = Router::default();
    router.map(&routes::todos(), todos::handlers(state))?;

    Ok(router.into_service())
}

pub async fn run(listener: TcpListener, state: Arc<AppState>) -> eyre::Result<()> {
    axum::serve(listener, app(state)?).await?;
    Ok(())
}
