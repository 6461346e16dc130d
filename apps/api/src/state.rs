use std::sync::Arc;

use sqlx::PgPool;

use crate::clock::Clock;
use crate::pipeline::Orchestrator;

/// Shared application state injected into all route handlers via Axum
/// extractors. Handlers only trigger pipelines and read persisted rows; the
/// external collaborators (storage, LLM, issuer HTTP) live with the workers
/// that use them.
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub orchestrator: Orchestrator,
    pub clock: Arc<dyn Clock>,
}
