use async_trait::async_trait;
use axum::Router;

/// Context provided to modules during initialization
pub struct InitCtx<'a> {
    pub settings: &'a crate::settings::Settings,
}

/// Schema migration contributed by a module.
///
/// `id` must sort in application order within its module; the runner
/// records `(module, id)` pairs so each migration is applied once.
#[derive(Debug, Clone)]
pub struct Migration {
    pub id: &'static str,
    pub up: &'static str,
}

/// Core module trait that every bookstore module implements
#[async_trait]
pub trait Module: Sync + Send {
    /// Unique name for this module, also used as its route prefix
    fn name(&self) -> &'static str;

    /// Initialize the module with the provided context.
    /// Called during startup after migrations have been applied.
    async fn init(&self, _ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        Ok(())
    }

    /// Return the Axum router for this module's routes.
    /// Routes are mounted under `{api_prefix}/{module_name}`.
    fn routes(&self) -> Router {
        Router::new()
    }

    /// Return an OpenAPI fragment (`paths` and `components`) for this module
    fn openapi(&self) -> Option<serde_json::Value> {
        None
    }

    /// Return migrations contributed by this module, in application order
    fn migrations(&self) -> Vec<Migration> {
        vec![]
    }

    /// Called once every module has been initialized
    async fn start(&self, _ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        Ok(())
    }

    /// Called during shutdown
    async fn stop(&self) -> anyhow::Result<()> {
        Ok(())
    }
}
