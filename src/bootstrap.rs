//! Process bootstrap shared by `bookstore-app` and `bookstore-cli`.

use std::sync::Arc;

use anyhow::Context;
use bookstore_db::Database;
use bookstore_kernel::{
    settings::{Settings, StoreBackend},
    InitCtx, ModuleRegistry,
};

use crate::modules::{
    self,
    books::store::{BookStore, MemoryBookStore, SqliteBookStore},
};

/// Registry with every module wired to its store, migrations applied.
pub struct Application {
    pub registry: ModuleRegistry,
    pub database: Option<Database>,
}

impl Application {
    /// Open the configured store, register modules, and apply pending migrations.
    pub async fn build(settings: &Settings) -> anyhow::Result<Self> {
        let (store, database): (Arc<dyn BookStore>, Option<Database>) =
            match settings.database.backend {
                StoreBackend::Memory => {
                    tracing::warn!("using in-memory book store; data is lost on exit");
                    (Arc::new(MemoryBookStore::new()), None)
                }
                StoreBackend::Sqlite => {
                    let db = Database::open(&settings.database)
                        .with_context(|| "failed to open book database")?;
                    (Arc::new(SqliteBookStore::new(db.clone())), Some(db))
                }
            };

        let mut registry = ModuleRegistry::new();
        modules::register_all(&mut registry, store).context("failed to register modules")?;

        let app = Self { registry, database };
        app.migrate().await?;
        Ok(app)
    }

    /// Apply pending migrations. Returns how many ran; always zero without a database.
    pub async fn migrate(&self) -> anyhow::Result<usize> {
        let Some(db) = &self.database else {
            return Ok(0);
        };

        let applied = db
            .apply_migrations(&self.registry.collect_migrations())
            .await
            .context("failed to apply migrations")?;

        tracing::info!(applied, "migrations up to date");
        Ok(applied)
    }

    /// Run module lifecycle hooks around the HTTP server until shutdown.
    pub async fn serve(&self, settings: &Settings) -> anyhow::Result<()> {
        let ctx = InitCtx { settings };

        self.registry.init_all(&ctx).await?;
        self.registry.start_all(&ctx).await?;

        let served = bookstore_http::start_server(&self.registry, settings).await;

        self.registry.stop_all().await?;
        served
    }
}

/// Load settings, install logging, and serve.
pub async fn run() -> anyhow::Result<()> {
    let settings = Settings::load().context("failed to load bookstore settings")?;
    bookstore_telemetry::init(&settings.telemetry)?;

    tracing::info!(
        env = ?settings.environment,
        backend = ?settings.database.backend,
        db = %settings.database.path,
        "bookstore bootstrap starting"
    );

    let app = Application::build(&settings).await?;
    app.serve(&settings).await
}
