#[tokio::main]
async fn main() -> anyhow::Result<()> {
    bookstore_app::bootstrap::run().await
}
