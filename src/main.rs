use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    actiontrail::cli::app::run().await
}
