use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    review_sentinel::cli::run().await
}
