#[tokio::main]
async fn main() -> anyhow::Result<()> {
    marketing_dashboard::run().await
}
