#[tokio::main]
async fn main() -> anyhow::Result<()> {
    nmprio_daemon::run().await
}
