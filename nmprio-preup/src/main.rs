#[tokio::main]
async fn main() -> anyhow::Result<()> {
    nmprio_preup::run().await
}
