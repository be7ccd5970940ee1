#[tokio::main]
async fn main() -> anyhow::Result<()> {
    chronicle_proxy_lib::run().await
}
