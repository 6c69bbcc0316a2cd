#[tokio::main]
async fn main() -> anyhow::Result<()> {
  karaoke_lib::run().await
}
