// CLI main entry point
use anyhow::Result;
use mimalloc::MiMalloc;
use unicorn_vote::app::run;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;
#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments and run
    run().await?;

    Ok(())
}
