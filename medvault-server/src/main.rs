use std::process;

use clap::Parser;

use medvault_server::{RuntimeConfig, telemetry};

#[derive(Parser)]
#[command(name = "medvault-server", version, about = "Encrypted patient-records HTTP service")]
struct ServerArgs {
    /// Override bind address
    #[arg(long)]
    bind: Option<String>,
    /// Override the target database name
    #[arg(long)]
    database: Option<String>,
    /// Override the target collection name
    #[arg(long)]
    collection: Option<String>,
}

#[tokio::main]
async fn main() {
    if let Err(err) = real_main().await {
        eprintln!("server exited with error: {err:#}");
        process::exit(1);
    }
}

async fn real_main() -> anyhow::Result<()> {
    telemetry::init()?;
    let args = ServerArgs::parse();
    let config = RuntimeConfig::resolve(args.bind, args.database, args.collection);
    medvault_server::run(config).await
}
