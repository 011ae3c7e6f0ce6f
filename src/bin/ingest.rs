//! Runnable entry point for one ingestion pass.

use std::process::ExitCode;

use tracing_subscriber::EnvFilter;

use regsmith::runner;

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    init_tracing();

    let response = runner::handle(serde_json::Value::Null, serde_json::Value::Null).await;
    println!("{}", response.body);

    if response.status_code == 200 {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}
