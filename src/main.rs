use std::error::Error;

use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // A missing .env is fine: the environment may already be configured.
    let dotenv = dotenvy::dotenv();

    llm_service::telemetry::init(llm_service::telemetry::DEFAULT_FILTER)?;

    match dotenv {
        Ok(path) => info!(path = %path.display(), "loaded .env"),
        Err(err) if err.not_found() => warn!("no .env file found, using process environment"),
        Err(err) => return Err(err.into()),
    }

    api::start().await?;

    Ok(())
}
