use tokio_util::sync::CancellationToken;

use crate::config::{ServeArgs, ServerConfig};
use crate::error::ServerError;

pub async fn run(args: ServeArgs) -> Result<(), ServerError> {
    tracing::info!("kbrowse-server starting");

    let config = ServerConfig::load(&args.config)?;
    tracing::info!(config = %args.config, "loaded config");

    let search = super::bootstrap(&config).await?;

    // --- CancellationToken for graceful shutdown ---
    let token = CancellationToken::new();

    let mut api = tokio::spawn(kbrowse_api_server::run(
        config.api_port,
        search.clone(),
        token.clone(),
    ));

    let exited = tokio::select! {
        res = tokio::signal::ctrl_c() => {
            res?;
            tracing::info!("shutting down...");
            None
        }
        res = &mut api => Some(res),
    };

    token.cancel();
    search.close();

    let res = match exited {
        Some(res) => res,
        None => api.await,
    };
    match res {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => Err(ServerError::Api(e)),
        Err(e) => Err(ServerError::Api(format!("api task: {e}"))),
    }
}
