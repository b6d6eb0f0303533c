use std::io::Write;

use kbrowse_api::{now_ms, MessageQuery, QueryKind};
use kbrowse_engine::SearchError;

use crate::config::{SearchArgs, ServerConfig};
use crate::error::ServerError;

pub async fn run(args: SearchArgs) -> Result<(), ServerError> {
    let config = ServerConfig::load(&args.config)?;
    let search = super::bootstrap(&config).await?;

    let kind: QueryKind = args.kind.parse().map_err(SearchError::from)?;
    let query = MessageQuery::from_parts(kind, args.value, args.key).map_err(SearchError::from)?;
    let to = args.to.unwrap_or_else(now_ms);

    let result = search.search(&args.topic, &query, args.from, to).await;
    search.close();
    let outcome = result?;

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    for record in &outcome.records {
        serde_json::to_writer(&mut out, record)?;
        out.write_all(b"\n")?;
    }
    out.flush()?;

    for failure in &outcome.failures {
        tracing::warn!(
            partition = %failure.partition,
            error = %failure.error,
            "partition not searched"
        );
    }
    Ok(())
}
