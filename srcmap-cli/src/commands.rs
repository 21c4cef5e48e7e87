use std::path::Path;

use serde::Serialize;
use srcmap_engine::{BatchResolver, ResolutionRequest};
use tokio::io::BufReader;
use tracing::info;

use crate::cli::Commands;
use crate::error::AppError;
use crate::serve::{ToolFilter, ToolServer};

pub async fn execute(command: Commands, resolver: BatchResolver) -> Result<(), AppError> {
    match command {
        Commands::Parse {
            positions,
            input,
            pretty,
        } => {
            let requests = match input {
                Some(path) => read_requests(&path).await?,
                None => positions,
            };
            let results = resolver.resolve(&requests).await;
            print_json(&results, pretty)?;

            let stats = resolver.cache_stats();
            info!(
                entries = stats.entries,
                cached = %crate::utils::format_bytes(stats.total_size),
                "Cache usage"
            );
        }
        Commands::Context {
            url,
            line,
            column,
            lines,
        } => {
            let snippet = resolver.lookup_context(&url, line, column, lines).await?;
            print_json(&snippet, true)?;
        }
        Commands::Unpack { url } => {
            let unpacked = resolver.unpack_sources(&url).await?;
            print_json(&unpacked, true)?;
        }
        Commands::Serve { allow, block } => {
            let server = ToolServer::new(resolver, ToolFilter::new(allow, block));
            let stdin = BufReader::new(tokio::io::stdin());
            server.run(stdin, tokio::io::stdout()).await?;
        }
    }

    Ok(())
}

async fn read_requests(path: &Path) -> Result<Vec<ResolutionRequest>, AppError> {
    let text = tokio::fs::read_to_string(path).await?;
    serde_json::from_str(&text).map_err(|e| {
        AppError::InvalidInput(format!(
            "{} is not an array of {{line, column, sourceMapUrl}}: {e}",
            path.display()
        ))
    })
}

fn print_json<T: Serialize>(value: &T, pretty: bool) -> Result<(), AppError> {
    let text = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    println!("{text}");
    Ok(())
}
