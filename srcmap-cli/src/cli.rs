use std::path::PathBuf;

use clap::{Parser, Subcommand};
use srcmap_engine::ResolutionRequest;

/// Define CLI arguments
#[derive(Parser, Debug)]
#[command(
    name = "srcmap",
    version,
    about = "Resolve minified stack positions through remote source maps",
    long_about = "Maps line/column positions in generated JavaScript back to the original\n\
                  sources using source maps fetched over HTTP(S).\n\
                  \n\
                  Source maps are cached in memory and revalidated with ETags, so repeated\n\
                  lookups against the same URL are cheap."
)]
pub struct CliArgs {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true, help = "Enable detailed debug logging")]
    pub verbose: bool,

    /// Source lines shown either side of a resolved line
    #[arg(
        long,
        global = true,
        env = "SOURCE_MAP_PARSER_CONTEXT_OFFSET_LINE",
        default_value = "1"
    )]
    pub context_lines: u32,

    /// Resource cache capacity in megabytes
    #[arg(
        long,
        global = true,
        env = "SOURCE_MAP_PARSER_RESOURCE_CACHE_MAX_SIZE",
        default_value = "200"
    )]
    pub cache_size: u64,

    /// Per-URL fetch deadline in seconds (0 waits indefinitely)
    #[arg(long, global = true, default_value = "0")]
    pub fetch_timeout: u64,

    /// Connection timeout in seconds
    #[arg(long, global = true, default_value = "10")]
    pub connect_timeout: u64,

    /// Maximum source map fetches in flight per batch (0 for no limit)
    #[arg(long, global = true, default_value = "0")]
    pub max_concurrent_fetches: usize,

    /// Extra request header
    #[arg(
        short = 'H',
        long = "header",
        global = true,
        help = "Add a request header in 'Name: Value' form (repeatable)"
    )]
    pub headers: Vec<String>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Resolve one batch of stack positions
    Parse {
        /// Positions as LINE:COLUMN:URL
        #[arg(value_parser = parse_position, required_unless_present = "input")]
        positions: Vec<ResolutionRequest>,

        /// JSON file holding an array of {line, column, sourceMapUrl}
        #[arg(short, long, conflicts_with = "positions")]
        input: Option<PathBuf>,

        /// Pretty-print the JSON output
        #[arg(long)]
        pretty: bool,
    },

    /// Show the original source around a generated position
    Context {
        /// Source map URL
        #[arg(short, long)]
        url: String,

        /// Line in the generated file (1-based)
        #[arg(short, long)]
        line: u32,

        /// Column in the generated file (0-based)
        #[arg(short, long)]
        column: u32,

        /// Lines shown either side of the original line
        #[arg(long = "lines", default_value = "5")]
        lines: u32,
    },

    /// List every source embedded in a source map
    Unpack {
        /// Source map URL
        #[arg(short, long)]
        url: String,
    },

    /// Answer line-delimited JSON tool calls on stdin
    Serve {
        /// Only expose these tools (takes precedence over --block-tool)
        #[arg(long = "allow-tool")]
        allow: Vec<String>,

        /// Hide these tools
        #[arg(long = "block-tool")]
        block: Vec<String>,
    },
}

/// Parse `LINE:COLUMN:URL`. The URL keeps any colons of its own.
pub fn parse_position(raw: &str) -> Result<ResolutionRequest, String> {
    let mut parts = raw.splitn(3, ':');
    let (Some(line), Some(column), Some(url)) = (parts.next(), parts.next(), parts.next()) else {
        return Err(format!("expected LINE:COLUMN:URL, got '{raw}'"));
    };

    let line = line
        .trim()
        .parse::<u32>()
        .map_err(|_| format!("invalid line '{line}'"))?;
    let column = column
        .trim()
        .parse::<u32>()
        .map_err(|_| format!("invalid column '{column}'"))?;
    if url.is_empty() {
        return Err("missing source map URL".to_string());
    }

    Ok(ResolutionRequest::new(line, column, url))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_position_keeps_url_colons() {
        let request = parse_position("12:34:https://cdn.test:8443/app.js.map").unwrap();
        assert_eq!(request.line, 12);
        assert_eq!(request.column, 34);
        assert_eq!(request.resource_url, "https://cdn.test:8443/app.js.map");
    }

    #[test]
    fn test_parse_position_rejects_bad_input() {
        assert!(parse_position("12:https://cdn.test/a.map").is_err());
        assert!(parse_position("x:1:https://cdn.test/a.map").is_err());
        assert!(parse_position("-1:1:https://cdn.test/a.map").is_err());
        assert!(parse_position("1:2:").is_err());
    }

    #[test]
    fn test_global_options_after_subcommand() {
        let args = CliArgs::try_parse_from([
            "srcmap",
            "parse",
            "1:0:https://cdn.test/a.map",
            "--context-lines",
            "3",
            "-H",
            "Authorization: Bearer t",
        ])
        .unwrap();

        assert_eq!(args.context_lines, 3);
        assert_eq!(args.headers, vec!["Authorization: Bearer t".to_string()]);
        match args.command {
            Commands::Parse { positions, .. } => assert_eq!(positions.len(), 1),
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_parse_requires_positions_or_input() {
        assert!(CliArgs::try_parse_from(["srcmap", "parse"]).is_err());
        assert!(CliArgs::try_parse_from(["srcmap", "parse", "--input", "stack.json"]).is_ok());
    }
}
