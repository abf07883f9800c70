//! Command-line definitions.

use clap::{Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "restgate", about = "Command-line client for restgate servers")]
pub struct Cli {
    /// Server base URL.
    #[arg(long, global = true, default_value = "http://127.0.0.1:8080", env = "RESTGATE_SERVER")]
    pub server: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Perform an API request.
    Request(RequestArgs),
    /// Mint a signed hash-mode authentication token.
    Token(TokenArgs),
}

#[derive(Debug, Args)]
pub struct RequestArgs {
    /// Resource path, e.g. `/things`.
    pub path: String,

    /// HTTP method.
    #[arg(short = 'X', long, default_value = "GET")]
    pub method: String,

    /// Request parameter, `key=value`; repeatable. Sent as query
    /// parameters on GET and as a form body otherwise.
    #[arg(short = 'd', long = "data")]
    pub data: Vec<String>,

    /// Extra header, `name:value`; repeatable.
    #[arg(short = 'H', long = "header")]
    pub headers: Vec<String>,

    /// API key credential, sent as the `apiKey` query parameter.
    #[arg(long)]
    pub api_key: Option<String>,

    /// Secret key credential, sent as the `secretKey` query parameter.
    #[arg(long)]
    pub secret_key: Option<String>,

    /// Signed token, sent as the `authorization` header.
    #[arg(long)]
    pub token: Option<String>,
}

#[derive(Debug, Args)]
pub struct TokenArgs {
    #[arg(long)]
    pub api_key: String,

    #[arg(long)]
    pub secret_key: String,
}
