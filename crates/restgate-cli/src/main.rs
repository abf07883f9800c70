mod cli;

use anyhow::{Context, Result, bail};
use clap::Parser;
use reqwest::Method;

use cli::{Cli, Commands, RequestArgs, TokenArgs};
use restgate_auth::{Clock, SystemClock, token};

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    match &cli.command {
        Commands::Request(args) => request(&cli.server, args).await,
        Commands::Token(args) => {
            println!("{}", mint_token(args));
            Ok(())
        }
    }
}

fn mint_token(args: &TokenArgs) -> String {
    token::issue(&args.api_key, &args.secret_key, SystemClock.now_unix())
}

async fn request(server: &str, args: &RequestArgs) -> Result<()> {
    let method: Method = args
        .method
        .to_ascii_uppercase()
        .parse()
        .with_context(|| format!("invalid method '{}'", args.method))?;

    let url = format!(
        "{}/{}",
        server.trim_end_matches('/'),
        args.path.trim_start_matches('/')
    );

    let mut params: Vec<(String, String)> = Vec::new();
    for pair in &args.data {
        let Some((key, value)) = pair.split_once('=') else {
            bail!("invalid parameter '{pair}', expected key=value");
        };
        params.push((key.to_string(), value.to_string()));
    }
    if let Some(api_key) = &args.api_key {
        params.push(("apiKey".to_string(), api_key.clone()));
    }
    if let Some(secret_key) = &args.secret_key {
        params.push(("secretKey".to_string(), secret_key.clone()));
    }

    let client = reqwest::Client::new();
    let mut builder = if method == Method::GET {
        client.get(&url).query(&params)
    } else {
        client.request(method, &url).form(&params)
    };
    if let Some(token) = &args.token {
        builder = builder.header("authorization", format!("Basic {token}"));
    }
    for header in &args.headers {
        let Some((name, value)) = header.split_once(':') else {
            bail!("invalid header '{header}', expected name:value");
        };
        builder = builder.header(name.trim(), value.trim());
    }

    let response = builder.send().await.context("request failed")?;
    let status = response.status();
    let body = response.text().await.context("failed to read response")?;

    eprintln!("{status}");
    match serde_json::from_str::<serde_json::Value>(&body) {
        Ok(value) => println!("{}", serde_json::to_string_pretty(&value)?),
        Err(_) => println!("{body}"),
    }
    Ok(())
}
