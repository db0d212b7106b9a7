use clap::{Parser, Subcommand};
use serde_json::{json, Map, Value};

#[derive(Parser)]
#[command(name = "mux-cli")]
#[command(about = "Management CLI for the agent multiplexer", long_about = None)]
struct Cli {
    /// Admin API base URL.
    #[arg(short, long, default_value = "http://127.0.0.1:8081")]
    url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check multiplexer status
    Status,
    /// List registered agent routes
    Routes,
    /// Register (or replace) an upstream agent
    Add {
        /// Routing segment, e.g. "uppercaser"
        segment: String,
        /// Agent base URL, e.g. "http://127.0.0.1:9001"
        upstream: String,
        /// Method rename as FROM=TO; repeatable. Omit for the default map.
        #[arg(short, long = "map", value_parser = parse_mapping)]
        maps: Vec<(String, String)>,
    },
    /// Remove an agent route
    Remove { segment: String },
}

fn parse_mapping(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((from, to)) if !from.is_empty() && !to.is_empty() => {
            Ok((from.to_string(), to.to_string()))
        }
        _ => Err(format!("expected FROM=TO, got '{raw}'")),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();

    match cli.command {
        Commands::Status => {
            let res = client.get(format!("{}/admin/status", cli.url)).send().await?;
            print_response(res).await?;
        }
        Commands::Routes => {
            let res = client.get(format!("{}/admin/routes", cli.url)).send().await?;
            print_response(res).await?;
        }
        Commands::Add {
            segment,
            upstream,
            maps,
        } => {
            let mut body = json!({ "segment": segment, "upstream": upstream });
            if !maps.is_empty() {
                let map: Map<String, Value> = maps
                    .into_iter()
                    .map(|(from, to)| (from, Value::String(to)))
                    .collect();
                body["method_map"] = Value::Object(map);
            }
            let res = client
                .post(format!("{}/admin/routes", cli.url))
                .json(&body)
                .send()
                .await?;
            print_response(res).await?;
        }
        Commands::Remove { segment } => {
            let res = client
                .delete(format!("{}/admin/routes/{}", cli.url, segment))
                .send()
                .await?;
            print_response(res).await?;
        }
    }

    Ok(())
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    let text = res.text().await?;

    if !status.is_success() {
        eprintln!("Error: Admin API returned status {}", status);
        if !text.is_empty() {
            eprintln!("Response: {}", text);
        }
        return Ok(());
    }

    if text.is_empty() {
        println!("{}", status);
        return Ok(());
    }

    let json: Value = serde_json::from_str(&text)?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
