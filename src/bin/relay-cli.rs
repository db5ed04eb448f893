use std::path::PathBuf;

use clap::{Parser, Subcommand};
use serde_json::{json, Value};

#[derive(Parser)]
#[command(name = "relay-cli")]
#[command(about = "Command-line client for the QA relay", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:3000")]
    url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check that the relay is up
    Health,
    /// List BrowserStack Automate builds
    Builds,
    /// Forward a request through the relay proxy
    Forward {
        #[arg(short, long, default_value = "GET")]
        method: String,
        /// Destination URL
        target: String,
    },
    /// Send a task summary to Slack from a JSON file
    Summary {
        file: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();
    let base = cli.url.trim_end_matches('/');

    let res = match cli.command {
        Commands::Health => client.get(format!("{}/health", base)).send().await?,
        Commands::Builds => {
            client
                .get(format!("{}/browserstack/builds", base))
                .send()
                .await?
        }
        Commands::Forward { method, target } => {
            client
                .post(format!("{}/proxy/forward", base))
                .json(&json!({ "url": target, "method": method.to_uppercase() }))
                .send()
                .await?
        }
        Commands::Summary { file } => {
            let payload: Value = serde_json::from_str(&std::fs::read_to_string(file)?)?;
            client
                .post(format!("{}/slack/task-summary", base))
                .json(&payload)
                .send()
                .await?
        }
    };

    print_response(res).await
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    let text = res.text().await?;

    if !status.is_success() {
        eprintln!("Error: relay returned status {}", status);
    }

    match serde_json::from_str::<Value>(&text) {
        Ok(json) => println!("{}", serde_json::to_string_pretty(&json)?),
        Err(_) => println!("{}", text),
    }
    Ok(())
}
