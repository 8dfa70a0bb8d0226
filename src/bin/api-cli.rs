use clap::{Parser, Subcommand};
use reqwest::header::{COOKIE, SET_COOKIE};
use serde_json::Value;

use api_render::controllers::login::LoginRequest;

#[derive(Parser)]
#[command(name = "api-cli")]
#[command(about = "Client for a running api-render server", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8080")]
    url: String,

    /// Session token sent as the session cookie.
    #[arg(short, long)]
    token: Option<String>,

    #[arg(long, default_value = "Api-Client-Session")]
    cookie: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Liveness probe
    Ping,
    /// Server metadata (requires a verified session)
    Status,
    /// Open a session and print its token
    Login { username: String, password: String },
    /// List the documented operations
    Docs,
    /// List widgets
    Widgets,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();
    let base = cli.url.trim_end_matches('/').to_string();
    let api = format!("{}/api/v1", base);

    let with_session = |request: reqwest::RequestBuilder| match &cli.token {
        Some(token) => request.header(COOKIE, format!("{}={}", cli.cookie, token)),
        None => request,
    };

    match cli.command {
        Commands::Ping => {
            let res = client.get(format!("{}/system/ping", api)).send().await?;
            println!("{} {}", res.status(), res.text().await?);
        }
        Commands::Status => {
            let res = with_session(client.get(format!("{}/system/status", api))).send().await?;
            print_response(res).await?;
        }
        Commands::Login { username, password } => {
            let res = client
                .post(format!("{}/login", api))
                .json(&LoginRequest { username, password })
                .send()
                .await?;
            if !res.status().is_success() {
                eprintln!("Error: login returned status {}", res.status());
                return Ok(());
            }
            let prefix = format!("{}=", cli.cookie);
            let token = res
                .headers()
                .get_all(SET_COOKIE)
                .iter()
                .filter_map(|v| v.to_str().ok())
                .find_map(|v| v.strip_prefix(&prefix))
                .and_then(|v| v.split(';').next());
            match token {
                Some(token) => println!("{}", token),
                None => eprintln!("Error: no session cookie in response"),
            }
        }
        Commands::Docs => {
            let res = client.get(format!("{}/swagger/doc.json", base)).send().await?;
            let doc: Value = res.json().await?;
            if let Some(paths) = doc["paths"].as_object() {
                for (path, item) in paths {
                    let methods: Vec<_> = item
                        .as_object()
                        .map(|ops| ops.keys().map(|m| m.to_uppercase()).collect())
                        .unwrap_or_default();
                    println!("{:<30} {}", path, methods.join(", "));
                }
            }
        }
        Commands::Widgets => {
            let res = with_session(client.get(format!("{}/widgets", api))).send().await?;
            print_response(res).await?;
        }
    }

    Ok(())
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: API returned status {}", status);
        if let Ok(text) = res.text().await {
            eprintln!("Response: {}", text);
        }
        return Ok(());
    }

    let json: Value = res.json().await?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
