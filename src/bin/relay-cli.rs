use clap::{Parser, Subcommand};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use reqwest::{Method, StatusCode};
use std::io::Write;

use same_origin_relay::relay::encode_target;

#[derive(Parser)]
#[command(name = "relay-cli")]
#[command(about = "Fetch remote URLs through a same-origin relay", long_about = None)]
struct Cli {
    /// Relay endpoint, including its path.
    #[arg(short, long, default_value = "http://localhost:8080/proxy")]
    relay: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the relay URL for a target without fetching it
    Encode { target: String },
    /// Fetch a target through the relay and write the body to stdout
    Fetch {
        target: String,
        /// HTTP method to relay
        #[arg(short = 'X', long, default_value = "GET")]
        method: String,
        /// Request body (sent with POST)
        #[arg(short, long)]
        data: Option<String>,
        /// Extra header as "Name: value"; repeatable
        #[arg(short = 'H', long = "header")]
        headers: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Encode { target } => {
            println!("{}", encode_target(&cli.relay, &target));
        }
        Commands::Fetch {
            target,
            method,
            data,
            headers,
        } => {
            let client = reqwest::Client::new();
            let method = Method::from_bytes(method.to_ascii_uppercase().as_bytes())?;
            let mut request = client
                .request(method, encode_target(&cli.relay, &target))
                .headers(parse_headers(&headers)?);
            if let Some(data) = data {
                request = request.body(data);
            }
            print_response(request.send().await?).await?;
        }
    }

    Ok(())
}

fn parse_headers(raw: &[String]) -> Result<HeaderMap, Box<dyn std::error::Error>> {
    let mut headers = HeaderMap::new();
    for line in raw {
        let (name, value) = line
            .split_once(':')
            .ok_or_else(|| format!("header {line:?} is not \"Name: value\""))?;
        headers.append(
            HeaderName::from_bytes(name.trim().as_bytes())?,
            HeaderValue::from_str(value.trim())?,
        );
    }
    Ok(headers)
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    let relay_error = res
        .headers()
        .get("x-relay-error")
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned);
    let content_type = res
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned);

    eprintln!(
        "{}",
        status_line(status, relay_error.as_deref(), content_type.as_deref())
    );

    let body = res.bytes().await?;
    std::io::stdout().write_all(&body)?;
    Ok(())
}

/// `<code> <reason> <content type>`, with `Error:` in front of failures.
///
/// The reason is the relay's failure class when it sent one.
fn status_line(status: StatusCode, relay_error: Option<&str>, content_type: Option<&str>) -> String {
    let reason = relay_error
        .or_else(|| status.canonical_reason())
        .unwrap_or("-");
    let line = format!("{} {} {}", status.as_u16(), reason, content_type.unwrap_or("-"));
    if status.is_success() {
        line
    } else {
        format!("Error: {}", line)
    }
}
