use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "lifeplan",
    about = "Year-by-year life plan projection (cash, NISA, iDeCo, taxable, property, loans)"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve the projection HTTP API
    Serve {
        #[arg(long, default_value_t = 8080)]
        port: u16,
    },
    /// Project a JSON request file (stdin when omitted) and print the result
    Project {
        #[arg(long)]
        input: Option<PathBuf>,
        #[arg(long, default_value_t = false)]
        pretty: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Command::Serve { port } => lifeplan::api::run_http_server(port)
            .await
            .context("server error")?,
        Command::Project { input, pretty } => {
            let json = match input {
                Some(path) => fs::read_to_string(&path)
                    .with_context(|| format!("failed to read {}", path.display()))?,
                None => {
                    let mut buf = String::new();
                    io::stdin()
                        .read_to_string(&mut buf)
                        .context("failed to read stdin")?;
                    buf
                }
            };
            let request = lifeplan::api::projection_request_from_json(&json)?;
            let response = request.run();
            let out = if pretty {
                serde_json::to_string_pretty(&response)?
            } else {
                serde_json::to_string(&response)?
            };
            println!("{out}");
        }
    }
    Ok(())
}
