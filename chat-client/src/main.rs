use std::path::PathBuf;

use chat_sdk::client::ClientConfig;
use clap::Parser;
use tokio::io::BufReader;
use tokio::net::TcpStream;
use tracing_subscriber::EnvFilter;

const USAGE: &str = "Usage: client name authfile port";

#[derive(Parser)]
#[command(name = "client", disable_help_flag = true, disable_version_flag = true)]
struct Args {
    name: String,
    authfile: PathBuf,
    port: u16,
}

fn usage_exit() -> ! {
    eprintln!("{USAGE}");
    std::process::exit(1);
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .with_writer(std::io::stderr)
        .init();

    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(_) => usage_exit(),
    };

    let password = match chat_sdk::authfile::load_password(&args.authfile) {
        Ok(password) => password,
        Err(err) => {
            tracing::error!(%err, "could not read authfile");
            usage_exit();
        }
    };

    let stream = match TcpStream::connect(("127.0.0.1", args.port)).await {
        Ok(stream) => stream,
        Err(err) => {
            tracing::error!(%err, "could not connect");
            eprintln!("Communications error");
            std::process::exit(2);
        }
    };

    let (server_read, server_write) = tokio::io::split(stream);
    let server_in = BufReader::new(server_read);
    let user_in = BufReader::new(tokio::io::stdin());
    let user_out = tokio::io::stdout();

    let reason = chat_sdk::client::run(
        server_in,
        server_write,
        user_in,
        user_out,
        ClientConfig {
            name: args.name,
            password,
        },
    )
    .await;

    if let Some(message) = reason.message() {
        eprintln!("{message}");
    }
    std::process::exit(reason.code());
}
