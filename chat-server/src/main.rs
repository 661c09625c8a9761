use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::EnvFilter;

const USAGE: &str = "Usage: server authfile [port]";

#[derive(Parser)]
#[command(name = "server", disable_help_flag = true, disable_version_flag = true)]
struct Args {
    authfile: PathBuf,
    port: Option<u16>,
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

    let server = match chat_server::Server::bind(args.port.unwrap_or(0), password).await {
        Ok(server) => server,
        Err(err) => {
            tracing::error!(%err, "could not bind listener");
            eprintln!("Communications error");
            std::process::exit(2);
        }
    };

    let bound_port = server.bound_port().unwrap_or(args.port.unwrap_or(0));
    eprintln!("{bound_port}");
    tracing::info!(port = bound_port, "server listening");

    if let Err(err) = server.run().await {
        tracing::error!(%err, "server loop exited");
        eprintln!("Communications error");
        std::process::exit(2);
    }
}
