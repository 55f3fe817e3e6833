//! `webhdfs-server`: runs the WebHDFS emulator in the foreground.

use clap::Parser;
use std::net::SocketAddr;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use webhdfs_server::{AppState, app};

const DEFAULT_ADDR: &str = "127.0.0.1:50070";

#[derive(Parser, Debug)]
#[command(name = "webhdfs-server", version, about = "In-memory WebHDFS NameNode/DataNode emulator")]
struct Args {
    /// Address to listen on.
    #[arg(default_value = DEFAULT_ADDR)]
    addr: SocketAddr,
    /// Answer 401 to requests without `user.name`.
    #[arg(long)]
    require_user: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // Uses `RUST_LOG` or defaults to "webhdfs_server=debug,tower_http=debug".
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "webhdfs_server=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let listener = tokio::net::TcpListener::bind(args.addr).await?;
    tracing::info!(addr = %args.addr, require_user = args.require_user, "webhdfs emulator listening");
    axum::serve(listener, app(AppState::new(args.require_user))).await?;
    Ok(())
}
