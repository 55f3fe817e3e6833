//! `webhdfs`: command-line front end for the WebHDFS client.
//!
//! Settings come from a TOML file (`webhdfs.toml` by default, defaults when it
//! is absent) and can be overridden with global flags. JSON answers are
//! pretty-printed to stdout; logs go to stderr and honour `RUST_LOG`.

use bytes::Bytes;
use clap::{Parser, Subcommand};
use futures_util::TryStreamExt;
use serde_json::Value;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use webhdfs_client::types::{FileType, ListStatusResponse};
use webhdfs_client::{ClientConfig, CreateOptions, ReadOptions, WebHdfsClient, XAttrEncoding, load_config};

const STREAM_CHUNK_SIZE: u64 = 1024 * 1024;

type CliResult<T> = Result<T, Box<dyn std::error::Error + Send + Sync>>;

#[derive(Parser, Debug)]
#[command(name = "webhdfs", version, about = "Talk to an HDFS cluster over WebHDFS")]
struct Cli {
    /// Configuration file.
    #[arg(long, default_value = "webhdfs.toml")]
    config: PathBuf,
    #[arg(long)]
    host: Option<String>,
    #[arg(long)]
    port: Option<u16>,
    /// Value sent as `user.name`.
    #[arg(long)]
    user: Option<String>,
    /// Per-attempt timeout in seconds.
    #[arg(long)]
    timeout: Option<u64>,
    #[arg(long)]
    max_tries: Option<u32>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List a directory.
    Ls { path: String },
    /// Print the status document of a file or directory.
    Stat { path: String },
    /// Print the content summary of a directory.
    Summary { path: String },
    /// Print the checksum of a file.
    Checksum { path: String },
    /// Exit with 0 if the path exists, 1 otherwise.
    Exists { path: String },
    /// Write a file (or a byte range of it) to stdout.
    Cat {
        path: String,
        #[arg(long)]
        offset: Option<u64>,
        #[arg(long)]
        length: Option<u64>,
    },
    /// Upload a local file.
    Put {
        local: PathBuf,
        remote: String,
        #[arg(long)]
        overwrite: bool,
        #[arg(long)]
        permission: Option<String>,
    },
    /// Append a local file to a remote one.
    Append { local: PathBuf, remote: String },
    Mkdir {
        path: String,
        #[arg(long)]
        permission: Option<String>,
    },
    Rm {
        path: String,
        #[arg(short, long)]
        recursive: bool,
    },
    Mv { source: String, destination: String },
    /// Print the home directory of the configured user.
    Home,
    Chmod { permission: String, path: String },
    Chown {
        path: String,
        #[arg(long)]
        owner: Option<String>,
        #[arg(long)]
        group: Option<String>,
    },
    Setrep { replication: u16, path: String },
    /// Extended attributes.
    Xattr {
        #[command(subcommand)]
        action: XattrCommand,
    },
}

#[derive(Subcommand, Debug)]
enum XattrCommand {
    Get { path: String, name: Option<String> },
    Set {
        path: String,
        name: String,
        value: String,
        #[arg(long)]
        replace: bool,
    },
    List { path: String },
    Rm { path: String, name: String },
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "webhdfs=info,webhdfs_client=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            error!("{}", e);
            eprintln!("webhdfs: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn build_config(cli: &Cli) -> CliResult<ClientConfig> {
    let mut config = load_config(&cli.config)?;
    if let Some(host) = &cli.host {
        config.host = host.clone();
    }
    if let Some(port) = cli.port {
        config.port = port;
    }
    if let Some(user) = &cli.user {
        config.user_name = Some(user.clone());
    }
    if let Some(timeout) = cli.timeout {
        config = config.with_timeout(Duration::from_secs(timeout));
    }
    if let Some(max_tries) = cli.max_tries {
        config.max_tries = max_tries;
    }
    Ok(config)
}

async fn run(cli: Cli) -> CliResult<ExitCode> {
    let config = build_config(&cli)?;
    info!(namenode = %config.authority(), user = ?config.user_name, "configuration loaded");
    let client = WebHdfsClient::new(config)?;

    match cli.command {
        Command::Ls { path } => {
            let listing: ListStatusResponse = serde_json::from_value(client.list_dir(&path).await?)?;
            for entry in listing.file_statuses.file_status {
                let marker = match entry.kind {
                    FileType::Directory => 'd',
                    FileType::Symlink => 'l',
                    FileType::File => '-',
                };
                println!(
                    "{}{:>4} {:>10} {:>10} {:>12} {}",
                    marker, entry.permission, entry.owner, entry.group, entry.length, entry.path_suffix
                );
            }
        }
        Command::Stat { path } => print_json(&client.get_file_dir_status(&path).await?)?,
        Command::Summary { path } => print_json(&client.get_content_summary(&path).await?)?,
        Command::Checksum { path } => print_json(&client.get_file_checksum(&path).await?)?,
        Command::Exists { path } => {
            let exists = client.exists_file_dir(&path).await?;
            println!("{}", exists);
            if !exists {
                return Ok(ExitCode::from(1));
            }
        }
        Command::Cat { path, offset, length } => {
            let mut stdout = tokio::io::stdout();
            if offset.is_some() || length.is_some() {
                let options = ReadOptions {
                    offset,
                    length,
                    buffer_size: None,
                };
                let data = client.read_file(&path, &options).await?;
                stdout.write_all(&data).await?;
            } else {
                let chunks = client.stream_file(&path, STREAM_CHUNK_SIZE);
                futures_util::pin_mut!(chunks);
                while let Some(chunk) = chunks.try_next().await? {
                    stdout.write_all(&chunk).await?;
                }
            }
            stdout.flush().await?;
        }
        Command::Put {
            local,
            remote,
            overwrite,
            permission,
        } => {
            let data = Bytes::from(tokio::fs::read(&local).await?);
            let options = CreateOptions {
                overwrite: Some(overwrite),
                permission,
                ..CreateOptions::default()
            };
            info!(local = %local.display(), remote = %remote, bytes = data.len(), "uploading");
            client.create_file(&remote, data, &options).await?;
        }
        Command::Append { local, remote } => {
            let data = Bytes::from(tokio::fs::read(&local).await?);
            client.append_file(&remote, data).await?;
        }
        Command::Mkdir { path, permission } => {
            client.make_dir(&path, permission.as_deref()).await?;
        }
        Command::Rm { path, recursive } => {
            client.delete_file_dir(&path, recursive).await?;
        }
        Command::Mv { source, destination } => {
            print_json(&client.rename_file_dir(&source, &destination).await?)?;
        }
        Command::Home => print_json(&client.get_home_directory().await?)?,
        Command::Chmod { permission, path } => {
            client.set_permission(&path, &permission).await?;
        }
        Command::Chown { path, owner, group } => {
            if owner.is_none() && group.is_none() {
                return Err("chown needs --owner and/or --group".into());
            }
            client
                .set_owner(&path, owner.as_deref(), group.as_deref())
                .await?;
        }
        Command::Setrep { replication, path } => {
            print_json(&client.set_replication(&path, replication).await?)?;
        }
        Command::Xattr { action } => match action {
            XattrCommand::Get { path, name } => {
                print_json(&client.get_xattr(&path, name.as_deref(), XAttrEncoding::Text).await?)?;
            }
            XattrCommand::Set {
                path,
                name,
                value,
                replace,
            } => {
                client.set_xattr(&path, &name, &value, replace).await?;
            }
            XattrCommand::List { path } => print_json(&client.list_xattrs(&path).await?)?,
            XattrCommand::Rm { path, name } => {
                client.delete_xattr(&path, &name).await?;
            }
        },
    }

    Ok(ExitCode::SUCCESS)
}

fn print_json(value: &Value) -> CliResult<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
