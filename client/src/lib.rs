//! Asynchronous client for the WebHDFS REST protocol.
//!
//! ```no_run
//! use webhdfs_client::{ClientConfig, CreateOptions, ReadOptions, WebHdfsClient};
//!
//! # async fn run() -> webhdfs_client::Result<()> {
//! let config = ClientConfig::new("namenode", 50070).with_user("hdfs");
//! let client = WebHdfsClient::new(config)?;
//! client.create_file("/tmp/hello.txt", "hello", &CreateOptions::overwrite()).await?;
//! let content = client.read_file("/tmp/hello.txt", &ReadOptions::default()).await?;
//! assert_eq!(&content[..], b"hello");
//! # Ok(())
//! # }
//! ```

pub mod api_client;
pub mod config;
pub mod errors;
pub mod operations;
pub mod resolver;
pub mod transport;
pub mod types;
pub mod uri;

pub use api_client::{CreateOptions, ReadOptions, WebHdfsClient, XAttrEncoding};
pub use config::{ClientConfig, ConfigError, HostRoute, load_config};
pub use errors::{ClientError, Result, TransportError, WebHdfsError};
pub use operations::Operation;
pub use resolver::{Redirect, Verb};
pub use transport::{HttpRequest, HttpResponse, ReqwestTransport, Transport};
pub use uri::QueryParams;
