//! The asynchronous WebHDFS client: one method per filesystem verb.
//!
//! Every method is a thin mapping onto a [`Verb`] descriptor plus verb-specific
//! query parameters; host selection, retries, redirects and status checking
//! all happen in the resolver. Methods are intended to be awaited from within
//! a Tokio runtime.

use bytes::Bytes;
use futures_util::Stream;
use futures_util::stream;
use reqwest::{Method, StatusCode};
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::{ClientConfig, HostRoutes};
use crate::errors::{ClientError, Result, WebHdfsError};
use crate::operations::Operation;
use crate::resolver::{Redirect, Resolver, Verb};
use crate::transport::{HttpResponse, ReqwestTransport, Transport};
use crate::uri::QueryParams;

const CREATE: Verb = Verb::new(Method::PUT, Operation::Create, Redirect::Required, StatusCode::CREATED);
const APPEND: Verb = Verb::new(Method::POST, Operation::Append, Redirect::Required, StatusCode::OK);
const OPEN: Verb = Verb::new(Method::GET, Operation::Open, Redirect::Follow, StatusCode::OK);
const MKDIRS: Verb = Verb::new(Method::PUT, Operation::Mkdirs, Redirect::None, StatusCode::OK);
const RENAME: Verb = Verb::new(Method::PUT, Operation::Rename, Redirect::None, StatusCode::OK);
const DELETE: Verb = Verb::new(Method::DELETE, Operation::Delete, Redirect::None, StatusCode::OK);
const GET_FILE_STATUS: Verb = Verb::new(Method::GET, Operation::GetFileStatus, Redirect::None, StatusCode::OK);
const GET_CONTENT_SUMMARY: Verb =
    Verb::new(Method::GET, Operation::GetContentSummary, Redirect::None, StatusCode::OK);
const GET_FILE_CHECKSUM: Verb = Verb::new(Method::GET, Operation::GetFileChecksum, Redirect::None, StatusCode::OK);
const LIST_STATUS: Verb = Verb::new(Method::GET, Operation::ListStatus, Redirect::None, StatusCode::OK);
const GET_HOME_DIRECTORY: Verb =
    Verb::new(Method::GET, Operation::GetHomeDirectory, Redirect::None, StatusCode::OK);
const SET_PERMISSION: Verb = Verb::new(Method::PUT, Operation::SetPermission, Redirect::None, StatusCode::OK);
const SET_OWNER: Verb = Verb::new(Method::PUT, Operation::SetOwner, Redirect::None, StatusCode::OK);
const SET_REPLICATION: Verb = Verb::new(Method::PUT, Operation::SetReplication, Redirect::None, StatusCode::OK);
const SET_XATTR: Verb = Verb::new(Method::PUT, Operation::SetXAttr, Redirect::None, StatusCode::OK);
const GET_XATTRS: Verb = Verb::new(Method::GET, Operation::GetXAttrs, Redirect::None, StatusCode::OK);
const LIST_XATTRS: Verb = Verb::new(Method::GET, Operation::ListXAttrs, Redirect::None, StatusCode::OK);
const REMOVE_XATTR: Verb = Verb::new(Method::PUT, Operation::RemoveXAttr, Redirect::None, StatusCode::OK);

/// Optional parameters of `CREATE`. Unset fields are not sent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CreateOptions {
    pub overwrite: Option<bool>,
    /// Octal permission, e.g. `"644"`.
    pub permission: Option<String>,
    pub replication: Option<u16>,
    pub block_size: Option<u64>,
    pub buffer_size: Option<u32>,
}

impl CreateOptions {
    /// Options that replace an existing file.
    pub fn overwrite() -> Self {
        Self {
            overwrite: Some(true),
            ..Self::default()
        }
    }

    fn to_params(&self) -> QueryParams {
        let mut params = QueryParams::new();
        if let Some(overwrite) = self.overwrite {
            params.insert("overwrite", overwrite.to_string());
        }
        if let Some(permission) = &self.permission {
            params.insert("permission", permission.as_str());
        }
        if let Some(replication) = self.replication {
            params.insert("replication", replication.to_string());
        }
        if let Some(block_size) = self.block_size {
            params.insert("blocksize", block_size.to_string());
        }
        if let Some(buffer_size) = self.buffer_size {
            params.insert("buffersize", buffer_size.to_string());
        }
        params
    }
}

/// Optional parameters of `OPEN`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReadOptions {
    pub offset: Option<u64>,
    pub length: Option<u64>,
    pub buffer_size: Option<u32>,
}

impl ReadOptions {
    /// Reads `length` bytes starting at `offset`.
    pub fn range(offset: u64, length: u64) -> Self {
        Self {
            offset: Some(offset),
            length: Some(length),
            buffer_size: None,
        }
    }

    fn to_params(self) -> QueryParams {
        let mut params = QueryParams::new();
        if let Some(offset) = self.offset {
            params.insert("offset", offset.to_string());
        }
        if let Some(length) = self.length {
            params.insert("length", length.to_string());
        }
        if let Some(buffer_size) = self.buffer_size {
            params.insert("buffersize", buffer_size.to_string());
        }
        params
    }
}

/// Value encoding requested from `GETXATTRS`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum XAttrEncoding {
    #[default]
    Text,
    Hex,
    Base64,
}

impl XAttrEncoding {
    /// Value sent as `encoding=`.
    pub fn as_str(self) -> &'static str {
        match self {
            XAttrEncoding::Text => "text",
            XAttrEncoding::Hex => "hex",
            XAttrEncoding::Base64 => "base64",
        }
    }
}

/// Client for one WebHDFS cluster.
///
/// Holds only immutable state, so a single instance can serve concurrent
/// calls (wrap it in an `Arc` to share it across tasks).
pub struct WebHdfsClient<T = ReqwestTransport> {
    config: ClientConfig,
    resolver: Resolver<T>,
}

impl WebHdfsClient<ReqwestTransport> {
    /// Creates a client talking HTTP through `reqwest`.
    ///
    /// # Errors
    /// Fails when a `path_to_hosts` pattern does not compile or the HTTP
    /// client cannot be initialised.
    pub fn new(config: ClientConfig) -> Result<Self> {
        let transport = ReqwestTransport::new(config.timeout())?;
        Self::with_transport(config, transport)
    }
}

impl<T: Transport> WebHdfsClient<T> {
    /// Creates a client on top of an arbitrary [`Transport`].
    pub fn with_transport(config: ClientConfig, transport: T) -> Result<Self> {
        let routes = HostRoutes::compile(&config)?;
        if config.timeout().is_none() {
            warn!(
                max_tries = config.effective_max_tries(),
                "no timeout configured; a call may block indefinitely"
            );
        }
        let resolver = Resolver::new(
            transport,
            routes,
            config.user_name.clone(),
            config.effective_max_tries(),
        );
        Ok(Self { config, resolver })
    }

    /// The configuration this client was built from.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    async fn call(&self, verb: &Verb, path: &str, params: &QueryParams, body: Option<Bytes>) -> Result<HttpResponse> {
        debug!(op = %verb.op, path, "webhdfs call");
        self.resolver.execute(verb, path, params, body).await
    }

    async fn call_json(&self, verb: &Verb, path: &str, params: &QueryParams) -> Result<Value> {
        let response = self.call(verb, path, params, None).await?;
        Ok(serde_json::from_slice(&response.body)?)
    }

    /// Creates a file and uploads `data` through the two-step redirect.
    ///
    /// # Arguments
    /// * `path` - Absolute or relative path of the new file.
    /// * `data` - Complete file content.
    /// * `options` - `overwrite`, `permission`, ... as accepted by `CREATE`.
    ///
    /// # Returns
    /// `true` once the DataNode answered `201 Created`.
    pub async fn create_file(&self, path: &str, data: impl Into<Bytes>, options: &CreateOptions) -> Result<bool> {
        self.call(&CREATE, path, &options.to_params(), Some(data.into()))
            .await?;
        Ok(true)
    }

    /// Appends `data` to an existing file through the two-step redirect.
    pub async fn append_file(&self, path: &str, data: impl Into<Bytes>) -> Result<bool> {
        self.call(&APPEND, path, &QueryParams::new(), Some(data.into()))
            .await?;
        Ok(true)
    }

    /// Reads a file (or the requested range of it) into memory.
    ///
    /// A `307` from the NameNode is followed to the DataNode; a NameNode that
    /// answers `200` directly is accepted as well.
    pub async fn read_file(&self, path: &str, options: &ReadOptions) -> Result<Bytes> {
        let response = self.call(&OPEN, path, &options.to_params(), None).await?;
        Ok(response.body)
    }

    /// Streams a file as successive chunks of at most `chunk_size` bytes.
    ///
    /// Each chunk is one ranged `OPEN` call with its own retries. The stream
    /// ends after the first empty or short chunk.
    pub fn stream_file<'a>(&'a self, path: &'a str, chunk_size: u64) -> impl Stream<Item = Result<Bytes>> + 'a {
        let chunk_size = chunk_size.max(1);
        stream::try_unfold(Some(0u64), move |next_offset| async move {
            let Some(offset) = next_offset else {
                return Ok(None);
            };
            let chunk = self.read_file(path, &ReadOptions::range(offset, chunk_size)).await?;
            if chunk.is_empty() {
                return Ok(None);
            }
            let read = chunk.len() as u64;
            let next = if read < chunk_size { None } else { Some(offset + read) };
            Ok::<_, ClientError>(Some((chunk, next)))
        })
    }

    /// Creates a directory and any missing parents.
    pub async fn make_dir(&self, path: &str, permission: Option<&str>) -> Result<bool> {
        let mut params = QueryParams::new();
        if let Some(permission) = permission {
            params.insert("permission", permission);
        }
        self.call(&MKDIRS, path, &params, None).await?;
        Ok(true)
    }

    /// Renames `path` to `destination` and returns the server's
    /// `{"boolean": ...}` document.
    ///
    /// A relative destination is made absolute, as the NameNode requires.
    pub async fn rename_file_dir(&self, path: &str, destination: &str) -> Result<Value> {
        let destination = if destination.starts_with('/') {
            destination.to_string()
        } else {
            format!("/{}", destination)
        };
        let params = QueryParams::new().with("destination", destination);
        self.call_json(&RENAME, path, &params).await
    }

    /// Deletes a file or directory; a non-empty directory needs `recursive`.
    pub async fn delete_file_dir(&self, path: &str, recursive: bool) -> Result<bool> {
        let params = QueryParams::new().with("recursive", recursive.to_string());
        self.call(&DELETE, path, &params, None).await?;
        Ok(true)
    }

    /// Returns the `{"FileStatus": ...}` document of `path`.
    pub async fn get_file_dir_status(&self, path: &str) -> Result<Value> {
        self.call_json(&GET_FILE_STATUS, path, &QueryParams::new())
            .await
    }

    /// Returns the `{"ContentSummary": ...}` document (sizes, counts, quotas).
    pub async fn get_content_summary(&self, path: &str) -> Result<Value> {
        self.call_json(&GET_CONTENT_SUMMARY, path, &QueryParams::new())
            .await
    }

    /// Returns the `{"FileChecksum": ...}` document of a file.
    pub async fn get_file_checksum(&self, path: &str) -> Result<Value> {
        self.call_json(&GET_FILE_CHECKSUM, path, &QueryParams::new())
            .await
    }

    /// Lists the entries of a directory as `{"FileStatuses": ...}`.
    pub async fn list_dir(&self, path: &str) -> Result<Value> {
        self.call_json(&LIST_STATUS, path, &QueryParams::new())
            .await
    }

    /// `true` on `200`, `false` on `404`; every other status is an error.
    pub async fn exists_file_dir(&self, path: &str) -> Result<bool> {
        match self.call(&GET_FILE_STATUS, path, &QueryParams::new(), None).await {
            Ok(_) => Ok(true),
            Err(ClientError::Remote(WebHdfsError::FileNotFound { .. })) => Ok(false),
            Err(err) => Err(err),
        }
    }

    /// Returns `{"Path": ...}`, the home directory of the configured user.
    pub async fn get_home_directory(&self) -> Result<Value> {
        self.call_json(&GET_HOME_DIRECTORY, "", &QueryParams::new())
            .await
    }

    /// Sets the octal permission of `path`, e.g. `"750"`.
    pub async fn set_permission(&self, path: &str, permission: &str) -> Result<bool> {
        let params = QueryParams::new().with("permission", permission);
        self.call(&SET_PERMISSION, path, &params, None).await?;
        Ok(true)
    }

    /// Changes owner and/or group; at least one should be given.
    pub async fn set_owner(&self, path: &str, owner: Option<&str>, group: Option<&str>) -> Result<bool> {
        let mut params = QueryParams::new();
        if let Some(owner) = owner {
            params.insert("owner", owner);
        }
        if let Some(group) = group {
            params.insert("group", group);
        }
        self.call(&SET_OWNER, path, &params, None).await?;
        Ok(true)
    }

    /// Changes the replication factor of a file; the answer is `{"boolean": ...}`.
    pub async fn set_replication(&self, path: &str, replication: u16) -> Result<Value> {
        let params = QueryParams::new().with("replication", replication.to_string());
        self.call_json(&SET_REPLICATION, path, &params).await
    }

    /// Fetches one extended attribute, or all of them when `name` is `None`.
    pub async fn get_xattr(&self, path: &str, name: Option<&str>, encoding: XAttrEncoding) -> Result<Value> {
        let mut params = QueryParams::new();
        if let Some(name) = name {
            params.insert("xattr.name", name);
        }
        params.insert("encoding", encoding.as_str());
        self.call_json(&GET_XATTRS, path, &params).await
    }

    /// Sets an extended attribute. With `replace` the attribute must exist
    /// (`flag=REPLACE`), otherwise it must not (`flag=CREATE`).
    pub async fn set_xattr(&self, path: &str, name: &str, value: &str, replace: bool) -> Result<bool> {
        let flag = if replace { "REPLACE" } else { "CREATE" };
        let params = QueryParams::new()
            .with("xattr.name", name)
            .with("xattr.value", value)
            .with("flag", flag);
        self.call(&SET_XATTR, path, &params, None).await?;
        Ok(true)
    }

    /// Returns the names of the extended attributes set on `path`.
    pub async fn list_xattrs(&self, path: &str) -> Result<Value> {
        self.call_json(&LIST_XATTRS, path, &QueryParams::new())
            .await
    }

    /// Removes one extended attribute.
    pub async fn delete_xattr(&self, path: &str, name: &str) -> Result<bool> {
        let params = QueryParams::new().with("xattr.name", name);
        self.call(&REMOVE_XATTR, path, &params, None).await?;
        Ok(true)
    }
}
