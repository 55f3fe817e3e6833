//! NameNode and DataNode endpoints of the emulator.
//!
//! Every namespace operation goes through [`namenode`], dispatched on the
//! `op` query parameter. `CREATE`, `APPEND` and `OPEN` are answered with a
//! `307` pointing at [`datanode`] on the same listener, which is where the
//! bytes actually move.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::{HeaderMap, Method, StatusCode, Uri, header},
    response::{IntoResponse, Response},
};
use bytes::Bytes;
use serde_json::{Value, json};
use std::collections::HashMap;
use tracing::{debug, warn};

use crate::namespace::FsError;
use crate::{AppState, DATANODE_PREFIX, NAMENODE_PREFIX};

type Params = HashMap<String, String>;

/// A failure rendered as a `RemoteException` document.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    exception: &'static str,
    java_class_name: &'static str,
    message: String,
}

impl ApiError {
    fn security(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::UNAUTHORIZED,
            exception: "SecurityException",
            java_class_name: "java.lang.SecurityException",
            message: message.into(),
        }
    }

    fn unsupported(method: &Method, op: &str) -> Self {
        Self::from(FsError::IllegalArgument(format!(
            "Invalid value for webhdfs parameter \"op\": {} is not a valid {} operation",
            op, method
        )))
    }
}

impl From<FsError> for ApiError {
    fn from(err: FsError) -> Self {
        let status = match err {
            FsError::NotFound(_) => StatusCode::NOT_FOUND,
            FsError::IllegalArgument(_) => StatusCode::BAD_REQUEST,
            FsError::AlreadyExists(_)
            | FsError::ParentNotDirectory(_)
            | FsError::NotEmpty(_)
            | FsError::XAttr(_) => StatusCode::FORBIDDEN,
        };
        Self {
            status,
            exception: err.exception(),
            java_class_name: err.java_class_name(),
            message: err.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = json!({
            "RemoteException": {
                "exception": self.exception,
                "javaClassName": self.java_class_name,
                "message": self.message,
            }
        });
        (self.status, Json(body)).into_response()
    }
}

type ApiResult = Result<Response, ApiError>;

fn param<'a>(params: &'a Params, key: &str) -> Option<&'a str> {
    params.get(key).map(String::as_str)
}

fn flag(params: &Params, key: &str) -> bool {
    param(params, key).is_some_and(|v| v.eq_ignore_ascii_case("true"))
}

fn number<N: std::str::FromStr>(params: &Params, key: &str) -> Result<Option<N>, ApiError> {
    match param(params, key) {
        None => Ok(None),
        Some(raw) => raw.parse().map(Some).map_err(|_| {
            ApiError::from(FsError::IllegalArgument(format!(
                "Invalid value for webhdfs parameter \"{}\": {}",
                key, raw
            )))
        }),
    }
}

fn required<'a>(params: &'a Params, key: &str) -> Result<&'a str, ApiError> {
    param(params, key)
        .ok_or_else(|| FsError::IllegalArgument(format!("Required parameter \"{}\" is missing", key)).into())
}

fn boolean(value: bool) -> Response {
    Json(json!({ "boolean": value })).into_response()
}

fn json_ok(value: Value) -> Response {
    Json(value).into_response()
}

/// `307` to the DataNode endpoint, keeping the rest of the request target.
fn redirect_to_datanode(headers: &HeaderMap, uri: &Uri) -> ApiResult {
    let host = headers
        .get(header::HOST)
        .and_then(|h| h.to_str().ok())
        .ok_or_else(|| ApiError::from(FsError::IllegalArgument("missing Host header".to_string())))?;
    let target = uri.path_and_query().map(|pq| pq.as_str()).unwrap_or("/");
    let rest = target.strip_prefix(NAMENODE_PREFIX).unwrap_or(target);
    let location = format!("http://{}{}{}", host, DATANODE_PREFIX, rest);
    debug!(%location, "redirecting to datanode");
    Ok((StatusCode::TEMPORARY_REDIRECT, [(header::LOCATION, location)]).into_response())
}

pub async fn namenode(
    State(state): State<AppState>,
    method: Method,
    path: Option<Path<String>>,
    Query(params): Query<Params>,
    headers: HeaderMap,
    uri: Uri,
) -> ApiResult {
    let path = path.map(|Path(p)| p).unwrap_or_default();
    let op = param(&params, "op").unwrap_or_default().to_ascii_uppercase();
    let user = param(&params, "user.name");
    if state.require_user && user.is_none() {
        warn!(%op, %path, "rejecting anonymous request");
        return Err(ApiError::security("Failed to obtain user group information: user.name is required"));
    }
    let user = user.unwrap_or("dr.who");

    match (method.as_str(), op.as_str()) {
        ("PUT", "CREATE") => redirect_to_datanode(&headers, &uri),
        ("POST", "APPEND") | ("GET", "OPEN") => {
            state.namespace.read().await.check_file(&path)?;
            redirect_to_datanode(&headers, &uri)
        }
        ("PUT", "MKDIRS") => {
            let created = state
                .namespace
                .write()
                .await
                .mkdirs(&path, param(&params, "permission"), user)?;
            Ok(boolean(created))
        }
        ("PUT", "RENAME") => {
            let destination = required(&params, "destination")?;
            Ok(boolean(state.namespace.write().await.rename(&path, destination)))
        }
        ("DELETE", "DELETE") => {
            let deleted = state
                .namespace
                .write()
                .await
                .delete(&path, flag(&params, "recursive"))?;
            Ok(boolean(deleted))
        }
        ("GET", "GETFILESTATUS") => Ok(json_ok(state.namespace.read().await.status(&path)?)),
        ("GET", "LISTSTATUS") => Ok(json_ok(state.namespace.read().await.list(&path)?)),
        ("GET", "GETCONTENTSUMMARY") => Ok(json_ok(state.namespace.read().await.content_summary(&path)?)),
        ("GET", "GETFILECHECKSUM") => Ok(json_ok(state.namespace.read().await.checksum(&path)?)),
        ("GET", "GETHOMEDIRECTORY") => Ok(json_ok(json!({ "Path": format!("/user/{}", user) }))),
        ("PUT", "SETPERMISSION") => {
            let permission = param(&params, "permission").unwrap_or("755");
            state.namespace.write().await.set_permission(&path, permission)?;
            Ok(StatusCode::OK.into_response())
        }
        ("PUT", "SETOWNER") => {
            state
                .namespace
                .write()
                .await
                .set_owner(&path, param(&params, "owner"), param(&params, "group"))?;
            Ok(StatusCode::OK.into_response())
        }
        ("PUT", "SETREPLICATION") => {
            let replication = number::<u16>(&params, "replication")?.unwrap_or(3);
            let changed = state
                .namespace
                .write()
                .await
                .set_replication(&path, replication)?;
            Ok(boolean(changed))
        }
        ("PUT", "SETXATTR") => {
            let name = required(&params, "xattr.name")?;
            let value = param(&params, "xattr.value").unwrap_or_default();
            let flag = required(&params, "flag")?;
            state.namespace.write().await.set_xattr(&path, name, value, flag)?;
            Ok(StatusCode::OK.into_response())
        }
        ("GET", "GETXATTRS") => {
            let names: Vec<&str> = param(&params, "xattr.name").into_iter().collect();
            Ok(json_ok(state.namespace.read().await.get_xattrs(&path, &names)?))
        }
        ("GET", "LISTXATTRS") => Ok(json_ok(state.namespace.read().await.list_xattrs(&path)?)),
        ("PUT", "REMOVEXATTR") => {
            let name = required(&params, "xattr.name")?;
            state.namespace.write().await.remove_xattr(&path, name)?;
            Ok(StatusCode::OK.into_response())
        }
        _ => Err(ApiError::unsupported(&method, &op)),
    }
}

pub async fn datanode(
    State(state): State<AppState>,
    method: Method,
    Path(path): Path<String>,
    Query(params): Query<Params>,
    body: Bytes,
) -> ApiResult {
    let op = param(&params, "op").unwrap_or_default().to_ascii_uppercase();
    let user = param(&params, "user.name").unwrap_or("dr.who");
    debug!(%op, %path, bytes = body.len(), "datanode request");

    match (method.as_str(), op.as_str()) {
        ("PUT", "CREATE") => {
            state.namespace.write().await.create(
                &path,
                body.to_vec(),
                flag(&params, "overwrite"),
                param(&params, "permission"),
                user,
            )?;
            Ok(StatusCode::CREATED.into_response())
        }
        ("POST", "APPEND") => {
            state.namespace.write().await.append(&path, &body)?;
            Ok(StatusCode::OK.into_response())
        }
        ("GET", "OPEN") => {
            let offset = number::<u64>(&params, "offset")?.unwrap_or(0);
            let length = number::<u64>(&params, "length")?;
            let data = state.namespace.read().await.read(&path, offset, length)?;
            Ok(([(header::CONTENT_TYPE, "application/octet-stream")], data).into_response())
        }
        _ => Err(ApiError::unsupported(&method, &op)),
    }
}
