//! Request resolution: host selection, bounded retries and the two-step
//! redirect used by data operations.
//!
//! One call runs through these states:
//!
//! ```text
//! build target -> dispatch --(connect failure, attempts left)--> dispatch
//!                     |  \--(connect failure, none left)------> Exhausted
//!                     v
//!               HTTP response --(redirect leg)--> dispatch to Location
//!                     |
//!                     v
//!               classify --> Success | Failure
//! ```
//!
//! Each leg of a two-step call owns a fresh retry budget.

use bytes::Bytes;
use reqwest::{Method, StatusCode};
use tracing::{debug, error, warn};
use url::Url;

use crate::config::{ConfigError, HostRoutes};
use crate::errors::{ClientError, Result, TransportError, WebHdfsError, classify};
use crate::operations::Operation;
use crate::transport::{HttpRequest, HttpResponse, Transport};
use crate::uri::{QueryParams, build_uri};

/// How a verb expects the first response to look.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Redirect {
    /// The first response is the final one.
    None,
    /// The first response must be `307` with a `Location`; the payload goes
    /// to that location.
    Required,
    /// Follow a `307` with a `Location` if one comes back, otherwise the first
    /// response is final.
    Follow,
}

/// Static description of one filesystem verb.
#[derive(Debug, Clone)]
pub struct Verb {
    pub method: Method,
    pub op: Operation,
    pub redirect: Redirect,
    pub success: StatusCode,
}

impl Verb {
    pub const fn new(method: Method, op: Operation, redirect: Redirect, success: StatusCode) -> Self {
        Self {
            method,
            op,
            redirect,
            success,
        }
    }
}

pub(crate) struct Resolver<T> {
    transport: T,
    routes: HostRoutes,
    user: Option<String>,
    max_tries: u32,
}

impl<T: Transport> Resolver<T> {
    pub(crate) fn new(transport: T, routes: HostRoutes, user: Option<String>, max_tries: u32) -> Self {
        Self {
            transport,
            routes,
            user,
            max_tries: max_tries.max(1),
        }
    }

    /// Runs `verb` against `path` and returns the final response once its
    /// status matched `verb.success`.
    pub(crate) async fn execute(
        &self,
        verb: &Verb,
        path: &str,
        params: &QueryParams,
        body: Option<Bytes>,
    ) -> Result<HttpResponse> {
        let (inline_body, deferred_body) = match verb.redirect {
            Redirect::None => (body, None),
            Redirect::Required | Redirect::Follow => (None, body),
        };
        let (first, first_url) = self.first_leg(verb, path, params, inline_body).await?;

        let response = match verb.redirect {
            Redirect::None => first,
            Redirect::Required => {
                classify(first.status, StatusCode::TEMPORARY_REDIRECT, &first.body)?;
                let location = first.location().ok_or_else(|| WebHdfsError::Generic {
                    status: first.status.as_u16(),
                    message: "redirect response without Location header".to_string(),
                })?;
                self.second_leg(verb, &first_url, location, deferred_body).await?
            }
            Redirect::Follow => {
                let location = first.location().map(str::to_owned);
                match (first.status, location) {
                    (StatusCode::TEMPORARY_REDIRECT, Some(location)) => {
                        self.second_leg(verb, &first_url, &location, deferred_body).await?
                    }
                    _ => first,
                }
            }
        };

        classify(response.status, verb.success, &response.body)?;
        Ok(response)
    }

    /// Sends the NameNode request, moving to the next candidate host only when
    /// the current one stays unreachable for its whole retry budget.
    async fn first_leg(
        &self,
        verb: &Verb,
        path: &str,
        params: &QueryParams,
        body: Option<Bytes>,
    ) -> Result<(HttpResponse, String)> {
        let mut candidates = self.routes.candidates(path).iter().peekable();

        while let Some(authority) = candidates.next() {
            let url = build_uri(authority, path, verb.op, params, self.user.as_deref());
            let mut request = HttpRequest::new(verb.method.clone(), url.clone());
            request.body = body.clone();

            match self.dispatch(request).await {
                Ok(response) => return Ok((response, url)),
                Err(err) if err.is_transient() && candidates.peek().is_some() => {
                    warn!(%authority, error = %err, "host unreachable, trying next candidate");
                }
                Err(err) => return Err(err.into()),
            }
        }

        Err(ConfigError::EmptyHostList(path.to_string()).into())
    }

    /// Sends the payload-carrying request to the location handed out by the
    /// first leg.
    async fn second_leg(
        &self,
        verb: &Verb,
        base: &str,
        location: &str,
        body: Option<Bytes>,
    ) -> Result<HttpResponse> {
        let target = resolve_location(base, location)?;
        let mut request = HttpRequest::new(verb.method.clone(), target);
        if let Some(body) = body {
            request = request.with_octet_body(body);
        }
        Ok(self.dispatch(request).await?)
    }

    /// One request leg with its own retry budget.
    ///
    /// Any HTTP response ends the loop; only transient transport failures are
    /// retried, and the last one is returned unchanged once attempts run out.
    async fn dispatch(&self, request: HttpRequest) -> std::result::Result<HttpResponse, TransportError> {
        let mut remaining = self.max_tries;

        loop {
            let attempt = self.max_tries - remaining + 1;
            debug!(method = %request.method, url = %request.url, attempt, "dispatching request");

            match self.transport.send(request.clone()).await {
                Ok(response) => {
                    debug!(status = %response.status, url = %request.url, "response received");
                    return Ok(response);
                }
                Err(err) if err.is_transient() => {
                    remaining -= 1;
                    if remaining == 0 {
                        error!(url = %request.url, attempts = self.max_tries, error = %err, "giving up after repeated connection failures");
                        return Err(err);
                    }
                    warn!(url = %request.url, remaining, error = %err, "connection failure, retrying");
                }
                Err(err) => return Err(err),
            }
        }
    }
}

/// Resolves a `Location` header against the URL that produced it, so both
/// absolute and relative redirects work.
fn resolve_location(base: &str, location: &str) -> Result<String> {
    let base = Url::parse(base).map_err(|e| ClientError::InvalidLocation(format!("{}: {}", base, e)))?;
    let target = base
        .join(location)
        .map_err(|e| ClientError::InvalidLocation(format!("{}: {}", location, e)))?;
    Ok(target.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absolute_location_is_kept() {
        let target = resolve_location(
            "http://nn:50070/webhdfs/v1/a?op=CREATE",
            "http://dn:50075/webhdfs/v1/a?op=CREATE&namenoderpcaddress=nn:8020",
        )
        .unwrap();
        assert_eq!(target, "http://dn:50075/webhdfs/v1/a?op=CREATE&namenoderpcaddress=nn:8020");
    }

    #[test]
    fn relative_location_is_joined_to_the_namenode_url() {
        let target = resolve_location("http://nn:50070/webhdfs/v1/a?op=OPEN", "/datanode/v1/a?op=OPEN").unwrap();
        assert_eq!(target, "http://nn:50070/datanode/v1/a?op=OPEN");
    }

    #[test]
    fn unparseable_base_is_an_invalid_location() {
        let err = resolve_location("not a url", "/x").unwrap_err();
        assert!(matches!(err, ClientError::InvalidLocation(_)));
    }
}
