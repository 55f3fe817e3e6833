#![allow(dead_code)]

use async_trait::async_trait;
use reqwest::StatusCode;
use reqwest::header::{HeaderValue, LOCATION};
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use webhdfs_client::{ClientConfig, HttpRequest, HttpResponse, Transport, TransportError, WebHdfsClient};

pub const NAMENODE: &str = "nn:50070";

/// Transport answering from a fixed script and recording every request.
#[derive(Default)]
pub struct ScriptedTransport {
    script: Mutex<VecDeque<Result<HttpResponse, TransportError>>>,
    calls: Mutex<Vec<HttpRequest>>,
}

impl ScriptedTransport {
    pub fn new(script: Vec<Result<HttpResponse, TransportError>>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.into()),
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> Vec<HttpRequest> {
        self.calls.lock().unwrap().clone()
    }

    pub fn urls(&self) -> Vec<String> {
        self.calls().into_iter().map(|r| r.url).collect()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        self.calls.lock().unwrap().push(request);
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(TransportError::Request("script exhausted".into())))
    }
}

pub fn client(transport: &Arc<ScriptedTransport>) -> WebHdfsClient<Arc<ScriptedTransport>> {
    client_with(ClientConfig::new("nn", 50070).with_user("hdfs"), transport)
}

pub fn client_with(config: ClientConfig, transport: &Arc<ScriptedTransport>) -> WebHdfsClient<Arc<ScriptedTransport>> {
    WebHdfsClient::with_transport(config, Arc::clone(transport)).unwrap()
}

pub fn redirect(location: &'static str) -> Result<HttpResponse, TransportError> {
    Ok(HttpResponse::new(StatusCode::TEMPORARY_REDIRECT).with_header(LOCATION, HeaderValue::from_static(location)))
}

pub fn status(code: u16) -> Result<HttpResponse, TransportError> {
    Ok(HttpResponse::new(StatusCode::from_u16(code).unwrap()))
}

pub fn status_with_body(code: u16, body: &'static str) -> Result<HttpResponse, TransportError> {
    Ok(HttpResponse::new(StatusCode::from_u16(code).unwrap()).with_body(body))
}

pub fn json(value: Value) -> Result<HttpResponse, TransportError> {
    Ok(HttpResponse::new(StatusCode::OK).with_body(value.to_string()))
}

pub fn refused() -> Result<HttpResponse, TransportError> {
    Err(TransportError::Connect("connection refused".into()))
}
