#![allow(dead_code)]

use http::Method;
use serde_json::{json, Map, Value};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use strata_router::app::Application;
use strata_router::dispatcher::{HandlerInvocation, HandlerResponse, RequestScope};
use strata_router::middleware::Middleware;

/// Handler answering with its label, the coerced path parameters and the mount path
pub fn echo(inv: &HandlerInvocation) -> HandlerResponse {
    let params: Map<String, Value> = inv
        .path_params
        .iter()
        .map(|(name, value)| (name.to_string(), value.to_json()))
        .collect();
    HandlerResponse::ok(json!({
        "handler": inv.handler_name(),
        "path": inv.path,
        "params": params,
        "mount_path": inv.mount_path,
    }))
}

/// Handler answering with a fixed tag, for checking which handler ran
pub fn tagged(tag: &'static str) -> impl Fn(&HandlerInvocation) -> HandlerResponse + Send + Sync {
    move |_| HandlerResponse::ok(json!({ "handler": tag }))
}

pub fn send(app: &Application, method: Method, path: &str) -> HandlerResponse {
    app.handle(method, path, RequestScope::new())
}

pub fn get(app: &Application, path: &str) -> HandlerResponse {
    send(app, Method::GET, path)
}

/// Shared log of middleware callbacks
#[derive(Clone, Default)]
pub struct CallLog(Arc<Mutex<Vec<String>>>);

impl CallLog {
    pub fn push(&self, entry: impl Into<String>) {
        self.0.lock().unwrap().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }
}

/// Middleware recording `before:<name>` and `after:<name>`
pub struct Recording {
    pub name: &'static str,
    pub log: CallLog,
}

impl Recording {
    pub fn arc(name: &'static str, log: &CallLog) -> Arc<dyn Middleware> {
        Arc::new(Recording {
            name,
            log: log.clone(),
        })
    }
}

impl Middleware for Recording {
    fn before(&self, _inv: &HandlerInvocation) -> Option<HandlerResponse> {
        self.log.push(format!("before:{}", self.name));
        None
    }

    fn after(&self, _inv: &HandlerInvocation, _res: &mut HandlerResponse, _latency: Duration) {
        self.log.push(format!("after:{}", self.name));
    }
}
