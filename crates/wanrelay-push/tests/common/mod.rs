//! Shared helpers for the push endpoint tests

#![allow(dead_code)]

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::http::Request;
use std::net::IpAddr;
use std::sync::{Arc, Mutex};
use tokio::task::JoinHandle;
use wanrelay_core::traits::{BatchReport, Destination};
use wanrelay_core::{ChangeDispatcher, DestinationRegistry};
use wanrelay_push::{PushConfig, router};

/// Destination that only remembers what it received
pub struct Collector(pub Arc<Mutex<Vec<IpAddr>>>);

#[async_trait]
impl Destination for Collector {
    fn name(&self) -> &'static str {
        "collector"
    }

    async fn deliver(&self, address: IpAddr) -> BatchReport {
        self.0.lock().unwrap().push(address);
        BatchReport::default()
    }
}

/// A push router wired to a running dispatcher
pub struct Harness {
    pub app: Router,
    pub forwarded: Arc<Mutex<Vec<IpAddr>>>,
    dispatcher: JoinHandle<wanrelay_core::Result<()>>,
}

impl Harness {
    pub fn new(config: PushConfig) -> Self {
        let forwarded = Arc::new(Mutex::new(Vec::new()));
        let mut registry = DestinationRegistry::new();
        registry.register(Arc::new(Collector(forwarded.clone())));

        let (dispatcher, sender) = ChangeDispatcher::new(registry);
        Self {
            app: router(config, sender),
            forwarded,
            dispatcher: tokio::spawn(dispatcher.run()),
        }
    }

    /// Drop the router, let the dispatcher drain, and return what was forwarded
    pub async fn finish(self) -> Vec<IpAddr> {
        let Self {
            app,
            forwarded,
            dispatcher,
        } = self;
        drop(app);
        dispatcher.await.unwrap().unwrap();
        let forwarded = forwarded.lock().unwrap().clone();
        forwarded
    }
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

pub fn get_with_auth(uri: &str, authorization: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header("authorization", authorization)
        .body(Body::empty())
        .unwrap()
}
