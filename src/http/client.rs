//! The client facade: verb methods over one transport.

use anyhow::Result;
use log::debug;
use reqwest::Method;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use super::transport::{ReqwestTransport, Transport, TransportRequest, TransportResponse};
use crate::config::Config;
use crate::error::{RequestError, TransportError};
use crate::interceptor::{Chain, ErrorObserver, Interceptor};
use crate::query::add_query_parameters;

/// HTTP client with uniform verb methods and normalized errors.
///
/// Setters take `&mut self` and requests take `&self`, so defaults cannot be
/// changed while a request borrowed from the same instance is in flight.
pub struct HttpEasy {
    transport: Arc<dyn Transport>,
    defaults: Config,
    chain: Chain,
}

impl HttpEasy {
    /// Creates a client backed by a default reqwest Client.
    pub fn new(config: Config) -> Result<Self> {
        Ok(Self::with_transport(config, ReqwestTransport::from_defaults()?))
    }

    /// Creates a client over any [`Transport`].
    pub fn with_transport(config: Config, transport: impl Transport + 'static) -> Self {
        Self {
            transport: Arc::new(transport),
            defaults: config,
            chain: Chain::default(),
        }
    }

    /// The current instance defaults.
    pub fn config(&self) -> &Config {
        &self.defaults
    }

    /// Registers an observer for every failing request.
    ///
    /// Observers run synchronously, in registration order, before the error
    /// reaches the caller. A panicking observer unwinds through the request
    /// future; later observers are not called.
    pub fn on_error<F>(&mut self, handler: F)
    where
        F: Fn(&TransportError) + Send + Sync + 'static,
    {
        self.chain.add_observer(Box::new(handler) as ErrorObserver);
        debug!("Registered error observer #{}", self.chain.observer_count());
    }

    /// Registers `interceptor` for both the request and the response phase.
    ///
    /// Request hooks run last-registered first; response hooks run in
    /// registration order. See [`crate::interceptor`] for the full chain.
    pub fn add_interceptor(&mut self, interceptor: impl Interceptor + 'static) {
        self.chain.add_interceptor(Arc::new(interceptor));
        debug!("Registered interceptor #{}", self.chain.interceptor_count());
    }

    /// Sets a default header for every later request. Last write wins;
    /// names that differ only in case are the same header.
    pub fn set_header(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.defaults.insert_header(name, value);
    }

    /// Sets the default per-request timeout.
    pub fn set_timeout(&mut self, timeout: Duration) {
        self.defaults.timeout = Some(timeout);
    }

    /// Issues one request and returns the response data.
    #[tracing::instrument(skip(self, body, config))]
    pub async fn request(
        &self,
        method: Method,
        url: &str,
        body: Option<Value>,
        config: &Config,
    ) -> Result<Value, RequestError> {
        self.dispatch(method, url, body, config)
            .await
            .map(|response| response.data)
    }

    async fn dispatch(
        &self,
        method: Method,
        url: &str,
        body: Option<Value>,
        config: &Config,
    ) -> Result<TransportResponse, RequestError> {
        let request = TransportRequest {
            method: method.clone(),
            url: url.to_string(),
            body,
            config: self.defaults.merged(config),
        };

        let outcome = match self.chain.run_request(request) {
            Ok(request) => self.transport.send(request).await,
            Err(error) => Err(error),
        };

        self.finish(method, outcome)
    }

    /// Runs the response phase and wraps whatever failure is left.
    fn finish(
        &self,
        method: Method,
        outcome: Result<TransportResponse, TransportError>,
    ) -> Result<TransportResponse, RequestError> {
        self.chain.run_response(outcome).map_err(|error| {
            let error = RequestError::new(method, error);
            debug!("{}", error);
            error
        })
    }

    /// Serializes `data` to JSON, then dispatches like `request`.
    ///
    /// A body that cannot be serialized fails the request without reaching
    /// the transport, but still passes through the observers and response
    /// rejection handlers.
    async fn dispatch_with_body<B: Serialize + ?Sized>(
        &self,
        method: Method,
        url: &str,
        data: &B,
        config: &Config,
    ) -> Result<Value, RequestError> {
        match serde_json::to_value(data) {
            Ok(body) => self.request(method, url, Some(body), config).await,
            Err(e) => {
                let error =
                    TransportError::other(format!("Failed to serialize request body: {}", e));
                self.finish(method, Err(error)).map(|response| response.data)
            }
        }
    }

    #[tracing::instrument(skip(self, params, config))]
    pub async fn get(
        &self,
        url: &str,
        params: &[(&str, &str)],
        config: &Config,
    ) -> Result<Value, RequestError> {
        let url = add_query_parameters(url, params);
        self.request(Method::GET, &url, None, config).await
    }

    #[tracing::instrument(skip(self, data, config))]
    pub async fn post<B: Serialize + ?Sized>(
        &self,
        url: &str,
        data: &B,
        config: &Config,
    ) -> Result<Value, RequestError> {
        self.dispatch_with_body(Method::POST, url, data, config)
            .await
    }

    #[tracing::instrument(skip(self, data, config))]
    pub async fn put<B: Serialize + ?Sized>(
        &self,
        url: &str,
        data: &B,
        config: &Config,
    ) -> Result<Value, RequestError> {
        self.dispatch_with_body(Method::PUT, url, data, config).await
    }

    #[tracing::instrument(skip(self, data, config))]
    pub async fn patch<B: Serialize + ?Sized>(
        &self,
        url: &str,
        data: &B,
        config: &Config,
    ) -> Result<Value, RequestError> {
        self.dispatch_with_body(Method::PATCH, url, data, config)
            .await
    }

    #[tracing::instrument(skip(self, params, config))]
    pub async fn delete(
        &self,
        url: &str,
        params: &[(&str, &str)],
        config: &Config,
    ) -> Result<Value, RequestError> {
        let url = add_query_parameters(url, params);
        self.request(Method::DELETE, &url, None, config).await
    }

    /// Returns the response headers.
    #[tracing::instrument(skip(self, params, config))]
    pub async fn head(
        &self,
        url: &str,
        params: &[(&str, &str)],
        config: &Config,
    ) -> Result<HashMap<String, String>, RequestError> {
        let url = add_query_parameters(url, params);
        self.dispatch(Method::HEAD, &url, None, config)
            .await
            .map(|response| response.headers)
    }

    /// Returns the response headers.
    #[tracing::instrument(skip(self, params, config))]
    pub async fn options(
        &self,
        url: &str,
        params: &[(&str, &str)],
        config: &Config,
    ) -> Result<HashMap<String, String>, RequestError> {
        let url = add_query_parameters(url, params);
        self.dispatch(Method::OPTIONS, &url, None, config)
            .await
            .map(|response| response.headers)
    }

    #[tracing::instrument(skip(self, config))]
    pub async fn trace(&self, url: &str, config: &Config) -> Result<Value, RequestError> {
        self.request(Method::TRACE, url, None, config).await
    }
}
