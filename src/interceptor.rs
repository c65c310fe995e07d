//! Request/response interceptors and error observers.
//!
//! # Ordering
//!
//! A request travels through one chain:
//!
//! 1. request interceptors, **last registered first**;
//! 2. the transport call (skipped if the request phase failed);
//! 3. the built-in error-observer notifier;
//! 4. response interceptors, **first registered first**.
//!
//! A failure at any point is handed to the next stage's rejection handler,
//! so a request-phase failure still reaches the observers and the response
//! rejection handlers. A rejection handler may recover by returning a value.

use std::sync::Arc;

use crate::error::TransportError;
use crate::http::{TransportRequest, TransportResponse};

/// Callback invoked with the raw failure of every failing request.
pub type ErrorObserver = Box<dyn Fn(&TransportError) + Send + Sync>;

/// A fulfilled/rejected handler pair for both phases of a request.
///
/// Every method passes its input through unchanged by default, so an
/// implementation only overrides the hooks it cares about.
pub trait Interceptor: Send + Sync {
    fn on_request(&self, request: TransportRequest) -> Result<TransportRequest, TransportError> {
        Ok(request)
    }

    fn on_request_error(&self, error: TransportError) -> Result<TransportRequest, TransportError> {
        Err(error)
    }

    fn on_response(
        &self,
        response: TransportResponse,
    ) -> Result<TransportResponse, TransportError> {
        Ok(response)
    }

    fn on_response_error(
        &self,
        error: TransportError,
    ) -> Result<TransportResponse, TransportError> {
        Err(error)
    }
}

/// Interceptors registered on one facade, plus its observers.
#[derive(Default)]
pub(crate) struct Chain {
    interceptors: Vec<Arc<dyn Interceptor>>,
    observers: Vec<ErrorObserver>,
}

impl Chain {
    pub(crate) fn add_interceptor(&mut self, interceptor: Arc<dyn Interceptor>) {
        self.interceptors.push(interceptor);
    }

    pub(crate) fn add_observer(&mut self, observer: ErrorObserver) {
        self.observers.push(observer);
    }

    pub(crate) fn interceptor_count(&self) -> usize {
        self.interceptors.len()
    }

    pub(crate) fn observer_count(&self) -> usize {
        self.observers.len()
    }

    pub(crate) fn run_request(
        &self,
        request: TransportRequest,
    ) -> Result<TransportRequest, TransportError> {
        let mut state = Ok(request);
        for interceptor in self.interceptors.iter().rev() {
            state = match state {
                Ok(request) => interceptor.on_request(request),
                Err(error) => interceptor.on_request_error(error),
            };
        }
        state
    }

    pub(crate) fn run_response(
        &self,
        outcome: Result<TransportResponse, TransportError>,
    ) -> Result<TransportResponse, TransportError> {
        let mut state = self.notify(outcome);
        for interceptor in &self.interceptors {
            state = match state {
                Ok(response) => interceptor.on_response(response),
                Err(error) => interceptor.on_response_error(error),
            };
        }
        state
    }

    fn notify(
        &self,
        outcome: Result<TransportResponse, TransportError>,
    ) -> Result<TransportResponse, TransportError> {
        if let Err(error) = &outcome {
            for observer in &self.observers {
                observer(error);
            }
        }
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use reqwest::Method;
    use serde_json::json;
    use std::sync::Mutex;

    struct Recording {
        name: &'static str,
        log: Arc<Mutex<Vec<String>>>,
    }

    impl Interceptor for Recording {
        fn on_request(
            &self,
            request: TransportRequest,
        ) -> Result<TransportRequest, TransportError> {
            self.log.lock().unwrap().push(format!("req:{}", self.name));
            Ok(request)
        }

        fn on_response(
            &self,
            response: TransportResponse,
        ) -> Result<TransportResponse, TransportError> {
            self.log.lock().unwrap().push(format!("res:{}", self.name));
            Ok(response)
        }
    }

    struct Recover;

    impl Interceptor for Recover {
        fn on_response_error(
            &self,
            _error: TransportError,
        ) -> Result<TransportResponse, TransportError> {
            Ok(TransportResponse {
                status: 200,
                data: json!("fallback"),
                ..Default::default()
            })
        }
    }

    struct Reject;

    impl Interceptor for Reject {
        fn on_request(
            &self,
            _request: TransportRequest,
        ) -> Result<TransportRequest, TransportError> {
            Err(TransportError::other("rejected"))
        }
    }

    fn request() -> TransportRequest {
        TransportRequest {
            method: Method::GET,
            url: "/r".to_string(),
            body: None,
            config: Config::default(),
        }
    }

    #[test]
    fn test_request_lifo_response_fifo() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut chain = Chain::default();
        for name in ["a", "b"] {
            chain.add_interceptor(Arc::new(Recording {
                name,
                log: log.clone(),
            }));
        }

        chain.run_request(request()).unwrap();
        chain.run_response(Ok(TransportResponse::default())).unwrap();

        assert_eq!(*log.lock().unwrap(), vec!["req:b", "req:a", "res:a", "res:b"]);
    }

    #[test]
    fn test_observers_run_in_order_before_interceptors() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut chain = Chain::default();
        chain.add_interceptor(Arc::new(Recover));
        for name in ["first", "second"] {
            let log = log.clone();
            chain.add_observer(Box::new(move |err| {
                log.lock().unwrap().push(format!("{}:{}", name, err));
            }));
        }

        let result = chain.run_response(Err(TransportError::other("boom")));

        assert_eq!(result.unwrap().data, json!("fallback"));
        assert_eq!(*log.lock().unwrap(), vec!["first:boom", "second:boom"]);
    }

    #[test]
    fn test_observers_skip_success() {
        let calls = Arc::new(Mutex::new(0));
        let mut chain = Chain::default();
        let counter = calls.clone();
        chain.add_observer(Box::new(move |_| *counter.lock().unwrap() += 1));

        chain.run_response(Ok(TransportResponse::default())).unwrap();

        assert_eq!(*calls.lock().unwrap(), 0);
    }

    #[test]
    fn test_request_rejection_flows_to_later_handlers() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut chain = Chain::default();
        chain.add_interceptor(Arc::new(Recording {
            name: "early",
            log: log.clone(),
        }));
        chain.add_interceptor(Arc::new(Reject));

        let err = chain.run_request(request()).unwrap_err();

        assert_eq!(err, TransportError::other("rejected"));
        // "early" is registered first, so it runs after the rejection and only
        // sees the error, which the default handler passes on.
        assert!(log.lock().unwrap().is_empty());
    }
}
