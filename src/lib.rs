//! A thin convenience layer over reqwest.
//!
//! [`HttpEasy`] exposes one method per HTTP verb, builds query strings,
//! normalizes failures into `"<METHOD> request failed: <reason>"` messages,
//! and lets callers register error observers and interceptors.
//!
//! ```rust,no_run
//! use http_easy::{Config, HttpEasy};
//! use std::time::Duration;
//!
//! # async fn run() -> anyhow::Result<()> {
//! let mut http = HttpEasy::new(Config::new().with_base_url("https://api.example.com"))?;
//! http.set_header("Accept", "application/json");
//! http.set_timeout(Duration::from_secs(10));
//! http.on_error(|err| eprintln!("request failed: {}", err));
//!
//! let user = http.get("/users/1", &[("fields", "name")], &Config::default()).await?;
//! println!("{}", user);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod http;
pub mod interceptor;
pub mod query;

pub use config::Config;
pub use error::{RequestError, TransportError, format_error_message};
pub use http::{HttpEasy, ReqwestTransport, Transport, TransportRequest, TransportResponse};
pub use interceptor::{ErrorObserver, Interceptor};
pub use query::add_query_parameters;
