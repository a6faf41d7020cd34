//! Highwire REST API Client
//!
//! A Rust client for the Highwire load-balancer API (an F5 LTM front-end).
//! Provides typed models for pools and virtual servers and a client that
//! shares one login session across every caller.
//!
//! # Example
//!
//! ```no_run
//! use highwire_client::{HighwireClient, HighwireClientTrait, HighwireConfig};
//! use std::time::Duration;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = HighwireClient::new(HighwireConfig {
//!     base_url: "https://highwire.example.com/v1".to_string(),
//!     domain: "corp".to_string(),
//!     username: "svc-ilb".to_string(),
//!     secret: "********".to_string(),
//!     timeout: Duration::from_secs(15),
//! })?;
//!
//! // Lookup by name lists the whole environment and scans it
//! if let Some(vs) = client.find_virtual_server(11, "lbauto-web").await? {
//!     println!("{} -> {}", vs.name, vs.ip);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Features
//!
//! - **Session sharing**: one cached `apiToken`, refreshed 10 minutes before expiry
//! - **Error classification**: status-code reasons plus vendor-supplied messages
//! - **Mocking**: `MockHighwireClient` behind the `test-util` feature

pub mod client;
pub mod error;
pub mod models;
pub mod session;
#[path = "trait.rs"]
pub mod highwire_trait;
#[cfg(feature = "test-util")]
pub mod mock;

pub use client::{HighwireClient, HighwireConfig};
pub use error::{status_reason, HighwireError};
pub use models::*;
pub use session::Session;
pub use highwire_trait::HighwireClientTrait;
#[cfg(feature = "test-util")]
pub use mock::MockHighwireClient;
