//! Ilb CRD Definitions
//!
//! Kubernetes Custom Resource Definitions for the internal load balancer
//! controller. An `Ilb` declares a virtual server + pool pair on the
//! load-balancing appliance; its status records what the controller has
//! observed on the provider side.

pub mod ilb;
pub mod message;

pub use ilb::*;
pub use message::*;
