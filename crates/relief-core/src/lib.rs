//! Core types and decision logic for Relief, the emergency-assistance request
//! coordinator.
//!
//! This crate has no HTTP or database dependencies. The lifecycle engine
//! ([`lifecycle`]) and the access guard ([`guard`]) are pure functions over a
//! request snapshot; [`service::RequestService`] wires them to any
//! [`store::RequestStore`] backend.

pub mod actor;
pub mod clock;
pub mod error;
pub mod guard;
pub mod lifecycle;
pub mod memory;
pub mod request;
pub mod service;
pub mod store;

pub use actor::{Actor, Role};
pub use error::{Error, Result};
pub use request::{Request, RequestStatus};
pub use service::RequestService;
