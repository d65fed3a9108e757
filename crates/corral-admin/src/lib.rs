//! # corral-admin
//!
//! Administrative command protocol for corral.
//!
//! The orchestrator never sees the wire. It builds [`AdminCommand`]s, sends
//! them through a [`Session`], and gets back either a reply document or a
//! [`CommandError`] whose [`ErrorClass`] was decided once, here, at the
//! boundary:
//!
//! - A transport failure (refused connection, timeout) becomes an error.
//! - A reply whose `ok` field is not `1` becomes an error too.
//!
//! Internal logic therefore never branches on which signaling convention the
//! server used.
//!
//! ## Transports
//!
//! [`AdminTransport`] is the seam. [`HttpTransport`] posts JSON command
//! documents to an admin gateway; tests plug in a simulated cluster.

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(rust_2018_idioms)]
#![warn(clippy::pedantic)]

pub mod command;
pub mod http;
pub mod reply;
pub mod session;
pub mod status;
pub mod transport;

pub use command::AdminCommand;
pub use http::{HttpTransport, TransportConfig};
pub use reply::{CommandError, ErrorClass, check_reply};
pub use session::Session;
pub use status::parse_health;
pub use transport::{AdminTransport, Credentials, Document};
