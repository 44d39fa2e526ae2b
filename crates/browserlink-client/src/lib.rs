//! Client side of Browserlink: a facade that drives a remote browser as if
//! it were local, and a run-scoped agent wrapper around it.

pub mod agent;
pub mod client;
pub mod error;

pub use agent::RemoteAgent;
pub use client::RemoteBrowser;
pub use error::ClientError;
