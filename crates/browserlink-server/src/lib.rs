//! WebSocket server hosting one browser session per connection.
//!
//! Each inbound connection gets its own browser context, created after the
//! connection is established and released before it is gone. Commands on a
//! connection execute strictly serially; distinct connections run as
//! independent tasks and never share a context.

pub mod connection;
pub mod dispatch;
pub mod registry;
pub mod server;
pub mod state;

pub use registry::SessionRegistry;
pub use server::{ServerHandle, start_server};
pub use state::{HostedAgent, ServerState};
