//! The [`Transport`] abstraction nodes use to exchange messages, and a
//! deterministic unreliable transport for driving consensus under
//! simulated packet loss, duplication, delay, and rate limiting.

mod error;
mod message;
mod sim_transport;
mod transport;

pub use error::{NetworkError, NetworkResult};
pub use message::NetMessage;
pub use sim_transport::{NetworkStats, SimTransport, SimTransportConfig};
pub use transport::Transport;
