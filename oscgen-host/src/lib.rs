//! Host side of the oscgen link
//!
//! - [`GeneratorClient`] configures the waveform generator
//! - [`ScopeClient`] starts and stops oscilloscope streaming
//! - [`ScopeReceiver`] reassembles data frames on a background thread and
//!   publishes the newest one through [`LatestCapture`]
//!
//! Both clients are generic over the port so they run against a serial
//! port, a socket or an in-memory buffer alike.

pub mod config;
pub mod error;
pub mod generator;
pub mod link;
pub mod scope;
pub mod sequence;

pub use config::{HostConfig, PortConfig};
pub use error::{HostError, Result};
pub use generator::{GeneratorClient, GeneratorSettings, Shape};
pub use link::{list_ports, open_port, CommandLink};
pub use scope::{Capture, LatestCapture, ReceiverStats, ScopeClient, ScopeReceiver};
pub use sequence::SequenceTracker;
