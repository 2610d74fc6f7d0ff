//! Message boundary for fxviz
//!
//! Typed inbound notifications (`plot_data`, `file_processed`) from the
//! effect engine and outbound engine commands, carried over bounded channels.

mod adapter;
mod command;
mod error;
mod message;

pub use adapter::{TransportAdapter, TransportLink, DEFAULT_QUEUE_CAPACITY};
pub use command::{EffectSlot, EngineCommand};
pub use error::TransportError;
pub use message::{AudioBlob, FileProcessed, InboundMessage, PlotData};
