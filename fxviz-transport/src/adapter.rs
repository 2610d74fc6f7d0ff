//! Channel-backed boundary between the network layer and the pipeline
//!
//! The network side (websocket client, pipe, test harness) owns a
//! [`TransportLink`]: it pushes raw inbound text frames and drains serialized
//! outbound commands. The pipeline side owns the [`TransportAdapter`].
//! Delivery is reliable and ordered; reconnection is the link's business.

use crate::command::EngineCommand;
use crate::error::TransportError;
use crate::message::InboundMessage;
use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender, TryRecvError, TrySendError};
use serde_json::Value;
use std::time::Duration;

/// Default queue depth; leaves headroom for bursts of live chunks
pub const DEFAULT_QUEUE_CAPACITY: usize = 1024;

/// Network-facing half of the transport
#[derive(Clone)]
pub struct TransportLink {
    /// Raw inbound text frames, in arrival order
    pub inbound_tx: Sender<String>,
    /// Serialized outbound commands
    pub outbound_rx: Receiver<String>,
}

/// Pipeline-facing half of the transport
pub struct TransportAdapter {
    inbound_rx: Receiver<String>,
    outbound_tx: Sender<String>,
}

impl TransportAdapter {
    /// Create a connected adapter/link pair
    pub fn create_channels(capacity: usize) -> (TransportAdapter, TransportLink) {
        let (inbound_tx, inbound_rx) = bounded(capacity);
        let (outbound_tx, outbound_rx) = bounded(capacity);
        (
            TransportAdapter {
                inbound_rx,
                outbound_tx,
            },
            TransportLink {
                inbound_tx,
                outbound_rx,
            },
        )
    }

    /// Raw inbound text frames, for waiting alongside other channels.
    /// Decode with [`TransportAdapter::decode`].
    pub fn inbound(&self) -> &Receiver<String> {
        &self.inbound_rx
    }

    /// Decode one text frame
    pub fn decode(text: &str) -> Result<InboundMessage, TransportError> {
        InboundMessage::decode(text)
    }

    /// Next message if one is queued.
    ///
    /// `Ok(None)` means nothing has arrived yet. A malformed frame is returned
    /// as an error and consumed; the next call continues with the following
    /// frame.
    pub fn try_recv(&self) -> Result<Option<InboundMessage>, TransportError> {
        match self.inbound_rx.try_recv() {
            Ok(text) => Self::decode(&text).map(Some),
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Disconnected) => Err(TransportError::Disconnected),
        }
    }

    /// Wait up to `timeout` for the next message
    pub fn recv_timeout(&self, timeout: Duration) -> Result<Option<InboundMessage>, TransportError> {
        match self.inbound_rx.recv_timeout(timeout) {
            Ok(text) => Self::decode(&text).map(Some),
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => Err(TransportError::Disconnected),
        }
    }

    /// Forward arbitrary effect parameters to the engine, unvalidated
    pub fn send_command(&self, parameters: Value) -> Result<(), TransportError> {
        let text = serde_json::to_string(&parameters)?;
        match self.outbound_tx.try_send(text) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => {
                tracing::warn!("outbound command queue full, dropping command");
                Err(TransportError::QueueFull)
            }
            Err(TrySendError::Disconnected(_)) => Err(TransportError::Disconnected),
        }
    }

    /// Forward a typed command
    pub fn send(&self, command: &EngineCommand) -> Result<(), TransportError> {
        self.send_command(command.to_value()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_messages_arrive_in_order() {
        let (adapter, link) = TransportAdapter::create_channels(8);
        for rate in [44100, 48000] {
            link.inbound_tx
                .send(format!(
                    r#"{{"type":"plot_data","input":[0.0],"output":[0.0],"sample_rate":{}}}"#,
                    rate
                ))
                .unwrap();
        }

        let rates: Vec<u32> = (0..2)
            .map(|_| match adapter.try_recv().unwrap() {
                Some(InboundMessage::PlotData(p)) => p.sample_rate,
                other => panic!("unexpected {:?}", other),
            })
            .collect();
        assert_eq!(rates, vec![44100, 48000]);
        assert_eq!(adapter.try_recv().unwrap(), None);
    }

    #[test]
    fn test_malformed_frame_does_not_block_stream() {
        let (adapter, link) = TransportAdapter::create_channels(8);
        link.inbound_tx.send("{broken".to_string()).unwrap();
        link.inbound_tx
            .send(r#"{"type":"plot_data","input":[1.0],"output":[2.0],"sample_rate":48000}"#.to_string())
            .unwrap();

        assert!(matches!(
            adapter.try_recv(),
            Err(TransportError::MalformedMessage(_))
        ));
        assert!(matches!(
            adapter.try_recv(),
            Ok(Some(InboundMessage::PlotData(_)))
        ));
    }

    #[test]
    fn test_disconnect_reported() {
        let (adapter, link) = TransportAdapter::create_channels(8);
        drop(link);
        assert_eq!(adapter.try_recv(), Err(TransportError::Disconnected));
        assert_eq!(
            adapter.send_command(json!({"command": "stop"})),
            Err(TransportError::Disconnected)
        );
    }

    #[test]
    fn test_send_command_is_pass_through() {
        let (adapter, link) = TransportAdapter::create_channels(8);
        let params = json!({"command": "update_param", "effect_id": "reverb1", "param": "rt60", "value": 2.5, "extra": [1, 2]});
        adapter.send_command(params.clone()).unwrap();
        let text = link.outbound_rx.try_recv().unwrap();
        let echoed: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(echoed, params);
    }

    #[test]
    fn test_full_queue_drops_command() {
        let (adapter, _link) = TransportAdapter::create_channels(1);
        adapter.send(&EngineCommand::StartMic).unwrap();
        assert_eq!(adapter.send(&EngineCommand::Stop), Err(TransportError::QueueFull));
    }

    #[test]
    fn test_inbound_yields_raw_frames() {
        let (adapter, link) = TransportAdapter::create_channels(4);
        link.inbound_tx
            .send(r#"{"type":"plot_data","input":[1.0],"output":[-1.0],"sample_rate":48000}"#.to_string())
            .unwrap();
        let text = adapter.inbound().try_recv().unwrap();
        assert_eq!(TransportAdapter::decode(&text).unwrap().kind(), "plot_data");
        assert_eq!(adapter.try_recv().unwrap(), None);
    }

    #[test]
    fn test_recv_timeout_idle() {
        let (adapter, _link) = TransportAdapter::create_channels(1);
        assert_eq!(adapter.recv_timeout(Duration::from_millis(1)).unwrap(), None);
    }
}
