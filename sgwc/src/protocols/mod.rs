pub mod ies;
pub mod s11;
pub mod s8;

use s11::S11Message;
use s8::S8Message;

/// A message on the inter-task bus, tagged with the subscriber it concerns when known.
#[derive(Debug, Clone)]
pub struct Envelope<M> {
    pub imsi64: Option<u64>,
    pub message: M,
}

impl<M> Envelope<M> {
    pub fn new(imsi64: Option<u64>, message: M) -> Self {
        Envelope { imsi64, message }
    }
}

#[derive(Debug, Clone)]
pub enum InboundMessage {
    S11(S11Message),
    S8(S8Message),
}

pub type Inbound = Envelope<InboundMessage>;

impl Inbound {
    pub fn s11(imsi64: Option<u64>, message: S11Message) -> Self {
        Envelope::new(imsi64, InboundMessage::S11(message))
    }

    pub fn s8(imsi64: Option<u64>, message: S8Message) -> Self {
        Envelope::new(imsi64, InboundMessage::S8(message))
    }
}
