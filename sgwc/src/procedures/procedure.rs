use super::HandlerApi;
use crate::protocols::s11::S11Message;
use crate::protocols::s8::S8Message;
use crate::protocols::Envelope;
use slog::{Logger, debug};

pub struct Procedure<'a, A: HandlerApi> {
    pub api: &'a A,
    pub logger: &'a Logger,
}

impl<'a, A: HandlerApi> Procedure<'a, A> {
    pub fn new(api: &'a A, logger: &'a Logger) -> Self {
        Procedure { api, logger }
    }
    pub fn log_message(&self, s: &str) {
        debug!(self.logger, "{}", s)
    }
}

impl<A: HandlerApi> std::ops::Deref for Procedure<'_, A> {
    type Target = A;

    fn deref(&self) -> &Self::Target {
        self.api
    }
}

/// What a handler sends as a result of one inbound message: at most one message to each peer.
#[derive(Debug, Default)]
pub struct HandlerOutput {
    pub to_mme: Option<Envelope<S11Message>>,
    pub to_pgw: Option<Envelope<S8Message>>,
}

impl HandlerOutput {
    pub fn to_mme(imsi64: u64, message: S11Message) -> Self {
        HandlerOutput {
            to_mme: Some(Envelope::new(Some(imsi64), message)),
            to_pgw: None,
        }
    }

    pub fn to_pgw(imsi64: u64, message: S8Message) -> Self {
        HandlerOutput {
            to_mme: None,
            to_pgw: Some(Envelope::new(Some(imsi64), message)),
        }
    }

    pub fn and_pgw(mut self, imsi64: u64, message: S8Message) -> Self {
        self.to_pgw = Some(Envelope::new(Some(imsi64), message));
        self
    }

    // Response to a peer that named a session we do not know, so there is no subscriber to tag.
    pub fn untagged_to_mme(message: S11Message) -> Self {
        HandlerOutput {
            to_mme: Some(Envelope::new(None, message)),
            to_pgw: None,
        }
    }

    pub fn untagged_to_pgw(message: S8Message) -> Self {
        HandlerOutput {
            to_mme: None,
            to_pgw: Some(Envelope::new(None, message)),
        }
    }
}
