use super::{
    CreateBearerProcedure, CreateSessionProcedure, DeleteBearerProcedure, DeleteSessionProcedure,
    HandlerApi, HandlerOutput, ModifyBearerProcedure, ReleaseAccessBearersProcedure,
    SessionProcedure,
};
use crate::SessionError;
use crate::data::{SgwState, StateStore};
use crate::protocols::s8::S8Message;
use crate::protocols::s11::S11Message;
use crate::protocols::{Envelope, Inbound, InboundMessage};
use crate::stats::counter_indices::*;
use async_channel::{Receiver, Sender};
use async_std::task::JoinHandle;
use atomic_counter::AtomicCounter;
use slog::{Logger, debug, error, o, warn};
use std::sync::Arc;

/// Runs the handler for one inbound message to completion against `state`.
pub fn handle_message<A: HandlerApi>(
    state: &mut SgwState,
    api: &A,
    inbound: Inbound,
    logger: &Logger,
) -> Result<HandlerOutput, SessionError> {
    let procedure = SessionProcedure::new(api, state, logger);
    match inbound.message {
        InboundMessage::S11(message) => match message {
            S11Message::CreateSessionRequest(r) => {
                CreateSessionProcedure::new(procedure).request(r)
            }
            S11Message::ModifyBearerRequest(r) => ModifyBearerProcedure::new(procedure).run(r),
            S11Message::DeleteSessionRequest(r) => {
                DeleteSessionProcedure::new(procedure).request(r)
            }
            S11Message::ReleaseAccessBearersRequest(r) => {
                ReleaseAccessBearersProcedure::new(procedure).run(r)
            }
            S11Message::CreateBearerResponse(r) => {
                CreateBearerProcedure::new(procedure).response(r)
            }
            S11Message::DeleteBearerResponse(r) => {
                DeleteBearerProcedure::new(procedure).response(r)
            }
            m => Err(SessionError::UnexpectedMessage(m.name())),
        },
        InboundMessage::S8(message) => match message {
            S8Message::CreateSessionResponse(r) => {
                CreateSessionProcedure::new(procedure).response(r)
            }
            S8Message::DeleteSessionResponse(r) => {
                DeleteSessionProcedure::new(procedure).response(r)
            }
            S8Message::CreateBearerRequest(r) => CreateBearerProcedure::new(procedure).request(r),
            S8Message::DeleteBearerRequest(r) => DeleteBearerProcedure::new(procedure).request(r),
            m => Err(SessionError::UnexpectedMessage(m.name())),
        },
    }
}

/// The control task.  It owns the session state and serves inbound messages one at a time.
pub struct SessionMessageHandler<A: HandlerApi> {
    receiver: Receiver<Inbound>,
    to_mme: Sender<Envelope<S11Message>>,
    to_pgw: Sender<Envelope<S8Message>>,
    store: Option<Arc<dyn StateStore>>,
    api: A,
    logger: Logger,
}

impl<A: HandlerApi> SessionMessageHandler<A> {
    pub fn spawn(
        receiver: Receiver<Inbound>,
        api: A,
        state: SgwState,
        to_mme: Sender<Envelope<S11Message>>,
        to_pgw: Sender<Envelope<S8Message>>,
        store: Option<Arc<dyn StateStore>>,
        logger: Logger,
    ) -> JoinHandle<()> {
        let handler = SessionMessageHandler {
            receiver,
            to_mme,
            to_pgw,
            store,
            api,
            logger,
        };
        async_std::task::spawn(async move {
            let remaining = handler.run(state).await;
            warn!(
                handler.logger,
                "Session message handler exiting with {remaining} sessions"
            );
        })
    }

    async fn run(&self, mut state: SgwState) -> usize {
        while let Ok(inbound) = self.receiver.recv().await {
            let logger = match inbound.imsi64 {
                Some(imsi64) => self.logger.new(o!("imsi" => imsi64)),
                None => self.logger.clone(),
            };
            match handle_message(&mut state, &self.api, inbound, &logger) {
                Ok(output) => self.send(output, &logger).await,
                Err(e) => self.log_failure(&e, &logger),
            }
            if let Some(store) = &self.store {
                state.snapshot(store.as_ref(), &self.logger).await;
            }
        }

        // The inbound channel has closed.  Persist what remains, then release it.
        if let Some(store) = &self.store {
            state.snapshot(store.as_ref(), &self.logger).await;
        }
        state.teardown().len()
    }

    async fn send(&self, output: HandlerOutput, logger: &Logger) {
        if let Some(envelope) = output.to_mme {
            if let Err(e) = self.to_mme.send(envelope).await {
                warn!(logger, "Failed to send to MME - {e}");
            }
        }
        if let Some(envelope) = output.to_pgw {
            if let Err(e) = self.to_pgw.send(envelope).await {
                warn!(logger, "Failed to send to PGW - {e}");
            }
        }
    }

    fn log_failure(&self, e: &SessionError, logger: &Logger) {
        match e {
            SessionError::NotFound(_) => {
                self.api.counters()[NOT_FOUND].inc();
                debug!(logger, "Discarded - {e}");
            }
            e if e.is_invariant_violation() => {
                self.api.counters()[INVARIANT_VIOLATIONS].inc();
                error!(logger, "Procedure aborted - {e}");
            }
            _ => warn!(logger, "Procedure failed - {e}"),
        }
    }
}
