use crate::coordinator::backoff::Backoff;
use crate::{CancelHandle, CoordinatorConfig, EstablishedLink, LinkState, PeerTransport, TransportEvent};
use codedrop_core::{
    CloseReason, Code, Missing, Role, SignalError, SignalEvent, SignalResult, SignalingChannel,
    TransferPayload,
};
use std::collections::VecDeque;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{Instant, Sleep, sleep, sleep_until};
use tracing::{debug, info, warn};

/// What woke a waiting phase up.
enum Wake {
    Cancelled,
    Deadline,
    Push(SignalEvent),
    Poll,
    Transport(TransportEvent),
}

fn close_reason(reason: CloseReason) -> &'static str {
    match reason {
        CloseReason::Cleared => "cleared by peer",
        CloseReason::PeerDisconnected => "peer disconnected",
        CloseReason::Expired => "expired",
    }
}

pub(crate) fn transport_failure(e: anyhow::Error) -> SignalError {
    SignalError::TransportFailure(format!("{:#}", e))
}

/// One rendezvous attempt for one code and one role.
pub(crate) struct Negotiation<T: PeerTransport> {
    signaling: Arc<dyn SignalingChannel>,
    config: CoordinatorConfig,
    cancel: CancelHandle,
    code: Code,
    role: Role,
    transport: T,
    events: mpsc::Receiver<TransportEvent>,
    /// Cleared once the channel stops pushing; polling carries on alone.
    push_open: bool,
    /// Our role is bound to us at the relay.
    bound: bool,
    remote_described: bool,
    connected: bool,
    local_pending: Vec<String>,
    remote_pending: Vec<String>,
    early_data: VecDeque<TransferPayload>,
}

impl<T: PeerTransport> Negotiation<T> {
    pub(crate) fn new(
        signaling: Arc<dyn SignalingChannel>,
        config: CoordinatorConfig,
        cancel: CancelHandle,
        code: Code,
        role: Role,
        transport: T,
        events: mpsc::Receiver<TransportEvent>,
    ) -> Self {
        Self {
            signaling,
            config,
            cancel,
            code,
            role,
            transport,
            events,
            push_open: true,
            bound: false,
            remote_described: false,
            connected: false,
            local_pending: Vec::new(),
            remote_pending: Vec::new(),
            early_data: VecDeque::new(),
        }
    }

    /// The offer is already published, so the code is ours to clear.
    pub(crate) fn holding_code(mut self) -> Self {
        self.bound = true;
        self
    }

    pub(crate) fn code(&self) -> &Code {
        &self.code
    }

    /// Initiator, after `send-offer` went through.
    pub(crate) async fn run_initiator(&mut self) -> SignalResult<()> {
        self.bind().await;

        let answer = self.await_answer().await?;
        info!("Answer received for code {}", self.code);
        self.transport
            .apply_remote_answer(answer)
            .await
            .map_err(transport_failure)?;
        self.mark_remote_described().await;

        self.await_connected().await
    }

    pub(crate) async fn run_responder(&mut self) -> SignalResult<()> {
        match self.signaling.wait_for_offer(&self.code).await {
            Ok(()) => self.bind().await,
            Err(e @ SignalError::Conflict { .. }) => return Err(e),
            Err(e) => debug!("No offer subscription for code {}, polling: {}", self.code, e),
        }

        let offer = self.await_offer().await?;
        info!("Offer received for code {}", self.code);
        let answer = self
            .transport
            .create_local_answer(offer)
            .await
            .map_err(transport_failure)?;
        self.mark_remote_described().await;

        self.signaling.send_answer(&self.code, answer).await?;
        self.bind().await;

        self.await_connected().await
    }

    async fn await_offer(&mut self) -> SignalResult<String> {
        let deadline = Instant::now() + self.config.offer_timeout;
        let mut backoff = self.backoff();
        let poll = sleep(Duration::ZERO);
        tokio::pin!(poll);

        loop {
            match self.wake(deadline, &mut poll).await? {
                Wake::Cancelled => return Err(SignalError::Cancelled),
                Wake::Deadline => return Err(SignalError::timeout(format!("offer for code {}", self.code))),
                Wake::Push(SignalEvent::OfferReceived { code, offer }) if code == self.code => {
                    return Ok(offer);
                }
                Wake::Push(event) => self.on_push(event).await?,
                Wake::Poll => match self.signaling.get_offer(&self.code).await {
                    Ok(offer) => return Ok(offer),
                    Err(e) if e.is_retryable() => {
                        poll.as_mut().reset(Instant::now() + backoff.next_delay());
                    }
                    Err(e) => return Err(e),
                },
                Wake::Transport(event) => self.on_transport(event).await?,
            }
        }
    }

    async fn await_answer(&mut self) -> SignalResult<String> {
        let deadline = Instant::now() + self.config.answer_timeout;
        let mut backoff = self.backoff();
        let poll = sleep(self.config.poll_interval);
        tokio::pin!(poll);

        loop {
            match self.wake(deadline, &mut poll).await? {
                Wake::Cancelled => return Err(SignalError::Cancelled),
                Wake::Deadline => {
                    return Err(SignalError::timeout(format!("answer for code {}", self.code)));
                }
                Wake::Push(SignalEvent::AnswerReceived { code, answer }) if code == self.code => {
                    return Ok(answer);
                }
                Wake::Push(event) => self.on_push(event).await?,
                Wake::Poll => match self.signaling.get_answer(&self.code).await {
                    Ok(answer) => return Ok(answer),
                    Err(e) if e.is_retryable() => {
                        poll.as_mut().reset(Instant::now() + backoff.next_delay());
                    }
                    Err(e) => return Err(e),
                },
                Wake::Transport(event) => self.on_transport(event).await?,
            }
        }
    }

    /// Exchange candidates until the transport reports the link up.
    async fn await_connected(&mut self) -> SignalResult<()> {
        if self.connected {
            return Ok(());
        }

        let deadline = Instant::now() + self.config.candidate_window;
        let mut backoff = self.backoff();
        let poll = sleep(self.config.poll_interval);
        tokio::pin!(poll);

        loop {
            match self.wake(deadline, &mut poll).await? {
                Wake::Cancelled => return Err(SignalError::Cancelled),
                Wake::Deadline => return Err(SignalError::timeout("peer connection")),
                Wake::Push(event) => self.on_push(event).await?,
                Wake::Poll => match self.signaling.get_ice_candidate(&self.code, self.role).await {
                    Ok(candidate) => {
                        self.accept_remote_candidate(candidate).await;
                        // more may be queued behind it
                        backoff.reset();
                        poll.as_mut().reset(Instant::now() + backoff.next_delay());
                    }
                    Err(e) if e.is_retryable() => {
                        poll.as_mut().reset(Instant::now() + backoff.next_delay());
                    }
                    Err(e) => return Err(e),
                },
                Wake::Transport(event) => {
                    self.on_transport(event).await?;
                    if self.connected {
                        info!("Peer link up for code {} as {}", self.code, self.role);
                        return Ok(());
                    }
                }
            }
        }
    }

    async fn wake(&mut self, deadline: Instant, poll: &mut Pin<&mut Sleep>) -> SignalResult<Wake> {
        loop {
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return Ok(Wake::Cancelled),
                _ = sleep_until(deadline) => return Ok(Wake::Deadline),
                event = self.events.recv() => {
                    return match event {
                        Some(event) => Ok(Wake::Transport(event)),
                        None => Err(SignalError::TransportFailure("transport event stream ended".into())),
                    };
                }
                event = self.signaling.next_event(), if self.push_open => match event {
                    Some(event) => return Ok(Wake::Push(event)),
                    None => {
                        debug!("Push channel closed, polling only");
                        self.push_open = false;
                    }
                },
                _ = poll.as_mut() => return Ok(Wake::Poll),
            }
        }
    }

    async fn on_push(&mut self, event: SignalEvent) -> SignalResult<()> {
        if event.code() != &self.code {
            debug!("Ignoring event for code {}", event.code());
            return Ok(());
        }

        match event {
            SignalEvent::IceCandidateReceived { candidate, .. } => {
                self.accept_remote_candidate(candidate).await;
            }
            SignalEvent::ConnectionClosed { reason, .. } => {
                info!("Relay closed code {}: {}", self.code, close_reason(reason));
                // the record is gone, nothing to clear on teardown
                self.bound = false;
                return Err(SignalError::not_found(&self.code, Missing::Session));
            }
            other => debug!("Ignoring {:?}", other),
        }
        Ok(())
    }

    async fn on_transport(&mut self, event: TransportEvent) -> SignalResult<()> {
        match event {
            TransportEvent::CandidateGenerated(candidate) => {
                if self.bound {
                    self.forward_local_candidate(candidate).await;
                } else {
                    self.local_pending.push(candidate);
                }
            }
            TransportEvent::StateChanged(LinkState::Connected) => self.connected = true,
            TransportEvent::StateChanged(state) if state.is_terminal() => {
                return Err(SignalError::TransportFailure(format!("peer link {}", state)));
            }
            TransportEvent::StateChanged(state) => debug!("Peer link {}", state),
            TransportEvent::DataReceived(payload) => self.early_data.push_back(payload),
        }
        Ok(())
    }

    /// Our role is bound at the relay: candidates may flow.
    async fn bind(&mut self) {
        self.bound = true;
        for candidate in std::mem::take(&mut self.local_pending) {
            self.forward_local_candidate(candidate).await;
        }
    }

    async fn forward_local_candidate(&self, candidate: String) {
        if let Err(e) = self
            .signaling
            .send_ice_candidate(&self.code, candidate, self.role)
            .await
        {
            warn!("Failed to relay local candidate for code {}: {}", self.code, e);
        }
    }

    async fn mark_remote_described(&mut self) {
        self.remote_described = true;
        for candidate in std::mem::take(&mut self.remote_pending) {
            self.apply_remote_candidate(candidate).await;
        }
    }

    async fn accept_remote_candidate(&mut self, candidate: String) {
        if self.remote_described {
            self.apply_remote_candidate(candidate).await;
        } else {
            self.remote_pending.push(candidate);
        }
    }

    async fn apply_remote_candidate(&self, candidate: String) {
        if let Err(e) = self.transport.add_remote_candidate(candidate).await {
            warn!("Skipping remote candidate for code {}: {:#}", self.code, e);
        }
    }

    fn backoff(&self) -> Backoff {
        Backoff::new(self.config.poll_interval, self.config.max_poll_interval)
    }

    pub(crate) fn into_link(self) -> EstablishedLink<T> {
        EstablishedLink::new(
            self.code,
            self.role,
            self.signaling,
            self.transport,
            self.events,
            self.early_data,
        )
    }

    /// Release the code (if we hold it) and the transport.
    pub(crate) async fn teardown(self) {
        if self.bound {
            if let Err(e) = self.signaling.clear_connection(&self.code).await {
                debug!("clear-connection for code {} failed: {}", self.code, e);
            }
        }
        if let Err(e) = self.transport.close().await {
            warn!("Failed to close transport: {:#}", e);
        }
    }
}
