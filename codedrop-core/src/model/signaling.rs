use crate::model::code::Code;
use crate::model::error::{ErrorKind, Missing, SignalError, SignalResult};
use crate::model::handle::HandleId;
use crate::model::role::Role;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IceServerConfig {
    pub urls: Vec<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub credential: Option<String>,
}

impl IceServerConfig {
    pub fn stun(url: impl Into<String>) -> Self {
        Self {
            urls: vec![url.into()],
            username: None,
            credential: None,
        }
    }
}

/// Логические действия сигнального канала.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "kebab-case")]
pub enum SignalAction {
    SendOffer { offer: String },
    GetOffer,
    /// Push-only: bind as responder and receive `offer-received` once an offer exists.
    WaitForOffer,
    SendAnswer { answer: String },
    GetAnswer,
    SendIceCandidate { candidate: String, role: Role },
    /// `role` is the caller's role; the candidate returned came from the opposite one.
    GetIceCandidate { role: Role },
    ClearConnection,
}

impl SignalAction {
    pub fn name(&self) -> &'static str {
        match self {
            Self::SendOffer { .. } => "send-offer",
            Self::GetOffer => "get-offer",
            Self::WaitForOffer => "wait-for-offer",
            Self::SendAnswer { .. } => "send-answer",
            Self::GetAnswer => "get-answer",
            Self::SendIceCandidate { .. } => "send-ice-candidate",
            Self::GetIceCandidate { .. } => "get-ice-candidate",
            Self::ClearConnection => "clear-connection",
        }
    }
}

/// Envelope sent by a client: `{id, action, code, offer?, answer?, candidate?, role?}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignalRequest {
    #[serde(default)]
    pub id: u64,
    pub code: Code,
    #[serde(flatten)]
    pub action: SignalAction,
}

impl SignalRequest {
    pub fn new(code: Code, action: SignalAction) -> Self {
        Self { id: 0, code, action }
    }
}

/// `{success: bool, ...payload | message}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignalResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<Code>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub answer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub candidate: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub missing: Option<Missing>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl SignalResponse {
    pub fn ok(code: &Code) -> Self {
        Self {
            success: true,
            code: Some(code.clone()),
            ..Default::default()
        }
    }

    pub fn with_offer(mut self, offer: String) -> Self {
        self.offer = Some(offer);
        self
    }

    pub fn with_answer(mut self, answer: String) -> Self {
        self.answer = Some(answer);
        self
    }

    pub fn with_candidate(mut self, candidate: String) -> Self {
        self.candidate = Some(candidate);
        self
    }

    pub fn failure(err: &SignalError) -> Self {
        let (code, missing) = match err {
            SignalError::NotFound { code, missing } => (Some(code.clone()), Some(*missing)),
            SignalError::Conflict { code, .. } => (Some(code.clone()), None),
            _ => (None, None),
        };
        let message = match err {
            SignalError::Conflict { reason, .. } => reason.clone(),
            other => other.to_string(),
        };

        Self {
            success: false,
            code,
            error: Some(err.kind()),
            missing,
            message: Some(message),
            ..Default::default()
        }
    }

    /// Turn a failed reply back into the error it was built from.
    pub fn into_result(self) -> SignalResult<Self> {
        if self.success {
            return Ok(self);
        }

        let message = self.message.unwrap_or_default();
        let err = match (self.error, self.code) {
            (Some(ErrorKind::NotFound), Some(code)) => SignalError::NotFound {
                code,
                missing: self.missing.unwrap_or(Missing::Session),
            },
            (Some(ErrorKind::Conflict), Some(code)) => SignalError::Conflict {
                code,
                reason: message,
            },
            (Some(ErrorKind::Timeout), _) => SignalError::Timeout {
                waiting_for: message,
            },
            (Some(ErrorKind::TransportFailure), _) => SignalError::TransportFailure(message),
            (Some(ErrorKind::ChannelClosed), _) => SignalError::ChannelClosed,
            (Some(ErrorKind::Cancelled), _) => SignalError::Cancelled,
            _ => SignalError::InvalidPayload(message),
        };
        Err(err)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CloseReason {
    /// Someone called `clear-connection`.
    Cleared,
    PeerDisconnected,
    Expired,
}

/// События, которые relay проталкивает привязанному хэндлу.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "kebab-case")]
pub enum SignalEvent {
    OfferReceived { code: Code, offer: String },
    AnswerReceived { code: Code, answer: String },
    IceCandidateReceived { code: Code, candidate: String },
    ConnectionClosed { code: Code, reason: CloseReason },
}

impl SignalEvent {
    pub fn code(&self) -> &Code {
        match self {
            Self::OfferReceived { code, .. }
            | Self::AnswerReceived { code, .. }
            | Self::IceCandidateReceived { code, .. }
            | Self::ConnectionClosed { code, .. } => code,
        }
    }
}

/// Everything the relay writes to a client socket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ServerFrame {
    Welcome {
        handle: HandleId,
        ice_servers: Vec<IceServerConfig>,
    },
    Reply {
        id: u64,
        response: SignalResponse,
    },
    Event(SignalEvent),
}
