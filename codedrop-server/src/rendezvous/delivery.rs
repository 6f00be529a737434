use codedrop_core::{HandleId, SignalEvent, SignalResponse, SignalResult};

/// Событие, которое нужно протолкнуть конкретному хэндлу.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub to: HandleId,
    pub event: SignalEvent,
}

impl Delivery {
    pub fn new(to: HandleId, event: SignalEvent) -> Self {
        Self { to, event }
    }
}

/// Result of applying one action: the caller's reply plus pushes for bound handles.
#[derive(Debug)]
pub struct Outcome {
    pub result: SignalResult<SignalResponse>,
    pub deliveries: Vec<Delivery>,
}

impl Outcome {
    pub fn into_response(self) -> (SignalResponse, Vec<Delivery>) {
        let response = match self.result {
            Ok(response) => response,
            Err(e) => SignalResponse::failure(&e),
        };
        (response, self.deliveries)
    }
}
