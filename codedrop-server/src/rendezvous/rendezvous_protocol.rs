use crate::rendezvous::{Delivery, Outcome};
use crate::session::{RendezvousState, SessionRecord, SessionStore, SessionSummary};
use codedrop_core::{
    CloseReason, Code, HandleId, Missing, Role, SignalAction, SignalError, SignalEvent,
    SignalResponse, SignalResult,
};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Per-code state machine `EMPTY -> OFFERED -> ANSWERED -> CLOSED` over a [`SessionStore`].
///
/// Operations never touch sockets; anything that has to reach another party is
/// returned as a [`Delivery`] for the signaling layer to dispatch.
#[derive(Clone)]
pub struct RendezvousProtocol {
    store: SessionStore,
    max_age: Duration,
}

impl RendezvousProtocol {
    pub fn new(store: SessionStore, max_age: Duration) -> Self {
        Self { store, max_age }
    }

    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    pub fn state(&self, code: &Code) -> RendezvousState {
        match self.store.get(code) {
            Some(record) if !record.is_expired(self.max_age) => record.state(),
            _ => RendezvousState::Closed,
        }
    }

    pub fn snapshot(&self) -> Vec<SessionSummary> {
        self.store.snapshot()
    }

    /// Apply one action on behalf of `caller`.
    pub fn apply(&self, caller: HandleId, code: &Code, action: SignalAction) -> Outcome {
        debug!("{} from {} for code {}", action.name(), caller, code);

        let mut deliveries = self.expire_if_stale(code);

        let result = match action {
            SignalAction::SendOffer { offer } => self.send_offer(caller, code, offer),
            SignalAction::GetOffer => self.get_offer(code),
            SignalAction::WaitForOffer => self.wait_for_offer(caller, code),
            SignalAction::SendAnswer { answer } => self.send_answer(caller, code, answer),
            SignalAction::GetAnswer => self.get_answer(code),
            SignalAction::SendIceCandidate { candidate, role } => {
                self.send_ice_candidate(caller, code, candidate, role)
            }
            SignalAction::GetIceCandidate { role } => self.get_ice_candidate(code, role),
            SignalAction::ClearConnection => Ok(self.clear_connection(caller, code)),
        };

        let result = result.map(|(response, pushed)| {
            deliveries.extend(pushed);
            response
        });

        if let Err(e) = &result {
            debug!("Rejected request from {}: {}", caller, e);
        }

        Outcome { result, deliveries }
    }

    /// Transport-level disconnect: every record bound to `handle` is closed.
    pub fn disconnect(&self, handle: HandleId) -> Vec<Delivery> {
        self.store
            .remove_bound_to(handle)
            .into_iter()
            .flat_map(|record| {
                info!(
                    "Closing code {} after disconnect of {}",
                    record.code(),
                    handle
                );
                closed_notices(&record, Some(handle), CloseReason::PeerDisconnected)
            })
            .collect()
    }

    pub fn sweep_expired(&self) -> Vec<Delivery> {
        self.store
            .sweep_expired(self.max_age)
            .into_iter()
            .flat_map(|record| closed_notices(&record, None, CloseReason::Expired))
            .collect()
    }

    fn expire_if_stale(&self, code: &Code) -> Vec<Delivery> {
        match self.store.remove_if_expired(code, self.max_age) {
            Some(record) => {
                info!("Code {} expired", code);
                closed_notices(&record, None, CloseReason::Expired)
            }
            None => Vec::new(),
        }
    }

    fn send_offer(
        &self,
        caller: HandleId,
        code: &Code,
        offer: String,
    ) -> SignalResult<(SignalResponse, Vec<Delivery>)> {
        self.store.upsert(code, |record, _| {
            if record.answer.is_some() {
                return Err(SignalError::conflict(
                    code,
                    "answer already committed, a new offer needs a new code",
                ));
            }
            match record.role_of(caller) {
                Some(Role::Responder) => {
                    return Err(SignalError::conflict(
                        code,
                        "handle is bound as responder for this code",
                    ));
                }
                None if record.initiator.is_some() => {
                    return Err(SignalError::conflict(
                        code,
                        "code is held by another initiator",
                    ));
                }
                _ => {}
            }

            if record.offer.is_some() {
                info!("Replacing offer for code {}", code);
                // candidates of the old offer are useless to the responder
                record.drain_candidates(Role::Initiator);
            } else {
                info!("Offer stored for code {}", code);
            }

            record.offer = Some(offer.clone());
            record.bind(Role::Initiator, caller);

            let deliveries = match record.responder {
                Some(responder) => vec![Delivery::new(
                    responder,
                    SignalEvent::OfferReceived {
                        code: code.clone(),
                        offer,
                    },
                )],
                None => Vec::new(),
            };

            Ok((SignalResponse::ok(code), deliveries))
        })
    }

    fn get_offer(&self, code: &Code) -> SignalResult<(SignalResponse, Vec<Delivery>)> {
        let record = self
            .store
            .get(code)
            .ok_or_else(|| SignalError::not_found(code, Missing::Session))?;
        let offer = record
            .offer
            .ok_or_else(|| SignalError::not_found(code, Missing::Offer))?;
        Ok((SignalResponse::ok(code).with_offer(offer), Vec::new()))
    }

    fn wait_for_offer(
        &self,
        caller: HandleId,
        code: &Code,
    ) -> SignalResult<(SignalResponse, Vec<Delivery>)> {
        self.store.upsert(code, |record, _| {
            match (record.role_of(caller), record.responder) {
                (Some(Role::Initiator), _) => {
                    return Err(SignalError::conflict(
                        code,
                        "initiator cannot wait for its own offer",
                    ));
                }
                (None, Some(_)) => {
                    let reason = if record.answer.is_some() {
                        "code already resolved"
                    } else {
                        "another responder is waiting on this code"
                    };
                    return Err(SignalError::conflict(code, reason));
                }
                _ => {}
            }

            record.bind(Role::Responder, caller);

            let mut deliveries = Vec::new();
            if let Some(offer) = record.offer.clone() {
                deliveries.push(Delivery::new(
                    caller,
                    SignalEvent::OfferReceived {
                        code: code.clone(),
                        offer,
                    },
                ));
            }
            deliveries.extend(flush_candidates(record, Role::Responder, caller));

            Ok((SignalResponse::ok(code), deliveries))
        })
    }

    fn send_answer(
        &self,
        caller: HandleId,
        code: &Code,
        answer: String,
    ) -> SignalResult<(SignalResponse, Vec<Delivery>)> {
        self.store
            .update(code, |record| {
                if record.offer.is_none() {
                    return Err(SignalError::not_found(code, Missing::Offer));
                }
                if record.initiator == Some(caller) {
                    return Err(SignalError::conflict(
                        code,
                        "initiator cannot answer its own offer",
                    ));
                }
                if record.answer.is_some() {
                    if record.responder == Some(caller) {
                        debug!("Duplicate answer for code {} from bound responder", code);
                        return Ok((SignalResponse::ok(code), Vec::new()));
                    }
                    return Err(SignalError::conflict(
                        code,
                        "answer already committed by another responder",
                    ));
                }
                if record.responder.is_some_and(|r| r != caller) {
                    return Err(SignalError::conflict(
                        code,
                        "another responder is bound to this code",
                    ));
                }

                record.answer = Some(answer.clone());
                record.bind(Role::Responder, caller);
                info!("Answer stored for code {}", code);

                let mut deliveries = Vec::new();
                if let Some(initiator) = record.initiator {
                    deliveries.push(Delivery::new(
                        initiator,
                        SignalEvent::AnswerReceived {
                            code: code.clone(),
                            answer,
                        },
                    ));
                }
                deliveries.extend(flush_candidates(record, Role::Responder, caller));

                Ok((SignalResponse::ok(code), deliveries))
            })
            .unwrap_or_else(|| Err(SignalError::not_found(code, Missing::Session)))
    }

    fn get_answer(&self, code: &Code) -> SignalResult<(SignalResponse, Vec<Delivery>)> {
        let record = self
            .store
            .get(code)
            .ok_or_else(|| SignalError::not_found(code, Missing::Session))?;
        let answer = record
            .answer
            .ok_or_else(|| SignalError::not_found(code, Missing::Answer))?;
        Ok((SignalResponse::ok(code).with_answer(answer), Vec::new()))
    }

    fn send_ice_candidate(
        &self,
        caller: HandleId,
        code: &Code,
        candidate: String,
        role: Role,
    ) -> SignalResult<(SignalResponse, Vec<Delivery>)> {
        self.store
            .update(code, |record| {
                match record.handle(role) {
                    None => return Err(SignalError::not_found(code, Missing::Role)),
                    Some(bound) if bound != caller => {
                        warn!(
                            "Candidate for code {} claims role {} held by another handle",
                            code, role
                        );
                        return Err(SignalError::conflict(
                            code,
                            format!("{} role is bound to another handle", role),
                        ));
                    }
                    Some(_) => {}
                }

                let deliveries = match record.handle(role.opposite()) {
                    Some(peer) => vec![Delivery::new(
                        peer,
                        SignalEvent::IceCandidateReceived {
                            code: code.clone(),
                            candidate,
                        },
                    )],
                    None => {
                        record.push_candidate(role, candidate);
                        Vec::new()
                    }
                };

                Ok((SignalResponse::ok(code), deliveries))
            })
            .unwrap_or_else(|| Err(SignalError::not_found(code, Missing::Session)))
    }

    fn get_ice_candidate(
        &self,
        code: &Code,
        role: Role,
    ) -> SignalResult<(SignalResponse, Vec<Delivery>)> {
        self.store
            .update(code, |record| {
                record
                    .pop_candidate(role.opposite())
                    .map(|candidate| (SignalResponse::ok(code).with_candidate(candidate), Vec::new()))
                    .ok_or_else(|| SignalError::not_found(code, Missing::Candidate))
            })
            .unwrap_or_else(|| Err(SignalError::not_found(code, Missing::Session)))
    }

    fn clear_connection(&self, caller: HandleId, code: &Code) -> (SignalResponse, Vec<Delivery>) {
        let deliveries = match self.store.delete(code) {
            Some(record) => {
                info!("Code {} cleared by {}", code, caller);
                closed_notices(&record, Some(caller), CloseReason::Cleared)
            }
            None => Vec::new(),
        };
        (SignalResponse::ok(code), deliveries)
    }
}

/// Queued candidates addressed to `role`, pushed to the handle that just bound it.
fn flush_candidates(record: &mut SessionRecord, role: Role, to: HandleId) -> Vec<Delivery> {
    let code = record.code().clone();
    record
        .drain_candidates(role.opposite())
        .into_iter()
        .map(|candidate| {
            Delivery::new(
                to,
                SignalEvent::IceCandidateReceived {
                    code: code.clone(),
                    candidate,
                },
            )
        })
        .collect()
}

fn closed_notices(record: &SessionRecord, except: Option<HandleId>, reason: CloseReason) -> Vec<Delivery> {
    record
        .bound_handles_except(except)
        .into_iter()
        .map(|to| {
            Delivery::new(
                to,
                SignalEvent::ConnectionClosed {
                    code: record.code().clone(),
                    reason,
                },
            )
        })
        .collect()
}
