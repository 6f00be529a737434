mod test_full_exchange_over_local_channels;
mod test_responder_waits_for_late_offer;
mod test_second_responder_conflicts;
