mod test_answer_timeout;
mod test_cancel_while_waiting;
mod test_code_collision;
mod test_peer_disconnect;
mod test_transport_failure;
mod test_unknown_code_times_out;
