mod test_disconnect_notifies_peer;
mod test_malformed_frames_keep_socket_open;
mod test_rendezvous_over_websocket;
