mod test_transfer_over_data_channel;
