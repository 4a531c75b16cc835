mod record_store;
