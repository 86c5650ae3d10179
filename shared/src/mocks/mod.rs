pub mod storage_client_mock;
