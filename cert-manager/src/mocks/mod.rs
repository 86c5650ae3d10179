pub mod authority_mock;
pub mod directory_mock;
pub mod fixtures;
