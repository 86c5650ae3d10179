pub mod account;
pub mod authorization;
pub mod client;
pub mod directory;
pub mod error;
pub mod helpers;
pub mod jws;
pub mod order;
pub mod transport;

#[cfg(test)]
pub mod mocks;
