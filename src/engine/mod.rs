//! The ledger state engine: hasher, validator, applier, rollback engine,
//! and balance service, plus [`service::Engine`] which wires them to a
//! concrete Postgres-backed store for the HTTP transport.

pub mod applier;
pub mod balance;
pub mod hasher;
pub mod rollback;
pub mod service;
pub mod validator;

pub use service::Engine;
