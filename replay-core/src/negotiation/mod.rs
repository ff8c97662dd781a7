pub mod negotiator;
pub mod priorities;
