//! Reminder dispatch: digest composition, transport contract, trigger
//! coordination, and the daily clock trigger.

pub mod coordinator;
pub mod digest;
pub mod schedule;
pub mod transport;
