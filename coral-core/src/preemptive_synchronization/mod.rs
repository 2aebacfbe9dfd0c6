//! Blocking synchronization primitives used by the stress driver.

pub mod countdown_event;

pub use countdown_event::CountdownEvent;
