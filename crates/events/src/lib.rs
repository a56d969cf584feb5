//! Domain events.
//!
//! Workflow aggregates describe every state transition as an event; the store
//! persists the transition and the service layer logs the event name.

pub mod event;

pub use event::Event;
