//! # tendril-domain
//!
//! Pure domain model for the tendril device-management backend.
//!
//! ## Responsibilities
//! - Foundational types: identifiers, error taxonomy, timestamps
//! - Define the **records** managed by entity modules:
//!   [`Device`](device::Device), [`Command`](command::Command),
//!   [`Trigger`](trigger::Trigger), [`Reading`](reading::Reading)
//! - Define **events** (lifecycle notifications fanned out by the event bus)
//! - Contain comparator logic and reading aggregation
//!
//! ## Dependency rule
//! This crate has **no internal dependencies**.
//! It must never import anything from `app`, adapters, or external IO crates.
//! All IO boundaries are expressed as traits in the `app` crate (ports).

pub mod error;
pub mod id;
pub mod record;
pub mod time;

pub mod command;
pub mod device;
pub mod event;
pub mod reading;
pub mod trigger;
