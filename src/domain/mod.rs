//! Pure domain layer: aggregates, value objects and domain events.
//!
//! Nothing in here performs I/O; persistence lives in [`crate::store`] and
//! transport in [`crate::http`].

pub mod aggregates;
pub mod events;
pub mod value_objects;
