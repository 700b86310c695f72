//! Domain models for the planning service.

pub mod replenishment;

pub use replenishment::{
    CommitOutcome, NewReplenishmentRecord, RecordError, RecordPage, ReplenishmentRecord,
    SaveReplenishmentRequest,
};
