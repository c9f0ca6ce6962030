//! PlanAI - kanban board with OKR tracking
//!
//! Tasks on a four-column board can be linked to key results. Moving a linked
//! task into or out of DONE adds or removes its contribution, and each
//! objective's progress is the mean of its key results' completion.

pub mod assistant;
pub mod backup;
pub mod cli;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod notify;
pub mod okr;
pub mod provider;
pub mod store;
pub mod task;
pub mod team;
pub mod workspace;
