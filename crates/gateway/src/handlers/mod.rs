//! API handlers module

pub mod corpus;
pub mod health;
pub mod query;
