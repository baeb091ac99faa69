//! Terrane Core Types and Definitions
//!
//! This crate provides the foundational types for the Terrane infrastructure
//! diagram model. It includes:
//!
//! - **Identifiers**: Efficient string-interned addresses ([`identifier::Addr`])
//! - **Addresses**: Classification of raw graph node labels ([`address`] module)
//! - **Catalog**: The static resource classification table ([`catalog`] module)
//! - **Plan**: The serde model of the plan document ([`plan`] module)
//! - **Semantic**: The grouped diagram model ([`semantic`] module)
//! - **Geometry**: Basic geometric types for layout ([`geometry`] module)

pub mod address;
pub mod catalog;
pub mod geometry;
pub mod identifier;
pub mod plan;
pub mod semantic;
