//! Weft Core Types and Definitions
//!
//! This crate provides the foundational building blocks for Weft diagram
//! models. It includes:
//!
//! - **Identifiers**: Interned, randomly generated entity identifiers ([`identifier::Id`])
//! - **Geometry**: Coordinates, dimensions and rectangles ([`geometry`] module)
//! - **Path**: SVG path hints for link rendering ([`path`] module)
//! - **State**: Observable value and entity containers ([`state`] module)
//! - **Entity**: Identity, locking and destroy lifecycle ([`entity`] module)

pub mod entity;
pub mod error;
pub mod geometry;
pub mod identifier;
pub mod path;
pub mod state;
