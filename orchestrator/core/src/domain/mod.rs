// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Domain model: sessions, test cases, traceability, the module contract and
//! the collaborator traits the infrastructure layer implements.
//!
//! # Architecture
//!
//! - **Layer:** Domain Layer
//! - **Purpose:** Types and traits with no I/O

pub mod agent;
pub mod alm;
pub mod document;
pub mod generation;
pub mod module;
pub mod service_config;
pub mod session;
pub mod stores;
pub mod test_case;
pub mod traceability;
