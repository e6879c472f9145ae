// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Test case generation controller
//!
//! Module registry, business modules, service adapters and the HTTP API of the
//! test case generation service.
//!
//! # Architecture
//!
//! - **Layer:** Core System
//! - **Purpose:** Library behind the `testgen` binary

pub mod domain;
pub mod application;
pub mod infrastructure;
pub mod presentation;

pub use domain::*;
