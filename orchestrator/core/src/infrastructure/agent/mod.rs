// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Agent runtime adapters

pub mod adk;

pub use adk::AdkAgentClient;
