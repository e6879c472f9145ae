// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

pub mod agent;
pub mod alm;
pub mod cache;
pub mod db;
pub mod document_extractor;
pub mod embedding_client;
pub mod factory;
pub mod repositories;
pub mod vector;

pub use factory::{build_services, BuiltServices};
