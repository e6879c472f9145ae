// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! ALM adapters

pub mod azure_devops;

pub use azure_devops::AzureDevOpsClient;
