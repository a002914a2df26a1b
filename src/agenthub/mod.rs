// SPDX-License-Identifier: MIT

pub mod config;
pub mod registry;
pub mod server;
pub mod store;
pub mod tools;
pub mod workflow;
