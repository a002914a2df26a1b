// SPDX-License-Identifier: MIT

//! agenthub-rs: a chat backend that routes each message through an
//! LLM-driven classification workflow.
//!
//! - [adk] holds the provider-neutral pieces (models, tools, errors, HTTP retry)
//! - [agenthub] holds the application (config, stores, workflow, HTTP server)

pub mod adk;
pub mod agenthub;
