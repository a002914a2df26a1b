// SPDX-License-Identifier: MIT

pub mod error;
pub mod http;
pub mod model;
pub mod tool;
