// SPDX-License-Identifier: MIT

pub mod document_search;
pub mod web_search;

pub use document_search::DocumentSearchTool;
pub use web_search::WebSearchTool;
