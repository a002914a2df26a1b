// SPDX-License-Identifier: MIT

//! Storage for chats, generated artifacts and uploaded documents

pub mod chats;
pub mod content;
pub mod documents;

pub use chats::{ChatStore, InMemoryChatStore};
pub use content::ContentStore;
pub use documents::DocumentStore;
