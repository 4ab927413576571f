//! `quotesheet` - Author, store and render a single price quote
//!
//! The quote is one JSON document holding a title, client, intro and
//! grouped line items. This library provides the document model, the editor
//! form mapping, HTML rendering, file storage, the HTTP server, and the save
//! client with its download fallback and liveness monitor.

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

pub mod api;
pub mod cli;
pub mod client;
pub mod config;
pub mod error;
pub mod form;
pub mod logging;
pub mod quote;
pub mod render;
pub mod server;
pub mod status;
pub mod store;

pub use client::{HttpTransport, SaveClient, SaveOutcome, SaveTransport};
pub use config::Config;
pub use error::{Error, Result};
pub use form::{EditorAction, QuoteForm};
pub use logging::init_logging;
pub use quote::{Group, Item, Quote};
pub use status::{ServerStatus, StatusMonitor};
pub use store::{QuoteStore, SaveReceipt};
