//! Types shared by the Muse Mart server, storage layer and client.
//!
//! `api` holds the JSON wire format (camelCase, matching the web client).
//! `models` holds the domain enums and the pricing rules.

pub mod api;
pub mod models;
