mod client;
mod json_types;

pub use client::IndexClient;
