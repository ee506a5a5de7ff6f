//! Core CRMX library (session lifecycle, request pipeline, domain clients, config).

pub mod clients;
pub mod config;
pub mod error;
pub mod session;
pub mod types;
