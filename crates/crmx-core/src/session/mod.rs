//! Session lifecycle: credential storage, the authenticated request
//! pipeline, and the controller composing them.

pub mod controller;
pub mod pipeline;
pub mod store;

pub use controller::SessionController;
pub use pipeline::{ApiPipeline, FieldValue, FormField, Payload};
pub use store::CredentialStore;
