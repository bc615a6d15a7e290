//! Studio IA: turns a garment photo into an AI-generated e-commerce
//! presentation.
//!
//! The crate is split the way requests flow: [`encoder`] prepares the upload,
//! [`prompt`] writes the instruction, a [`presentation::PresentationClient`]
//! talks to the generation service (directly or through the relay in
//! [`server`]), [`auth`] gates access, and [`studio::Studio`] drives one
//! designer's session.

pub mod auth;
pub mod config;
pub mod encoder;
pub mod error;
pub mod logger;
pub mod models;
pub mod presentation;
pub mod prompt;
#[cfg(feature = "server")]
pub mod server;
pub mod studio;

pub use auth::{FirebaseIdentity, IdentityProvider, IdentitySubscription, Session, TokenSource};
pub use config::{Config, GeminiConfig, IdentityConfig, PresentationBackend, RelayConfig};
pub use encoder::{GarmentAsset, PreviewHandle, PreviewRegistry};
pub use error::{AuthError, Result, StudioError};
pub use models::*;
pub use presentation::{build_client, GeminiClient, PresentationClient, RelayClient};
pub use studio::{download_filename, Studio, StudioState};
