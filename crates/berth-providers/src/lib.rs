//! HTTP capability backends for berth.
//!
//! Concrete implementations of the core's capability traits:
//! - [`NetlifyProvider`]: `HostingProvider` over the Netlify REST API
//! - [`GeminiModel`]: `CompletionModel` over the Gemini API
//!
//! Both read credentials from the environment (`NETLIFY_AUTH_TOKEN`,
//! `GEMINI_API_KEY`) and are stateless, so a single instance can serve
//! concurrent orchestrations.

pub mod error;
pub mod gemini;
pub mod netlify;

pub use error::ProviderApiError;
pub use gemini::{GeminiConfig, GeminiModel};
pub use netlify::{NetlifyConfig, NetlifyProvider};
