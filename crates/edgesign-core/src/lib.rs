//! Edge request re-signing for S3-compatible origins.
//!
//! A CDN request trigger hands over an [`EdgeEvent`]; [`RequestSigner`]
//! filters the request's headers down to a read-only allow-list, signs the
//! result with AWS SigV4, substitutes the signed headers, and strips the
//! query string. Requests already marked as failed over pass through
//! untouched.
//!
//! Collaborators are injected: credentials through
//! [`CredentialProvider`](edgesign_auth::CredentialProvider), logging through
//! [`RequestObserver`], and the optional debug replay through
//! [`TelemetrySink`].

pub mod config;
pub mod error;
pub mod headers;
pub mod layout;
pub mod model;
pub mod observer;
pub mod signer;
pub mod telemetry;

pub use config::SignerConfig;
pub use error::{SignerError, SignerResult, TelemetryError};
pub use layout::KeyLayout;
pub use model::{EdgeEvent, EdgeHeaders, EdgeRequest, HeaderEntry, OriginConfig};
pub use observer::{NoopObserver, RequestObserver, TracingObserver};
pub use signer::RequestSigner;
pub use telemetry::{DebugFailure, DebugResponse, ReqwestTelemetrySink, TelemetrySink};
