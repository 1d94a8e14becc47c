#![deny(clippy::all, warnings)]
#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::must_use_candidate
)]

pub mod platform;
pub mod policy;
pub mod request;

pub use platform::{Platform, UnknownPlatform};
pub use policy::{candidates_for, CandidateSubpath, DedupPolicy};
pub use request::{InstallRequest, RequestError};
