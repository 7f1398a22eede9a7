// crates/repid-access/src/lib.rs
//
// repid-access: Access-Tier Gate for the RepID consensus engine.
//
// Maps composite reputation to a named rate-limit tier and an hourly request
// allowance, and keeps API credentials' cached limits in sync with score
// changes so request-time checks never recompute reputation.

pub mod credentials;
pub mod tier;

pub use credentials::{ApiCredential, CredentialRegistry, RateDecision};
pub use tier::{rate_limit_for, AccessConfig, AccessTier, RateLimit};
