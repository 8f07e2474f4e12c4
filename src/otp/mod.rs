// ============================================================================
// One-Time Passcodes
// ============================================================================
//
// Codes live in a TTL key-value store injected into `OtpService`, keyed
// `otp:<channel>:<recipient>`. Redis in production; the in-memory store is
// process-local and loses codes on restart.
//
// ============================================================================

pub mod service;
pub mod store;

pub use service::{LoggingOtpSender, OtpChannel, OtpError, OtpSender, OtpService};
pub use store::{InMemoryOtpStore, OtpStore, RedisOtpStore};
