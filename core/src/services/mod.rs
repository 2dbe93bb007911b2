//! Business services containing domain logic and use cases.

pub mod token;

// Re-export commonly used types
pub use token::{
    CleanupReport, Clock, ManualClock, OsRandomSource, RefreshTokenService,
    RefreshTokenServiceConfig, SecureRandomSource, Sha256TokenHasher, SystemClock,
    TokenCleanupConfig, TokenCleanupService, TokenHasher,
};
