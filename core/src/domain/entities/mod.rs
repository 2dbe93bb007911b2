//! Domain entities representing core business objects.

pub mod refresh_token;

// Re-export commonly used types
pub use refresh_token::{
    IssuedRefreshToken, NewRefreshToken, RawRefreshToken, RefreshTokenRecord, TokenFamily,
    TokenId, TokenState,
};
