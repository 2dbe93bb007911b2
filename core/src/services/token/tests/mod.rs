//! Tests for refresh token service

#[cfg(test)]
mod mocks;
