//! MySQL implementations of the core store traits

pub mod token_store;
mod util;

pub use token_store::MySqlTokenStore;
