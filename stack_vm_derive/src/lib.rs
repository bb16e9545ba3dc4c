//! Derive macros for the stack_vm crate.
//!
//! Provides:
//! - `#[derive(Error)]` - `Display`, `std::error::Error` and a variant
//!   classifier for interpreter error types (thiserror replacement)

mod error;

use proc_macro::TokenStream;

/// Implements `Display` and `Error` from `#[error("...")]` attributes.
///
/// Enums additionally get an inherent `variant_name()` returning the name of
/// the active variant, used to classify failures without matching on them.
#[proc_macro_derive(Error, attributes(error))]
pub fn derive_error(input: TokenStream) -> TokenStream {
    error::derive_error(input)
}
