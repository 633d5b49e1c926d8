//! # elif-container-derive
//!
//! Procedural macros for the elif-container dependency injection system:
//! - `#[injectable]`: implement `Injectable` for a struct from its fields

use proc_macro::TokenStream;

mod injectable;

/// Implement `Injectable` for a struct whose fields are `Arc<T>` or `Option<Arc<T>>`
///
/// Fields are resolved in declaration order. `#[inject(name = "...")]`
/// resolves a named binding instead of the type's default key.
#[proc_macro_attribute]
pub fn injectable(args: TokenStream, input: TokenStream) -> TokenStream {
    injectable::injectable_impl(args, input)
}
