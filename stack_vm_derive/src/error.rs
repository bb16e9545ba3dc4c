//! Derive macro for error types.
//!
//! Generates `std::fmt::Display` and `std::error::Error` implementations, plus
//! a `variant_name()` classifier for enums.
//!
//! # Usage
//!
//! ```ignore
//! use stack_vm_derive::Error;
//!
//! #[derive(Debug, Error)]
//! pub enum LoadError {
//!     #[error("cannot read {0}")]
//!     Unreadable(String),
//!
//!     #[error("program holds {count} instructions, capacity is {capacity}")]
//!     TooLarge { count: usize, capacity: usize },
//!
//!     #[error("empty program")]
//!     Empty,
//! }
//!
//! assert_eq!(LoadError::Empty.variant_name(), "Empty");
//! ```
//!
//! # Supported Features
//!
//! - Unit variants: `#[error("message")]`
//! - Tuple variants with positional args: `#[error("error: {0}")]`
//! - Struct variants with named args: `#[error("expected {expected}")]`
//! - Structs carrying a single `#[error("...")]` on the type itself

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::{ToTokens, format_ident, quote};
use syn::{Attribute, Data, DataEnum, DataStruct, DeriveInput, Fields, Lit, Meta, Variant};

pub fn derive_error(input: TokenStream) -> TokenStream {
    let input = syn::parse_macro_input!(input as DeriveInput);

    match expand(&input) {
        Ok(tokens) => TokenStream::from(tokens),
        Err(err) => err.to_compile_error().into(),
    }
}

fn expand(input: &DeriveInput) -> syn::Result<TokenStream2> {
    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let (display_body, extra) = match &input.data {
        Data::Enum(data) => (enum_display_body(data)?, enum_classifier(input, data)),
        Data::Struct(data) => (struct_display_body(input, data)?, TokenStream2::new()),
        Data::Union(_) => {
            return Err(syn::Error::new_spanned(
                input,
                "Error derive does not support unions",
            ));
        }
    };

    Ok(quote! {
        impl #impl_generics ::std::fmt::Display for #name #ty_generics #where_clause {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                #display_body
            }
        }

        impl #impl_generics ::std::error::Error for #name #ty_generics #where_clause {}

        #extra
    })
}

/// Builds the `match self { ... }` body writing each variant's message.
fn enum_display_body(data: &DataEnum) -> syn::Result<TokenStream2> {
    let arms = data
        .variants
        .iter()
        .map(variant_display_arm)
        .collect::<syn::Result<Vec<_>>>()?;

    Ok(quote! {
        match self {
            #(#arms)*
        }
    })
}

fn variant_display_arm(variant: &Variant) -> syn::Result<TokenStream2> {
    let ident = &variant.ident;
    let message = message_from_attrs(&variant.attrs, ident, &format!("variant `{}`", ident))?;

    Ok(match &variant.fields {
        Fields::Unit => quote! {
            Self::#ident => write!(f, #message),
        },
        Fields::Unnamed(fields) => {
            let bindings: Vec<_> = (0..fields.unnamed.len())
                .map(|i| format_ident!("f{}", i))
                .collect();
            let message = positional_to_named(&message, bindings.len());
            quote! {
                Self::#ident(#(#bindings),*) => write!(f, #message, #(#bindings = #bindings),*),
            }
        }
        Fields::Named(fields) => {
            let bindings: Vec<_> = fields.named.iter().map(|f| &f.ident).collect();
            quote! {
                #[allow(unused_variables)]
                Self::#ident { #(#bindings),* } => write!(f, #message, #(#bindings = #bindings),*),
            }
        }
    })
}

/// Generates `variant_name()` so callers can classify an error by kind.
fn enum_classifier(input: &DeriveInput, data: &DataEnum) -> TokenStream2 {
    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let arms = data.variants.iter().map(|variant| {
        let ident = &variant.ident;
        let label = ident.to_string();
        let pattern = match &variant.fields {
            Fields::Unit => quote! { Self::#ident },
            Fields::Unnamed(_) => quote! { Self::#ident(..) },
            Fields::Named(_) => quote! { Self::#ident { .. } },
        };
        quote! { #pattern => #label, }
    });

    quote! {
        impl #impl_generics #name #ty_generics #where_clause {
            /// Returns the name of the active variant.
            pub fn variant_name(&self) -> &'static str {
                match self {
                    #(#arms)*
                }
            }
        }
    }
}

fn struct_display_body(input: &DeriveInput, data: &DataStruct) -> syn::Result<TokenStream2> {
    let message = message_from_attrs(
        &input.attrs,
        &input.ident,
        &format!("type `{}`", input.ident),
    )?;

    Ok(match &data.fields {
        Fields::Unit => quote! {
            write!(f, #message)
        },
        Fields::Named(fields) => {
            let names: Vec<_> = fields.named.iter().map(|f| &f.ident).collect();
            quote! {
                write!(f, #message, #(#names = self.#names),*)
            }
        }
        Fields::Unnamed(fields) => {
            let bindings: Vec<_> = (0..fields.unnamed.len())
                .map(|i| format_ident!("f{}", i))
                .collect();
            let indices: Vec<_> = (0..fields.unnamed.len()).map(syn::Index::from).collect();
            let message = positional_to_named(&message, bindings.len());
            quote! {
                write!(f, #message, #(#bindings = self.#indices),*)
            }
        }
    })
}

/// Reads the string literal out of an `#[error("...")]` attribute.
fn message_from_attrs<T: ToTokens>(
    attrs: &[Attribute],
    target: &T,
    target_desc: &str,
) -> syn::Result<String> {
    let Some(attr) = attrs.iter().find(|attr| attr.path().is_ident("error")) else {
        return Err(syn::Error::new_spanned(
            target,
            format!(
                "missing #[error(\"...\")] attribute on {}; every error needs a display message",
                target_desc
            ),
        ));
    };

    let Meta::List(list) = &attr.meta else {
        return Err(syn::Error::new_spanned(
            &attr.meta,
            "invalid #[error] attribute; use #[error(\"message\")]",
        ));
    };

    match syn::parse2::<Lit>(list.tokens.clone()) {
        Ok(Lit::Str(lit)) => Ok(lit.value()),
        Ok(_) => Err(syn::Error::new_spanned(
            &attr.meta,
            "#[error] message must be a string literal, e.g. #[error(\"stack underflow\")]",
        )),
        Err(_) => Err(syn::Error::new_spanned(
            &attr.meta,
            "failed to parse #[error] attribute; expected a single string literal",
        )),
    }
}

/// Rewrites `{0}`, `{1:?}` into `{f0}`, `{f1:?}` so they bind to named args.
fn positional_to_named(message: &str, field_count: usize) -> String {
    let mut result = message.to_string();
    for i in (0..field_count).rev() {
        result = result
            .replace(&format!("{{{}}}", i), &format!("{{f{}}}", i))
            .replace(&format!("{{{}:", i), &format!("{{f{}:", i));
    }
    result
}
