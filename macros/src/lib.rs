//! Derive macros for the Seatflow reducer architecture
//!
//! # Available Macros
//!
//! - `#[derive(Action)]` - Generates helpers for action enums (commands/events)
//!
//! # Example
//!
//! ```ignore
//! use seatflow_macros::Action;
//!
//! #[derive(Action, Clone, Debug)]
//! enum BookingAction {
//!     #[command]
//!     Book { seat: u64 },
//!
//!     #[event]
//!     Booked { seat: u64 },
//! }
//!
//! assert!(BookingAction::Book { seat: 1 }.is_command());
//! assert!(BookingAction::Booked { seat: 1 }.is_event());
//! assert_eq!(BookingAction::Booked { seat: 1 }.event_type(), "Booked.v1");
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{Attribute, Data, DeriveInput, Fields, Ident, parse_macro_input};

/// Derive macro for Action enums
///
/// Generates helper methods for action enums:
/// - `is_command()` - Returns true if this variant is a command
/// - `is_event()` - Returns true if this variant is an event
/// - `event_type()` - Versioned type name of an event (`"Variant.v1"`)
/// - `action_name()` - The variant name, for logging
///
/// # Attributes
///
/// - `#[command]` - Mark a variant as a command
/// - `#[event]` - Mark a variant as an event
///
/// Unmarked variants are neither.
///
/// # Errors
///
/// Produces a compile error if:
/// - Applied to a non-enum type
/// - A variant has both `#[command]` and `#[event]` attributes
#[proc_macro_derive(Action, attributes(command, event))]
pub fn derive_action(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    let name = &input.ident;

    let Data::Enum(data_enum) = &input.data else {
        return syn::Error::new_spanned(&input, "#[derive(Action)] can only be used on enums")
            .to_compile_error()
            .into();
    };

    let mut is_command_arms = Vec::new();
    let mut is_event_arms = Vec::new();
    let mut event_type_arms = Vec::new();
    let mut name_arms = Vec::new();

    for variant in &data_enum.variants {
        let is_command = has_attribute(&variant.attrs, "command");
        let is_event = has_attribute(&variant.attrs, "event");

        if is_command && is_event {
            return syn::Error::new_spanned(variant, "Variant cannot be both #[command] and #[event]")
                .to_compile_error()
                .into();
        }

        let pattern = variant_pattern(&variant.ident, &variant.fields);
        let variant_name = variant.ident.to_string();

        if is_command {
            is_command_arms.push(quote! { #pattern => true, });
        }
        if is_event {
            let type_name = format!("{variant_name}.v1");
            is_event_arms.push(quote! { #pattern => true, });
            event_type_arms.push(quote! { #pattern => #type_name, });
        }
        name_arms.push(quote! { #pattern => #variant_name, });
    }

    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let expanded = quote! {
        impl #impl_generics #name #ty_generics #where_clause {
            /// Returns true if this action is a command
            #[must_use]
            #[allow(clippy::match_like_matches_macro)]
            pub const fn is_command(&self) -> bool {
                match self {
                    #(#is_command_arms)*
                    _ => false,
                }
            }

            /// Returns true if this action is an event
            #[must_use]
            #[allow(clippy::match_like_matches_macro)]
            pub const fn is_event(&self) -> bool {
                match self {
                    #(#is_event_arms)*
                    _ => false,
                }
            }

            /// Returns the event type name for serialization
            ///
            /// Only events have type names. Other variants return "unknown".
            #[must_use]
            pub const fn event_type(&self) -> &'static str {
                match self {
                    #(#event_type_arms)*
                    _ => "unknown",
                }
            }

            /// Returns the variant name
            #[must_use]
            pub const fn action_name(&self) -> &'static str {
                match self {
                    #(#name_arms)*
                }
            }
        }
    };

    TokenStream::from(expanded)
}

/// Match pattern for a variant, ignoring its fields
fn variant_pattern(ident: &Ident, fields: &Fields) -> TokenStream2 {
    match fields {
        Fields::Named(_) => quote! { Self::#ident { .. } },
        Fields::Unnamed(_) => quote! { Self::#ident(..) },
        Fields::Unit => quote! { Self::#ident },
    }
}

/// Helper function to check if an attribute list contains a specific attribute
fn has_attribute(attrs: &[Attribute], name: &str) -> bool {
    attrs.iter().any(|attr| attr.path().is_ident(name))
}
