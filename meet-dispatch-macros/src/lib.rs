//! Procedural macros for meet-dispatch

use darling::{FromDeriveInput, FromVariant};
use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::{format_ident, quote};
use std::collections::HashSet;
use syn::{parse_macro_input, DeriveInput};

/// Container-level attributes for #[derive(Action)]
#[derive(Debug, FromDeriveInput)]
#[darling(attributes(action), supports(enum_any))]
struct ActionOpts {
    ident: syn::Ident,
    vis: syn::Visibility,
    data: darling::ast::Data<ActionVariant, ()>,

    /// Owning feature, e.g. `base/conference`
    #[darling(default)]
    feature: Option<String>,

    /// Prepended to derived kind names: `prefix = "CONFERENCE"` turns
    /// `WillJoin` into `CONFERENCE_WILL_JOIN`
    #[darling(default)]
    prefix: Option<String>,

    /// Name of the generated module holding the kind statics
    #[darling(default)]
    kinds: Option<String>,

    /// Skip the blanket `ActionSummary` impl
    #[darling(default)]
    custom_summary: bool,
}

/// Variant-level attributes
#[derive(Debug, FromVariant)]
#[darling(attributes(action))]
struct ActionVariant {
    ident: syn::Ident,
    fields: darling::ast::Fields<syn::Field>,

    /// Explicit kind name
    #[darling(default)]
    kind: Option<String>,

    /// Wraps another action enum and delegates to it
    #[darling(default)]
    nested: bool,
}

/// `WillJoin` -> `WILL_JOIN`, `P2PStatus` -> `P2P_STATUS`
fn to_screaming_snake(s: &str) -> String {
    let chars: Vec<char> = s.chars().collect();
    let mut out = String::with_capacity(s.len() + 4);
    for (i, &ch) in chars.iter().enumerate() {
        if ch.is_uppercase() && i > 0 {
            let prev = chars[i - 1];
            let next_is_lower = chars.get(i + 1).is_some_and(|c| c.is_lowercase());
            if prev.is_lowercase() || (prev.is_uppercase() && next_is_lower) {
                out.push('_');
            }
        }
        out.extend(ch.to_uppercase());
    }
    out
}

/// `ConferenceAction` -> `conference_action`
fn to_snake_case(s: &str) -> String {
    to_screaming_snake(s).to_lowercase()
}

fn pattern(enum_name: &syn::Ident, variant: &ActionVariant) -> TokenStream2 {
    let ident = &variant.ident;
    match variant.fields.style {
        darling::ast::Style::Unit => quote! { #enum_name::#ident },
        darling::ast::Style::Tuple => quote! { #enum_name::#ident(..) },
        darling::ast::Style::Struct => quote! { #enum_name::#ident { .. } },
    }
}

/// Derive macro for the Action trait
///
/// Every non-nested variant gets its own `static ActionKind`, so kinds are
/// unique by address across the whole program. The statics live in a
/// generated module (default `<enum_snake_case>_kinds`) named after the kind:
///
/// ```ignore
/// #[derive(Action, Clone, Debug)]
/// #[action(feature = "base/conference", prefix = "CONFERENCE")]
/// pub enum ConferenceAction {
///     WillJoin { url: String },
///     Left { url: String },
///     #[action(kind = "SET_PASSWORD")]
///     SetPassword { password: Option<String> },
/// }
///
/// #[derive(Action, Clone, Debug)]
/// pub enum AppAction {
///     #[action(nested)]
///     Conference(ConferenceAction),
/// }
///
/// let action: AppAction = ConferenceAction::Left { url: "u".into() }.into();
/// assert_eq!(action.name(), "CONFERENCE_LEFT");
/// assert_eq!(action.kind(), &conference_action_kinds::CONFERENCE_LEFT);
/// ```
///
/// Nested variants must hold exactly one field whose type implements
/// `Action`; a `From` impl is generated for each of them.
#[proc_macro_derive(Action, attributes(action))]
pub fn derive_action(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    if !input.generics.params.is_empty() {
        return syn::Error::new_spanned(
            &input.generics,
            "Action cannot be derived for generic enums",
        )
        .to_compile_error()
        .into();
    }

    let opts = match ActionOpts::from_derive_input(&input) {
        Ok(opts) => opts,
        Err(e) => return e.write_errors().into(),
    };

    let name = &opts.ident;
    let vis = &opts.vis;

    let variants = match &opts.data {
        darling::ast::Data::Enum(variants) => variants,
        _ => {
            return syn::Error::new_spanned(&input, "Action can only be derived for enums")
                .to_compile_error()
                .into();
        }
    };

    let feature = opts
        .feature
        .clone()
        .unwrap_or_else(|| to_snake_case(&name.to_string()));
    let kinds_mod = format_ident!(
        "{}",
        opts.kinds
            .clone()
            .unwrap_or_else(|| format!("{}_kinds", to_snake_case(&name.to_string())))
    );

    let mut statics = Vec::new();
    let mut kind_arms = Vec::new();
    let mut all_kinds = Vec::new();
    let mut from_impls = Vec::new();
    let mut seen = HashSet::new();

    for v in variants {
        let variant_ident = &v.ident;

        if v.nested {
            let field = match (v.fields.style, v.fields.fields.as_slice()) {
                (darling::ast::Style::Tuple, [field]) => field,
                _ => {
                    return syn::Error::new_spanned(
                        variant_ident,
                        "#[action(nested)] requires a single unnamed field",
                    )
                    .to_compile_error()
                    .into();
                }
            };
            let inner = &field.ty;
            kind_arms.push(quote! {
                #name::#variant_ident(inner) => ::meet_dispatch::Action::kind(inner)
            });
            from_impls.push(quote! {
                impl ::core::convert::From<#inner> for #name {
                    fn from(action: #inner) -> Self {
                        #name::#variant_ident(action)
                    }
                }
            });
            continue;
        }

        let kind_name = match (&v.kind, &opts.prefix) {
            (Some(kind), _) => kind.clone(),
            (None, Some(prefix)) => {
                format!("{}_{}", prefix, to_screaming_snake(&variant_ident.to_string()))
            }
            (None, None) => to_screaming_snake(&variant_ident.to_string()),
        };
        if !seen.insert(kind_name.clone()) {
            return syn::Error::new_spanned(
                variant_ident,
                format!("duplicate action kind `{kind_name}`"),
            )
            .to_compile_error()
            .into();
        }

        let static_ident = format_ident!("{}", kind_name);
        let doc =
            format!("Kind token of [`{name}::{variant_ident}`](super::{name}::{variant_ident})");
        statics.push(quote! {
            #[doc = #doc]
            pub static #static_ident: ::meet_dispatch::ActionKind =
                ::meet_dispatch::ActionKind::new(#feature, #kind_name);
        });

        let pat = pattern(name, v);
        kind_arms.push(quote! { #pat => &#kinds_mod::#static_ident });
        all_kinds.push(quote! { &#kinds_mod::#static_ident });
    }

    let mod_doc = format!("Action kind tokens declared by [`{name}`](super::{name})");
    let summary_impl = if opts.custom_summary {
        quote! {}
    } else {
        quote! { impl ::meet_dispatch::ActionSummary for #name {} }
    };

    let expanded = quote! {
        #[doc = #mod_doc]
        #[allow(non_upper_case_globals)]
        #vis mod #kinds_mod {
            #(#statics)*
        }

        impl ::meet_dispatch::Action for #name {
            fn kind(&self) -> &'static ::meet_dispatch::ActionKind {
                match self {
                    #(#kind_arms),*
                }
            }
        }

        impl #name {
            /// Kind tokens declared directly by this enum (nested enums excluded)
            pub fn kinds() -> &'static [&'static ::meet_dispatch::ActionKind] {
                static KINDS: &[&::meet_dispatch::ActionKind] = &[#(#all_kinds),*];
                KINDS
            }
        }

        #summary_impl

        #(#from_impls)*
    };

    expanded.into()
}
