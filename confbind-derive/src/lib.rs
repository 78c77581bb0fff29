//! Derive macros for the confbind configuration binding library
//!
//! This crate provides `#[derive(Bindable)]` for generating the member list
//! that confbind discovers bindings from.
//!
//! # Usage
//!
//! ```text
//! use confbind::{ChangeEvent, Config, DeriveBindable};
//!
//! #[derive(Default, DeriveBindable)]
//! #[bindable(setter(method = "set_timeout", value = "${http.timeout}:30", arg = "i64"))]
//! #[bindable(listener(method = "on_change", namespaces = ["application"]))]
//! struct HttpClient {
//!     #[value("${http.endpoint}")]
//!     endpoint: String,
//!
//!     #[config("http")]
//!     config: Option<Config>,
//!
//!     timeout: i64,
//! }
//!
//! impl HttpClient {
//!     fn set_timeout(&mut self, seconds: i64) { self.timeout = seconds; }
//!     fn on_change(&mut self, event: &ChangeEvent) { /* ... */ }
//! }
//! ```

use proc_macro::TokenStream;
use proc_macro2::Span;
use quote::quote;
use syn::punctuated::Punctuated;
use syn::{
    Attribute, Data, DeriveInput, Expr, Fields, Ident, Lit, LitStr, Meta, Token, Type,
    parse_macro_input,
};

const DEFAULT_NAMESPACE: &str = "application";

/// Derive macro for generating `Bindable` implementations.
///
/// # Attributes
///
/// ## Field attributes
/// - `#[value("${key}:default")]` - Bind the field to a placeholder expression
/// - `#[config("namespace")]` - Inject a namespace handle (field must be `Option<Config>`);
///   a bare `#[config]` injects `application`
///
/// ## Container attributes (`#[bindable(...)]`)
/// - `setter(method = "name", value = "${key}", arg = "Type")` - Bind a
///   single-argument method returning `()` or `Result<(), E>`
/// - `listener(method = "name", namespaces = ["ns", ...])` - Call
///   `fn name(&mut self, event: &ChangeEvent)` on every change event;
///   namespaces default to `["application"]`
#[proc_macro_derive(Bindable, attributes(value, config, bindable))]
pub fn derive_bindable(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match expand(&input) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

fn expand(input: &DeriveInput) -> syn::Result<proc_macro2::TokenStream> {
    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => &fields.named,
            _ => {
                return Err(syn::Error::new_spanned(
                    input,
                    "Bindable can only be derived for structs with named fields.\n\nExample:\n  #[derive(Bindable)]\n  struct MyService {\n      #[value(\"${my.key}\")]\n      field: Type,\n  }",
                ));
            }
        },
        _ => {
            return Err(syn::Error::new_spanned(
                input,
                "Bindable can only be derived for structs.\n\nTry: #[derive(Bindable)] on a struct, not an enum or union.",
            ));
        }
    };

    let mut members = Vec::new();

    for field in fields {
        let Some(ident) = field.ident.as_ref() else {
            continue;
        };
        let attrs = parse_field_attrs(&field.attrs)?;
        if attrs.values.is_empty() && attrs.configs.is_empty() {
            continue;
        }
        members.push(field_member(ident, &field.ty, &attrs));
    }

    for method in parse_container_attrs(&input.attrs)? {
        members.push(match method {
            MethodAttr::Setter { method, value, arg } => setter_member(&method, &value, &arg),
            MethodAttr::Listener { method, namespaces } => listener_member(&method, &namespaces),
        });
    }

    Ok(quote! {
        impl #impl_generics confbind::Bindable for #name #ty_generics #where_clause {
            fn members() -> ::std::vec::Vec<confbind::Member<Self>> {
                ::std::vec![#(#members),*]
            }
        }
    })
}

fn field_member(ident: &Ident, ty: &Type, attrs: &FieldAttrs) -> proc_macro2::TokenStream {
    let name = ident.to_string();
    let values = attrs.values.iter();
    let configs = attrs.configs.iter();

    quote! {
        confbind::Member::<Self>::field(
            #name,
            <#ty as confbind::BindValue>::value_type(),
            |owner, arg| {
                owner.#ident = <#ty as confbind::BindValue>::from_argument(arg)?;
                ::std::result::Result::Ok(())
            },
        )
        #(.value(#values))*
        #(.annotated(confbind::Annotation::Config(::std::string::String::from(#configs))))*
    }
}

fn setter_member(method: &LitStr, value: &LitStr, arg: &Type) -> proc_macro2::TokenStream {
    let ident = Ident::new(&method.value(), method.span());
    quote! {
        confbind::Member::<Self>::method(
            #method,
            ::std::vec![<#arg as confbind::BindValue>::value_type()],
            |owner, arg| {
                let value = <#arg as confbind::BindValue>::from_argument(arg)?;
                confbind::SetterOutcome::into_outcome(owner.#ident(value))
            },
        )
        .value(#value)
    }
}

fn listener_member(method: &LitStr, namespaces: &[String]) -> proc_macro2::TokenStream {
    let ident = Ident::new(&method.value(), method.span());
    let namespaces = namespaces.iter();
    quote! {
        confbind::Member::<Self>::method(
            #method,
            ::std::vec![confbind::ValueType::ChangeEvent],
            |owner, arg| match arg {
                confbind::Argument::Event(event) => {
                    confbind::SetterOutcome::into_outcome(owner.#ident(event))
                }
                _ => ::std::result::Result::Err(
                    ::std::format!("{} expects a change event", #method),
                ),
            },
        )
        .annotated(confbind::Annotation::ChangeListener(::std::vec![
            #(::std::string::String::from(#namespaces)),*
        ]))
    }
}

/// Field-level attributes: `#[value(...)]` and `#[config(...)]`
#[derive(Default)]
struct FieldAttrs {
    values: Vec<LitStr>,
    configs: Vec<String>,
}

/// Method bindings declared with `#[bindable(...)]`
enum MethodAttr {
    Setter {
        method: LitStr,
        value: LitStr,
        arg: Type,
    },
    Listener {
        method: LitStr,
        namespaces: Vec<String>,
    },
}

fn parse_field_attrs(attrs: &[Attribute]) -> syn::Result<FieldAttrs> {
    let mut result = FieldAttrs::default();

    for attr in attrs {
        if attr.path().is_ident("value") {
            result.values.push(attr.parse_args::<LitStr>().map_err(|_| {
                syn::Error::new_spanned(
                    attr,
                    "#[value] takes a placeholder expression.\n\nExample: #[value(\"${server.port}:8080\")]",
                )
            })?);
        } else if attr.path().is_ident("config") {
            let namespace = match &attr.meta {
                Meta::Path(_) => DEFAULT_NAMESPACE.to_string(),
                _ => attr
                    .parse_args::<LitStr>()
                    .map_err(|_| {
                        syn::Error::new_spanned(
                            attr,
                            "#[config] takes a namespace name.\n\nExample: #[config(\"datasource\")]",
                        )
                    })?
                    .value(),
            };
            result.configs.push(namespace);
        }
    }

    Ok(result)
}

fn parse_container_attrs(attrs: &[Attribute]) -> syn::Result<Vec<MethodAttr>> {
    let mut result = Vec::new();

    for attr in attrs {
        if !attr.path().is_ident("bindable") {
            continue;
        }
        let nested = attr.parse_args_with(Punctuated::<Meta, Token![,]>::parse_terminated)?;
        for meta in nested {
            let Meta::List(list) = &meta else {
                return Err(syn::Error::new_spanned(
                    &meta,
                    "expected setter(...) or listener(...)",
                ));
            };
            let options = list.parse_args_with(Punctuated::<Meta, Token![,]>::parse_terminated)?;
            let options = NameValues::collect(&options)?;

            if list.path.is_ident("setter") {
                result.push(MethodAttr::Setter {
                    method: options.require_str("method", list)?,
                    value: options.require_str("value", list)?,
                    arg: options.require_str("arg", list)?.parse()?,
                });
            } else if list.path.is_ident("listener") {
                let namespaces = match options.get("namespaces") {
                    Some(expr) => string_array(expr)?,
                    None => vec![DEFAULT_NAMESPACE.to_string()],
                };
                result.push(MethodAttr::Listener {
                    method: options.require_str("method", list)?,
                    namespaces,
                });
            } else {
                return Err(syn::Error::new_spanned(
                    &list.path,
                    "unknown bindable option, expected setter(...) or listener(...)",
                ));
            }
        }
    }

    Ok(result)
}

/// `name = value` pairs inside one `setter(...)` or `listener(...)`
struct NameValues<'a> {
    entries: Vec<(String, &'a Expr)>,
}

impl<'a> NameValues<'a> {
    fn collect(options: &'a Punctuated<Meta, Token![,]>) -> syn::Result<Self> {
        let mut entries = Vec::new();
        for option in options {
            match option {
                Meta::NameValue(nv) => {
                    let name = nv
                        .path
                        .get_ident()
                        .map(ToString::to_string)
                        .ok_or_else(|| syn::Error::new_spanned(&nv.path, "expected a name"))?;
                    entries.push((name, &nv.value));
                }
                other => {
                    return Err(syn::Error::new_spanned(other, "expected `name = value`"));
                }
            }
        }
        Ok(Self { entries })
    }

    fn get(&self, name: &str) -> Option<&'a Expr> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, expr)| *expr)
    }

    fn require_str(&self, name: &str, owner: &syn::MetaList) -> syn::Result<LitStr> {
        match self.get(name) {
            Some(Expr::Lit(lit)) => match &lit.lit {
                Lit::Str(s) => Ok(s.clone()),
                _ => Err(syn::Error::new_spanned(
                    lit,
                    format!("`{name}` must be a string literal"),
                )),
            },
            Some(other) => Err(syn::Error::new_spanned(
                other,
                format!("`{name}` must be a string literal"),
            )),
            None => Err(syn::Error::new_spanned(
                owner,
                format!("missing `{name} = \"...\"`"),
            )),
        }
    }
}

fn string_array(expr: &Expr) -> syn::Result<Vec<String>> {
    let Expr::Array(array) = expr else {
        return Err(syn::Error::new_spanned(
            expr,
            "namespaces must be an array of strings.\n\nExample: namespaces = [\"application\", \"datasource\"]",
        ));
    };
    let namespaces = array
        .elems
        .iter()
        .map(|elem| match elem {
            Expr::Lit(lit) => match &lit.lit {
                Lit::Str(s) => Ok(s.value()),
                _ => Err(syn::Error::new_spanned(elem, "expected a string literal")),
            },
            _ => Err(syn::Error::new_spanned(elem, "expected a string literal")),
        })
        .collect::<syn::Result<Vec<_>>>()?;
    if namespaces.is_empty() {
        return Err(syn::Error::new(
            Span::call_site(),
            "namespaces must list at least one namespace",
        ));
    }
    Ok(namespaces)
}
