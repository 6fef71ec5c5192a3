use crate::utils::apply_derives;
use proc_macro2::TokenStream;
use quote::quote;
use std::collections::HashSet;
use syn::punctuated::Punctuated;
use syn::spanned::Spanned;
use syn::{Expr, ExprLit, Ident, ItemEnum, Lit, LitInt, LitStr, Result, Token, parse::Parse};

/// #[event] 宏实现
/// - 支持具名、元组与单元变体，不改动变体字段
/// - 合并派生：Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize
/// - 生成 `::es_domain::event::DomainEvent` 实现（EVENT_TYPES/event_type/event_version）
/// - 枚举级默认版本：`#[event(version = N)]`
/// - 变体可覆写：`#[event(event_type = "...", event_version = N)]`
pub(crate) fn expand(attr: TokenStream, item: TokenStream) -> Result<TokenStream> {
    let cfg: EnumConfig = syn::parse2(attr)?;
    let mut enum_item: ItemEnum = syn::parse2(item).map_err(|err| {
        syn::Error::new(err.span(), "#[event] can only be used on enum types")
    })?;

    if !enum_item.generics.params.is_empty() {
        return Err(syn::Error::new(
            enum_item.generics.span(),
            "#[event] does not support generic enums",
        ));
    }
    if enum_item.variants.is_empty() {
        return Err(syn::Error::new(
            enum_item.ident.span(),
            "#[event] requires at least one variant",
        ));
    }

    apply_derives(
        &mut enum_item.attrs,
        vec![
            syn::parse_quote!(Debug),
            syn::parse_quote!(Clone),
            syn::parse_quote!(PartialEq),
            syn::parse_quote!(serde::Serialize),
            syn::parse_quote!(serde::Deserialize),
        ],
    )?;

    let default_version = cfg
        .version
        .unwrap_or_else(|| LitInt::new("1", proc_macro2::Span::call_site()));
    let enum_ident = enum_item.ident.clone();

    let mut tags: Vec<LitStr> = Vec::new();
    let mut type_arms = Vec::new();
    let mut version_arms = Vec::new();
    let mut seen = HashSet::new();

    for variant in &mut enum_item.variants {
        let overrides = take_variant_config(&mut variant.attrs)?;
        let v_ident = &variant.ident;

        let tag = overrides.event_type.unwrap_or_else(|| {
            LitStr::new(&format!("{enum_ident}.{v_ident}"), v_ident.span())
        });
        if !seen.insert(tag.value()) {
            return Err(syn::Error::new(
                tag.span(),
                format!("duplicate event type '{}'", tag.value()),
            ));
        }
        let version = overrides.event_version.unwrap_or_else(|| default_version.clone());

        // `{ .. }` 对具名、元组、单元变体都成立
        type_arms.push(quote! { Self::#v_ident { .. } => #tag });
        version_arms.push(quote! { Self::#v_ident { .. } => #version });
        tags.push(tag);
    }

    Ok(quote! {
        #enum_item

        impl ::es_domain::event::DomainEvent for #enum_ident {
            const EVENT_TYPES: &'static [&'static str] = &[ #( #tags ),* ];

            fn event_type(&self) -> &'static str {
                match self { #( #type_arms, )* }
            }

            fn event_version(&self) -> usize {
                match self { #( #version_arms, )* }
            }
        }
    })
}

#[derive(Default)]
struct EnumConfig {
    version: Option<LitInt>,
}

impl Parse for EnumConfig {
    fn parse(input: syn::parse::ParseStream) -> Result<Self> {
        let mut cfg = EnumConfig::default();

        for kv in Punctuated::<KeyValue, Token![,]>::parse_terminated(input)? {
            match kv.key.to_string().as_str() {
                "version" => {
                    if cfg.version.is_some() {
                        return Err(syn::Error::new(kv.key.span(), "duplicate key 'version'"));
                    }
                    cfg.version = Some(kv.int()?);
                }
                _ => {
                    return Err(syn::Error::new(
                        kv.key.span(),
                        "unknown key; expected 'version'",
                    ));
                }
            }
        }

        Ok(cfg)
    }
}

#[derive(Default)]
struct VariantConfig {
    event_type: Option<LitStr>,
    event_version: Option<LitInt>,
}

/// 取出并移除变体上的 `#[event(..)]`，其余属性原样保留
fn take_variant_config(attrs: &mut Vec<syn::Attribute>) -> Result<VariantConfig> {
    let mut cfg = VariantConfig::default();
    let mut retained = Vec::with_capacity(attrs.len());

    for attr in attrs.drain(..) {
        if !attr.path().is_ident("event") {
            retained.push(attr);
            continue;
        }

        let pairs = attr.parse_args_with(Punctuated::<KeyValue, Token![,]>::parse_terminated)?;
        for kv in pairs {
            match kv.key.to_string().as_str() {
                "event_type" => {
                    if cfg.event_type.is_some() {
                        return Err(syn::Error::new(kv.key.span(), "duplicate key 'event_type'"));
                    }
                    let lit = kv.str()?;
                    if lit.value().trim().is_empty() {
                        return Err(syn::Error::new(lit.span(), "'event_type' must not be empty"));
                    }
                    cfg.event_type = Some(lit);
                }
                "event_version" => {
                    if cfg.event_version.is_some() {
                        return Err(syn::Error::new(
                            kv.key.span(),
                            "duplicate key 'event_version'",
                        ));
                    }
                    cfg.event_version = Some(kv.int()?);
                }
                _ => {
                    return Err(syn::Error::new(
                        kv.key.span(),
                        "unknown key; expected 'event_type' | 'event_version'",
                    ));
                }
            }
        }
    }

    *attrs = retained;
    Ok(cfg)
}

struct KeyValue {
    key: Ident,
    value: Expr,
}

impl KeyValue {
    fn str(&self) -> Result<LitStr> {
        match &self.value {
            Expr::Lit(ExprLit {
                lit: Lit::Str(lit), ..
            }) => Ok(lit.clone()),
            other => Err(syn::Error::new(
                other.span(),
                format!("expected string literal for '{}'", self.key),
            )),
        }
    }

    fn int(&self) -> Result<LitInt> {
        match &self.value {
            Expr::Lit(ExprLit {
                lit: Lit::Int(lit), ..
            }) => {
                lit.base10_parse::<usize>()?;
                Ok(lit.clone())
            }
            other => Err(syn::Error::new(
                other.span(),
                format!("expected integer literal for '{}'", self.key),
            )),
        }
    }
}

impl Parse for KeyValue {
    fn parse(input: syn::parse::ParseStream) -> Result<Self> {
        let key: Ident = input.parse()?;
        input.parse::<Token![=]>()?;
        let value: Expr = input.parse()?;
        Ok(Self { key, value })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn expand_str(attr: TokenStream, item: TokenStream) -> String {
        expand(attr, item).unwrap().to_string()
    }

    #[test]
    fn generates_tags_for_every_variant_kind() {
        let out = expand_str(
            quote!(),
            quote! {
                enum NoteEvent {
                    Created { title: String },
                    Tagged(String),
                    Archived,
                }
            },
        );

        assert!(out.contains("\"NoteEvent.Created\""));
        assert!(out.contains("\"NoteEvent.Tagged\""));
        assert!(out.contains("\"NoteEvent.Archived\""));
        assert!(out.contains("EVENT_TYPES"));
    }

    #[test]
    fn variant_overrides_are_consumed() {
        let out = expand_str(
            quote!(version = 3),
            quote! {
                enum NoteEvent {
                    #[event(event_type = "note.created", event_version = 7)]
                    Created,
                    Deleted,
                }
            },
        );

        assert!(out.contains("\"note.created\""));
        assert!(out.contains("=> 7"));
        assert!(out.contains("=> 3"));
        assert!(!out.contains("# [event"));
    }

    #[test]
    fn rejects_duplicate_tags() {
        let err = expand(
            quote!(),
            quote! {
                enum NoteEvent {
                    #[event(event_type = "dup")]
                    A,
                    #[event(event_type = "dup")]
                    B,
                }
            },
        )
        .unwrap_err();
        assert!(err.to_string().contains("duplicate event type"));
    }

    #[test]
    fn rejects_structs_and_unknown_keys() {
        assert!(expand(quote!(), quote!(struct NotAnEnum;)).is_err());
        assert!(expand(quote!(id = String), quote!(enum E { A })).is_err());
    }
}
