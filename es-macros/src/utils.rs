use quote::ToTokens;
use std::collections::HashSet;
use syn::{Attribute, Path, Token, punctuated::Punctuated};

/// 把 `required` 合并进已有的 `#[derive(..)]`：
/// 所有 derive 属性折叠为一个并置于最前，required 在前、用户自定义在后，按名称去重。
pub(crate) fn apply_derives(attrs: &mut Vec<Attribute>, required: Vec<Path>) -> syn::Result<()> {
    let mut derives = required;
    let mut others = Vec::with_capacity(attrs.len());

    for attr in attrs.drain(..) {
        if attr.path().is_ident("derive") {
            let listed = attr.parse_args_with(Punctuated::<Path, Token![,]>::parse_terminated)?;
            derives.extend(listed);
        } else {
            others.push(attr);
        }
    }

    let mut seen = HashSet::new();
    derives.retain(|path| seen.insert(derive_key(path)));

    attrs.push(syn::parse_quote!(#[derive(#(#derives),*)]));
    attrs.extend(others);
    Ok(())
}

// `Serialize` 与 `serde::Serialize` 视为同一个 derive
fn derive_key(path: &Path) -> String {
    match path.segments.last() {
        Some(last) => last.ident.to_string(),
        None => path.to_token_stream().to_string(),
    }
}
