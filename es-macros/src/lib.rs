//! 事件溯源过程宏（es-macros）
//!
//! 提供 `#[event]`：为事件载荷枚举补齐派生并生成 `::es_domain::event::DomainEvent` 实现。
//!
use proc_macro::TokenStream;

mod domain_event;
mod utils;

/// 事件载荷宏
///
/// - 合并派生 `Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize`
/// - 变体标签默认形如 `Enum.Variant`，`EVENT_TYPES` 列出全部标签
/// - `#[event(version = N)]` 指定默认事件版本（默认 1）
/// - 变体可通过 `#[event(event_type = "...", event_version = N)]` 覆写标签与版本
///
/// ```ignore
/// #[event(version = 1)]
/// enum NoteEvent {
///     Created { title: String },
///     #[event(event_type = "note.renamed", event_version = 2)]
///     Renamed(String),
///     Archived,
/// }
/// ```
#[proc_macro_attribute]
pub fn event(attr: TokenStream, item: TokenStream) -> TokenStream {
    domain_event::expand(attr.into(), item.into())
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}
