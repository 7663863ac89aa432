//! # Component Macros
//!
//! 为组件契约生成拦截代理的过程宏。
//!
//! ## 核心宏
//!
//! - [`interceptable`] - 为 trait 生成转发到调用处理器的代理
//!
//! ## 使用示例
//!
//! ```rust,ignore
//! use component_macros::interceptable;
//!
//! #[interceptable]
//! pub trait Greeter {
//!     #[tag(polite)]
//!     fn greet(&self, name: String) -> Result<String, GreetError>;
//! }
//! ```

use proc_macro::TokenStream;
use syn::{parse_macro_input, ItemTrait};

mod interceptable;
mod utils;

/// 可拦截契约宏
///
/// 为 trait 生成一个代理类型，并为 `dyn Trait` 实现 `sprig_common::ProxyContract`，
/// 使实现了该 trait 的组件可以被 `InvocationHandler` 拦截。
///
/// # 约束
///
/// - 方法必须以 `&self` 为接收者，且不带泛型参数
/// - 参数必须是拥有所有权的类型，并以标识符命名
/// - 返回类型必须写成 `Result<T, E>`，且 `E: From<sprig_common::InvocationError>`
/// - trait 自动获得 `Send + Sync` 约束
///
/// # 方法标签
///
/// `#[tag(a, b)]` 为方法附加标签，处理器通过 `MethodDescriptor::has_tag` 读取。
#[proc_macro_attribute]
pub fn interceptable(args: TokenStream, input: TokenStream) -> TokenStream {
    if !args.is_empty() {
        return syn::Error::new(
            proc_macro2::Span::call_site(),
            "#[interceptable] 不接受参数",
        )
        .to_compile_error()
        .into();
    }
    let item = parse_macro_input!(input as ItemTrait);
    interceptable::interceptable_impl(item)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}
