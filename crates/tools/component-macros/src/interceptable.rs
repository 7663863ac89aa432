//! `#[interceptable]` 宏实现

use proc_macro2::TokenStream;
use quote::{format_ident, quote};
use syn::{parse_quote, FnArg, Ident, ItemTrait, Pat, Result, TraitItem, TraitItemFn, Type};

use crate::utils::{has_supertrait, result_types, take_tags};

/// 解析后的契约方法
struct ProxyMethod {
    signature: TraitItemFn,
    name: Ident,
    tags: Vec<String>,
    args: Vec<(Ident, Type)>,
    ok: Type,
    err: Type,
}

impl ProxyMethod {
    fn parse(method: &mut TraitItemFn) -> Result<Self> {
        let tags = take_tags(&mut method.attrs)?;
        let sig = &method.sig;
        if !sig.generics.params.is_empty() || sig.generics.where_clause.is_some() {
            return Err(syn::Error::new_spanned(&sig.generics, "可拦截方法不能带泛型参数"));
        }
        if let Some(asyncness) = &sig.asyncness {
            return Err(syn::Error::new_spanned(asyncness, "可拦截方法不能是 async 方法"));
        }
        if let Some(variadic) = &sig.variadic {
            return Err(syn::Error::new_spanned(variadic, "可拦截方法不能带可变参数"));
        }

        let mut inputs = sig.inputs.iter();
        match inputs.next() {
            Some(FnArg::Receiver(receiver)) if receiver.reference.is_some() && receiver.mutability.is_none() => {}
            _ => return Err(syn::Error::new_spanned(&sig.ident, "可拦截方法必须以 &self 为接收者")),
        }

        let mut args = Vec::new();
        for input in inputs {
            let FnArg::Typed(typed) = input else {
                return Err(syn::Error::new_spanned(input, "无效的参数"));
            };
            let Pat::Ident(pat) = typed.pat.as_ref() else {
                return Err(syn::Error::new_spanned(&typed.pat, "参数必须以标识符命名"));
            };
            if matches!(typed.ty.as_ref(), Type::Reference(_)) {
                return Err(syn::Error::new_spanned(&typed.ty, "参数必须是拥有所有权的类型"));
            }
            args.push((pat.ident.clone(), typed.ty.as_ref().clone()));
        }

        let (ok, err) = result_types(&sig.output)
            .ok_or_else(|| syn::Error::new_spanned(&sig.output, "返回类型必须写成 Result<T, E>"))?;

        let mut signature = method.clone();
        signature.default = None;
        signature.semi_token = None;
        // 代理方法的参数不保留 mut 等绑定修饰
        for input in &mut signature.sig.inputs {
            if let FnArg::Typed(typed) = input {
                if let Pat::Ident(pat) = typed.pat.as_mut() {
                    pat.mutability = None;
                    pat.by_ref = None;
                }
            }
        }

        Ok(Self {
            name: sig.ident.clone(),
            tags,
            args,
            ok: ok.clone(),
            err: err.clone(),
            signature,
        })
    }

    fn expand(&self, trait_ident: &Ident) -> TokenStream {
        let sig = &self.signature.sig;
        let attrs = self
            .signature
            .attrs
            .iter()
            .filter(|attr| !attr.path().is_ident("doc"));
        let name = &self.name;
        let contract = trait_ident.to_string();
        let method = name.to_string();
        let tags = &self.tags;
        let ok = &self.ok;
        let err = &self.err;
        let arg_names: Vec<&Ident> = self.args.iter().map(|(ident, _)| ident).collect();
        let locals: Vec<Ident> = (0..self.args.len())
            .map(|index| format_ident!("__sprig_arg{}", index))
            .collect();
        let arg_types = self.args.iter().map(|(_, ty)| ty);
        let indexes = 0..self.args.len();
        let arguments = if self.args.is_empty() {
            quote!(_)
        } else {
            quote!(mut __sprig_arguments)
        };

        quote! {
            #(#attrs)*
            #sig {
                const __SPRIG_METHOD: ::sprig_common::MethodDescriptor =
                    ::sprig_common::MethodDescriptor::new(#contract, #method).with_tags(&[#(#tags),*]);
                let __sprig_values: ::std::vec::Vec<::std::boxed::Box<dyn ::std::any::Any + ::std::marker::Send>> =
                    ::std::vec![#(::std::boxed::Box::new(#arg_names)),*];
                let __sprig_proceed = |__sprig_target: &::sprig_common::Instance,
                                       #arguments: ::sprig_common::Arguments|
                 -> ::sprig_common::InvocationResult<::sprig_common::ReturnValue> {
                    let __sprig_contract = __sprig_target.cast::<dyn #trait_ident>().ok_or_else(|| {
                        ::sprig_common::InvocationError::ContractMissing {
                            contract: #contract,
                            actual: ::std::string::ToString::to_string(__sprig_target.type_name()),
                        }
                    })?;
                    #(let #locals = __sprig_arguments.take::<#arg_types>(#indexes)?;)*
                    let __sprig_value = __sprig_contract
                        .#name(#(#locals),*)
                        .map_err(::sprig_common::InvocationError::target)?;
                    ::std::result::Result::Ok(::std::boxed::Box::new(__sprig_value))
                };
                let __sprig_invocation = ::sprig_common::Invocation::new(
                    &self.target,
                    __SPRIG_METHOD,
                    ::sprig_common::Arguments::new(__SPRIG_METHOD, __sprig_values),
                    &__sprig_proceed,
                );
                let __sprig_value = self
                    .handler
                    .invoke(__sprig_invocation)
                    .map_err(::sprig_common::InvocationError::into_error::<#err>)?;
                __sprig_value
                    .downcast::<#ok>()
                    .map(|value| *value)
                    .map_err(|_| {
                        <#err as ::std::convert::From<::sprig_common::InvocationError>>::from(
                            ::sprig_common::InvocationError::ReturnTypeMismatch {
                                method: ::std::string::ToString::to_string(&__SPRIG_METHOD),
                                expected: ::std::any::type_name::<#ok>(),
                            },
                        )
                    })
            }
        }
    }
}

/// 实现 #[interceptable] 宏
pub fn interceptable_impl(mut item: ItemTrait) -> Result<TokenStream> {
    if !item.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(&item.generics, "可拦截契约不能带泛型参数"));
    }
    if !has_supertrait(&item.supertraits, "Send") {
        item.supertraits.push(parse_quote!(::std::marker::Send));
    }
    if !has_supertrait(&item.supertraits, "Sync") {
        item.supertraits.push(parse_quote!(::std::marker::Sync));
    }

    let mut methods = Vec::new();
    for trait_item in &mut item.items {
        match trait_item {
            TraitItem::Fn(method) => methods.push(ProxyMethod::parse(method)?),
            other => return Err(syn::Error::new_spanned(other, "可拦截契约只能包含方法")),
        }
    }

    let trait_ident = &item.ident;
    let proxy_methods = methods.iter().map(|method| method.expand(trait_ident));

    Ok(quote! {
        #item

        const _: () = {
            struct __SprigProxy {
                target: ::sprig_common::Instance,
                handler: ::std::sync::Arc<dyn ::sprig_common::InvocationHandler>,
            }

            impl #trait_ident for __SprigProxy {
                #(#proxy_methods)*
            }

            impl ::sprig_common::ProxyContract for dyn #trait_ident {
                fn create_proxy(
                    target: ::sprig_common::Instance,
                    handler: ::std::sync::Arc<dyn ::sprig_common::InvocationHandler>,
                ) -> ::std::sync::Arc<Self> {
                    ::std::sync::Arc::new(__SprigProxy { target, handler })
                }
            }
        };
    })
}
