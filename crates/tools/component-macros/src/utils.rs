//! 宏工具函数

use syn::{
    punctuated::Punctuated, Attribute, GenericArgument, Ident, PathArguments, Result, ReturnType,
    Token, Type, TypeParamBound,
};

/// 方法标签属性名
const TAG_ATTRIBUTE: &str = "tag";

/// 拆出 `Result<T, E>` 的成功类型和错误类型
pub fn result_types(output: &ReturnType) -> Option<(&Type, &Type)> {
    let ReturnType::Type(_, ty) = output else {
        return None;
    };
    let Type::Path(type_path) = ty.as_ref() else {
        return None;
    };
    let segment = type_path.path.segments.last()?;
    if segment.ident != "Result" {
        return None;
    }
    let PathArguments::AngleBracketed(args) = &segment.arguments else {
        return None;
    };
    let mut types = args.args.iter().filter_map(|arg| match arg {
        GenericArgument::Type(ty) => Some(ty),
        _ => None,
    });
    match (types.next(), types.next(), types.next()) {
        (Some(ok), Some(err), None) => Some((ok, err)),
        _ => None,
    }
}

/// 取出并移除方法上的 `#[tag(..)]` 属性
pub fn take_tags(attrs: &mut Vec<Attribute>) -> Result<Vec<String>> {
    let mut tags = Vec::new();
    let mut kept = Vec::with_capacity(attrs.len());
    for attr in attrs.drain(..) {
        if attr.path().is_ident(TAG_ATTRIBUTE) {
            let idents = attr.parse_args_with(Punctuated::<Ident, Token![,]>::parse_terminated)?;
            tags.extend(idents.iter().map(ToString::to_string));
        } else {
            kept.push(attr);
        }
    }
    *attrs = kept;
    Ok(tags)
}

/// trait 的父约束中是否已有某个 trait
pub fn has_supertrait(supertraits: &Punctuated<TypeParamBound, Token![+]>, name: &str) -> bool {
    supertraits.iter().any(|bound| match bound {
        TypeParamBound::Trait(bound) => bound
            .path
            .segments
            .last()
            .map_or(false, |segment| segment.ident == name),
        _ => false,
    })
}
