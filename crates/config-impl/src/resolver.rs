//! 属性解析器实现
//!
//! 属性来源依次为系统环境变量、配置文件与 `config::Environment`、显式给出的属性，
//! 后加入的来源覆盖先加入的来源。属性值支持 `${key}` 与 `${key:default}` 表达式，
//! 并会被递归解析。

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use di_abstractions::ValueResolver;
use serde::de::DeserializeOwned;
use serde_json::Value;
use sprig_common::{FromPropertyValue, PropertyError, PropertyResult, PropertyValue, ValueType};
use tracing::{debug, info};

use crate::convert::convert;

/// 属性表达式
#[derive(Debug, Clone, PartialEq, Eq)]
struct PropertyExpr<'a> {
    key: &'a str,
    default: Option<&'a str>,
}

/// 属性解析器
#[derive(Debug, Clone)]
pub struct PropertyResolver {
    properties: HashMap<String, String>,
    config: config::Config,
}

impl Default for PropertyResolver {
    fn default() -> Self {
        Self::empty()
    }
}

impl PropertyResolver {
    /// 系统环境变量加上给定属性
    pub fn new(properties: HashMap<String, String>) -> Self {
        let mut resolver = Self::from_env();
        resolver.properties.extend(properties);
        resolver
    }

    /// 不含任何属性的解析器
    pub fn empty() -> Self {
        Self {
            properties: HashMap::new(),
            config: config::Config::default(),
        }
    }

    /// 只包含系统环境变量的解析器
    pub fn from_env() -> Self {
        let mut resolver = Self::empty();
        resolver.properties.extend(std::env::vars());
        resolver
    }

    /// 由已构建的 `config::Config` 创建，系统环境变量排在最前
    pub fn from_config(config: config::Config) -> PropertyResult<Self> {
        Self::load(config, true)
    }

    fn load(config: config::Config, system_env: bool) -> PropertyResult<Self> {
        let mut resolver = if system_env { Self::from_env() } else { Self::empty() };
        let tree: Value = config
            .clone()
            .try_deserialize()
            .map_err(PropertyError::from_source)?;
        flatten(None, &tree, &mut resolver.properties);
        resolver.config = config;
        Ok(resolver)
    }

    /// 从单个配置文件加载，格式由扩展名决定
    pub fn from_file(path: impl AsRef<Path>) -> PropertyResult<Self> {
        Self::builder().with_file(path).build()
    }

    /// 创建构建器
    pub fn builder() -> PropertyResolverBuilder {
        PropertyResolverBuilder::default()
    }

    /// 增加或覆盖一个属性
    #[must_use]
    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    /// 是否存在某个键
    pub fn contains_property(&self, key: &str) -> bool {
        self.properties.contains_key(key)
    }

    /// 属性数量
    pub fn len(&self) -> usize {
        self.properties.len()
    }

    /// 是否没有任何属性
    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }

    /// 获取属性，`key` 可以是普通键或 `${...}` 表达式
    ///
    /// 普通键不存在时返回 `None`；没有默认值的表达式引用了不存在的键时返回错误。
    pub fn get_property(&self, key: &str) -> PropertyResult<Option<String>> {
        self.lookup(key, &mut Vec::new())
    }

    /// 获取属性，不存在时使用默认值（默认值本身也会被解析）
    pub fn get_property_or(&self, key: &str, default: &str) -> PropertyResult<String> {
        self.lookup_or(key, default, &mut Vec::new())
    }

    /// 获取必须存在的属性
    pub fn get_required_property(&self, key: &str) -> PropertyResult<String> {
        self.lookup_required(key, &mut Vec::new())
    }

    /// 获取属性并转换为指定类型
    pub fn get_typed(&self, key: &str, value_type: ValueType) -> PropertyResult<Option<PropertyValue>> {
        self.get_property(key)?
            .map(|raw| convert(key, &raw, value_type))
            .transpose()
    }

    /// 获取属性并转换为 `T`
    pub fn get<T: FromPropertyValue>(&self, key: &str) -> PropertyResult<Option<T>> {
        match self.get_typed(key, T::VALUE_TYPE)? {
            Some(value) => extract(key, value).map(Some),
            None => Ok(None),
        }
    }

    /// 获取必须存在的属性并转换为 `T`
    pub fn get_required<T: FromPropertyValue>(&self, key: &str) -> PropertyResult<T> {
        self.get::<T>(key)?.ok_or_else(|| PropertyError::NotFound {
            key: key.to_string(),
        })
    }

    /// 把配置中的某一节反序列化为 `T`
    pub fn bind_section<T: DeserializeOwned>(&self, section: &str) -> PropertyResult<T> {
        debug!("绑定配置节: {} -> {}", section, std::any::type_name::<T>());
        self.config.get::<T>(section).map_err(|e| match e {
            config::ConfigError::NotFound(key) => PropertyError::NotFound { key },
            other => PropertyError::from_source(other),
        })
    }

    // `resolving` 记录正在展开的键，同一个键再次出现即为循环引用
    fn lookup(&self, key: &str, resolving: &mut Vec<String>) -> PropertyResult<Option<String>> {
        if let Some(expr) = parse_expr(key)? {
            return match expr.default {
                Some(default) => self.lookup_or(expr.key, default, resolving).map(Some),
                None => self.lookup_required(expr.key, resolving).map(Some),
            };
        }
        let Some(value) = self.properties.get(key) else {
            return Ok(None);
        };
        if resolving.iter().any(|it| it == key) {
            return Err(PropertyError::CircularReference {
                key: resolving.join(" -> ") + " -> " + key,
            });
        }
        resolving.push(key.to_string());
        let resolved = self.parse_value(value, resolving);
        resolving.pop();
        resolved.map(Some)
    }

    fn lookup_or(&self, key: &str, default: &str, resolving: &mut Vec<String>) -> PropertyResult<String> {
        match self.lookup(key, resolving)? {
            Some(value) => Ok(value),
            None => self.parse_value(default, resolving),
        }
    }

    fn lookup_required(&self, key: &str, resolving: &mut Vec<String>) -> PropertyResult<String> {
        self.lookup(key, resolving)?.ok_or_else(|| PropertyError::NotFound {
            key: key.to_string(),
        })
    }

    fn parse_value(&self, value: &str, resolving: &mut Vec<String>) -> PropertyResult<String> {
        match parse_expr(value)? {
            None => Ok(value.to_string()),
            Some(PropertyExpr {
                key,
                default: Some(default),
            }) => self.lookup_or(key, default, resolving),
            Some(PropertyExpr { key, default: None }) => self.lookup_required(key, resolving),
        }
    }
}

impl ValueResolver for PropertyResolver {
    fn resolve(&self, expression: &str, value_type: ValueType) -> PropertyResult<Option<PropertyValue>> {
        self.get_typed(expression, value_type)
    }
}

/// [`PropertyResolver`] 构建器
#[derive(Debug, Clone)]
pub struct PropertyResolverBuilder {
    system_env: bool,
    files: Vec<(PathBuf, bool)>,
    env_prefix: Option<String>,
    overrides: Vec<(String, String)>,
}

impl Default for PropertyResolverBuilder {
    fn default() -> Self {
        Self {
            system_env: true,
            files: Vec::new(),
            env_prefix: None,
            overrides: Vec::new(),
        }
    }
}

impl PropertyResolverBuilder {
    /// 是否加载系统环境变量（原样保留键名）
    #[must_use]
    pub fn with_system_env(mut self, enabled: bool) -> Self {
        self.system_env = enabled;
        self
    }

    /// 增加必须存在的配置文件
    #[must_use]
    pub fn with_file(mut self, path: impl AsRef<Path>) -> Self {
        self.files.push((path.as_ref().to_path_buf(), true));
        self
    }

    /// 增加可选的配置文件
    #[must_use]
    pub fn with_optional_file(mut self, path: impl AsRef<Path>) -> Self {
        self.files.push((path.as_ref().to_path_buf(), false));
        self
    }

    /// 加载带前缀的环境变量，`PREFIX_SERVER_PORT` 对应 `server.port`
    #[must_use]
    pub fn with_env_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.env_prefix = Some(prefix.into());
        self
    }

    /// 增加显式属性，优先级最高
    #[must_use]
    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.overrides.push((key.into(), value.into()));
        self
    }

    /// 构建解析器
    pub fn build(self) -> PropertyResult<PropertyResolver> {
        let mut builder = config::Config::builder();
        for (path, required) in &self.files {
            debug!("加载配置文件: {}", path.display());
            builder = builder.add_source(config::File::from(path.as_path()).required(*required));
        }
        if let Some(prefix) = &self.env_prefix {
            builder = builder.add_source(config::Environment::with_prefix(prefix).separator("_"));
        }
        for (key, value) in &self.overrides {
            builder = builder
                .set_override(key.as_str(), value.as_str())
                .map_err(PropertyError::from_source)?;
        }
        let config = builder.build().map_err(PropertyError::from_source)?;

        let mut resolver = PropertyResolver::load(config, self.system_env)?;
        // 显式属性保持原样，不经过 config 的键名处理
        resolver.properties.extend(self.overrides);
        info!("属性解析器已就绪, 共 {} 个属性", resolver.len());
        Ok(resolver)
    }
}

fn parse_expr(key: &str) -> PropertyResult<Option<PropertyExpr<'_>>> {
    let Some(body) = key.strip_prefix("${").and_then(|rest| rest.strip_suffix('}')) else {
        return Ok(None);
    };
    let expr = match body.split_once(':') {
        Some((name, default)) => PropertyExpr {
            key: not_empty(name, key)?,
            default: Some(default),
        },
        None => PropertyExpr {
            key: not_empty(body, key)?,
            default: None,
        },
    };
    Ok(Some(expr))
}

fn not_empty<'a>(name: &'a str, expression: &str) -> PropertyResult<&'a str> {
    if name.is_empty() {
        return Err(PropertyError::InvalidKey {
            key: expression.to_string(),
        });
    }
    Ok(name)
}

fn extract<T: FromPropertyValue>(key: &str, value: PropertyValue) -> PropertyResult<T> {
    let found = format!("{value:?}");
    T::from_property(value).ok_or_else(|| PropertyError::Conversion {
        key: key.to_string(),
        value: found,
        target: T::VALUE_TYPE.to_string(),
    })
}

/// 把嵌套配置展开为以 `.` 连接的键，数组元素使用 `key[i]`
fn flatten(prefix: Option<&str>, value: &Value, out: &mut HashMap<String, String>) {
    match value {
        Value::Object(map) => {
            for (name, child) in map {
                let key = prefix.map_or_else(|| name.clone(), |prefix| format!("{prefix}.{name}"));
                flatten(Some(&key), child, out);
            }
        }
        Value::Array(items) => {
            let prefix = prefix.unwrap_or_default();
            for (index, child) in items.iter().enumerate() {
                flatten(Some(&format!("{prefix}[{index}]")), child, out);
            }
        }
        Value::Null => {}
        Value::String(text) => {
            if let Some(prefix) = prefix {
                out.insert(prefix.to_string(), text.clone());
            }
        }
        other => {
            if let Some(prefix) = prefix {
                out.insert(prefix.to_string(), other.to_string());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::time::Duration;

    fn resolver() -> PropertyResolver {
        PropertyResolver::empty()
            .with_property("app.title", "Sprig")
            .with_property("app.version", "v1.0")
            .with_property("app.alias", "${app.title}")
            .with_property("server.port", "8080")
            .with_property("jdbc.timeout", "PT15S")
    }

    #[test]
    fn plain_keys_and_missing_keys() {
        let resolver = resolver();
        assert_eq!(resolver.get_property("app.title").expect("ok"), Some("Sprig".to_string()));
        assert_eq!(resolver.get_property("app.missing").expect("ok"), None);
        assert!(matches!(
            resolver.get_required_property("app.missing"),
            Err(PropertyError::NotFound { .. })
        ));
    }

    #[test]
    fn expressions_with_defaults() {
        let resolver = resolver();
        assert_eq!(resolver.get_property("${app.title}").expect("ok").as_deref(), Some("Sprig"));
        assert_eq!(
            resolver.get_property("${app.missing:fallback}").expect("ok").as_deref(),
            Some("fallback")
        );
        assert_eq!(
            resolver.get_property("${app.missing:${app.version}}").expect("ok").as_deref(),
            Some("v1.0")
        );
        assert!(matches!(
            resolver.get_property("${app.missing}"),
            Err(PropertyError::NotFound { .. })
        ));
    }

    #[test]
    fn values_are_resolved_recursively() {
        assert_eq!(resolver().get_property("app.alias").expect("ok").as_deref(), Some("Sprig"));
    }

    #[test]
    fn circular_references_are_reported() {
        let resolver = resolver()
            .with_property("loop.a", "${loop.b}")
            .with_property("loop.b", "${loop.c:x}")
            .with_property("loop.c", "${loop.a}")
            .with_property("loop.self", "${loop.self}");
        assert!(matches!(
            resolver.get_property("loop.a"),
            Err(PropertyError::CircularReference { .. })
        ));
        assert!(matches!(
            resolver.get_property_or("${loop.self}", "fallback"),
            Err(PropertyError::CircularReference { .. })
        ));
        assert!(matches!(
            resolver.get_required_property("loop.c"),
            Err(PropertyError::CircularReference { .. })
        ));
        assert_eq!(resolver.get_property("app.alias").expect("ok").as_deref(), Some("Sprig"));
    }

    #[test]
    fn empty_key_is_rejected() {
        assert!(matches!(
            resolver().get_property("${}"),
            Err(PropertyError::InvalidKey { .. })
        ));
        assert!(matches!(
            resolver().get_property("${:default}"),
            Err(PropertyError::InvalidKey { .. })
        ));
    }

    #[test]
    fn typed_lookup() {
        let resolver = resolver();
        assert_eq!(resolver.get::<i32>("server.port").expect("ok"), Some(8080));
        assert_eq!(resolver.get::<u16>("${server.port}").expect("ok"), Some(8080));
        assert_eq!(
            resolver.get_required::<Duration>("jdbc.timeout").expect("ok"),
            Duration::from_secs(15)
        );
        assert!(resolver.get::<i32>("app.title").is_err());
    }

    #[test]
    fn value_resolver_contract() {
        let resolver = resolver();
        assert_eq!(
            resolver.resolve_required("${server.port:80}", ValueType::I64).expect("ok"),
            PropertyValue::I64(8080)
        );
        assert!(resolver.resolve("app.missing", ValueType::String).expect("ok").is_none());
    }

    #[test]
    fn loads_toml_and_binds_sections() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().expect("temp file");
        writeln!(
            file,
            "[app]\ntitle = \"from-file\"\nports = [80, 443]\n\n[container]\nscan_packages = [\"app.service\"]\ninstall_global = true"
        )
        .expect("write");

        let resolver = PropertyResolver::builder()
            .with_system_env(false)
            .with_file(file.path())
            .with_property("app.version", "v2")
            .build()
            .expect("resolver");

        assert_eq!(resolver.get_property("app.title").expect("ok").as_deref(), Some("from-file"));
        assert_eq!(resolver.get_property("app.ports[1]").expect("ok").as_deref(), Some("443"));
        assert_eq!(resolver.get_property("app.version").expect("ok").as_deref(), Some("v2"));

        #[derive(Debug, serde::Deserialize)]
        struct Container {
            scan_packages: Vec<String>,
            install_global: bool,
        }
        let section: Container = resolver.bind_section("container").expect("section");
        assert_eq!(section.scan_packages, ["app.service"]);
        assert!(section.install_global);
        assert!(matches!(
            resolver.bind_section::<Container>("missing"),
            Err(PropertyError::NotFound { .. })
        ));
    }

    #[test]
    fn missing_required_file_fails() {
        let result = PropertyResolver::builder()
            .with_system_env(false)
            .with_file("/nonexistent/sprig-app.toml")
            .build();
        assert!(matches!(result, Err(PropertyError::Source { .. })));
    }
}
