//! 组件扫描器抽象接口
//!
//! 提供按包路径发现候选类型名称的能力

use std::collections::BTreeSet;

use sprig_common::ContainerResult;

/// 组件扫描器 trait
///
/// 用于收集某个包（含子包）下的全部候选类型名称
pub trait ComponentScanner: Send + Sync {
    /// 扫描指定包中的类型名称
    fn scan(&self, package: &str) -> ContainerResult<BTreeSet<String>>;

    /// 获取扫描器名称
    fn name(&self) -> &str;

    /// 检查是否支持指定的扫描目标
    fn supports(&self, _package: &str) -> bool {
        true
    }
}
