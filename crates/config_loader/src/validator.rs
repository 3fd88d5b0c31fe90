//! 配置校验模块
//!
//! 校验规则：
//! - concurrency >= 1
//! - save_roots 必须为绝对路径且不重复
//! - max_identifier_len >= 1
//! - default_extension 形如 '.ext'（'.' 后仅字母数字）

use std::collections::HashSet;

use contracts::{ContractError, ServiceConfig};

/// 校验 ServiceConfig 配置
///
/// 返回第一个遇到的错误，或 Ok(())。
pub fn validate(config: &ServiceConfig) -> Result<(), ContractError> {
    validate_concurrency(config)?;
    validate_save_roots(config)?;
    validate_intake(config)?;
    Ok(())
}

/// 非致命问题（不会拒绝配置）
pub fn warnings(config: &ServiceConfig) -> Vec<String> {
    let mut warnings = Vec::new();
    if config.store.save_roots.is_empty() {
        warnings.push("store.save_roots is empty - jobs will succeed without writing".to_string());
    }
    warnings
}

fn validate_concurrency(config: &ServiceConfig) -> Result<(), ContractError> {
    if config.store.concurrency == 0 {
        return Err(ContractError::config_validation(
            "store.concurrency",
            "concurrency must be >= 1",
        ));
    }
    Ok(())
}

/// 校验保存根目录
fn validate_save_roots(config: &ServiceConfig) -> Result<(), ContractError> {
    let mut seen = HashSet::new();
    for (idx, root) in config.store.save_roots.iter().enumerate() {
        if !root.is_absolute() {
            return Err(ContractError::config_validation(
                format!("store.save_roots[{idx}]"),
                format!("save root must be absolute, got '{}'", root.display()),
            ));
        }
        if !seen.insert(root) {
            return Err(ContractError::config_validation(
                format!("store.save_roots[{idx}]"),
                format!("duplicate save root '{}'", root.display()),
            ));
        }
    }
    Ok(())
}

fn validate_intake(config: &ServiceConfig) -> Result<(), ContractError> {
    let intake = &config.intake;
    if intake.max_identifier_len == 0 {
        return Err(ContractError::config_validation(
            "intake.max_identifier_len",
            "max_identifier_len must be >= 1",
        ));
    }
    if !is_plain_extension(&intake.default_extension) {
        return Err(ContractError::config_validation(
            "intake.default_extension",
            format!(
                "default_extension must be '.' followed by ASCII letters or digits, got '{}'",
                intake.default_extension
            ),
        ));
    }
    Ok(())
}

/// `.` followed by one or more ASCII alphanumerics
fn is_plain_extension(ext: &str) -> bool {
    ext.strip_prefix('.')
        .is_some_and(|rest| !rest.is_empty() && rest.chars().all(|c| c.is_ascii_alphanumeric()))
}
