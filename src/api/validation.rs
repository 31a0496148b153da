//! 请求参数的格式校验
//!
//! 只校验形状（ID 格式、取值范围），不做业务规则判断

use regex::Regex;
use std::sync::OnceLock;
use uuid::Uuid;

use crate::error::{AppError, AppResult, SessionError};

/// 线上协议允许的最大选项序号
pub const MAX_OPTION_ORDER: u8 = 4;

fn attempt_id_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[A-Za-z0-9_-]{1,128}$").expect("attempt id pattern is a valid regex")
    })
}

/// 考试 ID 必须是 UUID
pub fn validate_test_id(test_id: &str) -> AppResult<()> {
    Uuid::parse_str(test_id.trim()).map_err(|_| {
        AppError::Session(SessionError::MalformedTestId {
            test_id: test_id.to_string(),
        })
    })?;
    Ok(())
}

pub fn validate_attempt_id(attempt_id: &str) -> AppResult<()> {
    if attempt_id_pattern().is_match(attempt_id) {
        Ok(())
    } else {
        Err(AppError::Session(SessionError::MalformedAttemptId {
            attempt_id: attempt_id.to_string(),
        }))
    }
}

pub fn validate_option_order(option_order: u8) -> AppResult<()> {
    if (1..=MAX_OPTION_ORDER).contains(&option_order) {
        Ok(())
    } else {
        Err(AppError::invalid_input(
            "optionOrder",
            format!("必须在 1..={} 之间, 实际为 {}", MAX_OPTION_ORDER, option_order),
        ))
    }
}

/// 组卷的题目数量与时长（分钟）都必须为正
pub fn validate_count_and_time(count: u32, time: u32) -> AppResult<()> {
    if count == 0 {
        return Err(AppError::invalid_input("count", "题目数量必须大于 0"));
    }
    if time == 0 {
        return Err(AppError::invalid_input("time", "考试时长必须大于 0"));
    }
    Ok(())
}

pub fn validate_non_empty(field: &str, value: &str) -> AppResult<()> {
    if value.trim().is_empty() {
        Err(AppError::invalid_input(field, "不能为空"))
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_must_be_uuid() {
        assert!(validate_test_id("11111111-1111-1111-1111-111111111111").is_ok());
        let err = validate_test_id("not-a-uuid").unwrap_err();
        assert!(err.is_malformed_id());
    }

    #[test]
    fn attempt_id_format() {
        assert!(validate_attempt_id("A1").is_ok());
        assert!(validate_attempt_id("7f3c_attempt-01").is_ok());
        assert!(validate_attempt_id("").is_err());
        assert!(validate_attempt_id("../state").is_err());
        assert!(validate_attempt_id("a b").is_err());
    }

    #[test]
    fn option_order_range() {
        assert!(validate_option_order(1).is_ok());
        assert!(validate_option_order(4).is_ok());
        assert!(validate_option_order(0).is_err());
        assert!(validate_option_order(5).is_err());
    }

    #[test]
    fn count_and_time_must_be_positive() {
        assert!(validate_count_and_time(20, 30).is_ok());
        assert!(validate_count_and_time(0, 30).is_err());
        assert!(validate_count_and_time(20, 0).is_err());
    }
}
