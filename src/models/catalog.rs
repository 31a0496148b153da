//! 题库目录相关的数据结构（科目、章节、建卷）

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// 科目
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subject {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub code: String,
    /// 年级，例如 "11" / "12"
    #[serde(default, deserialize_with = "deserialize_standard")]
    pub standard: String,
}

/// 章节
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chapter {
    pub id: String,
    pub name: String,
}

/// 题目列表查询条件，字段为空时不附加到 query string
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chapter_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub standard: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
}

/// 整卷类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TestType {
    /// 物理 + 化学 + 数学
    #[serde(rename = "PCM")]
    Pcm,
    /// 物理 + 化学 + 生物
    #[serde(rename = "PCB")]
    Pcb,
}

impl TestType {
    pub fn code(self) -> &'static str {
        match self {
            TestType::Pcm => "PCM",
            TestType::Pcb => "PCB",
        }
    }
}

impl FromStr for TestType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "PCM" => Ok(TestType::Pcm),
            "PCB" => Ok(TestType::Pcb),
            other => Err(format!("未知的整卷类型: {}", other)),
        }
    }
}

impl fmt::Display for TestType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTestResponse {
    pub test_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartAttemptResponse {
    pub attempt_id: String,
}

// standard 可能是字符串也可能是数字
fn deserialize_standard<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de::Visitor;

    struct StandardVisitor;

    impl<'de> Visitor<'de> for StandardVisitor {
        type Value = String;

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            formatter.write_str("a string or integer representing a standard")
        }

        fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            Ok(value.to_string())
        }

        fn visit_i64<E>(self, value: i64) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            Ok(value.to_string())
        }

        fn visit_u64<E>(self, value: u64) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            Ok(value.to_string())
        }

        fn visit_unit<E>(self) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            Ok(String::new())
        }
    }

    deserializer.deserialize_any(StandardVisitor)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn subject_accepts_numeric_standard() {
        let subject: Subject = serde_json::from_value(json!({
            "id": "s1",
            "name": "Physics",
            "code": "PHY",
            "standard": 12
        }))
        .unwrap();
        assert_eq!(subject.standard, "12");
    }

    #[test]
    fn test_type_serializes_upper_case() {
        assert_eq!(serde_json::to_value(TestType::Pcb).unwrap(), json!("PCB"));
        assert_eq!("pcm".parse::<TestType>().unwrap(), TestType::Pcm);
        assert!("PCX".parse::<TestType>().is_err());
    }

    #[test]
    fn empty_query_has_no_params() {
        let query = QuestionQuery::default();
        assert_eq!(serde_json::to_value(&query).unwrap(), json!({}));
    }
}
