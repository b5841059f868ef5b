/*
 * Responsibility
 * - Verifier が返す「検証済みクレーム」の型 (ClaimSet)
 * - クレーム値の文字列化 (stringify) ルールをここに集約する
 */
use serde::Deserialize;
use serde_json::Value;

/// Validated claims decoded from an identity token.
///
/// The shape is whatever the issuer put in the token; we treat it as an
/// opaque mapping and never mutate it after verification.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(transparent)]
pub struct ClaimSet(serde_json::Map<String, Value>);

impl ClaimSet {
    pub fn new(claims: serde_json::Map<String, Value>) -> Self {
        Self(claims)
    }

    /// Claim value as a string, or `None` when absent/empty.
    ///
    /// Numbers and booleans are rendered with their canonical text form;
    /// nested structures fall back to compact JSON.
    pub fn get_str(&self, key: &str) -> Option<String> {
        self.0.get(key).and_then(stringify)
    }
}

impl FromIterator<(String, Value)> for ClaimSet {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

// Empty strings and nulls count as "not present" so they never
// overwrite a stored attribute with nothing.
fn stringify(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if s.is_empty() => None,
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Object(_) | Value::Array(_) => Some(value.to_string()),
        Value::Null => None,
    }
}
