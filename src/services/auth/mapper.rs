/*
 * Responsibility
 * - クレーム → モデル属性 の変換 (純粋関数)
 * - マッピング設定 (属性名 → クレーム名) のデフォルトを持つ
 */
use std::collections::BTreeMap;

use serde::Deserialize;

use crate::services::auth::claims::ClaimSet;

/// Attribute-name → claim-name mapping used to project a claim set
/// onto identity attributes. Overridable per deployment via config.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(transparent)]
pub struct ClaimsMapping(BTreeMap<String, String>);

impl ClaimsMapping {
    pub fn new(mapping: BTreeMap<String, String>) -> Self {
        Self(mapping)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(a, c)| (a.as_str(), c.as_str()))
    }
}

impl Default for ClaimsMapping {
    fn default() -> Self {
        let mut mapping = BTreeMap::new();
        mapping.insert("email".to_string(), "email".to_string());
        mapping.insert("name".to_string(), "name".to_string());
        mapping.insert("picture".to_string(), "picture".to_string());
        Self(mapping)
    }
}

/// Project `claims` onto attributes under `mapping`.
///
/// Sparse by design: claims that are absent or empty are skipped, so the
/// result never carries an attribute that would overwrite stored data with
/// nothing. Pure function; identical inputs produce identical outputs.
pub fn transform(claims: &ClaimSet, mapping: &ClaimsMapping) -> BTreeMap<String, String> {
    let mut attributes = BTreeMap::new();

    for (attribute, claim_key) in mapping.iter() {
        if let Some(value) = claims.get_str(claim_key) {
            attributes.insert(attribute.to_string(), value);
        }
    }

    attributes
}
