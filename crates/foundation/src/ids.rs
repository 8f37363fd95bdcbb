use serde::{Deserialize, Serialize};

/// Stable identity of a district, neighborhood, city or grid cell.
///
/// Keys correlate overlays across reconciliations, so two results describing
/// the same place must always produce the same key.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SpatialKey(String);

impl SpatialKey {
    pub fn new(raw: impl Into<String>) -> Self {
        SpatialKey(raw.into())
    }

    pub fn city(name: &str) -> Self {
        SpatialKey(format!("city:{name}"))
    }

    pub fn district(gu_name: &str) -> Self {
        SpatialKey(format!("gu:{gu_name}"))
    }

    pub fn neighborhood(dong_id: u32) -> Self {
        SpatialKey(format!("dong:{dong_id}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SpatialKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SpatialKey {
    fn from(raw: &str) -> Self {
        SpatialKey::new(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::SpatialKey;

    #[test]
    fn serializes_as_plain_string() {
        let k = SpatialKey::district("마포구");
        let json = serde_json::to_string(&k).expect("serialize");
        assert_eq!(json, "\"gu:마포구\"");
    }
}
