use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DwellingKind {
    Cabin,
    Flat,
    House,
}

impl DwellingKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DwellingKind::Cabin => "cabin",
            DwellingKind::Flat => "flat",
            DwellingKind::House => "house",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "cabin" => Some(DwellingKind::Cabin),
            "flat" => Some(DwellingKind::Flat),
            "house" => Some(DwellingKind::House),
            _ => None,
        }
    }
}

impl std::fmt::Display for DwellingKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A leasable dwelling. The site number is unique across all sites.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Site {
    pub number: String,
    pub dwelling: DwellingKind,
}

impl Site {
    pub fn new(number: impl Into<String>, dwelling: DwellingKind) -> Self {
        Self {
            number: number.into(),
            dwelling,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dwelling_kind_roundtrip() {
        for kind in [DwellingKind::Cabin, DwellingKind::Flat, DwellingKind::House] {
            assert_eq!(DwellingKind::from_str(kind.as_str()), Some(kind));
        }
        assert_eq!(DwellingKind::from_str("FLAT"), Some(DwellingKind::Flat));
        assert_eq!(DwellingKind::from_str("castle"), None);
    }
}
