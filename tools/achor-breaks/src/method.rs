//! Classification methods
//!
//! Numeric codes follow the aChor plugin (`1`–`8`, `71`–`73`) so existing
//! scripts keep working; names are the kebab-case variant names.

use achor_common::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Method {
    /// Local maxima and minima (1)
    LocalExtreme,
    /// Local maxima only (2)
    LocalMax,
    /// Local minima only (3)
    LocalMin,
    /// Getis-Ord hot and cold spots against unlabelled neighbours (4)
    Hotspot,
    /// Strongest neighbour contrasts (5)
    Neighbor,
    /// Boundaries between density clusters (6)
    Cluster,
    /// Global extremes with quantile interior (71)
    GlobalQuantile,
    /// Global extremes with equal-interval interior (72)
    GlobalEqualInterval,
    /// Global extremes with neighbour-contrast interior (73)
    GlobalNeighbor,
    /// Contrasts inside nested groups (8)
    Nested,
}

impl Method {
    pub const ALL: [Method; 10] = [
        Method::LocalExtreme,
        Method::LocalMax,
        Method::LocalMin,
        Method::Hotspot,
        Method::Neighbor,
        Method::Cluster,
        Method::GlobalQuantile,
        Method::GlobalEqualInterval,
        Method::GlobalNeighbor,
        Method::Nested,
    ];

    pub fn code(self) -> u8 {
        match self {
            Method::LocalExtreme => 1,
            Method::LocalMax => 2,
            Method::LocalMin => 3,
            Method::Hotspot => 4,
            Method::Neighbor => 5,
            Method::Cluster => 6,
            Method::GlobalQuantile => 71,
            Method::GlobalEqualInterval => 72,
            Method::GlobalNeighbor => 73,
            Method::Nested => 8,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|m| m.code() == code)
    }

    pub fn name(self) -> &'static str {
        match self {
            Method::LocalExtreme => "local-extreme",
            Method::LocalMax => "local-max",
            Method::LocalMin => "local-min",
            Method::Hotspot => "hotspot",
            Method::Neighbor => "neighbor",
            Method::Cluster => "cluster",
            Method::GlobalQuantile => "global-quantile",
            Method::GlobalEqualInterval => "global-equal-interval",
            Method::GlobalNeighbor => "global-neighbor",
            Method::Nested => "nested",
        }
    }

    /// Methods that read the per-feature category label
    pub fn requires_category(self) -> bool {
        matches!(self, Method::Cluster | Method::Nested)
    }

    /// Methods that read the precomputed Getis-Ord bin
    pub fn requires_hotspot_bins(self) -> bool {
        matches!(self, Method::Hotspot)
    }

    /// Methods producing the two global-extreme breaks
    pub fn is_global(self) -> bool {
        matches!(
            self,
            Method::GlobalQuantile | Method::GlobalEqualInterval | Method::GlobalNeighbor
        )
    }

    /// Smallest class count the method can produce
    pub fn min_classes(self) -> usize {
        if self.is_global() {
            3
        } else {
            2
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name(), self.code())
    }
}

impl FromStr for Method {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if let Ok(code) = s.parse::<u8>() {
            return Method::from_code(code)
                .ok_or_else(|| Error::InvalidInput(format!("unknown method code {code}")));
        }
        let lower = s.to_ascii_lowercase().replace('_', "-");
        Method::ALL
            .into_iter()
            .find(|m| m.name() == lower)
            .ok_or_else(|| {
                let names: Vec<&str> = Method::ALL.iter().map(|m| m.name()).collect();
                Error::InvalidInput(format!(
                    "unknown method '{s}' (expected one of: {})",
                    names.join(", ")
                ))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_round_trip() {
        for method in Method::ALL {
            assert_eq!(Method::from_code(method.code()), Some(method));
        }
        assert_eq!(Method::from_code(7), None);
        assert_eq!(Method::from_code(9), None);
    }

    #[test]
    fn test_parse_names_and_codes() {
        assert_eq!("73".parse::<Method>().unwrap(), Method::GlobalNeighbor);
        assert_eq!("local_max".parse::<Method>().unwrap(), Method::LocalMax);
        assert_eq!("Hotspot".parse::<Method>().unwrap(), Method::Hotspot);
        assert!("74".parse::<Method>().is_err());
        assert!("quantile".parse::<Method>().is_err());
    }

    #[test]
    fn test_serde_kebab_case() {
        let json = serde_json::to_string(&Method::GlobalEqualInterval).unwrap();
        assert_eq!(json, "\"global-equal-interval\"");
        let back: Method = serde_json::from_str("\"local-extreme\"").unwrap();
        assert_eq!(back, Method::LocalExtreme);
    }

    #[test]
    fn test_requirements() {
        assert!(Method::Cluster.requires_category());
        assert!(Method::Nested.requires_category());
        assert!(!Method::GlobalNeighbor.requires_category());
        assert!(Method::Hotspot.requires_hotspot_bins());
        assert_eq!(Method::GlobalQuantile.min_classes(), 3);
        assert_eq!(Method::LocalMin.min_classes(), 2);
    }
}
