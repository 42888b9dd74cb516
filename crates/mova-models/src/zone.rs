//! Hot-zone labels and per-zone energy shares.
//!
//! The frame is split into a 3×3 grid of thirds. Labels read row then
//! column: `t`/`m`/`b` for top/middle/bottom, `l`/`c`/`r` for
//! left/centre/right.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::ModelError;

/// One of the nine fixed regions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ZoneLabel {
    Tl,
    Tc,
    Tr,
    Ml,
    Mc,
    Mr,
    Bl,
    Bc,
    Br,
}

impl ZoneLabel {
    /// All labels in row-major order.
    pub const ALL: [ZoneLabel; 9] = [
        ZoneLabel::Tl,
        ZoneLabel::Tc,
        ZoneLabel::Tr,
        ZoneLabel::Ml,
        ZoneLabel::Mc,
        ZoneLabel::Mr,
        ZoneLabel::Bl,
        ZoneLabel::Bc,
        ZoneLabel::Br,
    ];

    /// Label for a grid cell (`row`, `col` in 0..3).
    pub fn from_grid(row: usize, col: usize) -> Option<Self> {
        if row > 2 || col > 2 {
            return None;
        }
        Some(Self::ALL[row * 3 + col])
    }

    /// Grid position as (row, col).
    pub fn grid_position(&self) -> (usize, usize) {
        let index = *self as usize;
        (index / 3, index % 3)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ZoneLabel::Tl => "tl",
            ZoneLabel::Tc => "tc",
            ZoneLabel::Tr => "tr",
            ZoneLabel::Ml => "ml",
            ZoneLabel::Mc => "mc",
            ZoneLabel::Mr => "mr",
            ZoneLabel::Bl => "bl",
            ZoneLabel::Bc => "bc",
            ZoneLabel::Br => "br",
        }
    }
}

impl std::fmt::Display for ZoneLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ZoneLabel {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ZoneLabel::ALL
            .iter()
            .copied()
            .find(|label| label.as_str() == s)
            .ok_or_else(|| ModelError::UnknownZone(s.to_string()))
    }
}

/// Percentage of energy per zone.
///
/// Shares sum to 100 (up to rounding) when any energy was present, and are
/// all exactly zero otherwise.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ZoneSnapshot {
    pub tl: f64,
    pub tc: f64,
    pub tr: f64,
    pub ml: f64,
    pub mc: f64,
    pub mr: f64,
    pub bl: f64,
    pub bc: f64,
    pub br: f64,
}

impl ZoneSnapshot {
    pub fn get(&self, label: ZoneLabel) -> f64 {
        match label {
            ZoneLabel::Tl => self.tl,
            ZoneLabel::Tc => self.tc,
            ZoneLabel::Tr => self.tr,
            ZoneLabel::Ml => self.ml,
            ZoneLabel::Mc => self.mc,
            ZoneLabel::Mr => self.mr,
            ZoneLabel::Bl => self.bl,
            ZoneLabel::Bc => self.bc,
            ZoneLabel::Br => self.br,
        }
    }

    pub fn set(&mut self, label: ZoneLabel, value: f64) {
        let slot = match label {
            ZoneLabel::Tl => &mut self.tl,
            ZoneLabel::Tc => &mut self.tc,
            ZoneLabel::Tr => &mut self.tr,
            ZoneLabel::Ml => &mut self.ml,
            ZoneLabel::Mc => &mut self.mc,
            ZoneLabel::Mr => &mut self.mr,
            ZoneLabel::Bl => &mut self.bl,
            ZoneLabel::Bc => &mut self.bc,
            ZoneLabel::Br => &mut self.br,
        };
        *slot = value;
    }

    /// Iterate `(label, share)` in row-major order.
    pub fn iter(&self) -> impl Iterator<Item = (ZoneLabel, f64)> + '_ {
        ZoneLabel::ALL.iter().map(move |&label| (label, self.get(label)))
    }

    /// Sum of all shares.
    pub fn total(&self) -> f64 {
        self.iter().map(|(_, share)| share).sum()
    }

    /// Zone with the largest share; the first in row-major order wins ties.
    /// `None` when every share is zero.
    pub fn hottest(&self) -> Option<ZoneLabel> {
        let mut best: Option<(ZoneLabel, f64)> = None;
        for (label, share) in self.iter() {
            if share > best.map_or(0.0, |(_, s)| s) {
                best = Some((label, share));
            }
        }
        best.map(|(label, _)| label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_labels_round_trip_through_grid() {
        for label in ZoneLabel::ALL {
            let (row, col) = label.grid_position();
            assert_eq!(ZoneLabel::from_grid(row, col), Some(label));
        }
        assert_eq!(ZoneLabel::from_grid(3, 0), None);
    }

    #[test]
    fn test_parse_label() {
        assert_eq!("mc".parse::<ZoneLabel>().unwrap(), ZoneLabel::Mc);
        assert!("xx".parse::<ZoneLabel>().is_err());
    }

    #[test]
    fn test_snapshot_serializes_flat_keys() {
        let mut snapshot = ZoneSnapshot::default();
        snapshot.set(ZoneLabel::Br, 100.0);
        let value = serde_json::to_value(snapshot).unwrap();
        assert_eq!(value["br"], 100.0);
        assert_eq!(value["tl"], 0.0);
        assert_eq!(value.as_object().unwrap().len(), 9);
    }

    #[test]
    fn test_hottest() {
        let mut snapshot = ZoneSnapshot::default();
        assert_eq!(snapshot.hottest(), None);
        snapshot.set(ZoneLabel::Ml, 40.0);
        snapshot.set(ZoneLabel::Bc, 60.0);
        assert_eq!(snapshot.hottest(), Some(ZoneLabel::Bc));
        assert!((snapshot.total() - 100.0).abs() < 1e-9);
    }
}
