//! Material categories and their constant tables.

use std::fmt;
use std::str::FromStr;

use ef_core::{EfError, EfResult};
use serde::{Deserialize, Serialize};

/// The material a thermal container is made of.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThermalCategory {
    /// An iron block.
    Iron,
    /// A brick block.
    Brick,
    /// Water in a beaker.
    Water,
    /// Olive oil in a beaker.
    OliveOil,
    /// The surrounding air.
    Air,
}

impl ThermalCategory {
    /// Every category, in declaration order.
    pub const ALL: [ThermalCategory; 5] = [
        Self::Iron,
        Self::Brick,
        Self::Water,
        Self::OliveOil,
        Self::Air,
    ];

    /// Whether this category is the ambient reservoir.
    pub fn is_air(self) -> bool {
        self == Self::Air
    }

    /// Whether this category is a liquid held in a beaker.
    pub fn is_liquid(self) -> bool {
        matches!(self, Self::Water | Self::OliveOil)
    }
}

impl fmt::Display for ThermalCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Iron => write!(f, "iron"),
            Self::Brick => write!(f, "brick"),
            Self::Water => write!(f, "water"),
            Self::OliveOil => write!(f, "olive_oil"),
            Self::Air => write!(f, "air"),
        }
    }
}

impl FromStr for ThermalCategory {
    type Err = EfError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace([' ', '-'], "_");
        Self::ALL
            .into_iter()
            .find(|c| c.to_string() == normalized)
            .ok_or_else(|| EfError::UnknownCategory(s.to_string()))
    }
}

/// Bulk constants for one material.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MaterialProperties {
    /// Specific heat capacity in J/(kg·K).
    pub specific_heat: f64,
    /// Density in kg/m³.
    pub density: f64,
}

impl MaterialProperties {
    const fn new(specific_heat: f64, density: f64) -> Self {
        Self {
            specific_heat,
            density,
        }
    }
}

/// Per-category material constants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThermalProperties {
    /// Iron.
    pub iron: MaterialProperties,
    /// Brick.
    pub brick: MaterialProperties,
    /// Water.
    pub water: MaterialProperties,
    /// Olive oil.
    pub olive_oil: MaterialProperties,
    /// Air. Far denser than real air so that objects cool at a visible pace.
    pub air: MaterialProperties,
}

impl Default for ThermalProperties {
    fn default() -> Self {
        Self {
            iron: MaterialProperties::new(450.0, 7800.0),
            brick: MaterialProperties::new(840.0, 3300.0),
            water: MaterialProperties::new(4186.0, 1000.0),
            olive_oil: MaterialProperties::new(1970.0, 916.0),
            air: MaterialProperties::new(1012.0, 10.0),
        }
    }
}

impl ThermalProperties {
    /// Constants for `category`.
    pub fn get(&self, category: ThermalCategory) -> MaterialProperties {
        match category {
            ThermalCategory::Iron => self.iron,
            ThermalCategory::Brick => self.brick,
            ThermalCategory::Water => self.water,
            ThermalCategory::OliveOil => self.olive_oil,
            ThermalCategory::Air => self.air,
        }
    }

    /// Check every constant is positive and finite.
    pub fn validate(&self) -> EfResult<()> {
        for category in ThermalCategory::ALL {
            let props = self.get(category);
            EfError::ensure_positive("specific heat", props.specific_heat)?;
            EfError::ensure_positive("density", props.density)?;
        }
        Ok(())
    }
}

/// Explicit coefficient for one unordered pair of categories.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PairCoefficient {
    /// One side of the pair.
    pub a: ThermalCategory,
    /// The other side of the pair.
    pub b: ThermalCategory,
    /// Heat transfer coefficient in W/K.
    pub coefficient: f64,
}

/// Heat transfer coefficients between categories, in W/K.
///
/// Looked up symmetrically. Pairs without an explicit entry fall back to
/// `air_coefficient` when either side is air, and `contact_coefficient`
/// otherwise.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeatTransferTable {
    /// Coefficient between two solids or liquids in direct contact.
    pub contact_coefficient: f64,
    /// Coefficient between any body and air.
    pub air_coefficient: f64,
    /// Pair-specific entries that override the fallbacks.
    #[serde(default)]
    pub overrides: Vec<PairCoefficient>,
}

impl Default for HeatTransferTable {
    fn default() -> Self {
        Self {
            contact_coefficient: 1000.0,
            air_coefficient: 50.0,
            overrides: Vec::new(),
        }
    }
}

impl HeatTransferTable {
    /// Add or replace the coefficient for a pair.
    pub fn with_pair(mut self, a: ThermalCategory, b: ThermalCategory, coefficient: f64) -> Self {
        self.overrides
            .retain(|p| !((p.a == a && p.b == b) || (p.a == b && p.b == a)));
        self.overrides.push(PairCoefficient { a, b, coefficient });
        self
    }

    /// Coefficient between `a` and `b`, order-independent.
    pub fn coefficient(&self, a: ThermalCategory, b: ThermalCategory) -> f64 {
        self.overrides
            .iter()
            .find(|p| (p.a == a && p.b == b) || (p.a == b && p.b == a))
            .map(|p| p.coefficient)
            .unwrap_or(if a.is_air() || b.is_air() {
                self.air_coefficient
            } else {
                self.contact_coefficient
            })
    }

    /// Check every coefficient is positive and finite.
    pub fn validate(&self) -> EfResult<()> {
        EfError::ensure_positive("contact heat transfer coefficient", self.contact_coefficient)?;
        EfError::ensure_positive("air heat transfer coefficient", self.air_coefficient)?;
        for pair in &self.overrides {
            EfError::ensure_positive("pair heat transfer coefficient", pair.coefficient)?;
        }
        Ok(())
    }
}
