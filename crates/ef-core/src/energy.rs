use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::EfError;

/// The form a quantity of energy takes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnergyType {
    /// Heat.
    Thermal,
    /// Current in a wire.
    Electrical,
    /// Motion: falling water, steam, spinning wheels.
    Mechanical,
    /// Radiant energy.
    Light,
    /// Stored in food or fuel.
    Chemical,
    /// Present in the bookkeeping but never drawn.
    Hidden,
}

impl EnergyType {
    /// Every energy type, in declaration order.
    pub const ALL: [EnergyType; 6] = [
        Self::Thermal,
        Self::Electrical,
        Self::Mechanical,
        Self::Light,
        Self::Chemical,
        Self::Hidden,
    ];
}

impl fmt::Display for EnergyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Thermal => write!(f, "thermal"),
            Self::Electrical => write!(f, "electrical"),
            Self::Mechanical => write!(f, "mechanical"),
            Self::Light => write!(f, "light"),
            Self::Chemical => write!(f, "chemical"),
            Self::Hidden => write!(f, "hidden"),
        }
    }
}

impl FromStr for EnergyType {
    type Err = EfError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.to_string().eq_ignore_ascii_case(s))
            .ok_or_else(|| EfError::UnknownEnergyType(s.to_string()))
    }
}

/// A continuous flow of energy of one type, in J/s.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Energy {
    /// The form of the flow.
    pub energy_type: EnergyType,
    /// Flow rate in J/s. Never negative.
    pub rate: f64,
}

impl Energy {
    /// A flow of `rate` J/s; negative rates are clamped to zero.
    pub fn new(energy_type: EnergyType, rate: f64) -> Self {
        Self {
            energy_type,
            rate: rate.max(0.0),
        }
    }

    /// No flow, tagged with a type so meters still know what to label.
    pub fn none(energy_type: EnergyType) -> Self {
        Self {
            energy_type,
            rate: 0.0,
        }
    }

    /// Energy delivered over `dt` seconds.
    pub fn amount(&self, dt: f64) -> f64 {
        self.rate * dt
    }

    /// Whether anything is flowing.
    pub fn is_flowing(&self) -> bool {
        self.rate > 0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn energy_type_round_trips_through_names() {
        for t in EnergyType::ALL {
            assert_eq!(t.to_string().parse::<EnergyType>().unwrap(), t);
        }
        assert_eq!("LIGHT".parse::<EnergyType>().unwrap(), EnergyType::Light);
    }

    #[test]
    fn unknown_energy_type_rejected() {
        let err = "nuclear".parse::<EnergyType>().unwrap_err();
        assert_eq!(err, EfError::UnknownEnergyType("nuclear".into()));
    }

    #[test]
    fn negative_rate_clamps() {
        let e = Energy::new(EnergyType::Mechanical, -5.0);
        assert_eq!(e.rate, 0.0);
        assert!(!e.is_flowing());
    }

    #[test]
    fn amount_scales_with_dt() {
        let e = Energy::new(EnergyType::Electrical, 600.0);
        assert!((e.amount(0.5) - 300.0).abs() < f64::EPSILON);
    }
}
