//! Pairwise heat exchange between containers in contact.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::category::HeatTransferTable;
use crate::container::{ContainerId, ThermalEnergyContainer};

/// Two containers in thermal contact. Order is irrelevant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContactPair {
    /// One side.
    pub a: ContainerId,
    /// The other side.
    pub b: ContainerId,
}

impl ContactPair {
    /// A contact between `a` and `b`.
    pub fn new(a: ContainerId, b: ContainerId) -> Self {
        Self { a, b }
    }

    fn key(&self) -> (ContainerId, ContainerId) {
        if self.a.0 <= self.b.0 {
            (self.a, self.b)
        } else {
            (self.b, self.a)
        }
    }
}

/// One exchange applied during a step.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HeatTransfer {
    /// The warmer side, which lost energy.
    pub from: ContainerId,
    /// The cooler side, which gained energy.
    pub to: ContainerId,
    /// Energy moved, in J.
    pub amount: f64,
}

/// What one equilibration step did.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EquilibrationReport {
    /// Every non-zero exchange, in the order applied.
    pub transfers: Vec<HeatTransfer>,
    /// Net energy gained by non-air containers from the air reservoir, in J.
    pub ambient_exchange: f64,
}

impl EquilibrationReport {
    /// Total energy moved between containers, ignoring direction.
    pub fn total_moved(&self) -> f64 {
        self.transfers.iter().map(|t| t.amount).sum()
    }
}

/// Every pair of non-air containers whose bounds overlap.
pub fn detect_contacts(containers: &[ThermalEnergyContainer]) -> Vec<ContactPair> {
    let mut pairs = Vec::new();
    for (i, a) in containers.iter().enumerate() {
        if a.category().is_air() {
            continue;
        }
        for b in &containers[i + 1..] {
            if !b.category().is_air() && a.bounds().intersects(&b.bounds()) {
                pairs.push(ContactPair::new(a.id(), b.id()));
            }
        }
    }
    pairs
}

/// Exchanges heat across every contact once per tick.
#[derive(Debug, Clone)]
pub struct ThermalEquilibrationStepper {
    table: HeatTransferTable,
    ambient_exchange: bool,
}

struct PlannedTransfer {
    from: usize,
    to: usize,
    amount: f64,
    /// Temperature the pair would share if equalized on its own.
    meeting: f64,
}

/// Scale planned transfers so that no body moves past the meeting
/// temperature of any pair it takes part in.
///
/// Outflows alone must leave a body no colder than its highest meeting
/// point with a colder partner, and inflows alone no warmer than its lowest
/// meeting point with a warmer one. Each transfer takes the smaller of its
/// two endpoint factors. Air is never limited.
fn limit_overshoot(
    plan: &mut [PlannedTransfer],
    temperatures: &[f64],
    capacities: &[f64],
    is_air: &[bool],
) {
    let n = temperatures.len();
    let mut outflow = vec![0.0; n];
    let mut inflow = vec![0.0; n];
    let mut floor = vec![f64::NEG_INFINITY; n];
    let mut ceiling = vec![f64::INFINITY; n];
    for t in plan.iter() {
        outflow[t.from] += t.amount;
        inflow[t.to] += t.amount;
        floor[t.from] = floor[t.from].max(t.meeting);
        ceiling[t.to] = ceiling[t.to].min(t.meeting);
    }

    let factor = |total: f64, room: f64, air: bool| {
        if air || total <= 0.0 {
            1.0
        } else {
            (room.max(0.0) / total).min(1.0)
        }
    };
    let out_factor: Vec<f64> = (0..n)
        .map(|i| {
            factor(
                outflow[i],
                capacities[i] * (temperatures[i] - floor[i]),
                is_air[i],
            )
        })
        .collect();
    let in_factor: Vec<f64> = (0..n)
        .map(|i| {
            factor(
                inflow[i],
                capacities[i] * (ceiling[i] - temperatures[i]),
                is_air[i],
            )
        })
        .collect();

    for t in plan.iter_mut() {
        t.amount *= out_factor[t.from].min(in_factor[t.to]);
    }
}

impl ThermalEquilibrationStepper {
    /// A stepper using `table` for coefficients, with ambient exchange enabled.
    pub fn new(table: HeatTransferTable) -> Self {
        Self {
            table,
            ambient_exchange: true,
        }
    }

    /// Enable or disable the implicit contact between every body and the air.
    pub fn with_ambient_exchange(mut self, enabled: bool) -> Self {
        self.ambient_exchange = enabled;
        self
    }

    /// The coefficient table in use.
    pub fn table(&self) -> &HeatTransferTable {
        &self.table
    }

    /// Exchange heat across `contacts` for `dt` seconds.
    ///
    /// All transfers are planned from the temperatures at entry and then
    /// applied, so the result does not depend on pair order. A body with
    /// several contacts has its transfers scaled back so it never passes the
    /// temperature of a partner. Each transfer is removed from one side and
    /// exactly that amount added to the other, except for air, whose energy
    /// is never changed.
    pub fn step(
        &self,
        containers: &mut [ThermalEnergyContainer],
        contacts: &[ContactPair],
        dt: f64,
    ) -> EquilibrationReport {
        let index: HashMap<ContainerId, usize> = containers
            .iter()
            .enumerate()
            .map(|(i, c)| (c.id(), i))
            .collect();
        let temperatures: Vec<f64> = containers.iter().map(|c| c.temperature()).collect();
        let capacities: Vec<f64> = containers.iter().map(|c| c.heat_capacity()).collect();
        let is_air: Vec<bool> = containers.iter().map(|c| c.category().is_air()).collect();

        let mut seen = HashSet::new();
        let mut pairs: Vec<(usize, usize)> = Vec::new();
        for contact in contacts {
            let (Some(&a), Some(&b)) = (index.get(&contact.a), index.get(&contact.b)) else {
                continue;
            };
            if a != b && seen.insert(contact.key()) {
                pairs.push((a, b));
            }
        }
        if self.ambient_exchange {
            if let Some(air) = containers.iter().position(|c| c.category().is_air()) {
                for (i, c) in containers.iter().enumerate() {
                    if i != air && seen.insert(ContactPair::new(c.id(), containers[air].id()).key()) {
                        pairs.push((i, air));
                    }
                }
            }
        }

        let mut plan = Vec::with_capacity(pairs.len());
        for (a, b) in pairs {
            let (hot, cold) = if temperatures[a] >= temperatures[b] {
                (a, b)
            } else {
                (b, a)
            };
            let delta_t = temperatures[hot] - temperatures[cold];
            if delta_t <= 0.0 {
                continue;
            }
            let coefficient = self
                .table
                .coefficient(containers[hot].category(), containers[cold].category());
            let (equalizing, meeting) = if is_air[hot] {
                (delta_t * capacities[cold], temperatures[hot])
            } else if is_air[cold] {
                (delta_t * capacities[hot], temperatures[cold])
            } else {
                let (ch, cc) = (capacities[hot], capacities[cold]);
                (
                    delta_t / (1.0 / ch + 1.0 / cc),
                    (ch * temperatures[hot] + cc * temperatures[cold]) / (ch + cc),
                )
            };
            let amount = (coefficient * delta_t * dt).min(equalizing);
            if amount > 0.0 {
                plan.push(PlannedTransfer {
                    from: hot,
                    to: cold,
                    amount,
                    meeting,
                });
            }
        }
        limit_overshoot(&mut plan, &temperatures, &capacities, &is_air);

        let mut report = EquilibrationReport::default();
        for PlannedTransfer {
            from, to, amount, ..
        } in plan
        {
            if amount <= 0.0 {
                continue;
            }
            let from_is_air = is_air[from];
            let to_is_air = is_air[to];
            let moved = if from_is_air {
                containers[to].add_energy(amount);
                report.ambient_exchange += amount;
                amount
            } else {
                let removed = containers[from].remove_energy(amount).removed;
                if to_is_air {
                    report.ambient_exchange -= removed;
                } else {
                    containers[to].add_energy(removed);
                }
                removed
            };
            trace!(
                from = %containers[from].id(),
                to = %containers[to].id(),
                amount = moved,
                "heat transfer"
            );
            report.transfers.push(HeatTransfer {
                from: containers[from].id(),
                to: containers[to].id(),
                amount: moved,
            });
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::category::{ThermalCategory, ThermalProperties};
    use ef_core::DVec2;
    use proptest::prelude::*;

    fn body(category: ThermalCategory, mass: f64, temperature: f64) -> ThermalEnergyContainer {
        ThermalEnergyContainer::new(category, mass, &ThermalProperties::default())
            .unwrap()
            .with_temperature(temperature)
    }

    fn stepper() -> ThermalEquilibrationStepper {
        ThermalEquilibrationStepper::new(HeatTransferTable::default()).with_ambient_exchange(false)
    }

    fn total_energy(containers: &[ThermalEnergyContainer]) -> f64 {
        containers.iter().map(|c| c.energy()).sum()
    }

    #[test]
    fn warm_gives_to_cool() {
        let mut cs = vec![
            body(ThermalCategory::Iron, 1.0, 350.0),
            body(ThermalCategory::Brick, 1.0, 300.0),
        ];
        let contacts = [ContactPair::new(cs[0].id(), cs[1].id())];
        let report = stepper().step(&mut cs, &contacts, 0.01);
        assert_eq!(report.transfers.len(), 1);
        assert_eq!(report.transfers[0].from, cs[0].id());
        assert!((report.transfers[0].amount - 1000.0 * 50.0 * 0.01).abs() < 1e-9);
        assert!(cs[0].temperature() < 350.0);
        assert!(cs[1].temperature() > 300.0);
    }

    #[test]
    fn equal_bodies_converge_monotonically() {
        let mut cs = vec![
            body(ThermalCategory::Iron, 1.0, 100.0),
            body(ThermalCategory::Iron, 1.0, 0.0),
        ];
        let contacts = [ContactPair::new(cs[0].id(), cs[1].id())];
        let stepper = stepper();
        let mut previous = cs[0].temperature() - cs[1].temperature();
        let mut ticks = 0;
        while previous > 1e-3 {
            stepper.step(&mut cs, &contacts, 1.0 / 60.0);
            let gap = cs[0].temperature() - cs[1].temperature();
            assert!(gap >= 0.0, "temperature gap changed sign");
            assert!(gap < previous, "gap did not shrink");
            previous = gap;
            ticks += 1;
            assert!(ticks < 10_000);
        }
        assert!((cs[0].temperature() + cs[1].temperature() - 100.0).abs() < 1e-6);
    }

    #[test]
    fn hot_body_with_two_contacts_stays_warmest() {
        let mut cs = vec![
            body(ThermalCategory::Iron, 0.05, 400.0),
            body(ThermalCategory::Iron, 0.05, 300.0),
            body(ThermalCategory::Iron, 0.05, 300.0),
        ];
        let contacts = [
            ContactPair::new(cs[0].id(), cs[1].id()),
            ContactPair::new(cs[0].id(), cs[2].id()),
        ];
        let before = total_energy(&cs);
        stepper().step(&mut cs, &contacts, 1.0 / 60.0);
        assert!(cs[0].temperature() >= cs[1].temperature());
        assert!(cs[0].temperature() >= cs[2].temperature());
        assert!(cs[0].temperature() < 400.0);
        assert!(cs[1].temperature() > 300.0);
        assert!((total_energy(&cs) - before).abs() < 1e-9 * before);
    }

    #[test]
    fn air_contact_does_not_push_body_past_neighbour() {
        let props = ThermalProperties::default();
        let mut cs = vec![
            body(ThermalCategory::Iron, 0.05, 400.0),
            body(ThermalCategory::Iron, 0.05, 320.0),
            ThermalEnergyContainer::air(&props).unwrap(),
        ];
        let contacts = [ContactPair::new(cs[0].id(), cs[1].id())];
        let stepper = ThermalEquilibrationStepper::new(
            HeatTransferTable::default().with_pair(ThermalCategory::Iron, ThermalCategory::Air, 1000.0),
        );
        stepper.step(&mut cs, &contacts, 1.0 / 60.0);
        assert!(cs[0].temperature() >= cs[1].temperature());
        assert!(cs[1].temperature() >= cs[2].temperature());
    }

    #[test]
    fn huge_timestep_stops_at_equilibrium() {
        let mut cs = vec![
            body(ThermalCategory::Water, 1.0, 360.0),
            body(ThermalCategory::Iron, 0.5, 280.0),
        ];
        let contacts = [ContactPair::new(cs[1].id(), cs[0].id())];
        stepper().step(&mut cs, &contacts, 1000.0);
        assert!((cs[0].temperature() - cs[1].temperature()).abs() < 1e-6);
        assert!(cs[0].temperature() > 280.0 && cs[0].temperature() < 360.0);
    }

    #[test]
    fn duplicate_and_self_contacts_ignored() {
        let mut cs = vec![
            body(ThermalCategory::Iron, 1.0, 310.0),
            body(ThermalCategory::Iron, 1.0, 300.0),
        ];
        let (a, b) = (cs[0].id(), cs[1].id());
        let contacts = [
            ContactPair::new(a, b),
            ContactPair::new(b, a),
            ContactPair::new(a, a),
            ContactPair::new(a, crate::container::ContainerId::new()),
        ];
        let report = stepper().step(&mut cs, &contacts, 0.001);
        assert_eq!(report.transfers.len(), 1);
    }

    #[test]
    fn air_is_an_infinite_reservoir() {
        let props = ThermalProperties::default();
        let air = ThermalEnergyContainer::air(&props).unwrap();
        let air_energy = air.energy();
        let mut cs = vec![body(ThermalCategory::Brick, 1.0, 400.0), air];
        let report = ThermalEquilibrationStepper::new(HeatTransferTable::default())
            .step(&mut cs, &[], 0.1);
        assert_eq!(cs[1].energy(), air_energy);
        assert!(report.ambient_exchange < 0.0);
        assert!((cs[0].energy() - (400.0 * 840.0 + report.ambient_exchange)).abs() < 1e-6);
    }

    #[test]
    fn snapshot_makes_order_irrelevant() {
        let mut forward = vec![
            body(ThermalCategory::Iron, 1.0, 400.0),
            body(ThermalCategory::Brick, 1.0, 300.0),
            body(ThermalCategory::Water, 0.2, 350.0),
        ];
        let mut backward = forward.clone();
        let ids: Vec<_> = forward.iter().map(|c| c.id()).collect();
        let pairs = [
            ContactPair::new(ids[0], ids[1]),
            ContactPair::new(ids[1], ids[2]),
            ContactPair::new(ids[0], ids[2]),
        ];
        let mut reversed = pairs;
        reversed.reverse();
        stepper().step(&mut forward, &pairs, 0.05);
        stepper().step(&mut backward, &reversed, 0.05);
        for (f, b) in forward.iter().zip(&backward) {
            assert!((f.energy() - b.energy()).abs() < 1e-6);
        }
    }

    #[test]
    fn contacts_detected_by_overlap() {
        let props = ThermalProperties::default();
        let a = ThermalEnergyContainer::new(ThermalCategory::Iron, 1.0, &props)
            .unwrap()
            .at(DVec2::new(0.0, 0.0))
            .with_size(DVec2::splat(0.1));
        let b = ThermalEnergyContainer::new(ThermalCategory::Brick, 1.0, &props)
            .unwrap()
            .at(DVec2::new(0.0, 0.1))
            .with_size(DVec2::splat(0.1));
        let c = ThermalEnergyContainer::new(ThermalCategory::Water, 1.0, &props)
            .unwrap()
            .at(DVec2::new(1.0, 0.0))
            .with_size(DVec2::splat(0.1));
        let air = ThermalEnergyContainer::air(&props).unwrap();
        let contacts = detect_contacts(&[a.clone(), b.clone(), c, air]);
        assert_eq!(contacts, vec![ContactPair::new(a.id(), b.id())]);
    }

    proptest! {
        #[test]
        fn ordering_never_flips_in_one_step(
            temps in proptest::collection::vec(1.0f64..1000.0, 2..6),
            masses in proptest::collection::vec(0.01f64..5.0, 6),
            dt in 0.001f64..5.0,
        ) {
            let mut cs: Vec<_> = temps
                .iter()
                .enumerate()
                .map(|(i, &t)| body(ThermalCategory::Iron, masses[i], t))
                .collect();
            let mut contacts = Vec::new();
            for i in 0..cs.len() {
                for j in i + 1..cs.len() {
                    contacts.push(ContactPair::new(cs[i].id(), cs[j].id()));
                }
            }
            stepper().step(&mut cs, &contacts, dt);
            for (hot, &was_hot) in cs.iter().zip(&temps) {
                for (cold, &was_cold) in cs.iter().zip(&temps) {
                    if was_hot > was_cold {
                        prop_assert!(hot.temperature() >= cold.temperature() - 1e-9 * was_hot);
                    }
                }
            }
        }

        #[test]
        fn exchange_conserves_energy(
            temps in proptest::collection::vec(1.0f64..1000.0, 2..6),
            masses in proptest::collection::vec(0.1f64..5.0, 6),
            dt in 0.001f64..5.0,
        ) {
            let categories = [
                ThermalCategory::Iron,
                ThermalCategory::Brick,
                ThermalCategory::Water,
                ThermalCategory::OliveOil,
            ];
            let mut cs: Vec<_> = temps
                .iter()
                .enumerate()
                .map(|(i, &t)| body(categories[i % categories.len()], masses[i], t))
                .collect();
            let mut contacts = Vec::new();
            for i in 0..cs.len() {
                for j in i + 1..cs.len() {
                    contacts.push(ContactPair::new(cs[i].id(), cs[j].id()));
                }
            }
            let before = total_energy(&cs);
            for _ in 0..20 {
                stepper().step(&mut cs, &contacts, dt);
            }
            let after = total_energy(&cs);
            prop_assert!((before - after).abs() <= before * 1e-9);
            for c in &cs {
                prop_assert!(c.energy() >= 0.0);
            }
        }
    }
}
