//! Battle execution loop
//!
//! Each tick: engagement -> combat -> morale -> contagion -> recovery ->
//! movement -> elimination -> checksum -> outcome.
//!
//! A `Battle` owns everything it touches: units, RNG streams, effect pools.
//! Two battles never share state, so they can run on separate threads.

use glam::Vec3;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::battle::checksum::{fold_tick, ReplayLog};
use crate::battle::clock::FixedStepClock;
use crate::battle::commands::{apply_command, CommandOutcome, UnitCommand};
use crate::battle::constants::DEFAULT_MODEL_SPACING;
use crate::battle::engagement::{plan_engagements, within_reach};
use crate::battle::matchup::MatchupTable;
use crate::battle::morale::{MoraleTracker, RoutState, RoutTransition};
use crate::battle::movement::advance_units;
use crate::battle::placement::{layout, visible_count};
use crate::battle::resolution::{resolve, CombatEvent, EngagementContext};
use crate::battle::rng::BattleRng;
use crate::battle::terrain::BattleContext;
use crate::battle::units::{Unit, UnitDelta, UnitSnapshot};
use crate::core::config::BattleConfig;
use crate::core::error::{BattleError, Result};
use crate::core::types::{BattleId, Side, Tick, UnitId};
use crate::vfx::renderer::Renderer;
use crate::vfx::{VfxEvent, VfxPipeline};

/// Battle phases
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BattlePhase {
    #[default]
    Active,
    /// Outcome decided; ticks are no-ops
    Finished,
    /// Resources disposed; ticks are errors
    TornDown,
}

/// Battle outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BattleOutcome {
    #[default]
    Undecided,
    AttackerVictory,
    DefenderVictory,
    /// Mutual destruction, or the tick limit ran out
    Draw,
}

/// Everything that changed in one logic tick
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TickReport {
    pub tick: Tick,
    /// Post-tick state of every unit that started the tick
    pub deltas: Vec<UnitDelta>,
    pub events: Vec<CombatEvent>,
    pub transitions: Vec<RoutTransition>,
    pub eliminated: Vec<UnitId>,
    pub checksum: u64,
    pub outcome: BattleOutcome,
}

/// One running battle
#[derive(Debug, Clone)]
pub struct Battle {
    id: BattleId,
    config: BattleConfig,
    matchups: MatchupTable,
    context: BattleContext,
    units: BTreeMap<UnitId, Unit>,
    rng: BattleRng,
    morale: MoraleTracker,
    vfx: VfxPipeline,
    clock: FixedStepClock,
    tick: Tick,
    phase: BattlePhase,
    outcome: BattleOutcome,
    checksum: u64,
    replay: ReplayLog,
    attacker_max_crew: u64,
    defender_max_crew: u64,
}

impl Battle {
    /// Start a battle from roster snapshots
    pub fn new(
        id: BattleId,
        seed: u64,
        roster: &[UnitSnapshot],
        context: BattleContext,
        config: BattleConfig,
    ) -> Result<Self> {
        config.validate()?;
        if roster.is_empty() {
            return Err(BattleError::InvalidRoster("roster is empty".into()));
        }

        let mut units = BTreeMap::new();
        for snapshot in roster {
            let unit = Unit::from_snapshot(snapshot, &config.morale)?;
            if units.insert(unit.id, unit).is_some() {
                return Err(BattleError::InvalidRoster(format!(
                    "duplicate unit id {}",
                    snapshot.id
                )));
            }
        }

        let max_crew = |side: Side| -> u64 {
            units
                .values()
                .filter(|u: &&Unit| u.side == side)
                .map(|u| u.max_crew() as u64)
                .sum()
        };
        let attacker_max_crew = max_crew(Side::Attacker);
        let defender_max_crew = max_crew(Side::Defender);

        tracing::info!(
            battle = %id,
            seed,
            units = units.len(),
            terrain = ?context.terrain,
            weather = ?context.weather,
            "Battle started"
        );

        Ok(Self {
            id,
            matchups: MatchupTable::from_config(&config),
            morale: MoraleTracker::new(config.morale.clone()),
            vfx: VfxPipeline::new(id, context, &config.vfx),
            clock: FixedStepClock::new(config.tick.logic_hz, config.tick.max_catch_up_steps),
            rng: BattleRng::new(seed),
            config,
            context,
            units,
            tick: 0,
            phase: BattlePhase::Active,
            outcome: BattleOutcome::Undecided,
            checksum: 0,
            replay: ReplayLog::new(),
            attacker_max_crew,
            defender_max_crew,
        })
    }

    pub fn id(&self) -> BattleId {
        self.id
    }

    pub fn tick_count(&self) -> Tick {
        self.tick
    }

    pub fn phase(&self) -> BattlePhase {
        self.phase
    }

    pub fn outcome(&self) -> BattleOutcome {
        self.outcome
    }

    pub fn is_finished(&self) -> bool {
        self.phase != BattlePhase::Active
    }

    pub fn config(&self) -> &BattleConfig {
        &self.config
    }

    pub fn context(&self) -> BattleContext {
        self.context
    }

    /// Weather (or terrain) changed mid-battle
    pub fn set_context(&mut self, context: BattleContext) {
        self.context = context;
        self.vfx.set_context(context);
    }

    pub fn unit(&self, id: UnitId) -> Option<&Unit> {
        self.units.get(&id)
    }

    /// Units still on the field, in id order
    pub fn units(&self) -> impl Iterator<Item = &Unit> {
        self.units.values()
    }

    pub fn checksum(&self) -> u64 {
        self.checksum
    }

    pub fn replay(&self) -> &ReplayLog {
        &self.replay
    }

    pub fn vfx(&self) -> &VfxPipeline {
        &self.vfx
    }

    /// Surviving crew as a fraction of the side's starting max crew
    pub fn remaining_ratio(&self, side: Side) -> f32 {
        let max = match side {
            Side::Attacker => self.attacker_max_crew,
            Side::Defender => self.defender_max_crew,
        };
        if max == 0 {
            return 0.0;
        }
        let crew: u64 = self
            .units
            .values()
            .filter(|u| u.side == side)
            .map(|u| u.crew() as u64)
            .sum();
        crew as f32 / max as f32
    }

    /// Apply a player command before the next tick
    pub fn submit(&mut self, command: &UnitCommand) -> CommandOutcome {
        if self.phase == BattlePhase::TornDown {
            return CommandOutcome::Ignored;
        }
        let outcome = apply_command(command, &mut self.units);
        tracing::debug!(battle = %self.id, unit = %command.unit_id, ?outcome, "Command");
        outcome
    }

    /// Run one fixed logic tick
    pub fn tick(&mut self) -> Result<TickReport> {
        match self.phase {
            BattlePhase::TornDown => return Err(BattleError::BattleTornDown(self.id)),
            BattlePhase::Finished => return Ok(self.idle_report()),
            BattlePhase::Active => {}
        }

        self.tick += 1;
        let _span = tracing::debug_span!("battle", id = %self.id, tick = self.tick).entered();

        let present: Vec<UnitId> = self.units.keys().copied().collect();
        let mut engaged = BTreeSet::new();
        let mut striking = BTreeSet::new();

        let (events, mut transitions) = self.phase_combat(&mut engaged, &mut striking);
        let spread = self.phase_contagion(&transitions);
        transitions.extend(spread);
        self.phase_recovery(&engaged, &mut transitions);

        advance_units(&mut self.units, self.config.tick_seconds(), &striking);

        let deltas: Vec<UnitDelta> = present
            .iter()
            .filter_map(|id| self.units.get(id))
            .map(Unit::delta)
            .collect();
        let eliminated = self.phase_elimination();

        self.checksum = fold_tick(self.checksum, self.tick, &self.units);
        self.replay.record(self.tick, self.checksum);

        self.phase_outcome();

        Ok(TickReport {
            tick: self.tick,
            deltas,
            events,
            transitions,
            eliminated,
            checksum: self.checksum,
            outcome: self.outcome,
        })
    }

    /// Resolve planned strikes; `engaged` collects both sides of every
    /// exchange, `striking` only the attackers
    fn phase_combat(
        &mut self,
        engaged: &mut BTreeSet<UnitId>,
        striking: &mut BTreeSet<UnitId>,
    ) -> (Vec<CombatEvent>, Vec<RoutTransition>) {
        let mut events = Vec::new();
        let mut transitions = Vec::new();
        let ctx = EngagementContext {
            combat: &self.config.combat,
            matchups: &self.matchups,
            battle: self.context,
            tick: self.tick,
        };

        for engagement in plan_engagements(&self.units) {
            let (Some(attacker), Some(defender)) = (
                self.units.get(&engagement.attacker_id),
                self.units.get(&engagement.defender_id),
            ) else {
                continue;
            };
            // Earlier strikes this tick may have killed or broken either side
            if !attacker.can_attack() || !defender.is_alive() || !within_reach(attacker, defender) {
                tracing::debug!(
                    attacker = %engagement.attacker_id,
                    defender = %engagement.defender_id,
                    "Stale engagement discarded"
                );
                continue;
            }

            let event = resolve(attacker, defender, &ctx, self.rng.combat());

            let Some((attacker, defender)) = pair_mut(
                &mut self.units,
                engagement.attacker_id,
                engagement.defender_id,
            ) else {
                continue;
            };
            defender.apply_casualties(event.damage);
            attacker.apply_casualties(event.counter_damage);

            for transition in self.morale.apply_event(attacker, defender, &event) {
                if transition.entered_rout() {
                    let position = if transition.unit_id == attacker.id {
                        attacker.position
                    } else {
                        defender.position
                    };
                    self.vfx.publish(VfxEvent::Rout {
                        unit_id: transition.unit_id,
                        position,
                        tick: self.tick,
                    });
                }
                transitions.push(transition);
            }

            engaged.insert(engagement.attacker_id);
            engaged.insert(engagement.defender_id);
            striking.insert(engagement.attacker_id);
            self.vfx.publish(VfxEvent::Strike(event.clone()));
            events.push(event);
        }

        (events, transitions)
    }

    /// Allies near a newly routed unit lose heart; one step, no cascade
    fn phase_contagion(&mut self, transitions: &[RoutTransition]) -> Vec<RoutTransition> {
        let mut spread = Vec::new();
        let radius = self.config.morale.contagion_radius;

        for routed in transitions.iter().filter(|t| t.entered_rout()) {
            let Some(source) = self.units.get(&routed.unit_id) else {
                continue;
            };
            let (side, origin) = (source.side, source.position);

            let allies: Vec<UnitId> = self
                .units
                .values()
                .filter(|u| u.id != routed.unit_id && u.side == side && u.is_alive())
                .filter(|u| u.rout != RoutState::Routed)
                .filter(|u| u.position.distance(origin) <= radius)
                .map(|u| u.id)
                .collect();

            for ally_id in allies {
                let Some(ally) = self.units.get_mut(&ally_id) else {
                    continue;
                };
                if let Some(t) = self.morale.apply_contagion(ally, self.tick) {
                    if t.entered_rout() {
                        self.vfx.publish(VfxEvent::Rout {
                            unit_id: ally_id,
                            position: ally.position,
                            tick: self.tick,
                        });
                    }
                    spread.push(t);
                }
            }
        }

        spread
    }

    fn phase_recovery(&mut self, engaged: &BTreeSet<UnitId>, transitions: &mut Vec<RoutTransition>) {
        for unit in self.units.values_mut() {
            if !unit.is_alive() || engaged.contains(&unit.id) {
                continue;
            }
            transitions.extend(self.morale.recover_idle(unit, self.tick));
        }
    }

    /// Remove destroyed units from the field
    fn phase_elimination(&mut self) -> Vec<UnitId> {
        let dead: Vec<UnitId> = self
            .units
            .values()
            .filter(|u| !u.is_alive())
            .map(|u| u.id)
            .collect();

        for id in &dead {
            if let Some(unit) = self.units.remove(id) {
                self.vfx.publish(VfxEvent::Death {
                    unit_id: unit.id,
                    troop_type: unit.troop_type,
                    position: unit.position,
                    tick: self.tick,
                });
                tracing::debug!(battle = %self.id, unit = %unit.id, "Unit eliminated");
            }
        }
        dead
    }

    fn phase_outcome(&mut self) {
        // A side is beaten when nothing of it is left standing and steady
        let fighting = |side: Side| {
            self.units
                .values()
                .any(|u| u.side == side && u.is_alive() && u.rout != RoutState::Routed)
        };
        let outcome = match (fighting(Side::Attacker), fighting(Side::Defender)) {
            (true, false) => BattleOutcome::AttackerVictory,
            (false, true) => BattleOutcome::DefenderVictory,
            (false, false) => BattleOutcome::Draw,
            (true, true) if self.tick >= self.config.tick.max_ticks => BattleOutcome::Draw,
            (true, true) => BattleOutcome::Undecided,
        };

        if outcome != BattleOutcome::Undecided {
            self.outcome = outcome;
            self.phase = BattlePhase::Finished;
            tracing::info!(
                battle = %self.id,
                tick = self.tick,
                ?outcome,
                attacker_remaining = self.remaining_ratio(Side::Attacker),
                defender_remaining = self.remaining_ratio(Side::Defender),
                "Battle finished"
            );
        }
    }

    fn idle_report(&self) -> TickReport {
        TickReport {
            tick: self.tick,
            checksum: self.checksum,
            outcome: self.outcome,
            ..TickReport::default()
        }
    }

    /// Feed one render frame: run whatever logic ticks are due, then one
    /// effects frame
    pub fn advance(&mut self, real_dt: f32, renderer: &mut dyn Renderer) -> Result<Vec<TickReport>> {
        if self.phase == BattlePhase::TornDown {
            return Err(BattleError::BattleTornDown(self.id));
        }

        let steps = self.clock.accumulate(real_dt);
        let mut reports = Vec::with_capacity(steps as usize);
        for _ in 0..steps {
            if self.phase != BattlePhase::Active {
                break;
            }
            reports.push(self.tick()?);
        }

        if let Some(anchor) = self.centroid() {
            self.vfx.set_anchor(anchor);
        }
        self.vfx.frame(real_dt, self.rng.cosmetic(), renderer);
        Ok(reports)
    }

    /// Tick until an outcome is reached
    pub fn run_to_completion(&mut self) -> Result<BattleOutcome> {
        while self.phase == BattlePhase::Active {
            self.tick()?;
        }
        Ok(self.outcome)
    }

    /// Dispose every effect handle this battle owns
    ///
    /// In-flight projectiles never land. Later ticks return
    /// `BattleError::BattleTornDown`.
    pub fn teardown(&mut self, renderer: &mut dyn Renderer) {
        if self.phase == BattlePhase::TornDown {
            return;
        }
        let cancelled = self.vfx.teardown(renderer);
        self.phase = BattlePhase::TornDown;
        tracing::info!(battle = %self.id, tick = self.tick, cancelled, "Battle torn down");
    }

    /// World positions of a unit's visible members
    ///
    /// A damaged unit shows proportionally fewer members.
    pub fn unit_layout(&mut self, id: UnitId) -> Option<Vec<Vec3>> {
        let unit = self.units.get(&id)?;
        let count = visible_count(unit.model_count(), unit.health_fraction()) as usize;
        let (formation, anchor) = (unit.formation, unit.position);
        let offsets = layout(formation, count, DEFAULT_MODEL_SPACING, self.rng.placement());
        Some(offsets.into_iter().map(|o| anchor + o).collect())
    }

    fn centroid(&self) -> Option<Vec3> {
        let count = self.units.len();
        if count == 0 {
            return None;
        }
        let sum: Vec3 = self.units.values().map(|u| u.position).sum();
        Some(sum / count as f32)
    }
}

/// Mutable borrows of two distinct units
fn pair_mut(
    units: &mut BTreeMap<UnitId, Unit>,
    a: UnitId,
    b: UnitId,
) -> Option<(&mut Unit, &mut Unit)> {
    if a == b {
        return None;
    }
    let mut first = None;
    let mut second = None;
    for (id, unit) in units.iter_mut() {
        if *id == a {
            first = Some(unit);
        } else if *id == b {
            second = Some(unit);
        }
    }
    Some((first?, second?))
}
