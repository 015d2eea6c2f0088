// src/session.rs

/*
Session lifecycle: Empty -> HomeSet -> (ProbeSet <-> ZoneComputed)

- SetHome is accepted in every phase and always passes through HomeSet,
  dropping the probe and the zone. The render step must retire the
  previous layers before drawing the new ones.
- With the fixed policy the zone is computed as soon as a home exists.
- Every probe event re-runs the zone pipeline from the current pair.
- There is no terminal phase.
*/

use std::fmt;

use tracing::{debug, info, warn};

use crate::circle::CircleSteps;
use crate::geo::Coordinate;
use crate::geocode::{Located, LocationError};
use crate::geodesy::AntipodalPair;
use crate::zone::{ResolvedZone, ZoneError, ZonePolicy, ZoneResolver};

/* ---------------- EVENTS ---------------- */

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Empty,
    HomeSet,
    ProbeSet,
    ZoneComputed,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Phase::Empty => "empty",
            Phase::HomeSet => "home set",
            Phase::ProbeSet => "probe set",
            Phase::ZoneComputed => "zone computed",
        };
        write!(f, "{s}")
    }
}

// User input, already turned into coordinates.
#[derive(Debug, Clone, PartialEq)]
pub enum InputEvent {
    SetHome { home: Coordinate, label: String },
    PlaceProbe(Coordinate),
    MoveProbe(Coordinate),
    ClearProbe,
    SetPolicy(ZonePolicy),
}

// Outcome of one event. The render step reads the session after it and,
// when `retire_previous` is set, removes every layer it drew before.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateTransition {
    pub from: Phase,
    pub to: Phase,
    pub retire_previous: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("set a home location first")]
    NoHome,
}

// Handle for one in-flight location lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LookupTicket(u64);

/* ---------------- SESSION ---------------- */

#[derive(Debug, Clone)]
pub struct SessionState {
    pair: Option<AntipodalPair>,
    home_label: String,
    probe: Option<Coordinate>,
    zone: Option<ResolvedZone>,
    policy: ZonePolicy,
    resolver: ZoneResolver,
    phase: Phase,
    generation: u64,
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new(ZonePolicy::default(), CircleSteps::default())
    }
}

impl SessionState {
    pub fn new(policy: ZonePolicy, steps: CircleSteps) -> Self {
        Self {
            pair: None,
            home_label: String::new(),
            probe: None,
            zone: None,
            policy,
            resolver: ZoneResolver::new(steps),
            phase: Phase::Empty,
            generation: 0,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn pair(&self) -> Option<&AntipodalPair> {
        self.pair.as_ref()
    }

    pub fn home_label(&self) -> &str {
        &self.home_label
    }

    pub fn probe(&self) -> Option<Coordinate> {
        self.probe
    }

    pub fn zone(&self) -> Option<&ResolvedZone> {
        self.zone.as_ref()
    }

    pub fn policy(&self) -> ZonePolicy {
        self.policy
    }

    /// Applies one input event.
    ///
    /// On error the session is left exactly as it was.
    pub fn on_input_event(&mut self, event: InputEvent) -> Result<StateTransition, SessionError> {
        let from = self.phase;
        let retire_previous = match event {
            InputEvent::SetHome { home, label } => {
                self.set_home(home, label);
                true
            }
            InputEvent::PlaceProbe(probe) | InputEvent::MoveProbe(probe) => {
                self.set_probe(probe)?;
                false
            }
            InputEvent::ClearProbe => {
                self.clear_probe()?;
                false
            }
            InputEvent::SetPolicy(policy) => {
                self.set_policy(policy);
                false
            }
        };

        Ok(self.transition_from(from, retire_previous))
    }

    fn transition_from(&self, from: Phase, retire_previous: bool) -> StateTransition {
        let transition = StateTransition { from, to: self.phase, retire_previous };
        info!(from = %transition.from, to = %transition.to, retire = retire_previous, "session transition");
        transition
    }

    fn set_home(&mut self, home: Coordinate, label: String) {
        self.invalidate_lookups();
        self.pair = Some(AntipodalPair::new(home));
        self.home_label = label;
        self.probe = None;
        self.zone = None;
        self.phase = Phase::HomeSet;

        if self.policy == ZonePolicy::Fixed {
            self.recompute();
        }
    }

    fn set_probe(&mut self, probe: Coordinate) -> Result<(), SessionError> {
        if self.pair.is_none() {
            return Err(SessionError::NoHome);
        }
        self.invalidate_lookups();
        self.probe = Some(probe);
        self.phase = Phase::ProbeSet;
        self.recompute();
        Ok(())
    }

    fn clear_probe(&mut self) -> Result<(), SessionError> {
        if self.pair.is_none() {
            return Err(SessionError::NoHome);
        }
        self.probe = None;
        self.zone = None;
        self.phase = Phase::HomeSet;
        if self.policy == ZonePolicy::Fixed {
            self.recompute();
        }
        Ok(())
    }

    fn set_policy(&mut self, policy: ZonePolicy) {
        self.policy = policy;
        if self.pair.is_none() {
            return;
        }
        self.zone = None;
        self.phase = if self.probe.is_some() { Phase::ProbeSet } else { Phase::HomeSet };
        self.recompute();
    }

    // Full pipeline from the current pair; never patches the previous polygon.
    // A policy that cannot produce a zone yet simply leaves the phase alone.
    fn recompute(&mut self) {
        let Some(pair) = self.pair else {
            return;
        };
        match self.resolver.resolve(self.policy, &pair, self.probe) {
            Ok(zone) => {
                self.zone = Some(zone);
                self.phase = Phase::ZoneComputed;
            }
            Err(ZoneError::MissingProbe) => {
                debug!(policy = %self.policy, "zone waits for a probe");
            }
        }
    }

    /* ---------------- LOOKUPS ---------------- */

    // Any newer lookup, home or probe event makes older tickets stale.
    fn invalidate_lookups(&mut self) {
        self.generation += 1;
    }

    /// Registers a new lookup; only the most recent ticket can still land.
    pub fn begin_lookup(&mut self) -> LookupTicket {
        self.invalidate_lookups();
        LookupTicket(self.generation)
    }

    pub fn is_current(&self, ticket: LookupTicket) -> bool {
        ticket.0 == self.generation
    }

    /// Applies a finished lookup as a new home.
    ///
    /// Returns `Ok(None)` when the ticket was superseded, whatever the
    /// lookup produced. Errors from a current lookup are passed back
    /// without touching the session.
    pub fn complete_lookup(
        &mut self,
        ticket: LookupTicket,
        result: Result<Located, LocationError>,
    ) -> Result<Option<StateTransition>, LocationError> {
        if !self.is_current(ticket) {
            warn!(ticket = ticket.0, current = self.generation, "discarding stale lookup");
            return Ok(None);
        }
        let located = result?;
        let from = self.phase;
        self.set_home(located.coordinate, located.label);
        Ok(Some(self.transition_from(from, true)))
    }
}

/* ---------------- TEST ---------------- */

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geodesy::{Focus, QUARTER_CIRCUMFERENCE_M};
    use crate::zone::ZoneKind;

    fn c(lat: f64, lon: f64) -> Coordinate {
        Coordinate::new(lat, lon).unwrap()
    }

    fn home(lat: f64, lon: f64) -> InputEvent {
        InputEvent::SetHome { home: c(lat, lon), label: "home".into() }
    }

    fn located(lat: f64, lon: f64, label: &str) -> Result<Located, LocationError> {
        Ok(Located { coordinate: c(lat, lon), label: label.into() })
    }

    #[test]
    fn test_fixed_policy_computes_on_home() {
        let mut s = SessionState::default();
        assert_eq!(s.phase(), Phase::Empty);

        let t = s.on_input_event(home(0.0, 0.0)).unwrap();
        assert_eq!(t, StateTransition { from: Phase::Empty, to: Phase::ZoneComputed, retire_previous: true });

        let zone = s.zone().unwrap();
        assert_eq!(zone.zone.kind, ZoneKind::EquidistantBoundary);
        assert_eq!(zone.zone.radius_m, QUARTER_CIRCUMFERENCE_M);
        assert_eq!(s.pair().unwrap().antipode().lon(), 180.0);
    }

    #[test]
    fn test_probe_policy_waits_for_probe() {
        let mut s = SessionState::new(ZonePolicy::Probe, CircleSteps::new(32).unwrap());
        let t = s.on_input_event(home(51.5, -0.12)).unwrap();
        assert_eq!(t.to, Phase::HomeSet);
        assert!(s.zone().is_none());

        let t = s.on_input_event(InputEvent::PlaceProbe(c(10.0, 10.0))).unwrap();
        assert_eq!(t.from, Phase::HomeSet);
        assert_eq!(t.to, Phase::ZoneComputed);
        assert!(!t.retire_previous);
        assert_eq!(s.zone().unwrap().zone.kind, ZoneKind::ThroughProbe);
        assert_eq!(s.zone().unwrap().polygon.len(), 32);
    }

    #[test]
    fn test_move_probe_recomputes_from_pair() {
        let mut s = SessionState::new(ZonePolicy::Probe, CircleSteps::default());
        s.on_input_event(home(51.5, -0.12)).unwrap();
        s.on_input_event(InputEvent::PlaceProbe(c(10.0, 10.0))).unwrap();
        let first = s.zone().unwrap().zone;

        let antipode = s.pair().unwrap().antipode();
        s.on_input_event(InputEvent::MoveProbe(antipode)).unwrap();
        let second = s.zone().unwrap().zone;

        assert_ne!(first, second);
        assert_eq!(second.focus, Focus::Antipode);
        assert_eq!(second.radius_m, 0.0);
    }

    #[test]
    fn test_new_home_discards_probe_and_zone() {
        let mut s = SessionState::new(ZonePolicy::Probe, CircleSteps::default());
        s.on_input_event(home(51.5, -0.12)).unwrap();
        s.on_input_event(InputEvent::PlaceProbe(c(10.0, 10.0))).unwrap();

        let t = s.on_input_event(home(-33.0, 151.0)).unwrap();
        assert_eq!(t.from, Phase::ZoneComputed);
        assert_eq!(t.to, Phase::HomeSet);
        assert!(t.retire_previous);
        assert!(s.probe().is_none());
        assert!(s.zone().is_none());
        assert_eq!(s.pair().unwrap().home(), c(-33.0, 151.0));
    }

    #[test]
    fn test_probe_without_home_is_rejected() {
        let mut s = SessionState::default();
        assert!(matches!(
            s.on_input_event(InputEvent::PlaceProbe(c(1.0, 1.0))),
            Err(SessionError::NoHome)
        ));
        assert_eq!(s.phase(), Phase::Empty);
        assert!(s.probe().is_none());
    }

    #[test]
    fn test_switch_policy_recomputes() {
        let mut s = SessionState::default();
        s.on_input_event(home(0.0, 0.0)).unwrap();
        s.on_input_event(InputEvent::PlaceProbe(c(0.0, 45.0))).unwrap();
        assert_eq!(s.zone().unwrap().zone.kind, ZoneKind::EquidistantBoundary);

        s.on_input_event(InputEvent::SetPolicy(ZonePolicy::Probe)).unwrap();
        let zone = s.zone().unwrap().zone;
        assert_eq!(zone.kind, ZoneKind::ThroughProbe);
        assert!((zone.radius_m - QUARTER_CIRCUMFERENCE_M / 2.0).abs() < 1.0);

        s.on_input_event(InputEvent::ClearProbe).unwrap();
        assert_eq!(s.phase(), Phase::HomeSet);
        assert!(s.zone().is_none());
    }

    #[test]
    fn test_stale_lookup_is_discarded() {
        let mut s = SessionState::default();
        let slow = s.begin_lookup();
        let fast = s.begin_lookup();

        let applied = s.complete_lookup(fast, located(48.85, 2.35, "Paris")).unwrap();
        assert!(applied.is_some());
        assert_eq!(s.home_label(), "Paris");

        let applied = s.complete_lookup(slow, located(40.7, -74.0, "New York")).unwrap();
        assert!(applied.is_none());
        assert_eq!(s.home_label(), "Paris");
    }

    #[test]
    fn test_home_event_cancels_pending_lookup() {
        let mut s = SessionState::default();
        let pending = s.begin_lookup();
        s.on_input_event(home(1.0, 2.0)).unwrap();

        assert!(!s.is_current(pending));
        let applied = s.complete_lookup(pending, located(40.7, -74.0, "New York")).unwrap();
        assert!(applied.is_none());
        assert_eq!(s.pair().unwrap().home(), c(1.0, 2.0));
    }

    #[test]
    fn test_failed_lookup_leaves_state_unchanged() {
        let mut s = SessionState::default();
        s.on_input_event(home(1.0, 2.0)).unwrap();
        let before = s.phase();

        let ticket = s.begin_lookup();
        let err = s
            .complete_lookup(ticket, Err(LocationError::InvalidInput("abc".into())))
            .unwrap_err();
        assert!(matches!(err, LocationError::InvalidInput(_)));
        assert_eq!(s.phase(), before);
        assert_eq!(s.pair().unwrap().home(), c(1.0, 2.0));
    }
}
