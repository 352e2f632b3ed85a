//! 运行时：网的构造、可发生集与发生/逆发生语义。
//!
//! 当前标识保存在各库所的 `tokens` 中并被原地修改；搜索通过 [`Net::fire`] 与
//! [`Net::unfire`] 成对调用来回溯。需要独立状态时请 `clone` 整个网。
use std::fmt::{self, Write as FmtWrite};
use std::fs;
use std::path::Path;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::net::ids::{PlaceId, TransitionId};
use crate::net::incidence::Incidence;
use crate::net::index_vec::{Idx, IndexVec};
use crate::net::structure::{Arc, ArcDirection, Marking, Place, PlaceKind, Transition, Weight};

/// Structural failures reported while assembling a net. None of them leave the net
/// half-updated.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum NetError {
    #[error("place `{0}` is already registered")]
    DuplicatePlace(String),
    #[error("transition `{0}` is already registered")]
    DuplicateTransition(String),
    #[error("arc {0:?} already exists")]
    DuplicateArc(Arc),
    #[error("place {0:?} does not exist")]
    UnknownPlace(PlaceId),
    #[error("transition {0:?} does not exist")]
    UnknownTransition(TransitionId),
}

/// Token-game contract violations. These are programming errors on the caller's side,
/// surfaced instead of driving a count negative.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FireError {
    #[error("transition {0:?} is out of bounds")]
    OutOfBounds(TransitionId),
    #[error("transition {0:?} is not enabled under the current marking")]
    NotEnabled(TransitionId),
    #[error("transition {0:?} cannot be reversed: an output place holds no token")]
    NotReversible(TransitionId),
    #[error("marking has {found} entries but the net has {expected} places")]
    MarkingLength { expected: usize, found: usize },
}

#[derive(Clone, Default, Serialize, Deserialize)]
pub struct Net {
    places: IndexVec<PlaceId, Place>,
    transitions: IndexVec<TransitionId, Transition>,
    place_names: IndexMap<String, PlaceId>,
    transition_names: IndexMap<String, TransitionId>,
    aliases: IndexMap<String, TransitionId>,
    arcs: Vec<Arc>,
    pre: Incidence,
    post: Incidence,
    initial: IndexVec<PlaceId, Weight>,
}

impl fmt::Debug for Net {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Net")
            .field("places", &self.places)
            .field("transitions", &self.transitions)
            .field("arcs", &self.arcs)
            .finish()
    }
}

impl Net {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn add_place(&mut self, place: Place) -> Result<PlaceId, NetError> {
        if self.place_names.contains_key(&place.name) {
            return Err(NetError::DuplicatePlace(place.name));
        }
        self.initial.push(place.tokens);
        self.pre.push_place();
        self.post.push_place();
        let name = place.name.clone();
        let id = self.places.push(place);
        self.place_names.insert(name, id);
        Ok(id)
    }

    pub fn add_transition(&mut self, name: impl Into<String>) -> Result<TransitionId, NetError> {
        let name = name.into();
        if self.transition_names.contains_key(&name) {
            return Err(NetError::DuplicateTransition(name));
        }
        self.pre.push_transition();
        self.post.push_transition();
        let alias = Transition::alias_for(TransitionId::from_usize(self.transitions.len()));
        let id = self.transitions.push(Transition::new(name.clone(), alias.clone()));
        self.transition_names.insert(name, id);
        self.aliases.insert(alias, id);
        Ok(id)
    }

    pub fn add_arc(
        &mut self,
        place: PlaceId,
        transition: TransitionId,
        direction: ArcDirection,
    ) -> Result<(), NetError> {
        if !self.places.contains(place) {
            return Err(NetError::UnknownPlace(place));
        }
        if !self.transitions.contains(transition) {
            return Err(NetError::UnknownTransition(transition));
        }
        let matrix = match direction {
            ArcDirection::PlaceToTransition => &mut self.pre,
            ArcDirection::TransitionToPlace => &mut self.post,
        };
        let arc = Arc::new(place, transition, direction);
        if !matrix.insert(place, transition) {
            return Err(NetError::DuplicateArc(arc));
        }
        self.arcs.push(arc);
        Ok(())
    }

    /// 输入弧: place -> transition
    pub fn add_input_arc(&mut self, place: PlaceId, transition: TransitionId) -> Result<(), NetError> {
        self.add_arc(place, transition, ArcDirection::PlaceToTransition)
    }

    /// 输出弧: transition -> place
    pub fn add_output_arc(&mut self, transition: TransitionId, place: PlaceId) -> Result<(), NetError> {
        self.add_arc(place, transition, ArcDirection::TransitionToPlace)
    }

    pub fn places(&self) -> &IndexVec<PlaceId, Place> {
        &self.places
    }

    pub fn transitions(&self) -> &IndexVec<TransitionId, Transition> {
        &self.transitions
    }

    pub fn arcs(&self) -> &[Arc] {
        &self.arcs
    }

    pub fn place(&self, place: PlaceId) -> Option<&Place> {
        self.places.get(place)
    }

    pub fn transition(&self, transition: TransitionId) -> Option<&Transition> {
        self.transitions.get(transition)
    }

    pub fn place_id(&self, name: &str) -> Option<PlaceId> {
        self.place_names.get(name).copied()
    }

    pub fn transition_id(&self, name: &str) -> Option<TransitionId> {
        self.transition_names.get(name).copied()
    }

    /// Looks a transition up by its positional alias (`t1`, `t2`, …).
    pub fn transition_by_alias(&self, alias: &str) -> Option<TransitionId> {
        self.aliases.get(alias).copied()
    }

    pub fn places_len(&self) -> usize {
        self.places.len()
    }

    pub fn transitions_len(&self) -> usize {
        self.transitions.len()
    }

    /// Places of the given kind, in place order.
    pub fn places_of_kind(&self, kind: PlaceKind) -> Vec<PlaceId> {
        self.places
            .iter_enumerated()
            .filter(|(_, place)| place.kind == kind)
            .map(|(id, _)| id)
            .collect()
    }

    pub fn preset(&self, transition: TransitionId) -> impl Iterator<Item = PlaceId> + '_ {
        self.pre.column(transition)
    }

    pub fn postset(&self, transition: TransitionId) -> impl Iterator<Item = PlaceId> + '_ {
        self.post.column(transition)
    }

    pub fn has_input_arc(&self, place: PlaceId, transition: TransitionId) -> bool {
        self.pre.get(place, transition)
    }

    pub fn has_output_arc(&self, transition: TransitionId, place: PlaceId) -> bool {
        self.post.get(place, transition)
    }

    /// Marking the net was constructed with.
    pub fn initial_marking(&self) -> Marking {
        Marking::new(self.initial.clone())
    }

    /// Current marking.
    pub fn marking(&self) -> Marking {
        self.places.iter().map(|place| place.tokens).collect::<Vec<_>>().into()
    }

    pub fn set_marking(&mut self, marking: &Marking) -> Result<(), FireError> {
        if marking.len() != self.places.len() {
            return Err(FireError::MarkingLength {
                expected: self.places.len(),
                found: marking.len(),
            });
        }
        for (place, tokens) in marking.iter() {
            self.places[place].tokens = *tokens;
        }
        Ok(())
    }

    /// 含 token 的库所。
    pub fn enabled_places(&self) -> Vec<PlaceId> {
        self.places
            .iter_enumerated()
            .filter(|(_, place)| place.tokens > 0)
            .map(|(id, _)| id)
            .collect()
    }

    pub fn enabled_transitions(&self) -> Vec<TransitionId> {
        self.transitions
            .indices()
            .filter(|&transition| self.is_enabled(transition))
            .collect()
    }

    /// Every input place holds at least one token (one token per arc).
    pub fn is_enabled(&self, transition: TransitionId) -> bool {
        self.transitions.contains(transition)
            && self
                .preset(transition)
                .all(|place| self.places[place].tokens >= 1)
    }

    /// Consumes one token from every input place and produces one on every output place.
    pub fn fire(&mut self, transition: TransitionId) -> Result<(), FireError> {
        if !self.transitions.contains(transition) {
            return Err(FireError::OutOfBounds(transition));
        }
        if !self.is_enabled(transition) {
            return Err(FireError::NotEnabled(transition));
        }
        for place in self.places.indices() {
            if self.pre.get(place, transition) {
                self.places[place].tokens -= 1;
            }
            if self.post.get(place, transition) {
                self.places[place].tokens += 1;
            }
        }
        Ok(())
    }

    /// Exact inverse of [`Net::fire`]; only meaningful right after firing `transition`.
    pub fn unfire(&mut self, transition: TransitionId) -> Result<(), FireError> {
        if !self.transitions.contains(transition) {
            return Err(FireError::OutOfBounds(transition));
        }
        // A self-loop place gets its token back in the same step, so check the net effect.
        let reversible = self.places.iter_enumerated().all(|(place, state)| {
            !self.post.get(place, transition)
                || self.pre.get(place, transition)
                || state.tokens >= 1
        });
        if !reversible {
            return Err(FireError::NotReversible(transition));
        }
        for place in self.places.indices() {
            if self.pre.get(place, transition) {
                self.places[place].tokens += 1;
            }
            if self.post.get(place, transition) {
                self.places[place].tokens -= 1;
            }
        }
        Ok(())
    }

    pub fn to_dot(&self) -> String {
        let mut dot = String::new();
        let _ = writeln!(&mut dot, "digraph PetriNet {{");
        let _ = writeln!(&mut dot, "    rankdir=LR;");
        let _ = writeln!(&mut dot, "    node [fontname=\"Helvetica\"];");

        for (place_id, place) in self.places.iter_enumerated() {
            let fill = match place.kind {
                PlaceKind::Source => "#c8e6c9",
                PlaceKind::Sink => "#ffcdd2",
                PlaceKind::Internal => "#e3f2fd",
            };
            let marks = if place.tokens > 0 {
                format!("\\n{}", "●".repeat(place.tokens.min(5) as usize))
            } else {
                String::new()
            };
            let _ = writeln!(
                &mut dot,
                "    place_{} [label=\"{}{}\", shape=circle, style=filled, fillcolor=\"{}\"];",
                place_id.index(),
                escape_label(&place.name),
                marks,
                fill
            );
        }

        for (transition_id, transition) in self.transitions.iter_enumerated() {
            let _ = writeln!(
                &mut dot,
                "    trans_{} [label=\"{}\\n{}\", shape=box, style=filled, fillcolor=\"#ffe0b2\"];",
                transition_id.index(),
                escape_label(&transition.alias),
                escape_label(&transition.name)
            );
        }

        for arc in &self.arcs {
            let place_node = format!("place_{}", arc.place.index());
            let transition_node = format!("trans_{}", arc.transition.index());
            let _ = match arc.direction {
                ArcDirection::PlaceToTransition => {
                    writeln!(&mut dot, "    {} -> {};", place_node, transition_node)
                }
                ArcDirection::TransitionToPlace => writeln!(
                    &mut dot,
                    "    {} -> {} [color=\"#38B6FF\"];",
                    transition_node, place_node
                ),
            };
        }

        let _ = writeln!(&mut dot, "}}");
        dot
    }

    pub fn write_dot<P: AsRef<Path>>(&self, path: P) -> std::io::Result<()> {
        if let Some(parent) = path.as_ref().parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, self.to_dot())
    }
}

pub(crate) fn escape_label(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '"' => escaped.push_str("\\\""),
            '\\' => escaped.push_str("\\\\"),
            '\n' => escaped.push_str("\\n"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    /// i -> a -> p -> b -> o
    fn sequence_net() -> (Net, [PlaceId; 3], [TransitionId; 2]) {
        let mut net = Net::empty();
        let i = net.add_place(Place::new("i", 1, PlaceKind::Source)).unwrap();
        let p = net.add_place(Place::internal("p", 0)).unwrap();
        let o = net.add_place(Place::new("o", 0, PlaceKind::Sink)).unwrap();
        let a = net.add_transition("a").unwrap();
        let b = net.add_transition("b").unwrap();
        net.add_input_arc(i, a).unwrap();
        net.add_output_arc(a, p).unwrap();
        net.add_input_arc(p, b).unwrap();
        net.add_output_arc(b, o).unwrap();
        (net, [i, p, o], [a, b])
    }

    #[test]
    fn duplicate_registration_fails_without_side_effects() {
        let (mut net, [i, ..], [a, _]) = sequence_net();
        assert_eq!(
            net.add_place(Place::internal("p", 4)),
            Err(NetError::DuplicatePlace("p".into()))
        );
        assert_eq!(
            net.add_transition("a"),
            Err(NetError::DuplicateTransition("a".into()))
        );
        assert!(matches!(
            net.add_input_arc(i, a),
            Err(NetError::DuplicateArc(_))
        ));
        assert_eq!(net.places_len(), 3);
        assert_eq!(net.transitions_len(), 2);
        assert_eq!(net.arcs().len(), 4);
    }

    #[test]
    fn same_endpoints_in_both_directions_are_distinct_arcs() {
        let (mut net, [_, p, _], [a, _]) = sequence_net();
        net.add_input_arc(p, a).unwrap();
        assert!(net.has_input_arc(p, a));
        assert!(net.has_output_arc(a, p));
    }

    #[test]
    fn dangling_arc_is_rejected() {
        let (mut net, [i, ..], _) = sequence_net();
        assert_eq!(
            net.add_input_arc(i, TransitionId::new(9)),
            Err(NetError::UnknownTransition(TransitionId::new(9)))
        );
        assert_eq!(
            net.add_input_arc(PlaceId::new(7), TransitionId::new(0)),
            Err(NetError::UnknownPlace(PlaceId::new(7)))
        );
    }

    #[test]
    fn aliases_follow_registration_order() {
        let (net, _, [a, b]) = sequence_net();
        assert_eq!(net.transition_by_alias("t1"), Some(a));
        assert_eq!(net.transition_by_alias("t2"), Some(b));
        assert_eq!(net.transition_id("b"), Some(b));
        assert_eq!(net.transition_by_alias("t3"), None);
        assert_eq!(net.place_id("o"), Some(PlaceId::new(2)));
    }

    #[test]
    fn enabled_sets_follow_marking() {
        let (mut net, [i, p, _], [a, b]) = sequence_net();
        assert_eq!(net.enabled_places(), vec![i]);
        assert_eq!(net.enabled_transitions(), vec![a]);

        net.fire(a).unwrap();
        assert_eq!(net.enabled_places(), vec![p]);
        assert_eq!(net.enabled_transitions(), vec![b]);
        assert_eq!(net.marking(), Marking::from(vec![0, 1, 0]));
    }

    #[test]
    fn fire_then_unfire_restores_marking() {
        let (mut net, _, [a, b]) = sequence_net();
        let before = net.marking();
        net.fire(a).unwrap();
        let middle = net.marking();
        net.fire(b).unwrap();
        net.unfire(b).unwrap();
        assert_eq!(net.marking(), middle);
        net.unfire(a).unwrap();
        assert_eq!(net.marking(), before);
        assert_eq!(net.initial_marking(), before);
    }

    #[test]
    fn self_loop_fires_and_reverses() {
        let mut net = Net::empty();
        let p = net.add_place(Place::internal("p", 1)).unwrap();
        let t = net.add_transition("spin").unwrap();
        net.add_input_arc(p, t).unwrap();
        net.add_output_arc(t, p).unwrap();

        net.fire(t).unwrap();
        assert_eq!(net.marking(), Marking::from(vec![1]));
        net.unfire(t).unwrap();
        assert_eq!(net.marking(), Marking::from(vec![1]));
    }

    #[test]
    fn contract_violations_are_detected() {
        let (mut net, _, [a, b]) = sequence_net();
        assert_eq!(net.fire(b), Err(FireError::NotEnabled(b)));
        assert_eq!(net.unfire(a), Err(FireError::NotReversible(a)));
        assert_eq!(
            net.fire(TransitionId::new(5)),
            Err(FireError::OutOfBounds(TransitionId::new(5)))
        );
        assert_eq!(net.marking(), Marking::from(vec![1, 0, 0]));
    }

    #[test]
    fn set_marking_checks_length() {
        let (mut net, _, [_, b]) = sequence_net();
        assert_eq!(
            net.set_marking(&Marking::from(vec![0, 1])),
            Err(FireError::MarkingLength {
                expected: 3,
                found: 2
            })
        );
        net.set_marking(&Marking::from(vec![0, 1, 0])).unwrap();
        assert_eq!(net.enabled_transitions(), vec![b]);
        assert_eq!(net.initial_marking(), Marking::from(vec![1, 0, 0]));
    }

    #[test]
    fn dot_lists_every_node_and_arc() {
        let (net, ..) = sequence_net();
        let dot = net.to_dot();
        assert!(dot.starts_with("digraph PetriNet {"));
        assert!(dot.contains("trans_1 [label=\"t2\\nb\""));
        assert!(dot.contains("place_0 -> trans_0;"));
        assert!(dot.contains("trans_1 -> place_2"));
    }
}
