//! 网描述（前端提交的 JSON）到 [`Net`] 的装载。
//!
//! 库所按 1 起始的位置引用；`inputPlace` 命名为 `i`，`outputPlace` 命名为 `o`，其余库所以
//! 位置编号命名。弧以库所位置、迁移名与方向标签描述。
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::net::core::{Net, NetError};
use crate::net::ids::PlaceId;
use crate::net::index_vec::Idx;
use crate::net::structure::{ArcDirection, Place, PlaceKind, Weight};

pub const SOURCE_NAME: &str = "i";
pub const SINK_NAME: &str = "o";

#[derive(Debug, Error)]
pub enum DescriptionError {
    #[error("place {position}: `{value}` is not a token count")]
    TokenCount { position: usize, value: String },
    #[error("place reference `{0}` is not a 1-based place position")]
    PlaceReference(String),
    #[error("place position {position} is out of range (net has {places} places)")]
    PlaceOutOfRange { position: usize, places: usize },
    #[error("transition `{0}` is not declared")]
    UnknownTransition(String),
    #[error("input and output place are both position {0}")]
    SamePlace(usize),
    #[error(transparent)]
    Net(#[from] NetError),
}

/// Numbers arrive either as JSON numbers or as their decimal spelling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Count {
    Number(u64),
    Text(String),
}

impl Count {
    fn parse(&self) -> Option<u64> {
        match self {
            Count::Number(value) => Some(*value),
            Count::Text(text) => text.trim().parse().ok(),
        }
    }

    fn spelled(&self) -> String {
        match self {
            Count::Number(value) => value.to_string(),
            Count::Text(text) => text.clone(),
        }
    }
}

impl From<u64> for Count {
    fn from(value: u64) -> Self {
        Count::Number(value)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArcDescription {
    pub place: Count,
    pub transition: String,
    pub direction: ArcDirection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetDescription {
    /// Initial token count per place, in place order.
    pub places: Vec<Count>,
    pub input_place: usize,
    pub output_place: usize,
    pub transitions: Vec<String>,
    #[serde(default)]
    pub arcs: Vec<ArcDescription>,
}

impl NetDescription {
    pub fn build(&self) -> Result<Net, DescriptionError> {
        let places = self.places.len();
        for position in [self.input_place, self.output_place] {
            if position == 0 || position > places {
                return Err(DescriptionError::PlaceOutOfRange { position, places });
            }
        }
        if self.input_place == self.output_place {
            return Err(DescriptionError::SamePlace(self.input_place));
        }

        let mut net = Net::empty();
        for (idx, count) in self.places.iter().enumerate() {
            let position = idx + 1;
            let tokens: Weight = count.parse().ok_or_else(|| DescriptionError::TokenCount {
                position,
                value: count.spelled(),
            })?;
            let place = if position == self.input_place {
                Place::new(SOURCE_NAME, tokens, PlaceKind::Source)
            } else if position == self.output_place {
                Place::new(SINK_NAME, tokens, PlaceKind::Sink)
            } else {
                Place::internal(position.to_string(), tokens)
            };
            net.add_place(place)?;
        }

        for name in &self.transitions {
            net.add_transition(name.as_str())?;
        }

        for arc in &self.arcs {
            let place = self.resolve_place(&arc.place)?;
            let transition = net
                .transition_id(&arc.transition)
                .ok_or_else(|| DescriptionError::UnknownTransition(arc.transition.clone()))?;
            net.add_arc(place, transition, arc.direction)?;
        }

        log::debug!(
            "loaded net with {} places, {} transitions, {} arcs",
            net.places_len(),
            net.transitions_len(),
            net.arcs().len()
        );
        Ok(net)
    }

    fn resolve_place(&self, reference: &Count) -> Result<PlaceId, DescriptionError> {
        let position = reference
            .parse()
            .and_then(|position| usize::try_from(position).ok())
            .ok_or_else(|| DescriptionError::PlaceReference(reference.spelled()))?;
        if position == 0 || position > self.places.len() {
            return Err(DescriptionError::PlaceOutOfRange {
                position,
                places: self.places.len(),
            });
        }
        Ok(PlaceId::from_usize(position - 1))
    }
}

impl TryFrom<&NetDescription> for Net {
    type Error = DescriptionError;

    fn try_from(description: &NetDescription) -> Result<Self, Self::Error> {
        description.build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::net::structure::Marking;

    const SEQUENCE: &str = r#"{
        "places": ["1", "0", 0],
        "inputPlace": 1,
        "outputPlace": 3,
        "transitions": ["a", "b"],
        "arcs": [
            {"place": "1", "transition": "a", "direction": "Place to Transition"},
            {"place": "2", "transition": "a", "direction": "Transition to Place"},
            {"place": 2, "transition": "b", "direction": "Place to Transition"},
            {"place": "3", "transition": "b", "direction": "Transition to Place"}
        ]
    }"#;

    #[test]
    fn builds_named_places_and_arcs() {
        let description: NetDescription = serde_json::from_str(SEQUENCE).unwrap();
        let net = description.build().unwrap();

        let names: Vec<_> = net.places().iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["i", "2", "o"]);
        assert_eq!(net.places_of_kind(PlaceKind::Source), vec![PlaceId::new(0)]);
        assert_eq!(net.places_of_kind(PlaceKind::Sink), vec![PlaceId::new(2)]);
        assert_eq!(net.arcs().len(), 4);
        assert_eq!(net.marking(), Marking::from(vec![1, 0, 0]));
    }

    #[test]
    fn rejects_unknown_transition() {
        let mut description: NetDescription = serde_json::from_str(SEQUENCE).unwrap();
        description.arcs[0].transition = "zzz".into();
        assert!(matches!(
            description.build(),
            Err(DescriptionError::UnknownTransition(name)) if name == "zzz"
        ));
    }

    #[test]
    fn rejects_bad_place_references() {
        let mut description: NetDescription = serde_json::from_str(SEQUENCE).unwrap();
        description.arcs[1].place = Count::Number(4);
        assert!(matches!(
            description.build(),
            Err(DescriptionError::PlaceOutOfRange { position: 4, places: 3 })
        ));

        description.arcs[1].place = Count::Text("two".into());
        assert!(matches!(
            description.build(),
            Err(DescriptionError::PlaceReference(_))
        ));

        // Wider than usize on 32-bit targets; must never wrap into a valid position.
        description.arcs[1].place = Count::Number(u64::MAX);
        assert!(matches!(
            description.build(),
            Err(DescriptionError::PlaceReference(_) | DescriptionError::PlaceOutOfRange { .. })
        ));
        description.arcs[1].place = Count::Number((1u64 << 32) + 2);
        assert!(matches!(
            description.build(),
            Err(DescriptionError::PlaceReference(_) | DescriptionError::PlaceOutOfRange { .. })
        ));
    }

    #[test]
    fn rejects_malformed_tokens_and_boundaries() {
        let mut description: NetDescription = serde_json::from_str(SEQUENCE).unwrap();
        description.places[1] = Count::Text("-1".into());
        assert!(matches!(
            description.build(),
            Err(DescriptionError::TokenCount { position: 2, .. })
        ));

        let mut description: NetDescription = serde_json::from_str(SEQUENCE).unwrap();
        description.output_place = 1;
        assert!(matches!(description.build(), Err(DescriptionError::SamePlace(1))));
    }

    #[test]
    fn duplicate_transition_surfaces_net_error() {
        let mut description: NetDescription = serde_json::from_str(SEQUENCE).unwrap();
        description.transitions.push("a".into());
        assert!(matches!(
            description.build(),
            Err(DescriptionError::Net(NetError::DuplicateTransition(_)))
        ));
    }
}
