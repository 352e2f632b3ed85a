//! 工作流网结构检查：唯一的起始/终止库所、初始 token 全在起始库所、
//! 起始库所无入弧、终止库所无出弧。
use std::fmt;

use serde::Serialize;

use crate::net::{ArcDirection, Net, PlaceId, PlaceKind};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum WorkflowViolation {
    SourceCount { found: usize },
    SinkCount { found: usize },
    EmptySource { place: String },
    StrayTokens { place: String, tokens: u64 },
    ArcIntoSource { transition: String },
    ArcOutOfSink { transition: String },
}

impl fmt::Display for WorkflowViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SourceCount { found } => {
                write!(f, "expected exactly one source place, found {found}")
            }
            Self::SinkCount { found } => write!(f, "expected exactly one sink place, found {found}"),
            Self::EmptySource { place } => write!(f, "source place `{place}` holds no token"),
            Self::StrayTokens { place, tokens } => {
                write!(f, "place `{place}` holds {tokens} token(s) but is not the source")
            }
            Self::ArcIntoSource { transition } => {
                write!(f, "transition `{transition}` produces into the source place")
            }
            Self::ArcOutOfSink { transition } => {
                write!(f, "transition `{transition}` consumes from the sink place")
            }
        }
    }
}

/// Boundary places of a structurally valid workflow net.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkflowBoundary {
    pub source: PlaceId,
    pub sink: PlaceId,
}

/// Returns the boundary places, or the first violation found.
pub fn check_workflow_net(net: &Net) -> Result<WorkflowBoundary, WorkflowViolation> {
    let sources = net.places_of_kind(PlaceKind::Source);
    let sinks = net.places_of_kind(PlaceKind::Sink);
    let &[source] = sources.as_slice() else {
        return Err(WorkflowViolation::SourceCount {
            found: sources.len(),
        });
    };
    let &[sink] = sinks.as_slice() else {
        return Err(WorkflowViolation::SinkCount { found: sinks.len() });
    };

    let places = net.places();
    if places[source].tokens < 1 {
        return Err(WorkflowViolation::EmptySource {
            place: places[source].name.clone(),
        });
    }
    if let Some((_, place)) = places
        .iter_enumerated()
        .find(|(id, place)| *id != source && place.tokens > 0)
    {
        return Err(WorkflowViolation::StrayTokens {
            place: place.name.clone(),
            tokens: place.tokens,
        });
    }

    for arc in net.arcs() {
        let transition = || net.transitions()[arc.transition].name.clone();
        match arc.direction {
            ArcDirection::TransitionToPlace if arc.place == source => {
                return Err(WorkflowViolation::ArcIntoSource {
                    transition: transition(),
                });
            }
            ArcDirection::PlaceToTransition if arc.place == sink => {
                return Err(WorkflowViolation::ArcOutOfSink {
                    transition: transition(),
                });
            }
            _ => {}
        }
    }

    Ok(WorkflowBoundary { source, sink })
}

pub fn is_workflow_net(net: &Net) -> bool {
    match check_workflow_net(net) {
        Ok(_) => true,
        Err(violation) => {
            log::debug!("not a workflow net: {violation}");
            false
        }
    }
}
