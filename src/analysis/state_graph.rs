//! 由搜索发现的标识构造可达图，供渲染使用。
//!
//! 节点是标识，边是 `marking --t--> marking'` 三元组；对每个已发现标识展开其全部可发生
//! 迁移，目标标识若不在发现集合中（例如正常终止标识）也会作为节点加入，但不再展开。
use std::fs;
use std::path::Path;

use indexmap::IndexMap;
use petgraph::dot::{Config, Dot};
use petgraph::graph::NodeIndex;
use petgraph::stable_graph::StableGraph;
use petgraph::visit::EdgeRef;

use crate::analysis::reachability::{DiscoveredState, FinalMarking, Witness};
use crate::net::core::escape_label;
use crate::net::{FireError, Marking, Net, PlaceId, TransitionId};

#[derive(Debug, Clone)]
pub struct TokenChange {
    pub place: PlaceId,
    pub name: String,
    pub before: u64,
    pub after: u64,
}

#[derive(Debug, Clone)]
pub struct StateNode {
    pub index: usize,
    pub marking: Marking,
    /// `place:tokens` for every marked place.
    pub label: String,
    pub enabled: Vec<TransitionId>,
    pub is_final: bool,
    /// Reached during the search but never expanded.
    pub frontier: bool,
}

impl StateNode {
    pub fn is_deadlock(&self) -> bool {
        self.enabled.is_empty() && !self.is_final && !self.frontier
    }
}

#[derive(Debug, Clone)]
pub struct StateEdge {
    pub transition: TransitionId,
    pub name: String,
    pub alias: String,
    pub changes: Vec<TokenChange>,
}

impl StateEdge {
    fn new(net: &Net, transition: TransitionId, before: &Marking, after: &Marking) -> Self {
        let changes = net
            .places()
            .iter_enumerated()
            .filter(|(place, _)| before.tokens(*place) != after.tokens(*place))
            .map(|(place, state)| TokenChange {
                place,
                name: state.name.clone(),
                before: before.tokens(place),
                after: after.tokens(place),
            })
            .collect();
        let summary = &net.transitions()[transition];
        Self {
            transition,
            name: summary.name.clone(),
            alias: summary.alias.clone(),
            changes,
        }
    }
}

#[derive(Debug, Clone)]
pub struct StateGraphStats {
    pub state_count: usize,
    pub edge_count: usize,
    pub deadlock_count: usize,
}

#[derive(Debug)]
pub struct StateGraph {
    pub graph: StableGraph<StateNode, StateEdge>,
    pub initial: NodeIndex,
    pub markings: IndexMap<Marking, NodeIndex>,
}

impl StateGraph {
    /// Expands every discovered state one step. The first state is taken as the initial one.
    pub fn from_states(
        net: &Net,
        states: &[DiscoveredState],
        target: FinalMarking,
    ) -> Result<Self, FireError> {
        let mut graph = StableGraph::new();
        let mut markings: IndexMap<Marking, NodeIndex> = IndexMap::new();
        let mut scratch = net.clone();

        for state in states {
            intern(&mut graph, &mut markings, net, &state.marking, target);
        }

        for state in states {
            let source = markings[&state.marking];
            scratch.set_marking(&state.marking)?;
            let enabled = scratch.enabled_transitions();
            graph[source].enabled = enabled.clone();
            graph[source].frontier = false;

            for transition in enabled {
                scratch.fire(transition)?;
                let next = scratch.marking();
                scratch.unfire(transition)?;
                let target_index = intern(&mut graph, &mut markings, net, &next, target);
                let edge = StateEdge::new(net, transition, &state.marking, &next);
                graph.add_edge(source, target_index, edge);
            }
        }

        let initial = match states.first() {
            Some(state) => markings[&state.marking],
            None => intern(&mut graph, &mut markings, net, &net.marking(), target),
        };

        Ok(Self {
            graph,
            initial,
            markings,
        })
    }

    /// `(from, transition, to)` triples in insertion order.
    pub fn triples(&self) -> Vec<(&Marking, TransitionId, &Marking)> {
        self.graph
            .edge_indices()
            .filter_map(|edge| {
                let (from, to) = self.graph.edge_endpoints(edge)?;
                Some((
                    &self.graph[from].marking,
                    self.graph[edge].transition,
                    &self.graph[to].marking,
                ))
            })
            .collect()
    }

    pub fn deadlocks(&self) -> Vec<NodeIndex> {
        self.graph
            .node_indices()
            .filter(|idx| self.graph[*idx].is_deadlock())
            .collect()
    }

    pub fn stats(&self) -> StateGraphStats {
        StateGraphStats {
            state_count: self.graph.node_count(),
            edge_count: self.graph.edge_count(),
            deadlock_count: self.deadlocks().len(),
        }
    }

    pub fn node(&self, index: NodeIndex) -> &StateNode {
        &self.graph[index]
    }

    pub fn contains_marking(&self, marking: &Marking) -> bool {
        self.markings.contains_key(marking)
    }

    pub fn dot(&self) -> String {
        format!(
            "{:?}",
            Dot::with_attr_getters(
                &self.graph,
                &[Config::EdgeNoLabel, Config::NodeNoLabel],
                &|_, edge| {
                    let weight = edge.weight();
                    format!(
                        "label=\"{} ({})\"",
                        escape_label(&weight.alias),
                        escape_label(&weight.name)
                    )
                },
                &|_, (_, node)| {
                    let style = if node.is_final {
                        ", style=filled, fillcolor=\"#c8e6c9\""
                    } else if node.is_deadlock() {
                        ", style=filled, fillcolor=\"#ffcdd2\""
                    } else {
                        ""
                    };
                    format!("label=\"s{}\\n{{{}}}\"{}", node.index, escape_label(&node.label), style)
                },
            )
        )
    }

    pub fn write_dot<P: AsRef<Path>>(&self, path: P) -> std::io::Result<()> {
        if let Some(parent) = path.as_ref().parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, self.dot())
    }
}

fn intern(
    graph: &mut StableGraph<StateNode, StateEdge>,
    markings: &mut IndexMap<Marking, NodeIndex>,
    net: &Net,
    marking: &Marking,
    target: FinalMarking,
) -> NodeIndex {
    if let Some(index) = markings.get(marking) {
        return *index;
    }
    let label = marking
        .marked_places()
        .map(|place| {
            let tokens = marking.tokens(place);
            let name = &net.places()[place].name;
            if tokens == 1 {
                name.clone()
            } else {
                format!("{name}:{tokens}")
            }
        })
        .collect::<Vec<_>>()
        .join(", ");
    let index = graph.add_node(StateNode {
        index: markings.len(),
        marking: marking.clone(),
        label,
        enabled: Vec::new(),
        is_final: target.matches(marking),
        frontier: true,
    });
    markings.insert(marking.clone(), index);
    index
}

/// One DOT rendering of the net per marking along the witness, initial marking first.
pub fn witness_snapshots(net: &Net, witness: &Witness) -> Result<Vec<String>, FireError> {
    let mut scratch = net.clone();
    witness
        .markings
        .iter()
        .map(|marking| {
            scratch.set_marking(marking)?;
            Ok(scratch.to_dot())
        })
        .collect()
}
