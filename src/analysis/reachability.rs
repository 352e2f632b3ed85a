//! 有界深度优先的状态空间搜索。
//!
//! 两种搜索共享同一套发生/逆发生语义：进入分支前 `fire`，返回前 `unfire`，
//! 因此无论分支以何种方式结束，网的当前标识都会恢复到调用前的值。
//! 超过深度上限的分支视为“不确定”，与真正的失败不作区分。
use indexmap::{IndexMap, IndexSet};

use crate::net::{FireError, Marking, Net, PlaceId, TransitionId, Weight};

pub const DEFAULT_COMPLETION_DEPTH: usize = 100;
pub const DEFAULT_LIVENESS_DEPTH: usize = 100;
pub const DEFAULT_DEADLOCK_DEPTH: usize = 10;

/// 正常终止标识：终止库所恰好持有起始库所最初的 token 数，其余库所为空。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FinalMarking {
    pub sink: PlaceId,
    pub tokens: Weight,
}

impl FinalMarking {
    /// Target for a net whose source currently holds the initial tokens.
    pub fn new(net: &Net, source: PlaceId, sink: PlaceId) -> Self {
        Self {
            sink,
            tokens: net.places()[source].tokens,
        }
    }

    pub fn is_reached(&self, net: &Net) -> bool {
        net.places().iter_enumerated().all(|(place, state)| {
            if place == self.sink {
                state.tokens == self.tokens
            } else {
                state.tokens == 0
            }
        })
    }

    pub fn matches(&self, marking: &Marking) -> bool {
        marking
            .iter()
            .all(|(place, tokens)| *tokens == if place == self.sink { self.tokens } else { 0 })
    }
}

/// A marking first reached during a completion search, with the firing sequence that led
/// there from the search root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredState {
    pub marking: Marking,
    pub path: Vec<TransitionId>,
}

/// Accepting trace: `markings[k]` is the marking before `transitions[k]` fires, the last
/// entry is the final marking.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Witness {
    pub transitions: Vec<TransitionId>,
    pub markings: Vec<Marking>,
}

impl Witness {
    pub fn len(&self) -> usize {
        self.transitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transitions.is_empty()
    }

    /// `(before, transition, after)` for each step.
    pub fn steps(&self) -> impl Iterator<Item = (&Marking, TransitionId, &Marking)> {
        self.transitions
            .iter()
            .zip(self.markings.windows(2))
            .map(|(transition, pair)| (&pair[0], *transition, &pair[1]))
    }
}

#[derive(Debug, Clone)]
pub struct CompletionOutcome {
    pub reached: bool,
    /// Every marking visited, in visit order, deduplicated by value.
    pub states: Vec<DiscoveredState>,
    pub witness: Option<Witness>,
}

/// 搜索能否从当前标识到达正常终止标识。已访问的标识（按值）不会再次展开，
/// 所以环路会在第二次到达时被剪掉。
pub struct CompletionSearch<'n> {
    net: &'n mut Net,
    target: FinalMarking,
    depth_limit: usize,
    visited: IndexMap<Marking, Vec<TransitionId>>,
    path: Vec<TransitionId>,
    witness: Option<Witness>,
}

impl<'n> CompletionSearch<'n> {
    pub fn new(net: &'n mut Net, target: FinalMarking, depth_limit: usize) -> Self {
        Self {
            net,
            target,
            depth_limit,
            visited: IndexMap::new(),
            path: Vec::new(),
            witness: None,
        }
    }

    /// Seeds the recorded paths with the firing sequence that reached the search root,
    /// so restarts from a discovered state report paths from the initial marking.
    pub fn with_prefix(mut self, prefix: Vec<TransitionId>) -> Self {
        self.path = prefix;
        self
    }

    pub fn run(mut self) -> Result<CompletionOutcome, FireError> {
        let root = self.net.marking();
        let reached = self.explore(0)?;
        debug_assert_eq!(self.net.marking(), root, "completion search leaked a firing");
        log::debug!(
            "completion search: reached={} states={} limit={}",
            reached,
            self.visited.len(),
            self.depth_limit
        );
        Ok(CompletionOutcome {
            reached,
            states: self
                .visited
                .into_iter()
                .map(|(marking, path)| DiscoveredState { marking, path })
                .collect(),
            witness: self.witness,
        })
    }

    fn explore(&mut self, depth: usize) -> Result<bool, FireError> {
        if depth > self.depth_limit {
            log::trace!("completion branch cut at depth {depth}");
            return Ok(false);
        }
        let marking = self.net.marking();
        if self.visited.contains_key(&marking) {
            return Ok(false);
        }
        self.visited.insert(marking, self.path.clone());

        let mut reached = false;
        for transition in self.net.enabled_transitions() {
            self.net.fire(transition)?;
            self.path.push(transition);

            // Siblings of an accepting firing are explored too.
            if self.target.is_reached(self.net) {
                if self.witness.is_none() {
                    self.witness = Some(self.capture_witness()?);
                }
                reached = true;
            } else if self.explore(depth + 1)? {
                reached = true;
            }

            self.path.pop();
            self.net.unfire(transition)?;
        }
        Ok(reached)
    }

    /// Replays the current path backwards on a copy of the net.
    fn capture_witness(&self) -> Result<Witness, FireError> {
        let mut replay = self.net.clone();
        let mut markings = vec![replay.marking()];
        for &transition in self.path.iter().rev() {
            replay.unfire(transition)?;
            markings.push(replay.marking());
        }
        markings.reverse();
        Ok(Witness {
            transitions: self.path.clone(),
            markings,
        })
    }
}

#[derive(Debug, Clone)]
pub struct LivenessOutcome {
    pub live: bool,
    /// Transitions seen firing in any explored branch, in discovery order.
    pub witnessed: IndexSet<TransitionId>,
}

impl LivenessOutcome {
    pub fn never_fired(&self, net: &Net) -> Vec<TransitionId> {
        net.transitions()
            .indices()
            .filter(|transition| !self.witnessed.contains(transition))
            .collect()
    }
}

/// 搜索是否每个迁移都能在某条执行中发生。
pub struct LivenessSearch<'n> {
    net: &'n mut Net,
    target: FinalMarking,
    depth_limit: usize,
    witnessed: IndexSet<TransitionId>,
    // The witnessed set only grows, so its size identifies it. The value is the shallowest
    // depth the pair was expanded at; a deeper revisit has less budget and is pruned.
    expanded: IndexMap<(Marking, usize), usize>,
}

impl<'n> LivenessSearch<'n> {
    pub fn new(net: &'n mut Net, target: FinalMarking, depth_limit: usize) -> Self {
        Self {
            net,
            target,
            depth_limit,
            witnessed: IndexSet::new(),
            expanded: IndexMap::new(),
        }
    }

    pub fn run(mut self) -> Result<LivenessOutcome, FireError> {
        let root = self.net.marking();
        let live = self.explore(0)?;
        debug_assert_eq!(self.net.marking(), root, "liveness search leaked a firing");
        log::debug!(
            "liveness search: live={} witnessed={}/{}",
            live,
            self.witnessed.len(),
            self.net.transitions_len()
        );
        Ok(LivenessOutcome {
            live,
            witnessed: self.witnessed,
        })
    }

    fn all_witnessed(&self) -> bool {
        self.witnessed.len() == self.net.transitions_len()
    }

    fn explore(&mut self, depth: usize) -> Result<bool, FireError> {
        if depth > self.depth_limit {
            return Ok(false);
        }
        if self.all_witnessed() {
            return Ok(true);
        }
        let key = (self.net.marking(), self.witnessed.len());
        if self.expanded.get(&key).is_some_and(|&seen| seen <= depth) {
            return Ok(false);
        }
        self.expanded.insert(key, depth);

        for transition in self.net.enabled_transitions() {
            self.witnessed.insert(transition);
            self.net.fire(transition)?;
            // Reaching the end only counts once every transition has been seen.
            let live = if self.target.is_reached(self.net) {
                self.all_witnessed()
            } else {
                self.explore(depth + 1)?
            };
            self.net.unfire(transition)?;
            if live {
                return Ok(true);
            }
        }
        Ok(false)
    }
}
