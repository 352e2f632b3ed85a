//! 合理性判定：工作流网检查 → 活性搜索 → 完成性搜索 → 死锁扫描。
//!
//! 三项诊断（从未发生的迁移、无法正常完成、死锁标识）互不短路，全部收集后再给出结论。
use std::time::{Duration, Instant};

use itertools::Itertools;

use crate::analysis::reachability::{
    CompletionOutcome, CompletionSearch, DEFAULT_COMPLETION_DEPTH, DEFAULT_DEADLOCK_DEPTH,
    DEFAULT_LIVENESS_DEPTH, DiscoveredState, FinalMarking, LivenessOutcome, LivenessSearch,
};
use crate::analysis::state_graph::StateGraph;
use crate::analysis::workflow::{WorkflowBoundary, WorkflowViolation, check_workflow_net};
use crate::net::{FireError, Marking, Net, PlaceId, TransitionId};
use crate::report::{DeadlockState, SoundnessReport, StateSpaceInfo, WitnessTrace};

/// Depth caps for the three searches. These bound the search, they do not prove anything:
/// a net needing longer firing sequences is reported unsound.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchLimits {
    pub completion_depth: usize,
    pub liveness_depth: usize,
    pub deadlock_depth: usize,
}

impl Default for SearchLimits {
    fn default() -> Self {
        Self {
            completion_depth: DEFAULT_COMPLETION_DEPTH,
            liveness_depth: DEFAULT_LIVENESS_DEPTH,
            deadlock_depth: DEFAULT_DEADLOCK_DEPTH,
        }
    }
}

/// A discovered marking from which nothing can fire and which is not the final marking.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Deadlock {
    pub marking: Marking,
    pub path: Vec<TransitionId>,
}

#[derive(Debug)]
pub struct Analysis {
    pub workflow: Result<WorkflowBoundary, WorkflowViolation>,
    pub target: Option<FinalMarking>,
    pub liveness: Option<LivenessOutcome>,
    pub completion: Option<CompletionOutcome>,
    pub deadlocks: Vec<Deadlock>,
    pub elapsed: Duration,
}

impl Analysis {
    pub fn is_workflow_net(&self) -> bool {
        self.workflow.is_ok()
    }

    pub fn is_live(&self) -> bool {
        self.liveness.as_ref().is_some_and(|outcome| outcome.live)
    }

    pub fn completion_reached(&self) -> bool {
        self.completion.as_ref().is_some_and(|outcome| outcome.reached)
    }

    pub fn is_sound(&self) -> bool {
        self.is_workflow_net() && self.is_live() && self.completion_reached() && self.deadlocks.is_empty()
    }

    pub fn discovered_states(&self) -> &[DiscoveredState] {
        self.completion
            .as_ref()
            .map(|outcome| outcome.states.as_slice())
            .unwrap_or_default()
    }

    pub fn never_fired(&self, net: &Net) -> Vec<TransitionId> {
        self.liveness
            .as_ref()
            .map(|outcome| outcome.never_fired(net))
            .unwrap_or_default()
    }

    /// Places holding tokens in at least one deadlock, in place order.
    pub fn deadlocked_places(&self) -> Vec<PlaceId> {
        self.deadlocks
            .iter()
            .flat_map(|deadlock| deadlock.marking.marked_places())
            .sorted()
            .dedup()
            .collect()
    }

    /// Reachability graph over the discovered states; `None` when the search never ran.
    pub fn state_graph(&self, net: &Net) -> Option<Result<StateGraph, FireError>> {
        let target = self.target?;
        Some(StateGraph::from_states(net, self.discovered_states(), target))
    }

    pub fn report(&self, net: &Net) -> SoundnessReport {
        let place_name = |place: PlaceId| net.places()[place].name.clone();
        let step_name = |transition: TransitionId| {
            let summary = &net.transitions()[transition];
            format!("{} ({})", summary.alias, summary.name)
        };
        let named = |marking: &Marking| {
            marking
                .marked_places()
                .map(|place| (place_name(place), marking.tokens(place)))
                .collect::<Vec<_>>()
        };

        let mut report = SoundnessReport::new();
        report.workflow_net = self.is_workflow_net();
        report.sound = self.is_sound();
        report.violation = self.workflow.as_ref().err().map(ToString::to_string);
        report.live = self.is_live();
        report.never_fired = self
            .never_fired(net)
            .into_iter()
            .map(|transition| net.transitions()[transition].name.clone())
            .collect();
        report.completion_reached = self.completion_reached();
        report.witness = self
            .completion
            .as_ref()
            .and_then(|outcome| outcome.witness.as_ref())
            .map(|witness| WitnessTrace {
                steps: witness.transitions.iter().copied().map(step_name).collect(),
                markings: witness.markings.iter().map(named).collect(),
            });
        report.deadlocks = self
            .deadlocks
            .iter()
            .enumerate()
            .map(|(idx, deadlock)| DeadlockState {
                state_id: format!("d{idx}"),
                marking: named(&deadlock.marking),
                path: deadlock.path.iter().copied().map(step_name).collect(),
            })
            .collect();
        report.deadlocked_places = self
            .deadlocked_places()
            .into_iter()
            .map(place_name)
            .collect();
        report.state_space = self.completion.as_ref().map(|outcome| StateSpaceInfo {
            discovered_states: outcome.states.len(),
            deadlock_states: self.deadlocks.len(),
        });
        report.analysis_time = self.elapsed;
        report
    }
}

#[derive(Debug, Clone, Default)]
pub struct SoundnessAnalyzer {
    limits: SearchLimits,
}

impl SoundnessAnalyzer {
    pub fn new(limits: SearchLimits) -> Self {
        Self { limits }
    }

    pub fn limits(&self) -> SearchLimits {
        self.limits
    }

    /// Runs every stage on a copy of `net`; the caller's net is never mutated.
    pub fn analyze(&self, net: &Net) -> Result<Analysis, FireError> {
        let start_time = Instant::now();
        let mut analysis = Analysis {
            workflow: check_workflow_net(net),
            target: None,
            liveness: None,
            completion: None,
            deadlocks: Vec::new(),
            elapsed: Duration::default(),
        };

        let boundary = match &analysis.workflow {
            Ok(boundary) => *boundary,
            Err(violation) => {
                log::info!("not a workflow net: {violation}");
                analysis.elapsed = start_time.elapsed();
                return Ok(analysis);
            }
        };

        let mut work = net.clone();
        let target = FinalMarking::new(&work, boundary.source, boundary.sink);
        analysis.target = Some(target);

        let liveness = LivenessSearch::new(&mut work, target, self.limits.liveness_depth).run()?;
        if !liveness.live {
            for transition in liveness.never_fired(net) {
                log::info!(
                    "transition `{}` could not be enabled",
                    net.transitions()[transition].name
                );
            }
        }

        let completion =
            CompletionSearch::new(&mut work, target, self.limits.completion_depth).run()?;
        if !completion.reached {
            log::info!("final marking is not reachable");
        }

        analysis.deadlocks = self.scan_deadlocks(net, target, &completion.states)?;
        if !analysis.deadlocks.is_empty() {
            log::info!(
                "deadlocks found: {}",
                analysis
                    .deadlocked_places()
                    .into_iter()
                    .map(|place| &net.places()[place].name)
                    .join(" ")
            );
        }

        analysis.liveness = Some(liveness);
        analysis.completion = Some(completion);
        analysis.elapsed = start_time.elapsed();
        log::info!(
            "soundness: {} ({} states, {:?})",
            analysis.is_sound(),
            analysis.discovered_states().len(),
            analysis.elapsed
        );
        Ok(analysis)
    }

    /// Restarts a short completion search from every discovered marking, each on its own copy
    /// of the net with a fresh visited set.
    fn scan_deadlocks(
        &self,
        net: &Net,
        target: FinalMarking,
        states: &[DiscoveredState],
    ) -> Result<Vec<Deadlock>, FireError> {
        let mut deadlocks = Vec::new();
        for state in states {
            let mut restart = net.clone();
            restart.set_marking(&state.marking)?;
            let outcome = CompletionSearch::new(&mut restart, target, self.limits.deadlock_depth)
                .with_prefix(state.path.clone())
                .run()?;
            if !outcome.reached
                && restart.enabled_transitions().is_empty()
                && !target.matches(&state.marking)
            {
                log::debug!("deadlock at {:?}", state.marking);
                deadlocks.push(Deadlock {
                    marking: state.marking.clone(),
                    path: state.path.clone(),
                });
            }
        }
        Ok(deadlocks)
    }
}

/// Convenience wrapper using the default search limits.
pub fn is_sound(net: &Net) -> Result<bool, FireError> {
    Ok(SoundnessAnalyzer::default().analyze(net)?.is_sound())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::net::{Place, PlaceKind};

    struct Builder {
        net: Net,
    }

    impl Builder {
        fn new(places: &[(&str, u64, PlaceKind)], transitions: &[&str]) -> Self {
            let mut net = Net::empty();
            for (name, tokens, kind) in places {
                net.add_place(Place::new(*name, *tokens, *kind)).unwrap();
            }
            for name in transitions {
                net.add_transition(*name).unwrap();
            }
            Self { net }
        }

        fn input(mut self, place: &str, transition: &str) -> Self {
            let (p, t) = self.ids(place, transition);
            self.net.add_input_arc(p, t).unwrap();
            self
        }

        fn output(mut self, transition: &str, place: &str) -> Self {
            let (p, t) = self.ids(place, transition);
            self.net.add_output_arc(t, p).unwrap();
            self
        }

        fn ids(&self, place: &str, transition: &str) -> (PlaceId, TransitionId) {
            (
                self.net.place_id(place).unwrap(),
                self.net.transition_id(transition).unwrap(),
            )
        }
    }

    use PlaceKind::{Internal, Sink, Source};

    fn scenario_a() -> Net {
        Builder::new(&[("i", 1, Source), ("p", 0, Internal), ("o", 0, Sink)], &["a", "b"])
            .input("i", "a")
            .output("a", "p")
            .input("p", "b")
            .output("b", "o")
            .net
    }

    #[test]
    fn sequential_workflow_is_sound() {
        let net = scenario_a();
        let analysis = SoundnessAnalyzer::default().analyze(&net).unwrap();

        assert!(analysis.is_workflow_net());
        assert!(analysis.is_live());
        assert!(analysis.completion_reached());
        assert!(analysis.deadlocks.is_empty());
        assert!(analysis.is_sound());
        assert!(is_sound(&net).unwrap());

        let witness = analysis.completion.as_ref().unwrap().witness.as_ref().unwrap();
        assert_eq!(witness.markings.last(), Some(&Marking::from(vec![0, 0, 1])));
        assert_eq!(net.marking(), net.initial_marking());
    }

    #[test]
    fn transition_without_inputs_floods_the_sink() {
        // p -> a feeds back into a; b has no input place and keeps producing into o.
        let net = Builder::new(&[("i", 1, Source), ("p", 0, Internal), ("o", 0, Sink)], &["a", "b"])
            .input("i", "a")
            .output("a", "p")
            .input("p", "a")
            .output("b", "o")
            .net;
        let analysis = SoundnessAnalyzer::default().analyze(&net).unwrap();

        assert!(analysis.is_workflow_net());
        assert!(!analysis.is_live());
        assert!(!analysis.completion_reached());
        assert!(!analysis.is_sound());
        assert_eq!(analysis.never_fired(&net), vec![TransitionId::new(0)]);
        assert!(analysis.deadlocks.is_empty());
    }

    #[test]
    fn exit_competing_for_consumed_source_never_fires() {
        // b needs both i and p, but a empties i before p is ever marked.
        let net = Builder::new(&[("i", 1, Source), ("p", 0, Internal), ("o", 0, Sink)], &["a", "b"])
            .input("i", "a")
            .output("a", "p")
            .input("p", "b")
            .input("i", "b")
            .output("b", "o")
            .net;
        let analysis = SoundnessAnalyzer::default().analyze(&net).unwrap();

        assert!(!analysis.is_sound());
        assert_eq!(analysis.never_fired(&net), vec![TransitionId::new(1)]);
        assert!(!analysis.completion_reached());
        assert_eq!(
            analysis.deadlocks,
            vec![Deadlock {
                marking: Marking::from(vec![0, 1, 0]),
                path: vec![TransitionId::new(0)],
            }]
        );
        assert_eq!(analysis.deadlocked_places(), vec![PlaceId::new(1)]);
    }

    #[test]
    fn nothing_enabled_is_an_initial_deadlock() {
        let net = Builder::new(&[("i", 2, Source), ("q", 0, Internal), ("o", 0, Sink)], &["t"])
            .input("q", "t")
            .output("t", "o")
            .net;
        let analysis = SoundnessAnalyzer::default().analyze(&net).unwrap();

        assert!(!analysis.completion_reached());
        assert!(!analysis.is_sound());
        assert_eq!(analysis.deadlocks.len(), 1);
        assert_eq!(analysis.deadlocked_places(), vec![PlaceId::new(0)]);
    }

    #[test]
    fn improper_completion_leaves_a_token_behind() {
        // a forks into p and q; b only drains p, so q is left over when o is marked.
        let net = Builder::new(
            &[("i", 1, Source), ("p", 0, Internal), ("q", 0, Internal), ("o", 0, Sink)],
            &["a", "b"],
        )
        .input("i", "a")
        .output("a", "p")
        .output("a", "q")
        .input("p", "b")
        .output("b", "o")
        .net;
        let analysis = SoundnessAnalyzer::default().analyze(&net).unwrap();

        assert!(!analysis.completion_reached());
        assert!(!analysis.is_sound());
        assert_eq!(
            analysis.deadlocks.iter().map(|d| d.marking.clone()).collect::<Vec<_>>(),
            vec![Marking::from(vec![0, 0, 1, 1])]
        );
        assert_eq!(
            analysis.deadlocked_places(),
            vec![PlaceId::new(2), PlaceId::new(3)]
        );
    }

    #[test]
    fn dead_branch_next_to_an_exit_is_found() {
        // a goes straight to o, b parks the token in p with no way out.
        let net = Builder::new(&[("i", 1, Source), ("p", 0, Internal), ("o", 0, Sink)], &["a", "b"])
            .input("i", "a")
            .output("a", "o")
            .input("i", "b")
            .output("b", "p")
            .net;
        let analysis = SoundnessAnalyzer::default().analyze(&net).unwrap();

        assert!(analysis.is_live());
        assert!(analysis.completion_reached());
        let discovered: Vec<_> = analysis
            .discovered_states()
            .iter()
            .map(|state| state.marking.clone())
            .collect();
        assert!(discovered.contains(&Marking::from(vec![0, 1, 0])));
        assert_eq!(
            analysis.deadlocks,
            vec![Deadlock {
                marking: Marking::from(vec![0, 1, 0]),
                path: vec![TransitionId::new(1)],
            }]
        );
        assert!(!analysis.is_sound());
    }

    #[test]
    fn non_workflow_net_skips_the_search() {
        let net = Builder::new(&[("i", 1, Source), ("p", 0, Internal)], &["a"])
            .input("i", "a")
            .output("a", "p")
            .net;
        let analysis = SoundnessAnalyzer::default().analyze(&net).unwrap();

        assert!(!analysis.is_workflow_net());
        assert!(!analysis.is_sound());
        assert!(analysis.liveness.is_none());
        assert!(analysis.discovered_states().is_empty());
        assert!(analysis.state_graph(&net).is_none());
        let report = analysis.report(&net);
        assert!(!report.workflow_net);
        assert!(report.violation.unwrap().contains("sink"));
    }

    #[test]
    fn free_choice_with_parallel_branches_is_sound() {
        // i -> split -> (p1, p2) -> join -> o
        let net = Builder::new(
            &[
                ("i", 1, Source),
                ("p1", 0, Internal),
                ("p2", 0, Internal),
                ("q1", 0, Internal),
                ("q2", 0, Internal),
                ("o", 0, Sink),
            ],
            &["split", "left", "right", "join"],
        )
        .input("i", "split")
        .output("split", "p1")
        .output("split", "p2")
        .input("p1", "left")
        .output("left", "q1")
        .input("p2", "right")
        .output("right", "q2")
        .input("q1", "join")
        .input("q2", "join")
        .output("join", "o")
        .net;
        let analysis = SoundnessAnalyzer::default().analyze(&net).unwrap();

        assert!(analysis.is_sound());
        // i, p1p2, q1p2, p1q2, q1q2
        assert_eq!(analysis.discovered_states().len(), 5);
        let report = analysis.report(&net);
        assert_eq!(report.witness.unwrap().steps.len(), 4);
    }

    #[test]
    fn report_names_diagnostics() {
        let net = Builder::new(&[("i", 1, Source), ("p", 0, Internal), ("o", 0, Sink)], &["a", "b"])
            .input("i", "a")
            .output("a", "p")
            .input("p", "b")
            .input("i", "b")
            .output("b", "o")
            .net;
        let report = SoundnessAnalyzer::default().analyze(&net).unwrap().report(&net);

        assert!(report.workflow_net);
        assert!(!report.sound);
        assert_eq!(report.never_fired, vec!["b".to_string()]);
        assert_eq!(report.deadlocked_places, vec!["p".to_string()]);
        assert_eq!(report.deadlocks[0].path, vec!["t1 (a)".to_string()]);
        assert_eq!(report.state_space.unwrap().discovered_states, 2);
    }
}
