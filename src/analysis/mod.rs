//! 工作流网合理性分析。
//!
//! 一个工作流网是合理的，当且仅当：每个迁移都能在某条执行中发生、
//! 从初始标识能到达正常终止标识、搜索中发现的标识都不是死锁。
pub mod reachability;
pub mod soundness;
pub mod state_graph;
pub mod workflow;

pub use reachability::{DiscoveredState, FinalMarking, Witness};
pub use soundness::{Analysis, Deadlock, SearchLimits, SoundnessAnalyzer, is_sound};
pub use state_graph::StateGraph;
pub use workflow::{WorkflowBoundary, WorkflowViolation, check_workflow_net, is_workflow_net};
