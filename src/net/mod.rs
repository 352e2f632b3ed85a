//! # 工作流网核心定义（无权 P/T 网）
//!
//! 设库所集合 `P` 与迁移集合 `T`，输入/输出关系 `Pre, Post ⊆ P × T`，弧不带权重。
//! 对任意标识 `M ∈ ℕ^{|P|}`：
//!
//! * 迁移 `t` **可发生** 当且仅当 `∀p: (p, t) ∈ Pre ⇒ M[p] ≥ 1`；
//! * 迁移 **发生** 后 `M'[p] = M[p] - [(p, t) ∈ Pre] + [(t, p) ∈ Post]`；
//! * **逆发生** 是发生的精确逆运算，仅用于回溯刚刚发生的迁移。
//!
//! 库所中恰有一个 `Source`（`i`）与一个 `Sink`（`o`）时，网才可能是工作流网。
//!
//! ## 示例
//!
//! ```rust
//! use wfnet::net::*;
//!
//! let mut net = Net::empty();
//! let i = net.add_place(Place::new("i", 1, PlaceKind::Source)).unwrap();
//! let o = net.add_place(Place::new("o", 0, PlaceKind::Sink)).unwrap();
//! let t = net.add_transition("finish").unwrap();
//! net.add_input_arc(i, t).unwrap();
//! net.add_output_arc(t, o).unwrap();
//!
//! assert_eq!(net.enabled_transitions(), vec![t]);
//! net.fire(t).unwrap();
//! assert_eq!(net.marking(), Marking::from(vec![0, 1]));
//! net.unfire(t).unwrap();
//! assert_eq!(net.marking(), net.initial_marking());
//! ```

pub mod core;
pub mod description;
pub mod ids;
pub mod incidence;
pub mod index_vec;
pub mod io;
pub mod structure;

pub use self::core::{FireError, Net, NetError};
pub use description::{DescriptionError, NetDescription};
pub use ids::{PlaceId, TransitionId};
pub use incidence::Incidence;
pub use index_vec::{Idx, IndexVec};
pub use structure::{Arc, ArcDirection, Marking, Place, PlaceKind, Transition, Weight};
