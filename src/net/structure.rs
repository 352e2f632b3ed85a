//! 网的静态结构元素：库所、迁移、弧与标识。
use std::fmt;
use std::hash::{Hash, Hasher};

use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::net::ids::{PlaceId, TransitionId};
use crate::net::index_vec::IndexVec;

pub type Weight = u64;

/// 库所在工作流网中的角色。
#[derive(Debug, Clone, Copy, Default, Eq, PartialEq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum PlaceKind {
    /// 起始库所 `i`
    Source,
    /// 终止库所 `o`
    Sink,
    #[default]
    Internal,
}

#[derive(Clone, Serialize, Deserialize)]
pub struct Place {
    pub name: String,
    /// Current token count; mutated by the token game.
    pub tokens: Weight,
    pub kind: PlaceKind,
}

impl Place {
    pub fn new(name: impl Into<String>, tokens: Weight, kind: PlaceKind) -> Self {
        Self {
            name: name.into(),
            tokens,
            kind,
        }
    }

    pub fn internal(name: impl Into<String>, tokens: Weight) -> Self {
        Self::new(name, tokens, PlaceKind::Internal)
    }
}

// A place is identified by its name; the token count is state.
impl PartialEq for Place {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for Place {}

impl Hash for Place {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
    }
}

impl fmt::Debug for Place {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.name, self.tokens)?;
        match self.kind {
            PlaceKind::Source => f.write_str(" (source)"),
            PlaceKind::Sink => f.write_str(" (sink)"),
            PlaceKind::Internal => Ok(()),
        }
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct Transition {
    pub name: String,
    /// 按注册顺序分配的展示别名 `t1`, `t2`, …
    pub alias: String,
}

impl Transition {
    pub fn new(name: impl Into<String>, alias: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            alias: alias.into(),
        }
    }

    pub fn alias_for(id: TransitionId) -> String {
        format!("t{}", id.position())
    }
}

impl PartialEq for Transition {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for Transition {}

impl Hash for Transition {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
    }
}

impl fmt::Debug for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Transition")
            .field(&self.alias)
            .field(&self.name)
            .finish()
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum ArcDirection {
    #[serde(alias = "Place to Transition")]
    PlaceToTransition,
    #[serde(alias = "Transition to Place")]
    TransitionToPlace,
}

impl fmt::Display for ArcDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ArcDirection::PlaceToTransition => "Place to Transition",
            ArcDirection::TransitionToPlace => "Transition to Place",
        })
    }
}

/// Unweighted arc; `(place, transition, direction)` is unique within a net.
#[derive(Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Arc {
    pub place: PlaceId,
    pub transition: TransitionId,
    pub direction: ArcDirection,
}

impl Arc {
    pub fn new(place: PlaceId, transition: TransitionId, direction: ArcDirection) -> Self {
        Self {
            place,
            transition,
            direction,
        }
    }
}

impl fmt::Debug for Arc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.direction {
            ArcDirection::PlaceToTransition => {
                write!(f, "{:?} -> {:?}", self.place, self.transition)
            }
            ArcDirection::TransitionToPlace => {
                write!(f, "{:?} -> {:?}", self.transition, self.place)
            }
        }
    }
}

/// 按库所顺序排列的 token 向量。
///
/// 相等性是逐分量比较；哈希按位置依次混入每个分量，因此“同样的 token 分布在不同库所”
/// 会得到不同的键。
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Marking(pub IndexVec<PlaceId, Weight>);

impl Marking {
    pub fn new(tokens: IndexVec<PlaceId, Weight>) -> Self {
        Self(tokens)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (PlaceId, &Weight)> {
        self.0.iter_enumerated()
    }

    pub fn tokens(&self, place: PlaceId) -> Weight {
        self.0[place]
    }

    pub fn total(&self) -> Weight {
        self.0.iter().sum()
    }

    /// Places holding at least one token.
    pub fn marked_places(&self) -> impl Iterator<Item = PlaceId> + '_ {
        self.iter()
            .filter(|(_, tokens)| **tokens > 0)
            .map(|(place, _)| place)
    }
}

impl From<Vec<Weight>> for Marking {
    fn from(tokens: Vec<Weight>) -> Self {
        Self(IndexVec::from_vec(tokens))
    }
}

impl Hash for Marking {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_usize(self.len());
        for tokens in self.0.iter() {
            tokens.hash(state);
        }
    }
}

impl fmt::Debug for Marking {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.0.iter().join(", "))
    }
}
