//! 输入/输出弧的邻接矩阵：行按库所、列按迁移。弧不带权重，只记录存在性。
use std::fmt;

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::net::ids::{PlaceId, TransitionId};
use crate::net::index_vec::{Idx, IndexVec};

type SmallRow = SmallVec<[bool; 8]>;

#[derive(Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Incidence {
    rows: IndexVec<PlaceId, SmallRow>,
    cols: usize,
}

impl Incidence {
    pub fn new(places: usize, transitions: usize) -> Self {
        let rows = (0..places)
            .map(|_| SmallRow::from_elem(false, transitions))
            .collect();
        Self {
            rows,
            cols: transitions,
        }
    }

    pub fn places(&self) -> usize {
        self.rows.len()
    }

    pub fn transitions(&self) -> usize {
        self.cols
    }

    pub fn push_place(&mut self) -> PlaceId {
        self.rows.push(SmallRow::from_elem(false, self.cols))
    }

    pub fn push_transition(&mut self) -> TransitionId {
        let next = TransitionId::from_usize(self.cols);
        for row in self.rows.iter_mut() {
            row.push(false);
        }
        self.cols += 1;
        next
    }

    pub fn get(&self, place: PlaceId, transition: TransitionId) -> bool {
        self.rows[place][transition.index()]
    }

    /// Marks the entry and reports whether it was newly set.
    pub fn insert(&mut self, place: PlaceId, transition: TransitionId) -> bool {
        let entry = &mut self.rows[place][transition.index()];
        !std::mem::replace(entry, true)
    }

    /// Places connected to `transition` in this matrix, in place order.
    pub fn column(&self, transition: TransitionId) -> impl Iterator<Item = PlaceId> + '_ {
        self.rows
            .iter_enumerated()
            .filter(move |(_, row)| row[transition.index()])
            .map(|(place, _)| place)
    }

    pub fn row_is_empty(&self, place: PlaceId) -> bool {
        !self.rows[place].iter().any(|connected| *connected)
    }
}

impl fmt::Debug for Incidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut list = f.debug_list();
        for row in self.rows.iter() {
            let bits: String = row.iter().map(|b| if *b { '1' } else { '0' }).collect();
            list.entry(&format_args!("{bits}"));
        }
        list.finish()
    }
}
