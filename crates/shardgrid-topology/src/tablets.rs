//! Tablet catalog: per-table tablet maps.
//!
//! A table's token ring is cut into a power-of-two number of equal
//! tablets. Tablet `i` owns the tokens whose biased value has `i` in its
//! top `log2(tablet_count)` bits, so token → tablet lookup is a shift.

use std::collections::HashMap;
use std::fmt;

use crate::error::{TopologyError, TopologyResult};
use crate::types::{ReplicaList, TableId, TabletId, TabletInfo, TabletTransitionInfo, Token, TokenRange};

/// Upper bound on tablets per table.
pub const MAX_TABLET_COUNT: usize = 1 << 20;

/// Replica assignment for every tablet of one table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TabletMap {
    tablets: Vec<TabletInfo>,
    transitions: HashMap<TabletId, TabletTransitionInfo>,
    log2_tablets: u32,
}

impl TabletMap {
    /// Create a map of `tablet_count` tablets with empty replica sets.
    ///
    /// `tablet_count` must be a power of two no larger than
    /// [`MAX_TABLET_COUNT`].
    pub fn new(tablet_count: usize) -> TopologyResult<Self> {
        if !tablet_count.is_power_of_two() {
            return Err(TopologyError::TabletCountNotPowerOfTwo(tablet_count));
        }
        if tablet_count > MAX_TABLET_COUNT {
            return Err(TopologyError::TabletCountTooLarge {
                count: tablet_count,
                max: MAX_TABLET_COUNT,
            });
        }
        Ok(Self {
            tablets: vec![TabletInfo::default(); tablet_count],
            transitions: HashMap::new(),
            log2_tablets: tablet_count.trailing_zeros(),
        })
    }

    pub fn tablet_count(&self) -> usize {
        self.tablets.len()
    }

    pub fn first_tablet(&self) -> TabletId {
        TabletId(0)
    }

    pub fn last_tablet(&self) -> TabletId {
        TabletId(self.tablets.len() as u64 - 1)
    }

    /// The tablet following `id`, or `None` if `id` is the last one.
    pub fn next_tablet(&self, id: TabletId) -> Option<TabletId> {
        let next = id.0 + 1;
        (next < self.tablets.len() as u64).then_some(TabletId(next))
    }

    pub fn tablet_ids(&self) -> impl Iterator<Item = TabletId> + '_ {
        (0..self.tablets.len() as u64).map(TabletId)
    }

    /// All tablets in id order.
    pub fn tablets(&self) -> impl Iterator<Item = (TabletId, &TabletInfo)> + '_ {
        self.tablets
            .iter()
            .enumerate()
            .map(|(i, info)| (TabletId(i as u64), info))
    }

    fn check_tablet_id(&self, id: TabletId) -> TopologyResult<usize> {
        let idx = id.0 as usize;
        if id.0 >= self.tablets.len() as u64 {
            return Err(TopologyError::InvalidTabletId {
                id,
                count: self.tablets.len(),
            });
        }
        Ok(idx)
    }

    pub fn get_tablet_info(&self, id: TabletId) -> TopologyResult<&TabletInfo> {
        let idx = self.check_tablet_id(id)?;
        Ok(&self.tablets[idx])
    }

    pub fn set_tablet(&mut self, id: TabletId, info: TabletInfo) -> TopologyResult<()> {
        let idx = self.check_tablet_id(id)?;
        self.tablets[idx] = info;
        Ok(())
    }

    pub fn set_tablet_transition_info(
        &mut self,
        id: TabletId,
        info: TabletTransitionInfo,
    ) -> TopologyResult<()> {
        self.check_tablet_id(id)?;
        self.transitions.insert(id, info);
        Ok(())
    }

    pub fn get_tablet_transition_info(&self, id: TabletId) -> Option<&TabletTransitionInfo> {
        self.transitions.get(&id)
    }

    /// The tablet owning token `t`.
    pub fn get_tablet_id(&self, t: Token) -> TabletId {
        if self.log2_tablets == 0 {
            return TabletId(0);
        }
        TabletId(t.biased() >> (64 - self.log2_tablets))
    }

    /// Last token (inclusive) owned by tablet `id`.
    pub fn get_last_token(&self, id: TabletId) -> TopologyResult<Token> {
        self.check_tablet_id(id)?;
        let high = id.0.checked_shl(64 - self.log2_tablets).unwrap_or(0);
        Ok(Token::from_biased(high | (u64::MAX >> self.log2_tablets)))
    }

    /// First token owned by tablet `id`.
    pub fn get_first_token(&self, id: TabletId) -> TopologyResult<Token> {
        self.check_tablet_id(id)?;
        if id == self.first_tablet() {
            return Ok(Token::FIRST);
        }
        Ok(self.get_last_token(TabletId(id.0 - 1))?.next())
    }

    pub fn get_token_range(&self, id: TabletId) -> TopologyResult<TokenRange> {
        let end = self.get_last_token(id)?;
        let start = if id == self.first_tablet() {
            None
        } else {
            Some(self.get_last_token(TabletId(id.0 - 1))?)
        };
        Ok(TokenRange { start, end })
    }
}

impl fmt::Display for TabletMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.tablets.is_empty() {
            return f.write_str("{}");
        }
        f.write_str("{")?;
        for (i, (id, tablet)) in self.tablets().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            let last = self.get_last_token(id).map_err(|_| fmt::Error)?;
            write!(
                f,
                "\n    [{id}]: last_token={last}, replicas={}",
                ReplicaList(&tablet.replicas)
            )?;
            if let Some(tr) = self.get_tablet_transition_info(id) {
                write!(
                    f,
                    ", new_replicas={}, pending={}",
                    ReplicaList(&tr.next),
                    tr.pending_replica
                )?;
            }
        }
        f.write_str("\n  }")
    }
}

/// Tablet maps of all tablet-enabled tables.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TabletMetadata {
    tables: HashMap<TableId, TabletMap>,
}

impl TabletMetadata {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_tablet_map(&self, id: &TableId) -> TopologyResult<&TabletMap> {
        self.tables
            .get(id)
            .ok_or_else(|| TopologyError::TabletMapNotFound(id.clone()))
    }

    pub fn get_tablet_map_mut(&mut self, id: &TableId) -> TopologyResult<&mut TabletMap> {
        self.tables
            .get_mut(id)
            .ok_or_else(|| TopologyError::TabletMapNotFound(id.clone()))
    }

    /// Insert or replace the tablet map of table `id`.
    pub fn set_tablet_map(&mut self, id: TableId, map: TabletMap) {
        self.tables.insert(id, map);
    }

    pub fn all_tables(&self) -> &HashMap<TableId, TabletMap> {
        &self.tables
    }

    pub fn table_count(&self) -> usize {
        self.tables.len()
    }
}

impl fmt::Display for TabletMetadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Sorted so output is stable across runs.
        let mut ids: Vec<&TableId> = self.tables.keys().collect();
        ids.sort();
        f.write_str("{")?;
        for (i, id) in ids.into_iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "\n  {id}: {}", self.tables[id])?;
        }
        f.write_str("\n}")
    }
}
