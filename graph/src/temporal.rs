//! Navigation across the committed versions of an element.
//!
//! A version of an element is identified by a transaction in its history.
//! Staged elements have no history.

use chrono::{DateTime, Utc};
use tessera_core::{EntityId, EntityRef, IdentityCell, TxTime};
use tessera_store::{FactStore, TxInfo};

use crate::context::TxContext;
use crate::element::Element;
use crate::error::{GraphError, GraphResult};

/// Predicate over transaction metadata.
pub type TxFilter = Box<dyn Fn(&TxInfo) -> bool>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeDirection {
    Forward,
    Backward,
}

/// A transaction time with its wall-clock instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TxStamp {
    pub t: TxTime,
    pub instant: DateTime<Utc>,
}

impl From<&TxInfo> for TxStamp {
    fn from(info: &TxInfo) -> Self {
        Self {
            t: info.t,
            instant: info.instant,
        }
    }
}

/// The half-open interval `[start, end)` during which a version held.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VersionInterval {
    pub start: TxStamp,
    /// `None` while the version is current.
    pub end: Option<TxStamp>,
}

impl VersionInterval {
    pub fn is_current(&self) -> bool {
        self.end.is_none()
    }

    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        instant >= self.start.instant && self.end.map_or(true, |end| instant < end.instant)
    }
}

fn history<S: FactStore>(ctx: &TxContext<'_, S>, entity: EntityId) -> GraphResult<Vec<TxTime>> {
    Ok(ctx.store().history(entity)?)
}

/// The transaction of the version `element` represents.
///
/// For a pinned element, the latest change at or before its snapshot; for a
/// live element, the latest change overall.
pub fn time_id<S: FactStore>(ctx: &TxContext<'_, S>, element: &Element) -> GraphResult<Option<TxTime>> {
    let entity = match element.entity_id() {
        Some(entity) => entity,
        None => return Ok(None),
    };
    let history = history(ctx, entity)?;
    Ok(match element.snapshot() {
        Some(at) => history.into_iter().filter(|t| *t <= at).last(),
        None => history.last().copied(),
    })
}

/// The version before `element`, or `None` at the first version.
pub fn previous_version<S: FactStore>(
    ctx: &TxContext<'_, S>,
    element: &Element,
) -> GraphResult<Option<Element>> {
    let (entity, current) = match located(ctx, element)? {
        Some(located) => located,
        None => return Ok(None),
    };
    let previous = history(ctx, entity)?.into_iter().filter(|t| *t < current).last();
    match previous {
        Some(t) => ctx.get_pinned_element(element.id(), t),
        None => Ok(None),
    }
}

/// The version after `element`.
///
/// When that version is the latest one, the live element is returned, even
/// if the latest transaction deleted it.
pub fn next_version<S: FactStore>(
    ctx: &TxContext<'_, S>,
    element: &Element,
) -> GraphResult<Option<Element>> {
    let (entity, current) = match located(ctx, element)? {
        Some(located) => located,
        None => return Ok(None),
    };
    let history = history(ctx, entity)?;
    let mut later = history.into_iter().filter(|t| *t > current);
    match (later.next(), later.next()) {
        (Some(_), None) => live_version(ctx, element).map(Some),
        (Some(t), Some(_)) => ctx.get_pinned_element(element.id(), t),
        (None, _) => Ok(None),
    }
}

/// The interval during which the version of `element` held.
pub fn version_interval<S: FactStore>(
    ctx: &TxContext<'_, S>,
    element: &Element,
) -> GraphResult<VersionInterval> {
    let (entity, current) =
        located(ctx, element)?.ok_or(GraphError::NoHistory { id: element.id() })?;
    let next = history(ctx, entity)?.into_iter().find(|t| *t > current);

    let start = TxStamp::from(&ctx.store().tx_info(current)?);
    let end = match next {
        Some(t) => Some(TxStamp::from(&ctx.store().tx_info(t)?)),
        None => None,
    };
    Ok(VersionInterval { start, end })
}

/// Versions of `element` in `direction`, starting next to it.
///
/// Versions whose transaction does not satisfy `filter` are skipped.
pub fn version_sequence<'c, 'g, S: FactStore>(
    ctx: &'c TxContext<'g, S>,
    element: &Element,
    direction: TimeDirection,
    filter: Option<TxFilter>,
) -> GraphResult<VersionSequence<'c, 'g, S>> {
    let (times, latest) = match located(ctx, element)? {
        Some((entity, current)) => {
            let history = history(ctx, entity)?;
            let latest = history.last().copied();
            match direction {
                TimeDirection::Forward => {
                    let times: Vec<TxTime> = history.into_iter().filter(|t| *t > current).collect();
                    (times, latest)
                }
                TimeDirection::Backward => {
                    let times: Vec<TxTime> = history.into_iter().rev().filter(|t| *t < current).collect();
                    (times, None)
                }
            }
        }
        None => (Vec::new(), None),
    };
    Ok(VersionSequence {
        ctx,
        element: element.clone(),
        times,
        latest,
        filter,
    })
}

/// A lazy, restartable sequence of element versions.
///
/// A forward sequence ends on the live element.
pub struct VersionSequence<'c, 'g, S: FactStore> {
    ctx: &'c TxContext<'g, S>,
    element: Element,
    times: Vec<TxTime>,
    /// Set for forward sequences only.
    latest: Option<TxTime>,
    filter: Option<TxFilter>,
}

impl<'c, 'g, S: FactStore> VersionSequence<'c, 'g, S> {
    /// Candidate transactions, before filtering.
    pub fn times(&self) -> &[TxTime] {
        &self.times
    }

    /// Iterate from the start. Each call restarts the sequence.
    pub fn iter(&self) -> impl Iterator<Item = GraphResult<Element>> + '_ {
        self.times
            .iter()
            .filter_map(move |t| self.version_at(*t).transpose())
    }

    fn version_at(&self, t: TxTime) -> GraphResult<Option<Element>> {
        if let Some(filter) = &self.filter {
            let info = self.ctx.store().tx_info(t)?;
            if !filter(&info) {
                return Ok(None);
            }
        }
        if self.latest == Some(t) {
            return live_version(self.ctx, &self.element).map(Some);
        }
        self.ctx.get_pinned_element(self.element.id(), t)
    }
}

/// The live handle of a committed element; a deleted element keeps its last kind.
fn live_version<S: FactStore>(ctx: &TxContext<'_, S>, element: &Element) -> GraphResult<Element> {
    Ok(match ctx.get_live_element(element.id())? {
        Some(live) => live,
        None => element.live(IdentityCell::new(element.identity())),
    })
}

/// The permanent entity and current transaction of a committed element.
fn located<S: FactStore>(
    ctx: &TxContext<'_, S>,
    element: &Element,
) -> GraphResult<Option<(EntityId, TxTime)>> {
    let entity = match element.identity().entity_ref() {
        EntityRef::Perm(entity) => entity,
        EntityRef::Temp(_) => return Ok(None),
    };
    Ok(time_id(ctx, element)?.map(|t| (entity, t)))
}
