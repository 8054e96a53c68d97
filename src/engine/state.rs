//! Conversion between cursors and traversal positions
//!
//! A cursor only makes sense against the plan it was produced from. These
//! functions check the fit and reject cursors of another shape.

use super::types::{FramePosition, TraversalState};
use crate::cursor::{
    CompositeCursor, Cursor, FrameCursor, ImplicitFilterCursor, PageCursor, RelatedFilterCursor,
};
use crate::error::{Error, Result};
use crate::planner::{BranchId, PlanShape, TraversalPlan};

fn page_position(page: &PageCursor) -> FramePosition {
    FramePosition {
        token: page.cursor.clone(),
        offset: page.offset,
        key: None,
    }
}

fn composite_positions(composite: &CompositeCursor) -> [FramePosition; 2] {
    [
        FramePosition {
            token: composite.collection_cursor.clone(),
            offset: composite.collection_offset,
            key: composite.collection_id.clone(),
        },
        FramePosition {
            token: composite.cursor.clone(),
            offset: composite.offset,
            key: None,
        },
    ]
}

fn composite_cursor(outer: &FramePosition, inner: &FramePosition) -> CompositeCursor {
    CompositeCursor {
        collection_id: outer.key.clone(),
        collection_cursor: outer.token.clone(),
        collection_offset: outer.offset,
        cursor: inner.token.clone(),
        offset: inner.offset,
    }
}

/// Replay a decoded cursor against a plan
pub(crate) fn from_cursor(plan: &TraversalPlan<'_>, cursor: &Cursor) -> Result<TraversalState> {
    if cursor.account_index >= plan.account_count() {
        return Err(Error::malformed_cursor(format!(
            "account index {} out of range for {} account(s)",
            cursor.account_index,
            plan.account_count()
        )));
    }

    let Some(frame) = &cursor.frame else {
        let depth = plan.branches.first().map_or(0, |b| b.depth());
        return Ok(TraversalState::fresh(cursor.account_index, 0, depth));
    };

    let (branch_id, frames) = match frame {
        FrameCursor::Page(page) => (None, vec![page_position(page)]),
        FrameCursor::Composite(composite) => (None, composite_positions(composite).to_vec()),
        FrameCursor::ImplicitFilter(implicit) => (
            Some(BranchId {
                entity_filter_index: implicit.entity_filter_index,
                member_filter_index: implicit.member_filter_index,
                related_index: None,
            }),
            composite_positions(&implicit.cursor).to_vec(),
        ),
        FrameCursor::RelatedFilter(related) => {
            let [scope, mut member] = composite_positions(&related.entity_cursor);
            member.key.clone_from(&related.member_id);
            (
                Some(BranchId {
                    entity_filter_index: related.entity_filter_index,
                    member_filter_index: related.member_filter_index,
                    related_index: Some(related.entity_index),
                }),
                vec![scope, member, page_position(&related.related_entity_cursor)],
            )
        }
    };

    let branch_index = match branch_id {
        Some(id) => plan.branch_index(&id),
        None => Some(0),
    };
    let branch = branch_index.and_then(|i| plan.branches.get(i).map(|b| (i, b)));

    let expected = match frame {
        FrameCursor::Page(_) => PlanShape::Flat,
        FrameCursor::Composite(_) => PlanShape::Collection,
        FrameCursor::ImplicitFilter(_) => PlanShape::ImplicitFilter,
        FrameCursor::RelatedFilter(_) => PlanShape::RelatedFilter,
    };

    match branch {
        Some((index, branch)) if branch.shape == expected && branch.depth() == frames.len() => {
            Ok(TraversalState {
                account_index: cursor.account_index,
                branch_index: index,
                frames,
            })
        }
        _ => Err(Error::malformed_cursor(format!(
            "{} cursor does not fit entity '{}'",
            frame.kind(),
            plan.entity.id
        ))),
    }
}

/// Capture a traversal position as a cursor
pub(crate) fn to_cursor(plan: &TraversalPlan<'_>, state: &TraversalState) -> Result<Cursor> {
    let branch = plan
        .branches
        .get(state.branch_index)
        .ok_or_else(|| Error::Other(format!("branch {} out of range", state.branch_index)))?;

    let frame = match (branch.shape, state.frames.as_slice()) {
        (PlanShape::Flat, [only]) => FrameCursor::Page(PageCursor {
            cursor: only.token.clone(),
            offset: only.offset,
        }),
        (PlanShape::Collection, [outer, inner]) => {
            FrameCursor::Composite(composite_cursor(outer, inner))
        }
        (PlanShape::ImplicitFilter, [scope, member]) => {
            FrameCursor::ImplicitFilter(ImplicitFilterCursor {
                entity_filter_index: branch.id.entity_filter_index,
                member_filter_index: branch.id.member_filter_index,
                cursor: composite_cursor(scope, member),
            })
        }
        (PlanShape::RelatedFilter, [scope, member, related]) => {
            FrameCursor::RelatedFilter(RelatedFilterCursor {
                entity_filter_index: branch.id.entity_filter_index,
                member_filter_index: branch.id.member_filter_index,
                entity_index: branch.id.related_index.unwrap_or_default(),
                entity_cursor: composite_cursor(scope, member),
                member_id: member.key.clone(),
                related_entity_cursor: PageCursor {
                    cursor: related.token.clone(),
                    offset: related.offset,
                },
            })
        }
        (shape, frames) => {
            return Err(Error::Other(format!(
                "{shape:?} branch with {} frame positions",
                frames.len()
            )))
        }
    };

    Ok(Cursor::new(state.account_index, Some(frame)))
}
