//! Planner module
//!
//! Turns an entity configuration into an ordered set of frame stacks.
//!
//! # Overview
//!
//! - A plain entity is one [`PlanShape::Flat`] branch over its own collection.
//!   Child entities are resolved from each emitted record and need no frame.
//! - A `collection` join is one [`PlanShape::Collection`] branch: the parent
//!   collection, then the entity's selector rendered per parent key.
//! - Advanced filters produce one branch per scope/member pair whose member
//!   entity is the requested one, and one per scope/member/related chain whose
//!   related entity is the requested one, in declaration order.
//!
//! Accounts wrap every branch: the whole branch list is traversed once per
//! account, in list order.

mod types;

pub use types::{Branch, BranchId, Frame, FrameRole, PlanShape, TraversalPlan};

use crate::config::{EntityConfig, FilterLevel};
use crate::error::{Error, Result};
use crate::template;
use std::collections::HashSet;

/// Template roots only available below the outermost frame
const JOIN_ROOTS: &[&str] = &["collection_id", "scope_id"];

/// Build the traversal plan of an entity
pub fn plan<'a>(entity: &'a EntityConfig, accounts: &[String]) -> Result<TraversalPlan<'a>> {
    validate_entity(entity)?;

    let branches = if let Some(collection) = &entity.collection {
        vec![Branch {
            id: BranchId::default(),
            shape: PlanShape::Collection,
            frames: vec![
                Frame::new(FrameRole::Parent, &entity.id, &collection.external_id)
                    .with_filter(collection.filter.as_ref())
                    .with_key(&collection.unique_key),
                Frame::new(FrameRole::Member, &entity.id, &entity.external_id),
            ],
        }]
    } else if !entity.advanced_filters.is_empty() {
        filter_branches(entity)?
    } else {
        vec![Branch {
            id: BranchId::default(),
            shape: PlanShape::Flat,
            frames: vec![Frame::new(FrameRole::Collection, &entity.id, &entity.external_id)],
        }]
    };

    for branch in &branches {
        validate_branch(branch)?;
    }

    Ok(TraversalPlan {
        entity,
        accounts: accounts.to_vec(),
        branches,
    })
}

fn filter_branches(entity: &EntityConfig) -> Result<Vec<Branch>> {
    let mut branches = Vec::new();

    for (scope_index, scope_filter) in entity.advanced_filters.iter().enumerate() {
        let scope = &scope_filter.scope;
        for (member_index, member_filter) in scope_filter.members.iter().enumerate() {
            let member = &member_filter.member;

            if member.entity == entity.id {
                branches.push(Branch {
                    id: BranchId {
                        entity_filter_index: scope_index,
                        member_filter_index: member_index,
                        related_index: None,
                    },
                    shape: PlanShape::ImplicitFilter,
                    frames: vec![
                        keyed_frame(FrameRole::Scope, scope)?,
                        filter_frame(FrameRole::Member, member),
                    ],
                });
            }

            for (related_index, related) in member_filter.related.iter().enumerate() {
                if related.entity != entity.id {
                    continue;
                }
                branches.push(Branch {
                    id: BranchId {
                        entity_filter_index: scope_index,
                        member_filter_index: member_index,
                        related_index: Some(related_index),
                    },
                    shape: PlanShape::RelatedFilter,
                    frames: vec![
                        keyed_frame(FrameRole::Scope, scope)?,
                        keyed_frame(FrameRole::Member, member)?,
                        filter_frame(FrameRole::Related, related),
                    ],
                });
            }
        }
    }

    if branches.is_empty() {
        return Err(Error::config(format!(
            "entity '{}' has advanced filters but none yields it",
            entity.id
        )));
    }
    Ok(branches)
}

fn filter_frame(role: FrameRole, level: &FilterLevel) -> Frame {
    Frame::new(role, &level.entity, &level.external_id).with_filter(level.filter.as_ref())
}

fn keyed_frame(role: FrameRole, level: &FilterLevel) -> Result<Frame> {
    let key = level.unique_key.as_deref().ok_or_else(|| {
        Error::missing_field(format!("{role} '{}'.unique_key", level.entity))
    })?;
    Ok(filter_frame(role, level).with_key(key))
}

fn validate_branch(branch: &Branch) -> Result<()> {
    for (depth, frame) in branch.frames.iter().enumerate() {
        for source in std::iter::once(&frame.selector).chain(frame.filter.as_ref()) {
            template::validate(source)?;
            if depth == 0 {
                let join_var = template::extract_variables(source)
                    .into_iter()
                    .find(|var| JOIN_ROOTS.contains(&var.as_str()));
                if let Some(var) = join_var {
                    return Err(Error::template(format!(
                        "'{var}' is not available in outermost {frame}"
                    )));
                }
            }
        }
    }
    Ok(())
}

/// Check an entity definition, recursively through its children
pub fn validate_entity(entity: &EntityConfig) -> Result<()> {
    if entity.id.trim().is_empty() {
        return Err(Error::missing_field("entity.id"));
    }
    if entity.external_id.trim().is_empty() {
        return Err(Error::missing_field(format!("{}.external_id", entity.id)));
    }
    if entity.collection.is_some() && !entity.advanced_filters.is_empty() {
        return Err(Error::invalid_value(
            &entity.id,
            "collection and advanced_filters are mutually exclusive",
        ));
    }

    let mut seen = HashSet::new();
    for attr in &entity.attributes {
        if attr.id.trim().is_empty() {
            return Err(Error::missing_field(format!("{}.attributes[].id", entity.id)));
        }
        if !seen.insert(attr.id.as_str()) {
            return Err(Error::invalid_value(
                &entity.id,
                format!("duplicate attribute '{}'", attr.id),
            ));
        }
    }
    if entity.attributes.iter().filter(|a| a.unique_id).count() > 1 {
        return Err(Error::invalid_value(
            &entity.id,
            "at most one attribute may be the unique id",
        ));
    }

    let mut child_ids = HashSet::new();
    for child in &entity.child_entities {
        if !child_ids.insert(child.id.as_str()) {
            return Err(Error::invalid_value(
                &entity.id,
                format!("duplicate child entity '{}'", child.id),
            ));
        }
        if child.collection.is_some() || !child.advanced_filters.is_empty() {
            return Err(Error::invalid_value(
                &child.id,
                "child entities are resolved from their parent record and cannot be joined",
            ));
        }
        validate_entity(child)?;
    }

    Ok(())
}
