use std::collections::HashMap;

use thiserror::Error;
use uuid::Uuid;

use crate::domain::entities::CommentRecord;
use crate::domain::error::DomainError;

/// Roots have depth 0; replies deeper than this are refused.
pub const MAX_COMMENT_DEPTH: u8 = 5;
pub const MAX_COMMENT_CHARS: usize = 5000;

/// Trims and length-checks comment text.
pub fn normalize_content(content: &str) -> Result<String, DomainError> {
    let trimmed = content.trim();
    if trimmed.is_empty() {
        return Err(DomainError::validation("comment must not be empty"));
    }
    if trimmed.chars().count() > MAX_COMMENT_CHARS {
        return Err(DomainError::validation(format!(
            "comment exceeds {MAX_COMMENT_CHARS} characters"
        )));
    }
    Ok(trimmed.to_string())
}

/// Depth for a reply to a comment at `parent_depth`.
pub fn reply_depth(parent_depth: u8) -> Result<u8, DomainError> {
    let depth = parent_depth.saturating_add(1);
    if depth > MAX_COMMENT_DEPTH {
        return Err(DomainError::validation(format!(
            "replies are limited to depth {MAX_COMMENT_DEPTH}"
        )));
    }
    Ok(depth)
}

#[derive(Debug, Clone, PartialEq)]
pub struct CommentNode {
    pub record: CommentRecord,
    pub replies: Vec<CommentNode>,
}

#[derive(Debug, Error)]
pub enum CommentTreeError {
    #[error("comment `{id}` references itself as a parent")]
    SelfParent { id: Uuid },
    #[error("comment `{child}` references missing parent `{parent}`")]
    MissingParent { child: Uuid, parent: Uuid },
    #[error("comment `{id}` exceeds maximum depth {max_depth}")]
    DepthExceeded { id: Uuid, max_depth: u8 },
    #[error("duplicate comment id `{id}` detected")]
    DuplicateId { id: Uuid },
    #[error("comment `{id}` is disconnected from any root")]
    Disconnected { id: Uuid },
    #[error("comment `{id}` could not be materialised while building tree")]
    MissingNode { id: Uuid },
}

/// Comments on one target, arranged parent-first with replies in creation order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CommentTree {
    roots: Vec<CommentNode>,
}

impl CommentTree {
    pub fn build(mut records: Vec<CommentRecord>) -> Result<Self, CommentTreeError> {
        records.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));

        let mut nodes: HashMap<Uuid, CommentNode> = HashMap::with_capacity(records.len());
        let mut children: HashMap<Option<Uuid>, Vec<Uuid>> = HashMap::new();

        for record in records {
            if record.parent_id == Some(record.id) {
                return Err(CommentTreeError::SelfParent { id: record.id });
            }
            if nodes.contains_key(&record.id) {
                return Err(CommentTreeError::DuplicateId { id: record.id });
            }
            children.entry(record.parent_id).or_default().push(record.id);
            nodes.insert(
                record.id,
                CommentNode {
                    record,
                    replies: Vec::new(),
                },
            );
        }

        for (parent, child_ids) in &children {
            if let Some(parent) = parent
                && !nodes.contains_key(parent)
                && let Some(&child) = child_ids.first()
            {
                return Err(CommentTreeError::MissingParent {
                    child,
                    parent: *parent,
                });
            }
        }

        let mut roots = Vec::new();
        if let Some(root_ids) = children.get(&None) {
            for &root_id in root_ids {
                roots.push(assemble(root_id, 0, &mut nodes, &children)?);
            }
        }

        // Anything left over sits on a parent cycle.
        if let Some(&id) = nodes.keys().min() {
            return Err(CommentTreeError::Disconnected { id });
        }

        Ok(Self { roots })
    }

    pub fn roots(&self) -> &[CommentNode] {
        &self.roots
    }

    pub fn into_roots(self) -> Vec<CommentNode> {
        self.roots
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    /// Depth-first, parent-before-children traversal. Each call starts over.
    pub fn walk(&self) -> Walk<'_> {
        Walk {
            stack: self.roots.iter().rev().collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.walk().count()
    }
}

/// Iterator behind [`CommentTree::walk`]. Uses an explicit stack, so it never
/// recurses and stops after every node has been yielded once.
#[derive(Debug, Clone)]
pub struct Walk<'a> {
    stack: Vec<&'a CommentNode>,
}

impl<'a> Iterator for Walk<'a> {
    type Item = &'a CommentNode;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        self.stack.extend(node.replies.iter().rev());
        Some(node)
    }
}

fn assemble(
    id: Uuid,
    depth: u8,
    nodes: &mut HashMap<Uuid, CommentNode>,
    children: &HashMap<Option<Uuid>, Vec<Uuid>>,
) -> Result<CommentNode, CommentTreeError> {
    if depth > MAX_COMMENT_DEPTH {
        return Err(CommentTreeError::DepthExceeded {
            id,
            max_depth: MAX_COMMENT_DEPTH,
        });
    }

    let mut node = nodes
        .remove(&id)
        .ok_or(CommentTreeError::MissingNode { id })?;

    if let Some(child_ids) = children.get(&Some(id)) {
        for &child_id in child_ids {
            node.replies
                .push(assemble(child_id, depth + 1, nodes, children)?);
        }
    }

    Ok(node)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::CommentTarget;
    use time::{Duration, OffsetDateTime};

    fn comment(id: u128, parent: Option<u128>, depth: u8, minute: i64) -> CommentRecord {
        let at = OffsetDateTime::UNIX_EPOCH + Duration::minutes(minute);
        CommentRecord {
            id: Uuid::from_u128(id),
            target: CommentTarget::Story(Uuid::nil()),
            parent_id: parent.map(Uuid::from_u128),
            user_id: Uuid::nil(),
            content: format!("comment {id}"),
            depth,
            upvotes: 0,
            downvotes: 0,
            likes_count: 0,
            selected_text: None,
            text_position: None,
            created_at: at,
            updated_at: at,
        }
    }

    #[test]
    fn replies_follow_creation_order() {
        let tree = CommentTree::build(vec![
            comment(3, Some(1), 1, 5),
            comment(1, None, 0, 1),
            comment(2, Some(1), 1, 3),
            comment(4, None, 0, 2),
        ])
        .expect("tree");

        let order: Vec<u128> = tree.walk().map(|node| node.record.id.as_u128()).collect();
        assert_eq!(order, vec![1, 2, 3, 4]);
        assert_eq!(tree.roots().len(), 2);
    }

    #[test]
    fn walk_restarts_from_the_top() {
        let tree = CommentTree::build(vec![comment(1, None, 0, 1), comment(2, Some(1), 1, 2)])
            .expect("tree");

        let mut first = tree.walk();
        assert!(first.next().is_some());
        assert_eq!(tree.walk().count(), 2);
        assert_eq!(tree.len(), 2);
    }

    #[test]
    fn missing_parent_is_reported() {
        let err = CommentTree::build(vec![comment(2, Some(9), 1, 1)]).expect_err("orphan");
        assert!(matches!(err, CommentTreeError::MissingParent { .. }));
    }

    #[test]
    fn parent_cycles_are_reported() {
        let records = vec![
            comment(1, None, 0, 0),
            comment(2, Some(3), 1, 1),
            comment(3, Some(2), 1, 2),
        ];
        let err = CommentTree::build(records).expect_err("cycle");
        assert!(matches!(
            err,
            CommentTreeError::Disconnected { id } if id == Uuid::from_u128(2)
        ));
    }

    #[test]
    fn depth_bound_applies_to_replies() {
        assert_eq!(reply_depth(4).expect("depth 5 allowed"), 5);
        assert!(reply_depth(MAX_COMMENT_DEPTH).is_err());
    }

    #[test]
    fn content_is_trimmed_and_bounded() {
        assert_eq!(normalize_content("  hi  ").expect("valid"), "hi");
        assert!(normalize_content("   ").is_err());
        assert!(normalize_content(&"x".repeat(MAX_COMMENT_CHARS + 1)).is_err());
    }
}
