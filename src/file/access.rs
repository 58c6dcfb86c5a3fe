//! Ownership checks for nodes.

use crate::{Result, VaultError};

use super::node::Node;

/// Fail with `Forbidden` unless `node` belongs to `owner_id`.
pub fn assert_ownership(owner_id: i64, node: &Node) -> Result<()> {
    if node.owner_id != owner_id {
        tracing::debug!(
            owner_id,
            node_id = node.id,
            node_owner = node.owner_id,
            "ownership check failed"
        );
        return Err(VaultError::Forbidden(format!(
            "{} {} belongs to another owner",
            node.kind, node.id
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::file::NodeKind;
    use chrono::Utc;

    fn node_owned_by(owner_id: i64) -> Node {
        Node {
            id: 10,
            name: "Docs".to_string(),
            kind: NodeKind::Folder,
            parent_id: None,
            owner_id,
            physical_ref: None,
            size: None,
            content_type: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_owner_passes() {
        let node = node_owned_by(1);
        assert!(assert_ownership(1, &node).is_ok());
    }

    #[test]
    fn test_other_owner_forbidden() {
        let node = node_owned_by(1);

        let result = assert_ownership(2, &node);

        assert!(matches!(result, Err(VaultError::Forbidden(_))));
    }
}
