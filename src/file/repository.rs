//! Metadata store for the file tree.
//!
//! [`MetadataStore`] is the record-keeping seam used by the file service;
//! [`NodeRepository`] implements it on top of the SQLite pool. Field
//! constraints (folders carry no physical fields, folder names are unique per
//! owner and parent, parents cannot be removed while referenced) are enforced
//! by the schema so they hold under concurrent callers.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::error::DatabaseError;

use crate::db::DbPool;
use crate::{Result, VaultError};

use super::node::{NewNode, Node, NodeKind, NodeUpdate};

const NODE_COLUMNS: &str =
    "id, name, kind, parent_id, owner_id, physical_ref, size, content_type, created_at";

/// Durable record store for nodes.
#[async_trait]
pub trait MetadataStore: Send + Sync {
    /// Persist a new node, assigning its ID and (if absent) creation time.
    ///
    /// Fails with `Conflict` when a folder with the same name already exists
    /// under the same owner and parent, and with `NotFound` when the parent
    /// no longer exists.
    async fn insert(&self, node: &NewNode) -> Result<Node>;

    /// Get a node by ID.
    async fn find_by_id(&self, id: i64) -> Result<Option<Node>>;

    /// List the direct children of `parent_id` (None for the root) owned by `owner_id`.
    async fn find_children(&self, owner_id: i64, parent_id: Option<i64>) -> Result<Vec<Node>>;

    /// Find a node of the given kind by exact name inside a parent.
    async fn find_by_name_in_parent(
        &self,
        owner_id: i64,
        parent_id: Option<i64>,
        name: &str,
        kind: NodeKind,
    ) -> Result<Option<Node>>;

    /// List every node owned by `owner_id`.
    async fn find_by_owner(&self, owner_id: i64) -> Result<Vec<Node>>;

    /// Apply a partial update. Fails with `NotFound` if `id` is unknown.
    async fn update(&self, id: i64, update: &NodeUpdate) -> Result<Node>;

    /// Remove a node. Fails with `NotFound` if `id` is unknown.
    async fn remove(&self, id: i64) -> Result<()>;
}

/// SQLite-backed [`MetadataStore`].
#[derive(Debug, Clone)]
pub struct NodeRepository {
    pool: DbPool,
}

impl NodeRepository {
    /// Create a new NodeRepository over the given pool.
    pub fn new(pool: &DbPool) -> Self {
        Self { pool: pool.clone() }
    }
}

fn as_database_error(e: &sqlx::Error) -> Option<&dyn DatabaseError> {
    match e {
        sqlx::Error::Database(db_err) => Some(db_err.as_ref()),
        _ => None,
    }
}

/// Map an insert failure to the error taxonomy.
fn insert_error(e: sqlx::Error) -> VaultError {
    if let Some(db_err) = as_database_error(&e) {
        if db_err.is_unique_violation() {
            if db_err.message().contains("physical_ref") {
                return VaultError::MetadataWrite("physical reference already in use".to_string());
            }
            return VaultError::Conflict("folder already exists".to_string());
        }
        if db_err.is_foreign_key_violation() {
            return VaultError::NotFound("parent folder".to_string());
        }
    }
    VaultError::MetadataWrite(e.to_string())
}

/// Map an update failure to the error taxonomy.
fn update_error(e: sqlx::Error) -> VaultError {
    if let Some(db_err) = as_database_error(&e) {
        if db_err.is_unique_violation() {
            return VaultError::Conflict("folder already exists".to_string());
        }
    }
    VaultError::MetadataWrite(e.to_string())
}

/// Map a delete failure to the error taxonomy.
fn remove_error(e: sqlx::Error) -> VaultError {
    if let Some(db_err) = as_database_error(&e) {
        if db_err.is_foreign_key_violation() {
            return VaultError::Conflict("folder is not empty".to_string());
        }
    }
    VaultError::MetadataWrite(e.to_string())
}

#[async_trait]
impl MetadataStore for NodeRepository {
    async fn insert(&self, node: &NewNode) -> Result<Node> {
        let created_at = node.created_at.unwrap_or_else(Utc::now);

        let id: i64 = sqlx::query_scalar(
            "INSERT INTO nodes (name, kind, parent_id, owner_id, physical_ref, size, content_type, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?) RETURNING id",
        )
        .bind(&node.name)
        .bind(node.kind.as_str())
        .bind(node.parent_id)
        .bind(node.owner_id)
        .bind(&node.physical_ref)
        .bind(node.size)
        .bind(&node.content_type)
        .bind(created_at)
        .fetch_one(&self.pool)
        .await
        .map_err(insert_error)?;

        Ok(Node {
            id,
            name: node.name.clone(),
            kind: node.kind,
            parent_id: node.parent_id,
            owner_id: node.owner_id,
            physical_ref: node.physical_ref.clone(),
            size: node.size,
            content_type: node.content_type.clone(),
            created_at,
        })
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Node>> {
        let node = sqlx::query_as::<_, Node>(&format!(
            "SELECT {NODE_COLUMNS} FROM nodes WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(node)
    }

    async fn find_children(&self, owner_id: i64, parent_id: Option<i64>) -> Result<Vec<Node>> {
        let nodes = sqlx::query_as::<_, Node>(&format!(
            "SELECT {NODE_COLUMNS} FROM nodes
             WHERE owner_id = ? AND parent_id IS ?
             ORDER BY kind DESC, name, id"
        ))
        .bind(owner_id)
        .bind(parent_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(nodes)
    }

    async fn find_by_name_in_parent(
        &self,
        owner_id: i64,
        parent_id: Option<i64>,
        name: &str,
        kind: NodeKind,
    ) -> Result<Option<Node>> {
        let node = sqlx::query_as::<_, Node>(&format!(
            "SELECT {NODE_COLUMNS} FROM nodes
             WHERE owner_id = ? AND parent_id IS ? AND name = ? AND kind = ?
             LIMIT 1"
        ))
        .bind(owner_id)
        .bind(parent_id)
        .bind(name)
        .bind(kind.as_str())
        .fetch_optional(&self.pool)
        .await?;

        Ok(node)
    }

    async fn find_by_owner(&self, owner_id: i64) -> Result<Vec<Node>> {
        let nodes = sqlx::query_as::<_, Node>(&format!(
            "SELECT {NODE_COLUMNS} FROM nodes WHERE owner_id = ? ORDER BY id"
        ))
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(nodes)
    }

    async fn update(&self, id: i64, update: &NodeUpdate) -> Result<Node> {
        let Some(ref name) = update.name else {
            return self
                .find_by_id(id)
                .await?
                .ok_or_else(|| VaultError::NotFound(format!("node {id}")));
        };

        // UPDATE ... RETURNING keeps the write and the read-back atomic
        let node = sqlx::query_as::<_, Node>(&format!(
            "UPDATE nodes SET name = ? WHERE id = ? RETURNING {NODE_COLUMNS}"
        ))
        .bind(name)
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(update_error)?;

        node.ok_or_else(|| VaultError::NotFound(format!("node {id}")))
    }

    async fn remove(&self, id: i64) -> Result<()> {
        let result = sqlx::query("DELETE FROM nodes WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(remove_error)?;

        if result.rows_affected() == 0 {
            return Err(VaultError::NotFound(format!("node {id}")));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Database;

    async fn setup() -> (Database, NodeRepository) {
        let db = Database::open_in_memory().await.unwrap();
        let repo = NodeRepository::new(db.pool());
        (db, repo)
    }

    #[tokio::test]
    async fn test_insert_folder() {
        let (_db, repo) = setup().await;

        let folder = repo.insert(&NewNode::folder(1, "Reports")).await.unwrap();

        assert!(folder.id > 0);
        assert_eq!(folder.name, "Reports");
        assert_eq!(folder.kind, NodeKind::Folder);
        assert!(folder.parent_id.is_none());
        assert!(folder.physical_ref.is_none());

        let found = repo.find_by_id(folder.id).await.unwrap().unwrap();
        assert_eq!(found, folder);
    }

    #[tokio::test]
    async fn test_insert_file_under_folder() {
        let (_db, repo) = setup().await;
        let folder = repo.insert(&NewNode::folder(1, "Photos")).await.unwrap();

        let file = repo
            .insert(
                &NewNode::file(1, "photo.png", "1/abc.png", 2048, "image/png")
                    .with_parent(Some(folder.id)),
            )
            .await
            .unwrap();

        let found = repo.find_by_id(file.id).await.unwrap().unwrap();
        assert_eq!(found.kind, NodeKind::File);
        assert_eq!(found.parent_id, Some(folder.id));
        assert_eq!(found.physical_ref.as_deref(), Some("1/abc.png"));
        assert_eq!(found.size, Some(2048));
        assert_eq!(found.content_type.as_deref(), Some("image/png"));
        assert_eq!(found.created_at, file.created_at);
    }

    #[tokio::test]
    async fn test_insert_keeps_explicit_created_at() {
        let (_db, repo) = setup().await;
        let at = "2024-05-01T12:00:00Z".parse().unwrap();

        let node = repo
            .insert(&NewNode::folder(1, "Old").with_created_at(at))
            .await
            .unwrap();

        let found = repo.find_by_id(node.id).await.unwrap().unwrap();
        assert_eq!(found.created_at, at);
    }

    #[tokio::test]
    async fn test_find_by_id_not_found() {
        let (_db, repo) = setup().await;

        assert!(repo.find_by_id(9999).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_folder_rejected_at_insert() {
        let (_db, repo) = setup().await;
        repo.insert(&NewNode::folder(1, "Reports")).await.unwrap();

        let result = repo.insert(&NewNode::folder(1, "Reports")).await;

        assert!(matches!(result, Err(VaultError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_duplicate_folder_allowed_across_owners_and_parents() {
        let (_db, repo) = setup().await;
        let parent = repo.insert(&NewNode::folder(1, "Work")).await.unwrap();

        repo.insert(&NewNode::folder(1, "Reports")).await.unwrap();
        repo.insert(&NewNode::folder(2, "Reports")).await.unwrap();
        repo.insert(&NewNode::folder(1, "Reports").with_parent(Some(parent.id)))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_duplicate_file_names_allowed() {
        let (_db, repo) = setup().await;

        repo.insert(&NewNode::file(1, "a.txt", "1/one.txt", 1, "text/plain"))
            .await
            .unwrap();
        repo.insert(&NewNode::file(1, "a.txt", "1/two.txt", 1, "text/plain"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_shared_physical_ref_rejected() {
        let (_db, repo) = setup().await;
        repo.insert(&NewNode::file(1, "a.txt", "1/same.txt", 1, "text/plain"))
            .await
            .unwrap();

        let result = repo
            .insert(&NewNode::file(1, "b.txt", "1/same.txt", 1, "text/plain"))
            .await;

        assert!(matches!(result, Err(VaultError::MetadataWrite(_))));
    }

    #[tokio::test]
    async fn test_insert_with_missing_parent() {
        let (_db, repo) = setup().await;

        let result = repo
            .insert(&NewNode::folder(1, "Orphan").with_parent(Some(9999)))
            .await;

        assert!(matches!(result, Err(VaultError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_find_children_scoped_by_owner_and_parent() {
        let (_db, repo) = setup().await;
        let docs = repo.insert(&NewNode::folder(1, "Docs")).await.unwrap();
        repo.insert(&NewNode::folder(1, "Music")).await.unwrap();
        repo.insert(&NewNode::folder(2, "Other owner")).await.unwrap();
        repo.insert(
            &NewNode::file(1, "cv.pdf", "1/cv.pdf", 10, "application/pdf")
                .with_parent(Some(docs.id)),
        )
        .await
        .unwrap();

        let roots = repo.find_children(1, None).await.unwrap();
        let names: Vec<_> = roots.iter().map(|n| n.name.as_str()).collect();
        assert_eq!(names, vec!["Docs", "Music"]);

        let children = repo.find_children(1, Some(docs.id)).await.unwrap();
        assert_eq!(children.len(), 1);
        assert_eq!(children[0].name, "cv.pdf");

        // Another owner sees nothing under this folder
        assert!(repo.find_children(2, Some(docs.id)).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_find_by_name_in_parent() {
        let (_db, repo) = setup().await;
        let folder = repo.insert(&NewNode::folder(1, "Reports")).await.unwrap();

        let found = repo
            .find_by_name_in_parent(1, None, "Reports", NodeKind::Folder)
            .await
            .unwrap();
        assert_eq!(found.map(|n| n.id), Some(folder.id));

        assert!(repo
            .find_by_name_in_parent(1, None, "Reports", NodeKind::File)
            .await
            .unwrap()
            .is_none());
        assert!(repo
            .find_by_name_in_parent(2, None, "Reports", NodeKind::Folder)
            .await
            .unwrap()
            .is_none());
        assert!(repo
            .find_by_name_in_parent(1, Some(folder.id), "Reports", NodeKind::Folder)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_find_by_owner() {
        let (_db, repo) = setup().await;
        let docs = repo.insert(&NewNode::folder(1, "Docs")).await.unwrap();
        repo.insert(&NewNode::folder(1, "Nested").with_parent(Some(docs.id)))
            .await
            .unwrap();
        repo.insert(&NewNode::folder(2, "Docs")).await.unwrap();

        assert_eq!(repo.find_by_owner(1).await.unwrap().len(), 2);
        assert_eq!(repo.find_by_owner(2).await.unwrap().len(), 1);
        assert!(repo.find_by_owner(3).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_update_name() {
        let (_db, repo) = setup().await;
        let node = repo
            .insert(&NewNode::file(1, "a.txt", "1/a.txt", 3, "text/plain"))
            .await
            .unwrap();

        let updated = repo
            .update(node.id, &NodeUpdate::new().name("b.txt"))
            .await
            .unwrap();

        assert_eq!(updated.name, "b.txt");
        assert_eq!(updated.physical_ref, node.physical_ref);
        assert_eq!(updated.parent_id, node.parent_id);
        assert_eq!(updated.created_at, node.created_at);
    }

    #[tokio::test]
    async fn test_update_not_found() {
        let (_db, repo) = setup().await;

        let result = repo.update(9999, &NodeUpdate::new().name("x")).await;
        assert!(matches!(result, Err(VaultError::NotFound(_))));

        let result = repo.update(9999, &NodeUpdate::new()).await;
        assert!(matches!(result, Err(VaultError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_update_onto_existing_folder_name() {
        let (_db, repo) = setup().await;
        repo.insert(&NewNode::folder(1, "A")).await.unwrap();
        let b = repo.insert(&NewNode::folder(1, "B")).await.unwrap();

        let result = repo.update(b.id, &NodeUpdate::new().name("A")).await;

        assert!(matches!(result, Err(VaultError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_remove() {
        let (_db, repo) = setup().await;
        let node = repo.insert(&NewNode::folder(1, "Tmp")).await.unwrap();

        repo.remove(node.id).await.unwrap();

        assert!(repo.find_by_id(node.id).await.unwrap().is_none());
        assert!(matches!(
            repo.remove(node.id).await,
            Err(VaultError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_remove_referenced_parent_rejected() {
        let (_db, repo) = setup().await;
        let parent = repo.insert(&NewNode::folder(1, "Parent")).await.unwrap();
        repo.insert(&NewNode::folder(1, "Child").with_parent(Some(parent.id)))
            .await
            .unwrap();

        let result = repo.remove(parent.id).await;

        assert!(matches!(result, Err(VaultError::Conflict(_))));
        assert!(repo.find_by_id(parent.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_concurrent_duplicate_inserts() {
        let (_db, repo) = setup().await;

        let node_a = NewNode::folder(1, "Race");
        let node_b = NewNode::folder(1, "Race");
        let (a, b) = tokio::join!(repo.insert(&node_a), repo.insert(&node_b),);

        let successes = [a.is_ok(), b.is_ok()].iter().filter(|ok| **ok).count();
        assert_eq!(successes, 1);
        assert_eq!(repo.find_children(1, None).await.unwrap().len(), 1);
    }
}
