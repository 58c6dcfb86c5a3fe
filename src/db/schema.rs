//! Database schema and migrations for filevault.
//!
//! Migrations are applied sequentially when the database is first opened or
//! upgraded; the `schema_version` table records which ones have run.

/// Database migrations.
pub const MIGRATIONS: &[&str] = &[
    // v1: nodes table - the file/folder tree
    r#"
CREATE TABLE nodes (
    id            INTEGER PRIMARY KEY AUTOINCREMENT,
    name          TEXT NOT NULL,
    kind          TEXT NOT NULL CHECK (kind IN ('file', 'folder')),
    parent_id     INTEGER REFERENCES nodes(id) ON DELETE RESTRICT,
    owner_id      INTEGER NOT NULL,
    physical_ref  TEXT,                  -- "{owner_id}/{uuid}.{ext}", files only
    size          INTEGER,               -- bytes, files only
    content_type  TEXT,                  -- files only
    created_at    TEXT NOT NULL,
    CHECK (kind = 'file' OR (physical_ref IS NULL AND size IS NULL AND content_type IS NULL)),
    CHECK (kind = 'folder' OR physical_ref IS NOT NULL)
);

CREATE INDEX idx_nodes_owner_parent ON nodes(owner_id, parent_id);
CREATE INDEX idx_nodes_parent ON nodes(parent_id);
"#,
    // v2: folder names are unique per (owner, parent); NULL parent is the root
    r#"
CREATE UNIQUE INDEX idx_nodes_folder_name
    ON nodes(owner_id, COALESCE(parent_id, 0), name)
    WHERE kind = 'folder';
"#,
    // v3: every blob belongs to exactly one node
    r#"
CREATE UNIQUE INDEX idx_nodes_physical_ref
    ON nodes(physical_ref)
    WHERE physical_ref IS NOT NULL;
"#,
];
