//! OpenAPI document for the file API.

use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use super::dto::{CreateFolderRequest, NodeResponse, RenameRequest};
use super::handlers::file;

/// OpenAPI definition served at `/api-docs/openapi.json`.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "filevault API",
        description = "Per-owner file and folder storage"
    ),
    paths(
        file::create_folder,
        file::upload_file,
        file::list_children,
        file::list_all,
        file::get_node,
        file::rename_node,
        file::delete_node,
        file::fetch_content,
    ),
    components(schemas(NodeResponse, CreateFolderRequest, RenameRequest)),
    modifiers(&BearerAuth),
    tags(
        (name = "folders", description = "Folder creation"),
        (name = "files", description = "File upload"),
        (name = "nodes", description = "Listing, renaming, deleting and reading nodes")
    )
)]
pub struct ApiDoc;

/// Registers the `bearer_auth` scheme referenced by every path.
struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}
