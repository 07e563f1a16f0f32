use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    components(
        schemas(axum_helpers::ErrorResponse)
    ),
    info(
        title = "User Directory API",
        version = "0.1.0",
        description = "Create, look up, search, update and delete user records"
    ),
    servers(
        (url = "/api", description = "API base path")
    ),
    nest(
        (path = "/v1/users", api = domain_users::ApiDoc)
    )
)]
pub struct ApiDoc;
