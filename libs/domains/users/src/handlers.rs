use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::{StatusCode, header},
    response::IntoResponse,
    routing::get,
};
use axum_helpers::{
    IdPath, ValidatedJson,
    errors::responses::{
        BadRequestResponse, BadRequestValidationResponse, ConflictResponse,
        InternalServerErrorResponse, NotFoundResponse,
    },
};
use std::sync::Arc;
use utoipa::OpenApi;

use crate::error::UserResult;
use crate::models::{Link, SearchParams, User, UserRequest, UserResource};
use crate::repository::UserRepository;
use crate::service::UserService;

/// Public path the router is mounted under; used to build links and `Location`.
pub const BASE_PATH: &str = "/api/v1/users";

pub const TAG: &str = "users";

/// OpenAPI documentation for the users API
#[derive(OpenApi)]
#[openapi(
    paths(
        list_users,
        create_user,
        search_users,
        get_user_by_email,
        get_user,
        update_user,
        delete_user,
    ),
    components(
        schemas(User, UserRequest, UserResource, Link),
        responses(
            BadRequestResponse,
            BadRequestValidationResponse,
            NotFoundResponse,
            ConflictResponse,
            InternalServerErrorResponse
        )
    ),
    tags(
        (name = TAG, description = "User directory endpoints")
    )
)]
pub struct ApiDoc;

/// Router for the users API, to be nested at [`BASE_PATH`]
pub fn router<R: UserRepository + 'static>(service: UserService<R>) -> Router {
    let shared_service = Arc::new(service);

    Router::new()
        .route("/", get(list_users).post(create_user))
        .route("/search", get(search_users))
        .route("/email/{email}", get(get_user_by_email))
        .route("/{id}", get(get_user).put(update_user).delete(delete_user))
        .with_state(shared_service)
}

fn resource(user: User) -> UserResource {
    UserResource::new(user, BASE_PATH)
}

fn resources(users: Vec<User>) -> Vec<UserResource> {
    users.into_iter().map(resource).collect()
}

/// List every user in id order
#[utoipa::path(
    get,
    path = "",
    tag = TAG,
    responses(
        (status = 200, description = "All users", body = Vec<UserResource>),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn list_users<R: UserRepository>(
    State(service): State<Arc<UserService<R>>>,
) -> UserResult<Json<Vec<UserResource>>> {
    let users = service.list_users().await?;
    Ok(Json(resources(users)))
}

/// Create a user
#[utoipa::path(
    post,
    path = "",
    tag = TAG,
    request_body = UserRequest,
    responses(
        (status = 201, description = "User created", body = UserResource,
            headers(("Location" = String, description = "URI of the new user"))),
        (status = 400, response = BadRequestValidationResponse),
        (status = 409, response = ConflictResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn create_user<R: UserRepository>(
    State(service): State<Arc<UserService<R>>>,
    ValidatedJson(input): ValidatedJson<UserRequest>,
) -> UserResult<impl IntoResponse> {
    let user = service.create_user(input).await?;
    let location = format!("{}/{}", BASE_PATH, user.id);

    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, location)],
        Json(resource(user)),
    ))
}

/// Users whose name contains a fragment, ignoring case
#[utoipa::path(
    get,
    path = "/search",
    tag = TAG,
    params(SearchParams),
    responses(
        (status = 200, description = "Matching users", body = Vec<UserResource>),
        (status = 400, response = BadRequestResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn search_users<R: UserRepository>(
    State(service): State<Arc<UserService<R>>>,
    Query(params): Query<SearchParams>,
) -> UserResult<Json<Vec<UserResource>>> {
    let users = service.search_users(params.name.as_deref()).await?;
    Ok(Json(resources(users)))
}

/// Get a user by exact email
#[utoipa::path(
    get,
    path = "/email/{email}",
    tag = TAG,
    params(
        ("email" = String, Path, description = "Email address, percent-encoded")
    ),
    responses(
        (status = 200, description = "User found", body = UserResource),
        (status = 404, response = NotFoundResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn get_user_by_email<R: UserRepository>(
    State(service): State<Arc<UserService<R>>>,
    Path(email): Path<String>,
) -> UserResult<Json<UserResource>> {
    let user = service.get_user_by_email(&email).await?;
    Ok(Json(resource(user)))
}

/// Get a user by id
#[utoipa::path(
    get,
    path = "/{id}",
    tag = TAG,
    params(
        ("id" = i64, Path, description = "User id")
    ),
    responses(
        (status = 200, description = "User found", body = UserResource),
        (status = 400, response = BadRequestResponse),
        (status = 404, response = NotFoundResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn get_user<R: UserRepository>(
    State(service): State<Arc<UserService<R>>>,
    IdPath(id): IdPath,
) -> UserResult<Json<UserResource>> {
    let user = service.get_user(id).await?;
    Ok(Json(resource(user)))
}

/// Replace a user's name, email and age
#[utoipa::path(
    put,
    path = "/{id}",
    tag = TAG,
    params(
        ("id" = i64, Path, description = "User id")
    ),
    request_body = UserRequest,
    responses(
        (status = 200, description = "User updated", body = UserResource),
        (status = 400, response = BadRequestValidationResponse),
        (status = 404, response = NotFoundResponse),
        (status = 409, response = ConflictResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn update_user<R: UserRepository>(
    State(service): State<Arc<UserService<R>>>,
    IdPath(id): IdPath,
    ValidatedJson(input): ValidatedJson<UserRequest>,
) -> UserResult<Json<UserResource>> {
    let user = service.update_user(id, input).await?;
    Ok(Json(resource(user)))
}

/// Delete a user
#[utoipa::path(
    delete,
    path = "/{id}",
    tag = TAG,
    params(
        ("id" = i64, Path, description = "User id")
    ),
    responses(
        (status = 204, description = "User deleted"),
        (status = 400, response = BadRequestResponse),
        (status = 404, response = NotFoundResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn delete_user<R: UserRepository>(
    State(service): State<Arc<UserService<R>>>,
    IdPath(id): IdPath,
) -> UserResult<StatusCode> {
    service.delete_user(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
