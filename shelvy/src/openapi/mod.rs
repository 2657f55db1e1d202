//! OpenAPI documentation configuration.
//!
//! [`ApiDoc`] covers the authentication and public shelf routes at the root and nests
//! [`ReaderApiDoc`] for everything under `/api/v1`. The document is served at
//! `/api-docs/openapi.json` and rendered with Scalar at `/docs`.

use utoipa::{
    Modify, OpenApi,
    openapi::security::{ApiKey, ApiKeyValue, HttpAuthScheme, HttpBuilder, SecurityScheme},
};

use crate::api;

/// Bearer tokens for API clients, the session cookie for the browser.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.security_schemes.insert(
                "BearerAuth".to_string(),
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .description(Some(
                            "Session token returned by login and registration:\n\n\
                            ```\nAuthorization: Bearer YOUR_TOKEN\n```",
                        ))
                        .build(),
                ),
            );
            components.security_schemes.insert(
                "CookieAuth".to_string(),
                SecurityScheme::ApiKey(ApiKey::Cookie(ApiKeyValue::with_description(
                    "shelvy_session",
                    "Session cookie set by login and registration",
                ))),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        // Users and follows
        api::handlers::users::get_me,
        api::handlers::users::update_me,
        api::handlers::users::delete_me,
        api::handlers::users::search_users,
        api::handlers::users::get_profile,
        api::handlers::users::follow_user,
        api::handlers::users::unfollow_user,
        api::handlers::users::list_followers,
        api::handlers::users::list_following,
        api::handlers::users::list_my_followers,
        api::handlers::users::list_my_following,
        // Books
        api::handlers::books::list_books,
        api::handlers::books::create_book,
        api::handlers::books::get_book,
        api::handlers::books::update_book,
        api::handlers::books::delete_book,
        api::handlers::books::enrich_book,
        api::handlers::books::reorder_books,
        // Notes, likes, comments
        api::handlers::notes::list_notes,
        api::handlers::notes::create_note,
        api::handlers::notes::update_note,
        api::handlers::notes::delete_note,
        api::handlers::engagement::like_book,
        api::handlers::engagement::unlike_book,
        api::handlers::engagement::list_comments,
        api::handlers::engagement::create_comment,
        api::handlers::engagement::delete_comment,
        // Metadata search
        api::handlers::search::search_books,
        api::handlers::search::lookup_isbn,
        // Shelf
        api::handlers::shelf::get_settings,
        api::handlers::shelf::update_settings,
        api::handlers::shelf::share_shelf,
        api::handlers::shelf::unshare_shelf,
        api::handlers::shelf::get_feed,
        // Clubs
        api::handlers::clubs::list_clubs,
        api::handlers::clubs::create_club,
        api::handlers::clubs::get_club,
        api::handlers::clubs::update_club,
        api::handlers::clubs::delete_club,
        api::handlers::clubs::join_club,
        api::handlers::clubs::leave_club,
        api::handlers::clubs::list_members,
        api::handlers::clubs::update_member_role,
        api::handlers::clubs::remove_member,
        api::handlers::clubs::list_invites,
        api::handlers::clubs::create_invite,
        api::handlers::suggestions::list_suggestions,
        api::handlers::suggestions::create_suggestion,
        api::handlers::suggestions::delete_suggestion,
        api::handlers::suggestions::vote,
        api::handlers::suggestions::unvote,
        api::handlers::suggestions::select_suggestion,
    ),
    components(
        schemas(
            api::models::users::UserResponse,
            api::models::users::UserSummary,
            api::models::users::UserUpdate,
            api::models::users::ProfileCounts,
            api::models::users::ProfileResponse,
            api::models::users::FollowResponse,
            api::models::users::FollowStatusResponse,
            api::models::books::BookResponse,
            api::models::books::BookCreate,
            api::models::books::BookUpdate,
            api::models::books::ReorderRequest,
            api::models::books::ReorderResponse,
            api::models::books::EnrichResponse,
            api::models::notes::NoteResponse,
            api::models::notes::NoteCreate,
            api::models::notes::NoteUpdate,
            api::models::engagement::LikeResponse,
            api::models::engagement::CommentResponse,
            api::models::engagement::CommentCreate,
            api::models::shelf::ShelfSettingsResponse,
            api::models::shelf::ShelfSettingsUpdate,
            api::models::shelf::ShareResponse,
            api::models::shelf::FeedEntryResponse,
            api::models::clubs::ClubResponse,
            api::models::clubs::CurrentBook,
            api::models::clubs::ClubCreate,
            api::models::clubs::ClubUpdate,
            api::models::clubs::JoinClubRequest,
            api::models::clubs::ClubMemberResponse,
            api::models::clubs::MemberRoleUpdate,
            api::models::clubs::InviteCreate,
            api::models::clubs::InviteResponse,
            api::models::suggestions::SuggestionResponse,
            api::models::suggestions::SuggestionCreate,
            crate::db::models::books::BookStatus,
            crate::db::models::clubs::ClubRole,
            crate::shelf::sort::SortOrder,
            crate::metadata::BookMetadata,
        )
    ),
    tags(
        (name = "users", description = "Profiles, reader search and follows"),
        (name = "books", description = "The caller's shelf: add, edit, order and enrich books"),
        (name = "notes", description = "Reading notes; private notes are only visible to their author"),
        (name = "engagement", description = "Likes and comments on books you can see"),
        (name = "search", description = "Book search and ISBN lookup across metadata providers"),
        (name = "shelf", description = "Shelf appearance, sharing and the activity feed"),
        (name = "clubs", description = "Book clubs, members and invites"),
        (name = "suggestions", description = "Club reading suggestions and votes"),
    ),
)]
pub struct ReaderApiDoc;

#[derive(OpenApi)]
#[openapi(
    modifiers(&SecurityAddon),
    nest(
        (path = "/api/v1", api = ReaderApiDoc)
    ),
    paths(
        api::handlers::auth::get_registration_info,
        api::handlers::auth::register,
        api::handlers::auth::login,
        api::handlers::auth::logout,
        api::handlers::auth::change_password,
        api::handlers::public::get_public_shelf,
    ),
    components(
        schemas(
            api::models::auth::RegisterRequest,
            api::models::auth::LoginRequest,
            api::models::auth::ChangePasswordRequest,
            api::models::auth::AuthResponse,
            api::models::auth::AuthSuccessResponse,
            api::models::auth::RegistrationInfo,
            api::models::shelf::PublicShelfResponse,
            api::models::shelf::PublicShelfSettings,
        )
    ),
    tags(
        (name = "authentication", description = "Registration, login and sessions"),
        (name = "public", description = "Shared shelves, readable without an account"),
    ),
    info(
        title = "Shelvy API",
        version = "1.0.0",
        description = "A social bookshelf: track your reading, share your shelf, follow other readers and run book clubs.

## Authentication

Log in or register to receive a session. Browsers use the `shelvy_session` cookie; other clients send the returned token:

```
Authorization: Bearer YOUR_TOKEN
```

## Errors

Errors are JSON objects with a `message` field. Resources you cannot see return 404; resources you can see but not change return 403.",
    ),
)]
pub struct ApiDoc;
