use users::models::User;
use users::CurrentUser;
use types::ApiResult;
use rocket_contrib::Json;
use db::DbConnection;
use follows;
use std::borrow::Cow;

#[derive(Debug, Serialize)]
pub struct ProfileResponse<'a> {
    profile: Profile<'a>,
}

/// Public view of a user: no id, no email, no hash.
#[derive(Debug, PartialEq, Serialize)]
pub struct Profile<'a> {
    pub username: Cow<'a, str>,
    pub bio: Cow<'a, str>,
    pub image: Cow<'a, str>,
    pub following: bool,
}

#[get("/profiles/<name>", format = "application/json")]
pub fn profile(
    connection: DbConnection,
    current_user: Option<User>,
    name: String,
) -> ApiResult<ProfileResponse<'static>> {
    let user = User::load_by_name(&name, &connection)?;
    let following = match current_user {
        Some(ref current) => follows::is_following(&connection, current.id, user.id)?,
        None => false,
    };

    Ok(Json(ProfileResponse {
        profile: user.into_profile(following),
    }))
}

#[post("/profiles/<name>/follow", format = "application/json")]
pub fn follow(
    connection: DbConnection,
    current_user: CurrentUser,
    name: String,
) -> ApiResult<ProfileResponse<'static>> {
    let current = current_user?;
    let target = User::load_by_name(&name, &connection)?;
    follows::follow(&connection, current.id, target.id)?;

    Ok(Json(ProfileResponse {
        profile: target.into_profile(true),
    }))
}

#[delete("/profiles/<name>/follow", format = "application/json")]
pub fn unfollow(
    connection: DbConnection,
    current_user: CurrentUser,
    name: String,
) -> ApiResult<ProfileResponse<'static>> {
    let current = current_user?;
    let target = User::load_by_name(&name, &connection)?;
    follows::unfollow(&connection, current.id, target.id)?;

    Ok(Json(ProfileResponse {
        profile: target.into_profile(false),
    }))
}
