use rocket_contrib::Json;
pub mod models;
use types::{ApiError, ApiResult, Validate, ValidationError};
use rocket::Request;
use rocket::State;
use rocket::http::Status;
use db::DbConnection;
use diesel::prelude::*;
use diesel::pg::PgConnection;
use diesel::dsl::exists;
use diesel::{insert_into, select, update as diesel_update};
use config::Config;
use rocket::request::{self, FromRequest};
use rocket::Outcome;

mod utils;

pub type CurrentUser = Result<models::User, ApiError>;

use self::utils::*;

#[derive(Debug, Serialize)]
pub struct UserResponse {
    user: models::UserView,
}

#[derive(Debug, Deserialize)]
struct RegistrationDetails {
    username: String,
    email: String,
    password: String,
}

#[derive(Debug, Deserialize)]
pub struct Registration {
    user: RegistrationDetails,
}

impl Validate for Registration {
    type Error = ValidationError;
    fn validate(self, _connection: &PgConnection) -> Result<Self, ValidationError> {
        let mut errors = ValidationError::default();

        if let Err(e) = validate_email(&self.user.email) {
            errors.merge(e);
        }
        if let Err(e) = validate_username(&self.user.username) {
            errors.merge(e);
        }
        if let Err(e) = validate_password(&self.user.password) {
            errors.merge(e);
        }

        if errors.empty() {
            Ok(self)
        } else {
            Err(errors)
        }
    }
}

#[post("/", format = "application/json", data = "<registration>")]
pub fn register(
    connection: DbConnection,
    config: State<Config>,
    registration: Json<Registration>,
) -> ApiResult<UserResponse> {
    use db::schema::users::dsl::*;

    let registration = registration.validate(&connection)?.into_inner();

    let email_taken = select(exists(users.filter(email.eq(&registration.user.email))))
        .get_result::<bool>(&*connection)?;
    let username_taken = select(exists(
        users.filter(username.eq(&registration.user.username)),
    )).get_result::<bool>(&*connection)?;
    if email_taken || username_taken {
        return Err(ApiError::Conflict(
            "email or username already taken".to_string(),
        ));
    }

    let password_hash = models::User::make_password_hash(&registration.user.password)?;
    let new_user = models::NewUser::new(
        registration.user.username,
        registration.user.email,
        password_hash,
    );

    let user = insert_into(users)
        .values(&new_user)
        .get_result::<models::User>(&*connection)?;
    let token = user.token(&config.secret)?;
    Ok(Json(UserResponse {
        user: user.view(token),
    }))
}

#[derive(Debug, Deserialize)]
struct LoginDetails {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct Login {
    user: LoginDetails,
}

impl<'a, 'r> FromRequest<'a, 'r> for models::User {
    type Error = ApiError;
    fn from_request(request: &'a Request<'r>) -> request::Outcome<Self, Self::Error> {
        let headers = request.headers();
        let token_header = match headers.get_one("Authorization") {
            Some(header) => header,
            None => return Outcome::Failure((Status::raw(401), ApiError::Unauthorized)),
        };
        let token = str::replace(token_header, "Token ", "");

        let config = match request.guard::<State<Config>>() {
            Outcome::Success(config) => config,
            _ => return Outcome::Failure((Status::ServiceUnavailable, ApiError::Internal)),
        };
        let connection = match DbConnection::from_request(request) {
            Outcome::Success(connection) => connection,
            _ => return Outcome::Failure((Status::ServiceUnavailable, ApiError::Internal)),
        };

        match models::User::load_from_token(&token, &config.secret, &connection) {
            Ok(user) => Outcome::Success(user),
            Err(e) => match e {
                ApiError::Database(_) | ApiError::Internal => {
                    Outcome::Failure((Status::ServiceUnavailable, ApiError::Internal))
                }
                other => Outcome::Failure((Status::raw(401), other)),
            },
        }
    }
}

#[post("/login", format = "application/json", data = "<login>")]
pub fn login(
    connection: DbConnection,
    config: State<Config>,
    login: Json<Login>,
) -> ApiResult<UserResponse> {
    use db::schema::users::dsl::*;
    let user = users
        .filter(email.eq(&login.user.email))
        .first::<models::User>(&*connection)?;
    let password_is_valid = user.verify_password(&login.user.password)?;
    match password_is_valid {
        true => {
            let token = user.token(&config.secret)?;
            Ok(Json(UserResponse {
                user: user.view(token),
            }))
        }
        false => {
            let mut error = ValidationError::default();
            error.add_error("password", "Invalid password");
            Err(error.into())
        }
    }
}

#[get("/user", format = "application/json")]
pub fn current(current_user: CurrentUser, config: State<Config>) -> ApiResult<UserResponse> {
    let user = current_user?;
    let token = user.token(&config.secret)?;
    Ok(Json(UserResponse {
        user: user.view(token),
    }))
}

#[derive(Debug, Deserialize)]
pub struct UpdateUser {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub image: Option<String>,
    pub bio: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Update {
    pub user: UpdateUser,
}

#[put("/user", format = "application/json", data = "<update>")]
pub fn update(
    current_user: CurrentUser,
    connection: DbConnection,
    config: State<Config>,
    update: Json<Update>,
) -> ApiResult<UserResponse> {
    use db::schema::users::dsl::*;

    let mut user = current_user?;
    let mut error = ValidationError::default();
    let update = update.into_inner();

    if let Some(new_bio) = update.user.bio {
        user.bio = new_bio;
    }
    if let Some(new_image) = update.user.image {
        user.image = new_image;
    }

    if let Some(new_email) = update.user.email {
        match validate_email(&new_email) {
            Err(e) => {
                error.merge(e);
            }
            Ok(_) => {
                user.email = new_email;
            }
        }

        let expr = users.filter(email.eq(&user.email)).filter(id.ne(&user.id));
        let email_exists = select(exists(expr)).get_result::<bool>(&*connection)?;
        if email_exists {
            return Err(ApiError::Conflict(format!(
                "email already taken: {}",
                user.email
            )));
        }
    }

    if let Some(new_username) = update.user.username {
        match validate_username(&new_username) {
            Err(e) => {
                error.merge(e);
            }
            Ok(_) => {
                user.username = new_username;
            }
        }

        let expr = users
            .filter(username.eq(&user.username))
            .filter(id.ne(user.id));
        let username_exists = select(exists(expr)).get_result::<bool>(&*connection)?;
        if username_exists {
            return Err(ApiError::Conflict(format!(
                "username already taken: {}",
                user.username
            )));
        }
    }

    if let Some(new_password) = update.user.password {
        match validate_password(&new_password) {
            Err(e) => {
                error.merge(e);
            }
            _ => {
                user.new_password(&new_password)?;
            }
        }
    }

    if !error.empty() {
        Err(error.into())
    } else {
        diesel_update(&user).set(&user).execute(&*connection)?;
        let token = user.token(&config.secret)?;
        Ok(Json(UserResponse {
            user: user.view(token),
        }))
    }
}
