use diesel::prelude::*;
use diesel::pg::PgConnection;
use db::schema::users;
use crypto::pbkdf2::{pbkdf2_check, pbkdf2_simple};
use crypto::sha2::Sha256;
use std::borrow::Cow;
use std::io::Result as IoResult;
use types::ApiError;
use profile::Profile;
use jwt::{Header, Registered, Token};

/// Internal user record. Never serialized directly; the public surface is
/// `UserView` (account responses) and `profile::Profile` (everyone else),
/// both built by explicit projection so the hash cannot leak.
#[derive(Debug, Clone, PartialEq, Queryable, Identifiable, AsChangeset)]
#[table_name = "users"]
pub struct User {
    pub id: i32,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub bio: String,
    pub image: String,
}

#[derive(Debug, Serialize)]
pub struct UserView {
    pub username: String,
    pub email: String,
    pub bio: String,
    pub image: String,
    pub token: String,
}

impl User {
    pub fn make_password_hash(password: &str) -> IoResult<String> {
        pbkdf2_simple(password, 1000)
    }

    pub fn new_password(&mut self, password: &str) -> IoResult<()> {
        self.password_hash = pbkdf2_simple(password, 1000)?;
        Ok(())
    }

    pub fn verify_password(&self, password_to_verify: &str) -> Result<bool, ApiError> {
        let check = pbkdf2_check(password_to_verify, &self.password_hash);
        check.map_err(|_| ApiError::Internal)
    }

    pub fn token(&self, secret: &str) -> Result<String, ApiError> {
        let header = Header::default();
        let claims = Registered {
            iss: Some(self.email.clone()),
            sub: Some(self.id.to_string()),
            ..Default::default()
        };
        let token = Token::new(header, claims);
        token
            .signed(secret.as_bytes(), Sha256::new())
            .map_err(|_| ApiError::Internal)
    }

    pub fn load_from_token(
        jwt_token: &str,
        secret: &str,
        connection: &PgConnection,
    ) -> Result<User, ApiError> {
        use db::schema::users::dsl::*;
        let jwt_token = Token::<Header, Registered>::parse(jwt_token)
            .map_err(|_| ApiError::Unauthorized)?;
        if !jwt_token.verify(secret.as_bytes(), Sha256::new()) {
            return Err(ApiError::Unauthorized);
        }

        let claimed_id = match jwt_token.claims.sub {
            Some(ref sub) => sub.parse::<i32>().map_err(|_| ApiError::Unauthorized)?,
            None => return Err(ApiError::Unauthorized),
        };
        let claimed_email = match jwt_token.claims.iss {
            Some(ref iss) => iss.clone(),
            None => return Err(ApiError::Unauthorized),
        };

        users
            .filter(id.eq(claimed_id))
            .filter(email.eq(claimed_email))
            .get_result::<User>(connection)
            .map_err(|_| ApiError::Unauthorized)
    }

    pub fn load_by_name(name: &str, connection: &PgConnection) -> Result<User, ApiError> {
        use db::schema::users::dsl::*;
        users
            .filter(username.eq(name))
            .get_result::<User>(connection)
            .map_err(|e| e.into())
    }

    /// Projection for account responses; consumes the record.
    pub fn view(self, token: String) -> UserView {
        UserView {
            username: self.username,
            email: self.email,
            bio: self.bio,
            image: self.image,
            token: token,
        }
    }

    pub fn profile(&self, following: bool) -> Profile {
        Profile {
            username: Cow::Borrowed(&self.username),
            bio: Cow::Borrowed(&self.bio),
            image: Cow::Borrowed(&self.image),
            following: following,
        }
    }

    pub fn into_profile(self, following: bool) -> Profile<'static> {
        Profile {
            username: Cow::Owned(self.username),
            bio: Cow::Owned(self.bio),
            image: Cow::Owned(self.image),
            following: following,
        }
    }
}

#[derive(Insertable)]
#[table_name = "users"]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub bio: String,
    pub image: String,
}

impl NewUser {
    pub fn new(username: String, email: String, password_hash: String) -> NewUser {
        NewUser {
            username: username,
            email: email,
            password_hash: password_hash,
            bio: String::new(),
            image: String::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user() -> User {
        User {
            id: 7,
            username: "alice".to_string(),
            email: "alice@example.com".to_string(),
            password_hash: "secret-hash".to_string(),
            bio: "likes dragons".to_string(),
            image: String::new(),
        }
    }

    #[test]
    fn view_carries_no_password_hash() {
        use serde_json;
        let view = user().view("a.b.c".to_string());
        let json = serde_json::to_value(&view).unwrap();
        let object = json.as_object().unwrap();
        assert!(object.get("password_hash").is_none());
        assert_eq!(object["username"], "alice");
        assert_eq!(object["token"], "a.b.c");
    }

    #[test]
    fn profile_reflects_following_flag() {
        let user = user();
        assert!(!user.profile(false).following);
        assert!(user.profile(true).following);
    }

    #[test]
    fn new_user_defaults_bio_and_image_to_empty() {
        let new_user = NewUser::new(
            "bob".to_string(),
            "bob@example.com".to_string(),
            "hash".to_string(),
        );
        assert_eq!(new_user.bio, "");
        assert_eq!(new_user.image, "");
    }
}
