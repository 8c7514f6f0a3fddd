use rocket_contrib::Json;
use rocket::request::Request;
use std::collections::HashMap;
use rocket::http::Status;
use rocket::response::{Responder, Response};
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use std::io::Error as IoError;
use diesel::pg::PgConnection;
use utils::try_respond;

pub trait Validate
where
    Self: Sized,
{
    type Error;
    fn validate(self, connection: &PgConnection) -> Result<Self, Self::Error>;
}

#[derive(Debug)]
pub enum ApiError {
    /// Missing article/user/slug.
    NotFound,
    /// Non-author mutating or deleting an article.
    Forbidden,
    /// Self-follow and self-unfollow.
    InvalidOperation(&'static str),
    /// Duplicate email/username, slug uniqueness violation.
    Conflict(String),
    Validation(ValidationError),
    Unauthorized,
    Database(DieselError),
    Internal,
}

impl From<DieselError> for ApiError {
    fn from(err: DieselError) -> ApiError {
        match err {
            DieselError::NotFound => ApiError::NotFound,
            DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, info) => {
                ApiError::Conflict(info.message().to_string())
            }
            other => ApiError::Database(other),
        }
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> ApiError {
        ApiError::Validation(err)
    }
}

impl From<IoError> for ApiError {
    fn from(_: IoError) -> ApiError {
        ApiError::Internal
    }
}

pub type ApiResult<T> = Result<Json<T>, ApiError>;

#[derive(Debug, Serialize, Default)]
pub struct ValidationError(HashMap<String, Vec<String>>);

impl ValidationError {
    pub fn add_error<K: Into<String>, V: Into<String>>(&mut self, key: K, val: V) {
        let entry = self.0.entry(key.into()).or_insert(Vec::default());
        entry.push(val.into());
    }

    pub fn from<K: Into<String>, V: Into<String>>(key: K, val: V) -> Self {
        let mut error = ValidationError::default();
        error.add_error(key, val);
        error
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn merge(&mut self, other: ValidationError) {
        for (key, errors) in other.0.into_iter() {
            let entry = self.0.entry(key).or_default();
            entry.extend(errors);
        }
    }

    pub fn empty(&self) -> bool {
        self.len() == 0
    }
}

impl<'r> Responder<'r> for ApiError {
    fn respond_to(self, req: &Request) -> Result<Response<'r>, Status> {
        match self {
            ApiError::NotFound => Err(Status::raw(404)),

            ApiError::Forbidden => Err(Status::raw(403)),

            ApiError::InvalidOperation(message) => {
                let body = json!({ "errors": { "operation": [message] } });
                try_respond(req, &body, Status::raw(422))
            }

            ApiError::Conflict(message) => {
                let body = json!({ "errors": { "conflict": [message] } });
                try_respond(req, &body, Status::raw(409))
            }

            ApiError::Validation(error) => {
                let body = json!({ "errors": error });
                try_respond(req, &body, Status::raw(422))
            }

            ApiError::Unauthorized => {
                let body = json!({ "errors": {
                    "status": "401 Unauthorized"
                }});
                try_respond(req, &body, Status::raw(401))
            }

            _ => Err(Status::raw(500)),
        }
    }
}

impl<T> Validate for Json<T>
where
    T: Validate,
{
    type Error = <T as Validate>::Error;
    fn validate(self, connection: &PgConnection) -> Result<Self, Self::Error> {
        let inner = self.0;
        let validated = inner.validate(connection)?;
        Ok(Json(validated))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diesel_not_found_maps_to_not_found() {
        let mapped = ApiError::from(DieselError::NotFound);
        match mapped {
            ApiError::NotFound => {}
            other => panic!("expected NotFound, got {:?}", other),
        }
    }

    #[test]
    fn unique_violation_maps_to_conflict() {
        let err = DieselError::DatabaseError(
            DatabaseErrorKind::UniqueViolation,
            Box::new("duplicate key value violates unique constraint".to_string()),
        );
        match ApiError::from(err) {
            ApiError::Conflict(message) => {
                assert!(message.contains("unique constraint"));
            }
            other => panic!("expected Conflict, got {:?}", other),
        }
    }

    #[test]
    fn other_database_errors_stay_database() {
        let err = DieselError::DatabaseError(
            DatabaseErrorKind::ForeignKeyViolation,
            Box::new("fk violation".to_string()),
        );
        match ApiError::from(err) {
            ApiError::Database(_) => {}
            other => panic!("expected Database, got {:?}", other),
        }
    }

    #[test]
    fn validation_error_merges_per_key() {
        let mut errors = ValidationError::from("email", "invalid email");
        errors.merge(ValidationError::from("email", "email already taken"));
        errors.merge(ValidationError::from("password", "too short"));
        assert_eq!(errors.len(), 2);
        assert!(!errors.empty());
    }
}
