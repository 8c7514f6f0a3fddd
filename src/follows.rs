//! Social graph store: directed follower -> following edges.

use diesel::prelude::*;
use diesel::pg::PgConnection;
use diesel::dsl::exists;
use diesel::{delete, insert_into, select};
use db::schema::follows;
use types::ApiError;

/// Self-edges are rejected before any storage work happens.
pub fn ensure_not_self(follower: i32, target: i32, what: &'static str) -> Result<(), ApiError> {
    if follower == target {
        Err(ApiError::InvalidOperation(what))
    } else {
        Ok(())
    }
}

/// Idempotent: the unique (follower_id, following_id) constraint plus
/// `on_conflict_do_nothing` make concurrent follows converge on one edge.
pub fn follow(connection: &PgConnection, follower: i32, target: i32) -> Result<(), ApiError> {
    ensure_not_self(follower, target, "cannot follow yourself")?;
    insert_into(follows::table)
        .values((
            follows::follower_id.eq(follower),
            follows::following_id.eq(target),
        ))
        .on_conflict((follows::follower_id, follows::following_id))
        .do_nothing()
        .execute(connection)?;
    Ok(())
}

/// Idempotent: unfollowing a non-edge is a no-op, not an error.
pub fn unfollow(connection: &PgConnection, follower: i32, target: i32) -> Result<(), ApiError> {
    ensure_not_self(follower, target, "cannot unfollow yourself")?;
    delete(
        follows::table
            .filter(follows::follower_id.eq(follower))
            .filter(follows::following_id.eq(target)),
    ).execute(connection)?;
    Ok(())
}

pub fn is_following(
    connection: &PgConnection,
    follower: i32,
    target: i32,
) -> Result<bool, ApiError> {
    let query = select(exists(
        follows::table
            .filter(follows::follower_id.eq(follower))
            .filter(follows::following_id.eq(target)),
    ));
    query.get_result::<bool>(connection).map_err(|e| e.into())
}

/// Everyone the given user follows; feeds the personalized feed, where an
/// empty result short-circuits composition before the article store is hit.
pub fn following_ids(connection: &PgConnection, follower: i32) -> Result<Vec<i32>, ApiError> {
    follows::table
        .filter(follows::follower_id.eq(follower))
        .select(follows::following_id)
        .load::<i32>(connection)
        .map_err(|e| e.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn self_follow_is_rejected() {
        match ensure_not_self(3, 3, "cannot follow yourself") {
            Err(ApiError::InvalidOperation(message)) => {
                assert_eq!(message, "cannot follow yourself");
            }
            other => panic!("expected InvalidOperation, got {:?}", other),
        }
    }

    #[test]
    fn distinct_users_pass_the_self_check() {
        assert!(ensure_not_self(3, 4, "cannot follow yourself").is_ok());
    }
}
