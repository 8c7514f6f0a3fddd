//! Favorites store: user -> article edges plus the denormalized
//! `favorites_count` on articles. The edge and the counter always move
//! inside one transaction, keyed off whether the insert/delete actually
//! touched a row, so re-adding never double-increments and the counter
//! stays non-negative.

use diesel::prelude::*;
use diesel::pg::PgConnection;
use diesel::dsl::exists;
use diesel::result::Error as DieselError;
use diesel::{delete, insert_into, select, update};
use db::schema::{articles, user_favorites};
use types::ApiError;

pub fn add(connection: &PgConnection, user: i32, article: i32) -> Result<(), ApiError> {
    connection
        .transaction::<_, DieselError, _>(|| {
            let inserted = insert_into(user_favorites::table)
                .values((
                    user_favorites::user_id.eq(user),
                    user_favorites::article_id.eq(article),
                ))
                .on_conflict((user_favorites::user_id, user_favorites::article_id))
                .do_nothing()
                .execute(connection)?;
            if inserted > 0 {
                update(articles::table.find(article))
                    .set(articles::favorites_count.eq(articles::favorites_count + 1))
                    .execute(connection)?;
            }
            Ok(())
        })
        .map_err(ApiError::from)
}

pub fn remove(connection: &PgConnection, user: i32, article: i32) -> Result<(), ApiError> {
    connection
        .transaction::<_, DieselError, _>(|| {
            let deleted = delete(
                user_favorites::table
                    .filter(user_favorites::user_id.eq(user))
                    .filter(user_favorites::article_id.eq(article)),
            ).execute(connection)?;
            if deleted > 0 {
                update(articles::table.find(article))
                    .set(articles::favorites_count.eq(articles::favorites_count - 1))
                    .execute(connection)?;
            }
            Ok(())
        })
        .map_err(ApiError::from)
}

/// The viewer's whole favorite set, fetched once per listing request.
pub fn favorited_ids(connection: &PgConnection, user: i32) -> Result<Vec<i32>, ApiError> {
    user_favorites::table
        .filter(user_favorites::user_id.eq(user))
        .select(user_favorites::article_id)
        .load::<i32>(connection)
        .map_err(|e| e.into())
}

pub fn is_favorited(
    connection: &PgConnection,
    user: i32,
    article: i32,
) -> Result<bool, ApiError> {
    let query = select(exists(
        user_favorites::table
            .filter(user_favorites::user_id.eq(user))
            .filter(user_favorites::article_id.eq(article)),
    ));
    query.get_result::<bool>(connection).map_err(|e| e.into())
}
