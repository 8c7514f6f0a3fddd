use rocket_contrib::Json;
use chrono::Utc;
use db::DbConnection;
use users::models::User;
use users::CurrentUser;
use types::{ApiError, ApiResult, Validate};
use favorites;

pub mod listing;
pub mod models;

use self::listing::{ArticleResponse, ArticleView, ArticlesResponse, FeedQuery, ListQuery};
use self::models::{CreateArticle, NewArticle, UpdateArticle};

#[post("/", format = "application/json", data = "<create>")]
pub fn create(
    connection: DbConnection,
    current_user: CurrentUser,
    create: Json<CreateArticle>,
) -> ApiResult<ArticleResponse<'static>> {
    let user = current_user?;
    let create = create.validate(&*connection)?.into_inner();
    let new_article = NewArticle::from_details(user.id, create.article, Utc::now());
    let article = models::insert(&connection, &new_article)?;

    // A fresh article is never favorited, and nobody follows themselves.
    let profile = user.into_profile(false);
    Ok(Json(ArticleResponse {
        article: ArticleView::new(article, profile, false),
    }))
}

#[get("/?<query>", format = "application/json")]
pub fn list(
    connection: DbConnection,
    viewer: Option<User>,
    query: ListQuery,
) -> ApiResult<ArticlesResponse<'static>> {
    Ok(Json(listing::list_articles(
        &connection,
        viewer.as_ref(),
        query,
    )?))
}

#[get("/", format = "application/json", rank = 2)]
pub fn list_default(
    connection: DbConnection,
    viewer: Option<User>,
) -> ApiResult<ArticlesResponse<'static>> {
    Ok(Json(listing::list_articles(
        &connection,
        viewer.as_ref(),
        ListQuery::default(),
    )?))
}

#[get("/feed?<query>", format = "application/json")]
pub fn feed(
    connection: DbConnection,
    current_user: CurrentUser,
    query: FeedQuery,
) -> ApiResult<ArticlesResponse<'static>> {
    let user = current_user?;
    Ok(Json(listing::feed(&connection, &user, query)?))
}

#[get("/feed", format = "application/json", rank = 2)]
pub fn feed_default(
    connection: DbConnection,
    current_user: CurrentUser,
) -> ApiResult<ArticlesResponse<'static>> {
    let user = current_user?;
    Ok(Json(listing::feed(&connection, &user, FeedQuery::default())?))
}

#[get("/<slug>", format = "application/json", rank = 3)]
pub fn get(
    connection: DbConnection,
    viewer: Option<User>,
    slug: String,
) -> ApiResult<ArticleResponse<'static>> {
    Ok(Json(listing::single(&connection, viewer.as_ref(), &slug)?))
}

#[put("/<slug>", format = "application/json", data = "<update>")]
pub fn update(
    connection: DbConnection,
    current_user: CurrentUser,
    slug: String,
    update: Json<UpdateArticle>,
) -> ApiResult<ArticleResponse<'static>> {
    let user = current_user?;
    let mut article = models::load_by_slug(&connection, &slug)?;
    if article.author_id != user.id {
        return Err(ApiError::Forbidden);
    }

    let update = update.into_inner();
    update.article.apply(&mut article, Utc::now());
    models::save(&connection, &article)?;

    Ok(Json(listing::single(&connection, Some(&user), &article.slug)?))
}

#[delete("/<slug>", format = "application/json")]
pub fn delete(connection: DbConnection, current_user: CurrentUser, slug: String) -> ApiResult<()> {
    let user = current_user?;
    let article = models::load_by_slug(&connection, &slug)?;
    if article.author_id != user.id {
        return Err(ApiError::Forbidden);
    }
    models::delete(&connection, &article)?;
    Ok(Json(()))
}

#[post("/<slug>/favorite", format = "application/json")]
pub fn favorite(
    connection: DbConnection,
    current_user: CurrentUser,
    slug: String,
) -> ApiResult<ArticleResponse<'static>> {
    let user = current_user?;
    let article = models::load_by_slug(&connection, &slug)?;
    favorites::add(&connection, user.id, article.id)?;
    Ok(Json(listing::single(&connection, Some(&user), &slug)?))
}

#[delete("/<slug>/favorite", format = "application/json")]
pub fn unfavorite(
    connection: DbConnection,
    current_user: CurrentUser,
    slug: String,
) -> ApiResult<ArticleResponse<'static>> {
    let user = current_user?;
    let article = models::load_by_slug(&connection, &slug)?;
    favorites::remove(&connection, user.id, article.id)?;
    Ok(Json(listing::single(&connection, Some(&user), &slug)?))
}
