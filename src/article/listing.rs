//! Feed composition: turns repository rows into viewer-annotated article
//! views and the `{ articles, articlesCount }` envelope.

use std::collections::HashSet;
use chrono::{DateTime, Utc};
use diesel::pg::PgConnection;
use article::models::{self, Article, ArticleFilter, Page};
use users::models::User;
use profile::Profile;
use favorites;
use follows;
use types::ApiError;
use utils::serialize_date;

#[derive(Debug, Default, FromForm)]
pub struct ListQuery {
    pub tag: Option<String>,
    pub author: Option<String>,
    pub favorited: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Default, FromForm)]
pub struct FeedQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// Per-request viewer context: both id sets are fetched once, never per
/// article. Anonymous viewers get empty sets, so every flag comes out
/// false.
pub struct ViewerState {
    favorites: HashSet<i32>,
    following: HashSet<i32>,
}

impl ViewerState {
    pub fn anonymous() -> ViewerState {
        ViewerState {
            favorites: HashSet::new(),
            following: HashSet::new(),
        }
    }

    pub fn load(connection: &PgConnection, viewer: &User) -> Result<ViewerState, ApiError> {
        Ok(ViewerState {
            favorites: favorites::favorited_ids(connection, viewer.id)?
                .into_iter()
                .collect(),
            following: follows::following_ids(connection, viewer.id)?
                .into_iter()
                .collect(),
        })
    }

    pub fn for_viewer(
        connection: &PgConnection,
        viewer: Option<&User>,
    ) -> Result<ViewerState, ApiError> {
        match viewer {
            Some(viewer) => ViewerState::load(connection, viewer),
            None => Ok(ViewerState::anonymous()),
        }
    }

    pub fn favorited(&self, article_id: i32) -> bool {
        self.favorites.contains(&article_id)
    }

    pub fn follows(&self, user_id: i32) -> bool {
        self.following.contains(&user_id)
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArticleView<'a> {
    pub slug: String,
    pub title: String,
    pub description: String,
    pub body: String,
    pub tag_list: Vec<String>,
    #[serde(serialize_with = "serialize_date")]
    pub created_at: DateTime<Utc>,
    #[serde(serialize_with = "serialize_date")]
    pub updated_at: DateTime<Utc>,
    pub favorited: bool,
    pub favorites_count: i32,
    pub author: Profile<'a>,
}

impl<'a> ArticleView<'a> {
    pub fn new(article: Article, author: Profile<'a>, favorited: bool) -> ArticleView<'a> {
        // A never-updated article reports its creation time as updatedAt.
        let updated_at = article.updated_at.unwrap_or(article.created_at);
        ArticleView {
            slug: article.slug,
            title: article.title,
            description: article.description,
            body: article.body,
            tag_list: article.tag_list,
            created_at: article.created_at,
            updated_at: updated_at,
            favorited: favorited,
            favorites_count: article.favorites_count,
            author: author,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ArticleResponse<'a> {
    pub article: ArticleView<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArticlesResponse<'a> {
    pub articles: Vec<ArticleView<'a>>,
    pub articles_count: i64,
}

impl<'a> ArticlesResponse<'a> {
    pub fn empty() -> ArticlesResponse<'static> {
        ArticlesResponse {
            articles: Vec::new(),
            articles_count: 0,
        }
    }
}

pub fn annotate(items: Vec<(Article, User)>, state: &ViewerState) -> Vec<ArticleView<'static>> {
    items
        .into_iter()
        .map(|(article, author)| {
            let favorited = state.favorited(article.id);
            let profile = author.into_profile(state.follows(article.author_id));
            ArticleView::new(article, profile, favorited)
        })
        .collect()
}

/// Global listing: username filters are resolved here; an unknown username
/// or an empty favoriter set yields an empty envelope, not an error.
pub fn list_articles(
    connection: &PgConnection,
    viewer: Option<&User>,
    query: ListQuery,
) -> Result<ArticlesResponse<'static>, ApiError> {
    let mut filter = ArticleFilter::default();
    filter.tag = query.tag;

    if let Some(ref author_name) = query.author {
        match User::load_by_name(author_name, connection) {
            Ok(author) => filter.author = Some(author.id),
            Err(ApiError::NotFound) => return Ok(ArticlesResponse::empty()),
            Err(e) => return Err(e),
        }
    }

    if let Some(ref favoriter_name) = query.favorited {
        match User::load_by_name(favoriter_name, connection) {
            Ok(favoriter) => {
                let ids = favorites::favorited_ids(connection, favoriter.id)?;
                if ids.is_empty() {
                    return Ok(ArticlesResponse::empty());
                }
                filter.ids = Some(ids);
            }
            Err(ApiError::NotFound) => return Ok(ArticlesResponse::empty()),
            Err(e) => return Err(e),
        }
    }

    let page = Page {
        limit: query.limit,
        offset: query.offset,
    };
    let (items, total) = models::list(connection, &filter, &page)?;
    let state = ViewerState::for_viewer(connection, viewer)?;

    Ok(ArticlesResponse {
        articles: annotate(items, &state),
        articles_count: total,
    })
}

/// Personalized feed: articles by followed authors only. An empty follow
/// set returns the empty envelope without querying the article store.
pub fn feed(
    connection: &PgConnection,
    viewer: &User,
    query: FeedQuery,
) -> Result<ArticlesResponse<'static>, ApiError> {
    let following = follows::following_ids(connection, viewer.id)?;
    if following.is_empty() {
        return Ok(ArticlesResponse::empty());
    }

    let mut filter = ArticleFilter::default();
    filter.authors = Some(following.clone());
    let page = Page {
        limit: query.limit,
        offset: query.offset,
    };
    let (items, total) = models::list(connection, &filter, &page)?;
    let state = ViewerState {
        favorites: favorites::favorited_ids(connection, viewer.id)?
            .into_iter()
            .collect(),
        following: following.into_iter().collect(),
    };

    Ok(ArticlesResponse {
        articles: annotate(items, &state),
        articles_count: total,
    })
}

/// Single-article fetch, annotated the same way list items are.
pub fn single(
    connection: &PgConnection,
    viewer: Option<&User>,
    slug: &str,
) -> Result<ArticleResponse<'static>, ApiError> {
    let (article, author) = models::load_with_author(connection, slug)?;
    let (favorited, following) = match viewer {
        Some(viewer) => (
            favorites::is_favorited(connection, viewer.id, article.id)?,
            follows::is_following(connection, viewer.id, author.id)?,
        ),
        None => (false, false),
    };
    let profile = author.into_profile(following);

    Ok(ArticleResponse {
        article: ArticleView::new(article, profile, favorited),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json;

    fn author() -> User {
        User {
            id: 7,
            username: "alice".to_string(),
            email: "alice@example.com".to_string(),
            password_hash: "hash".to_string(),
            bio: String::new(),
            image: String::new(),
        }
    }

    fn article(id: i32) -> Article {
        Article {
            id: id,
            author_id: 7,
            slug: format!("hello-world-abc12{}", id),
            title: "Hello World".to_string(),
            description: "greeting".to_string(),
            body: "hello".to_string(),
            tag_list: vec!["greetings".to_string(), "dragons".to_string()],
            favorites_count: 3,
            created_at: Utc.ymd(2018, 3, 1).and_hms(12, 0, 0),
            updated_at: None,
        }
    }

    fn state(favorites: Vec<i32>, following: Vec<i32>) -> ViewerState {
        ViewerState {
            favorites: favorites.into_iter().collect(),
            following: following.into_iter().collect(),
        }
    }

    #[test]
    fn anonymous_viewer_gets_all_flags_false() {
        let views = annotate(
            vec![(article(1), author()), (article(2), author())],
            &ViewerState::anonymous(),
        );
        assert_eq!(views.len(), 2);
        for view in &views {
            assert!(!view.favorited);
            assert!(!view.author.following);
        }
    }

    #[test]
    fn flags_come_from_the_viewer_sets() {
        let views = annotate(
            vec![(article(1), author()), (article(2), author())],
            &state(vec![2], vec![7]),
        );
        assert!(!views[0].favorited);
        assert!(views[1].favorited);
        assert!(views[0].author.following);
        assert!(views[1].author.following);
    }

    #[test]
    fn updated_at_falls_back_to_created_at() {
        let view = ArticleView::new(article(1), author().into_profile(false), false);
        assert_eq!(view.updated_at, view.created_at);

        let mut updated = article(1);
        let later = Utc.ymd(2018, 4, 1).and_hms(8, 30, 0);
        updated.updated_at = Some(later);
        let view = ArticleView::new(updated, author().into_profile(false), false);
        assert_eq!(view.updated_at, later);
    }

    #[test]
    fn article_json_is_camel_cased() {
        let view = ArticleView::new(article(1), author().into_profile(true), true);
        let json = serde_json::to_value(&view).unwrap();
        let object = json.as_object().unwrap();
        assert!(object.contains_key("tagList"));
        assert!(object.contains_key("favoritesCount"));
        assert_eq!(object["createdAt"], "2018-03-01T12:00:00.000Z");
        assert_eq!(object["author"]["username"], "alice");
        assert_eq!(object["author"]["following"], true);
        assert!(object["author"].as_object().unwrap().get("email").is_none());
    }

    // articlesCount reflects the filtered set, not the page that came back
    // with it.
    #[test]
    fn envelope_count_is_independent_of_page_size() {
        let response = ArticlesResponse {
            articles: annotate(vec![(article(1), author())], &ViewerState::anonymous()),
            articles_count: 41,
        };
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["articlesCount"], 41);
        assert_eq!(json["articles"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn empty_envelope_is_zero_articles_zero_count() {
        let json = serde_json::to_value(&ArticlesResponse::empty()).unwrap();
        assert_eq!(json["articlesCount"], 0);
        assert_eq!(json["articles"].as_array().unwrap().len(), 0);
    }
}
