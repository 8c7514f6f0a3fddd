use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel::pg::PgConnection;
use diesel::{delete as diesel_delete, insert_into, update as diesel_update};
use db::schema::{articles, users};
use users::models::User;
use types::{ApiError, Validate, ValidationError};
use rand::{self, Rng};
use slug::slugify;

#[derive(Debug, Clone, PartialEq, Identifiable, Queryable, Associations, AsChangeset)]
#[belongs_to(User, foreign_key = "author_id")]
#[table_name = "articles"]
pub struct Article {
    pub id: i32,
    pub author_id: i32,
    pub slug: String,
    pub title: String,
    pub description: String,
    pub body: String,
    pub tag_list: Vec<String>,
    pub favorites_count: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Insertable)]
#[table_name = "articles"]
pub struct NewArticle {
    pub author_id: i32,
    pub slug: String,
    pub title: String,
    pub description: String,
    pub body: String,
    pub tag_list: Vec<String>,
    pub favorites_count: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl NewArticle {
    pub fn from_details(author: i32, details: ArticleDetails, now: DateTime<Utc>) -> NewArticle {
        NewArticle {
            author_id: author,
            slug: generate_slug(&details.title),
            title: details.title,
            description: details.description,
            body: details.body,
            tag_list: details.tag_list,
            favorites_count: 0,
            created_at: now,
            updated_at: None,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ArticleDetails {
    pub title: String,
    pub description: String,
    pub body: String,
    #[serde(rename = "tagList", default)]
    pub tag_list: Vec<String>,
}

impl ArticleDetails {
    fn field_errors(&self) -> ValidationError {
        let mut error = ValidationError::default();
        if self.body.trim().len() == 0 {
            error.add_error("body", "empty body");
        }

        if self.title.trim().len() == 0 {
            error.add_error("title", "empty title");
        }

        if self.description.trim().len() == 0 {
            error.add_error("description", "empty description");
        }
        error
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateArticle {
    pub article: ArticleDetails,
}

impl Validate for CreateArticle {
    type Error = ValidationError;
    fn validate(self, _connection: &PgConnection) -> Result<Self, ValidationError> {
        let error = self.article.field_errors();
        if error.empty() {
            Ok(self)
        } else {
            Err(error)
        }
    }
}

/// Explicit patch: only the enumerated fields are updatable, applied one by
/// one. The slug is regenerated exactly when a title is present.
#[derive(Debug, Default, Deserialize)]
pub struct ArticlePatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub body: Option<String>,
    #[serde(rename = "tagList")]
    pub tag_list: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateArticle {
    pub article: ArticlePatch,
}

impl ArticlePatch {
    pub fn apply(self, article: &mut Article, now: DateTime<Utc>) {
        if let Some(title) = self.title {
            article.slug = generate_slug(&title);
            article.title = title;
        }
        if let Some(description) = self.description {
            article.description = description;
        }
        if let Some(body) = self.body {
            article.body = body;
        }
        if let Some(tag_list) = self.tag_list {
            article.tag_list = tag_list;
        }
        article.updated_at = Some(now);
    }
}

const BASE36: &'static [u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

fn random_suffix() -> String {
    let mut rng = rand::thread_rng();
    (0..6)
        .map(|_| BASE36[rng.gen_range(0, BASE36.len())] as char)
        .collect()
}

/// Slug = slugified title plus a random suffix, so duplicate titles get
/// distinct slugs. Uniqueness is not re-checked here; a collision surfaces
/// from the storage constraint as `Conflict`.
pub fn generate_slug(title: &str) -> String {
    format!("{}-{}", slugify(title), random_suffix())
}

/// The `tag` filter is a substring match against the joined tag list.
pub fn tag_pattern(tag: &str) -> String {
    format!("%{}%", tag)
}

/// Independently optional restrictions on a listing; `ids` comes from a
/// favoriter's favorite set, `authors` from the viewer's follow set.
#[derive(Debug, Default)]
pub struct ArticleFilter {
    pub tag: Option<String>,
    pub author: Option<i32>,
    pub ids: Option<Vec<i32>>,
    pub authors: Option<Vec<i32>>,
}

#[derive(Debug, Default)]
pub struct Page {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

pub fn insert(connection: &PgConnection, new_article: &NewArticle) -> Result<Article, ApiError> {
    insert_into(articles::table)
        .values(new_article)
        .get_result::<Article>(connection)
        .map_err(|e| e.into())
}

pub fn load_by_slug(connection: &PgConnection, slug_: &str) -> Result<Article, ApiError> {
    articles::table
        .filter(articles::slug.eq(slug_))
        .get_result::<Article>(connection)
        .map_err(|e| e.into())
}

pub fn load_with_author(
    connection: &PgConnection,
    slug_: &str,
) -> Result<(Article, User), ApiError> {
    articles::table
        .inner_join(users::table)
        .select((articles::all_columns, users::all_columns))
        .filter(articles::slug.eq(slug_))
        .get_result::<(Article, User)>(connection)
        .map_err(|e| e.into())
}

pub fn save(connection: &PgConnection, article: &Article) -> Result<(), ApiError> {
    diesel_update(article).set(article).execute(connection)?;
    Ok(())
}

pub fn delete(connection: &PgConnection, article: &Article) -> Result<(), ApiError> {
    diesel_delete(article).execute(connection)?;
    Ok(())
}

/// Filtered, sorted, paginated fetch plus the count of the filtered set
/// before pagination. Order is newest first; equal timestamps keep
/// insertion order.
pub fn list(
    connection: &PgConnection,
    filter: &ArticleFilter,
    page: &Page,
) -> Result<(Vec<(Article, User)>, i64), ApiError> {
    use diesel::dsl::{any, count_star, sql};
    use diesel::sql_types::Text;

    let mut total = articles::table.select(count_star()).into_boxed();
    if let Some(ref tag) = filter.tag {
        total = total.filter(
            sql("array_to_string(articles.tag_list, ',') LIKE ")
                .bind::<Text, _>(tag_pattern(tag)),
        );
    }
    if let Some(author_id) = filter.author {
        total = total.filter(articles::author_id.eq(author_id));
    }
    if let Some(ref ids) = filter.ids {
        total = total.filter(articles::id.eq(any(ids.clone())));
    }
    if let Some(ref authors) = filter.authors {
        total = total.filter(articles::author_id.eq(any(authors.clone())));
    }
    let total = total.get_result::<i64>(connection)?;

    let mut query = articles::table
        .inner_join(users::table)
        .select((articles::all_columns, users::all_columns))
        .order((articles::created_at.desc(), articles::id.asc()))
        .into_boxed();
    if let Some(ref tag) = filter.tag {
        query = query.filter(
            sql("array_to_string(articles.tag_list, ',') LIKE ")
                .bind::<Text, _>(tag_pattern(tag)),
        );
    }
    if let Some(author_id) = filter.author {
        query = query.filter(articles::author_id.eq(author_id));
    }
    if let Some(ref ids) = filter.ids {
        query = query.filter(articles::id.eq(any(ids.clone())));
    }
    if let Some(ref authors) = filter.authors {
        query = query.filter(articles::author_id.eq(any(authors.clone())));
    }
    if let Some(limit) = page.limit {
        query = query.limit(limit);
    }
    if let Some(offset) = page.offset {
        query = query.offset(offset);
    }
    let items = query.load::<(Article, User)>(connection)?;

    Ok((items, total))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use regex::Regex;

    fn article() -> Article {
        Article {
            id: 1,
            author_id: 7,
            slug: "hello-world-abc123".to_string(),
            title: "Hello World".to_string(),
            description: "greeting".to_string(),
            body: "hello".to_string(),
            tag_list: vec!["greetings".to_string()],
            favorites_count: 0,
            created_at: Utc.ymd(2018, 3, 1).and_hms(12, 0, 0),
            updated_at: None,
        }
    }

    #[test]
    fn slug_is_slugified_title_plus_base36_suffix() {
        let slug = generate_slug("Hello World");
        let re = Regex::new(r"^hello-world-[0-9a-z]{6}$").unwrap();
        assert!(re.is_match(&slug), "unexpected slug: {}", slug);
    }

    #[test]
    fn same_title_twice_gives_different_slugs() {
        let first = generate_slug("Hello World");
        let second = generate_slug("Hello World");
        assert_ne!(first, second);
    }

    #[test]
    fn patch_with_title_regenerates_slug() {
        let mut article = article();
        let old_slug = article.slug.clone();
        let patch = ArticlePatch {
            title: Some("Goodbye World".to_string()),
            ..ArticlePatch::default()
        };
        let now = Utc.ymd(2018, 3, 2).and_hms(9, 0, 0);
        patch.apply(&mut article, now);
        assert_eq!(article.title, "Goodbye World");
        assert_ne!(article.slug, old_slug);
        assert!(article.slug.starts_with("goodbye-world-"));
        assert_eq!(article.updated_at, Some(now));
    }

    #[test]
    fn patch_without_title_keeps_slug_and_other_fields() {
        let mut article = article();
        let old_slug = article.slug.clone();
        let patch = ArticlePatch {
            body: Some("goodbye".to_string()),
            ..ArticlePatch::default()
        };
        patch.apply(&mut article, Utc.ymd(2018, 3, 2).and_hms(9, 0, 0));
        assert_eq!(article.slug, old_slug);
        assert_eq!(article.title, "Hello World");
        assert_eq!(article.body, "goodbye");
        assert_eq!(article.tag_list, vec!["greetings".to_string()]);
    }

    #[test]
    fn new_articles_start_with_zero_favorites() {
        let details = ArticleDetails {
            title: "Hello World".to_string(),
            description: "greeting".to_string(),
            body: "hello".to_string(),
            tag_list: vec![],
        };
        let new_article = NewArticle::from_details(7, details, Utc::now());
        assert_eq!(new_article.favorites_count, 0);
        assert!(new_article.updated_at.is_none());
        assert!(new_article.slug.starts_with("hello-world-"));
    }

    // Substring matching means a filter for "dragons" also hits an article
    // tagged "dragonsbane".
    #[test]
    fn tag_filter_matches_substrings() {
        let pattern = tag_pattern("dragons");
        assert_eq!(pattern, "%dragons%");
        let joined_tags = "magic,dragonsbane";
        assert!(joined_tags.contains("dragons"));
    }

    #[test]
    fn blank_create_fields_fail_validation() {
        let details = ArticleDetails {
            title: "  ".to_string(),
            description: String::new(),
            body: "hello".to_string(),
            tag_list: vec![],
        };
        let errors = details.field_errors();
        assert_eq!(errors.len(), 2);

        let details = ArticleDetails {
            title: "Hello World".to_string(),
            description: "greeting".to_string(),
            body: "hello".to_string(),
            tag_list: vec![],
        };
        assert!(details.field_errors().empty());
    }
}
