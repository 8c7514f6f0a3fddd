use rocket_contrib::Json;
use diesel::prelude::*;
use diesel::sql_query;
use diesel::sql_types::Text;
use db::DbConnection;
use types::ApiResult;

static SELECT_DISTINCT_TAGS: &str =
    "SELECT DISTINCT unnest(tag_list) AS tag FROM articles ORDER BY tag";

#[derive(Debug, QueryableByName)]
struct TagRow {
    #[sql_type = "Text"]
    tag: String,
}

#[derive(Debug, Serialize)]
pub struct TagsResponse {
    tags: Vec<String>,
}

#[get("/tags", format = "application/json")]
pub fn tags(connection: DbConnection) -> ApiResult<TagsResponse> {
    let rows = sql_query(SELECT_DISTINCT_TAGS).load::<TagRow>(&*connection)?;
    Ok(Json(TagsResponse {
        tags: rows.into_iter().map(|row| row.tag).collect(),
    }))
}
