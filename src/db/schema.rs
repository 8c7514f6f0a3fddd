table! {
    articles (id) {
        id -> Int4,
        author_id -> Int4,
        slug -> Text,
        title -> Text,
        description -> Text,
        body -> Text,
        tag_list -> Array<Text>,
        favorites_count -> Int4,
        created_at -> Timestamptz,
        updated_at -> Nullable<Timestamptz>,
    }
}

table! {
    follows (id) {
        id -> Int4,
        follower_id -> Int4,
        following_id -> Int4,
    }
}

table! {
    user_favorites (id) {
        id -> Int4,
        user_id -> Int4,
        article_id -> Int4,
    }
}

table! {
    users (id) {
        id -> Int4,
        username -> Varchar,
        email -> Text,
        password_hash -> Text,
        bio -> Text,
        image -> Text,
    }
}

joinable!(articles -> users (author_id));
joinable!(user_favorites -> articles (article_id));

allow_tables_to_appear_in_same_query!(articles, users);
allow_tables_to_appear_in_same_query!(user_favorites, articles);
