#![feature(plugin)]
#![feature(custom_derive)]
#![plugin(rocket_codegen)]
#![feature(entry_or_default)]

extern crate dotenv;
extern crate rocket;

#[macro_use]
extern crate error_chain;

#[macro_use]
extern crate diesel;
extern crate r2d2;
extern crate r2d2_diesel;

extern crate chrono;
extern crate crypto;
extern crate jwt;
#[macro_use]
extern crate lazy_static;
extern crate rand;
extern crate regex;
#[macro_use]
extern crate rocket_contrib;
extern crate serde;
#[macro_use]
extern crate serde_derive;
extern crate serde_json;

extern crate slug;

mod config;
mod db;
mod users;
mod types;
mod utils;
mod profile;
mod follows;
mod favorites;
mod article;
mod tags;

use rocket::request::Request;
use rocket::response::content;

#[error(422)]
fn handle_422(_req: &Request) -> content::Json<String> {
    let json = json!({
        "errors": [
            "unprocessable entity"
        ]
    });
    content::Json(json.to_string())
}

#[error(404)]
fn not_found(_req: &Request) -> content::Json<String> {
    let json = json!({
        "errors": [
            "entity not found"
        ]
    });
    content::Json(json.to_string())
}

fn main() {
    let config = config::Config::from_env().expect("DATABASE_URL and JWT_SECRET must be set");
    let pool = db::init_pool(&config).expect("Failed to create database pool");
    rocket::ignite()
        .manage(pool)
        .manage(config)
        .mount("/api/users", routes!(users::register, users::login,))
        .mount("/api", routes!(users::current, users::update))
        .mount(
            "/api",
            routes!(profile::profile, profile::follow, profile::unfollow),
        )
        .mount(
            "/api/articles",
            routes!(
                article::list,
                article::list_default,
                article::feed,
                article::feed_default,
                article::get,
                article::create,
                article::update,
                article::delete,
                article::favorite,
                article::unfavorite
            ),
        )
        .mount("/api", routes!(tags::tags))
        .catch(errors![not_found, handle_422])
        .launch();
}
