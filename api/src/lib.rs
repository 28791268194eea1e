//! An api for ranking phrases by head-to-head comparison.

#[macro_use]
extern crate rocket;

pub mod config;
pub mod helpers;
pub mod routes;

use config::ApiConfig;
use helpers::{CorsFairing, RequestTimingFairing};
use phrase_ranker_common::store::PhraseStore;
use rocket::{Build, Rocket};
use rocket_prometheus::PrometheusMetrics;
use std::sync::Arc;

/// Shared by every request: the store handle and configuration.
pub struct ApiState {
    pub store: Arc<dyn PhraseStore>,
    pub config: ApiConfig,
}

pub fn build_rocket(store: Arc<dyn PhraseStore>, config: ApiConfig) -> Rocket<Build> {
    let prometheus = PrometheusMetrics::new();
    let cors = CorsFairing::new(config.cors.clone());

    rocket::build()
        .manage(ApiState { store, config })
        .attach(RequestTimingFairing)
        .attach(cors)
        .attach(prometheus.clone())
        .mount(
            "/",
            routes![
                routes::index,
                routes::test_connection,
                routes::get_pair,
                routes::create_phrase,
                routes::submit_comparison,
                routes::get_ranked,
                routes::preflight,
            ],
        )
        .mount("/metrics", prometheus)
        .register(
            "/",
            catchers![
                helpers::not_found,
                helpers::unprocessable_entity,
                helpers::internal_server_error,
                helpers::default_catcher,
            ],
        )
}
