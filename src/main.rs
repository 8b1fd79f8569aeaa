mod achievements;
mod actors;
mod campus;
mod certificates;
mod classes;
mod courses;
mod db;
mod error;
mod feed;
mod models;
mod protocol;
mod questionnaires;
mod roles;
mod schema;
mod seed;
mod submissions;
mod types;

use std::env;

#[tokio::main(flavor = "multi_thread", worker_threads = 4)]
async fn main() {
    env_logger::init();

    let Ok(config_str) = &env::var("CAMPUS_CONFIG") else {
        log::error!("Config not found! Set env variable \"CAMPUS_CONFIG\"");
        return;
    };

    let config =
        match serde_json::from_str::<campus::CampusConfig>(config_str) {
            Ok(config) => config,
            Err(err) => {
                log::error!("Error parsing config:\n{}\n\n{}", err, config_str);
                return;
            }
        };

    let campus = campus::Campus::new(config).await;
    campus.run().await;
}
