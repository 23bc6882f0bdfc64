#[macro_use]
extern crate rocket;

mod entrypoints;

use shared::XpWeights;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::EnvFilter;

use studytrack_server::{api::Connectors, db};

#[derive(Debug, serde::Deserialize)]
pub struct Env {
    github_token: Option<String>,
}

#[launch]
async fn rocket() -> _ {
    dotenv::dotenv().ok();

    let subscriber = tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer().pretty());
    tracing::subscriber::set_global_default(subscriber).expect("Failed to set subscriber");

    let env = envy::from_env::<Env>().expect("Failed to load environment variables");
    let weights = envy::from_env::<XpWeights>().expect("Failed to load XP weights");
    if env.github_token.is_none() {
        tracing::warn!("GITHUB_TOKEN is not set; GitHub contribution counts will be zero");
    }

    let connectors =
        Connectors::new(env.github_token).expect("Failed to build platform connectors");
    let cors = rocket_cors::CorsOptions::default()
        .to_cors()
        .expect("Failed to build CORS options");

    rocket::build()
        .attach(db::stage())
        .attach(cors)
        .manage(weights)
        .manage(connectors)
        .attach(entrypoints::stage())
}
