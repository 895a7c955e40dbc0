use rocket::{Build, Rocket};

#[rocket::launch]
async fn rocket() -> Rocket<Build> {
    match portfolio_api::build_rocket().await {
        Ok(rocket) => rocket,
        Err(e) => {
            eprintln!("Failed to start portfolio api: {}", e);
            std::process::exit(1);
        }
    }
}
