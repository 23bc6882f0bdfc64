use rocket::fairing::AdHoc;

pub mod leaderboards;
pub mod platforms;
pub mod tasks;
pub mod types;
pub mod users;

pub fn stage() -> AdHoc {
    AdHoc::on_ignite("Installing entrypoints", |rocket| async {
        rocket
            .attach(platforms::stage())
            .attach(users::stage())
            .attach(tasks::stage())
            .attach(leaderboards::stage())
    })
}
