//! The main function for the readlog command line application

fn main() {
    // a missing .env file is fine, the environment may be set up by other means
    dotenvy::dotenv().ok();
    readlog_lib::run();
}
