//! Prints a bcrypt hash for seeding the first admin account:
//!
//! ```text
//! cargo run --bin hash-password -- 'correct horse battery staple'
//! ```

use news_portal::{
    auth::hash_password,
    config::DEFAULT_BCRYPT_COST,
    models::MIN_PASSWORD_LENGTH,
};
use std::{env, process::ExitCode};

fn main() -> ExitCode {
    let Some(password) = env::args().nth(1) else {
        eprintln!("usage: hash-password <password>");
        return ExitCode::FAILURE;
    };
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        eprintln!("password must be at least {MIN_PASSWORD_LENGTH} characters long");
        return ExitCode::FAILURE;
    }

    let cost = env::var("BCRYPT_COST")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(DEFAULT_BCRYPT_COST);

    match hash_password(&password, cost) {
        Ok(hash) => {
            println!("{hash}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("hashing failed: {e}");
            ExitCode::FAILURE
        }
    }
}
