//! Prints an Argon2id PHC string for each password given on the command line
//!
//! Usage: gen_hash <password>...

use quillpost_api::password::hash_password;
use std::process::ExitCode;

fn main() -> ExitCode {
    let passwords: Vec<String> = std::env::args().skip(1).collect();
    if passwords.is_empty() {
        eprintln!("usage: gen_hash <password>...");
        return ExitCode::FAILURE;
    }

    for password in &passwords {
        match hash_password(password) {
            Ok(hash) => println!("{}", hash),
            Err(e) => {
                eprintln!("failed to hash password: {}", e);
                return ExitCode::FAILURE;
            }
        }
    }
    ExitCode::SUCCESS
}
