use anyhow::{anyhow, Context, Result};
use std::io::{self, BufRead};

/// Hash an admin password into the argon2 PHC string `ADMIN_PASSWORD_HASH`
/// expects. Reads one line from stdin when no password is given.
pub fn hash(password: Option<String>, env_line: bool) -> Result<()> {
    let password = match password {
        Some(password) => password,
        None => {
            let mut line = String::new();
            io::stdin()
                .lock()
                .read_line(&mut line)
                .context("Failed to read password from stdin")?;
            line.trim_end_matches(['\r', '\n']).to_string()
        }
    };

    if password.is_empty() {
        return Err(anyhow!("Password cannot be empty"));
    }

    let hash = user::hash_password(&password)?;
    if env_line {
        // Single quotes keep `$` separators literal for dotenv and shells
        println!("ADMIN_PASSWORD_HASH='{}'", hash);
    } else {
        println!("{}", hash);
    }

    Ok(())
}
