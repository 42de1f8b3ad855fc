//! CLI account commands: `signup`, `login`, `passwd`.

use anyhow::{bail, Context, Result};

use neurolinker::storage::StorageBackend;

use super::{authenticate, Credentials};

/// Register a new account.
pub fn signup(storage: &dyn StorageBackend, credentials: &Credentials, full_name: &str) -> Result<()> {
    let (Some(email), Some(password)) = (&credentials.email, &credentials.password) else {
        bail!("signup needs --email and --password");
    };
    if !email.contains('@') {
        bail!("{email} is not an email address");
    }
    if password.is_empty() {
        bail!("password must not be empty");
    }

    let created = storage
        .create_user(email, password, full_name)
        .context("failed to create account")?;
    if !created {
        bail!("an account for {email} already exists");
    }

    println!("Account created for {email} ({} store).", storage.kind());
    Ok(())
}

/// Check credentials and greet the user.
pub fn login(storage: &dyn StorageBackend, credentials: &Credentials) -> Result<()> {
    let user = authenticate(storage, credentials)?;
    let name = if user.full_name.is_empty() { &user.email } else { &user.full_name };
    println!("Welcome back, {name}!");
    println!("  User id:     {}", user.id);
    println!("  Member since {}", user.created_at.format("%Y-%m-%d"));
    Ok(())
}

/// Change the signed-in user's password.
pub fn passwd(storage: &dyn StorageBackend, credentials: &Credentials, new_password: &str) -> Result<()> {
    let user = authenticate(storage, credentials)?;
    if new_password.is_empty() {
        bail!("new password must not be empty");
    }
    if !storage
        .update_user_password(&user.id, new_password)
        .context("failed to update password")?
    {
        bail!("user {} no longer exists", user.id);
    }
    tracing::info!(user_id = %user.id, "password changed");
    println!("Password updated.");
    Ok(())
}
