//! `vitrine auth ...`

use std::io::Write;

use secrecy::SecretString;

use vitrine_storefront::AppState;
use vitrine_storefront::views::Header;

use super::{CommandResult, write_header};

pub async fn sign_up(
    state: &mut AppState,
    email: &str,
    password: String,
    username: &str,
    out: &mut impl Write,
) -> CommandResult {
    let password = SecretString::from(password);
    state.sign_up(email, &password, username).await?;
    write_message(state, out)
}

pub async fn sign_in(
    state: &mut AppState,
    email: &str,
    password: String,
    out: &mut impl Write,
) -> CommandResult {
    let password = SecretString::from(password);
    state.sign_in(email, &password).await?;
    write_message(state, out)?;
    write_header(out, &Header::of(state))?;
    Ok(())
}

pub async fn sign_out(state: &mut AppState, out: &mut impl Write) -> CommandResult {
    state.sign_out().await?;
    write_message(state, out)
}

/// Print the signed-in user, or that nobody is.
pub fn whoami(state: &AppState, out: &mut impl Write) -> CommandResult {
    let session = state.session();
    let Some(user_id) = session.user_id() else {
        writeln!(out, "Not signed in.")?;
        return Ok(());
    };

    writeln!(out, "User:  {user_id}")?;
    if let Some(email) = session.email() {
        writeln!(out, "Email: {email}")?;
    }
    if let Some(name) = session.display_name() {
        writeln!(out, "Name:  {name}")?;
    }
    writeln!(out, "Admin: {}", if session.is_admin() { "yes" } else { "no" })?;
    Ok(())
}

fn write_message(state: &AppState, out: &mut impl Write) -> CommandResult {
    if let Some(message) = state.session().message() {
        writeln!(out, "{message}")?;
    }
    Ok(())
}
