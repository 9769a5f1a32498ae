//! Auth command handlers.

use std::io::{self, BufRead};

use anyhow::{Result, bail};
use foundee_core::auth;
use foundee_core::routes::Route;
use foundee_core::session::mask_token;

use super::App;

pub async fn login(
    app: &App,
    id_token: Option<&str>,
    email: Option<&str>,
    force: bool,
) -> Result<Option<Route>> {
    if !force {
        let existing = app.session().credential();
        if let Some(destination) = auth::already_signed_in(app.session())? {
            if let Some(token) = existing {
                println!("Already signed in (token: {})", mask_token(&token));
            }
            return Ok(Some(destination));
        }
    }

    let destination = match (id_token, email) {
        (Some(token), _) => auth::sign_in_with_identity_credential(&app.client, token).await?,
        (None, Some(email)) => {
            let password = read_password()?;
            auth::sign_in_with_password(&app.client, email, &password).await?
        }
        (None, None) => {
            bail!("Please specify --id-token <GOOGLE_ID_TOKEN> or --email <EMAIL>")
        }
    };

    println!("Signed in.");
    Ok(Some(destination))
}

fn read_password() -> Result<String> {
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

pub fn logout(app: &App) -> Result<Option<Route>> {
    if auth::sign_out(app.session())? {
        println!("Signed out.");
    } else {
        println!("Not signed in.");
    }
    println!("Sign in with `foundee login --id-token <TOKEN>` or `foundee login --email <EMAIL>`.");
    Ok(None)
}

pub async fn whoami(app: &App) -> Result<Option<Route>> {
    let here = Route::Registry;
    if let Err(route) = app.session().require_for(&here) {
        return Ok(Some(route));
    }
    match app.client.me().await {
        Ok(user) => {
            match user.name.as_deref() {
                Some(name) => println!("{name} <{}>", user.email_id),
                None => println!("{}", user.email_id),
            }
            println!("id: {}", user.id);
            Ok(None)
        }
        Err(err) => match app.session().sign_in_if_rejected(&err, &here) {
            Some(route) => Ok(Some(route)),
            None => Err(err.into()),
        },
    }
}
