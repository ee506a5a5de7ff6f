//! Session command handlers: login, register, logout, whoami.

use std::path::PathBuf;

use anyhow::{Context, Result};
use crmx_core::config::Config;
use crmx_core::types::{FileUpload, RegisterForm};

pub async fn login(config: &Config, email: &str, password: Option<String>) -> Result<()> {
    let password = match password {
        Some(password) => password,
        None => super::prompt_line("Password: ")?,
    };

    let mut controller = super::session_controller(config);
    let profile = controller.login(email, &password).await?;
    println!("Logged in as {} <{}>", profile.full_name(), profile.email);
    Ok(())
}

pub struct RegisterArgs {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub password: Option<String>,
    pub profile_image: Option<PathBuf>,
}

pub async fn register(config: &Config, args: RegisterArgs) -> Result<()> {
    let password = match args.password {
        Some(password) => password,
        None => super::prompt_new_password()?,
    };

    let profile_image = args
        .profile_image
        .as_deref()
        .map(FileUpload::from_path)
        .transpose()
        .context("load profile image")?;

    let form = RegisterForm {
        first_name: args.first_name,
        last_name: args.last_name,
        email: args.email,
        // The backend validates the confirmation again server-side.
        password: password.clone(),
        password_confirm: password,
        profile_image,
    };

    let mut controller = super::session_controller(config);
    let user = controller.register(&form).await?;
    println!("Registered {} <{}>", user.full_name(), user.email);
    Ok(())
}

pub async fn logout(config: &Config) -> Result<()> {
    let mut controller = super::session_controller(config);
    controller.logout().await;
    println!("Logged out.");
    Ok(())
}

pub fn whoami(config: &Config) -> Result<()> {
    let controller = super::session_controller(config);
    match controller.current_user() {
        Some(user) => println!("{} <{}>", user.full_name(), user.email),
        None => println!("Not logged in."),
    }
    Ok(())
}
