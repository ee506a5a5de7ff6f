//! Profile command handlers.

use std::path::PathBuf;

use anyhow::{Context, Result};
use crmx_core::config::Config;
use crmx_core::types::{FileUpload, ProfileUpdate, UserProfile};

pub fn show(config: &Config) -> Result<()> {
    let controller = super::session_controller(config);
    let Some(user) = controller.current_user() else {
        anyhow::bail!("Not logged in. Run: crmx login --email <email>");
    };
    print_profile(user);
    Ok(())
}

pub async fn refresh(config: &Config) -> Result<()> {
    let mut controller = super::session_controller(config);
    let user = controller.refresh_profile().await?;
    print_profile(&user);
    Ok(())
}

pub struct UpdateArgs {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub bio: Option<String>,
    pub phone: Option<String>,
    pub birth_date: Option<String>,
    pub profile_image: Option<PathBuf>,
}

pub async fn update(config: &Config, args: UpdateArgs) -> Result<()> {
    let profile_image = args
        .profile_image
        .as_deref()
        .map(FileUpload::from_path)
        .transpose()
        .context("load profile image")?;

    let update = ProfileUpdate {
        first_name: args.first_name,
        last_name: args.last_name,
        bio: args.bio,
        phone: args.phone,
        birth_date: args.birth_date,
        profile_image,
    };

    if update.first_name.is_none()
        && update.last_name.is_none()
        && update.bio.is_none()
        && update.phone.is_none()
        && update.birth_date.is_none()
        && update.profile_image.is_none()
    {
        anyhow::bail!("Nothing to update. Pass at least one field flag.");
    }

    let mut controller = super::session_controller(config);
    let user = controller.update_profile(&update).await?;
    println!("Profile updated.");
    print_profile(&user);
    Ok(())
}

pub async fn change_password(
    config: &Config,
    old_password: Option<String>,
    new_password: Option<String>,
) -> Result<()> {
    let old_password = match old_password {
        Some(password) => password,
        None => super::prompt_line("Current password: ")?,
    };
    let new_password = match new_password {
        Some(password) => password,
        None => super::prompt_new_password()?,
    };

    let controller = super::session_controller(config);
    let message = controller
        .change_password(&old_password, &new_password, &new_password)
        .await?;
    println!("{message}");
    Ok(())
}

fn print_profile(user: &UserProfile) {
    println!("{} <{}> (id {})", user.full_name(), user.email, user.id);
    if let Some(bio) = &user.profile.bio {
        println!("  bio:        {bio}");
    }
    if let Some(phone) = &user.profile.phone {
        println!("  phone:      {phone}");
    }
    if let Some(birth_date) = &user.profile.birth_date {
        println!("  birth date: {birth_date}");
    }
    if let Some(image) = &user.profile.profile_image {
        println!("  image:      {image}");
    }
    if let Some(joined) = &user.date_joined {
        println!("  joined:     {joined}");
    }
}
