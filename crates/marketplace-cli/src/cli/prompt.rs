/*
[INPUT]:  Interactive user input via CLI
[OUTPUT]: Registration details for an unregistered wallet
[POS]:    CLI interaction layer
[UPDATE]: When the registration form changes
*/

use anyhow::Result;
use console::style;
use dialoguer::{Confirm, Input, Select, theme::ColorfulTheme};

use marketplace_auth::{RegistrationDetails, Role};

/// Ask whether to register `wallet`, then collect the form
pub fn prompt_registration(wallet: &str) -> Result<Option<RegistrationDetails>> {
    println!(
        "{}",
        style("Complete your registration").bold().cyan()
    );
    println!(
        "{}",
        style(format!("Wallet {wallet} has no marketplace account yet.")).dim()
    );

    let theme = ColorfulTheme::default();
    if !Confirm::with_theme(&theme)
        .with_prompt("Register this wallet now?")
        .default(true)
        .interact()?
    {
        return Ok(None);
    }

    let name: String = Input::with_theme(&theme)
        .with_prompt("Full name")
        .validate_with(|value: &String| non_empty(value, "Name"))
        .interact_text()?;

    let email: String = Input::with_theme(&theme)
        .with_prompt("Email")
        .validate_with(|value: &String| {
            let details = RegistrationDetails {
                email: value.clone(),
                name: "-".to_string(),
                country: "-".to_string(),
                role: Role::default(),
            };
            details.validate()
        })
        .interact_text()?;

    let country: String = Input::with_theme(&theme)
        .with_prompt("Country")
        .validate_with(|value: &String| non_empty(value, "Country"))
        .interact_text()?;

    let roles = [Role::Buyer, Role::Seller];
    let labels = ["Buyer - browse and purchase", "Seller - list products"];
    let selection = Select::with_theme(&theme)
        .with_prompt("Account type")
        .items(&labels)
        .default(0)
        .interact()?;

    Ok(Some(RegistrationDetails {
        email: email.trim().to_string(),
        name: name.trim().to_string(),
        country: country.trim().to_string(),
        role: roles[selection],
    }))
}

fn non_empty(value: &str, field: &str) -> Result<(), String> {
    if value.trim().is_empty() {
        Err(format!("{field} is required"))
    } else {
        Ok(())
    }
}
