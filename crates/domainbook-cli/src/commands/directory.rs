use crate::commands::{print_json, Context};
use anyhow::Result;
use clap::Args;
use serde_json::json;

#[derive(Debug, Args)]
pub struct DomainsArgs {}

#[derive(Debug, Args)]
pub struct EmailsArgs {
    pub domain: String,
}

#[derive(Debug, Args)]
pub struct AddArgs {
    pub domain: String,
    pub email: String,
}

#[derive(Debug, Args)]
pub struct DeleteArgs {
    pub domain: String,
    pub email: String,
}

pub fn list_domains(ctx: &Context<'_>, _args: DomainsArgs) -> Result<()> {
    let domains = ctx.store.directory().list_domains()?;

    if ctx.json {
        return print_json(&domains);
    }

    if domains.is_empty() {
        println!("no domains");
        return Ok(());
    }

    for domain in domains {
        println!("{domain}");
    }
    Ok(())
}

pub fn list_emails(ctx: &Context<'_>, args: EmailsArgs) -> Result<()> {
    let emails = ctx.store.directory().list_emails(&args.domain)?;

    if ctx.json {
        return print_json(&emails);
    }

    if emails.is_empty() {
        println!("no emails for {}", args.domain);
        return Ok(());
    }

    for email in emails {
        println!("{email}");
    }
    Ok(())
}

pub fn add_email(ctx: &Context<'_>, args: AddArgs) -> Result<()> {
    let email = ctx.store.directory().add_email(&args.domain, &args.email)?;

    if ctx.json {
        print_json(&json!({ "message": "Email added successfully", "email": email }))?;
    } else {
        println!("added {email}");
    }
    Ok(())
}

pub fn delete_email(ctx: &Context<'_>, args: DeleteArgs) -> Result<()> {
    let removed = ctx
        .store
        .directory()
        .delete_email(&args.domain, &args.email)?;

    if ctx.json {
        print_json(&json!({ "message": "Email deleted successfully", "removed": removed }))?;
    } else {
        println!("deleted {} ({} row(s))", args.email.trim(), removed);
    }
    Ok(())
}
