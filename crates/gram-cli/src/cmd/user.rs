//! `gram user add|show`: member profiles used to resolve initiative creators.

use super::Context;
use crate::output::{CliError, pretty_kv, render};
use anyhow::Result;
use clap::{Args, Subcommand};
use gram_core::model::{Gender, User, UserId};

#[derive(Args, Debug)]
pub struct UserArgs {
    #[command(subcommand)]
    pub command: UserCommand,
}

#[derive(Subcommand, Debug)]
pub enum UserCommand {
    #[command(
        about = "Register a member profile",
        after_help = "EXAMPLES:\n    gram user add u-42 --fullname \"Asha Rao\" --gender female"
    )]
    Add(UserAddArgs),

    #[command(about = "Show a member profile")]
    Show(UserShowArgs),
}

#[derive(Args, Debug)]
pub struct UserAddArgs {
    /// Member id as issued by the identity provider.
    pub id: String,

    #[arg(long)]
    pub fullname: String,

    #[arg(long)]
    pub email: Option<String>,

    #[arg(long)]
    pub phone: Option<String>,

    /// male, female, or unspecified.
    #[arg(long, default_value = "unspecified")]
    pub gender: String,

    #[arg(long)]
    pub profile_pic_url: Option<String>,
}

#[derive(Args, Debug)]
pub struct UserShowArgs {
    pub id: String,
}

pub fn run_user(args: &UserArgs, ctx: &Context) -> Result<()> {
    match &args.command {
        UserCommand::Add(add) => run_user_add(add, ctx),
        UserCommand::Show(show) => run_user_show(show, ctx),
    }
}

fn run_user_add(args: &UserAddArgs, ctx: &Context) -> Result<()> {
    let parsed = UserId::parse(&args.id)
        .and_then(|id| args.gender.parse::<Gender>().map(|gender| (id, gender)));
    let (id, gender) = parsed.map_err(|err| ctx.fail(&CliError::from(&err)))?;

    let store = ctx.open_store()?;
    let user = User {
        id,
        fullname: args.fullname.trim().to_string(),
        email: args.email.clone(),
        phone_no: args.phone.clone(),
        gender,
        profile_pic_url: args.profile_pic_url.clone(),
    };
    let saved = store
        .register_user(&user)
        .map_err(|err| ctx.fail(&CliError::from(&err)))?;
    render(ctx.output, &saved, |u, w| {
        writeln!(w, "Registered {} ({})", u.id, u.fullname)
    })
}

fn run_user_show(args: &UserShowArgs, ctx: &Context) -> Result<()> {
    let store = ctx.open_store()?;
    let user = UserId::parse(&args.id)
        .and_then(|id| store.get_user(&id))
        .map_err(|err| ctx.fail(&CliError::from(&err)))?;
    render(ctx.output, &user, |u, w| {
        pretty_kv(w, "ID", u.id.as_str())?;
        pretty_kv(w, "Name", &u.fullname)?;
        pretty_kv(w, "Gender", u.gender.as_str())?;
        if let Some(email) = &u.email {
            pretty_kv(w, "Email", email)?;
        }
        if let Some(phone) = &u.phone_no {
            pretty_kv(w, "Phone", phone)?;
        }
        Ok(())
    })
}
