use std::{path::PathBuf, sync::Arc};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use client_core::{
    pager::{ListPage, PageSource, PagedListController},
    wizard::{AdvanceOutcome, DraftPatch, PhotoUpload, StepFormController},
    AdminApi, NewProduct, Session,
};
use shared::domain::{Gender, LandingView};
use tracing::debug;

mod config;
mod session;

#[derive(Parser, Debug)]
#[command(name = "console", about = "Command-line front end for the admin REST API")]
struct Args {
    /// Overrides the configured API base URL.
    #[arg(long)]
    base_url: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Log in and store the session for later commands.
    Login {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    /// Forget the stored session.
    Logout,
    /// Show a page of the user list.
    Users {
        #[arg(long, default_value_t = 1)]
        page: u32,
        #[arg(long, default_value_t = 10)]
        page_size: u32,
    },
    /// Delete a user, then show the refreshed page.
    DeleteUser { id: i64 },
    /// Show a page of the product list.
    Products {
        #[arg(long, default_value_t = 1)]
        page: u32,
        #[arg(long, default_value_t = 10)]
        page_size: u32,
    },
    /// Walk the four-step registration wizard and submit a new user.
    Register(RegisterArgs),
    /// Upload a new product.
    AddProduct {
        #[arg(long)]
        name: String,
        #[arg(long)]
        description: String,
        /// Sent as entered; the server owns price parsing.
        #[arg(long)]
        price: String,
        #[arg(long)]
        image: PathBuf,
    },
}

#[derive(clap::Args, Debug)]
struct RegisterArgs {
    #[arg(long)]
    name: String,
    /// Exactly 10 digits.
    #[arg(long)]
    phone: String,
    /// One of: male, female, others.
    #[arg(long)]
    gender: Gender,
    #[arg(long)]
    country_id: String,
    #[arg(long)]
    state_id: String,
    /// May be given multiple times.
    #[arg(long = "skill")]
    skills: Vec<String>,
    #[arg(long)]
    email: String,
    #[arg(long)]
    password: String,
    #[arg(long)]
    confirm_password: String,
    #[arg(long)]
    photo: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().init();
    let args = Args::parse();
    let settings = config::load_settings();
    let base_url = args.base_url.unwrap_or_else(|| settings.base_url.clone());
    let api = Arc::new(AdminApi::new(&base_url)?);

    match args.command {
        Command::Login { email, password } => {
            let session = api.login(&email, &password).await?;
            session::save(&settings.session_file, &session)?;
            let landing = match session.role.landing_view() {
                LandingView::Users => "user list",
                LandingView::Products => "product list",
            };
            println!("Logged in as {:?}; start with the {landing}.", session.role);
        }
        Command::Logout => {
            if session::clear(&settings.session_file)? {
                println!("Session cleared.");
            } else {
                println!("No stored session.");
            }
        }
        Command::Users { page, page_size } => {
            let session = require_session(&settings)?;
            let pager = PagedListController::new(api.users(), session);
            let state = show_page(&pager, page, page_size).await?;
            for user in &state.items {
                println!(
                    "{:>6}  {:<24}  {:<28}  {}",
                    user.id, user.name, user.email, user.phone_number
                );
            }
            print_footer(&state);
        }
        Command::DeleteUser { id } => {
            let session = require_session(&settings)?;
            let pager = PagedListController::new(api.users(), session);
            let state = pager.delete(id).await;
            if let Some(err) = state.last_error {
                bail!(err);
            }
            println!("User {id} deleted.");
        }
        Command::Products { page, page_size } => {
            let session = require_session(&settings)?;
            let pager = PagedListController::new(api.products(), session);
            let state = show_page(&pager, page, page_size).await?;
            for product in &state.items {
                println!(
                    "{:>6}  {:<24}  {:>10}  {}",
                    product.id, product.name, product.price, product.image
                );
            }
            print_footer(&state);
        }
        Command::Register(register) => {
            let session = require_session(&settings)?;
            let photo = read_photo(&register.photo).await?;
            let mut wizard = StepFormController::new(Arc::clone(&api), session);
            wizard.apply(DraftPatch {
                name: Some(register.name),
                phone_number: Some(register.phone),
                gender: Some(register.gender),
                country: Some(register.country_id),
                state: Some(register.state_id),
                skills: Some(register.skills),
                email: Some(register.email),
                password: Some(register.password),
                confirm_password: Some(register.confirm_password),
                photo: Some(photo),
            });
            loop {
                match wizard.advance().await {
                    AdvanceOutcome::Rejected => {
                        let label = wizard.step().label();
                        let message = wizard.last_error().unwrap_or("invalid input");
                        bail!("'{label}' rejected: {message}");
                    }
                    AdvanceOutcome::Advanced(step) => {
                        debug!(step = step.label(), "wizard step passed");
                    }
                    AdvanceOutcome::Submitted => break,
                }
            }
            println!("User registered.");
        }
        Command::AddProduct {
            name,
            description,
            price,
            image,
        } => {
            let session = require_session(&settings)?;
            let image = read_photo(&image).await?;
            api.add_product(
                &session,
                &NewProduct {
                    name,
                    description,
                    price,
                    image,
                },
            )
            .await?;
            println!("Product added.");
        }
    }

    Ok(())
}

fn require_session(settings: &config::Settings) -> Result<Session> {
    session::load(&settings.session_file)?
        .context("not logged in; run `console login` first")
}

/// Applies the requested page size (which resets to page 1), then navigates
/// to the requested page if it is not the first.
async fn show_page<S: PageSource>(
    pager: &PagedListController<S>,
    page: u32,
    page_size: u32,
) -> Result<ListPage<S::Row>> {
    let mut state = pager.set_page_size(page_size).await;
    if page > 1 {
        state = pager.set_page(page).await;
    }
    if let Some(err) = state.last_error.take() {
        bail!(err);
    }
    Ok(state)
}

fn print_footer<T>(state: &ListPage<T>) {
    println!(
        "Page {} of {} ({} rows shown, {} per page)",
        state.page,
        state.last_page,
        state.items.len(),
        state.per_page
    );
}

async fn read_photo(path: &PathBuf) -> Result<PhotoUpload> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("failed to read '{}'", path.display()))?;
    let filename = path
        .file_name()
        .and_then(|name| name.to_str())
        .context("image path has no usable file name")?
        .to_string();
    let mime_type = match path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
        .as_deref()
    {
        Some("png") => Some("image/png".to_string()),
        Some("jpg") | Some("jpeg") => Some("image/jpeg".to_string()),
        Some("gif") => Some("image/gif".to_string()),
        Some("webp") => Some("image/webp".to_string()),
        _ => None,
    };
    Ok(PhotoUpload {
        filename,
        mime_type,
        bytes,
    })
}
