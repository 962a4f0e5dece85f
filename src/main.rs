use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use memories::api::HttpApi;
use memories::app::App;
use memories::config::{Cli, Command, Config, PostArgs};
use memories::credentials::Credentials;
use memories::error::AppError;
use memories::forms::{acquirer_for, LoginForm, SignupForm};
use memories::models::PostId;
use memories::render;
use memories::session::Screen;

type ClientApp = App<HttpApi>;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging; stdout is reserved for rendered output
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    // Parse CLI args and load config
    let cli = Cli::parse();
    let data_dir = Config::data_dir(&cli);
    std::fs::create_dir_all(&data_dir)?;
    tracing::debug!("Data directory: {}", data_dir.display());

    let config = Config::load(&cli)?;
    let credentials = Credentials::load(config.credentials_path())
        .with_context(|| format!("loading {}", config.credentials_path().display()))?;

    let api = Arc::new(HttpApi::connect(&config.api, credentials).await?);
    tracing::debug!("Using API at {}", api.base_url());

    // Session resolution always happens first
    let mut app = App::mount(api.clone()).await;

    match cli.command.clone().unwrap_or(Command::List) {
        Command::Whoami => println!("{}", render::session_banner(&app.state())),
        Command::Login { email, password } => {
            let mut form = LoginForm::new();
            form.set_email(email);
            form.set_password(password);
            let session = form
                .submit(api.as_ref())
                .await
                .map_err(|e| form_failure(form.error(), e))?;
            app.login_completed(session).await;
            print_screen(&app);
        }
        Command::Signup {
            name,
            email,
            password,
            confirm_password,
        } => {
            let mut form = SignupForm::new();
            form.set_name(name);
            form.set_email(email);
            form.set_confirm_password(confirm_password.unwrap_or_else(|| password.clone()));
            form.set_password(password);
            let session = form
                .submit(api.as_ref())
                .await
                .map_err(|e| form_failure(form.error(), e))?;
            app.login_completed(session).await;
            print_screen(&app);
        }
        Command::Logout => {
            app.logout().await;
            println!("Signed out.");
        }
        Command::List => print_screen(&app),
        Command::Create(args) => {
            require_session(&app)?;
            apply_post_args(&mut app, &config, api.clone(), args).await?;
            app.submit_post().await?;
            print_screen(&app);
        }
        Command::Edit { id, post } => {
            require_session(&app)?;
            let id = PostId::new(id);
            app.set_current_id(Some(id.clone())).await;
            require_owned(&app, &id)?;
            apply_post_args(&mut app, &config, api.clone(), post).await?;
            app.submit_post().await?;
            print_screen(&app);
        }
        Command::Delete { id } => {
            require_session(&app)?;
            let id = PostId::new(id);
            require_owned(&app, &id)?;
            app.dispatcher().delete(&id).await?;
            print_screen(&app);
        }
        Command::Like { id } => {
            require_session(&app)?;
            app.dispatcher().like(&PostId::new(id)).await?;
            print_screen(&app);
        }
    }

    Ok(())
}

fn print_screen(app: &ClientApp) {
    println!("{}", render::session_banner(&app.state()));
    if app.screen() == Screen::App {
        println!();
        println!("{}", render::post_list(&app.posts(), |post| app.owns(post)));
    }
}

fn require_session(app: &ClientApp) -> Result<(), AppError> {
    match app.screen() {
        Screen::App => Ok(()),
        _ => Err(AppError::Anonymous),
    }
}

fn require_owned(app: &ClientApp, id: &PostId) -> Result<(), AppError> {
    let post = app
        .store()
        .find(id)
        .ok_or_else(|| AppError::NotFound(format!("post {}", id)))?;
    if app.owns(&post) {
        Ok(())
    } else {
        Err(AppError::NotFound(format!("post {} among your posts", id)))
    }
}

/// Copy the given fields into the form, acquiring the image if one was named.
async fn apply_post_args(
    app: &mut ClientApp,
    config: &Config,
    api: Arc<HttpApi>,
    args: PostArgs,
) -> anyhow::Result<()> {
    println!("{}", render::form_heading(app.form(), app.user().as_ref()));

    let form = app.form_mut();
    if let Some(title) = args.title {
        form.set_title(title);
    }
    if let Some(message) = args.message {
        form.set_message(message);
    }
    if let Some(tags) = args.tags {
        form.set_tags(tags);
    }
    if let Some(path) = args.image {
        let acquirer = acquirer_for(api, &config.upload)?;
        if let Err(e) = form.acquire_image(acquirer.as_ref(), &path).await {
            let shown = form.upload().error.clone().unwrap_or_else(|| e.to_string());
            anyhow::bail!("{}", shown);
        }
    }
    Ok(())
}

fn form_failure(shown: Option<&str>, err: AppError) -> anyhow::Error {
    match shown {
        Some(message) => anyhow::anyhow!("{}", message),
        None => err.into(),
    }
}
