use clap::{Args, Parser, Subcommand};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Environment variable that overrides the API base URL from the config file.
pub const API_URL_ENV: &str = "MEMORIES_API_URL";

#[derive(Parser, Debug)]
#[command(name = "memories", about = "A client for the Memories posting service")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Base URL of the Memories API
    #[arg(long, global = true)]
    pub api_url: Option<String>,

    /// Send the stored token as a bearer credential instead of a session cookie
    #[arg(long, global = true)]
    pub bearer: bool,

    /// Path to data directory
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Show who is signed in
    Whoami,
    /// Sign in with email and password
    Login {
        #[arg(long)]
        email: String,
        #[arg(long, env = "MEMORIES_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Create an account
    Signup {
        #[arg(long, default_value = "")]
        name: String,
        #[arg(long)]
        email: String,
        #[arg(long, env = "MEMORIES_PASSWORD", hide_env_values = true)]
        password: String,
        /// Defaults to --password
        #[arg(long)]
        confirm_password: Option<String>,
    },
    /// Sign out and forget the stored credential
    Logout,
    /// List all posts
    List,
    /// Create a post
    Create(PostArgs),
    /// Edit one of your posts
    Edit {
        id: String,
        #[command(flatten)]
        post: PostArgs,
    },
    /// Delete one of your posts
    Delete { id: String },
    /// Like a post
    Like { id: String },
}

#[derive(Args, Debug, Clone, Default)]
pub struct PostArgs {
    #[arg(long)]
    pub title: Option<String>,
    #[arg(long)]
    pub message: Option<String>,
    /// Comma separated
    #[arg(long)]
    pub tags: Option<String>,
    /// Image file to attach
    #[arg(long)]
    pub image: Option<PathBuf>,
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub api: ApiConfig,
    pub upload: UploadConfig,
    pub storage: StorageConfig,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
    pub credentials: CredentialMode,
    pub timeout_secs: u64,
    pub signature: SignatureEndpoint,
}

/// How the current credential travels with each request.
#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum CredentialMode {
    /// HTTP session cookie set by the server on sign-in.
    #[default]
    Cookie,
    /// `Authorization: Bearer` with the token returned on sign-in.
    Bearer,
}

#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum SignatureMethod {
    #[default]
    Get,
    Post,
}

#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct SignatureEndpoint {
    pub method: SignatureMethod,
    pub path: String,
}

/// Where images attached to a post come from.
#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ImageStrategy {
    /// Embed the file as a data URL, no network call.
    #[default]
    Inline,
    /// Signed direct upload to the asset host.
    Signed,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct UploadConfig {
    pub strategy: ImageStrategy,
    /// `{cloud_name}` is replaced with the value from the signature.
    pub upload_url: String,
    pub timeout_secs: u64,
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct StorageConfig {
    pub credentials_path: Option<PathBuf>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3000".to_string(),
            credentials: CredentialMode::Cookie,
            timeout_secs: 30,
            signature: SignatureEndpoint::default(),
        }
    }
}

impl Default for SignatureEndpoint {
    fn default() -> Self {
        Self {
            method: SignatureMethod::Get,
            path: "/cloudinary/sign".to_string(),
        }
    }
}

impl SignatureEndpoint {
    /// The alternative deployment profile: `POST /uploads/signature`.
    pub fn uploads() -> Self {
        Self {
            method: SignatureMethod::Post,
            path: "/uploads/signature".to_string(),
        }
    }
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            strategy: ImageStrategy::Inline,
            upload_url: "https://api.cloudinary.com/v1_1/{cloud_name}/image/upload".to_string(),
            timeout_secs: 60,
        }
    }
}

impl UploadConfig {
    pub fn upload_url_for(&self, cloud_name: &str) -> String {
        self.upload_url.replace("{cloud_name}", cloud_name)
    }
}

impl Config {
    pub fn load(cli: &Cli) -> anyhow::Result<Self> {
        Self::load_with_env(cli, std::env::var(API_URL_ENV).ok())
    }

    /// Defaults, then the TOML file, then the environment, then CLI flags.
    pub fn load_with_env(cli: &Cli, api_url_env: Option<String>) -> anyhow::Result<Self> {
        let data_dir = Self::data_dir(cli);
        let config_path = cli
            .config
            .clone()
            .unwrap_or_else(|| data_dir.join("config.toml"));

        let mut config = if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            toml::from_str(&content)?
        } else {
            Config::default()
        };

        if let Some(url) = api_url_env.filter(|u| !u.is_empty()) {
            config.api.base_url = url;
        }
        if let Some(ref url) = cli.api_url {
            config.api.base_url = url.clone();
        }
        if cli.bearer {
            config.api.credentials = CredentialMode::Bearer;
        }

        if config.storage.credentials_path.is_none() {
            config.storage.credentials_path = Some(data_dir.join("credentials.json"));
        }

        url::Url::parse(&config.api.base_url)
            .map_err(|e| anyhow::anyhow!("Invalid API URL {}: {}", config.api.base_url, e))?;

        Ok(config)
    }

    pub fn data_dir(cli: &Cli) -> PathBuf {
        cli.data_dir.clone().unwrap_or_else(|| {
            dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".memories")
        })
    }

    pub fn credentials_path(&self) -> &Path {
        self.storage
            .credentials_path
            .as_deref()
            .unwrap_or_else(|| Path::new("credentials.json"))
    }
}
