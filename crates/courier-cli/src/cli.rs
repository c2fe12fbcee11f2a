//! CLI argument definitions using clap derive macros.

use std::collections::BTreeMap;
use std::path::PathBuf;

use clap::{ArgAction, ArgGroup, Parser, ValueHint};
use courier_http::{Client, ClientConfig, Cookie, Method, RequestBuilder, Response};
use tracing::debug;

use crate::args::{
    parse_credentials, parse_data, parse_file, parse_header, parse_key_value, parse_method,
    DataArg, FileArg,
};
use crate::error::CliError;
use crate::output;

/// courier - send HTTP requests from the command line
///
/// The response body is written to stdout. Logs and debug dumps go to stderr.
#[derive(Debug, Parser)]
#[command(
    name = "courier",
    author,
    version,
    about,
    long_about = None,
    arg_required_else_help = true,
    group(
        ArgGroup::new("body")
            .args(["json", "form", "data", "file"])
            .multiple(false)
    ),
    help_template = "\
{before-help}{name} {version}
{about-with-newline}
{usage-heading} {usage}

{all-args}{after-help}
"
)]
pub struct Cli {
    /// HTTP method (GET, POST, PUT, PATCH, DELETE, HEAD, OPTIONS or any token)
    #[arg(value_parser = parse_method)]
    pub method: Method,

    /// Request URL
    #[arg(value_hint = ValueHint::Url)]
    pub url: String,

    /// Add a header ('Name: value')
    #[arg(short = 'H', long = "header", value_parser = parse_header)]
    pub headers: Vec<(String, String)>,

    /// Add a query parameter (key=value)
    #[arg(short = 'Q', long = "query", value_parser = parse_key_value)]
    pub query: Vec<(String, String)>,

    /// Append a path segment to the URL
    #[arg(short = 'p', long = "path")]
    pub paths: Vec<String>,

    /// Send a JSON body verbatim
    #[arg(long)]
    pub json: Option<String>,

    /// Send a form field (key=value)
    #[arg(long, value_parser = parse_key_value)]
    pub form: Vec<(String, String)>,

    /// Send a raw body, or the contents of a file with @path
    #[arg(short = 'd', long, value_parser = parse_data)]
    pub data: Option<DataArg>,

    /// Upload a file as a multipart part (field=@path)
    #[arg(short = 'F', long, value_parser = parse_file)]
    pub file: Vec<FileArg>,

    /// Send a cookie (name=value)
    #[arg(long = "cookie", value_parser = parse_key_value)]
    pub cookies: Vec<(String, String)>,

    /// Basic authentication (user:pass)
    #[arg(short, long, value_parser = parse_credentials, conflicts_with = "bearer")]
    pub user: Option<(String, String)>,

    /// Bearer token authentication
    #[arg(long)]
    pub bearer: Option<String>,

    /// Route the request through a proxy
    #[arg(long, env = "COURIER_PROXY", value_hint = ValueHint::Url)]
    pub proxy: Option<String>,

    /// Request timeout in milliseconds (0 disables it)
    #[arg(long, value_name = "MS")]
    pub timeout: Option<u64>,

    /// Connect and TLS handshake timeout in milliseconds
    #[arg(long = "tls-timeout", value_name = "MS")]
    pub tls_timeout: Option<u64>,

    /// Attempts on transport errors
    #[arg(long)]
    pub retries: Option<u32>,

    /// Dump the request and response to stderr
    #[arg(long)]
    pub debug: bool,

    /// Print the status line and headers before the body
    #[arg(short, long)]
    pub include: bool,

    /// Path to a YAML client configuration
    #[arg(
        short,
        long,
        env = "COURIER_CONFIG",
        value_hint = ValueHint::FilePath
    )]
    pub config: Option<PathBuf>,

    /// Increase verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log output format
    #[arg(long, default_value = "text", value_enum)]
    pub log_format: LogFormat,
}

/// Log output format selection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl Cli {
    /// Load the client configuration from the YAML file, or from the
    /// environment when no file is given.
    pub fn load_config(&self) -> Result<ClientConfig, CliError> {
        let Some(path) = &self.config else {
            return Ok(ClientConfig::from_env());
        };

        let text = std::fs::read_to_string(path).map_err(|e| {
            CliError::io("failed to read config file", e, Some(path.clone()))
        })?;
        serde_yaml::from_str(&text).map_err(|e| CliError::Config {
            message: format!("invalid config file {}: {e}", path.display()),
            hint: Some("see ClientConfig for the accepted keys".to_string()),
        })
    }

    /// Apply explicit flags on top of a loaded configuration.
    pub fn apply_flags(&self, mut config: ClientConfig) -> ClientConfig {
        if let Some(timeout) = self.timeout {
            config.timeout_ms = timeout;
        }
        if let Some(tls_timeout) = self.tls_timeout {
            config.tls_handshake_timeout_ms = Some(tls_timeout);
        }
        if let Some(retries) = self.retries {
            config.retries = retries;
        }
        if self.debug {
            config.debug = true;
        }
        if let Some(proxy) = &self.proxy {
            config.proxy = Some(proxy.clone());
        }
        config
    }

    /// Turn the arguments into a request builder.
    pub async fn builder(&self, client: &Client) -> Result<RequestBuilder, CliError> {
        let mut builder = client.request().url(&self.url).paths(&self.paths);

        for (key, value) in &self.query {
            builder = builder.query(key, value);
        }
        for (name, value) in &self.headers {
            builder = builder.header(name, value);
        }
        for (name, value) in &self.cookies {
            builder = builder.cookie(Cookie::new(name, value));
        }

        if let Some((user, pass)) = &self.user {
            builder = builder.basic_auth(user, pass);
        }
        if let Some(token) = &self.bearer {
            builder = builder.bearer_auth(token);
        }

        if let Some(json) = &self.json {
            builder = builder.json(json);
        }
        if !self.form.is_empty() {
            let fields: BTreeMap<&str, &str> = self
                .form
                .iter()
                .map(|(k, v)| (k.as_str(), v.as_str()))
                .collect();
            builder = builder.form(&fields);
        }
        match &self.data {
            Some(DataArg::Inline(text)) => builder = builder.body(text.clone()),
            Some(DataArg::File(path)) => {
                let bytes = tokio::fs::read(path).await.map_err(|e| {
                    CliError::io("failed to read request body", e, Some(path.clone()))
                })?;
                builder = builder.body(bytes);
            }
            None => {}
        }
        for file in &self.file {
            builder = builder.file(file.path.clone(), file.filename(), &file.field);
        }

        Ok(builder)
    }

    /// Send the request and print the response.
    pub async fn execute(self) -> Result<(), CliError> {
        let config = self.apply_flags(self.load_config()?);
        let client = Client::new(config);
        debug!(method = %self.method, url = %self.url, "sending request");

        let mut builder = self.builder(&client).await?;
        let response: Response = builder
            .execute(self.method.clone(), None)
            .await
            .map_err(|e| CliError::from(e).with_url(&self.url))?;

        debug!(status = %response.status(), attempts = response.attempts(), "response received");
        output::write_response(response, self.include).await
    }
}
