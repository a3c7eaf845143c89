use std::{
    collections::{HashMap, HashSet},
    net::SocketAddr,
    sync::{Arc, Mutex},
};

use aliri_bearer::{
    error::BoxError, AuthorizationCodeRef, AuthorizationCodeVerifier, BearerServer, Claims,
    ClientIdRef, ClientSecretRef, CredentialsVerifier, PasswordRef, Properties, RequestContext,
    TokenId, TokenIdRef, TokenType,
};
use aliri_bearer_axum::Authenticated;
use aliri_clock::DurationSecs;
use axum::{async_trait, routing::get, Extension, Router};
use clap::Parser;

#[derive(Debug, Parser)]
struct Opts {
    /// The address to listen on
    #[arg(short, long, env = "BEARER_BIND", default_value = "127.0.0.1:8080")]
    bind: SocketAddr,

    /// The secret used to derive the token sealing key
    #[arg(short, long, env = "BEARER_SECRET", hide_env_values = true)]
    secret: String,

    /// Access token lifetime, in seconds
    #[arg(long, env = "BEARER_TOKEN_TTL", default_value_t = 3600)]
    token_ttl: u64,

    /// Refresh token lifetime, in seconds
    #[arg(long, env = "BEARER_REFRESH_TOKEN_TTL", default_value_t = 86400)]
    refresh_token_ttl: u64,
}

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::filter::EnvFilter::from_default_env())
        .init();

    let opts = Opts::parse();

    let server = BearerServer::builder(opts.secret.into_bytes())
        .token_ttl(DurationSecs(opts.token_ttl))
        .refresh_token_ttl(DurationSecs(opts.refresh_token_ttl))
        .build(Arc::new(DemoVerifier::default()))?;

    let protected = Router::new()
        .route("/whoami", get(whoami))
        .layer(Extension(server.authenticator()));

    let app = aliri_bearer_axum::router(server).merge(protected);

    println!("Request a token with:");
    println!(
        "  curl -d grant_type=password -d username=alice -d password=wonderland http://{}/token",
        opts.bind
    );
    println!("Press Ctrl+C to exit");

    let listener = tokio::net::TcpListener::bind(opts.bind).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;

    Ok(())
}

async fn whoami(Authenticated(token): Authenticated) -> String {
    format!(
        "{} ({}) authorized for \"{}\" until {}\n",
        token.credential(),
        token.token_type().as_str(),
        token.scope(),
        token.expiry().0,
    )
}

/// An in-memory verifier
///
/// Refresh tokens are single use: redeeming one invalidates it, and only the
/// refresh token issued alongside the newest access token is honored.
struct DemoVerifier {
    users: HashMap<&'static str, &'static str>,
    clients: HashMap<&'static str, &'static str>,
    codes: Mutex<HashMap<String, (String, String)>>,
    live_refresh_tokens: Mutex<HashSet<(TokenId, TokenId)>>,
}

impl Default for DemoVerifier {
    fn default() -> Self {
        let mut codes = HashMap::new();
        codes.insert(
            "demo-code".to_owned(),
            ("demo-app".to_owned(), "bob".to_owned()),
        );

        Self {
            users: HashMap::from([("alice", "wonderland"), ("bob", "builder")]),
            clients: HashMap::from([("demo-app", "demo-secret")]),
            codes: Mutex::new(codes),
            live_refresh_tokens: Mutex::default(),
        }
    }
}

fn poisoned<T>(_: T) -> BoxError {
    "verifier state poisoned".into()
}

#[async_trait]
impl CredentialsVerifier for DemoVerifier {
    async fn validate_user(
        &self,
        username: &str,
        password: &PasswordRef,
        _scope: &str,
        _ctx: &RequestContext,
    ) -> Result<(), BoxError> {
        match self.users.get(username) {
            Some(expected) if *expected == password.as_str() => Ok(()),
            _ => Err(format!("unknown user or wrong password for {username}").into()),
        }
    }

    async fn validate_client(
        &self,
        client_id: &ClientIdRef,
        client_secret: &ClientSecretRef,
        _scope: &str,
        _ctx: &RequestContext,
    ) -> Result<(), BoxError> {
        match self.clients.get(client_id.as_str()) {
            Some(expected) if *expected == client_secret.as_str() => Ok(()),
            _ => Err(format!("unknown client or wrong secret for {client_id}").into()),
        }
    }

    async fn add_claims(
        &self,
        token_type: TokenType,
        credential: &str,
        _token_id: &TokenIdRef,
        _scope: &str,
        ctx: &RequestContext,
    ) -> Result<Claims, BoxError> {
        let mut claims = Claims::new();
        claims.insert("sub".into(), credential.into());
        claims.insert("kind".into(), token_type.as_str().into());
        if let Some(agent) = ctx
            .headers()
            .get(http::header::USER_AGENT)
            .and_then(|v| v.to_str().ok())
        {
            claims.insert("user_agent".into(), agent.into());
        }
        Ok(claims)
    }

    async fn add_properties(
        &self,
        _token_type: TokenType,
        credential: &str,
        _token_id: &TokenIdRef,
        scope: &str,
        _ctx: &RequestContext,
    ) -> Result<Option<Properties>, BoxError> {
        let mut props = Properties::new();
        props.insert("subject".into(), credential.into());
        props.insert("scope".into(), scope.into());
        Ok(Some(props))
    }

    async fn validate_token_id(
        &self,
        _token_type: TokenType,
        _credential: &str,
        token_id: &TokenIdRef,
        refresh_token_id: &TokenIdRef,
    ) -> Result<(), BoxError> {
        let key = (token_id.to_owned(), refresh_token_id.to_owned());
        if self.live_refresh_tokens.lock().map_err(poisoned)?.remove(&key) {
            Ok(())
        } else {
            Err("refresh token already used or revoked".into())
        }
    }

    async fn store_token_id(
        &self,
        _token_type: TokenType,
        _credential: &str,
        token_id: &TokenIdRef,
        refresh_token_id: &TokenIdRef,
    ) -> Result<(), BoxError> {
        self.live_refresh_tokens
            .lock()
            .map_err(poisoned)?
            .insert((token_id.to_owned(), refresh_token_id.to_owned()));
        Ok(())
    }

    fn authorization_code_verifier(&self) -> Option<&dyn AuthorizationCodeVerifier> {
        Some(self)
    }
}

#[async_trait]
impl AuthorizationCodeVerifier for DemoVerifier {
    async fn validate_code(
        &self,
        client_id: &ClientIdRef,
        client_secret: Option<&ClientSecretRef>,
        code: &AuthorizationCodeRef,
        _redirect_uri: Option<&str>,
        _ctx: &RequestContext,
    ) -> Result<String, BoxError> {
        if let Some(secret) = client_secret {
            if self.clients.get(client_id.as_str()) != Some(&secret.as_str()) {
                return Err("wrong client secret".into());
            }
        }

        let mut codes = self.codes.lock().map_err(poisoned)?;
        match codes.remove(code.as_str()) {
            Some((owner, subject)) if owner == client_id.as_str() => Ok(subject),
            Some(entry) => {
                codes.insert(code.as_str().to_owned(), entry);
                Err("authorization code issued to another client".into())
            }
            None => Err("unknown or used authorization code".into()),
        }
    }
}
