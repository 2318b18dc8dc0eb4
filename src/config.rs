use std::env;

#[derive(Debug, Clone)]
pub struct Config {
    /// When unset the service runs against the in-memory store.
    pub database_url: Option<String>,
    pub host: String,
    pub port: u16,
    pub frontend_url: String,

    // Tokens are issued by the external identity provider; we only verify them.
    pub jwt_secret: String,
    pub jwt_issuer: Option<String>,
    pub jwt_audience: Option<String>,
    pub require_verified_email: bool,

    pub history_default_points: usize,
    pub history_max_points: usize,

    pub resend_api_key: Option<String>,
    pub contact_recipient: Option<String>,
    pub contact_sender: String,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            database_url: env::var("DATABASE_URL").ok().filter(|s| !s.is_empty()),
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".into())
                .parse()
                .expect("PORT must be a number"),
            frontend_url: env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:3000".into()),

            jwt_secret: env::var("JWT_SECRET").expect("JWT_SECRET must be set"),
            jwt_issuer: env::var("JWT_ISSUER").ok().filter(|s| !s.is_empty()),
            jwt_audience: env::var("JWT_AUDIENCE").ok().filter(|s| !s.is_empty()),
            require_verified_email: env::var("REQUIRE_VERIFIED_EMAIL")
                .unwrap_or_else(|_| "true".into())
                .parse()
                .unwrap_or(true),

            history_default_points: env::var("HISTORY_DEFAULT_POINTS")
                .unwrap_or_else(|_| "10".into())
                .parse()
                .unwrap_or(10),
            history_max_points: env::var("HISTORY_MAX_POINTS")
                .unwrap_or_else(|_| "500".into())
                .parse()
                .unwrap_or(500),

            resend_api_key: env::var("RESEND_API_KEY").ok().filter(|s| !s.is_empty()),
            contact_recipient: env::var("CONTACT_RECIPIENT").ok().filter(|s| !s.is_empty()),
            contact_sender: env::var("CONTACT_SENDER")
                .unwrap_or_else(|_| "Contact Form <onboarding@resend.dev>".into()),
        }
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
impl Config {
    pub fn for_tests() -> Self {
        Self {
            database_url: None,
            host: "127.0.0.1".into(),
            port: 0,
            frontend_url: "http://localhost:3000".into(),
            jwt_secret: "test-secret".into(),
            jwt_issuer: None,
            jwt_audience: None,
            require_verified_email: true,
            history_default_points: 10,
            history_max_points: 500,
            resend_api_key: None,
            contact_recipient: None,
            contact_sender: "Contact Form <onboarding@resend.dev>".into(),
        }
    }
}
