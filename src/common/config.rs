use std::env;

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub backend_url: String,
    pub api_key: Option<String>,
    pub log_level: String,
}

impl ClientConfig {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        Self {
            backend_url: env::var("COLLABFORGE_BACKEND_URL")
                .unwrap_or_else(|_| "http://127.0.0.1:8000".to_string()),
            api_key: env::var("COLLABFORGE_API_KEY").ok().filter(|k| !k.is_empty()),
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
        }
    }
}
