//! Collaborator credentials read from the process environment
//!
//! Only the downstream stages (indexing and question answering) need these;
//! crawling and extraction run without any credentials.

use crate::ConfigError;

const GOOGLE_API_KEY: &str = "GOOGLE_API_KEY";
const PINECONE_API_KEY: &str = "PINECONE_API_KEY";

/// API keys for the embedding, chat, and vector-store services
#[derive(Clone)]
pub struct Credentials {
    pub google_api_key: String,
    pub pinecone_api_key: String,
}

impl Credentials {
    /// Loads credentials, honouring a `.env` file in the working directory
    pub fn from_env() -> Result<Self, ConfigError> {
        // A missing .env file is fine; the variables may already be exported.
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds credentials from an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |key: &'static str| {
            lookup(key)
                .filter(|value| !value.trim().is_empty())
                .ok_or(ConfigError::MissingCredential(key))
        };

        Ok(Self {
            google_api_key: read(GOOGLE_API_KEY)?,
            pinecone_api_key: read(PINECONE_API_KEY)?,
        })
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("google_api_key", &redact(&self.google_api_key))
            .field("pinecone_api_key", &redact(&self.pinecone_api_key))
            .finish()
    }
}

/// Keeps only the last four characters of a secret
fn redact(secret: &str) -> String {
    let tail: String = secret
        .chars()
        .rev()
        .take(4)
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .collect();
    format!("...{}", tail)
}
