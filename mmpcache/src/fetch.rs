//! Récupération bloquante du contenu distant

use crate::error::Result;
use std::time::Duration;

/// Réponse brute d'un téléchargement
#[derive(Debug, Clone)]
pub struct FetchResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl FetchResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Source de contenu distant
///
/// L'appel est bloquant : il s'exécute à l'intérieur d'un job, sur le
/// worker de la file.
pub trait Fetcher: Send + Sync {
    fn fetch(&self, url: &str) -> Result<FetchResponse>;
}

/// Implémentation HTTP basée sur `reqwest::blocking`
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::blocking::Client,
}

impl HttpFetcher {
    pub fn new() -> Result<Self> {
        Self::with_timeout(None)
    }

    /// Le délai s'applique à chaque requête ; la file n'en impose aucun
    pub fn with_timeout(timeout: Option<Duration>) -> Result<Self> {
        let mut builder = reqwest::blocking::Client::builder()
            .user_agent(concat!("mmp/", env!("CARGO_PKG_VERSION")));
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            client: builder.build()?,
        })
    }
}

impl Fetcher for HttpFetcher {
    fn fetch(&self, url: &str) -> Result<FetchResponse> {
        tracing::debug!("Fetching {}", url);
        let response = self.client.get(url).send()?;
        let status = response.status().as_u16();

        // Le corps d'une réponse en échec n'est pas conservé
        let body = if response.status().is_success() {
            response.bytes()?.to_vec()
        } else {
            Vec::new()
        };

        Ok(FetchResponse { status, body })
    }
}
