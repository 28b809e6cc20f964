use crate::config::{ClientConfig, OrderedMap};
use crate::error::DeliveryError;

/// Configured clients and their secrets
#[derive(Debug, Clone)]
pub struct ClientRegistry {
    clients: OrderedMap<ClientConfig>,
    default_client: Option<String>,
}

impl ClientRegistry {
    pub fn new(clients: &OrderedMap<ClientConfig>) -> Self {
        // Last client flagged default wins
        let default_client = clients
            .iter()
            .filter(|(_, client)| client.default)
            .last()
            .map(|(id, _)| id.to_string());

        Self {
            clients: clients.clone(),
            default_client,
        }
    }

    pub fn default_client(&self) -> Option<&str> {
        self.default_client.as_deref()
    }

    pub fn secret(&self, client_id: &str) -> Option<&[u8]> {
        self.clients
            .get(client_id)
            .map(|client| client.secret.as_bytes())
    }

    pub fn contains(&self, client_id: &str) -> bool {
        self.clients.contains_key(client_id)
    }

    /// Resolve the client id and secret used to sign a URL.
    ///
    /// An explicit id falls back to the default client; an explicit secret
    /// skips the lookup entirely.
    pub fn resolve(
        &self,
        client_id: Option<&str>,
        client_secret: Option<&[u8]>,
    ) -> Result<(String, Vec<u8>), DeliveryError> {
        let client_id = client_id
            .or(self.default_client.as_deref())
            .ok_or_else(|| DeliveryError::UnknownClient("(default)".to_string()))?;

        let secret = match client_secret {
            Some(secret) => secret.to_vec(),
            None => self
                .secret(client_id)
                .ok_or_else(|| DeliveryError::UnknownClient(client_id.to_string()))?
                .to_vec(),
        };

        Ok((client_id.to_string(), secret))
    }
}
