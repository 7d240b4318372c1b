use secrecy::SecretString;

#[derive(Clone)]
pub struct GlobalArgs {
    pub token_secret: SecretString,
    pub relay_url: Option<String>,
}

impl GlobalArgs {
    #[must_use]
    pub fn new(token_secret: SecretString, relay_url: Option<String>) -> Self {
        Self {
            token_secret,
            relay_url,
        }
    }
}

impl std::fmt::Debug for GlobalArgs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GlobalArgs")
            .field("token_secret", &"***")
            .field("relay_url", &self.relay_url)
            .finish()
    }
}
