//! Shared state handed to every handler.

use std::sync::Arc;

use secrecy::SecretString;
use subscrip_notify::{
    AccountProcessor, ChatMessenger, Config, CredentialProvider, Database, GmailClient,
    GoogleOAuth, LineMessenger, LinkCodeService, MailboxSearch, OAuthClient, PollOrchestrator,
    PollSettings, TokenCodec, WebhookHandler,
};

/// The external services the handlers talk to.
pub struct Collaborators {
    pub oauth: Arc<dyn OAuthClient>,
    pub mailbox: Arc<dyn MailboxSearch>,
    pub messenger: Arc<dyn ChatMessenger>,
}

#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    /// Absent when no encryption key is configured. Linking and polling
    /// fail without it; everything else keeps working.
    pub codec: Option<Arc<TokenCodec>>,
    pub oauth: Arc<dyn OAuthClient>,
    pub link_codes: LinkCodeService,
    pub webhook: Arc<WebhookHandler>,
    pub orchestrator: Option<Arc<PollOrchestrator>>,
    pub scheduler_secret: Option<SecretString>,
}

impl AppState {
    pub fn new(
        db: Database,
        codec: Option<Arc<TokenCodec>>,
        collaborators: Collaborators,
        poll: PollSettings,
        scheduler_secret: Option<SecretString>,
    ) -> Self {
        let link_codes = LinkCodeService::new(db.clone());
        let webhook = Arc::new(WebhookHandler::new(
            db.clone(),
            link_codes.clone(),
            Arc::clone(&collaborators.messenger),
        ));

        let orchestrator = codec.as_ref().map(|codec| {
            let credentials = Arc::new(CredentialProvider::new(
                db.clone(),
                Arc::clone(codec),
                Arc::clone(&collaborators.oauth),
            ));
            let processor = Arc::new(AccountProcessor::new(
                db.clone(),
                credentials,
                collaborators.mailbox,
                collaborators.messenger,
                poll.clone(),
            ));
            Arc::new(PollOrchestrator::new(db.clone(), processor, poll))
        });

        Self {
            db,
            codec,
            oauth: collaborators.oauth,
            link_codes,
            webhook,
            orchestrator,
            scheduler_secret,
        }
    }

    /// Wires the production clients from configuration.
    pub fn from_config(config: &Config, db: Database) -> subscrip_notify::Result<Self> {
        let codec = match &config.token_encryption_key {
            Some(key) => Some(Arc::new(TokenCodec::from_secret(key)?)),
            None => {
                tracing::warn!("TOKEN_ENCRYPTION_KEY is not set; linking and polling are disabled");
                None
            }
        };

        let collaborators = Collaborators {
            oauth: Arc::new(GoogleOAuth::new(
                config.google_client_id.clone(),
                config.google_client_secret.clone(),
            )?),
            mailbox: Arc::new(GmailClient::new()?),
            messenger: Arc::new(LineMessenger::new(config.line_channel_access_token.clone())?),
        };

        Ok(Self::new(
            db,
            codec,
            collaborators,
            config.poll.clone(),
            config.scheduler_secret.clone(),
        ))
    }
}
