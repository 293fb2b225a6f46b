use crate::api::v1::RateLimiter;
use crate::application_impl::*;
use crate::application_port::*;
use crate::bus::*;
use crate::domain_model::{routing, topics};
use crate::domain_port::*;
use crate::infra_memory::*;
use crate::infra_mysql::*;
use crate::infra_redis::*;
use crate::logger::*;
use crate::settings::Settings;
use crate::worker::*;
use nanoid::nanoid;
use sqlx::{MySql, Pool};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

pub struct Server {
    pub auth_service: Arc<dyn AuthService>,
    pub listing_service: Arc<dyn ListingService>,
    pub roommate_service: Arc<dyn RoommateService>,
    pub notification_service: Arc<dyn NotificationService>,
    pub global_limiter: Arc<RateLimiter>,
    pub auth_limiter: Arc<RateLimiter>,
    welcome_handle: Mutex<Option<JoinHandle<()>>>,
    listing_events_handle: Mutex<Option<JoinHandle<()>>>,
    amqp_publisher: Option<Arc<AmqpPublisher>>,
    cancel: CancellationToken,
    pool: Option<Pool<MySql>>,
}

impl Server {
    pub async fn try_new(settings: &Settings) -> anyhow::Result<Self> {
        let alphabet: [char; 16] = [
            '1', '2', '3', '4', '5', '6', '7', '8', '9', '0', 'a', 'b', 'c', 'd', 'e', 'f',
        ];
        let run_id = nanoid!(10, &alphabet);

        let cancel = CancellationToken::new();

        // region storage backends

        let mut pool = None;
        let (user_repo, refresh_repo, listing_repo, profile_repo, notification_repo, tx_manager): (
            Arc<dyn UserRepo>,
            Arc<dyn RefreshTokenRepo>,
            Arc<dyn ListingRepo>,
            Arc<dyn ProfileRepo>,
            Arc<dyn NotificationRepo>,
            Arc<dyn TxManager>,
        ) = match settings.mysql.backend.as_str() {
            "mysql" => {
                let p = Pool::<MySql>::connect(&settings.mysql.url).await?;
                pool = Some(p.clone());
                (
                    Arc::new(MySqlUserRepo::new(p.clone())),
                    Arc::new(MySqlRefreshTokenRepo::new(p.clone())),
                    Arc::new(MySqlListingRepo::new(p.clone())),
                    Arc::new(MySqlProfileRepo::new(p.clone())),
                    Arc::new(MySqlNotificationRepo::new(p.clone())),
                    Arc::new(MySqlTxManager::new(p)),
                )
            }
            "memory" => {
                let user_repo: Arc<dyn UserRepo> = Arc::new(MemoryUserRepo::new());
                (
                    user_repo.clone(),
                    Arc::new(MemoryRefreshTokenRepo::new()),
                    Arc::new(MemoryListingRepo::new()),
                    Arc::new(MemoryProfileRepo::new(user_repo)),
                    Arc::new(MemoryNotificationRepo::new()),
                    Arc::new(MemoryTxManager),
                )
            }
            other => return Err(anyhow::anyhow!("Unknown mysql backend: {}", other)),
        };

        let (session_store, read_cache): (Arc<dyn SessionStore>, Arc<dyn ReadCache>) =
            match settings.redis.backend.as_str() {
                "redis" => {
                    let client = redis::Client::open(settings.redis.url.as_str())?;
                    let manager = client.get_connection_manager().await?;
                    (
                        Arc::new(RedisSessionStore::new(manager.clone(), "session")),
                        Arc::new(RedisReadCache::new(manager)),
                    )
                }
                "memory" => (
                    Arc::new(MemorySessionStore::new()),
                    Arc::new(MemoryReadCache::new()),
                ),
                other => return Err(anyhow::anyhow!("Unknown redis backend: {}", other)),
            };

        // endregion

        // region transports

        let mut amqp_publisher = None;
        let (notify_publisher, notify_consumer, listing_publisher, listing_consumer): (
            Arc<dyn EventPublisher>,
            Arc<dyn EventConsumer>,
            Arc<dyn EventPublisher>,
            Arc<dyn EventConsumer>,
        ) = match settings.bus.backend.as_str() {
            "broker" => {
                let amqp = Arc::new(AmqpPublisher::new(
                    &settings.amqp.url,
                    routing::EXCHANGE,
                    &[routing::EMAIL_WELCOME],
                    cancel.clone(),
                ));
                amqp_publisher = Some(amqp.clone());
                (
                    amqp,
                    Arc::new(AmqpConsumer::new(
                        &settings.amqp.url,
                        routing::EXCHANGE,
                        cancel.clone(),
                    )),
                    Arc::new(KafkaPublisher::new(
                        &settings.kafka.brokers,
                        &format!("hearth-pub-{run_id}"),
                    )?),
                    Arc::new(KafkaConsumer::new(
                        &settings.kafka.brokers,
                        &format!("hearth-sub-{run_id}"),
                        cancel.clone(),
                    )),
                )
            }
            "memory" => {
                let bus = Arc::new(MemoryBus::new(cancel.clone()));
                (bus.clone(), bus.clone(), bus.clone(), bus)
            }
            other => return Err(anyhow::anyhow!("Unknown bus backend: {}", other)),
        };

        let mailer: Arc<dyn Mailer> = match settings.mailer.backend.as_str() {
            "log" => Arc::new(LogMailer),
            other => return Err(anyhow::anyhow!("Unknown mailer backend: {}", other)),
        };

        // endregion

        // region services

        let credential_hasher: Arc<dyn CredentialHasher> = Arc::new(Argon2PasswordHasher {});
        let key = std::env::var(&settings.auth.signing_key_env)
            .unwrap_or_else(|_| "hearth-dev-secret-key".to_string())
            .into_bytes();
        let token_codec: Arc<dyn TokenCodec> = Arc::new(JwtHs256Codec::new(JwtConfig {
            issuer: settings.auth.issuer.clone(),
            audience: settings.auth.audience.clone(),
            access_ttl: Duration::from_secs(settings.auth.access_ttl_secs),
            refresh_ttl: Duration::from_secs(settings.auth.refresh_ttl_secs),
            signing_key: key,
        }));

        let auth_service: Arc<dyn AuthService> = Arc::new(RealAuthService::new(
            user_repo.clone(),
            refresh_repo,
            credential_hasher,
            token_codec,
            session_store,
            tx_manager,
            notify_publisher,
        ));

        let listing_service: Arc<dyn ListingService> = Arc::new(RealListingService::new(
            listing_repo,
            read_cache,
            listing_publisher,
            settings.cache.detail_ttl_secs,
            settings.cache.search_ttl_secs,
        ));

        let roommate_service: Arc<dyn RoommateService> =
            Arc::new(RealRoommateService::new(profile_repo.clone()));

        let notification_service: Arc<dyn NotificationService> =
            Arc::new(RealNotificationService::new(notification_repo.clone()));

        // endregion

        // region workers

        let welcome_handler: Arc<dyn EventHandler> = Arc::new(WelcomeEmailHandler::new(
            notification_repo.clone(),
            mailer.clone(),
        ));
        let welcome_handle = tokio::spawn(async move {
            let _ = notify_consumer
                .run("hearth-notifications", &[routing::EMAIL_WELCOME], welcome_handler)
                .await;
        });

        let listing_handler: Arc<dyn EventHandler> = Arc::new(ListingEventsHandler::new(
            profile_repo,
            notification_repo,
            mailer,
        ));
        let listing_events_handle = tokio::spawn(async move {
            let _ = listing_consumer
                .run(
                    "notifications",
                    &[topics::LISTING_CREATED, topics::LISTING_VIEWED],
                    listing_handler,
                )
                .await;
        });

        // endregion

        let window = Duration::from_secs(settings.gateway.window_secs);
        let global_limiter = Arc::new(RateLimiter::new(window, settings.gateway.max_requests));
        let auth_limiter = Arc::new(RateLimiter::new(window, settings.gateway.auth_max_requests));

        info!("server started");

        Ok(Self {
            auth_service,
            listing_service,
            roommate_service,
            notification_service,
            global_limiter,
            auth_limiter,
            welcome_handle: Mutex::new(Some(welcome_handle)),
            listing_events_handle: Mutex::new(Some(listing_events_handle)),
            amqp_publisher,
            cancel,
            pool,
        })
    }

    pub async fn shutdown(&self) {
        info!("server shutting down...");

        self.cancel.cancel();

        let welcome = self.welcome_handle.lock().ok().and_then(|mut l| l.take());
        if let Some(handle) = welcome {
            let r = handle.await;
            info!("welcome worker stopped: {:?}", r);
        }
        let listing_events = self
            .listing_events_handle
            .lock()
            .ok()
            .and_then(|mut l| l.take());
        if let Some(handle) = listing_events {
            let r = handle.await;
            info!("listing events worker stopped: {:?}", r);
        }

        if let Some(publisher) = &self.amqp_publisher {
            publisher.close().await;
        }
        if let Some(pool) = &self.pool {
            pool.close().await;
        }
    }
}
