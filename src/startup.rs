use actix_web::dev::Server;
use actix_web::{web, App, HttpServer};
use std::net::TcpListener;
use std::sync::Arc;

use crate::configuration::AuthKeys;
use crate::logger::RequestLogger;
use crate::middleware::JwtMiddleware;
use crate::routes::{
    create_user, current_user, health_check, login, polka_webhook, refresh, revoke, update_user,
};
use crate::store::{RefreshTokenStore, UserStore};

pub fn run(
    listener: TcpListener,
    users: Arc<dyn UserStore>,
    refresh_tokens: Arc<dyn RefreshTokenStore>,
    keys: AuthKeys,
) -> Result<Server, std::io::Error> {
    let users = web::Data::from(users);
    let refresh_tokens = web::Data::from(refresh_tokens);
    let secret = keys.secret.clone();
    let keys = web::Data::new(keys);

    let server = HttpServer::new(move || {
        App::new()
            .wrap(RequestLogger)
            // Shared state
            .app_data(users.clone())
            .app_data(refresh_tokens.clone())
            .app_data(keys.clone())
            .service(
                web::scope("/api")
                    .route("/healthz", web::get().to(health_check))
                    .route("/users", web::post().to(create_user))
                    .route("/users", web::put().to(update_user))
                    .route("/login", web::post().to(login))
                    .route("/refresh", web::post().to(refresh))
                    .route("/revoke", web::post().to(revoke))
                    .route("/polka/webhooks", web::post().to(polka_webhook))
                    // Protected scope (requires access token)
                    .service(
                        web::scope("/me")
                            .wrap(JwtMiddleware::new(secret.clone()))
                            .route("", web::get().to(current_user)),
                    ),
            )
    })
    .listen(listener)?
    .run();

    Ok(server)
}
