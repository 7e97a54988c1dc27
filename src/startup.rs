use actix_web::dev::Server;
use actix_web::{middleware::Logger, web, App, HttpServer};
use sqlx::PgPool;
use std::net::TcpListener;
use std::sync::Arc;

use crate::auth::{AuthService, JwtService, PasswordService};
use crate::configuration::Settings;
use crate::domain::LockoutPolicy;
use crate::middleware::JwtMiddleware;
use crate::repository::{PostgresRefreshTokenStore, PostgresUserStore};
use crate::routes::{current_user, health_check, login, logout, refresh};

pub fn run(
    listener: TcpListener,
    connection: PgPool,
    settings: Settings,
) -> Result<Server, std::io::Error> {
    let jwt = JwtService::new(&settings.jwt);
    let passwords = PasswordService::new(settings.security.pbkdf2_iterations);
    let lockout = LockoutPolicy {
        max_attempts: settings.security.max_login_attempts,
        lockout_duration: settings.security.lockout_duration(),
    };

    let auth_service = AuthService::new(
        Arc::new(PostgresUserStore::new(connection.clone())),
        Arc::new(PostgresRefreshTokenStore::new(connection)),
        jwt.clone(),
        passwords,
        lockout,
    );
    let auth_data = web::Data::new(auth_service);

    let server = HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .app_data(auth_data.clone())
            // Public routes
            .route("/health_check", web::get().to(health_check))
            .route("/auth/login", web::post().to(login))
            .route("/auth/logout", web::post().to(logout))
            .route("/auth/refresh", web::post().to(refresh))
            // Protected routes (require a Bearer access token)
            .service(
                web::scope("/api")
                    .wrap(JwtMiddleware::new(jwt.clone()))
                    .route("/me", web::get().to(current_user)),
            )
    })
    .listen(listener)?
    .run();

    Ok(server)
}
