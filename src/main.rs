use actix_cors::Cors;
use actix_web::{get, middleware::Logger, web, App, HttpResponse, HttpServer, Responder};
use anyhow::Result;

use stationplan::database::init_database;
use stationplan::handlers::{admin, auth, shifts, stations, users};
use stationplan::middleware::RequestId;
use stationplan::{AuthService, Config, NotificationDispatcher, ShiftFeed};

#[get("/")]
async fn hello() -> impl Responder {
    HttpResponse::Ok().body("StationPlan API v1.0")
}

#[get("/health")]
async fn health() -> impl Responder {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "ok",
        "timestamp": chrono::Utc::now()
    }))
}

#[actix_web::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize logger
    env_logger::init();

    println!("🚀 Starting StationPlan API server...");

    // Load configuration
    let config = Config::from_env()?;
    println!(
        "📋 Configuration loaded (environment: {}, instance: {})",
        config.environment, config.app_instance_id
    );

    // Initialize database and the global pool
    init_database(&config.database_url).await?;
    println!("✅ Database initialized");

    // Services
    let auth_service = AuthService::new(config.clone());
    let dispatcher = NotificationDispatcher::log_only();
    let feed = ShiftFeed::new();

    let config_data = web::Data::new(config.clone());
    let auth_service_data = web::Data::new(auth_service);
    let dispatcher_data = web::Data::new(dispatcher);
    let feed_data = web::Data::new(feed);

    let server_address = config.server_address();
    println!("🌐 Server starting on http://{}", server_address);

    // Start HTTP server
    HttpServer::new(move || {
        App::new()
            .app_data(config_data.clone())
            .app_data(auth_service_data.clone())
            .app_data(dispatcher_data.clone())
            .app_data(feed_data.clone())
            .wrap(
                Cors::default()
                    .allowed_origin("http://localhost:3000")
                    .allowed_methods(vec!["GET", "POST", "PUT", "PATCH", "DELETE", "OPTIONS"])
                    .allowed_headers(vec![
                        "Authorization",
                        "Content-Type",
                        "Accept",
                        "X-Requested-With",
                        "X-Correlation-ID",
                    ])
                    .max_age(3600),
            )
            .wrap(RequestId)
            .wrap(Logger::new(
                r#"%a "%r" %s %b "%{Referer}i" "%{User-Agent}i" %T correlation_id=%{x-correlation-id}o"#,
            ))
            .service(hello)
            .service(health)
            .service(
                web::scope("/api/v1")
                    .service(
                        web::scope("/auth")
                            .route("/signup", web::post().to(auth::signup))
                            .route("/login", web::post().to(auth::login))
                            .route("/me", web::get().to(auth::me)),
                    )
                    .service(
                        web::scope("/users")
                            .route("/me/settings", web::patch().to(users::update_my_settings)),
                    )
                    .service(
                        web::scope("/stations")
                            .route("", web::get().to(stations::get_stations))
                            .route("", web::post().to(stations::create_station))
                            .route("/{id}", web::get().to(stations::get_station))
                            .route("/{id}", web::put().to(stations::update_station))
                            .route("/{id}", web::delete().to(stations::delete_station)),
                    )
                    .service(
                        web::scope("/special-codes")
                            .route("", web::post().to(admin::create_special_code))
                            .route("", web::get().to(admin::get_special_codes)),
                    )
                    .service(
                        web::scope("/applications")
                            .route("/my", web::get().to(shifts::get_my_applications)),
                    )
                    .service(
                        web::scope("/shifts")
                            .route("", web::post().to(shifts::create_shift))
                            .route("", web::get().to(shifts::get_shifts))
                            .route("/feed", web::get().to(shifts::shift_feed))
                            .route("/{id}", web::get().to(shifts::get_shift))
                            .route("/{id}/apply", web::post().to(shifts::apply_to_shift))
                            .route(
                                "/{id}/applications",
                                web::get().to(shifts::get_shift_applications),
                            )
                            .route(
                                "/{id}/applications/{application_id}/withdraw",
                                web::post().to(shifts::withdraw_application),
                            )
                            .route(
                                "/{id}/applications/{application_id}/approve",
                                web::post().to(shifts::approve_applicant),
                            )
                            .route(
                                "/{id}/applications/{application_id}/reject",
                                web::post().to(shifts::reject_applicant),
                            )
                            .route("/{id}/fill", web::post().to(shifts::mark_filled))
                            .route("/{id}/reopen", web::post().to(shifts::reopen_shift))
                            .route("/{id}/cancel", web::post().to(shifts::cancel_shift)),
                    ),
            )
    })
    .bind(&server_address)?
    .run()
    .await
    .map_err(|e| anyhow::anyhow!("Server error: {}", e))
}
