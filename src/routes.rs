use crate::{
    api::{admin, attendance, booking, office, parking, wfh},
    auth::{handlers, middleware::auth_middleware},
    config::Config,
};
use actix_governor::{
    Governor, GovernorConfigBuilder, PeerIpKeyExtractor, governor::middleware::NoOpMiddleware,
};
use actix_web::{middleware::from_fn, web};
use std::sync::Arc;

pub fn configure(cfg: &mut web::ServiceConfig, config: Config) {
    // Helper to build per-route limiter
    fn build_limiter(requests_per_min: u32) -> Governor<PeerIpKeyExtractor, NoOpMiddleware> {
        let per_ms = if requests_per_min == 0 {
            1
        } else {
            60_000 / requests_per_min as u64
        };
        let cfg = GovernorConfigBuilder::default()
            .per_millisecond(per_ms)
            .burst_size(requests_per_min)
            .key_extractor(PeerIpKeyExtractor)
            .finish()
            .unwrap();
        Governor::new(&cfg)
    }

    let login_limiter = Arc::new(build_limiter(config.rate_login_per_min));
    let register_limiter = Arc::new(build_limiter(config.rate_register_per_min));
    let refresh_limiter = Arc::new(build_limiter(config.rate_refresh_per_min));
    let protected_limiter = Arc::new(build_limiter(config.rate_protected_per_min));

    // Public routes
    cfg.service(
        web::scope("/auth")
            .service(
                web::resource("/login")
                    .wrap(login_limiter.clone())
                    .route(web::post().to(handlers::login)),
            )
            .service(
                web::resource("/register")
                    .wrap(register_limiter.clone())
                    .route(web::post().to(handlers::register)),
            )
            .service(
                web::resource("/refresh")
                    .wrap(refresh_limiter.clone())
                    .route(web::post().to(handlers::refresh_token)),
            )
            .service(
                web::resource("/logout")
                    .wrap(login_limiter.clone())
                    .route(web::post().to(handlers::logout)),
            ),
    );

    // Protected routes
    cfg.service(
        web::scope(&config.api_prefix)
            .wrap(from_fn(auth_middleware)) // authentication
            .wrap(protected_limiter) // rate limiting
            .service(
                web::scope("/attendance")
                    .service(
                        web::resource("")
                            .route(web::get().to(attendance::attendance_list)),
                    )
                    .service(
                        web::resource("/check-in")
                            .route(web::post().to(attendance::check_in)),
                    )
                    .service(
                        web::resource("/check-out")
                            .route(web::put().to(attendance::check_out)),
                    )
                    .service(web::resource("/today").route(web::get().to(attendance::today))),
            )
            .service(
                web::scope("/bookings")
                    .service(
                        web::resource("")
                            .route(web::post().to(booking::create_booking))
                            .route(web::get().to(booking::booking_list)),
                    )
                    .service(
                        web::resource("/{id}/cancel")
                            .route(web::put().to(booking::cancel_booking)),
                    ),
            )
            .service(
                web::scope("/parking")
                    .service(
                        web::resource("")
                            .route(web::post().to(parking::create_reservation))
                            .route(web::get().to(parking::reservation_list)),
                    )
                    .service(
                        web::resource("/{id}/cancel")
                            .route(web::put().to(parking::cancel_reservation)),
                    ),
            )
            .service(
                web::scope("/wfh")
                    .service(
                        web::resource("")
                            .route(web::post().to(wfh::create_request))
                            .route(web::get().to(wfh::request_list)),
                    )
                    .service(web::resource("/usage").route(web::get().to(wfh::usage)))
                    .service(web::resource("/{id}").route(web::get().to(wfh::get_request)))
                    .service(
                        web::resource("/{id}/approve").route(web::put().to(wfh::approve_request)),
                    )
                    .service(
                        web::resource("/{id}/reject").route(web::put().to(wfh::reject_request)),
                    ),
            )
            .service(
                web::scope("/offices")
                    .service(
                        web::resource("")
                            .route(web::post().to(office::create_office))
                            .route(web::get().to(office::list_offices)),
                    )
                    .service(web::resource("/wifi").route(web::post().to(office::create_wifi)))
                    .service(
                        web::resource("/wifi/{id}/deactivate")
                            .route(web::put().to(office::deactivate_wifi)),
                    )
                    .service(web::resource("/qr").route(web::post().to(office::create_qr)))
                    .service(
                        web::resource("/qr/{id}/deactivate")
                            .route(web::put().to(office::deactivate_qr)),
                    )
                    .service(web::resource("/{id}/qr").route(web::get().to(office::list_qr)))
                    .service(web::resource("/{id}").route(web::put().to(office::update_office))),
            )
            .service(
                web::scope("/admin")
                    .service(
                        web::resource("/conflicts").route(web::get().to(admin::detect_conflicts)),
                    )
                    .service(
                        web::resource("/auto-release")
                            .route(web::post().to(admin::trigger_auto_release)),
                    ),
            ),
    );
}
