use crate::{
    api::{
        attendance, classes, leave_request, notifications, progress, reports, schedules, schools,
        students, teachers,
    },
    auth::{handlers, middleware::auth_middleware},
    config::Config,
};
use actix_governor::{
    Governor, GovernorConfig, GovernorConfigBuilder, PeerIpKeyExtractor,
    governor::middleware::NoOpMiddleware,
};
use actix_web::{middleware::from_fn, web};
use std::sync::Arc;

// Per-route limiter; quota refills evenly across the minute.
fn build_limiter(requests_per_min: u32) -> Governor<PeerIpKeyExtractor, NoOpMiddleware> {
    let requests_per_min = requests_per_min.max(1);
    let per_ms = (60_000 / requests_per_min as u64).max(1);

    let cfg = GovernorConfigBuilder::default()
        .per_millisecond(per_ms)
        .burst_size(requests_per_min)
        .key_extractor(PeerIpKeyExtractor)
        .finish()
        .unwrap_or_else(|| {
            tracing::warn!(requests_per_min, "Invalid rate limit, using governor defaults");
            GovernorConfig::default()
        });
    Governor::new(&cfg)
}

/// Same shape for every directory resource: collection + `/{id}`.
macro_rules! crud {
    ($path:literal, $module:ident, $create:ident, $list:ident, $get:ident, $update:ident, $delete:ident) => {
        web::scope($path)
            .service(
                web::resource("")
                    .route(web::post().to($module::$create))
                    .route(web::get().to($module::$list)),
            )
            .service(
                web::resource("/{id}")
                    .route(web::get().to($module::$get))
                    .route(web::put().to($module::$update))
                    .route(web::delete().to($module::$delete)),
            )
    };
}

pub fn configure(cfg: &mut web::ServiceConfig, config: Config) {
    let login_limiter = Arc::new(build_limiter(config.rate_login_per_min));
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
            .service(web::resource("/me").route(web::get().to(handlers::me)))
            .service(web::resource("/users").route(web::post().to(handlers::create_user)))
            .service(crud!(
                "/schools",
                schools,
                create_school,
                list_schools,
                get_school,
                update_school,
                delete_school
            ))
            .service(crud!(
                "/teachers",
                teachers,
                create_teacher,
                list_teachers,
                get_teacher,
                update_teacher,
                delete_teacher
            ))
            .service(crud!(
                "/students",
                students,
                create_student,
                list_students,
                get_student,
                update_student,
                delete_student
            ))
            .service(crud!(
                "/classes",
                classes,
                create_class,
                list_classes,
                get_class,
                update_class,
                delete_class
            ))
            .service(crud!(
                "/schedules",
                schedules,
                create_period,
                list_periods,
                get_period,
                update_period,
                delete_period
            ))
            .service(
                web::scope("/reports")
                    .service(
                        web::resource("")
                            .route(web::post().to(reports::create_report))
                            .route(web::get().to(reports::list_reports)),
                    )
                    .service(
                        web::resource("/{id}")
                            .route(web::get().to(reports::get_report))
                            .route(web::put().to(reports::update_report)),
                    ),
            )
            .service(
                web::scope("/attendance")
                    // /attendance
                    .service(
                        web::resource("")
                            .route(web::get().to(attendance::list_attendance))
                            .route(web::put().to(attendance::set_attendance)),
                    )
                    .service(
                        web::resource("/summary")
                            .route(web::get().to(attendance::attendance_summary)),
                    )
                    .service(
                        web::resource("/recompute")
                            .route(web::post().to(attendance::recompute_attendance)),
                    ),
            )
            .service(
                web::scope("/leave")
                    // /leave
                    .service(
                        web::resource("")
                            .route(web::get().to(leave_request::leave_list))
                            .route(web::post().to(leave_request::create_leave)),
                    )
                    // /leave/{id}
                    .service(web::resource("/{id}").route(web::get().to(leave_request::get_leave)))
                    // /leave/{id}/approve
                    .service(
                        web::resource("/{id}/approve")
                            .route(web::put().to(leave_request::approve_leave)),
                    )
                    // /leave/{id}/reject
                    .service(
                        web::resource("/{id}/reject")
                            .route(web::put().to(leave_request::reject_leave)),
                    ),
            )
            .service(
                web::resource("/progress")
                    .route(web::put().to(progress::upsert_progress))
                    .route(web::get().to(progress::list_progress)),
            )
            .service(
                web::scope("/notifications")
                    .service(
                        web::resource("")
                            .route(web::post().to(notifications::create_notification))
                            .route(web::get().to(notifications::list_notifications)),
                    )
                    .service(
                        web::resource("/{id}/read").route(web::put().to(notifications::mark_read)),
                    ),
            ),
    );
}

// LOGIN
//  ├─ access_token (15 min) + access_token / csrf_token cookies
//  └─ refresh_token (7 days)

// API REQUEST
//  └─ Authorization: Bearer access_token  (or cookie + x-csrf-token on writes)

// ACCESS EXPIRED
//  └─ POST /auth/refresh with refresh_token
//       └─ returns a rotated pair; the old refresh token is revoked
