//! Route table.

use actix_web::web;

use super::handlers;

/// Register every NetCare+ route on the app.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(handlers::health)).service(
        web::scope("/api")
            // Cases
            .service(
                web::scope("/cases")
                    .route("", web::post().to(handlers::create_case))
                    .route("", web::get().to(handlers::list_cases))
                    .route("/{case_id}", web::get().to(handlers::get_case))
                    .route("/{case_id}/metrics", web::get().to(handlers::case_metrics))
                    .route("/{case_id}/vitals/refresh", web::post().to(handlers::refresh_vitals))
                    .route("/{case_id}/close", web::post().to(handlers::close_case))
                    .route("/{case_id}/prescription", web::put().to(handlers::prescribe))
                    .route(
                        "/{case_id}/treatment-plan",
                        web::put().to(handlers::set_treatment_plan),
                    ),
            )
            // Doctors
            .route("/doctors", web::get().to(handlers::list_doctors))
            // Network
            .service(
                web::scope("/network")
                    .route("/metrics", web::get().to(handlers::network_metrics))
                    .route("/export", web::get().to(handlers::export_metrics))
                    .route("/test-connection", web::post().to(handlers::test_connection))
                    .route("/status", web::get().to(handlers::network_status)),
            ),
    );
}
