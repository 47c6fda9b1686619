use crate::common::state::AppState;
use crate::{alerts, bacteria, forms, samples};
use axum::{Router, extract::DefaultBodyLimit};
use utoipa::OpenApi;
use utoipa_axum::router::OpenApiRouter;
use utoipa_scalar::{Scalar, Servable};

pub fn build_router(state: &AppState) -> Router {
    #[derive(OpenApi)]
    #[openapi(
        modifiers(&SecurityAddon),
        security(
            ("bearerAuth" = [])
        ),
        tags(
            (name = "forms", description = "Sample batches and their lifecycle"),
            (name = "samples", description = "Coordinator and technician edits of single samples"),
            (name = "bacteria", description = "Incubation catalog and reading calendar"),
            (name = "alerts", description = "Samples whose results are overdue")
        )
    )]
    struct ApiDoc;

    struct SecurityAddon;

    impl utoipa::Modify for SecurityAddon {
        fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
            if let Some(components) = openapi.components.as_mut() {
                components.add_security_scheme(
                    "bearerAuth",
                    utoipa::openapi::security::SecurityScheme::Http(
                        utoipa::openapi::security::HttpBuilder::new()
                            .scheme(utoipa::openapi::security::HttpAuthScheme::Bearer)
                            .bearer_format("JWT")
                            .build(),
                    ),
                );
            }
        }
    }

    let (router, api) = OpenApiRouter::with_openapi(ApiDoc::openapi())
        .merge(crate::common::views::router(state))
        .nest("/api/forms", forms::views::router(state))
        .nest("/api/samples", samples::views::router(state))
        .nest("/api/bacteria", bacteria::views::router(state))
        .nest("/api/alerts", alerts::views::router(state))
        .split_for_parts();

    router
        .merge(Scalar::with_url("/api/docs", api))
        .layer(DefaultBodyLimit::max(2 * 1024 * 1024))
}
