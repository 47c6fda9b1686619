use crate::common::errors::BusinessError;
use crate::common::state::AppState;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum_keycloak_auth::{PassthroughMode, decode::KeycloakToken, layer::KeycloakAuthLayer};
use utoipa_axum::router::OpenApiRouter;

pub const COORDINATOR_ROLE: &str = "qc-coordinator";
pub const TECHNICIAN_ROLE: &str = "qc-technician";
pub const GUEST_ROLE: &str = "qc-guest";

/// Identity headers honoured only when Keycloak is disabled (local and test deployments)
pub const ACTOR_NAME_HEADER: &str = "x-actor-name";
pub const ACTOR_ROLE_HEADER: &str = "x-actor-role";

#[derive(Debug, PartialEq, Eq, Clone)]
pub enum Role {
    Coordinator,
    Technician,
    Guest,
    Unknown(String),
}

impl axum_keycloak_auth::role::Role for Role {}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Coordinator => f.write_str(COORDINATOR_ROLE),
            Role::Technician => f.write_str(TECHNICIAN_ROLE),
            Role::Guest => f.write_str(GUEST_ROLE),
            Role::Unknown(unknown) => f.write_fmt(format_args!("Unknown role: {unknown}")),
        }
    }
}

impl From<String> for Role {
    fn from(value: String) -> Self {
        let trimmed = value.trim().to_string();
        match trimmed.as_str() {
            COORDINATOR_ROLE | "coordinator" => Role::Coordinator,
            TECHNICIAN_ROLE | "technician" => Role::Technician,
            GUEST_ROLE | "guest" => Role::Guest,
            _ => Role::Unknown(value),
        }
    }
}

impl Role {
    /// Short name written to the change history
    pub fn as_str(&self) -> &str {
        match self {
            Role::Coordinator => "coordinator",
            Role::Technician => "technician",
            Role::Guest => "guest",
            Role::Unknown(value) => value.as_str(),
        }
    }

    fn precedence(&self) -> u8 {
        match self {
            Role::Coordinator => 3,
            Role::Technician => 2,
            Role::Guest => 1,
            Role::Unknown(_) => 0,
        }
    }
}

/// The user performing a request: a display name for audit fields and a single role.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub name: String,
    pub role: Role,
}

impl Actor {
    pub fn new(name: impl Into<String>, role: Role) -> Self {
        Self {
            name: name.into(),
            role,
        }
    }

    /// Users holding several realm roles act with the most privileged one
    fn from_token(token: &KeycloakToken<Role>) -> Self {
        let role = token
            .roles
            .iter()
            .map(|keycloak_role| keycloak_role.role().clone())
            .max_by_key(Role::precedence)
            .unwrap_or(Role::Guest);
        Self::new(token.extra.profile.preferred_username.clone(), role)
    }
}

impl FromRequestParts<AppState> for Actor {
    type Rejection = BusinessError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        if let Some(token) = parts.extensions.get::<KeycloakToken<Role>>() {
            return Ok(Actor::from_token(token));
        }
        if state.keycloak_auth_instance.is_some() {
            return Err(BusinessError::Forbidden {
                action: "access".to_string(),
                resource: "this resource without a token".to_string(),
            });
        }

        let header = |name: &str| {
            parts
                .headers
                .get(name)
                .and_then(|value| value.to_str().ok())
                .map(str::to_string)
        };
        let name = header(ACTOR_NAME_HEADER).unwrap_or_else(|| "anonymous".to_string());
        let role = header(ACTOR_ROLE_HEADER).map_or(Role::Guest, Role::from);
        Ok(Actor::new(name, role))
    }
}

/// Put a resource router behind Keycloak when an instance is configured
pub fn protect(router: OpenApiRouter, state: &AppState, resource: &str) -> OpenApiRouter {
    if let Some(instance) = state.keycloak_auth_instance.clone() {
        router.layer(
            KeycloakAuthLayer::<Role>::builder()
                .instance(instance)
                .passthrough_mode(PassthroughMode::Block)
                .persist_raw_claims(false)
                .expected_audiences(vec![String::from("account")])
                .required_roles(vec![])
                .build(),
        )
    } else {
        if !state.config.tests_running {
            tracing::warn!(
                "Routes of {resource} router are not protected, identity is read from headers"
            );
        }
        router
    }
}
