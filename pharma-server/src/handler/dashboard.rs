//! Guarded Business Handlers
//!
//! The role- and permission-guarded endpoints. The guards do the access
//! control; these handlers only assemble their payloads. Inventory and
//! client data live in external systems, so the lists here are summary
//! fixtures for frontend development, same as the per-role dashboards.

use axum::Json;
use axum::extract::State;
use serde::{Deserialize, Serialize};
use shared::{ApiResponse, AppError};
use validator::Validate;

use crate::auth::Role;
use crate::auth::session::CurrentUser;
use crate::core::ServerState;
use crate::handler::AppJson;

#[derive(Debug, Serialize)]
pub struct DashboardSummary {
    pub role: Role,
    pub registered_users: usize,
    pub active_sessions: usize,
}

/// Shared by the three per-role dashboards; the role guard in front of
/// each route has already done the access decision.
async fn dashboard(state: ServerState, user: CurrentUser) -> Json<ApiResponse<DashboardSummary>> {
    Json(ApiResponse::ok(DashboardSummary {
        role: user.role,
        registered_users: state.credentials.user_count(),
        active_sessions: state.sessions.session_count(),
    }))
}

/// GET /api/admin/dashboard (role ADMIN)
pub async fn admin_dashboard(
    State(state): State<ServerState>,
    user: CurrentUser,
) -> Json<ApiResponse<DashboardSummary>> {
    dashboard(state, user).await
}

/// GET /api/pharmacist/dashboard (role PHARMACIST)
pub async fn pharmacist_dashboard(
    State(state): State<ServerState>,
    user: CurrentUser,
) -> Json<ApiResponse<DashboardSummary>> {
    dashboard(state, user).await
}

/// GET /api/technician/dashboard (role TECHNICIAN)
pub async fn technician_dashboard(
    State(state): State<ServerState>,
    user: CurrentUser,
) -> Json<ApiResponse<DashboardSummary>> {
    dashboard(state, user).await
}

#[derive(Debug, Serialize)]
pub struct ProductSummary {
    pub id: u32,
    pub name: &'static str,
    pub description: &'static str,
    pub price: f64,
    pub stock: u32,
    pub category: &'static str,
}

/// GET /api/inventory/products (permission VIEW_INVENTORY)
pub async fn list_products() -> Json<ApiResponse<Vec<ProductSummary>>> {
    Json(ApiResponse::ok(vec![
        ProductSummary {
            id: 1,
            name: "Paracétamol 500mg",
            description: "Analgésique et antipyrétique",
            price: 8.50,
            stock: 250,
            category: "Analgésiques",
        },
        ProductSummary {
            id: 2,
            name: "Ibuprofène 200mg",
            description: "Anti-inflammatoire non stéroïdien",
            price: 12.00,
            stock: 120,
            category: "Anti-inflammatoires",
        },
        ProductSummary {
            id: 3,
            name: "Amoxicilline 1g",
            description: "Antibiotique de la famille des bêta-lactamines",
            price: 15.75,
            stock: 60,
            category: "Antibiotiques",
        },
    ]))
}

#[derive(Debug, Deserialize, Validate)]
pub struct InventoryUpdateRequest {
    pub product_id: u32,
    #[validate(range(min = 0))]
    pub stock: i64,
}

#[derive(Debug, Serialize)]
pub struct InventoryUpdateResponse {
    pub product_id: u32,
    pub stock: i64,
    pub updated_by: String,
}

/// POST /api/inventory/update (permission EDIT_INVENTORY)
pub async fn update_inventory(
    user: CurrentUser,
    AppJson(req): AppJson<InventoryUpdateRequest>,
) -> Result<Json<ApiResponse<InventoryUpdateResponse>>, AppError> {
    req.validate()
        .map_err(|e| AppError::validation(e.to_string()))?;

    tracing::info!(
        user_id = %user.id,
        product_id = req.product_id,
        stock = req.stock,
        "inventory updated"
    );

    Ok(Json(ApiResponse::ok(InventoryUpdateResponse {
        product_id: req.product_id,
        stock: req.stock,
        updated_by: user.id,
    })))
}

#[derive(Debug, Serialize)]
pub struct ClientSummary {
    pub id: u32,
    pub name: &'static str,
    pub status: &'static str,
}

/// GET /api/clients (permission VIEW_CLIENTS)
pub async fn list_clients() -> Json<ApiResponse<Vec<ClientSummary>>> {
    Json(ApiResponse::ok(vec![
        ClientSummary {
            id: 1,
            name: "Marie Dupont",
            status: "REGULAR",
        },
        ClientSummary {
            id: 2,
            name: "Jean Martin",
            status: "NEW",
        },
    ]))
}

#[derive(Debug, Serialize)]
pub struct SystemUser {
    pub id: String,
    pub email: String,
    pub name: String,
    pub role: Role,
}

/// GET /api/system/users (permission MANAGE_USERS)
///
/// Credential hashes never leave the store boundary.
pub async fn list_users(State(state): State<ServerState>) -> Json<ApiResponse<Vec<SystemUser>>> {
    let mut users: Vec<SystemUser> = state
        .credentials
        .all_users()
        .into_iter()
        .map(|u| SystemUser {
            id: u.id,
            email: u.identifier,
            name: u.display_name,
            role: u.role,
        })
        .collect();
    users.sort_by(|a, b| a.email.cmp(&b.email));

    Json(ApiResponse::ok(users))
}
