//! Role- and Permission-Guarded Routes
//!
//! Each group carries its guard as a route layer, so the guard runs
//! only for matched routes (unknown paths still 404) and after the
//! global auth middleware has injected `CurrentUser`.

use axum::middleware::from_fn;
use axum::{Router, routing::get, routing::post};

use crate::auth::{Permission, Role, require_permission, require_role};
use crate::core::ServerState;
use crate::handler::dashboard;

pub fn router() -> Router<ServerState> {
    let admin = Router::new()
        .route("/api/admin/dashboard", get(dashboard::admin_dashboard))
        .route_layer(from_fn(require_role(Role::Admin)));

    let pharmacist = Router::new()
        .route(
            "/api/pharmacist/dashboard",
            get(dashboard::pharmacist_dashboard),
        )
        .route_layer(from_fn(require_role(Role::Pharmacist)));

    let technician = Router::new()
        .route(
            "/api/technician/dashboard",
            get(dashboard::technician_dashboard),
        )
        .route_layer(from_fn(require_role(Role::Technician)));

    let view_inventory = Router::new()
        .route("/api/inventory/products", get(dashboard::list_products))
        .route_layer(from_fn(require_permission(Permission::ViewInventory)));

    let edit_inventory = Router::new()
        .route("/api/inventory/update", post(dashboard::update_inventory))
        .route_layer(from_fn(require_permission(Permission::EditInventory)));

    let view_clients = Router::new()
        .route("/api/clients", get(dashboard::list_clients))
        .route_layer(from_fn(require_permission(Permission::ViewClients)));

    let manage_users = Router::new()
        .route("/api/system/users", get(dashboard::list_users))
        .route_layer(from_fn(require_permission(Permission::ManageUsers)));

    Router::new()
        .merge(admin)
        .merge(pharmacist)
        .merge(technician)
        .merge(view_inventory)
        .merge(edit_inventory)
        .merge(view_clients)
        .merge(manage_users)
}
