// src/services/catalog.rs
//
// Seeded permission catalog and the built-in roles every business starts with.

use crate::{common::error::AppError, db::RbacStore, models::auth::UserRole};

#[derive(Debug, Clone, Copy)]
pub struct PermissionSeed {
    pub name: &'static str,
    pub category: &'static str,
    pub description: &'static str,
}

impl PermissionSeed {
    /// `users:read` -> (`users`, `read`)
    pub fn resource_and_action(&self) -> (&'static str, &'static str) {
        self.name.split_once(':').unwrap_or((self.name, ""))
    }
}

#[derive(Debug, Clone, Copy)]
pub struct SystemRoleSeed {
    pub role: UserRole,
    pub level: i32,
    pub description: &'static str,
    pub permissions: &'static [&'static str],
}

const fn perm(name: &'static str, category: &'static str, description: &'static str) -> PermissionSeed {
    PermissionSeed { name, category, description }
}

pub const PERMISSIONS: &[PermissionSeed] = &[
    // --- Users ---
    perm("users:read", "users", "View staff accounts"),
    perm("users:create", "users", "Create staff accounts"),
    perm("users:update", "users", "Edit staff accounts"),
    perm("users:delete", "users", "Deactivate staff accounts"),
    // --- Roles ---
    perm("roles:read", "roles", "View roles"),
    perm("roles:manage", "roles", "Create, edit and delete roles"),
    // --- Customers ---
    perm("customers:read", "customers", "View customers"),
    perm("customers:create", "customers", "Register customers"),
    perm("customers:update", "customers", "Edit customers"),
    perm("customers:delete", "customers", "Delete customers"),
    // --- Orders ---
    perm("orders:read", "orders", "View orders"),
    perm("orders:create", "orders", "Take new orders"),
    perm("orders:update", "orders", "Change order status and items"),
    perm("orders:delete", "orders", "Cancel orders"),
    // --- Invoicing ---
    perm("invoices:read", "invoicing", "View invoices"),
    perm("invoices:create", "invoicing", "Issue invoices and e-invoices"),
    // --- Delivery ---
    perm("routes:read", "delivery", "View delivery routes"),
    perm("routes:manage", "delivery", "Plan and assign delivery routes"),
    perm("vehicles:read", "delivery", "View vehicles"),
    perm("vehicles:manage", "delivery", "Manage vehicles"),
    // --- Messaging ---
    perm("messages:send", "messaging", "Send WhatsApp messages to customers"),
    // --- Reports / settings ---
    perm("reports:read", "reports", "View reports"),
    perm("settings:manage", "settings", "Change business settings"),
];

pub const OWNER_LEVEL: i32 = 100;

pub const SYSTEM_ROLES: &[SystemRoleSeed] = &[
    SystemRoleSeed {
        role: UserRole::Owner,
        level: OWNER_LEVEL,
        description: "Business owner, full access",
        permissions: &[
            "users:read", "users:create", "users:update", "users:delete",
            "roles:read", "roles:manage",
            "customers:read", "customers:create", "customers:update", "customers:delete",
            "orders:read", "orders:create", "orders:update", "orders:delete",
            "invoices:read", "invoices:create",
            "routes:read", "routes:manage", "vehicles:read", "vehicles:manage",
            "messages:send", "reports:read", "settings:manage",
        ],
    },
    SystemRoleSeed {
        role: UserRole::Manager,
        level: 50,
        description: "Runs daily operations and staff",
        permissions: &[
            "users:read", "users:create", "users:update",
            "roles:read",
            "customers:read", "customers:create", "customers:update", "customers:delete",
            "orders:read", "orders:create", "orders:update", "orders:delete",
            "invoices:read", "invoices:create",
            "routes:read", "routes:manage", "vehicles:read", "vehicles:manage",
            "messages:send", "reports:read",
        ],
    },
    SystemRoleSeed {
        role: UserRole::Employee,
        level: 20,
        description: "Counter staff",
        permissions: &[
            "customers:read", "customers:create", "customers:update",
            "orders:read", "orders:create", "orders:update",
            "invoices:read",
            "messages:send",
        ],
    },
    SystemRoleSeed {
        role: UserRole::Driver,
        level: 10,
        description: "Pickup and delivery driver",
        permissions: &["orders:read", "orders:update", "routes:read", "vehicles:read"],
    },
];

pub fn is_known_permission(name: &str) -> bool {
    PERMISSIONS.iter().any(|p| p.name == name)
}

pub fn system_role(role: UserRole) -> &'static SystemRoleSeed {
    // SYSTEM_ROLES lists every UserRole variant
    SYSTEM_ROLES
        .iter()
        .find(|seed| seed.role == role)
        .unwrap_or(&SYSTEM_ROLES[SYSTEM_ROLES.len() - 1])
}

/// Default authority level of a legacy role value.
pub fn legacy_level(role: UserRole) -> i32 {
    system_role(role).level
}

/// Makes sure every catalog permission exists. Safe to run at every start.
pub async fn sync_catalog(rbac: &dyn RbacStore) -> Result<(), AppError> {
    rbac.sync_permissions(PERMISSIONS).await?;
    tracing::info!("Permission catalog synced ({} permissions)", PERMISSIONS.len());
    Ok(())
}
