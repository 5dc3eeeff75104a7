use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use shopfloor_core::AccessLevel;

/// Direction (sector) slugs the permission matrix can key on.
pub const DIRECTIONS: &[&str] = &[
    "constructor",
    "operators",
    "storekeeper",
    "tnut",
    "kitting",
    "assembly",
    "masters",
    "curator",
];

/// Page keys a user can be allowed into.
pub const PAGES: &[&str] = &["operator", "kitting", "master", "constructor", "store", "curator"];

// ---------------------------------------------------------------------------
// Users
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub username: String,

    /// Stored as entered. An empty password accepts any login attempt.
    #[serde(default)]
    pub password: String,

    #[serde(default)]
    pub full_name: String,

    /// Direction slug, see [`DIRECTIONS`].
    #[serde(default)]
    pub main_role: String,

    #[serde(default)]
    pub allowed_pages: Vec<String>,

    pub created_at: String,
}

/// Session handed out on a successful login. The caller keeps it; the
/// server holds no session state.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthSession {
    pub username: String,
    pub full_name: String,
    pub role: String,
    pub allowed_pages: Vec<String>,
    pub logged_at: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserRequest {
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub main_role: String,
    #[serde(default)]
    pub allowed_pages: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub username: String,
    #[serde(default)]
    pub password: String,
}

// ---------------------------------------------------------------------------
// Permission matrix
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Permission {
    /// Route prefix the grant applies to, e.g. "/operator" or "/ax".
    pub path: String,
    pub read: bool,
    pub write: bool,
}

/// Grants by direction plus per-user exceptions.
///
/// A lookup first consults the user's own entries: the first entry whose
/// path prefixes the requested path decides, and a hit that grants wins
/// immediately. A user hit that does not grant falls through to the
/// direction entries rather than denying.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PermMatrix {
    #[serde(default)]
    pub by_direction: BTreeMap<String, Vec<Permission>>,
    #[serde(default)]
    pub by_user: BTreeMap<String, Vec<Permission>>,
}

impl PermMatrix {
    pub fn is_empty(&self) -> bool {
        self.by_direction.is_empty() && self.by_user.is_empty()
    }

    pub fn allows(
        &self,
        actor: &str,
        direction: Option<&str>,
        path: &str,
        level: AccessLevel,
    ) -> bool {
        if let Some(perms) = self.by_user.get(actor) {
            if grants(perms, path, level) {
                return true;
            }
        }
        if let Some(dir) = direction {
            if let Some(perms) = self.by_direction.get(dir) {
                return grants(perms, path, level);
            }
        }
        false
    }
}

fn grants(perms: &[Permission], path: &str, level: AccessLevel) -> bool {
    match perms.iter().find(|p| path.starts_with(&p.path)) {
        Some(p) => match level {
            AccessLevel::Read => p.read,
            AccessLevel::Write => p.write,
        },
        None => false,
    }
}

/// The out-of-the-box matrix: curators and masters see everything.
pub fn default_matrix() -> PermMatrix {
    let full: Vec<Permission> = ["/constructor", "/operator", "/kitting", "/ax"]
        .iter()
        .map(|p| Permission { path: p.to_string(), read: true, write: true })
        .collect();
    let mut by_direction = BTreeMap::new();
    by_direction.insert("curator".to_string(), full.clone());
    by_direction.insert("masters".to_string(), full);
    PermMatrix { by_direction, by_user: BTreeMap::new() }
}

// ---------------------------------------------------------------------------
// Board formats
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoardFormat {
    pub id: String,

    /// Visible label, e.g. "ДСП15 — 2800×2070".
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub material: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thickness: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBoardFormatRequest {
    pub name: String,
    #[serde(default)]
    pub material: Option<String>,
    #[serde(default)]
    pub thickness: Option<f64>,
    #[serde(default)]
    pub size: Option<String>,
}
