//! User directory, permission matrix and board-format catalog.

use std::sync::{Arc, Mutex};

use tracing::info;

use shopfloor_core::{
    merge_patch, new_id, now_rfc3339, Access, AccessLevel, ListParams, ListResult, ServiceError,
};
use shopfloor_kv::KVStore;
use shopfloor_store::DocStore;

use crate::model::{
    default_matrix, AuthSession, BoardFormat, CreateBoardFormatRequest, CreateUserRequest,
    LoginRequest, PermMatrix, User, PAGES,
};

pub const USERS_KEY: &str = "carpentry_users_v1";
pub const PERMS_KEY: &str = "carpentry_perms";
pub const BOARDS_KEY: &str = "board_formats_db_v1";

pub struct DirectoryService {
    users: DocStore<Vec<User>>,
    perms: DocStore<PermMatrix>,
    boards: DocStore<Vec<BoardFormat>>,
    write_lock: Mutex<()>,
}

impl DirectoryService {
    pub fn new(kv: Arc<dyn KVStore>) -> Self {
        Self {
            users: DocStore::new(Arc::clone(&kv), USERS_KEY),
            perms: DocStore::new(Arc::clone(&kv), PERMS_KEY),
            boards: DocStore::new(kv, BOARDS_KEY),
            write_lock: Mutex::new(()),
        }
    }

    /// First-run seeding: an administrator account, the default permission
    /// matrix and the stock board formats. Idempotent; existing data is
    /// never touched.
    pub fn seed(&self) -> Result<(), ServiceError> {
        let _guard = self.write_lock.lock().unwrap();

        let users = self.users.load()?;
        if users.is_empty() {
            let admin = User {
                id: new_id(),
                username: "admin".into(),
                password: "admin".into(),
                full_name: "Головний адміністратор".into(),
                main_role: "curator".into(),
                allowed_pages: PAGES.iter().map(|p| p.to_string()).collect(),
                created_at: now_rfc3339(),
            };
            self.users.save(&vec![admin])?;
            info!("seeded administrator account");
        }

        let perms = self.perms.load()?;
        if perms.is_empty() {
            self.perms.save(&default_matrix())?;
            info!("seeded default permission matrix");
        }

        let boards = self.boards.load()?;
        if boards.is_empty() {
            let stock = vec![
                board("ДСП15 — 2800×2070", "Skl15", 15.0, "2800x2070"),
                board("Фанера 12 — 1525×1525", "W12", 12.0, "1525x1525"),
                board("Фанера 12 — 2800×1280", "W12", 12.0, "2800x1280"),
            ];
            self.boards.save(&stock)?;
            info!("seeded stock board formats");
        }

        Ok(())
    }

    // ---- login ----

    /// Check credentials and hand out a session snapshot. A user with an
    /// empty stored password accepts any password.
    pub fn login(&self, req: LoginRequest) -> Result<AuthSession, ServiceError> {
        let users = self.users.load()?;
        let user = users
            .iter()
            .find(|u| u.username == req.username)
            .ok_or_else(|| {
                ServiceError::Unauthorized(format!("unknown user '{}'", req.username))
            })?;
        if !user.password.is_empty() && user.password != req.password {
            return Err(ServiceError::Unauthorized("wrong password".into()));
        }
        info!(username = %user.username, "login");
        Ok(AuthSession {
            username: user.username.clone(),
            full_name: user.full_name.clone(),
            role: user.main_role.clone(),
            allowed_pages: user.allowed_pages.clone(),
            logged_at: now_rfc3339(),
        })
    }

    // ---- users ----

    pub fn create_user(&self, req: CreateUserRequest) -> Result<User, ServiceError> {
        let username = req.username.trim();
        if username.is_empty() {
            return Err(ServiceError::Validation("username must not be blank".into()));
        }

        let _guard = self.write_lock.lock().unwrap();
        let mut users = self.users.load()?;
        if users.iter().any(|u| u.username == username) {
            return Err(ServiceError::Conflict(format!("user '{}' already exists", username)));
        }
        let user = User {
            id: new_id(),
            username: username.to_string(),
            password: req.password,
            full_name: req.full_name,
            main_role: req.main_role,
            allowed_pages: req.allowed_pages,
            created_at: now_rfc3339(),
        };
        users.insert(0, user.clone());
        self.users.save(&users)?;
        info!(username = %user.username, "user created");
        Ok(user)
    }

    pub fn get_user(&self, id: &str) -> Result<User, ServiceError> {
        let users = self.users.load()?;
        users
            .into_iter()
            .find(|u| u.id == id)
            .ok_or_else(|| ServiceError::NotFound(format!("user '{}' not found", id)))
    }

    pub fn find_user(&self, username: &str) -> Result<Option<User>, ServiceError> {
        let users = self.users.load()?;
        Ok(users.into_iter().find(|u| u.username == username))
    }

    pub fn list_users(&self, params: &ListParams) -> Result<ListResult<User>, ServiceError> {
        let users = self.users.load()?;
        let filtered: Vec<User> = users
            .into_iter()
            .filter(|u| match &params.q {
                Some(q) => {
                    let q = q.to_lowercase();
                    u.username.to_lowercase().contains(&q)
                        || u.full_name.to_lowercase().contains(&q)
                }
                None => true,
            })
            .collect();
        let total = filtered.len();
        let items = filtered.into_iter().skip(params.offset).take(params.limit).collect();
        Ok(ListResult { items, total })
    }

    /// Update a user with JSON merge-patch semantics. The id and creation
    /// timestamp are preserved; a username change must stay unique.
    pub fn update_user(&self, id: &str, patch: serde_json::Value) -> Result<User, ServiceError> {
        let _guard = self.write_lock.lock().unwrap();
        let mut users = self.users.load()?;
        let pos = users
            .iter()
            .position(|u| u.id == id)
            .ok_or_else(|| ServiceError::NotFound(format!("user '{}' not found", id)))?;

        let mut base = serde_json::to_value(&users[pos])
            .map_err(|e| ServiceError::Internal(e.to_string()))?;
        merge_patch(&mut base, &patch);
        base["id"] = serde_json::json!(users[pos].id);
        base["createdAt"] = serde_json::json!(users[pos].created_at);

        let updated: User =
            serde_json::from_value(base).map_err(|e| ServiceError::Validation(e.to_string()))?;
        if updated.username != users[pos].username
            && users.iter().any(|u| u.username == updated.username)
        {
            return Err(ServiceError::Conflict(format!(
                "user '{}' already exists",
                updated.username
            )));
        }
        users[pos] = updated.clone();
        self.users.save(&users)?;
        Ok(updated)
    }

    pub fn delete_user(&self, id: &str) -> Result<(), ServiceError> {
        let _guard = self.write_lock.lock().unwrap();
        let mut users = self.users.load()?;
        let before = users.len();
        users.retain(|u| u.id != id);
        if users.len() == before {
            return Err(ServiceError::NotFound(format!("user '{}' not found", id)));
        }
        self.users.save(&users)?;
        info!(user = %id, "user deleted");
        Ok(())
    }

    // ---- permission matrix ----

    pub fn matrix(&self) -> Result<PermMatrix, ServiceError> {
        self.perms.load()
    }

    pub fn put_matrix(&self, matrix: PermMatrix) -> Result<PermMatrix, ServiceError> {
        let _guard = self.write_lock.lock().unwrap();
        self.perms.save(&matrix)?;
        info!("permission matrix replaced");
        Ok(matrix)
    }

    /// Matrix lookup for an acting username. The user's direction comes
    /// from the directory; an unknown actor can still be granted through a
    /// per-user exception.
    pub fn check_path(
        &self,
        actor: &str,
        path: &str,
        level: AccessLevel,
    ) -> Result<(), ServiceError> {
        let matrix = self.perms.load()?;
        let direction = self.find_user(actor)?.map(|u| u.main_role);
        if matrix.allows(actor, direction.as_deref(), path, level) {
            Ok(())
        } else {
            Err(ServiceError::PermissionDenied(format!(
                "'{}' has no access to {}",
                actor, path
            )))
        }
    }

    // ---- board formats ----

    pub fn create_board(&self, req: CreateBoardFormatRequest) -> Result<BoardFormat, ServiceError> {
        let name = req.name.trim();
        if name.is_empty() {
            return Err(ServiceError::Validation("board format name must not be blank".into()));
        }

        let _guard = self.write_lock.lock().unwrap();
        let mut boards = self.boards.load()?;
        let format = BoardFormat {
            id: new_id(),
            name: name.to_string(),
            material: req.material.filter(|m| !m.trim().is_empty()),
            thickness: req.thickness,
            size: req.size.filter(|s| !s.trim().is_empty()),
        };
        boards.insert(0, format.clone());
        self.boards.save(&boards)?;
        info!(board = %format.id, name = %format.name, "board format created");
        Ok(format)
    }

    pub fn list_boards(&self) -> Result<Vec<BoardFormat>, ServiceError> {
        self.boards.load()
    }

    pub fn update_board(
        &self,
        id: &str,
        patch: serde_json::Value,
    ) -> Result<BoardFormat, ServiceError> {
        let _guard = self.write_lock.lock().unwrap();
        let mut boards = self.boards.load()?;
        let pos = boards
            .iter()
            .position(|b| b.id == id)
            .ok_or_else(|| ServiceError::NotFound(format!("board format '{}' not found", id)))?;

        let mut base = serde_json::to_value(&boards[pos])
            .map_err(|e| ServiceError::Internal(e.to_string()))?;
        merge_patch(&mut base, &patch);
        base["id"] = serde_json::json!(boards[pos].id);

        let updated: BoardFormat =
            serde_json::from_value(base).map_err(|e| ServiceError::Validation(e.to_string()))?;
        boards[pos] = updated.clone();
        self.boards.save(&boards)?;
        Ok(updated)
    }

    pub fn delete_board(&self, id: &str) -> Result<(), ServiceError> {
        let _guard = self.write_lock.lock().unwrap();
        let mut boards = self.boards.load()?;
        let before = boards.len();
        boards.retain(|b| b.id != id);
        if boards.len() == before {
            return Err(ServiceError::NotFound(format!("board format '{}' not found", id)));
        }
        self.boards.save(&boards)?;
        Ok(())
    }
}

fn board(name: &str, material: &str, thickness: f64, size: &str) -> BoardFormat {
    BoardFormat {
        id: new_id(),
        name: name.to_string(),
        material: Some(material.to_string()),
        thickness: Some(thickness),
        size: Some(size.to_string()),
    }
}

/// Permission-matrix backed access control, shared with every module.
pub struct MatrixAccess {
    directory: Arc<DirectoryService>,
}

impl MatrixAccess {
    pub fn new(directory: Arc<DirectoryService>) -> Self {
        Self { directory }
    }
}

impl Access for MatrixAccess {
    fn check(&self, actor: &str, path: &str, level: AccessLevel) -> Result<(), ServiceError> {
        self.directory.check_path(actor, path, level)
    }
}
