//! Admin settings: the user directory, roles and tag labels.
//!
//! Every operation validates its input before touching the store, so a
//! rejected call leaves everything as it was.

use serde::{Deserialize, Serialize};

use crate::db::{next_id, Database};
use crate::error::{Error, Result};
use crate::user::{derive_initials, pick_color, User};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RoleRecord {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub permissions: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TagLabel {
    pub id: u64,
    pub name: String,
    pub color: String,
}

/// Fields for creating or editing a user. `None` keeps the current value on update.
#[derive(Debug, Clone, Default)]
pub struct UserInput {
    pub name: Option<String>,
    pub email: Option<String>,
    pub role: Option<String>,
    pub color: Option<String>,
}

fn required(value: Option<&str>, field: &str) -> Result<String> {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v.to_string()),
        _ => Err(Error::Validation(format!("{} is required", field))),
    }
}

/// Loose `local@domain.tld` check.
pub fn is_valid_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') || email.chars().any(char::is_whitespace) {
        return false;
    }
    match domain.rsplit_once('.') {
        Some((host, tld)) => !host.is_empty() && !tld.is_empty(),
        None => false,
    }
}

fn check_email(email: &str) -> Result<()> {
    if is_valid_email(email) {
        Ok(())
    } else {
        Err(Error::Validation(format!("'{}' is not a valid email address", email)))
    }
}

fn normalise_permissions(perms: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = perms
        .into_iter()
        .map(|p| p.trim().to_lowercase())
        .filter(|p| !p.is_empty())
        .collect();
    out.sort();
    out.dedup();
    out
}

/// Slug used as a user id: lowercase name words joined by '-', made unique.
fn user_slug(name: &str, users: &[User]) -> String {
    let base: String = name
        .split_whitespace()
        .map(|w| w.to_lowercase())
        .collect::<Vec<_>>()
        .join("-");
    let mut candidate = base.clone();
    let mut n = 2;
    while users.iter().any(|u| u.id == candidate) {
        candidate = format!("{}-{}", base, n);
        n += 1;
    }
    candidate
}

impl Database {
    pub fn add_user(&mut self, input: UserInput) -> Result<&User> {
        let name = required(input.name.as_deref(), "Name")?;
        let email = required(input.email.as_deref(), "Email")?;
        check_email(&email)?;
        if self.users.iter().any(|u| u.email.eq_ignore_ascii_case(&email)) {
            return Err(Error::Validation(format!("a user with email '{}' already exists", email)));
        }

        let user = User {
            id: user_slug(&name, &self.users),
            initials: derive_initials(&name),
            name,
            email,
            role: input.role.map(|r| r.trim().to_string()).unwrap_or_default(),
            color: input.color.unwrap_or_else(|| pick_color(self.users.len())),
        };
        tracing::info!(user = %user.id, "user added");
        self.users.push(user);
        match self.users.last() {
            Some(u) => Ok(u),
            None => Err(Error::NotFound("user".into())),
        }
    }

    pub fn update_user(&mut self, id: &str, input: UserInput) -> Result<&User> {
        let pos = self
            .users
            .iter()
            .position(|u| u.id == id)
            .ok_or_else(|| Error::NotFound(format!("user '{}'", id)))?;

        let mut next = self.users[pos].clone();
        if input.name.is_some() {
            next.name = required(input.name.as_deref(), "Name")?;
            next.initials = derive_initials(&next.name);
        }
        if input.email.is_some() {
            let email = required(input.email.as_deref(), "Email")?;
            check_email(&email)?;
            if self.users.iter().any(|u| u.id != id && u.email.eq_ignore_ascii_case(&email)) {
                return Err(Error::Validation(format!("a user with email '{}' already exists", email)));
            }
            next.email = email;
        }
        if let Some(role) = input.role {
            next.role = role.trim().to_string();
        }
        if let Some(color) = input.color {
            next.color = color;
        }

        self.users[pos] = next;
        tracing::info!(user = id, "user updated");
        Ok(&self.users[pos])
    }

    /// Remove a user from the directory. Tasks keep the dangling reference.
    pub fn remove_user(&mut self, id: &str) -> Result<User> {
        let pos = self
            .users
            .iter()
            .position(|u| u.id == id)
            .ok_or_else(|| Error::NotFound(format!("user '{}'", id)))?;
        tracing::info!(user = id, "user removed");
        Ok(self.users.remove(pos))
    }

    pub fn add_role(&mut self, name: &str, permissions: Vec<String>) -> Result<&RoleRecord> {
        let name = required(Some(name), "Role name")?;
        if self.roles.iter().any(|r| r.name.eq_ignore_ascii_case(&name)) {
            return Err(Error::Validation(format!("role '{}' already exists", name)));
        }
        let role = RoleRecord {
            id: next_id(self.roles.iter().map(|r| r.id)),
            name,
            permissions: normalise_permissions(permissions),
        };
        tracing::info!(role = role.id, "role added");
        self.roles.push(role);
        match self.roles.last() {
            Some(r) => Ok(r),
            None => Err(Error::NotFound("role".into())),
        }
    }

    pub fn update_role(&mut self, id: u64, name: Option<&str>, permissions: Option<Vec<String>>) -> Result<&RoleRecord> {
        let pos = self
            .roles
            .iter()
            .position(|r| r.id == id)
            .ok_or_else(|| Error::NotFound(format!("role {}", id)))?;
        let name = name.map(|n| required(Some(n), "Role name")).transpose()?;
        if let Some(name) = &name {
            if self.roles.iter().any(|r| r.id != id && r.name.eq_ignore_ascii_case(name)) {
                return Err(Error::Validation(format!("role '{}' already exists", name)));
            }
        }
        let role = &mut self.roles[pos];
        if let Some(name) = name {
            role.name = name;
        }
        if let Some(perms) = permissions {
            role.permissions = normalise_permissions(perms);
        }
        tracing::info!(role = id, "role updated");
        Ok(&self.roles[pos])
    }

    pub fn remove_role(&mut self, id: u64) -> Result<RoleRecord> {
        let pos = self
            .roles
            .iter()
            .position(|r| r.id == id)
            .ok_or_else(|| Error::NotFound(format!("role {}", id)))?;
        Ok(self.roles.remove(pos))
    }

    pub fn add_tag_label(&mut self, name: &str, color: &str) -> Result<&TagLabel> {
        let name = required(Some(name), "Tag name")?;
        let color = required(Some(color), "Tag color")?;
        if self.tag_labels.iter().any(|t| t.name.eq_ignore_ascii_case(&name)) {
            return Err(Error::Validation(format!("tag '{}' already exists", name)));
        }
        let label = TagLabel {
            id: next_id(self.tag_labels.iter().map(|t| t.id)),
            name,
            color,
        };
        tracing::info!(tag = label.id, "tag label added");
        self.tag_labels.push(label);
        match self.tag_labels.last() {
            Some(t) => Ok(t),
            None => Err(Error::NotFound("tag".into())),
        }
    }

    pub fn update_tag_label(&mut self, id: u64, name: Option<&str>, color: Option<&str>) -> Result<&TagLabel> {
        let pos = self
            .tag_labels
            .iter()
            .position(|t| t.id == id)
            .ok_or_else(|| Error::NotFound(format!("tag {}", id)))?;
        let name = name.map(|n| required(Some(n), "Tag name")).transpose()?;
        let color = color.map(|c| required(Some(c), "Tag color")).transpose()?;
        if let Some(name) = &name {
            if self.tag_labels.iter().any(|t| t.id != id && t.name.eq_ignore_ascii_case(name)) {
                return Err(Error::Validation(format!("tag '{}' already exists", name)));
            }
        }
        let label = &mut self.tag_labels[pos];
        if let Some(name) = name {
            label.name = name;
        }
        if let Some(color) = color {
            label.color = color;
        }
        Ok(&self.tag_labels[pos])
    }

    pub fn remove_tag_label(&mut self, id: u64) -> Result<TagLabel> {
        let pos = self
            .tag_labels
            .iter()
            .position(|t| t.id == id)
            .ok_or_else(|| Error::NotFound(format!("tag {}", id)))?;
        Ok(self.tag_labels.remove(pos))
    }
}
