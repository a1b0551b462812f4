//! Role-based navigation guard for the user and admin areas.
//!
//! The role lives in the profile store and anyone holding the profile can
//! change it, so this only routes navigation. It is not an access control
//! boundary.

use serde::Deserialize;
use thiserror::Error;

use crate::repository::{RecordRepository, UserAccount};
use crate::store::StoreError;

pub const LANDING_PATH: &str = "/landing";
pub const LOGIN_PATH: &str = "/login";
pub const USER_HOME_PATH: &str = "/user/index";
pub const ADMIN_HOME_PATH: &str = "/admin/dashboard";

const MIN_PASSWORD_LEN: usize = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Admin,
    User,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::User => "user",
        }
    }

    /// Reads the bare role flag as stored; anything unknown counts as no role.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim() {
            "admin" => Some(Role::Admin),
            "user" => Some(Role::User),
            _ => None,
        }
    }

    /// Maps an account's role label onto a session role. Job titles such as
    /// `Doctor` or `Nurse` are regular users.
    pub fn from_label(label: &str) -> Self {
        if label.trim().eq_ignore_ascii_case("admin") {
            Role::Admin
        } else {
            Role::User
        }
    }

    pub fn home_path(self) -> &'static str {
        match self {
            Role::Admin => ADMIN_HOME_PATH,
            Role::User => USER_HOME_PATH,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Area {
    Public,
    User,
    Admin,
}

impl Area {
    pub fn from_path(path: &str) -> Self {
        if path.starts_with("/admin/") {
            Area::Admin
        } else if path.starts_with("/user/") {
            Area::User
        } else {
            Area::Public
        }
    }

    pub fn required_role(self) -> Option<Role> {
        match self {
            Area::Public => None,
            Area::User => Some(Role::User),
            Area::Admin => Some(Role::Admin),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Allow,
    Redirect(&'static str),
}

pub fn check_access(role: Option<Role>, area: Area) -> Access {
    let Some(required) = area.required_role() else {
        return Access::Allow;
    };

    match role {
        None => Access::Redirect(LOGIN_PATH),
        Some(role) if role != required => Access::Redirect(role.home_path()),
        Some(_) => Access::Allow,
    }
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Please enter your email and password.")]
    MissingCredentials,
    #[error("Please fill in all fields.")]
    MissingFields,
    #[error("Passwords do not match.")]
    PasswordMismatch,
    #[error("Password must be at least 6 characters.")]
    PasswordTooShort,
    #[error("An account with this email already exists.")]
    DuplicateEmail,
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl AuthError {
    /// Whether the error belongs inline on the form rather than as a failure.
    pub fn is_validation(&self) -> bool {
        !matches!(self, AuthError::Store(_))
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    pub role: Option<String>,
}

impl LoginForm {
    pub fn validate(&self) -> Result<(Role, String), AuthError> {
        let email = self.email.trim();
        if email.is_empty() || self.password.is_empty() {
            return Err(AuthError::MissingCredentials);
        }
        let role = match self.role.as_deref() {
            Some("admin") => Role::Admin,
            _ => Role::User,
        };
        Ok((role, email.to_string()))
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub confirm_password: String,
    #[serde(default)]
    pub account_type: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAccount {
    pub name: String,
    pub email: String,
    pub role: Role,
}

impl RegistrationForm {
    pub fn validate(&self) -> Result<NewAccount, AuthError> {
        let name = self.name.trim();
        let email = self.email.trim();
        let account_type = self.account_type.trim();

        if name.is_empty()
            || email.is_empty()
            || self.password.is_empty()
            || self.confirm_password.is_empty()
            || account_type.is_empty()
        {
            return Err(AuthError::MissingFields);
        }
        if self.password != self.confirm_password {
            return Err(AuthError::PasswordMismatch);
        }
        if self.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(AuthError::PasswordTooShort);
        }

        Ok(NewAccount {
            name: name.to_string(),
            email: email.to_string(),
            role: if account_type == "admin" { Role::Admin } else { Role::User },
        })
    }
}

pub fn login(repo: &RecordRepository, role: Role, email: &str) -> Result<&'static str, StoreError> {
    repo.set_role(Some(role))?;
    repo.set_email(Some(email))?;
    Ok(role.home_path())
}

/// Field rules plus an early duplicate-email check, run before the
/// simulated delay so the form can answer straight away.
pub fn check_registration(
    repo: &RecordRepository,
    form: &RegistrationForm,
) -> Result<NewAccount, AuthError> {
    let account = form.validate()?;
    if repo.find_user_by_email(&account.email).is_some() {
        return Err(AuthError::DuplicateEmail);
    }
    Ok(account)
}

/// Creates the account and logs it in. Returns the account and the home page
/// to send the browser to. The repository repeats the email check under its
/// write lock, so a concurrent registration still fails with `DuplicateEmail`.
pub fn complete_registration(
    repo: &RecordRepository,
    account: &NewAccount,
    now: chrono::DateTime<chrono::Utc>,
) -> Result<(UserAccount, &'static str), AuthError> {
    let user = repo
        .register_user(&account.name, &account.email, account.role, now)?
        .ok_or(AuthError::DuplicateEmail)?;
    let home = login(repo, account.role, &account.email)?;
    Ok((user, home))
}

pub fn logout(repo: &RecordRepository) -> &'static str {
    repo.clear_session();
    LANDING_PATH
}
