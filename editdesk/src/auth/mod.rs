//! Authentication and authorization.
//!
//! # Authentication Methods
//!
//! ## 1. Session Authentication
//!
//! Browser-based authentication using an HTTP-only cookie:
//! - Users log in via `/authentication/login` with username/password
//! - A signed JWT is stored in the session cookie
//! - The account is re-read on every request, so deactivation takes effect immediately
//!
//! ## 2. Proxy Header Authentication
//!
//! For deployments behind an SSO proxy: the configured header carries the username of an
//! existing, active user.
//!
//! A development bypass (`auth.dev_bypass.enabled`) lets `admin/admin` and `editor/editor`
//! log in without a password. It only affects the login endpoint.
//!
//! # Authorization
//!
//! Two roles: admins may do everything, editors only read (and partly update) their own work.
//! UI sections can additionally be hidden per user, see [`sections`].
//!
//! # Modules
//!
//! - [`current_user`]: Extractor for the authenticated user
//! - [`password`]: Password hashing and verification using Argon2
//! - [`permissions`]: Role permissions and the `RequiresPermission` extractor
//! - [`session`]: JWT session tokens
//! - [`sections`]: Per-role UI section catalog

pub mod current_user;
pub mod password;
pub mod permissions;
pub mod sections;
pub mod session;
